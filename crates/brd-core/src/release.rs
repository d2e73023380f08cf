//! Release descriptors and the manifest they are read from.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};

/// One downloadable release as listed in the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Release {
    #[serde(default)]
    pub url: String,
    /// Expected digest; empty disables verification.
    #[serde(default)]
    pub sha1: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

impl Release {
    /// True when the URL points at something we have to download.
    pub fn is_remote(&self) -> bool {
        self.url.starts_with("http")
    }
}

/// Comma separated release names, for log lines.
pub fn release_names(releases: &[Release]) -> String {
    releases
        .iter()
        .map(|r| r.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// The parts of a deployment manifest the packer reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub manifest_version: String,
    #[serde(default)]
    pub releases: Vec<Release>,
}

impl Manifest {
    pub fn from_yaml(bytes: &[u8]) -> Result<Self> {
        let manifest: Manifest =
            serde_yaml::from_slice(bytes).context("parse manifest releases")?;
        Ok(manifest)
    }

    /// `<name>-<version>.zip`, where the version falls back to the release
    /// sharing the manifest's name when `manifest_version` is unset.
    pub fn default_archive_name(&self) -> String {
        let version = if self.manifest_version.is_empty() {
            self.releases
                .iter()
                .find(|r| r.name == self.name)
                .map(|r| r.version.as_str())
                .unwrap_or("")
        } else {
            self.manifest_version.as_str()
        };
        format!("{}-{}.zip", self.name, version)
    }
}

/// Read manifest bytes from `path`, or from stdin when `path` is `-`.
pub fn read_manifest_source(path: &str) -> Result<Vec<u8>> {
    if path.is_empty() {
        bail!("Expected file path to be non-empty");
    }
    if path == "-" {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Reading from stdin")?;
        return Ok(buf);
    }
    let abs = expand_path(path)?;
    std::fs::read(&abs).with_context(|| format!("read manifest {}", abs.display()))
}

/// Expand a leading `~` to the home directory and make the path absolute.
pub fn expand_path(path: &str) -> Result<PathBuf> {
    let expanded = match path.strip_prefix('~') {
        Some(rest) => {
            let home = std::env::var_os("HOME").context("Getting current user home dir")?;
            PathBuf::from(home).join(rest.trim_start_matches('/'))
        }
        None => PathBuf::from(path),
    };
    if expanded.is_absolute() {
        return Ok(expanded);
    }
    let cwd = std::env::current_dir().context("Getting absolute path")?;
    Ok(cwd.join(Path::new(&expanded)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
name: cf
manifest_version: v1.2.0
releases:
- name: capi
  version: "1.40.0"
  url: https://bosh.io/d/github.com/cloudfoundry/capi-release?v=1.40.0
  sha1: 9b0e2e7f6a7a2e0f0e3a7e1b3c2d1f6e5a4b3c2d
- name: local
  version: latest
  url: file:///tmp/local.tgz
- name: bare
"#;

    #[test]
    fn parses_releases() {
        let m = Manifest::from_yaml(MANIFEST.as_bytes()).unwrap();
        assert_eq!(m.releases.len(), 3);
        assert_eq!(m.releases[0].name, "capi");
        assert_eq!(m.releases[0].version, "1.40.0");
        assert!(m.releases[0].is_remote());
        assert!(!m.releases[1].is_remote());
        assert_eq!(m.releases[2].url, "");
        assert_eq!(m.releases[2].sha1, "");
        assert_eq!(release_names(&m.releases), "capi, local, bare");
    }

    #[test]
    fn archive_name_from_manifest_version() {
        let m = Manifest::from_yaml(MANIFEST.as_bytes()).unwrap();
        assert_eq!(m.default_archive_name(), "cf-v1.2.0.zip");
    }

    #[test]
    fn archive_name_falls_back_to_release_version() {
        let yaml = "name: capi\nreleases:\n- name: capi\n  version: '2.0'\n  url: http://x/y\n";
        let m = Manifest::from_yaml(yaml.as_bytes()).unwrap();
        assert_eq!(m.default_archive_name(), "capi-2.0.zip");
    }

    #[test]
    fn manifest_without_releases() {
        let m = Manifest::from_yaml(b"name: empty\n").unwrap();
        assert!(m.releases.is_empty());
    }

    #[test]
    fn empty_manifest_path_rejected() {
        assert!(read_manifest_source("").is_err());
    }

    #[test]
    fn expand_relative_path() {
        let p = expand_path("manifest.yml").unwrap();
        assert!(p.is_absolute());
        assert!(p.ends_with("manifest.yml"));
    }
}
