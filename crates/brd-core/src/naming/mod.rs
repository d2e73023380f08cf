//! Archive entry naming for downloaded releases.
//!
//! The source filename comes from `Content-Disposition` when the server sends
//! one, otherwise from the URL path. When the release has both a name and a
//! version the entry is renamed `<name>-<version><ext>`.

mod content_disposition;
mod path;
mod sanitize;

pub use content_disposition::disposition_filename;
pub use path::url_filename;
pub use sanitize::sanitize_entry_name;

use crate::release::Release;

/// Entry name used when neither the URL nor the response yields a filename.
const FALLBACK_FILENAME: &str = "release.bin";

/// Extension assumed for renamed releases whose source filename has none.
const DEFAULT_EXTENSION: &str = ".tgz";

/// Filename as served, before any name/version override.
pub fn source_filename(url: &str, content_disposition: Option<&str>) -> String {
    content_disposition
        .and_then(disposition_filename)
        .or_else(|| url_filename(url))
        .unwrap_or_else(|| FALLBACK_FILENAME.to_string())
}

/// Extension of `filename` including the dot, preserving `.tar.gz`.
/// Defaults to `.tgz` when the filename has none.
pub fn release_extension(filename: &str) -> &str {
    let Some(ext) = extension(filename) else {
        return DEFAULT_EXTENSION;
    };
    if ext == ".gz" {
        let stem = &filename[..filename.len() - ext.len()];
        if extension(stem) == Some(".tar") {
            return &filename[filename.len() - ".tar.gz".len()..];
        }
    }
    ext
}

fn extension(filename: &str) -> Option<&str> {
    filename.rfind('.').map(|i| &filename[i..])
}

/// Final entry name for `release` given what the server called the file.
pub fn resolve_filename(release: &Release, source: &str) -> String {
    let name = if !release.name.is_empty() && !release.version.is_empty() {
        format!(
            "{}-{}{}",
            release.name,
            release.version,
            release_extension(source)
        )
    } else {
        source.to_string()
    };

    let sanitized = sanitize_entry_name(&name);
    if sanitized.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(name: &str, version: &str) -> Release {
        Release {
            url: "https://example.com/x".to_string(),
            sha1: String::new(),
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    #[test]
    fn tar_gz_keeps_double_extension() {
        assert_eq!(resolve_filename(&rel("foo", "1.2.3"), "bar.tar.gz"), "foo-1.2.3.tar.gz");
    }

    #[test]
    fn single_extension() {
        assert_eq!(resolve_filename(&rel("foo", "1.2.3"), "bar.bin"), "foo-1.2.3.bin");
        assert_eq!(resolve_filename(&rel("foo", "1.2.3"), "bar.gz"), "foo-1.2.3.gz");
    }

    #[test]
    fn missing_extension_defaults_to_tgz() {
        assert_eq!(resolve_filename(&rel("foo", "1.2.3"), "bar"), "foo-1.2.3.tgz");
    }

    #[test]
    fn no_override_without_version() {
        assert_eq!(resolve_filename(&rel("foo", ""), "bar.tar.gz"), "bar.tar.gz");
        assert_eq!(resolve_filename(&rel("", "1.0"), "bar.tgz"), "bar.tgz");
    }

    #[test]
    fn disposition_beats_url() {
        assert_eq!(
            source_filename(
                "https://bosh.io/d/github.com/cloudfoundry/uaa-release?v=74",
                Some("attachment; filename=\"uaa-release-74.tgz\"")
            ),
            "uaa-release-74.tgz"
        );
        assert_eq!(
            source_filename("https://bosh.io/d/github.com/cloudfoundry/uaa-release?v=74", None),
            "uaa-release"
        );
        assert_eq!(source_filename("https://example.com/", None), "release.bin");
    }
}
