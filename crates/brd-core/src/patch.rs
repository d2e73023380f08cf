//! Patch document: ops that point manifest releases at the packed files.

use serde::Serialize;
use std::io::{Seek, Write};
use std::time::SystemTime;

use crate::archive::{ArchiveSink, EntryMeta};
use crate::error::PackError;

/// Template variable standing for the directory the archive is unpacked to.
/// Resolved by the tool that applies the patch, never by the packer.
pub const REPO_DIR_VAR: &str = "brd_repo_dir";

/// Archive entry holding the serialized patch document.
pub const PATCH_ENTRY_NAME: &str = "local-release.yml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OpType {
    Replace,
}

/// Replacement release entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseRef {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    pub url: String,
}

/// One patch operation, produced per packed release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchOp {
    #[serde(rename = "type")]
    pub op_type: OpType,
    pub path: String,
    pub value: ReleaseRef,
}

impl PatchOp {
    /// Replace `/releases/<name>` with the packed copy stored as `filename`.
    pub fn replace_release(name: &str, version: &str, filename: &str) -> Self {
        Self {
            op_type: OpType::Replace,
            path: format!("/releases/{}", name),
            value: ReleaseRef {
                name: name.to_string(),
                version: version.to_string(),
                url: local_url(filename),
            },
        }
    }
}

/// `file://((brd_repo_dir))/<filename>`
pub fn local_url(filename: &str) -> String {
    format!("file://(({}))/{}", REPO_DIR_VAR, filename)
}

/// Serialize `ops` as a YAML sequence.
pub fn render(ops: &[PatchOp]) -> Result<String, PackError> {
    Ok(serde_yaml::to_string(ops)?)
}

/// Append the patch document as the archive's final entry.
pub fn append_patch_document<W: Write + Seek>(
    sink: &ArchiveSink<W>,
    ops: &[PatchOp],
) -> Result<u64, PackError> {
    let doc = render(ops)?;
    let meta = EntryMeta::new(doc.len() as u64, SystemTime::now(), 0o666);
    if meta.size.needs_zip64() {
        tracing::warn!(
            declared = meta.size.declared,
            actual = meta.size.actual,
            "patch document exceeds 32-bit size field, writing ZIP64 entry"
        );
    }
    sink.with_exclusive(|w| {
        w.start_entry(PATCH_ENTRY_NAME, &meta)?;
        w.write_all(doc.as_bytes())?;
        Ok(())
    })?;
    Ok(doc.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    #[test]
    fn replace_op_shape() {
        let op = PatchOp::replace_release("cf", "1.0", "cf-1.0.tgz");
        assert_eq!(op.path, "/releases/cf");
        assert_eq!(op.value.url, "file://((brd_repo_dir))/cf-1.0.tgz");
    }

    #[test]
    fn render_yaml_document() {
        let ops = vec![
            PatchOp::replace_release("cf", "1.0", "cf-1.0.tgz"),
            PatchOp::replace_release("uaa", "", "uaa.tgz"),
        ];
        let yaml = render(&ops).unwrap();
        let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        let seq = parsed.as_sequence().unwrap();
        assert_eq!(seq.len(), 2);
        assert_eq!(seq[0]["type"].as_str(), Some("replace"));
        assert_eq!(seq[0]["path"].as_str(), Some("/releases/cf"));
        assert_eq!(seq[0]["value"]["version"].as_str(), Some("1.0"));
        assert_eq!(
            seq[0]["value"]["url"].as_str(),
            Some("file://((brd_repo_dir))/cf-1.0.tgz")
        );
        assert!(seq[1]["value"].get("version").is_none());
    }

    #[test]
    fn empty_document_is_empty_sequence() {
        let yaml = render(&[]).unwrap();
        assert_eq!(yaml.trim(), "[]");
    }

    #[test]
    fn appended_as_last_entry() {
        let sink = ArchiveSink::new(Cursor::new(Vec::new()));
        let ops = vec![PatchOp::replace_release("cf", "1.0", "cf-1.0.tgz")];
        let written = append_patch_document(&sink, &ops).unwrap();

        let bytes = sink.finish().unwrap().into_inner();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut entry = archive.by_name(PATCH_ENTRY_NAME).unwrap();
        assert_eq!(entry.size(), written);
        let mut doc = String::new();
        entry.read_to_string(&mut doc).unwrap();
        assert!(doc.contains("/releases/cf"));
    }
}
