//! Whole run: pack every manifest release plus the patch document into one zip.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::archive::ArchiveSink;
use crate::config::BrdConfig;
use crate::dispatch::dispatch;
use crate::http::HttpClient;
use crate::instrument::ProgressFactory;
use crate::packer::Packer;
use crate::patch::append_patch_document;
use crate::release::{expand_path, release_names, Manifest, Release};

/// Where the finished archive goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Path(PathBuf),
    /// Spooled to a temp file, then copied to stdout once complete.
    Stdout,
}

impl Output {
    /// `-` selects stdout; `None` selects `<name>-<version>.zip` in the working directory.
    pub fn resolve(flag: Option<&str>, manifest: &Manifest) -> Result<Self> {
        match flag {
            Some("-") => Ok(Output::Stdout),
            Some(path) if !path.is_empty() => Ok(Output::Path(expand_path(path)?)),
            _ => Ok(Output::Path(expand_path(&manifest.default_archive_name())?)),
        }
    }
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleSummary {
    /// Archive path; `None` when written to stdout.
    pub path: Option<PathBuf>,
    /// Releases downloaded and packed.
    pub packed: usize,
    /// Releases left out because their URL is not a network URL.
    pub skipped: usize,
    /// Entries in the archive, patch document included.
    pub entries: usize,
}

/// Deletes a partially written archive unless disarmed.
struct RemoveOnFailure<'a> {
    path: &'a Path,
    armed: bool,
}

impl Drop for RemoveOnFailure<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = std::fs::remove_file(self.path) {
                tracing::warn!(path = %self.path.display(), error = %e, "could not remove incomplete archive");
            } else {
                tracing::info!(path = %self.path.display(), "removed incomplete archive");
            }
        }
    }
}

struct Packed<W> {
    inner: W,
    packed: usize,
    entries: usize,
}

fn pack_into<W>(
    inner: W,
    releases: &[Release],
    config: &BrdConfig,
    progress: &dyn ProgressFactory,
) -> Result<Packed<W>>
where
    W: Write + Seek + Send + 'static,
{
    let sink = Arc::new(ArchiveSink::new(inner));
    let client = Arc::new(HttpClient::new(config.http.clone()));
    let packer = Packer::new(client, Arc::clone(&sink));

    let ops = dispatch(&packer, releases, config.effective_parallel(), progress)?;
    let doc_len = append_patch_document(&sink, &ops).context("write patch document")?;
    tracing::debug!(ops = ops.len(), bytes = doc_len, "patch document written");

    let entries = sink.entry_count()?;
    let inner = sink.finish().context("finish archive")?;
    Ok(Packed {
        inner,
        packed: ops.len(),
        entries,
    })
}

/// Download every release of `manifest` and write the archive to `output`.
///
/// On failure no archive is left at the output path.
pub fn bundle(
    manifest: &Manifest,
    output: &Output,
    config: &BrdConfig,
    progress: &dyn ProgressFactory,
) -> Result<BundleSummary> {
    let releases = &manifest.releases;
    tracing::info!(releases = %release_names(releases), "packing releases");

    let (path, packed, entries) = match output {
        Output::Path(path) => {
            let file = File::create(path)
                .with_context(|| format!("create archive {}", path.display()))?;
            let mut guard = RemoveOnFailure { path, armed: true };
            let mut done = pack_into(file, releases, config, progress)?;
            done.inner.flush()?;
            done.inner.sync_all().context("sync archive")?;
            guard.armed = false;
            (Some(path.clone()), done.packed, done.entries)
        }
        Output::Stdout => {
            let spool = tempfile::tempfile().context("create spool file")?;
            let mut done = pack_into(spool, releases, config, progress)?;
            done.inner.seek(SeekFrom::Start(0))?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            io::copy(&mut done.inner, &mut out).context("write archive to stdout")?;
            out.flush()?;
            (None, done.packed, done.entries)
        }
    };

    let summary = BundleSummary {
        path,
        packed,
        skipped: releases.len() - packed,
        entries,
    };
    tracing::info!(
        packed = summary.packed,
        skipped = summary.skipped,
        entries = summary.entries,
        "archive complete"
    );
    Ok(summary)
}
