//! Fetch, verify and pack one release.
//!
//! Each release lands in a private scratch file first; only after the body is
//! complete (and its digest checked, when the manifest gives one) is it
//! copied into the shared archive under the sink's exclusive section.

use std::io::{self, Seek, SeekFrom, Write};
use std::sync::Arc;

use tempfile::NamedTempFile;

use crate::archive::{ArchiveSink, EntryMeta};
use crate::checksum::ExpectedDigest;
use crate::error::PackError;
use crate::http::{Fetched, HttpClient};
use crate::instrument::{ObservedReader, ObservedWriter, ReleaseProgress, StreamObserver};
use crate::naming;
use crate::patch::{PatchOp, REPO_DIR_VAR};
use crate::release::Release;

/// Packs releases into one shared archive.
pub struct Packer<W: Write + Seek> {
    client: Arc<HttpClient>,
    sink: Arc<ArchiveSink<W>>,
}

impl<W: Write + Seek> Clone for Packer<W> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<W: Write + Seek> Packer<W> {
    pub fn new(client: Arc<HttpClient>, sink: Arc<ArchiveSink<W>>) -> Self {
        Self { client, sink }
    }

    pub fn sink(&self) -> &Arc<ArchiveSink<W>> {
        &self.sink
    }

    /// Download `release`, verify it and append it to the archive.
    ///
    /// Releases whose URL is not a network URL are left alone: `Ok(None)` and
    /// nothing is written. On error no entry has been started for this
    /// release unless the failure happened while copying into the archive.
    pub fn process(
        &self,
        release: &Release,
        progress: &mut dyn ReleaseProgress,
    ) -> Result<Option<PatchOp>, PackError> {
        if !release.is_remote() {
            tracing::debug!(release = %release.name, url = %release.url, "not a network URL, skipping");
            progress.skipped();
            return Ok(None);
        }

        // removed on drop, whatever the exit path
        let mut scratch = tempfile::Builder::new().prefix(REPO_DIR_VAR).tempfile()?;

        let mut compress_hook = None;
        let Fetched {
            head,
            received,
            body,
        } = self.client.fetch(&release.url, |head| {
            let hooks = progress.hooks(head.content_length);
            compress_hook = hooks.compress;
            ObservedWriter::new(scratch.as_file_mut(), hooks.download)
        })?;
        body.finish();

        let source = naming::source_filename(&release.url, head.content_disposition.as_deref());
        let filename = naming::resolve_filename(release, &source);
        tracing::debug!(
            release = %release.name,
            bytes = received,
            filename = %filename,
            "downloaded"
        );

        if let Some(expected) = ExpectedDigest::parse(&release.sha1) {
            scratch.as_file_mut().seek(SeekFrom::Start(0))?;
            expected.verify(scratch.as_file_mut())?;
            tracing::debug!(release = %release.name, algorithm = expected.algorithm.label(), "checksum verified");
        }

        scratch.as_file_mut().seek(SeekFrom::Start(0))?;
        self.pack(&mut scratch, &filename, compress_hook)?;

        Ok(Some(PatchOp::replace_release(
            &release.name,
            &release.version,
            &filename,
        )))
    }

    fn pack(
        &self,
        scratch: &mut NamedTempFile,
        filename: &str,
        compress_hook: Option<Box<dyn StreamObserver>>,
    ) -> Result<(), PackError> {
        self.sink.with_exclusive(|entry| {
            let meta = EntryMeta::from_metadata(&scratch.as_file().metadata()?);
            entry.start_entry(filename, &meta)?;
            let mut reader = ObservedReader::new(scratch.as_file_mut(), compress_hook);
            io::copy(&mut reader, entry)?;
            Ok(())
        })
    }
}
