//! Error kinds for packing a single release and for a whole dispatch run.

use thiserror::Error;

/// Failure of one fetch-verify-pack unit.
#[derive(Debug, Error)]
pub enum PackError {
    /// Curl reported an error (connection refused, timeout, TLS, truncated body, ...).
    #[error("transfer failed: {0}")]
    Transfer(#[from] curl::Error),

    /// Final response status was above 302.
    #[error("non valid status: HTTP {0}")]
    HttpStatus(u32),

    /// Body ended before the declared Content-Length.
    #[error("partial transfer: expected {expected} bytes, got {received}")]
    PartialTransfer { expected: u64, received: u64 },

    /// Downloaded content does not match the manifest digest.
    #[error("{algorithm} mismatch from download: expected {expected}, got {actual}")]
    Integrity {
        algorithm: &'static str,
        expected: String,
        actual: String,
    },

    /// Scratch file or other local I/O failure.
    #[error("local I/O: {0}")]
    Io(#[from] std::io::Error),

    /// Zip container refused the entry or the write.
    #[error("archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// An entry with this name was already written to the archive.
    #[error("archive already contains an entry named '{0}'")]
    DuplicateEntry(String),

    /// Another writer panicked while holding the archive.
    #[error("archive sink poisoned by a panicked writer")]
    SinkPoisoned,

    /// Archive was already finished.
    #[error("archive sink already finished")]
    SinkClosed,

    /// Patch document could not be serialized.
    #[error("patch document: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

impl PackError {
    /// True for checksum mismatches (kept apart from transfer failures in diagnostics).
    pub fn is_integrity(&self) -> bool {
        matches!(self, PackError::Integrity { .. })
    }
}

/// Failure of a dispatch run over many releases.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// One release failed; the run is aborted.
    #[error("Errors on release '{name}': {source}")]
    Release {
        name: String,
        #[source]
        source: PackError,
    },

    /// All workers stopped before every result arrived (a worker panicked).
    #[error("worker result channel closed after {received} of {expected} results (worker may have panicked)")]
    WorkersLost { received: usize, expected: usize },

    /// A worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl DispatchError {
    /// The underlying unit error, if this run failed on a release.
    pub fn pack_error(&self) -> Option<&PackError> {
        match self {
            DispatchError::Release { source, .. } => Some(source),
            _ => None,
        }
    }
}
