//! Observation hooks for release streams.
//!
//! Progress reporting is wired in through these traits only. Observers see
//! every chunk as it passes but never change the bytes, so packing behaves
//! the same with [`NoProgress`] as with a terminal UI.

use std::io::{self, Read, Write};

use crate::release::Release;

/// Receives each chunk of a stream as it flows through.
pub trait StreamObserver: Send {
    fn observe(&mut self, chunk: &[u8]);

    /// Called once the stream has been fully consumed.
    fn finish(&mut self) {}
}

/// Optional observers for the two phases of one release.
#[derive(Default)]
pub struct Hooks {
    pub download: Option<Box<dyn StreamObserver>>,
    pub compress: Option<Box<dyn StreamObserver>>,
}

impl Hooks {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Per-release progress handle, created before dispatch and handed to the
/// worker that processes the release.
pub trait ReleaseProgress: Send {
    /// Called once the response is known; `content_length` is the declared
    /// body size when the server sent one.
    fn hooks(&mut self, content_length: Option<u64>) -> Hooks;

    /// Release was skipped (not a network URL).
    fn skipped(&mut self) {}

    /// Release failed; the handle will not be used again.
    fn failed(&mut self) {}
}

/// Creates one pending progress handle per release, in manifest order.
pub trait ProgressFactory: Sync {
    fn pending(&self, release: &Release) -> Box<dyn ReleaseProgress>;
}

/// Progress implementation that observes nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ReleaseProgress for NoProgress {
    fn hooks(&mut self, _content_length: Option<u64>) -> Hooks {
        Hooks::none()
    }
}

impl ProgressFactory for NoProgress {
    fn pending(&self, _release: &Release) -> Box<dyn ReleaseProgress> {
        Box::new(NoProgress)
    }
}

/// Writer that reports every chunk written through it.
pub struct ObservedWriter<W> {
    inner: W,
    observer: Option<Box<dyn StreamObserver>>,
}

impl<W: Write> ObservedWriter<W> {
    pub fn new(inner: W, observer: Option<Box<dyn StreamObserver>>) -> Self {
        Self { inner, observer }
    }

    /// Signal the end of the stream to the observer and return the inner writer.
    pub fn finish(mut self) -> W {
        if let Some(observer) = self.observer.as_mut() {
            observer.finish();
        }
        self.inner
    }
}

impl<W: Write> Write for ObservedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        if let Some(observer) = self.observer.as_mut() {
            observer.observe(&buf[..n]);
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Reader that reports every chunk read through it.
pub struct ObservedReader<R> {
    inner: R,
    observer: Option<Box<dyn StreamObserver>>,
    done: bool,
}

impl<R: Read> ObservedReader<R> {
    pub fn new(inner: R, observer: Option<Box<dyn StreamObserver>>) -> Self {
        Self {
            inner,
            observer,
            done: false,
        }
    }
}

impl<R: Read> Read for ObservedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if let Some(observer) = self.observer.as_mut() {
            if n > 0 {
                observer.observe(&buf[..n]);
            } else if !buf.is_empty() && !self.done {
                self.done = true;
                observer.finish();
            }
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counter {
        bytes: Arc<AtomicU64>,
        finished: Arc<AtomicUsize>,
    }

    impl StreamObserver for Counter {
        fn observe(&mut self, chunk: &[u8]) {
            self.bytes.fetch_add(chunk.len() as u64, Ordering::Relaxed);
        }

        fn finish(&mut self) {
            self.finished.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn counter() -> (Counter, Arc<AtomicU64>, Arc<AtomicUsize>) {
        let bytes = Arc::new(AtomicU64::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        (
            Counter {
                bytes: Arc::clone(&bytes),
                finished: Arc::clone(&finished),
            },
            bytes,
            finished,
        )
    }

    #[test]
    fn observed_reader_preserves_bytes() {
        let data: Vec<u8> = (0u8..=255).cycle().take(10_000).collect();
        let (c, bytes, finished) = counter();
        let mut out = Vec::new();
        let mut reader = ObservedReader::new(&data[..], Some(Box::new(c)));
        io::copy(&mut reader, &mut out).unwrap();
        assert_eq!(out, data);
        assert_eq!(bytes.load(Ordering::Relaxed), data.len() as u64);
        assert_eq!(finished.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn observed_writer_preserves_bytes() {
        let data = b"release payload".to_vec();
        let (c, bytes, finished) = counter();
        let mut writer = ObservedWriter::new(Vec::new(), Some(Box::new(c)));
        writer.write_all(&data).unwrap();
        assert_eq!(writer.finish(), data);
        assert_eq!(bytes.load(Ordering::Relaxed), data.len() as u64);
        assert_eq!(finished.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn absent_observer_passes_through() {
        let mut out = Vec::new();
        let mut reader = ObservedReader::new(&b"abc"[..], None);
        io::copy(&mut reader, &mut out).unwrap();
        assert_eq!(out, b"abc");
    }
}
