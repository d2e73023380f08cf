//! Bounded worker pool running pack units over all releases.
//!
//! `parallel` worker threads pull [`WorkItem`]s from a job queue. Results go
//! to a bounded channel; the first failure goes to a single-slot error
//! channel and stops the worker that hit it. The collector waits for one
//! result per release and returns as soon as an error shows up, without
//! waiting for units still in flight.

use crossbeam::channel::{self, Receiver, Sender};
use std::io::{Seek, Write};
use std::thread;

use crate::error::DispatchError;
use crate::instrument::{ProgressFactory, ReleaseProgress};
use crate::packer::Packer;
use crate::patch::PatchOp;
use crate::release::Release;

/// Capacity of the result channel.
const RESULT_CAPACITY: usize = 10;

/// A release paired with its pending progress handle; consumed by one worker.
pub struct WorkItem {
    pub release: Release,
    pub progress: Box<dyn ReleaseProgress>,
}

/// Process every release with at most `parallel` units running at once.
///
/// Returns the patch ops of all packed releases in completion order (skipped
/// releases contribute none), or the first error any worker reported.
pub fn dispatch<W>(
    packer: &Packer<W>,
    releases: &[Release],
    parallel: usize,
    progress: &dyn ProgressFactory,
) -> Result<Vec<PatchOp>, DispatchError>
where
    W: Write + Seek + Send + 'static,
{
    let expected = releases.len();
    if expected == 0 {
        return Ok(Vec::new());
    }

    // Placeholders first, in manifest order, so observers see all pending work.
    let items: Vec<WorkItem> = releases
        .iter()
        .map(|release| WorkItem {
            release: release.clone(),
            progress: progress.pending(release),
        })
        .collect();

    // Sized to hold every job so queuing never blocks, even if all workers fail.
    let (jobs_tx, jobs_rx) = channel::bounded::<WorkItem>(expected);
    let (results_tx, results_rx) = channel::bounded::<Option<PatchOp>>(RESULT_CAPACITY);
    let (errors_tx, errors_rx) = channel::bounded::<DispatchError>(1);

    let num_workers = parallel.max(1).min(expected);
    tracing::info!(releases = expected, workers = num_workers, "dispatching releases");

    let mut handles = Vec::with_capacity(num_workers);
    for id in 0..num_workers {
        let packer = packer.clone();
        let jobs = jobs_rx.clone();
        let results = results_tx.clone();
        let errors = errors_tx.clone();
        let handle = thread::Builder::new()
            .name(format!("brd-worker-{}", id))
            .spawn(move || worker(id, packer, jobs, results, errors))
            .map_err(DispatchError::Spawn)?;
        handles.push(handle);
    }
    drop(jobs_rx);
    drop(results_tx);
    drop(errors_tx);

    for item in items {
        if jobs_tx.send(item).is_err() {
            tracing::debug!("all workers gone before queueing finished");
            break;
        }
    }
    drop(jobs_tx);

    let ops = collect(expected, &results_rx, &errors_rx)?;

    for h in handles {
        if h.join().is_err() {
            tracing::warn!("worker panicked after delivering its results");
        }
    }
    Ok(ops)
}

fn worker<W: Write + Seek>(
    id: usize,
    packer: Packer<W>,
    jobs: Receiver<WorkItem>,
    results: Sender<Option<PatchOp>>,
    errors: Sender<DispatchError>,
) {
    for mut item in jobs.iter() {
        let name = item.release.name.clone();
        tracing::info!(worker = id, release = %name, "processing release");
        match packer.process(&item.release, &mut *item.progress) {
            Ok(op) => {
                tracing::info!(worker = id, release = %name, packed = op.is_some(), "release done");
                if results.send(op).is_err() {
                    // collector already returned
                    break;
                }
            }
            Err(source) => {
                item.progress.failed();
                tracing::error!(worker = id, release = %name, error = %source, "release failed");
                let err = DispatchError::Release { name, source };
                if let Err(dropped) = errors.try_send(err) {
                    tracing::debug!(error = %dropped.into_inner(), "another failure already reported");
                }
                break;
            }
        }
    }
}

fn collect(
    expected: usize,
    results: &Receiver<Option<PatchOp>>,
    errors: &Receiver<DispatchError>,
) -> Result<Vec<PatchOp>, DispatchError> {
    // a reported failure wins over the disconnect it causes
    let lost = |received| match errors.try_recv() {
        Ok(err) => err,
        Err(_) => DispatchError::WorkersLost { received, expected },
    };
    let mut ops = Vec::with_capacity(expected);

    for received in 0..expected {
        let result = crossbeam::select! {
            recv(results) -> msg => msg.map_err(|_| lost(received))?,
            recv(errors) -> msg => match msg {
                Ok(err) => return Err(err),
                // every worker has exited cleanly; drain what they sent
                Err(_) => results.recv().map_err(|_| lost(received))?,
            },
        };
        if let Some(op) = result {
            ops.push(op);
        }
    }
    Ok(ops)
}
