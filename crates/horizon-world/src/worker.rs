//! Bounded background worker pool for generation jobs.
//!
//! The pool knows nothing about chunks or detail levels. Each job pairs a
//! work closure with a completion closure; the completion runs on the worker
//! right after the work and is expected to hand the result off to a
//! [`DispatchQueue`](crate::dispatch::DispatchQueue) rather than touch
//! owner-thread state.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use horizon_common::{ConfigError, GenerationError, HorizonResult};
use tracing::{debug, warn};

/// A queued job. Called with `true` on a worker; called with `false` when
/// the job can no longer be scheduled, in which case it only reports
/// [`GenerationError::PoolShutDown`].
type Job = Box<dyn FnOnce(bool) + Send + 'static>;

/// Fixed-size pool of generation threads fed by an unbounded job queue.
pub struct GenerationWorkerPool {
    job_sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    in_flight: Arc<AtomicUsize>,
}

impl GenerationWorkerPool {
    /// Spawns `num_workers` threads.
    pub fn new(num_workers: usize) -> HorizonResult<Self> {
        if num_workers == 0 {
            return Err(ConfigError::NoWorkers.into());
        }

        let (job_sender, job_receiver) = crossbeam_channel::unbounded::<Job>();
        let mut workers = Vec::with_capacity(num_workers);

        for index in 0..num_workers {
            let receiver = job_receiver.clone();
            let handle = std::thread::Builder::new()
                .name(format!("horizon-worker-{index}"))
                .spawn(move || Self::process_jobs(&receiver))?;
            workers.push(handle);
        }

        debug!("Started {num_workers} generation workers");

        Ok(Self {
            job_sender: Some(job_sender),
            workers,
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Spawns one worker per available core.
    pub fn with_default_threads() -> HorizonResult<Self> {
        Self::new(default_worker_count())
    }

    fn process_jobs(receiver: &Receiver<Job>) {
        while let Ok(job) = receiver.recv() {
            job(true);
        }
    }

    /// Schedules `work` on a worker thread.
    ///
    /// `on_complete` receives the result on that same worker; the job counts
    /// as in flight until it returns. A panic inside
    /// `work` is reported as [`GenerationError::WorkerPanicked`]; the worker
    /// keeps running. Never blocks.
    pub fn submit<T, W, C>(&self, work: W, on_complete: C)
    where
        T: Send + 'static,
        W: FnOnce() -> Result<T, GenerationError> + Send + 'static,
        C: FnOnce(Result<T, GenerationError>) + Send + 'static,
    {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let in_flight = Arc::clone(&self.in_flight);

        let job: Job = Box::new(move |execute| {
            let result = if execute {
                panic::catch_unwind(AssertUnwindSafe(work))
                    .unwrap_or_else(|payload| Err(GenerationError::WorkerPanicked(panic_message(&*payload))))
            } else {
                Err(GenerationError::PoolShutDown)
            };
            on_complete(result);
            in_flight.fetch_sub(1, Ordering::AcqRel);
        });

        let rejected = match &self.job_sender {
            Some(sender) => sender.send(job).err().map(|err| err.into_inner()),
            None => Some(job),
        };
        if let Some(job) = rejected {
            warn!("Generation job submitted after worker shutdown");
            job(false);
        }
    }

    /// Jobs submitted whose completion callback has not returned yet.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Number of worker threads.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }
}

impl Drop for GenerationWorkerPool {
    fn drop(&mut self) {
        // Closing the queue lets workers finish what is queued, then exit.
        self.job_sender.take();
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("Generation worker exited by panic");
            }
        }
    }
}

impl std::fmt::Debug for GenerationWorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationWorkerPool")
            .field("workers", &self.workers.len())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

/// Worker count used when none is configured.
#[must_use]
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism().map_or(2, std::num::NonZeroUsize::get)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_zero_workers_rejected() {
        assert!(GenerationWorkerPool::new(0).is_err());
    }

    #[test]
    fn test_work_runs_off_caller_thread() {
        let pool = GenerationWorkerPool::new(2).expect("pool");
        let (tx, rx) = crossbeam_channel::unbounded();
        let caller = std::thread::current().id();

        pool.submit(
            move || Ok(std::thread::current().id()),
            move |result| {
                let _ = tx.send(result);
            },
        );

        let worker = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("completion")
            .expect("work succeeded");
        assert_ne!(worker, caller);
    }

    #[test]
    fn test_panic_becomes_error_and_worker_survives() {
        let pool = GenerationWorkerPool::new(1).expect("pool");
        let (tx, rx) = crossbeam_channel::unbounded();

        let tx1 = tx.clone();
        pool.submit(
            || -> Result<u32, GenerationError> { panic!("boom") },
            move |result| {
                let _ = tx1.send(result);
            },
        );
        pool.submit(
            || Ok(7u32),
            move |result| {
                let _ = tx.send(result);
            },
        );

        let first = rx.recv_timeout(Duration::from_secs(5)).expect("first");
        let second = rx.recv_timeout(Duration::from_secs(5)).expect("second");
        assert_eq!(first, Err(GenerationError::WorkerPanicked("boom".into())));
        assert_eq!(second, Ok(7));
    }

    #[test]
    fn test_drop_drains_queued_jobs() {
        let (tx, rx) = crossbeam_channel::unbounded();
        {
            let pool = GenerationWorkerPool::new(1).expect("pool");
            for i in 0..8u32 {
                let tx = tx.clone();
                pool.submit(
                    move || Ok(i),
                    move |result| {
                        let _ = tx.send(result);
                    },
                );
            }
        }
        assert_eq!(rx.try_iter().count(), 8);
    }

    #[test]
    fn test_in_flight_covers_completion_callback() {
        let pool = GenerationWorkerPool::new(1).expect("pool");
        let (entered_tx, entered_rx) = crossbeam_channel::unbounded();
        let (release_tx, release_rx) = crossbeam_channel::unbounded::<()>();
        let (done_tx, done_rx) = crossbeam_channel::unbounded();

        pool.submit(
            || Ok(3u32),
            move |result| {
                let _ = entered_tx.send(());
                let _ = release_rx.recv_timeout(Duration::from_secs(5));
                let _ = done_tx.send(result);
            },
        );

        entered_rx.recv_timeout(Duration::from_secs(5)).expect("callback started");
        assert_eq!(pool.in_flight(), 1);
        assert!(done_rx.try_recv().is_err());

        release_tx.send(()).expect("release");
        assert_eq!(done_rx.recv_timeout(Duration::from_secs(5)).expect("done"), Ok(3));
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while pool.in_flight() > 0 && std::time::Instant::now() < deadline {
            std::thread::yield_now();
        }
        assert_eq!(pool.in_flight(), 0);
    }
}
