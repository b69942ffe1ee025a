use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

/// Cooperative stop flag shared by every worker of a [`ReceiverPool`].
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }
}

struct Worker {
    name: String,
    thread: Option<thread::JoinHandle<()>>,
}

/// One dedicated thread per job, stopped and joined together.
///
/// Jobs are long-running loops (one per listening port). They receive the
/// pool's [`StopSignal`] and must return promptly once it is raised; the pool
/// joins every worker on [`shutdown`](Self::shutdown) or drop.
pub struct ReceiverPool {
    workers: Mutex<Vec<Worker>>,
    stop: StopSignal,
}

impl ReceiverPool {
    pub fn new() -> ReceiverPool {
        ReceiverPool {
            workers: Mutex::new(Vec::new()),
            stop: StopSignal::default(),
        }
    }

    /// Start `f` on a new named thread.
    ///
    /// Fails once the pool has been shut down.
    pub fn spawn<F>(&self, name: String, f: F) -> io::Result<()>
    where
        F: FnOnce(StopSignal) + Send + 'static,
    {
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        if self.stop.is_stopped() {
            return Err(io::Error::other("receiver pool is shut down"));
        }

        let stop = self.stop.clone();
        // Decoding recurses per array level; keep headroom over the default stack.
        let thread = thread::Builder::new()
            .name(name.clone())
            .stack_size(2 * 1024 * 1024)
            .spawn(move || f(stop))?;

        workers.push(Worker { name, thread: Some(thread) });
        Ok(())
    }

    /// Number of workers started and not yet joined.
    pub fn len(&self) -> usize {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_shut_down(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Raise the stop signal and join every worker.
    pub fn shutdown(&self) {
        let workers = {
            let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
            self.stop.stop();
            std::mem::take(&mut *workers)
        };

        for mut worker in workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    log::error!(target: "ReceiverPool", "worker {} panicked", worker.name);
                }
            }
        }
    }
}

impl Default for ReceiverPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ReceiverPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
