//! Worker threads driving the listener and its connections.
//!
//! [`WorkerPool::start`] runs the serving task on a multi-thread runtime and
//! returns immediately; [`WorkerPool::run`] drives it on the calling thread.
//! Either way, [`StopHandle::stop`] ends it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info};

use crate::error::{ServerError, ServerResult};
use crate::shutdown::ShutdownSignal;

/// Name given to worker threads.
pub const WORKER_THREAD_NAME: &str = "critter-worker";

#[derive(Debug, Default)]
struct PoolState {
    runtime: Option<Runtime>,
    shutdown: Option<ShutdownSignal>,
}

impl PoolState {
    fn is_running(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|s| !s.is_shutdown())
    }
}

/// Stops a running pool from any thread, including from inside a handler.
#[derive(Debug, Clone)]
pub struct StopHandle {
    state: Arc<Mutex<PoolState>>,
}

impl StopHandle {
    /// Signals the serving task to stop. Idempotent.
    pub fn stop(&self) {
        if let Some(shutdown) = &self.state.lock().shutdown {
            shutdown.trigger();
        }
    }

    /// Whether a serving task is active and has not been asked to stop.
    pub fn is_running(&self) -> bool {
        self.state.lock().is_running()
    }
}

/// Owns the runtime used by [`WebServer`](crate::WebServer).
#[derive(Debug)]
pub(crate) struct WorkerPool {
    state: Arc<Mutex<PoolState>>,
    shutdown_timeout: Duration,
}

impl WorkerPool {
    pub(crate) fn new(shutdown_timeout: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(PoolState::default())),
            shutdown_timeout,
        }
    }

    pub(crate) fn stop_handle(&self) -> StopHandle {
        StopHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Starts `threads` workers (at least one) and spawns the task built by
    /// `make_task` on them. Returns without waiting.
    ///
    /// `make_task` is called with the runtime entered.
    pub(crate) fn start<F, Fut>(&self, threads: usize, make_task: F) -> ServerResult<()>
    where
        F: FnOnce(ShutdownSignal) -> ServerResult<Fut>,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let previous = {
            let mut state = self.state.lock();
            if state.is_running() {
                return Err(ServerError::AlreadyRunning);
            }
            state.runtime.take()
        };
        // The lock is not held while the old runtime joins.
        if let Some(previous) = previous {
            shutdown_runtime(previous, self.shutdown_timeout);
        }

        let threads = threads.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(threads)
            .thread_name(WORKER_THREAD_NAME)
            .enable_all()
            .build()
            .map_err(ServerError::Runtime)?;

        let shutdown = ShutdownSignal::new();
        let task = {
            let _guard = runtime.enter();
            make_task(shutdown.clone())
        };
        let task = match task {
            Ok(task) => task,
            Err(e) => {
                shutdown_runtime(runtime, self.shutdown_timeout);
                return Err(e);
            }
        };

        let mut state = self.state.lock();
        if state.is_running() {
            // Another caller started the pool while the old runtime was joined.
            drop(state);
            shutdown_runtime(runtime, self.shutdown_timeout);
            return Err(ServerError::AlreadyRunning);
        }
        runtime.spawn(task);

        info!(threads, "worker pool started");
        state.runtime = Some(runtime);
        state.shutdown = Some(shutdown);
        Ok(())
    }

    /// Runs the task built by `make_task` on the calling thread until it
    /// finishes, which happens after [`StopHandle::stop`].
    pub(crate) fn run<F, Fut>(&self, make_task: F) -> ServerResult<()>
    where
        F: FnOnce(ShutdownSignal) -> ServerResult<Fut>,
        Fut: Future<Output = ()>,
    {
        let shutdown = {
            let mut state = self.state.lock();
            if state.is_running() {
                return Err(ServerError::AlreadyRunning);
            }
            let shutdown = ShutdownSignal::new();
            state.shutdown = Some(shutdown.clone());
            shutdown
        };

        let runtime = match Builder::new_current_thread().enable_all().build() {
            Ok(runtime) => runtime,
            Err(e) => {
                shutdown.trigger();
                return Err(ServerError::Runtime(e));
            }
        };

        let task = {
            let _guard = runtime.enter();
            make_task(shutdown.clone())
        };
        let task = match task {
            Ok(task) => task,
            Err(e) => {
                shutdown.trigger();
                return Err(e);
            }
        };

        debug!("running on the calling thread");
        runtime.block_on(task);
        shutdown.trigger();
        shutdown_runtime(runtime, self.shutdown_timeout);
        Ok(())
    }

    pub(crate) fn stop(&self) {
        self.stop_handle().stop();
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        let runtime = {
            let mut state = self.state.lock();
            if let Some(shutdown) = &state.shutdown {
                shutdown.trigger();
            }
            state.runtime.take()
        };

        if let Some(runtime) = runtime {
            shutdown_runtime(runtime, self.shutdown_timeout);
            info!("worker pool stopped");
        }
    }
}

/// Joins the runtime's workers, waiting up to `timeout` for blocking tasks.
fn shutdown_runtime(runtime: Runtime, timeout: Duration) {
    if tokio::runtime::Handle::try_current().is_ok() {
        // Blocking is not allowed from inside another runtime.
        runtime.shutdown_background();
    } else {
        runtime.shutdown_timeout(timeout);
    }
}
