//! Loop runner implementation - drives an event loop on a dedicated thread.
//!
//! The LoopRunner owns a single-threaded tokio runtime. `run` moves the
//! runtime onto a worker thread which drives it until the stop signal is
//! raised; `stop` raises the signal and joins the worker.

use std::any::Any;
use std::future::Future;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::watch;

use super::signal::{self, StopSignal};
use super::state::LoopState;
use crate::dump::{DumpSource, LineSink};
use crate::error::{MeshloopError, Result};
use crate::logging::{LogCrateSink, LogLevel, LogSink, LoopLogger};

const LOCATION: &str = "meshloop::runner";

/// Configuration for the LoopRunner.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopRunnerConfig {
    /// Name given to the worker thread
    pub thread_name: String,
    /// Verbosity registered for loop logging at init
    pub log_level: LogLevel,
    /// Worker thread stack size in bytes; the platform default when unset
    pub stack_size: Option<usize>,
}

impl Default for LoopRunnerConfig {
    fn default() -> Self {
        Self {
            thread_name: "meshloop-loop".to_string(),
            log_level: LogLevel::Trace,
            stack_size: None,
        }
    }
}

impl LoopRunnerConfig {
    /// Create a config with a custom worker thread name
    pub fn new(thread_name: impl Into<String>) -> Self {
        Self {
            thread_name: thread_name.into(),
            ..Self::default()
        }
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }
}

struct Inner {
    state: LoopState,
    runtime: Option<Runtime>,
    spawner: Option<Handle>,
    stop_signal: Option<StopSignal>,
    worker: Option<JoinHandle<()>>,
    // Kept after the handle is taken so a stop issued from the loop is still recognized.
    worker_id: Option<ThreadId>,
}

/// Runs a background event loop on its own thread.
///
/// Lifecycle: `init` -> `run` -> `stop`. All three take `&self`, so the
/// runner can be shared behind an `Arc` between controlling threads. Work is
/// queued with `spawn` or `post` and only ever executes on the worker thread.
///
/// Concurrent `stop` calls are serialized: the first performs the join, the
/// others wait for it to finish and then get an already-stopped error.
pub struct LoopRunner {
    config: LoopRunnerConfig,
    logger: LoopLogger,
    inner: Mutex<Inner>,
    transition: Condvar,
}

impl LoopRunner {
    /// Create an uninitialized runner writing loop logs to `sink`.
    pub fn new(config: LoopRunnerConfig, sink: Arc<dyn LogSink>) -> Self {
        let logger = LoopLogger::new(sink, config.log_level);
        Self {
            config,
            logger,
            inner: Mutex::new(Inner {
                state: LoopState::Uninitialized,
                runtime: None,
                spawner: None,
                stop_signal: None,
                worker: None,
                worker_id: None,
            }),
            transition: Condvar::new(),
        }
    }

    /// Create an uninitialized runner that logs through the `log` facade.
    pub fn with_config(config: LoopRunnerConfig) -> Self {
        Self::new(config, Arc::new(LogCrateSink))
    }

    /// Create the event-processing context and the stop signal.
    ///
    /// Registers loop logging at the configured verbosity. No thread is
    /// created.
    pub fn init(&self) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.state != LoopState::Uninitialized {
            return Err(MeshloopError::InvalidState(format!(
                "init called on a loop that is {}",
                inner.state
            )));
        }

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| MeshloopError::Runtime(format!("failed to build event loop: {}", e)))?;

        self.logger.set_level(self.config.log_level);
        inner.spawner = Some(runtime.handle().clone());
        inner.runtime = Some(runtime);
        inner.stop_signal = Some(StopSignal::new());
        inner.state = LoopState::Initialized;

        log::debug!("Initialized event loop (log level {})", self.config.log_level);
        Ok(())
    }

    /// Spawn the worker thread and return immediately.
    pub fn run(&self) -> Result<()> {
        let mut inner = self.lock()?;
        match inner.state {
            LoopState::Initialized => {}
            LoopState::Uninitialized => {
                return Err(MeshloopError::InvalidState("run called before init".to_string()));
            }
            LoopState::Running => {
                return Err(MeshloopError::InvalidState("loop is already running".to_string()));
            }
            other => {
                return Err(MeshloopError::InvalidState(format!("cannot run a loop that is {}", other)));
            }
        }

        let stop_rx = inner
            .stop_signal
            .as_ref()
            .map(StopSignal::subscribe)
            .ok_or_else(|| MeshloopError::InvalidState("stop signal missing".to_string()))?;
        let runtime = inner
            .runtime
            .take()
            .ok_or_else(|| MeshloopError::InvalidState("event loop missing".to_string()))?;

        let worker = LoopWorker {
            runtime,
            stop_rx,
            logger: self.logger.clone(),
        };

        let mut builder = thread::Builder::new().name(self.config.thread_name.clone());
        if let Some(bytes) = self.config.stack_size {
            builder = builder.stack_size(bytes);
        }

        match builder.spawn(move || worker.drive()) {
            Ok(handle) => {
                tracing::info!(thread = %self.config.thread_name, "Loop thread spawned");
                inner.worker_id = Some(handle.thread().id());
                inner.worker = Some(handle);
                inner.state = LoopState::Running;
                Ok(())
            }
            Err(e) => {
                // The runtime went down with the closure; nothing left to run.
                tracing::error!(thread = %self.config.thread_name, error = %e, "Loop thread spawn failed");
                inner.spawner = None;
                inner.state = LoopState::Poisoned;
                Err(MeshloopError::Spawn(e))
            }
        }
    }

    /// Signal the loop to stop and block until the worker thread has exited.
    ///
    /// On a join failure the error is logged and returned, and the runner is
    /// left `Poisoned`.
    pub fn stop(&self) -> Result<()> {
        let (worker, stop_signal) = {
            let mut inner = self.lock()?;
            // The loop thread must never wait on a join of itself.
            if inner.worker_id == Some(thread::current().id()) {
                return Err(MeshloopError::InvalidState(
                    "stop called from the loop thread".to_string(),
                ));
            }
            while inner.state == LoopState::Stopping {
                inner = self
                    .transition
                    .wait(inner)
                    .map_err(|_| MeshloopError::InvalidState("loop lock poisoned".to_string()))?;
            }

            match inner.state {
                LoopState::Running => {}
                LoopState::Stopped => {
                    return Err(MeshloopError::InvalidState("loop already stopped".to_string()));
                }
                other => {
                    return Err(MeshloopError::InvalidState(format!("cannot stop a loop that is {}", other)));
                }
            }

            let worker = inner
                .worker
                .take()
                .ok_or_else(|| MeshloopError::InvalidState("worker thread missing".to_string()))?;
            let stop_signal = inner
                .stop_signal
                .clone()
                .ok_or_else(|| MeshloopError::InvalidState("stop signal missing".to_string()))?;

            inner.spawner = None;
            inner.state = LoopState::Stopping;
            (worker, stop_signal)
        };

        stop_signal.raise();
        let joined = worker.join();

        // Waiters on `transition` must always be released, poisoned or not.
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let result = match joined {
            Ok(()) => {
                tracing::info!(thread = %self.config.thread_name, "Loop thread joined");
                inner.state = LoopState::Stopped;
                Ok(())
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                self.logger.log(
                    LogLevel::Error,
                    LOCATION,
                    format_args!("failed to join loop thread: {}", reason),
                );
                tracing::error!(thread = %self.config.thread_name, error = %reason, "Loop thread join failed");
                inner.state = LoopState::Poisoned;
                Err(MeshloopError::Join(reason))
            }
        };
        self.transition.notify_all();
        result
    }

    /// Queue a future onto the loop.
    ///
    /// Accepted while the runner is `Initialized` (executes once `run` starts
    /// the worker) or `Running`. Futures still pending when the loop stops
    /// are dropped before `stop` returns.
    pub fn spawn<F>(&self, future: F) -> Result<tokio::task::JoinHandle<F::Output>>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let inner = self.lock()?;
        match (&inner.spawner, inner.state.accepts_work()) {
            (Some(spawner), true) => Ok(spawner.spawn(future)),
            _ => Err(MeshloopError::InvalidState(format!(
                "cannot queue work on a loop that is {}",
                inner.state
            ))),
        }
    }

    /// Queue a callback to run on the loop thread.
    pub fn post<F>(&self, callback: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.spawn(async move { callback() }).map(|_| ())
    }

    pub fn state(&self) -> LoopState {
        self.inner
            .lock()
            .map(|inner| inner.state)
            .unwrap_or(LoopState::Poisoned)
    }

    pub fn is_running(&self) -> bool {
        self.state() == LoopState::Running
    }

    pub fn config(&self) -> &LoopRunnerConfig {
        &self.config
    }

    /// Logger the loop and its collaborators write through
    pub fn logger(&self) -> &LoopLogger {
        &self.logger
    }

    pub fn log_level(&self) -> LogLevel {
        self.logger.level()
    }

    /// Change loop log verbosity; takes effect immediately on the worker.
    pub fn set_log_level(&self, level: LogLevel) {
        self.logger.set_level(level);
        log::info!("Loop log level set to {}", level);
    }

    /// Number of tasks alive on the loop, if it has a runtime
    pub fn alive_tasks(&self) -> Option<usize> {
        self.lock()
            .ok()
            .and_then(|inner| inner.spawner.as_ref().map(|h| h.metrics().num_alive_tasks()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| MeshloopError::InvalidState("loop lock poisoned".to_string()))
    }
}

impl Default for LoopRunner {
    fn default() -> Self {
        Self::with_config(LoopRunnerConfig::default())
    }
}

impl Drop for LoopRunner {
    fn drop(&mut self) {
        let inner = match self.inner.get_mut() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(worker) = inner.worker.take() {
            if let Some(stop_signal) = &inner.stop_signal {
                stop_signal.raise();
            }
            if worker.thread().id() != thread::current().id() && worker.join().is_err() {
                log::error!("Loop thread panicked during drop");
            }
            inner.state = LoopState::Stopped;
        }

        // Never ran: tear down without blocking, we may be inside another runtime.
        if let Some(runtime) = inner.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

impl DumpSource for LoopRunner {
    fn dump(&self, out: &mut dyn LineSink) -> Result<()> {
        let level = self.log_level();
        out.line(&format!("loop state: {}", self.state()))?;
        out.line(&format!("loop thread: {}", self.config.thread_name))?;
        out.line(&format!("log level: {} ({})", level, level.code()))?;
        match self.config.stack_size {
            Some(bytes) => out.line(&format!("stack size: {} bytes", bytes))?,
            None => out.line("stack size: default")?,
        }
        if let Some(tasks) = self.alive_tasks() {
            out.line(&format!("alive tasks: {}", tasks))?;
        }
        Ok(())
    }
}

/// Everything the worker thread owns.
struct LoopWorker {
    runtime: Runtime,
    stop_rx: watch::Receiver<bool>,
    logger: LoopLogger,
}

impl LoopWorker {
    fn drive(self) {
        let LoopWorker { runtime, stop_rx, logger } = self;

        logger.log(LogLevel::Info, LOCATION, format_args!("event loop started"));
        runtime.block_on(signal::raised(stop_rx));
        // Dropping waits for the blocking pool, so no loop work outlives the join.
        drop(runtime);
        logger.log(LogLevel::Info, LOCATION, format_args!("event loop stopped"));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "loop thread panicked".to_string()
    }
}
