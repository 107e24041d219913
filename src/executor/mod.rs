//! Serialized Task Executor
//!
//! Ordered, single-flight execution of work on a dedicated thread.
//!
//! # Architecture
//!
//! ```text
//! caller threads                        executor thread ("power", "general")
//! ━━━━━━━━━━━━━━                        ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//!
//! ExecutorHandle::submit(f) ──Job──>    run_executor_loop(state)
//!        │                                 │
//!        │                                 ├─ job(&mut state)
//!        │                                 └─ result ──┐
//!        │                                             │
//!   TaskHandle::wait_timeout() <───────────────────────┘
//! ```
//!
//! The executor thread owns a piece of state `S` and hands every job a
//! `&mut S`. The power state machine lives here, so its current state is only
//! ever touched from one thread and needs no lock of its own.
//!
//! Jobs run strictly in submission order. Delayed jobs (`post_after`) are
//! queued when their delay expires and are ordered relative to whatever is
//! queued at that moment.

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

use crate::error::{Result, ScreenError};

type Job<S> = Box<dyn FnOnce(&mut S) + Send>;

enum Message<S> {
    Run(Job<S>),
    Shutdown,
}

/// Cloneable submission side of a [`SerialExecutor`]
pub struct ExecutorHandle<S> {
    name: Arc<str>,
    thread: ThreadId,
    tx: Sender<Message<S>>,
}

impl<S> Clone for ExecutorHandle<S> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            thread: self.thread,
            tx: self.tx.clone(),
        }
    }
}

impl<S> fmt::Debug for ExecutorHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorHandle")
            .field("name", &self.name)
            .finish()
    }
}

impl<S: 'static> ExecutorHandle<S> {
    /// Executor name (also the thread name)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the calling thread is this executor's thread
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread
    }

    /// Queue a unit of work and get a handle to its result
    pub fn submit<R, F>(&self, f: F) -> TaskHandle<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut S) -> R + Send + 'static,
    {
        let (result_tx, result_rx) = bounded(1);
        let job: Job<S> = Box::new(move |state| {
            // The waiter may have given up already
            let _ = result_tx.send(f(state));
        });
        if self.tx.send(Message::Run(job)).is_err() {
            debug!("Submit to closed executor '{}'", self.name);
        }
        TaskHandle {
            name: Arc::clone(&self.name),
            rx: result_rx,
        }
    }

    /// Queue fire-and-forget work; returns `false` if the executor is closed
    pub fn post<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        match self.tx.send(Message::Run(Box::new(f))) {
            Ok(()) => true,
            Err(_) => {
                debug!("Post to closed executor '{}'", self.name);
                false
            }
        }
    }

    /// Queue work after a delay
    pub fn post_after<F>(&self, delay: Duration, f: F) -> bool
    where
        F: FnOnce(&mut S) + Send + 'static,
        S: Send,
    {
        let handle = self.clone();
        let spawned = thread::Builder::new()
            .name(format!("{}-timer", self.name))
            .spawn(move || {
                thread::sleep(delay);
                trace!("Timer fired on '{}' after {:?}", handle.name, delay);
                handle.post(f);
            });
        match spawned {
            Ok(_) => true,
            Err(e) => {
                warn!("Failed to spawn timer for '{}': {}", self.name, e);
                false
            }
        }
    }
}

/// Pending result of a submitted job
#[must_use = "a task handle does nothing unless waited on"]
pub struct TaskHandle<R> {
    name: Arc<str>,
    rx: Receiver<R>,
}

impl<R> TaskHandle<R> {
    /// Block until the job has run
    ///
    /// # Errors
    ///
    /// Returns `ExecutorClosed` if the executor shut down before running it.
    pub fn wait(self) -> Result<R> {
        self.rx
            .recv()
            .map_err(|_| ScreenError::ExecutorClosed(self.name.to_string()))
    }

    /// Block until the job has run or `timeout` expires
    ///
    /// On timeout the job still runs later; only the result is dropped.
    pub fn wait_timeout(self, timeout: Duration) -> Result<R> {
        self.rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => ScreenError::Timeout(timeout),
            RecvTimeoutError::Disconnected => ScreenError::ExecutorClosed(self.name.to_string()),
        })
    }
}

/// Dedicated thread owning `S` and running jobs in order
pub struct SerialExecutor<S: 'static> {
    handle: ExecutorHandle<S>,
    thread_handle: Option<JoinHandle<()>>,
}

impl<S: Send + 'static> SerialExecutor<S> {
    /// Spawn the executor thread
    ///
    /// # Arguments
    ///
    /// * `name` - Thread name, used in logs and errors
    /// * `state` - State owned by the thread and passed to each job
    ///
    /// # Errors
    ///
    /// Returns `ExecutorClosed` if the thread cannot be spawned
    pub fn new(name: &str, state: S) -> Result<Self> {
        let (tx, rx) = unbounded::<Message<S>>();
        let thread_name = name.to_string();
        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_executor_loop(&thread_name, state, rx))
            .map_err(|e| {
                error!("Failed to spawn executor '{}': {}", name, e);
                ScreenError::ExecutorClosed(name.to_string())
            })?;

        info!("Executor '{}' started", name);
        Ok(Self {
            handle: ExecutorHandle {
                name: Arc::from(name),
                thread: thread_handle.thread().id(),
                tx,
            },
            thread_handle: Some(thread_handle),
        })
    }

    /// Cloneable submission handle
    pub fn handle(&self) -> ExecutorHandle<S> {
        self.handle.clone()
    }

    /// Stop accepting work, finish queued jobs and join the thread
    pub fn shutdown(&mut self) {
        let Some(thread_handle) = self.thread_handle.take() else {
            return;
        };
        let _ = self.handle.tx.send(Message::Shutdown);
        if self.handle.is_current() {
            // Dropped from one of its own jobs; the loop exits on its own
            return;
        }
        if thread_handle.join().is_err() {
            error!("Executor '{}' panicked", self.handle.name);
        }
    }
}

impl<S: 'static> Deref for SerialExecutor<S> {
    type Target = ExecutorHandle<S>;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

impl<S: 'static> Drop for SerialExecutor<S> {
    fn drop(&mut self) {
        if let Some(thread_handle) = self.thread_handle.take() {
            let _ = self.handle.tx.send(Message::Shutdown);
            if !self.handle.is_current() && thread_handle.join().is_err() {
                error!("Executor '{}' panicked", self.handle.name);
            }
        }
    }
}

fn run_executor_loop<S>(name: &str, mut state: S, rx: Receiver<Message<S>>) {
    debug!("Executor '{}' loop running", name);
    while let Ok(message) = rx.recv() {
        match message {
            Message::Run(job) => job(&mut state),
            Message::Shutdown => break,
        }
    }
    info!("Executor '{}' stopped", name);
}
