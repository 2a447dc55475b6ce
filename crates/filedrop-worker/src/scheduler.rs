//! Periodic scheduler for named maintenance tasks.
//!
//! Each registered task gets its own loop on the tokio runtime. A loop waits
//! for the task's start delay, then invokes the action once per period.
//! Invocations of the same task never overlap: if one overruns its period the
//! next tick is pushed back rather than stacked. Every invocation runs in its
//! own spawned task so that an error or a panic is logged and the task stays
//! scheduled. A manual [`PeriodicScheduler::trigger`] waits for any in-flight
//! tick of the same task before it runs, and vice versa.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use filedrop_core::error::AppError;
use filedrop_core::result::AppResult;

use crate::task::{JobExecutionError, ScheduledAction};

/// Lifecycle of a [`PeriodicScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Tasks may be registered; nothing runs yet.
    Created,
    /// Task loops are active.
    Running,
    /// Stopped for good. A stopped scheduler cannot be restarted.
    Stopped,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

#[derive(Debug, Clone)]
struct TaskDefinition {
    name: String,
    action: Arc<dyn ScheduledAction>,
    period: Duration,
    start_delay: Duration,
    /// Held for the whole of one invocation. Shared across re-registration.
    gate: Arc<AsyncMutex<()>>,
}

#[derive(Debug)]
struct RunningTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

#[derive(Debug)]
struct Inner {
    state: SchedulerState,
    runtime: Option<Handle>,
    tasks: BTreeMap<String, TaskDefinition>,
    running: BTreeMap<String, RunningTask>,
}

/// Runs named actions on fixed intervals until stopped.
#[derive(Debug)]
pub struct PeriodicScheduler {
    inner: Mutex<Inner>,
    /// How long `stop` waits for in-flight invocations
    shutdown_grace: Duration,
}

impl PeriodicScheduler {
    /// Create a scheduler in the [`SchedulerState::Created`] state.
    pub fn new(shutdown_grace: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: SchedulerState::Created,
                runtime: None,
                tasks: BTreeMap::new(),
                running: BTreeMap::new(),
            }),
            shutdown_grace,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SchedulerState {
        self.lock().state
    }

    /// Names of all registered tasks, sorted.
    pub fn task_names(&self) -> Vec<String> {
        self.lock().tasks.keys().cloned().collect()
    }

    /// Register a task, replacing any task with the same name.
    ///
    /// When the scheduler is running the replaced task's loop is cancelled
    /// and the new one starts immediately, honouring its start delay.
    pub fn register(
        &self,
        name: impl Into<String>,
        action: Arc<dyn ScheduledAction>,
        period: Duration,
        start_delay: Duration,
    ) -> AppResult<()> {
        let name = name.into();
        if period.is_zero() {
            return Err(AppError::validation(format!(
                "Task '{name}' must have a non-zero period"
            )));
        }

        let mut inner = self.lock();
        let gate = inner
            .tasks
            .get(&name)
            .map(|d| Arc::clone(&d.gate))
            .unwrap_or_default();

        let definition = TaskDefinition {
            name: name.clone(),
            action,
            period,
            start_delay,
            gate,
        };

        let replaced = inner.tasks.insert(name.clone(), definition.clone()).is_some();

        if let Some(old) = inner.running.remove(&name) {
            let _ = old.shutdown.send(true);
        }
        if inner.state == SchedulerState::Running {
            if let Some(runtime) = inner.runtime.clone() {
                let task = spawn_task(&runtime, definition);
                inner.running.insert(name.clone(), task);
            }
        }

        tracing::info!(
            "{} scheduled task '{}' (every {:?}, first run after {:?})",
            if replaced { "Replaced" } else { "Registered" },
            name,
            period,
            start_delay
        );
        Ok(())
    }

    /// Start every registered task loop.
    pub async fn start(&self) -> AppResult<()> {
        let mut inner = self.lock();
        if inner.state != SchedulerState::Created {
            return Err(AppError::invalid_state(format!(
                "Cannot start scheduler in state '{}'",
                inner.state
            )));
        }

        let runtime = Handle::current();
        let definitions: Vec<TaskDefinition> = inner.tasks.values().cloned().collect();
        for definition in definitions {
            let name = definition.name.clone();
            let task = spawn_task(&runtime, definition);
            inner.running.insert(name, task);
        }

        inner.runtime = Some(runtime);
        inner.state = SchedulerState::Running;
        tracing::info!("Scheduler started with {} task(s)", inner.running.len());
        Ok(())
    }

    /// Stop all task loops and wait for in-flight invocations.
    ///
    /// No new invocation begins once this is called. Invocations already
    /// running are awaited for up to the shutdown grace period.
    pub async fn stop(&self) -> AppResult<()> {
        let running = {
            let mut inner = self.lock();
            if inner.state != SchedulerState::Running {
                return Err(AppError::invalid_state(format!(
                    "Cannot stop scheduler in state '{}'",
                    inner.state
                )));
            }
            inner.state = SchedulerState::Stopped;
            inner.runtime = None;
            std::mem::take(&mut inner.running)
        };

        tracing::info!("Stopping scheduler, signalling {} task(s)", running.len());

        let mut handles = Vec::with_capacity(running.len());
        for (_, task) in running {
            let _ = task.shutdown.send(true);
            handles.push(task.handle);
        }

        match time::timeout(self.shutdown_grace, futures::future::join_all(handles)).await {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result {
                        tracing::error!("Scheduled task loop ended abnormally: {}", e);
                    }
                }
                tracing::info!("Scheduler stopped");
            }
            Err(_) => {
                tracing::warn!(
                    "Scheduler stop timed out after {:?}; abandoning in-flight invocations",
                    self.shutdown_grace
                );
            }
        }
        Ok(())
    }

    /// Run a registered task once, right now, outside its schedule.
    pub async fn trigger(&self, name: &str) -> AppResult<Option<Value>> {
        let (action, gate) = self
            .lock()
            .tasks
            .get(name)
            .map(|d| (Arc::clone(&d.action), Arc::clone(&d.gate)))
            .ok_or_else(|| AppError::not_found(format!("No scheduled task named '{name}'")))?;

        match invoke(name, &gate, action).await {
            Ok(summary) => Ok(summary),
            Err(InvocationFailure::Failed(e)) => Err(match e {
                JobExecutionError::Internal(err) => err,
                other => AppError::internal(other.to_string()),
            }),
            Err(InvocationFailure::Panicked(msg)) => Err(AppError::internal(format!(
                "Task '{name}' panicked: {msg}"
            ))),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn spawn_task(runtime: &Handle, definition: TaskDefinition) -> RunningTask {
    let (shutdown, cancel) = watch::channel(false);
    let handle = runtime.spawn(run_loop(definition, cancel));
    RunningTask { shutdown, handle }
}

async fn run_loop(definition: TaskDefinition, mut cancel: watch::Receiver<bool>) {
    let first = time::Instant::now() + definition.start_delay;
    let mut ticker = time::interval_at(first, definition.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                // Shutdown is only observed between invocations.
                let _ = invoke(
                    &definition.name,
                    &definition.gate,
                    Arc::clone(&definition.action),
                )
                .await;
            }
        }
    }

    tracing::debug!("Task loop for '{}' exited", definition.name);
}

#[derive(Debug)]
enum InvocationFailure {
    Failed(JobExecutionError),
    Panicked(String),
}

/// Run one invocation in its own task and log the outcome.
async fn invoke(
    name: &str,
    gate: &AsyncMutex<()>,
    action: Arc<dyn ScheduledAction>,
) -> Result<Option<Value>, InvocationFailure> {
    let _turn = gate.lock().await;
    let started = Instant::now();
    let outcome = tokio::spawn(async move { action.run().await }).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(Ok(summary)) => {
            match &summary {
                Some(summary) => {
                    tracing::info!(task = name, elapsed_ms, %summary, "Scheduled task completed")
                }
                None => tracing::info!(task = name, elapsed_ms, "Scheduled task completed"),
            }
            Ok(summary)
        }
        Ok(Err(e)) => {
            match &e {
                JobExecutionError::Transient(msg) => {
                    tracing::warn!("Task '{}' failed (transient): {}", name, msg)
                }
                JobExecutionError::Permanent(msg) => {
                    tracing::error!("Task '{}' failed permanently: {}", name, msg)
                }
                JobExecutionError::Internal(err) => {
                    tracing::error!("Task '{}' internal error: {}", name, err)
                }
            }
            Err(InvocationFailure::Failed(e))
        }
        Err(join_err) => {
            let msg = if join_err.is_panic() {
                panic_message(join_err.into_panic())
            } else {
                join_err.to_string()
            };
            tracing::error!("Task '{}' panicked: {}", name, msg);
            Err(InvocationFailure::Panicked(msg))
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
