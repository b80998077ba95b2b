//! Runtime lifecycle manager
//!
//! Owns the single live [`ScriptRuntime`] and moves it through
//! `Uninitialized → Initializing → Ready → ShuttingDown → Uninitialized`.
//!
//! # Concurrency
//!
//! - Concurrent [`init`](RuntimeLifecycle::init) callers share one attempt:
//!   the first caller leads, the rest wait on a `watch` channel for its
//!   outcome.
//! - A cancelled init or shutdown resets the state to `Uninitialized`.
//! - The state lock is never held across an `.await`.

use super::event_relay::EventRelay;
use super::load_modules::ModuleLoader;
use crate::ports::host::HostFacade;
use crate::ports::script_runtime::{ScriptError, ScriptRuntime, ScriptRuntimeFactory};
use luaext_domain::{ExecutionContext, LoadBatch, LoadReport, ScriptValue, UserScript};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Observable phase of the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Uninitialized,
    Initializing,
    Ready,
    ShuttingDown,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::ShuttingDown => "shutting down",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("Lua runtime is not initialized")]
    NotInitialized,

    #[error("Lua runtime is busy ({0})")]
    Busy(LifecyclePhase),

    #[error("failed to initialize Lua runtime: {0}")]
    Initialization(String),

    #[error(transparent)]
    Script(#[from] ScriptError),
}

type InitOutcome = Option<Result<(), LifecycleError>>;

struct ActiveRuntime {
    runtime: Arc<dyn ScriptRuntime>,
    relay: EventRelay,
}

enum State {
    Uninitialized,
    Initializing(watch::Receiver<InitOutcome>),
    Ready(ActiveRuntime),
    ShuttingDown,
}

impl State {
    fn phase(&self) -> LifecyclePhase {
        match self {
            Self::Uninitialized => LifecyclePhase::Uninitialized,
            Self::Initializing(_) => LifecyclePhase::Initializing,
            Self::Ready(_) => LifecyclePhase::Ready,
            Self::ShuttingDown => LifecyclePhase::ShuttingDown,
        }
    }
}

enum InitTicket {
    Done,
    Wait(watch::Receiver<InitOutcome>),
    Lead(watch::Sender<InitOutcome>),
}

/// Puts the state back to `Uninitialized` if a transition is abandoned.
struct ResetGuard<'a> {
    state: &'a Mutex<State>,
    armed: bool,
}

impl ResetGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ResetGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("Lifecycle transition abandoned; resetting to uninitialized");
            *self.state.lock().unwrap_or_else(PoisonError::into_inner) = State::Uninitialized;
        }
    }
}

/// Manages the single embedded runtime instance.
pub struct RuntimeLifecycle {
    host: Arc<dyn HostFacade>,
    factory: Arc<dyn ScriptRuntimeFactory>,
    loader: ModuleLoader,
    core_manifest: LoadBatch,
    state: Mutex<State>,
}

impl RuntimeLifecycle {
    pub fn new(
        host: Arc<dyn HostFacade>,
        factory: Arc<dyn ScriptRuntimeFactory>,
        loader: ModuleLoader,
        core_manifest: LoadBatch,
    ) -> Self {
        Self {
            host,
            factory,
            loader,
            core_manifest,
            state: Mutex::new(State::Uninitialized),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.lock_state().phase()
    }

    pub fn is_ready(&self) -> bool {
        self.phase() == LifecyclePhase::Ready
    }

    /// The live runtime, if ready.
    pub fn runtime(&self) -> Result<Arc<dyn ScriptRuntime>, LifecycleError> {
        match &*self.lock_state() {
            State::Ready(active) => Ok(active.runtime.clone()),
            _ => Err(LifecycleError::NotInitialized),
        }
    }

    /// Bring the runtime up. A no-op when already ready.
    pub async fn init(&self) -> Result<(), LifecycleError> {
        let ticket = {
            let mut state = self.lock_state();
            match &*state {
                State::Ready(_) => InitTicket::Done,
                State::Initializing(rx) => InitTicket::Wait(rx.clone()),
                State::ShuttingDown => {
                    return Err(LifecycleError::Busy(LifecyclePhase::ShuttingDown));
                }
                State::Uninitialized => {
                    let (tx, rx) = watch::channel(None);
                    *state = State::Initializing(rx);
                    InitTicket::Lead(tx)
                }
            }
        };

        match ticket {
            InitTicket::Done => Ok(()),
            InitTicket::Wait(mut rx) => match rx.wait_for(Option::is_some).await {
                Ok(outcome) => match &*outcome {
                    Some(result) => result.clone(),
                    None => Ok(()),
                },
                Err(_) => Err(LifecycleError::Initialization(
                    "initialization was cancelled".to_string(),
                )),
            },
            InitTicket::Lead(tx) => {
                let guard = ResetGuard {
                    state: &self.state,
                    armed: true,
                };
                let outcome = match self.initialize().await {
                    Ok(active) => {
                        *self.lock_state() = State::Ready(active);
                        info!("Lua runtime ready");
                        Ok(())
                    }
                    Err(e) => {
                        *self.lock_state() = State::Uninitialized;
                        warn!("Lua runtime initialization failed: {}", e);
                        Err(e)
                    }
                };
                guard.disarm();
                let _ = tx.send(Some(outcome.clone()));
                outcome
            }
        }
    }

    async fn initialize(&self) -> Result<ActiveRuntime, LifecycleError> {
        let flags = self.host.capability_flags();
        info!(capabilities = ?flags.enabled(), "Initializing Lua runtime");

        let runtime = self
            .factory
            .create(flags)
            .map_err(|e| LifecycleError::Initialization(e.to_string()))?;

        let core = match self.loader.load(runtime.as_ref(), &self.core_manifest).await {
            Ok(report) => report,
            Err(e) => {
                runtime.close().await;
                return Err(LifecycleError::Initialization(e.to_string()));
            }
        };
        log_report("core", &core);

        if self.host.global_scripts_enabled() {
            let batch = UserScript::batch(&self.host.user_scripts());
            match self.loader.load(runtime.as_ref(), &batch).await {
                Ok(report) => log_report("user", &report),
                Err(e) => {
                    runtime.close().await;
                    return Err(LifecycleError::Initialization(e.to_string()));
                }
            }
        } else {
            debug!("User scripts disabled; skipping");
        }

        let relay = EventRelay::start(self.host.as_ref(), runtime.clone());
        Ok(ActiveRuntime { runtime, relay })
    }

    /// Run `source` in the live runtime. Never creates one.
    pub async fn execute(
        &self,
        source: &str,
        chunk_name: &str,
        context: &ExecutionContext,
    ) -> Result<ScriptValue, LifecycleError> {
        let runtime = self.runtime()?;
        Ok(runtime.execute(source, chunk_name, context).await?)
    }

    /// Tear the runtime down: stop the relay, then close the runtime.
    pub async fn shutdown(&self) -> Result<(), LifecycleError> {
        let active = {
            let mut state = self.lock_state();
            match std::mem::replace(&mut *state, State::ShuttingDown) {
                State::Ready(active) => active,
                State::Uninitialized => {
                    *state = State::Uninitialized;
                    return Err(LifecycleError::NotInitialized);
                }
                other => {
                    let phase = other.phase();
                    *state = other;
                    return Err(LifecycleError::Busy(phase));
                }
            }
        };

        info!("Shutting down Lua runtime");
        let guard = ResetGuard {
            state: &self.state,
            armed: true,
        };
        active.relay.stop().await;
        active.runtime.close().await;
        *self.lock_state() = State::Uninitialized;
        guard.disarm();
        info!("Lua runtime shut down");
        Ok(())
    }

    /// Shut down (when ready) and initialize again, picking up new flags.
    pub async fn reload(&self) -> Result<(), LifecycleError> {
        match self.shutdown().await {
            Ok(()) | Err(LifecycleError::NotInitialized) => {}
            Err(e) => return Err(e),
        }
        self.init().await
    }
}

fn log_report(label: &str, report: &LoadReport) {
    debug!(
        loaded = report.loaded().len(),
        skipped = report.skipped().len(),
        "Loaded {} units",
        label
    );
}
