// ABOUTME: Scripted runtime for testing - plays back a configured startup scenario.
// ABOUTME: Allows deterministic handshake tests without embedding a real engine.

use crate::runtime::{EngineRuntime, HostContext, MethodCallback, DEFAULT_READY_METHOD};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;
use uuid::Uuid;

/// When the scripted engine signals readiness.
#[derive(Debug, Clone, Copy)]
enum ReadySignal {
    /// The ready method is never invoked.
    Never,
    /// Invoked synchronously while handling the entry-point call.
    OnEntry,
    /// Invoked after a delay, from an engine-internal thread.
    AfterDelay(Duration),
}

/// How the scripted engine's event loop behaves.
#[derive(Debug, Clone, Copy)]
enum LoopBehavior {
    /// The loop returns as soon as it is entered.
    ReturnImmediately,
    /// The loop returns after a fixed delay.
    ReturnAfter(Duration),
    /// The loop blocks until the engine is asked to exit via the probe.
    UntilExitRequested,
}

/// Configuration accepted by the registry factory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptedConfig {
    /// Signal readiness this long after the entry call. Absent means never.
    #[serde(default)]
    pub ready_after_ms: Option<u64>,
    /// Keep the loop alive this long. Absent means return immediately.
    #[serde(default)]
    pub loop_for_ms: Option<u64>,
}

struct ProbeState {
    initialized: AtomicBool,
    entry_calls: AtomicUsize,
    stopped: AtomicBool,
    exit_requested: Mutex<bool>,
    exit_condvar: Condvar,
}

/// Shared view into a scripted runtime's recorded interactions.
///
/// Stays valid after the runtime itself has been handed to a coordinator.
#[derive(Clone)]
pub struct RuntimeProbe {
    state: Arc<ProbeState>,
}

impl RuntimeProbe {
    pub fn initialized(&self) -> bool {
        self.state.initialized.load(Ordering::SeqCst)
    }

    pub fn entry_calls(&self) -> usize {
        self.state.entry_calls.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> bool {
        self.state.stopped.load(Ordering::SeqCst)
    }

    /// Make the engine loop return, as if the engine decided to terminate.
    pub fn request_loop_exit(&self) {
        let mut exit = self
            .state
            .exit_requested
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *exit = true;
        self.state.exit_condvar.notify_all();
    }
}

/// Scripted engine runtime with builder-style scenario setup.
pub struct ScriptedRuntime {
    ready: ReadySignal,
    ready_method: String,
    loop_behavior: LoopBehavior,
    fail_initialize: Option<String>,
    methods: HashMap<String, MethodCallback>,
    state: Arc<ProbeState>,
}

impl ScriptedRuntime {
    /// Create a runtime that never signals readiness and whose loop returns
    /// immediately. Scenario methods adjust from there.
    pub fn new() -> Self {
        Self {
            ready: ReadySignal::Never,
            ready_method: DEFAULT_READY_METHOD.to_string(),
            loop_behavior: LoopBehavior::ReturnImmediately,
            fail_initialize: None,
            methods: HashMap::new(),
            state: Arc::new(ProbeState {
                initialized: AtomicBool::new(false),
                entry_calls: AtomicUsize::new(0),
                stopped: AtomicBool::new(false),
                exit_requested: Mutex::new(false),
                exit_condvar: Condvar::new(),
            }),
        }
    }

    /// Signal readiness synchronously while handling the entry call.
    pub fn ready_on_entry(mut self) -> Self {
        self.ready = ReadySignal::OnEntry;
        self
    }

    /// Signal readiness after a delay, from an engine-internal thread.
    pub fn ready_after(mut self, delay: Duration) -> Self {
        self.ready = ReadySignal::AfterDelay(delay);
        self
    }

    /// Never signal readiness (the default, spelled out for readable tests).
    pub fn never_ready(mut self) -> Self {
        self.ready = ReadySignal::Never;
        self
    }

    /// Which registered method the engine script invokes for its ready
    /// signal. Defaults to the standard name.
    pub fn signals_method(mut self, name: &str) -> Self {
        self.ready_method = name.to_string();
        self
    }

    /// Keep the loop alive until [`RuntimeProbe::request_loop_exit`].
    pub fn loop_until_exit_requested(mut self) -> Self {
        self.loop_behavior = LoopBehavior::UntilExitRequested;
        self
    }

    /// Keep the loop alive for a fixed duration.
    pub fn loop_returns_after(mut self, delay: Duration) -> Self {
        self.loop_behavior = LoopBehavior::ReturnAfter(delay);
        self
    }

    /// Fail `initialize` with the given message.
    pub fn fail_initialize(mut self, message: &str) -> Self {
        self.fail_initialize = Some(message.to_string());
        self
    }

    /// Probe handle for assertions after the runtime has been handed off.
    pub fn probe(&self) -> RuntimeProbe {
        RuntimeProbe {
            state: Arc::clone(&self.state),
        }
    }

    /// Factory function for the registry.
    pub fn factory() -> crate::registry::RuntimeFactory {
        Box::new(|config| {
            let cfg: ScriptedConfig = serde_json::from_value(config.clone())?;
            let mut runtime = ScriptedRuntime::new();
            if let Some(ms) = cfg.ready_after_ms {
                runtime = runtime.ready_after(Duration::from_millis(ms));
            }
            if let Some(ms) = cfg.loop_for_ms {
                runtime = runtime.loop_returns_after(Duration::from_millis(ms));
            }
            Ok(Box::new(runtime))
        })
    }

    fn fire_ready(&self) {
        if matches!(self.ready, ReadySignal::Never) {
            return;
        }
        let Some(callback) = self.methods.get(&self.ready_method) else {
            tracing::warn!(method = %self.ready_method, "Script called an unregistered method");
            return;
        };
        match self.ready {
            ReadySignal::Never => {}
            ReadySignal::OnEntry => {
                let correlation_id = Uuid::new_v4().to_string();
                callback(&[], &correlation_id);
            }
            ReadySignal::AfterDelay(delay) => {
                let callback = Arc::clone(callback);
                thread::spawn(move || {
                    thread::sleep(delay);
                    let correlation_id = Uuid::new_v4().to_string();
                    callback(&[], &correlation_id);
                });
            }
        }
    }
}

impl Default for ScriptedRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineRuntime for ScriptedRuntime {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn initialize(&mut self, host: &HostContext) -> Result<()> {
        if let Some(message) = &self.fail_initialize {
            bail!("Scripted initialization failure: {}", message);
        }
        tracing::debug!(app_id = %host.app_id, "Scripted engine initialized");
        self.state.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn register_method(&mut self, name: &str, callback: MethodCallback) {
        self.methods.insert(name.to_string(), callback);
    }

    fn call_method(&mut self, name: &str, _args: &[Value]) -> Result<()> {
        tracing::debug!(method = %name, "Scripted engine entry invoked");
        self.state.entry_calls.fetch_add(1, Ordering::SeqCst);
        self.fire_ready();
        Ok(())
    }

    fn run_loop(&mut self) -> Result<()> {
        match self.loop_behavior {
            LoopBehavior::ReturnImmediately => {}
            LoopBehavior::ReturnAfter(delay) => thread::sleep(delay),
            LoopBehavior::UntilExitRequested => {
                let mut exit = self
                    .state
                    .exit_requested
                    .lock()
                    .unwrap_or_else(|e| e.into_inner());
                while !*exit {
                    exit = self
                        .state
                        .exit_condvar
                        .wait(exit)
                        .unwrap_or_else(|e| e.into_inner());
                }
            }
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.state.stopped.store(true, Ordering::SeqCst);
        // Wake a loop that is still parked, in case stop ever races it.
        let mut exit = self
            .state
            .exit_requested
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *exit = true;
        self.state.exit_condvar.notify_all();
    }
}
