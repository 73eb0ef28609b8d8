// ABOUTME: Drives the engine worker thread and publishes the ready/broken outcome.
// ABOUTME: Exactly one start per coordinator; waiters observe results via the handshake.

use crate::handshake::Handshake;
use crate::runtime::{
    EngineRuntime, HostContext, MethodCallback, DEFAULT_ENTRY_POINT, DEFAULT_READY_METHOD,
};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use uuid::Uuid;

/// Wire-level names of the engine startup contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorOptions {
    /// Entry point invoked after method registration.
    #[serde(default = "default_entry_point")]
    pub entry_point: String,
    /// Method the engine invokes to signal readiness.
    #[serde(default = "default_ready_method")]
    pub ready_method: String,
}

fn default_entry_point() -> String {
    DEFAULT_ENTRY_POINT.to_string()
}

fn default_ready_method() -> String {
    DEFAULT_READY_METHOD.to_string()
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            entry_point: default_entry_point(),
            ready_method: default_ready_method(),
        }
    }
}

/// Coordinates one startup handshake for one engine worker.
///
/// The runtime handle is owned exclusively by the worker for its entire
/// lifetime; waiters only ever see the handshake flags. There is no restart:
/// a new handshake requires a new coordinator and fresh shared state.
pub struct EngineCoordinator {
    handshake: Handshake,
    host: HostContext,
    options: CoordinatorOptions,
    runtime: Mutex<Option<Box<dyn EngineRuntime>>>,
    worker_id: Uuid,
}

impl EngineCoordinator {
    /// Create a coordinator over initiator-supplied shared state.
    pub fn new(
        handshake: Handshake,
        runtime: Box<dyn EngineRuntime>,
        host: HostContext,
        options: CoordinatorOptions,
    ) -> Self {
        Self {
            handshake,
            host,
            options,
            runtime: Mutex::new(Some(runtime)),
            worker_id: Uuid::new_v4(),
        }
    }

    /// Spawn the engine worker thread.
    ///
    /// Callable at most once: a second call (or a call after the worker has
    /// terminated) fails and leaves the first handshake's outcome untouched.
    pub fn start(&self) -> Result<JoinHandle<Result<()>>> {
        let runtime = self
            .runtime
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(runtime) = runtime else {
            bail!("engine worker already started");
        };

        let handshake = self.handshake.clone();
        let host = self.host.clone();
        let options = self.options.clone();
        let worker_id = self.worker_id;

        thread::Builder::new()
            .name("engine-worker".to_string())
            .spawn(move || {
                let result = run_worker(&handshake, runtime, &host, &options, worker_id);
                if let Err(ref e) = result {
                    tracing::error!(worker_id = %worker_id, error = %e, "Engine worker terminated abnormally");
                }
                result
            })
            .context("Failed to spawn engine worker thread")
    }

    /// Non-blocking read of the ready flag.
    pub fn is_ready(&self) -> bool {
        self.handshake.is_ready()
    }

    /// Non-blocking read of the broken flag. Meaningful only once
    /// `is_ready()` is true.
    pub fn is_broken(&self) -> bool {
        self.handshake.is_broken()
    }

    pub fn worker_id(&self) -> Uuid {
        self.worker_id
    }
}

/// Worker body: initialize the engine, arm the ready callback, drive the
/// engine loop to completion, then settle the final flags.
///
/// An `Err` anywhere here is the abnormal-termination path: the flags are
/// left untouched and the host's liveness supervision is expected to notice
/// the dead thread. Lock release needs no bookkeeping since every access to
/// the shared state is a scoped acquisition.
fn run_worker(
    handshake: &Handshake,
    mut runtime: Box<dyn EngineRuntime>,
    host: &HostContext,
    options: &CoordinatorOptions,
    worker_id: Uuid,
) -> Result<()> {
    runtime
        .initialize(host)
        .context("Engine initialization failed")?;

    let ready = handshake.clone();
    let callback: MethodCallback = Arc::new(move |_params: &[Value], _correlation_id: &str| {
        // Publish and notify, nothing else. The engine may deliver this on
        // any thread, and calling back into it here risks reentrancy.
        ready.signal_ready();
    });
    runtime.register_method(&options.ready_method, callback);

    tracing::debug!(worker_id = %worker_id, runtime = runtime.name(), entry = %options.entry_point, "Starting engine");
    runtime
        .call_method(&options.entry_point, &[])
        .context("Engine entry point call failed")?;
    runtime.run_loop().context("Engine loop failed")?;

    // The loop came back. If the callback never fired, every waiter still
    // has to unblock, so mark the handshake complete but broken.
    if handshake.give_up() {
        tracing::error!(worker_id = %worker_id, "Engine failed to signal control ready");
    }

    runtime.stop();
    tracing::info!(worker_id = %worker_id, broken = handshake.is_broken(), "Engine worker finished");
    Ok(())
}
