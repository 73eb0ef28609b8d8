// ABOUTME: Host-side supervisor that owns the engine worker thread.
// ABOUTME: Creates the shared handshake state and watches worker liveness during startup.

use crate::config::{Config, HandshakeConfig};
use crate::coordinator::EngineCoordinator;
use crate::handshake::{Handshake, HandshakeOutcome};
use crate::registry::RuntimeRegistry;
use crate::runtime::{EngineRuntime, HostContext};
use anyhow::{bail, Result};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Interval between liveness checks while waiting for the engine to come up.
const SUPERVISION_TICK: Duration = Duration::from_millis(50);

/// Owns one engine worker and supervises its startup handshake.
///
/// The handshake flags alone cannot distinguish "still initializing" from
/// "worker died before the give-up path", so startup waits are interleaved
/// with liveness checks on the worker thread.
pub struct EngineService {
    handshake: Handshake,
    coordinator: EngineCoordinator,
    worker: Option<JoinHandle<Result<()>>>,
    startup_timeout: Duration,
}

impl std::fmt::Debug for EngineService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineService")
            .field("worker_started", &self.worker.is_some())
            .field("startup_timeout", &self.startup_timeout)
            .finish_non_exhaustive()
    }
}

impl EngineService {
    pub fn new(
        runtime: Box<dyn EngineRuntime>,
        host: HostContext,
        handshake_config: HandshakeConfig,
    ) -> Self {
        let handshake = Handshake::new();
        let coordinator = EngineCoordinator::new(
            handshake.clone(),
            runtime,
            host,
            handshake_config.options.clone(),
        );
        Self {
            handshake,
            coordinator,
            worker: None,
            startup_timeout: handshake_config.startup_timeout(),
        }
    }

    /// Build a service from config, resolving the runtime through the registry.
    pub fn from_config(config: &Config, registry: &RuntimeRegistry) -> Result<Self> {
        let runtime = registry.create_from_config(&config.runtime)?;
        Ok(Self::new(
            runtime,
            config.host.clone(),
            config.handshake.clone(),
        ))
    }

    /// Start the engine worker. Errors if already started.
    pub fn start(&mut self) -> Result<()> {
        if self.worker.is_some() {
            bail!("engine service already started");
        }
        self.worker = Some(self.coordinator.start()?);
        Ok(())
    }

    /// Block until the engine publishes an outcome, the worker dies, or the
    /// startup timeout expires.
    ///
    /// A worker that dies before the give-up path (a catastrophic
    /// initialization failure) would leave a bare condition wait blocked
    /// forever; here it surfaces as an error instead.
    pub fn wait_until_ready(&mut self) -> Result<HandshakeOutcome> {
        if self.worker.is_none() {
            bail!("engine service not started");
        }
        let deadline = Instant::now() + self.startup_timeout;
        loop {
            if let Some(outcome) = self.handshake.wait_ready_timeout(SUPERVISION_TICK) {
                return Ok(outcome);
            }
            let worker_finished = self
                .worker
                .as_ref()
                .is_some_and(|worker| worker.is_finished());
            if worker_finished && !self.handshake.is_ready() {
                // The thread is gone and the give-up path never ran.
                return match self.join() {
                    Ok(()) => bail!("engine worker exited without completing the handshake"),
                    Err(e) => Err(e.context("engine worker died during startup")),
                };
            }
            if Instant::now() >= deadline {
                bail!(
                    "engine did not signal readiness within {:?}",
                    self.startup_timeout
                );
            }
        }
    }

    /// Handshake handle for additional observers.
    pub fn handshake(&self) -> Handshake {
        self.handshake.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.handshake.is_ready()
    }

    pub fn is_broken(&self) -> bool {
        self.handshake.is_broken()
    }

    /// Reap the worker thread, surfacing abnormal termination.
    pub fn join(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        match worker.join() {
            Ok(result) => result,
            Err(_) => bail!("engine worker panicked"),
        }
    }
}
