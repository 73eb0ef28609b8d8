// ABOUTME: Hosts an embedded engine on a dedicated worker thread.
// ABOUTME: Coordinates the startup handshake between the engine and its waiters.

pub mod config;
pub mod coordinator;
pub mod handshake;
pub mod registry;
pub mod runtime;
pub mod runtimes;
pub mod service;

pub use config::Config;
pub use coordinator::{CoordinatorOptions, EngineCoordinator};
pub use handshake::{Handshake, HandshakeOutcome};
pub use registry::{RuntimeFactory, RuntimeRegistry};
pub use runtime::{EngineRuntime, HostContext, MethodCallback};
pub use service::EngineService;
