// ABOUTME: Trait seam for the opaque embedded engine runtime.
// ABOUTME: Defines initialize/register/call/loop/stop plus the host context handle.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// Entry point invoked inside the engine to kick off startup.
pub const DEFAULT_ENTRY_POINT: &str = "runEngine";

/// Method the engine invokes back on the host once initialization succeeded.
pub const DEFAULT_READY_METHOD: &str = "controlReady";

/// Callback invocable from the engine side, with an ordered list of opaque
/// parameters plus a correlation id.
///
/// The engine may deliver this on an arbitrary thread, including internal
/// threads the host never sees.
pub type MethodCallback = Arc<dyn Fn(&[Value], &str) + Send + Sync>;

/// Host environment handle passed to the engine at initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostContext {
    /// Application identifier the engine runs under.
    pub app_id: String,
    /// Directory the engine may use for its own storage.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Opaque embedded engine runtime.
///
/// Implementations own their internal scheduling entirely. The coordinator
/// only drives this narrow surface and never assumes which thread a
/// registered callback will arrive on.
pub trait EngineRuntime: Send {
    /// Runtime name for logging and registry lookup.
    fn name(&self) -> &'static str;

    /// One-time setup. Must precede all other calls.
    fn initialize(&mut self, host: &HostContext) -> Result<()>;

    /// Register a named callback invocable from the engine side.
    fn register_method(&mut self, name: &str, callback: MethodCallback);

    /// Invoke a named entry point inside the engine's own code.
    fn call_method(&mut self, name: &str, args: &[Value]) -> Result<()>;

    /// Run the engine's event loop, blocking until the engine decides to
    /// terminate. This may not return for the lifetime of the process.
    fn run_loop(&mut self) -> Result<()>;

    /// Tear the engine down. Safe to call even if initialization never
    /// completed.
    fn stop(&mut self);
}
