// ABOUTME: Registry pattern for runtime selection by name.
// ABOUTME: Runtimes register factories; hosts create them from config.

use crate::runtime::EngineRuntime;
use anyhow::{anyhow, Result};
use serde_json::Value;
use std::collections::HashMap;

/// Factory function that creates an engine runtime from config
pub type RuntimeFactory = Box<dyn Fn(&Value) -> Result<Box<dyn EngineRuntime>> + Send + Sync>;

/// Registry for runtime selection
pub struct RuntimeRegistry {
    factories: HashMap<String, RuntimeFactory>,
}

impl RuntimeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a runtime factory by name
    pub fn register<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn(&Value) -> Result<Box<dyn EngineRuntime>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
        self
    }

    /// Create a runtime by name with the given config
    pub fn create(&self, name: &str, config: &Value) -> Result<Box<dyn EngineRuntime>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| anyhow!("Unknown runtime: {}", name))?;
        factory(config)
    }

    /// List available runtime names
    pub fn available(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    /// Create a runtime from a RuntimeConfig
    pub fn create_from_config(
        &self,
        config: &crate::config::RuntimeConfig,
    ) -> Result<Box<dyn EngineRuntime>> {
        let json_config = config.to_json_value();
        self.create(config.runtime_type(), &json_config)
    }
}

impl Default for RuntimeRegistry {
    fn default() -> Self {
        use crate::runtimes::scripted::ScriptedRuntime;

        Self::new().register("scripted", ScriptedRuntime::factory())
    }
}
