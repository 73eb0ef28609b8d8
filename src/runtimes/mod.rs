// ABOUTME: Built-in engine runtime implementations.
// ABOUTME: Real engines plug in through the EngineRuntime trait; scripted is for tests.

pub mod scripted;
