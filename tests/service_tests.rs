// ABOUTME: Tests for EngineService startup supervision.
// ABOUTME: Covers ready/broken outcomes, dead-worker detection, and config wiring.

use engine_host::config::{Config, HandshakeConfig};
use engine_host::handshake::HandshakeOutcome;
use engine_host::registry::RuntimeRegistry;
use engine_host::runtime::HostContext;
use engine_host::runtimes::scripted::ScriptedRuntime;
use engine_host::service::EngineService;
use std::time::Duration;

fn host() -> HostContext {
    HostContext {
        app_id: "test.app".to_string(),
        data_dir: None,
    }
}

fn handshake_config(startup_timeout_secs: u64) -> HandshakeConfig {
    HandshakeConfig {
        startup_timeout_secs,
        ..HandshakeConfig::default()
    }
}

#[test]
fn test_wait_until_ready_reports_ready() {
    let runtime = ScriptedRuntime::new()
        .ready_after(Duration::from_millis(5))
        .loop_until_exit_requested();
    let probe = runtime.probe();
    let mut service = EngineService::new(Box::new(runtime), host(), handshake_config(5));

    service.start().unwrap();
    assert_eq!(service.wait_until_ready().unwrap(), HandshakeOutcome::Ready);
    assert!(service.is_ready());
    assert!(!service.is_broken());

    probe.request_loop_exit();
    service.join().unwrap();
}

#[test]
fn test_wait_until_ready_reports_broken() {
    let runtime = ScriptedRuntime::new();
    let mut service = EngineService::new(Box::new(runtime), host(), handshake_config(5));

    service.start().unwrap();
    assert_eq!(service.wait_until_ready().unwrap(), HandshakeOutcome::Broken);
    assert!(service.is_broken());
    service.join().unwrap();
}

#[test]
fn test_dead_worker_surfaces_as_error() {
    // Initialization fails catastrophically, so the worker dies before the
    // give-up path. A bare condition wait would block forever; supervision
    // has to report the death instead.
    let runtime = ScriptedRuntime::new().fail_initialize("no engine available");
    let mut service = EngineService::new(Box::new(runtime), host(), handshake_config(5));

    service.start().unwrap();
    let err = service.wait_until_ready().unwrap_err();
    assert!(err.to_string().contains("died during startup"));
    assert!(!service.is_ready());
}

#[test]
fn test_startup_timeout_when_engine_stalls() {
    // The loop neither returns nor signals readiness. The coordinator never
    // cancels it; the supervised timeout is what unblocks the host.
    let runtime = ScriptedRuntime::new().loop_until_exit_requested();
    let probe = runtime.probe();
    let mut service = EngineService::new(Box::new(runtime), host(), handshake_config(1));

    service.start().unwrap();
    let err = service.wait_until_ready().unwrap_err();
    assert!(err.to_string().contains("did not signal readiness"));

    // Once the engine finally exits its loop, the give-up path still settles
    // the flags for any remaining observer.
    probe.request_loop_exit();
    service.join().unwrap();
    assert!(service.is_ready());
    assert!(service.is_broken());
}

#[test]
fn test_second_start_is_rejected() {
    let runtime = ScriptedRuntime::new().loop_until_exit_requested();
    let probe = runtime.probe();
    let mut service = EngineService::new(Box::new(runtime), host(), handshake_config(5));

    service.start().unwrap();
    let err = service.start().unwrap_err();
    assert!(err.to_string().contains("already started"));

    probe.request_loop_exit();
    service.join().unwrap();
}

#[test]
fn test_wait_before_start_errors() {
    let runtime = ScriptedRuntime::new();
    let mut service = EngineService::new(Box::new(runtime), host(), handshake_config(5));
    let err = service.wait_until_ready().unwrap_err();
    assert!(err.to_string().contains("not started"));
}

#[test]
fn test_additional_observers_share_the_handshake() {
    let runtime = ScriptedRuntime::new()
        .ready_on_entry()
        .loop_until_exit_requested();
    let probe = runtime.probe();
    let mut service = EngineService::new(Box::new(runtime), host(), handshake_config(5));

    let observer = service.handshake();
    let watcher = std::thread::spawn(move || observer.wait_ready());

    service.start().unwrap();
    assert_eq!(service.wait_until_ready().unwrap(), HandshakeOutcome::Ready);
    assert_eq!(watcher.join().unwrap(), HandshakeOutcome::Ready);

    probe.request_loop_exit();
    service.join().unwrap();
}

#[test]
fn test_from_config_with_registry() {
    let config = Config::parse(
        r#"
[runtime]
type = "scripted"
ready_after_ms = 1
loop_for_ms = 200

[host]
app_id = "test.app"

[handshake]
startup_timeout_secs = 5
"#,
    )
    .unwrap();

    let registry = RuntimeRegistry::default();
    let mut service = EngineService::from_config(&config, &registry).unwrap();

    service.start().unwrap();
    assert_eq!(service.wait_until_ready().unwrap(), HandshakeOutcome::Ready);
    service.join().unwrap();
    assert!(!service.is_broken());
}

#[test]
fn test_from_config_unknown_runtime() {
    let config = Config::parse(
        r#"
[runtime]
type = "jscore"

[host]
app_id = "test.app"
"#,
    )
    .unwrap();

    let registry = RuntimeRegistry::default();
    let err = EngineService::from_config(&config, &registry).unwrap_err();
    assert!(err.to_string().contains("Unknown runtime: jscore"));
}
