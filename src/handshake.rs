// ABOUTME: Shared ready/broken handshake state guarded by one mutex and condvar.
// ABOUTME: The worker is the sole writer; any number of waiters block on readiness.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// Final outcome of a startup handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// The engine signaled readiness itself.
    Ready,
    /// The engine loop exited without ever signaling readiness.
    Broken,
}

#[derive(Default)]
struct Flags {
    /// Monotonic: set once, never reset.
    control_ready: bool,
    /// Only ever set together with `control_ready`.
    broken: bool,
}

impl Flags {
    fn outcome(&self) -> HandshakeOutcome {
        if self.broken {
            HandshakeOutcome::Broken
        } else {
            HandshakeOutcome::Ready
        }
    }
}

/// Shared handshake state between one engine worker and any number of waiters.
///
/// Cloning yields another handle to the same lock/condition pair. The worker
/// publishes exactly one of the two outcomes; waiters only ever read the
/// flags, re-checking after every wake per the usual wait-loop discipline.
#[derive(Clone)]
pub struct Handshake {
    shared: Arc<(Mutex<Flags>, Condvar)>,
}

impl Handshake {
    pub fn new() -> Self {
        Self {
            shared: Arc::new((Mutex::new(Flags::default()), Condvar::new())),
        }
    }

    /// Non-blocking read of the ready flag. Safe to poll from any thread.
    pub fn is_ready(&self) -> bool {
        let (lock, _) = &*self.shared;
        lock.lock().unwrap_or_else(|e| e.into_inner()).control_ready
    }

    /// Non-blocking read of the broken flag.
    ///
    /// Meaningful only once `is_ready()` is true. Returns false before
    /// readiness is reached, so it cannot be read as "not yet known".
    pub fn is_broken(&self) -> bool {
        let (lock, _) = &*self.shared;
        lock.lock().unwrap_or_else(|e| e.into_inner()).broken
    }

    /// Block until the worker publishes an outcome.
    pub fn wait_ready(&self) -> HandshakeOutcome {
        let (lock, condvar) = &*self.shared;
        let mut flags = lock.lock().unwrap_or_else(|e| e.into_inner());
        while !flags.control_ready {
            flags = condvar.wait(flags).unwrap_or_else(|e| e.into_inner());
        }
        flags.outcome()
    }

    /// Timed variant of [`Handshake::wait_ready`]. Returns `None` if the
    /// timeout expires first; whether to re-wait, give up, or abandon the
    /// handshake is then the caller's decision.
    pub fn wait_ready_timeout(&self, timeout: Duration) -> Option<HandshakeOutcome> {
        let deadline = Instant::now() + timeout;
        let (lock, condvar) = &*self.shared;
        let mut flags = lock.lock().unwrap_or_else(|e| e.into_inner());
        while !flags.control_ready {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            let (guard, _) = condvar
                .wait_timeout(flags, remaining)
                .unwrap_or_else(|e| e.into_inner());
            flags = guard;
        }
        Some(flags.outcome())
    }

    /// Publish the genuine ready signal and wake all waiters.
    ///
    /// Invoked by the engine's callback on whatever thread the engine chooses.
    /// One-shot: a duplicate callback, or a callback arriving after the
    /// give-up path already ran, is a no-op.
    pub(crate) fn signal_ready(&self) {
        let (lock, condvar) = &*self.shared;
        let mut flags = lock.lock().unwrap_or_else(|e| e.into_inner());
        if flags.control_ready {
            return;
        }
        flags.control_ready = true;
        condvar.notify_all();
    }

    /// Publish the give-up outcome: the engine loop exited and readiness
    /// never came. Both flags are set under the lock, so no waiter can
    /// observe ready without broken in this scenario.
    ///
    /// Returns false (and changes nothing) if the callback won the race.
    pub(crate) fn give_up(&self) -> bool {
        let (lock, condvar) = &*self.shared;
        let mut flags = lock.lock().unwrap_or_else(|e| e.into_inner());
        if flags.control_ready {
            return false;
        }
        flags.control_ready = true;
        flags.broken = true;
        condvar.notify_all();
        true
    }
}

impl Default for Handshake {
    fn default() -> Self {
        Self::new()
    }
}
