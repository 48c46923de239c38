// Copyright 2026 the Frameflip Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Manual-reset event with bounded waits.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// A flag one thread sets and another waits on.
///
/// The event stays signaled until [`reset`](Self::reset), so a waiter that
/// arrives after [`set`](Self::set) returns immediately.
#[derive(Debug, Default)]
pub struct Event {
    signaled: Mutex<bool>,
    cond: Condvar,
}

impl Event {
    /// Creates an unsignaled event.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals the event and wakes every waiter.
    pub fn set(&self) {
        *self.signaled.lock() = true;
        self.cond.notify_all();
    }

    /// Clears the signal.
    pub fn reset(&self) {
        *self.signaled.lock() = false;
    }

    /// Returns `true` if the event is signaled.
    #[must_use]
    pub fn is_set(&self) -> bool {
        *self.signaled.lock()
    }

    /// Waits up to `timeout` for the signal. Returns `true` if signaled.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut signaled = self.signaled.lock();
        while !*signaled {
            if self.cond.wait_until(&mut signaled, deadline).timed_out() {
                return *signaled;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn wait_times_out_when_unsignaled() {
        let event = Event::new();
        assert!(!event.wait(Duration::from_millis(5)));
    }

    #[test]
    fn signal_before_wait_is_observed() {
        let event = Event::new();
        event.set();
        assert!(event.wait(Duration::ZERO), "manual reset keeps the signal");
        event.reset();
        assert!(!event.is_set());
    }

    #[test]
    fn set_from_another_thread_wakes_waiter() {
        let event = Arc::new(Event::new());
        let setter = Arc::clone(&event);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(5));
            setter.set();
        });
        assert!(event.wait(Duration::from_secs(5)));
        handle.join().expect("setter thread exits cleanly");
    }
}
