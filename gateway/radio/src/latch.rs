// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The one-shot, coalesced-wake interrupt latch shared between a radio's
//! hardware interrupt handler and its ingestor activity (§3 "Interrupt
//! signal", §9 "Interrupt latches").
//!
//! A plain `AtomicBool` is not enough on its own: the ingestor needs to
//! *wait* with a timeout (to observe shutdown promptly), not just poll. This
//! pairs the flag with a `Condvar` so `set` can wake a parked waiter, while
//! staying level-sensitive — a second `set()` that arrives while the first
//! is still being serviced is not lost, it simply causes the next wait to
//! return immediately.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// A one-shot latch: setting it is idempotent between consumptions, and a
/// consumer clears it before reading the radio, then acquires the bus.
#[derive(Default)]
pub struct Latch {
    signaled: Mutex<bool>,
    condvar: Condvar,
}

impl Latch {
    pub fn new() -> Self {
        Latch {
            signaled: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Called from the interrupt source. Idempotent: setting an
    /// already-set latch has no additional effect.
    pub fn set(&self) {
        let mut signaled = self.signaled.lock().unwrap_or_else(|p| p.into_inner());
        *signaled = true;
        self.condvar.notify_one();
    }

    /// Blocks up to `timeout` for the latch to be set, then clears it.
    /// Returns `true` if a signal was observed, `false` on timeout — the
    /// ingestor re-checks its shutdown latch on `false` (§4.B, §4.C).
    pub fn wait_and_clear(&self, timeout: Duration) -> bool {
        let guard = self.signaled.lock().unwrap_or_else(|p| p.into_inner());
        let (mut guard, _timeout_result) = self
            .condvar
            .wait_timeout_while(guard, timeout, |signaled| !*signaled)
            .unwrap_or_else(|p| p.into_inner());
        let was_signaled = *guard;
        *guard = false;
        was_signaled
    }
}
