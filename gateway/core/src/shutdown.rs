// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The single shutdown latch observed by every long-lived component on its
//! poll cycle (§4.G, §5 "Cancellation").
//!
//! Shutdown is cooperative: nothing here interrupts a blocking call in
//! progress. Every suspension point in the gateway (interrupt-latch wait,
//! queue pop-with-timeout, modem I/O) is itself bounded, so a component
//! always gets back around to checking [`ShutdownSignal::is_shutting_down`]
//! within its declared timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cheaply cloneable handle on the process-wide shutdown flag.
#[derive(Clone, Default)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        ShutdownSignal {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Requests shutdown. Idempotent.
    pub fn signal(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
