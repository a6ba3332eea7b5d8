// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The shared serial peripheral bus arbiter (§4.A).
//!
//! Two radio chips share one physical bus; the arbiter guarantees that at
//! most one of them holds it at a time, and that a holder always releases it
//! — on normal completion, on a dropped handle after a panic unwind, and on
//! the error path of the device open itself. A caller never receives a
//! handle without exclusivity, and exclusivity is never retained without a
//! handle having been returned: if [`BusDevice::open`] fails, the mutex guard
//! is dropped before the error propagates.
//!
//! Grounded in the lock/release discipline of
//! `drv/stm32h7-spi-server-core`'s `lock_holder`, adapted from an IPC-visible
//! lock state to a plain `std::sync::Mutex` since this gateway has no
//! kernel-mediated tasks to hold the lock across a context switch.

use std::sync::{Mutex, MutexGuard};

use crate::error::Error;

/// A physical device opened at a given chip-select and clock rate.
///
/// The concrete radio/modem driver libraries implement this; the gateway
/// core only ever sees the trait, treating the drivers as opaque capabilities.
pub trait BusDevice: Sized {
    type Error: std::fmt::Display;

    /// Opens the device at `chip_select` with a clock no faster than
    /// `clock_hz`. Must not retain partial state on failure.
    fn open(chip_select: u8, clock_hz: u32) -> Result<Self, Self::Error>;

    /// Closes the physical device. Called exactly once, before the bus
    /// arbiter's mutex is released.
    fn close(self);
}

/// Serializes access to the shared bus across chip-selects.
#[derive(Default)]
pub struct BusArbiter {
    mutex: Mutex<()>,
}

impl BusArbiter {
    pub fn new() -> Self {
        BusArbiter {
            mutex: Mutex::new(()),
        }
    }

    /// Blocks until exclusive use of the bus is granted, then opens `D` at
    /// `chip_select`/`clock_hz`. On open failure, releases exclusivity
    /// before returning [`Error::BusUnavailable`]; no retry is attempted
    /// here — the caller's retry policy (§4.B/§4.C) lives one layer up.
    pub fn acquire<D: BusDevice>(
        &self,
        chip_select: u8,
        clock_hz: u32,
    ) -> Result<BusHandle<'_, D>, Error> {
        let guard = self
            .mutex
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match D::open(chip_select, clock_hz) {
            Ok(device) => Ok(BusHandle {
                device: Some(device),
                _guard: guard,
            }),
            Err(e) => Err(Error::BusUnavailable {
                chip_select,
                cause: e.to_string(),
            }),
            // `guard` is dropped here on the error path, releasing
            // exclusivity before the error is returned to the caller.
        }
    }
}

/// A scoped handle on the bus. Dereferences to the opened device; dropping
/// the handle closes the device and releases the bus, in that order, on
/// every exit path (including unwinding).
pub struct BusHandle<'a, D: BusDevice> {
    device: Option<D>,
    _guard: MutexGuard<'a, ()>,
}

impl<D: BusDevice> std::ops::Deref for BusHandle<'_, D> {
    type Target = D;
    fn deref(&self) -> &D {
        self.device
            .as_ref()
            .expect("device present for handle lifetime")
    }
}

impl<D: BusDevice> std::ops::DerefMut for BusHandle<'_, D> {
    fn deref_mut(&mut self) -> &mut D {
        self.device
            .as_mut()
            .expect("device present for handle lifetime")
    }
}

impl<D: BusDevice> Drop for BusHandle<'_, D> {
    fn drop(&mut self) {
        if let Some(device) = self.device.take() {
            device.close();
        }
        // `_guard` drops immediately after this, releasing the mutex.
    }
}
