// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Deterministic in-memory radio fakes for the ingestor loop tests.
//!
//! The bus arbiter constructs a fresh `D` on every [`BusDevice::open`]
//! call, so a fake's "incoming packet" queue and failure toggles have to
//! live in process-wide state rather than on the struct itself — the same
//! shape a hardware driver has (the physical radio's FIFO persists across
//! `open`/`close` cycles too).

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, OnceLock};

use gateway_core::bus::BusDevice;

use crate::device::{PrimaryRadio, RadioSignalQuality, ScoutRadio};

/// The fakes' backing state is process-global, so tests that use them must
/// not run concurrently with one another. Call [`lock_for_test`] at the top
/// of each test and hold the guard for the test body.
pub fn lock_for_test() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|p| p.into_inner())
}

struct PrimaryState {
    incoming: VecDeque<Vec<u8>>,
    configure_count: usize,
    fail_next_configure: bool,
}

fn primary_state() -> &'static Mutex<PrimaryState> {
    static STATE: OnceLock<Mutex<PrimaryState>> = OnceLock::new();
    STATE.get_or_init(|| {
        Mutex::new(PrimaryState {
            incoming: VecDeque::new(),
            configure_count: 0,
            fail_next_configure: false,
        })
    })
}

pub struct FakePrimaryRadio;

impl FakePrimaryRadio {
    pub fn reset() {
        let mut state = primary_state().lock().unwrap();
        state.incoming.clear();
        state.configure_count = 0;
        state.fail_next_configure = false;
    }

    pub fn push_incoming(payload: Vec<u8>) {
        primary_state().lock().unwrap().incoming.push_back(payload);
    }

    pub fn fail_next_configure() {
        primary_state().lock().unwrap().fail_next_configure = true;
    }

    pub fn configure_count() -> usize {
        primary_state().lock().unwrap().configure_count
    }
}

impl BusDevice for FakePrimaryRadio {
    type Error = &'static str;

    fn open(_chip_select: u8, _clock_hz: u32) -> Result<Self, Self::Error> {
        Ok(FakePrimaryRadio)
    }

    fn close(self) {}
}

impl PrimaryRadio for FakePrimaryRadio {
    fn configure(&mut self) -> Result<(), Self::Error> {
        let mut state = primary_state().lock().unwrap();
        state.configure_count += 1;
        if state.fail_next_configure {
            state.fail_next_configure = false;
            return Err("simulated configure failure");
        }
        Ok(())
    }

    fn is_receive_done(&mut self) -> Result<bool, Self::Error> {
        Ok(!primary_state().lock().unwrap().incoming.is_empty())
    }

    fn clear_receive_flags(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn read_payload(&mut self) -> Result<(Vec<u8>, RadioSignalQuality), Self::Error> {
        let payload = primary_state()
            .lock()
            .unwrap()
            .incoming
            .pop_front()
            .ok_or("no packet available")?;
        Ok((
            payload,
            RadioSignalQuality {
                rssi_dbm: -80,
                snr_db: 9.5,
            },
        ))
    }

    fn rearm_receive(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

struct ScoutState {
    incoming: VecDeque<Vec<u8>>,
}

fn scout_state() -> &'static Mutex<ScoutState> {
    static STATE: OnceLock<Mutex<ScoutState>> = OnceLock::new();
    STATE.get_or_init(|| {
        Mutex::new(ScoutState {
            incoming: VecDeque::new(),
        })
    })
}

pub struct FakeScoutRadio;

impl FakeScoutRadio {
    pub fn reset() {
        scout_state().lock().unwrap().incoming.clear();
    }

    pub fn push_incoming(payload: Vec<u8>) {
        scout_state().lock().unwrap().incoming.push_back(payload);
    }
}

impl BusDevice for FakeScoutRadio {
    type Error = &'static str;

    fn open(_chip_select: u8, _clock_hz: u32) -> Result<Self, Self::Error> {
        Ok(FakeScoutRadio)
    }

    fn close(self) {}
}

impl ScoutRadio for FakeScoutRadio {
    fn configure(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn has_available(&mut self) -> Result<bool, Self::Error> {
        Ok(!scout_state().lock().unwrap().incoming.is_empty())
    }

    fn read_payload(&mut self) -> Result<Vec<u8>, Self::Error> {
        scout_state()
            .lock()
            .unwrap()
            .incoming
            .pop_front()
            .ok_or("no packet available")
    }
}
