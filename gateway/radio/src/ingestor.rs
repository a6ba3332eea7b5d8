// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The primary and scout radio ingestor activities (§4.B, §4.C).
//!
//! Both loops follow the same shape as `worker_threads.py`'s
//! `LoRaWorkerThread`/`nRFWorkerThread`: wait on an interrupt latch with a
//! 1 s poll so shutdown is observed promptly, acquire the bus, run one-time
//! setup if needed, service the radio, and demote to `Uninitialized` on any
//! I/O failure so the next signal re-runs setup.

use std::time::Duration;

use gateway_core::bus::BusArbiter;
use gateway_core::queue::BoundedQueue;
use gateway_core::ShutdownSignal;
use log::{debug, info, warn};

use crate::device::{PrimaryRadio, ScoutRadio, PRIMARY_CLOCK_HZ, SCOUT_CLOCK_HZ};
#[cfg(test)]
use crate::device::{PRIMARY_CHIP_SELECT, SCOUT_CHIP_SELECT};
use crate::latch::Latch;

const LATCH_POLL: Duration = Duration::from_secs(1);
const SETUP_RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Runs the primary-radio ingestor until `shutdown` is signaled.
///
/// `D` stands in for the LoRa driver library; the bus arbiter opens a fresh
/// instance on every acquisition, so the `Uninitialized`/`Receiving` state
/// tracked here is the ingestor's own bookkeeping about whether the *radio
/// hardware* has been configured this session, not the Rust value's
/// lifetime. `chip_select` identifies the radio's position on the shared
/// bus (§10.4's `SETU_PRIMARY_RADIO_PORT`); the clock rate is fixed per
/// chip, not board-configurable.
pub fn run_primary_ingestor<D: PrimaryRadio>(
    latch: &Latch,
    shutdown: &ShutdownSignal,
    bus: &BusArbiter,
    high_prio: &BoundedQueue<Vec<u8>>,
    chip_select: u8,
) {
    let mut configured = false;

    while !shutdown.is_shutting_down() {
        if !latch.wait_and_clear(LATCH_POLL) {
            continue;
        }
        debug!("primary radio ingestor woken by interrupt");

        if let Err(e) = service_primary_once::<D>(bus, &mut configured, high_prio, chip_select) {
            warn!("primary radio ingestor demoting to uninitialized: {e}");
            configured = false;
            std::thread::sleep(SETUP_RETRY_BACKOFF);
        }
    }
    info!("primary radio ingestor shutting down");
}

fn service_primary_once<D: PrimaryRadio>(
    bus: &BusArbiter,
    configured: &mut bool,
    high_prio: &BoundedQueue<Vec<u8>>,
    chip_select: u8,
) -> Result<(), gateway_core::Error> {
    let mut handle = bus.acquire::<D>(chip_select, PRIMARY_CLOCK_HZ)?;

    if !*configured {
        handle
            .configure()
            .map_err(|e| gateway_core::Error::RadioSetupFailure {
                radio: "primary",
                cause: e.to_string(),
            })?;
        *configured = true;
        info!("primary radio configured for reception");
    }

    let receive_done =
        handle
            .is_receive_done()
            .map_err(|e| gateway_core::Error::RadioSetupFailure {
                radio: "primary",
                cause: e.to_string(),
            })?;

    if receive_done {
        handle
            .clear_receive_flags()
            .map_err(|e| gateway_core::Error::RadioSetupFailure {
                radio: "primary",
                cause: e.to_string(),
            })?;
        let (payload, quality) =
            handle
                .read_payload()
                .map_err(|e| gateway_core::Error::RadioSetupFailure {
                    radio: "primary",
                    cause: e.to_string(),
                })?;
        info!(
            "primary packet received, rssi={} dBm snr={} dB",
            quality.rssi_dbm, quality.snr_db
        );
        high_prio.try_put(payload);
    }

    handle
        .rearm_receive()
        .map_err(|e| gateway_core::Error::RadioSetupFailure {
            radio: "primary",
            cause: e.to_string(),
        })?;
    Ok(())
}

/// Runs the scout-radio ingestor until `shutdown` is signaled. Unlike the
/// primary radio, a single wake drains every packet currently buffered in
/// the radio's FIFO (§4.C).
pub fn run_scout_ingestor<D: ScoutRadio>(
    latch: &Latch,
    shutdown: &ShutdownSignal,
    bus: &BusArbiter,
    low_prio: &BoundedQueue<Vec<u8>>,
    chip_select: u8,
) {
    let mut configured = false;

    while !shutdown.is_shutting_down() {
        if !latch.wait_and_clear(LATCH_POLL) {
            continue;
        }
        debug!("scout radio ingestor woken by interrupt");

        match service_scout_once::<D>(bus, &mut configured, low_prio, chip_select) {
            Ok(drained) => {
                if drained > 0 {
                    info!("scout radio ingestor drained {drained} packet(s)");
                }
            }
            Err(e) => {
                warn!("scout radio ingestor demoting to uninitialized: {e}");
                configured = false;
                std::thread::sleep(SETUP_RETRY_BACKOFF);
            }
        }
    }
    info!("scout radio ingestor shutting down");
}

fn service_scout_once<D: ScoutRadio>(
    bus: &BusArbiter,
    configured: &mut bool,
    low_prio: &BoundedQueue<Vec<u8>>,
    chip_select: u8,
) -> Result<usize, gateway_core::Error> {
    let mut handle = bus.acquire::<D>(chip_select, SCOUT_CLOCK_HZ)?;

    if !*configured {
        handle
            .configure()
            .map_err(|e| gateway_core::Error::RadioSetupFailure {
                radio: "scout",
                cause: e.to_string(),
            })?;
        *configured = true;
        info!("scout radio configured for reception");
    }

    let mut drained = 0usize;
    while handle
        .has_available()
        .map_err(|e| gateway_core::Error::RadioSetupFailure {
            radio: "scout",
            cause: e.to_string(),
        })?
    {
        let payload =
            handle
                .read_payload()
                .map_err(|e| gateway_core::Error::RadioSetupFailure {
                    radio: "scout",
                    cause: e.to_string(),
                })?;
        low_prio.try_put(payload);
        drained += 1;
    }
    Ok(drained)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{lock_for_test, FakePrimaryRadio, FakeScoutRadio};

    #[test]
    fn primary_ingestor_enqueues_one_packet_per_signal() {
        let _guard = lock_for_test();
        let bus = BusArbiter::new();
        let queue: BoundedQueue<Vec<u8>> = BoundedQueue::new("high_prio", 10);
        FakePrimaryRadio::reset();
        FakePrimaryRadio::push_incoming(vec![1, 2, 3]);

        let mut configured = false;
        service_primary_once::<FakePrimaryRadio>(
            &bus,
            &mut configured,
            &queue,
            PRIMARY_CHIP_SELECT,
        )
        .unwrap();
        assert!(configured);
        assert_eq!(queue.try_pop(), Some(vec![1, 2, 3]));
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn primary_ingestor_configures_only_once() {
        let _guard = lock_for_test();
        let bus = BusArbiter::new();
        let queue: BoundedQueue<Vec<u8>> = BoundedQueue::new("high_prio", 10);
        FakePrimaryRadio::reset();

        let mut configured = false;
        service_primary_once::<FakePrimaryRadio>(
            &bus,
            &mut configured,
            &queue,
            PRIMARY_CHIP_SELECT,
        )
        .unwrap();
        service_primary_once::<FakePrimaryRadio>(
            &bus,
            &mut configured,
            &queue,
            PRIMARY_CHIP_SELECT,
        )
        .unwrap();
        assert_eq!(FakePrimaryRadio::configure_count(), 1);
    }

    #[test]
    fn primary_ingestor_demotes_state_on_setup_failure() {
        let _guard = lock_for_test();
        let bus = BusArbiter::new();
        let queue: BoundedQueue<Vec<u8>> = BoundedQueue::new("high_prio", 10);
        FakePrimaryRadio::reset();
        FakePrimaryRadio::fail_next_configure();

        let mut configured = false;
        let err = service_primary_once::<FakePrimaryRadio>(
            &bus,
            &mut configured,
            &queue,
            PRIMARY_CHIP_SELECT,
        );
        assert!(err.is_err());
        assert!(!configured);
    }

    #[test]
    fn scout_ingestor_drains_every_buffered_packet_on_one_wake() {
        let _guard = lock_for_test();
        let bus = BusArbiter::new();
        let queue: BoundedQueue<Vec<u8>> = BoundedQueue::new("low_prio", 10);
        FakeScoutRadio::reset();
        FakeScoutRadio::push_incoming(vec![1]);
        FakeScoutRadio::push_incoming(vec![2]);
        FakeScoutRadio::push_incoming(vec![3]);

        let mut configured = false;
        let drained =
            service_scout_once::<FakeScoutRadio>(&bus, &mut configured, &queue, SCOUT_CHIP_SELECT)
                .unwrap();
        assert_eq!(drained, 3);
        assert_eq!(queue.try_pop(), Some(vec![1]));
        assert_eq!(queue.try_pop(), Some(vec![2]));
        assert_eq!(queue.try_pop(), Some(vec![3]));
    }

    #[test]
    fn drop_on_full_is_logged_and_occupancy_unchanged() {
        let _guard = lock_for_test();
        let bus = BusArbiter::new();
        let queue: BoundedQueue<Vec<u8>> = BoundedQueue::new("low_prio", 1);
        FakeScoutRadio::reset();
        FakeScoutRadio::push_incoming(vec![1]);
        FakeScoutRadio::push_incoming(vec![2]);

        let mut configured = false;
        service_scout_once::<FakeScoutRadio>(&bus, &mut configured, &queue, SCOUT_CHIP_SELECT)
            .unwrap();
        assert_eq!(queue.try_pop(), Some(vec![1]));
        assert_eq!(queue.try_pop(), None);
    }
}
