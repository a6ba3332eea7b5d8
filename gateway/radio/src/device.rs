// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Capability traits standing in for the opaque radio driver libraries
//! (`LoRaRF`, `circuitpython_nrf24l01`) the source delegates to. The
//! ingestor loops in this crate are generic over these traits so the same
//! state-machine logic drives both the real hardware bindings and the
//! deterministic fakes used in tests.

use gateway_core::bus::BusDevice;

/// Chip-select for the primary (long-range) radio, per `worker_threads.py`'s
/// `device=0` SPI device.
pub const PRIMARY_CHIP_SELECT: u8 = 0;
/// Clock ceiling for the primary radio (§4.B "high clock rate").
pub const PRIMARY_CLOCK_HZ: u32 = 8_000_000;

/// Chip-select for the scout (short-range) radio, per `device=1`.
pub const SCOUT_CHIP_SELECT: u8 = 1;
/// Clock ceiling for the scout radio (§4.C "lower clock rate ceiling" than
/// the primary radio).
pub const SCOUT_CLOCK_HZ: u32 = 4_000_000;

/// The long-range, high-priority radio (§4.B).
///
/// One bus device instance is opened fresh on each [`BusArbiter::acquire`](
/// gateway_core::bus::BusArbiter::acquire) call; `configure` runs the
/// one-time setup sequence every time the ingestor's cached state demotes to
/// `Uninitialized`.
pub trait PrimaryRadio: BusDevice {
    /// Frequency fix, interrupt source = receive-done, enter continuous
    /// receive. Returns `Err` on any step failing.
    fn configure(&mut self) -> Result<(), Self::Error>;

    /// Hardware receive-done indicator.
    fn is_receive_done(&mut self) -> Result<bool, Self::Error>;

    /// Clears the hardware receive flags. Called only when
    /// [`is_receive_done`](Self::is_receive_done) returned `true`.
    fn clear_receive_flags(&mut self) -> Result<(), Self::Error>;

    /// Reads the packet payload. Signal-quality metadata (RSSI/SNR) is
    /// logged by the caller but not itself part of the wire payload.
    fn read_payload(&mut self) -> Result<(Vec<u8>, RadioSignalQuality), Self::Error>;

    /// Re-arms continuous receive after a read.
    fn rearm_receive(&mut self) -> Result<(), Self::Error>;
}

/// The short-range, low-priority radio (§4.C).
pub trait ScoutRadio: BusDevice {
    fn configure(&mut self) -> Result<(), Self::Error>;

    /// Whether the radio's FIFO currently holds at least one packet.
    fn has_available(&mut self) -> Result<bool, Self::Error>;

    /// Reads one packet. Only called while [`has_available`](
    /// Self::has_available) reports `true`.
    fn read_payload(&mut self) -> Result<Vec<u8>, Self::Error>;
}

/// Signal quality metadata accompanying a primary-radio read, logged
/// alongside the packet but not persisted (§4.B).
#[derive(Debug, Clone, Copy)]
pub struct RadioSignalQuality {
    pub rssi_dbm: i16,
    pub snr_db: f32,
}
