// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stand-ins for the real `PrimaryRadio`/`ScoutRadio` driver libraries.
//!
//! The concrete radio driver libraries are treated as external
//! collaborators, deliberately out of scope here as opaque capability
//! traits — board-level GPIO/interrupt wiring is not part of this core.
//! These types let `gateway-app`'s binary start
//! and run end-to-end on a host with no radio hardware attached; swapping in
//! a real chip driver means implementing [`PrimaryRadio`]/[`ScoutRadio`] for
//! it and changing nothing else in the ingestor loops.

use crate::device::{PrimaryRadio, RadioSignalQuality, ScoutRadio};
use gateway_core::bus::BusDevice;

/// Opens successfully but never reports data available. A real chip driver
/// implements [`PrimaryRadio`] against SPI and GPIO; this one exists so the
/// ingestor loop and bus arbiter have something concrete to run against
/// absent real hardware.
pub struct NullPrimaryRadio;

impl BusDevice for NullPrimaryRadio {
    type Error = std::convert::Infallible;

    fn open(_chip_select: u8, _clock_hz: u32) -> Result<Self, Self::Error> {
        Ok(NullPrimaryRadio)
    }

    fn close(self) {}
}

impl PrimaryRadio for NullPrimaryRadio {
    fn configure(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn is_receive_done(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }

    fn clear_receive_flags(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn read_payload(&mut self) -> Result<(Vec<u8>, RadioSignalQuality), Self::Error> {
        unreachable!("is_receive_done always reports false")
    }

    fn rearm_receive(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// See [`NullPrimaryRadio`]; the scout-radio counterpart.
pub struct NullScoutRadio;

impl BusDevice for NullScoutRadio {
    type Error = std::convert::Infallible;

    fn open(_chip_select: u8, _clock_hz: u32) -> Result<Self, Self::Error> {
        Ok(NullScoutRadio)
    }

    fn close(self) {}
}

impl ScoutRadio for NullScoutRadio {
    fn configure(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn has_available(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }

    fn read_payload(&mut self) -> Result<Vec<u8>, Self::Error> {
        unreachable!("has_available always reports false")
    }
}
