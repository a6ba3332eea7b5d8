// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Radio capability traits, the interrupt latch, and the primary/scout
//! ingestor activities (§4.B, §4.C) for the SETU sensor gateway.

pub mod device;
#[cfg(test)]
pub mod fakes;
pub mod ingestor;
pub mod latch;
pub mod sim;

pub use device::{
    PrimaryRadio, RadioSignalQuality, ScoutRadio, PRIMARY_CHIP_SELECT, SCOUT_CHIP_SELECT,
};
pub use ingestor::{run_primary_ingestor, run_scout_ingestor};
pub use latch::Latch;
