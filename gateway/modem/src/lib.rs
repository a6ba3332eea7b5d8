// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The cellular modem's AT-command dialogue, protocol state machine, and
//! the egress activity (§4.E) for the SETU sensor gateway.

pub mod at;
pub mod egress;
pub mod state;
pub mod transport;

pub use egress::{run_egress, EgressConfig};
pub use state::{Modem, ModemState};
pub use transport::{ModemTransport, SerialTransport};
