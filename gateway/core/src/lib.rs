// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core types for the SETU sensor gateway: wire codecs, the persistent data
//! model, the bounded priority queues, the shared-bus arbiter and the alert
//! rule engine. See `SPEC_FULL.md` at the workspace root for the full
//! component breakdown this crate backs.

pub mod bus;
pub mod codec;
pub mod error;
pub mod model;
pub mod queue;
pub mod rules;
pub mod shutdown;

pub use error::{Error, Result};
pub use shutdown::ShutdownSignal;
