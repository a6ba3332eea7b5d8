// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error kinds shared across the gateway's components.
//!
//! These map directly onto the error taxonomy of the processing pipeline:
//! malformed wire data, transient store failures, bus/radio/modem setup
//! failures, and the two terminal conditions (queue-full, watchdog) that are
//! recovered locally rather than escalated. Nothing in here is fatal to a
//! component on its own — see each component's module docs for the recovery
//! policy that goes with a given variant.

use thiserror::Error;

/// The crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// A radio packet had the wrong length or failed to unpack.
    #[error("malformed packet from {radio}: {detail}")]
    MalformedPacket { radio: &'static str, detail: String },

    /// A durable-store transaction failed to commit or was rolled back.
    #[error("durable store error during {op}: {cause}")]
    StoreTransient {
        op: &'static str,
        cause: rusqlite_error::StoreCause,
    },

    /// The shared bus could not be opened at the requested chip-select.
    #[error("bus unavailable on chip-select {chip_select}: {cause}")]
    BusUnavailable { chip_select: u8, cause: String },

    /// A radio's one-time configuration sequence failed.
    #[error("{radio} radio setup failed: {cause}")]
    RadioSetupFailure { radio: &'static str, cause: String },

    /// The modem was not in a state that could service the request
    /// (SIM absent, not registered, or the dialogue produced an unexpected
    /// reply).
    #[error("modem not ready: {cause}")]
    ModemNotReady { cause: String },

    /// An upstream delivery attempt did not succeed (non-200, or timed out).
    #[error("upstream delivery failed: {cause}")]
    UpstreamFailure { cause: String },

    /// A bounded queue was full; the item that triggered this was dropped.
    #[error("{queue} queue full, dropping item")]
    QueueFull { queue: &'static str },

    /// A long-lived component activity exited unexpectedly.
    #[error("component '{component}' exited unexpectedly: {cause}")]
    WatchdogFailure { component: String, cause: String },
}

/// Thin indirection so `gateway-core` does not need to depend on `rusqlite`
/// directly (only `gateway-store` talks to the database); the store crate
/// converts its own errors into this before they cross the crate boundary.
pub mod rusqlite_error {
    use std::fmt;

    /// An opaque, displayable cause string carried by [`super::Error::StoreTransient`].
    #[derive(Debug, Clone)]
    pub struct StoreCause(pub String);

    impl fmt::Display for StoreCause {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl<E: std::error::Error> From<E> for StoreCause {
        fn from(e: E) -> Self {
            StoreCause(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
