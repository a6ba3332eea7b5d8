// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The byte-level transport under the AT command dialogue: a real serial
//! port in production, an in-memory scripted fake in tests.
//!
//! Grounded in `SIM800LManager`'s raw `pyserial` usage — one open serial
//! handle, blocking reads with a short per-read timeout so the dialogue
//! layer can poll for its expected substring against a deadline.

use std::io::{self, Read, Write};
use std::time::Duration;

/// Minimal serial byte transport. `gateway_core`'s codec/bus abstractions
/// don't cover this — the modem isn't on the shared SPI bus, it's a
/// dedicated UART, so this trait is local to the modem crate.
pub trait ModemTransport {
    /// Writes `buf` in full.
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Reads whatever bytes are currently available, blocking up to
    /// `per_read_timeout` for at least one byte. Returns `Ok(0)` on
    /// timeout with nothing received, never an error for "nothing yet".
    fn read_available(&mut self, buf: &mut [u8], per_read_timeout: Duration) -> io::Result<usize>;
}

/// Real transport over a physical serial port (SIM800L at 9600 8N1, per
/// `SIM800LManager.__init__`'s default baud rate).
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    pub const DEFAULT_BAUD_RATE: u32 = 9600;

    pub fn open(device: &str) -> io::Result<Self> {
        let port = serialport::new(device, Self::DEFAULT_BAUD_RATE)
            .timeout(Duration::from_millis(200))
            .open()
            .map_err(|e| io::Error::other(e.to_string()))?;
        Ok(SerialTransport { port })
    }
}

impl ModemTransport for SerialTransport {
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.port.write_all(buf)
    }

    fn read_available(&mut self, buf: &mut [u8], per_read_timeout: Duration) -> io::Result<usize> {
        self.port.set_timeout(per_read_timeout).ok();
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }
}
