// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The AT command request/response dialogue, grounded directly in
//! `SIM800LManager.send_at_command`: write the command plus CRLF, then
//! accumulate response lines until one contains the expected substring or
//! the timeout elapses.

use std::time::{Duration, Instant};

use log::debug;

use crate::transport::ModemTransport;

/// The default per-command timeout (§5 "bounded per-command timeouts,
/// default 5 s").
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const READ_CHUNK: usize = 256;
const PER_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Sends `command` and waits up to `timeout` for a response line containing
/// `expected`. Returns the accumulated response regardless of outcome; the
/// caller decides what a timeout without a match means for its state
/// machine.
pub fn send_at_command<T: ModemTransport>(
    transport: &mut T,
    command: &str,
    expected: &str,
    timeout: Duration,
) -> (bool, String) {
    debug!("AT> {command}");
    if !command.is_empty() {
        let mut line = command.as_bytes().to_vec();
        line.extend_from_slice(b"\r\n");
        if transport.write_all(&line).is_err() {
            return (false, String::new());
        }
    }

    let deadline = Instant::now() + timeout;
    let mut response = String::new();
    let mut buf = [0u8; READ_CHUNK];

    while Instant::now() < deadline {
        match transport.read_available(&mut buf, PER_READ_TIMEOUT) {
            Ok(0) => continue,
            Ok(n) => {
                response.push_str(&String::from_utf8_lossy(&buf[..n]));
                if response.contains(expected) {
                    debug!("AT< {}", response.trim());
                    return (true, response);
                }
            }
            Err(_) => break,
        }
    }
    debug!(
        "AT timeout waiting for '{expected}', got: {}",
        response.trim()
    );
    (false, response)
}

/// Writes a raw payload with no trailing CRLF and no response wait — used
/// for SMS body text and HTTP payload bytes, which are not AT commands.
pub fn write_raw<T: ModemTransport>(transport: &mut T, payload: &[u8]) -> bool {
    transport.write_all(payload).is_ok()
}
