// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The modem protocol state machine (§4.E, §9 "Modem as a protocol state
//! machine"), grounded in `SIM800LManager`/`CommunicationsThread`'s
//! `setup_sms`, `send_sms`, and `_http_post_payload`.
//!
//! The source interleaves command sequencing with I/O inline in the
//! communications thread; here that's factored into an explicit state
//! machine with one "drive to target state" operation per target, so a
//! failure at any step is always recoverable by dropping to [`ModemState::Closed`]
//! and re-running setup on the next cycle.

use std::time::Duration;

use gateway_core::Error;
use log::{info, warn};

use crate::at::{send_at_command, write_raw, DEFAULT_TIMEOUT};
use crate::transport::ModemTransport;

/// SMS final-acknowledgement timeout (§5 "up to 60 s for SMS final ack").
const SMS_FINAL_ACK_TIMEOUT: Duration = Duration::from_secs(60);
/// HTTP action-result timeout (§5 "up to 30 s for HTTP action").
const HTTP_ACTION_TIMEOUT: Duration = Duration::from_secs(30);
/// Ctrl+Z, the SIM800L SMS body terminator.
const SMS_END_OF_MESSAGE: u8 = 0x1A;

/// The modem's current protocol state. `SmsSending`/`HttpSending` from the
/// design notes' transition sketch are represented here as the in-progress
/// calls to [`Modem::send_sms`]/[`Modem::http_post`] rather than as
/// standing variants — nothing else can observe a modem mid-send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemState {
    Closed,
    Opened,
    SmsReady,
    DataBearerUp,
    HttpReady,
}

/// Drives a modem transport through its AT dialogue, tracking protocol
/// state. Owns the transport for its lifetime, matching §5's "a single
/// connection per component" discipline applied to the egress component.
pub struct Modem<T> {
    transport: T,
    state: ModemState,
}

impl<T: ModemTransport> Modem<T> {
    pub fn new(transport: T) -> Self {
        Modem {
            transport,
            state: ModemState::Closed,
        }
    }

    pub fn state(&self) -> ModemState {
        self.state
    }

    /// Drives the modem to `SmsReady`, running the full probe/SIM/text-mode
    /// sequence unless already there. Grounded in `setup_sms`.
    pub fn ensure_sms_ready(&mut self) -> Result<(), Error> {
        if self.state == ModemState::SmsReady {
            return Ok(());
        }

        let (ok, _) = send_at_command(&mut self.transport, "AT", "OK", DEFAULT_TIMEOUT);
        if !ok {
            self.state = ModemState::Closed;
            return Err(Error::ModemNotReady {
                cause: "no response to AT probe".to_string(),
            });
        }
        self.state = ModemState::Opened;

        let (_, response) =
            send_at_command(&mut self.transport, "AT+CPIN?", "+CPIN", DEFAULT_TIMEOUT);
        if !response.contains("+CPIN: READY") {
            self.state = ModemState::Closed;
            return Err(Error::ModemNotReady {
                cause: "SIM card not ready".to_string(),
            });
        }

        let (ok, _) = send_at_command(&mut self.transport, "AT+CMGF=1", "OK", DEFAULT_TIMEOUT);
        if !ok {
            self.state = ModemState::Closed;
            return Err(Error::ModemNotReady {
                cause: "failed to set text mode".to_string(),
            });
        }

        self.state = ModemState::SmsReady;
        info!("modem is ready for SMS");
        Ok(())
    }

    /// Sends one SMS to `number`. Requires [`ModemState::SmsReady`]; on any
    /// failure the modem drops to [`ModemState::Closed`] so the caller's
    /// next call re-runs [`ensure_sms_ready`](Self::ensure_sms_ready).
    /// Grounded in `send_sms`.
    pub fn send_sms(&mut self, number: &str, message: &str) -> Result<(), Error> {
        if self.state != ModemState::SmsReady {
            return Err(Error::ModemNotReady {
                cause: "modem not in SmsReady state".to_string(),
            });
        }

        let command = format!("AT+CMGS=\"{number}\"");
        let (ok, _) = send_at_command(&mut self.transport, &command, ">", DEFAULT_TIMEOUT);
        if !ok {
            self.state = ModemState::Closed;
            return Err(Error::ModemNotReady {
                cause: "modem did not prompt for SMS body".to_string(),
            });
        }

        if !write_raw(&mut self.transport, message.as_bytes()) {
            self.state = ModemState::Closed;
            return Err(Error::ModemNotReady {
                cause: "failed to write SMS body".to_string(),
            });
        }
        std::thread::sleep(Duration::from_millis(100));
        if !write_raw(&mut self.transport, &[SMS_END_OF_MESSAGE]) {
            self.state = ModemState::Closed;
            return Err(Error::ModemNotReady {
                cause: "failed to send end-of-message byte".to_string(),
            });
        }

        let (ok, response) = send_at_command(&mut self.transport, "", "OK", SMS_FINAL_ACK_TIMEOUT);
        if !ok {
            self.state = ModemState::Closed;
            warn!("SMS send failed, final response: {}", response.trim());
            return Err(Error::ModemNotReady {
                cause: "no final acknowledgement for SMS".to_string(),
            });
        }

        info!("SMS sent successfully");
        Ok(())
    }

    /// Drives the modem from `SmsReady`/`Opened` to `DataBearerUp`,
    /// checking network registration and opening the GPRS bearer.
    /// Grounded in `_http_post_payload`'s registration check and
    /// `AT+SAPBR` sequence.
    pub fn ensure_data_bearer(&mut self, apn: &str) -> Result<(), Error> {
        if matches!(self.state, ModemState::DataBearerUp | ModemState::HttpReady) {
            return Ok(());
        }

        let (_, response) =
            send_at_command(&mut self.transport, "AT+CREG?", "+CREG", DEFAULT_TIMEOUT);
        let registered = response.contains("+CREG: 0,1") || response.contains("+CREG: 0,5");
        if !registered {
            self.state = ModemState::Closed;
            return Err(Error::ModemNotReady {
                cause: "not registered on network".to_string(),
            });
        }

        let apn_command = format!("AT+SAPBR=3,1,\"APN\",\"{apn}\"");
        send_at_command(&mut self.transport, &apn_command, "OK", DEFAULT_TIMEOUT);
        let (ok, _) = send_at_command(&mut self.transport, "AT+SAPBR=1,1", "OK", DEFAULT_TIMEOUT);
        if !ok {
            self.state = ModemState::Closed;
            return Err(Error::ModemNotReady {
                cause: "failed to open GPRS bearer".to_string(),
            });
        }

        self.state = ModemState::DataBearerUp;
        Ok(())
    }

    /// Initializes the HTTP agent over an already-open data bearer.
    fn ensure_http_ready(&mut self, url: &str) -> Result<(), Error> {
        if self.state == ModemState::HttpReady {
            return Ok(());
        }
        send_at_command(&mut self.transport, "AT+HTTPINIT", "OK", DEFAULT_TIMEOUT);
        send_at_command(
            &mut self.transport,
            "AT+HTTPPARA=\"CID\",1",
            "OK",
            DEFAULT_TIMEOUT,
        );
        let url_command = format!("AT+HTTPPARA=\"URL\",\"{url}\"");
        send_at_command(&mut self.transport, &url_command, "OK", DEFAULT_TIMEOUT);
        send_at_command(
            &mut self.transport,
            "AT+HTTPPARA=\"CONTENT\",\"application/json\"",
            "OK",
            DEFAULT_TIMEOUT,
        );
        self.state = ModemState::HttpReady;
        Ok(())
    }

    /// POSTs `payload` to `url` over the established data bearer, returning
    /// `Ok(())` only on HTTP 200 (§6 "Only HTTP 200 is treated as
    /// success"). The bearer and HTTP agent are torn down unconditionally
    /// before returning, regardless of outcome — resolving the open
    /// question about the source's early-return bypassing its cleanup
    /// clause. A completed cycle returns the modem to
    /// [`ModemState::SmsReady`], matching the state diagram's
    /// `HttpSending} → SmsReady`; `Closed` is reserved for an unexpected
    /// response mid-dialogue ([`http_post_inner`](Self::http_post_inner)
    /// failing) or teardown itself failing.
    pub fn http_post(&mut self, apn: &str, url: &str, payload: &str) -> Result<(), Error> {
        let outcome = self.http_post_inner(apn, url, payload);
        let teardown_ok = self.teardown_http_session();
        self.state = if outcome.is_ok() && teardown_ok {
            ModemState::SmsReady
        } else {
            ModemState::Closed
        };
        outcome
    }

    fn http_post_inner(&mut self, apn: &str, url: &str, payload: &str) -> Result<(), Error> {
        self.ensure_data_bearer(apn)?;
        self.ensure_http_ready(url)?;

        let data_command = format!("AT+HTTPDATA={},10000", payload.len());
        let (ok, _) = send_at_command(
            &mut self.transport,
            &data_command,
            "DOWNLOAD",
            DEFAULT_TIMEOUT,
        );
        if !ok {
            return Err(Error::UpstreamFailure {
                cause: "modem did not accept HTTPDATA".to_string(),
            });
        }
        if !write_raw(&mut self.transport, payload.as_bytes()) {
            return Err(Error::UpstreamFailure {
                cause: "failed to write HTTP payload".to_string(),
            });
        }
        let (ok, _) = send_at_command(&mut self.transport, "", "OK", DEFAULT_TIMEOUT);
        if !ok {
            return Err(Error::UpstreamFailure {
                cause: "modem did not acknowledge payload".to_string(),
            });
        }

        let (ok, response) = send_at_command(
            &mut self.transport,
            "AT+HTTPACTION=1",
            "+HTTPACTION",
            HTTP_ACTION_TIMEOUT,
        );
        if ok && response.contains("1,200") {
            info!("HTTP POST successful (200 OK)");
            Ok(())
        } else {
            Err(Error::UpstreamFailure {
                cause: format!("HTTP POST failed, response: {}", response.trim()),
            })
        }
    }

    /// Tears down the HTTP agent and GPRS bearer unconditionally. Returns
    /// whether both teardown commands were acknowledged; the caller folds
    /// this into the post-cycle state decision rather than this function
    /// picking the resulting [`ModemState`] itself.
    fn teardown_http_session(&mut self) -> bool {
        let (term_ok, _) =
            send_at_command(&mut self.transport, "AT+HTTPTERM", "OK", DEFAULT_TIMEOUT);
        let (bearer_ok, _) =
            send_at_command(&mut self.transport, "AT+SAPBR=0,1", "OK", DEFAULT_TIMEOUT);
        term_ok && bearer_ok
    }
}
