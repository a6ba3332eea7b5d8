// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The egress activity (§4.E): alert delivery and batched cloud upload,
//! sharing one modem. Grounded in `CommunicationsThread.run`.

use std::time::{Duration, Instant};

use gateway_core::queue::BoundedQueue;
use gateway_core::ShutdownSignal;
use gateway_store::Store;
use log::{error, info, warn};
use serde::Serialize;

use crate::state::Modem;
use crate::transport::ModemTransport;

/// How often the batched cloud upload runs, measured from loop start, not
/// from queue drain (§4.E).
const CLOUD_UPLOAD_INTERVAL: Duration = Duration::from_secs(15 * 60);
/// Max fatigue rows per upload batch.
const BATCH_LIMIT: u32 = 50;
/// How long to back off after a failed SMS setup before retrying (§7
/// `ModemNotReady`: "wait 10 s, retry").
const SMS_SETUP_BACKOFF: Duration = Duration::from_secs(10);
/// Alert-queue consume timeout per iteration (§5).
const ALERT_POLL: Duration = Duration::from_secs(1);

/// Static per-gateway identity and endpoint configuration the egress loop
/// needs but does not own the lifecycle of.
pub struct EgressConfig {
    pub recipient_number: String,
    pub upstream_url: String,
    pub gprs_apn: String,
    pub gateway_id: String,
}

#[derive(Serialize)]
struct FatigueCycles {
    bin_1: u32,
    bin_2: u32,
    bin_3: u32,
}

#[derive(Serialize)]
struct UploadRecord {
    gateway_id: String,
    packet_id: i64,
    node_id: u16,
    timestamp: String,
    fatigue_cycles: FatigueCycles,
}

/// Runs the egress activity until `shutdown` is signaled.
pub fn run_egress<T: ModemTransport>(
    shutdown: &ShutdownSignal,
    alerts: &BoundedQueue<String>,
    store: &mut Store,
    modem: &mut Modem<T>,
    config: &EgressConfig,
) {
    let mut last_upload = Instant::now() - CLOUD_UPLOAD_INTERVAL;

    while !shutdown.is_shutting_down() {
        match alerts.pop_timeout(ALERT_POLL) {
            Ok(alert) => deliver_alert(modem, alerts, config, alert),
            Err(_) => {}
        }

        if last_upload.elapsed() >= CLOUD_UPLOAD_INTERVAL {
            if let Err(e) = upload_batch(store, modem, config) {
                error!("cloud upload failed: {e}");
            }
            last_upload = Instant::now();
        }
    }
    info!("egress shutting down");
}

fn deliver_alert<T: ModemTransport>(
    modem: &mut Modem<T>,
    alerts: &BoundedQueue<String>,
    config: &EgressConfig,
    alert: String,
) {
    if modem.ensure_sms_ready().is_err() {
        warn!("modem not ready for SMS, re-queuing alert");
        alerts.try_put(alert);
        std::thread::sleep(SMS_SETUP_BACKOFF);
        return;
    }

    if modem.send_sms(&config.recipient_number, &alert).is_err() {
        warn!("SMS delivery failed, re-queuing alert");
        alerts.try_put(alert);
    }
}

fn upload_batch<T: ModemTransport>(
    store: &mut Store,
    modem: &mut Modem<T>,
    config: &EgressConfig,
) -> Result<(), gateway_core::Error> {
    let rows = store.select_unsent_fatigue_records(BATCH_LIMIT)?;
    if rows.is_empty() {
        return Ok(());
    }

    let log_ids: Vec<i64> = rows.iter().map(|r| r.log_id).collect();
    let payload: Vec<UploadRecord> = rows
        .into_iter()
        .map(|r| UploadRecord {
            gateway_id: config.gateway_id.clone(),
            packet_id: r.log_id,
            node_id: r.node_id,
            timestamp: r.timestamp,
            fatigue_cycles: FatigueCycles {
                bin_1: r.bin_1_cycles,
                bin_2: r.bin_2_cycles,
                bin_3: r.bin_3_cycles,
            },
        })
        .collect();
    let body =
        serde_json::to_string(&payload).map_err(|e| gateway_core::Error::UpstreamFailure {
            cause: format!("failed to encode upload payload: {e}"),
        })?;

    modem.http_post(&config.gprs_apn, &config.upstream_url, &body)?;

    info!("uploaded {} row(s), marking sent", log_ids.len());
    store.mark_sent(&log_ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_store::Store;
    use std::collections::VecDeque;
    use std::io;

    struct ScriptedTransport {
        replies: VecDeque<Vec<u8>>,
    }

    impl ScriptedTransport {
        fn new(lines: &[&str]) -> Self {
            ScriptedTransport {
                replies: lines.iter().map(|l| l.as_bytes().to_vec()).collect(),
            }
        }
    }

    impl ModemTransport for ScriptedTransport {
        fn write_all(&mut self, _buf: &[u8]) -> io::Result<()> {
            Ok(())
        }
        fn read_available(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<usize> {
            match self.replies.pop_front() {
                Some(chunk) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    Ok(n)
                }
                None => Ok(0),
            }
        }
    }

    fn config() -> EgressConfig {
        EgressConfig {
            recipient_number: "+10000000000".to_string(),
            upstream_url: "http://example.test/ingest".to_string(),
            gprs_apn: "internet".to_string(),
            gateway_id: "GW001".to_string(),
        }
    }

    #[test]
    fn upload_success_marks_rows_sent() {
        let mut store = Store::open_in_memory().unwrap();
        store.insert_fatigue_record(1, 5, 10, 20).unwrap();
        store.insert_fatigue_record(1, 1, 2, 3).unwrap();

        let transport = ScriptedTransport::new(&[
            "+CREG: 0,1\r\n",
            "OK\r\n",
            "OK\r\n",
            "OK\r\n",
            "OK\r\n",
            "OK\r\n",
            "OK\r\n",
            "DOWNLOAD\r\n",
            "OK\r\n",
            "+HTTPACTION: 1,200,15\r\n",
            "OK\r\n",
            "OK\r\n",
        ]);
        let mut modem = Modem::new(transport);

        upload_batch(&mut store, &mut modem, &config()).unwrap();

        let remaining = store.select_unsent_fatigue_records(10).unwrap();
        assert!(remaining.is_empty());
    }

    #[test]
    fn upload_failure_leaves_rows_unsent() {
        let mut store = Store::open_in_memory().unwrap();
        store.insert_fatigue_record(1, 5, 10, 20).unwrap();

        let transport = ScriptedTransport::new(&[
            "+CREG: 0,1\r\n",
            "OK\r\n",
            "OK\r\n",
            "OK\r\n",
            "OK\r\n",
            "OK\r\n",
            "OK\r\n",
            "DOWNLOAD\r\n",
            "OK\r\n",
            "+HTTPACTION: 1,500,0\r\n",
            "OK\r\n",
            "OK\r\n",
        ]);
        let mut modem = Modem::new(transport);

        assert!(upload_batch(&mut store, &mut modem, &config()).is_err());
        let remaining = store.select_unsent_fatigue_records(10).unwrap();
        assert_eq!(remaining.len(), 1);
    }

    #[test]
    fn no_unsent_rows_is_a_no_op() {
        let mut store = Store::open_in_memory().unwrap();
        let transport = ScriptedTransport::new(&[]);
        let mut modem = Modem::new(transport);
        upload_batch(&mut store, &mut modem, &config()).unwrap();
    }
}
