// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Process entry point for the SETU sensor gateway (§4.G, §10.6).
//!
//! Wires configuration, logging, the durable store, the shared bus, the
//! three hand-off queues, and every long-lived component, then hands them
//! to the supervisor. Exit code contract per §10.6: `0` on clean shutdown,
//! non-zero when a fatal precondition (bus unavailable, store unreadable)
//! fails at start.

mod config;
mod processor;
mod rules_file;
mod supervisor;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use gateway_core::bus::BusArbiter;
use gateway_core::queue::{BoundedQueue, ALERT_CAPACITY, HIGH_PRIO_CAPACITY, LOW_PRIO_CAPACITY};
use gateway_core::ShutdownSignal;
use gateway_modem::{EgressConfig, Modem, SerialTransport};
use gateway_radio::sim::{NullPrimaryRadio, NullScoutRadio};
use gateway_radio::Latch;
use gateway_store::Store;
use log::{error, info};

use supervisor::Supervised;

/// How often the archiver wakes to check whether it's due for a pass (§4.F
/// runs on a daily cadence; shutdown is still observed promptly).
const ARCHIVE_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
const ARCHIVE_POLL: Duration = Duration::from_secs(1);

fn main() -> ExitCode {
    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            use std::io::Write;
            let thread = std::thread::current();
            let thread_name = thread.name().unwrap_or("unnamed");
            writeln!(
                buf,
                "{} {:5} [{:15}] {}: {}",
                buf.timestamp(),
                record.level(),
                thread_name,
                record.target(),
                record.args()
            )
        })
        .init();

    let config = match config::GatewayConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Opened once here purely to fail fast on an unreadable/unmigratable
    // store before any thread is spawned (§10.6); each long-lived
    // component below opens its own connection (§5 "one connection per
    // owning component").
    if let Err(e) = Store::open(&config.db_path) {
        error!("durable store unreadable at {}: {e}", config.db_path);
        return ExitCode::FAILURE;
    }

    let shutdown = ShutdownSignal::new();

    if let Err(e) = supervisor::install_signal_handler(shutdown.clone()) {
        error!("failed to install signal handler: {e}");
        return ExitCode::FAILURE;
    }

    let rules = rules_file::load_rules(Path::new(&config.rules_path));
    let bus = Arc::new(BusArbiter::new());

    let high_prio: BoundedQueue<Vec<u8>> = BoundedQueue::new("high_prio", HIGH_PRIO_CAPACITY);
    let low_prio: BoundedQueue<Vec<u8>> = BoundedQueue::new("low_prio", LOW_PRIO_CAPACITY);
    let alerts: BoundedQueue<String> = BoundedQueue::new("alerts", ALERT_CAPACITY);

    let primary_latch = Arc::new(Latch::new());
    let scout_latch = Arc::new(Latch::new());

    // `gateway-radio`'s driver traits stand in for the opaque concrete
    // radio libraries this core treats as out of scope; `NullPrimaryRadio`/
    // `NullScoutRadio` (see `gateway_radio::sim`) let the gateway run
    // end-to-end with no real hardware attached. A board integration swaps
    // these type parameters for real driver types and changes nothing else
    // here.
    let primary_handle = {
        let latch = Arc::clone(&primary_latch);
        let shutdown = shutdown.clone();
        let high_prio = high_prio.clone();
        let bus = Arc::clone(&bus);
        let chip_select = config.primary_radio_port;
        std::thread::Builder::new()
            .name("primary-radio".into())
            .spawn(move || {
                gateway_radio::run_primary_ingestor::<NullPrimaryRadio>(
                    &latch,
                    &shutdown,
                    &bus,
                    &high_prio,
                    chip_select,
                )
            })
            .expect("failed to spawn primary-radio thread")
    };

    let scout_handle = {
        let latch = Arc::clone(&scout_latch);
        let shutdown = shutdown.clone();
        let low_prio = low_prio.clone();
        let bus = Arc::clone(&bus);
        let chip_select = config.scout_radio_port;
        std::thread::Builder::new()
            .name("scout-radio".into())
            .spawn(move || {
                gateway_radio::run_scout_ingestor::<NullScoutRadio>(
                    &latch,
                    &shutdown,
                    &bus,
                    &low_prio,
                    chip_select,
                )
            })
            .expect("failed to spawn scout-radio thread")
    };

    let processor_handle = {
        let shutdown = shutdown.clone();
        let high_prio = high_prio.clone();
        let low_prio = low_prio.clone();
        let alerts = alerts.clone();
        let db_path = config.db_path.clone();
        std::thread::Builder::new()
            .name("processor".into())
            .spawn(move || {
                let mut store = match Store::open(&db_path) {
                    Ok(store) => store,
                    Err(e) => {
                        error!("processor could not open store: {e}");
                        return;
                    }
                };
                processor::run_processor(
                    &shutdown, &high_prio, &low_prio, &alerts, &mut store, &rules,
                );
            })
            .expect("failed to spawn processor thread")
    };

    let egress_handle = {
        let shutdown = shutdown.clone();
        let alerts = alerts.clone();
        let db_path = config.db_path.clone();
        let modem_device = config.modem_device.clone();
        let egress_config = EgressConfig {
            recipient_number: config.recipient_number.clone(),
            upstream_url: config.upstream_url.clone(),
            gprs_apn: config.gprs_apn.clone(),
            gateway_id: config.gateway_id.clone(),
        };
        std::thread::Builder::new()
            .name("egress".into())
            .spawn(move || {
                let mut store = match Store::open(&db_path) {
                    Ok(store) => store,
                    Err(e) => {
                        error!("egress could not open store: {e}");
                        return;
                    }
                };
                let transport = match SerialTransport::open(&modem_device) {
                    Ok(transport) => transport,
                    Err(e) => {
                        error!("egress could not open modem device {modem_device}: {e}");
                        return;
                    }
                };
                let mut modem = Modem::new(transport);
                gateway_modem::run_egress(
                    &shutdown,
                    &alerts,
                    &mut store,
                    &mut modem,
                    &egress_config,
                );
            })
            .expect("failed to spawn egress thread")
    };

    let archiver_handle = {
        let shutdown = shutdown.clone();
        let db_path = config.db_path.clone();
        let archive_dir = config.archive_dir.clone();
        let archive_days = config.archive_days;
        std::thread::Builder::new()
            .name("archiver-timer".into())
            .spawn(move || {
                let mut store = match Store::open(&db_path) {
                    Ok(store) => store,
                    Err(e) => {
                        error!("archiver could not open store: {e}");
                        return;
                    }
                };
                run_archiver_timer(&shutdown, &mut store, Path::new(&archive_dir), archive_days);
            })
            .expect("failed to spawn archiver-timer thread")
    };

    info!("gateway started, gateway_id={}", config.gateway_id);

    let clean = supervisor::supervise(
        &shutdown,
        &alerts,
        vec![
            Supervised {
                name: "primary-radio",
                handle: primary_handle,
            },
            Supervised {
                name: "scout-radio",
                handle: scout_handle,
            },
            Supervised {
                name: "processor",
                handle: processor_handle,
            },
            Supervised {
                name: "egress",
                handle: egress_handle,
            },
            Supervised {
                name: "archiver-timer",
                handle: archiver_handle,
            },
        ],
    );

    info!("gateway shut down");
    if clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Runs the archiver on a fixed daily cadence (§4.F), checking shutdown
/// between passes rather than mid-pass — an in-flight archive pass always
/// completes its write-then-delete transaction before the loop checks
/// again.
fn run_archiver_timer(
    shutdown: &ShutdownSignal,
    store: &mut Store,
    archive_dir: &Path,
    archive_days: i64,
) {
    let mut elapsed = Duration::ZERO;
    while !shutdown.is_shutting_down() {
        if elapsed >= ARCHIVE_INTERVAL {
            elapsed = Duration::ZERO;
            match gateway_archiver::archive_and_purge(
                store,
                archive_dir,
                archive_days,
                chrono::Utc::now(),
            ) {
                Ok(purged) => info!("archived and purged {purged} row(s)"),
                Err(e) => error!("archive pass failed: {e}"),
            }
        }
        std::thread::sleep(ARCHIVE_POLL);
        elapsed += ARCHIVE_POLL;
    }
}
