// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The supervisor (§4.G): starts every long-lived component on its own
//! named thread, polls for unexpected exits, and coordinates orderly
//! shutdown on the first fault or operator interrupt signal.
//!
//! Grounded in `task-jefe`'s "monitor tasks for failures and restart/log"
//! role and in `main_py (1).py`'s top-level `try`/`except KeyboardInterrupt`
//! — translated from jefe's kernel-mediated task table to plain
//! `std::thread::JoinHandle`s, since this gateway has no kernel to ask.
//! Unlike jefe, a faulted component here is not restarted: a partial crash
//! during in-flight persistence or an HTTP dialogue is not safely
//! resumable mid-operation, so the supervisor instead signals every other
//! component to wind down and the process exits non-zero (§10.6).

use std::thread::JoinHandle;
use std::time::Duration;

use gateway_core::queue::BoundedQueue;
use gateway_core::ShutdownSignal;
use log::{error, info};

/// How often the supervisor polls spawned threads for an unexpected exit.
const LIVENESS_POLL: Duration = Duration::from_secs(5);

/// A long-lived component thread the supervisor watches.
pub struct Supervised {
    pub name: &'static str,
    pub handle: JoinHandle<()>,
}

/// Installs a `ctrlc` handler that signals `shutdown` on SIGINT/SIGTERM,
/// mirroring `main_py (1).py`'s `except KeyboardInterrupt` orderly-shutdown
/// path.
pub fn install_signal_handler(shutdown: ShutdownSignal) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        info!("shutdown signal received");
        shutdown.signal();
    })
}

/// Blocks until every supervised thread has exited, polling for unexpected
/// exits and escalating them to a full shutdown. Returns `true` if every
/// thread exited cleanly (no panic), `false` if any component faulted.
///
/// A panic or an exit before shutdown was requested is a `WatchdogFailure`
/// (§7): besides logging and signaling shutdown, it places an operator
/// alert naming the component on `alerts`, mirroring `main_py (1).py`'s
/// `alert_queue.put(alert_message, block=False)` ahead of
/// `shutdown_event.set()`.
pub fn supervise(
    shutdown: &ShutdownSignal,
    alerts: &BoundedQueue<String>,
    components: Vec<Supervised>,
) -> bool {
    let mut remaining = components;
    let mut clean = true;

    loop {
        if remaining.is_empty() {
            break;
        }

        std::thread::sleep(LIVENESS_POLL);

        let mut still_running = Vec::with_capacity(remaining.len());
        for component in remaining {
            if component.handle.is_finished() {
                match component.handle.join() {
                    Ok(()) => {
                        info!("component '{}' exited", component.name);
                    }
                    Err(_) => {
                        error!(
                            "component '{}' panicked, signaling shutdown",
                            component.name
                        );
                        alerts
                            .try_put(format!("WATCHDOG: component '{}' panicked", component.name));
                        clean = false;
                    }
                }
                if !shutdown.is_shutting_down() {
                    error!(
                        "component '{}' exited before shutdown was requested, signaling shutdown",
                        component.name
                    );
                    alerts.try_put(format!(
                        "WATCHDOG: component '{}' exited unexpectedly",
                        component.name
                    ));
                    clean = false;
                }
                shutdown.signal();
            } else {
                still_running.push(component);
            }
        }
        remaining = still_running;
    }

    clean
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_exit_of_every_component_after_shutdown_is_reported_clean() {
        let shutdown = ShutdownSignal::new();
        let alerts: BoundedQueue<String> = BoundedQueue::new("alerts", 50);
        let s = shutdown.clone();
        let handle = std::thread::Builder::new()
            .name("test-component".into())
            .spawn(move || {
                while !s.is_shutting_down() {
                    std::thread::sleep(Duration::from_millis(10));
                }
            })
            .unwrap();

        let shutdown_trigger = shutdown.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            shutdown_trigger.signal();
        });

        let clean = supervise(
            &shutdown,
            &alerts,
            vec![Supervised {
                name: "test-component",
                handle,
            }],
        );
        assert!(clean);
        assert!(alerts.try_pop().is_none());
    }

    #[test]
    fn unexpected_exit_signals_shutdown_and_is_reported_unclean() {
        let shutdown = ShutdownSignal::new();
        let alerts: BoundedQueue<String> = BoundedQueue::new("alerts", 50);
        let handle = std::thread::Builder::new()
            .name("flaky-component".into())
            .spawn(|| {
                // Exits immediately, before anyone signals shutdown.
            })
            .unwrap();

        let clean = supervise(
            &shutdown,
            &alerts,
            vec![Supervised {
                name: "flaky-component",
                handle,
            }],
        );
        assert!(!clean);
        assert!(shutdown.is_shutting_down());
        let alert = alerts
            .try_pop()
            .expect("watchdog alert for unexpected exit");
        assert!(alert.contains("flaky-component"));
    }
}
