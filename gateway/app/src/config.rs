// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Process-start configuration (SPEC_FULL.md §10.4), read once from
//! environment variables — no dynamic reconfiguration. Mirrors
//! `archive.py`'s `os.environ.get(..., default)` pattern and
//! `communications_thread.py`'s module-level constants, centralized here
//! instead of scattered per-file.

use std::fmt;

const DEFAULT_DB_PATH: &str = "setu_gateway.db";
const DEFAULT_ARCHIVE_DIR: &str = "archive";
const DEFAULT_ARCHIVE_DAYS: i64 = 365;
const DEFAULT_RULES_PATH: &str = "rules.yaml";
const DEFAULT_MODEM_DEVICE: &str = "/dev/serial0";
const DEFAULT_PRIMARY_RADIO_PORT: u8 = 0;
const DEFAULT_SCOUT_RADIO_PORT: u8 = 1;

#[derive(Debug)]
pub struct MissingEnvVar(pub &'static str);

impl fmt::Display for MissingEnvVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "required environment variable {} is not set", self.0)
    }
}

impl std::error::Error for MissingEnvVar {}

/// The gateway's process-start configuration.
pub struct GatewayConfig {
    pub db_path: String,
    pub archive_dir: String,
    pub archive_days: i64,
    pub rules_path: String,
    pub recipient_number: String,
    pub upstream_url: String,
    pub gprs_apn: String,
    pub gateway_id: String,
    pub primary_radio_port: u8,
    pub scout_radio_port: u8,
    pub modem_device: String,
}

impl GatewayConfig {
    /// Reads configuration from the process environment. Fails if any
    /// required variable (recipient number, upstream URL, APN, gateway id)
    /// is absent.
    pub fn from_env() -> Result<Self, MissingEnvVar> {
        Ok(GatewayConfig {
            db_path: env_or_default("SETU_DB_PATH", DEFAULT_DB_PATH),
            archive_dir: env_or_default("SETU_ARCHIVE_DIR", DEFAULT_ARCHIVE_DIR),
            archive_days: std::env::var("SETU_ARCHIVE_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_ARCHIVE_DAYS),
            rules_path: env_or_default("SETU_RULES_PATH", DEFAULT_RULES_PATH),
            recipient_number: required_env("SETU_RECIPIENT_NUMBER")?,
            upstream_url: required_env("SETU_UPSTREAM_URL")?,
            gprs_apn: required_env("SETU_GPRS_APN")?,
            gateway_id: required_env("SETU_GATEWAY_ID")?,
            primary_radio_port: std::env::var("SETU_PRIMARY_RADIO_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PRIMARY_RADIO_PORT),
            scout_radio_port: std::env::var("SETU_SCOUT_RADIO_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SCOUT_RADIO_PORT),
            modem_device: env_or_default("SETU_MODEM_DEVICE", DEFAULT_MODEM_DEVICE),
        })
    }
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn required_env(name: &'static str) -> Result<String, MissingEnvVar> {
    std::env::var(name).map_err(|_| MissingEnvVar(name))
}
