// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persistent and transient record types (§3).

/// A persisted structural-fatigue row. `sent_upstream` starts `false` and
/// transitions exactly once, `false` → `true`, on upstream acknowledgement.
#[derive(Debug, Clone, PartialEq)]
pub struct FatigueRecord {
    pub log_id: i64,
    pub timestamp: String,
    pub node_id: u16,
    pub bin_1_cycles: u32,
    pub bin_2_cycles: u32,
    pub bin_3_cycles: u32,
    pub sent_upstream: bool,
}

/// A persisted environment ("scout") row. Scout data is never forwarded
/// upstream, so there is no send-state to track.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentRecord {
    pub log_id: i64,
    pub received_at: String,
    pub node_id: u8,
    pub temperature_c: f32,
    pub humidity_rh: f32,
}

/// A sensor node's static metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDescriptor {
    pub node_id: u16,
    pub location_description: String,
    pub install_date: String,
}

/// A configured alert rule, loaded once at start from the rules file (§6)
/// and never mutated afterward.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRule {
    pub node_id: u16,
    pub field_to_monitor: String,
    pub threshold: f64,
    pub alert_message: String,
}

impl AlertRule {
    /// Renders `alert_message`, substituting `{node}`, `{value}`, `{threshold}`.
    pub fn render(&self, node_id: u16, value: f64) -> String {
        self.alert_message
            .replace("{node}", &node_id.to_string())
            .replace("{value}", &format_numeric(value))
            .replace("{threshold}", &format_numeric(self.threshold))
    }
}

/// Formats a value the way the rule templates expect: integral values print
/// without a trailing `.0` (the source's Python f-string formatting does the
/// same for ints), fractional values print with their natural precision.
fn format_numeric(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
