// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Loads the alert-rule table from a YAML file (§10.4) into a
//! [`RuleSet`]. A missing file is not fatal — the gateway runs with zero
//! rules rather than refusing to start, matching `processing_thread.py`'s
//! tolerant `json.load` fallback to an empty rule list.

use std::fs;
use std::path::Path;

use gateway_core::model::AlertRule;
use gateway_core::rules::RuleSet;
use log::{error, info, warn};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RulesFile {
    #[serde(default)]
    rules: Vec<AlertRuleEntry>,
}

#[derive(Debug, Deserialize)]
struct AlertRuleEntry {
    node_id: u16,
    field_to_monitor: String,
    threshold: f64,
    alert_message: String,
}

impl From<AlertRuleEntry> for AlertRule {
    fn from(entry: AlertRuleEntry) -> Self {
        AlertRule {
            node_id: entry.node_id,
            field_to_monitor: entry.field_to_monitor,
            threshold: entry.threshold,
            alert_message: entry.alert_message,
        }
    }
}

/// Loads alert rules from `path`. Returns an empty [`RuleSet`] if the file
/// does not exist or fails to parse — a malformed rules file degrades the
/// gateway to "no alerting", it never blocks startup.
pub fn load_rules(path: &Path) -> RuleSet {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            warn!(
                "rules file {} not readable ({e}), starting with no alert rules",
                path.display()
            );
            return RuleSet::new(vec![]);
        }
    };

    match serde_yaml::from_str::<RulesFile>(&contents) {
        Ok(parsed) => {
            let rules: Vec<AlertRule> = parsed.rules.into_iter().map(Into::into).collect();
            info!(
                "loaded {} alert rule(s) from {}",
                rules.len(),
                path.display()
            );
            RuleSet::new(rules)
        }
        Err(e) => {
            error!(
                "rules file {} is malformed ({e}), starting with no alert rules",
                path.display()
            );
            RuleSet::new(vec![])
        }
    }
}
