// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The alert-rule engine (§3 "Alert rule", §4.D step 4).
//!
//! Rules are loaded once at start and never mutated; evaluation is a pure
//! function of a node id and its field values so it needs no shared state of
//! its own.

use crate::codec::PrimaryPacket;
use crate::model::AlertRule;

/// An immutable, start-time-loaded rule set.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<AlertRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<AlertRule>) -> Self {
        RuleSet { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluates every rule whose `node_id` matches `packet.node_id`,
    /// rendering an alert message for each field whose value strictly
    /// exceeds (`>`, never `>=`) the configured threshold.
    pub fn evaluate(&self, packet: &PrimaryPacket) -> Vec<String> {
        let mut alerts = Vec::new();
        for rule in &self.rules {
            if rule.node_id != packet.node_id {
                continue;
            }
            let Some(value) = packet.field(&rule.field_to_monitor) else {
                continue;
            };
            if f64::from(value) > rule.threshold {
                alerts.push(rule.render(packet.node_id, f64::from(value)));
            }
        }
        alerts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet() -> PrimaryPacket {
        PrimaryPacket {
            node_id: 1,
            bin_1_cycles: 5,
            bin_2_cycles: 10,
            bin_3_cycles: 20,
        }
    }

    #[test]
    fn no_rules_means_no_alerts() {
        let rules = RuleSet::new(vec![]);
        assert!(rules.evaluate(&packet()).is_empty());
    }

    #[test]
    fn matching_rule_over_threshold_fires() {
        let rules = RuleSet::new(vec![AlertRule {
            node_id: 1,
            field_to_monitor: "bin_3_cycles".to_string(),
            threshold: 15.0,
            alert_message: "N{node} val{value} thr{threshold}".to_string(),
        }]);
        assert_eq!(
            rules.evaluate(&packet()),
            vec!["N1 val20 thr15".to_string()]
        );
    }

    #[test]
    fn equal_to_threshold_does_not_fire() {
        let rules = RuleSet::new(vec![AlertRule {
            node_id: 1,
            field_to_monitor: "bin_3_cycles".to_string(),
            threshold: 20.0,
            alert_message: "{value}".to_string(),
        }]);
        assert!(rules.evaluate(&packet()).is_empty());
    }

    #[test]
    fn rule_for_different_node_does_not_fire() {
        let rules = RuleSet::new(vec![AlertRule {
            node_id: 2,
            field_to_monitor: "bin_3_cycles".to_string(),
            threshold: 1.0,
            alert_message: "{value}".to_string(),
        }]);
        assert!(rules.evaluate(&packet()).is_empty());
    }
}
