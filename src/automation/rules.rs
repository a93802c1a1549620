//! Automation rule matching.
//!
//! A rule matches an event when it is active, subscribes to the event type
//! (or carries the `all` wildcard), and — for status changes only — at least
//! one status-filter term loosely matches the new-state name.

use crate::lifecycle::CreditEvent;
use crate::model::AutomationRule;

pub fn rule_matches(rule: &AutomationRule, event: &CreditEvent) -> bool {
    if !rule.active {
        return false;
    }
    if !rule.subscribes_to(event.event_type()) {
        return false;
    }
    if event.event_type() == "credit_status_change" && !rule.status_filter.is_empty() {
        let Some(state_name) = event.new_state_name() else {
            return false;
        };
        return rule
            .status_filter
            .iter()
            .any(|term| loose_match(term, state_name));
    }
    true
}

/// Bidirectional case-insensitive substring match, so admins can type
/// partial state names in either direction.
fn loose_match(term: &str, state_name: &str) -> bool {
    let term = term.to_lowercase();
    let name = state_name.to_lowercase();
    !term.is_empty() && (name.contains(&term) || term.contains(&name))
}

/// Active rules matching `event`.
pub fn match_rules<'a>(rules: &'a [AutomationRule], event: &CreditEvent) -> Vec<&'a AutomationRule> {
    rules.iter().filter(|rule| rule_matches(rule, event)).collect()
}
