//! Domain data model for the lending back office.
//!
//! Everything here is a plain serde-friendly value type. Mutation rules
//! (who may change what, and when) live in [`crate::lifecycle`] and
//! [`crate::registry`]; the store persists these types as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a fresh string id for any aggregate.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Account roles known to the back office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Gestor,
    Analista,
    Tesoreria,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Gestor => "gestor",
            Role::Analista => "analista",
            Role::Tesoreria => "tesoreria",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A back-office account as exposed by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub display_name: String,
    pub phone: String,
    pub email: String,
    pub role: Role,
    pub active: bool,
}

impl Account {
    /// Synthetic actor used by maintenance operations such as the
    /// auto-archive sweep.
    pub fn system() -> Self {
        Self {
            id: "system".to_string(),
            display_name: "Sistema".to_string(),
            phone: String::new(),
            email: String::new(),
            role: Role::Admin,
            active: true,
        }
    }
}

/// One configurable stage of the credit review workflow.
///
/// `order` defines the workflow sequence; the state with the lowest order is
/// the entry state for new credits. States flagged `is_final` close the
/// credit in normal flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditState {
    pub id: String,
    pub name: String,
    pub order: u32,
    pub color: String,
    pub responsible_role: Role,
    pub is_final: bool,
}

impl CreditState {
    pub fn new(name: &str, responsible_role: Role, order: u32) -> Self {
        Self {
            id: new_id(),
            name: name.to_string(),
            order,
            color: "#607d8b".to_string(),
            responsible_role,
            is_final: false,
        }
    }
}

/// What executing a quick action does beyond recording history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum ActionEffect {
    None,
    ChangeStatus { target_state_id: String },
}

/// A per-state quick action reviewers can run without writing a comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateAction {
    pub id: String,
    pub state_id: String,
    pub label: String,
    /// Empty means any role may run the action.
    pub allowed_roles: Vec<Role>,
    pub order_index: u32,
    pub effect: ActionEffect,
}

impl StateAction {
    pub fn allows(&self, role: Role) -> bool {
        self.allowed_roles.is_empty() || self.allowed_roles.contains(&role)
    }
}

/// The central aggregate: one loan application tracked through its lifecycle.
///
/// `status_id` always references a live [`CreditState`]. Credits are never
/// hard-deleted; final states represent logical closure. The status field is
/// only mutated through the state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credit {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub gestor_id: String,
    pub analista_id: Option<String>,
    pub status_id: String,
    pub amount: f64,
    pub term_months: u32,
    pub rate: f64,
    pub disbursement_amount: Option<f64>,
    pub commission_pct: f64,
    pub commission_estimated: f64,
    pub commission_paid: bool,
    pub commission_paid_at: Option<DateTime<Utc>>,
    /// Free-form client-data bag (names, contact fields, lending entity...).
    pub client_data: serde_json::Value,
    /// Whether the client correction window is open. Reset on every status
    /// change.
    pub correction_enabled: bool,
}

impl Credit {
    /// Reads a string field from the client-data bag.
    pub fn client_field(&self, key: &str) -> Option<String> {
        self.client_data
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }
}

/// Append-only audit record. Never updated or deleted; ascending timestamp
/// order replays the credit's life, descending order is for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditHistoryEntry {
    pub id: String,
    pub credit_id: String,
    pub actor_id: Option<String>,
    pub action: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

/// An entry in the credit's activity feed. `author_id` is `None` for
/// system-authored comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditComment {
    pub id: String,
    pub credit_id: String,
    pub author_id: Option<String>,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Severity of an outbox notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Warning,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Info => "info",
            NotificationKind::Warning => "warning",
        }
    }
}

/// Abstract recipient tags an automation rule resolves at dispatch time.
///
/// The first three are payload-scoped (resolved from the event's embedded
/// snapshots); the last two broadcast to every active account in the role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleTag {
    Gestor,
    Analista,
    Cliente,
    Admins,
    Tesoreria,
}

/// An admin-configured subscription forwarding lifecycle events to a webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomationRule {
    pub id: String,
    pub name: String,
    pub webhook_url: String,
    pub active: bool,
    /// Event types this rule subscribes to. [`AutomationRule::WILDCARD`]
    /// matches everything, including event types never seen before.
    pub event_types: Vec<String>,
    /// Free-text terms matched loosely against the new-state name
    /// (OR semantics). Empty means no status filtering.
    pub status_filter: Vec<String>,
    pub recipient_roles: Vec<RoleTag>,
}

impl AutomationRule {
    pub const WILDCARD: &'static str = "all";

    /// An empty subscription list means subscribe-to-everything.
    pub fn normalize(mut self) -> Self {
        if self.event_types.is_empty() {
            self.event_types = vec![Self::WILDCARD.to_string()];
        }
        self
    }

    pub fn subscribes_to(&self, event_type: &str) -> bool {
        self.event_types.is_empty()
            || self
                .event_types
                .iter()
                .any(|t| t == Self::WILDCARD || t == event_type)
    }
}

/// Concrete contact attached to a dispatch payload. Ephemeral, never
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub role: String,
}

impl Recipient {
    pub fn from_account(account: &Account) -> Self {
        Self {
            name: account.display_name.clone(),
            phone: account.phone.clone(),
            email: account.email.clone(),
            role: account.role.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WithdrawalStatus {
    Pending,
    Processed,
    Rejected,
}

impl std::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WithdrawalStatus::Pending => "PENDING",
            WithdrawalStatus::Processed => "PROCESSED",
            WithdrawalStatus::Rejected => "REJECTED",
        };
        write!(f, "{s}")
    }
}

/// A request to pay out the commissions of a set of credits.
///
/// Processing to `PROCESSED` marks every referenced credit's commission as
/// paid exactly once; see [`crate::withdrawals`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: String,
    pub requester_id: String,
    pub status: WithdrawalStatus,
    pub total_amount: f64,
    pub credit_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processed_by: Option<String>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Analista).unwrap(), "\"analista\"");
        let parsed: Role = serde_json::from_str("\"gestor\"").unwrap();
        assert_eq!(parsed, Role::Gestor);
    }

    #[test]
    fn rule_normalize_defaults_to_wildcard() {
        let rule = AutomationRule {
            id: new_id(),
            name: "aviso".into(),
            webhook_url: "https://example.com/hook".into(),
            active: true,
            event_types: vec![],
            status_filter: vec![],
            recipient_roles: vec![],
        }
        .normalize();
        assert_eq!(rule.event_types, vec!["all".to_string()]);
        assert!(rule.subscribes_to("credit_status_change"));
        assert!(rule.subscribes_to("document_uploaded"));
    }

    #[test]
    fn rule_subscribes_to_listed_types_only() {
        let rule = AutomationRule {
            id: new_id(),
            name: "solo-cambios".into(),
            webhook_url: "https://example.com/hook".into(),
            active: true,
            event_types: vec!["credit_status_change".into()],
            status_filter: vec![],
            recipient_roles: vec![],
        };
        assert!(rule.subscribes_to("credit_status_change"));
        assert!(!rule.subscribes_to("credit_created"));
    }

    #[test]
    fn empty_allowed_roles_means_any() {
        let action = StateAction {
            id: new_id(),
            state_id: new_id(),
            label: "Aprobar".into(),
            allowed_roles: vec![],
            order_index: 1,
            effect: ActionEffect::None,
        };
        assert!(action.allows(Role::Gestor));
        assert!(action.allows(Role::Admin));

        let restricted = StateAction {
            allowed_roles: vec![Role::Analista],
            ..action
        };
        assert!(restricted.allows(Role::Analista));
        assert!(!restricted.allows(Role::Gestor));
    }

    #[test]
    fn credit_client_field_reads_bag() {
        let credit = sample_credit();
        assert_eq!(credit.client_field("nombre").as_deref(), Some("Maria Lopez"));
        assert_eq!(credit.client_field("telefono"), None);
    }

    #[test]
    fn credit_serialization_roundtrip() {
        let credit = sample_credit();
        let json = serde_json::to_string(&credit).unwrap();
        let parsed: Credit = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, credit);
    }

    #[test]
    fn withdrawal_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&WithdrawalStatus::Processed).unwrap(),
            "\"PROCESSED\""
        );
        assert_eq!(WithdrawalStatus::Pending.to_string(), "PENDING");
    }

    fn sample_credit() -> Credit {
        let now = Utc::now();
        Credit {
            id: new_id(),
            created_at: now,
            updated_at: now,
            gestor_id: "g1".into(),
            analista_id: None,
            status_id: "s1".into(),
            amount: 12_000_000.0,
            term_months: 36,
            rate: 1.6,
            disbursement_amount: None,
            commission_pct: 2.0,
            commission_estimated: 240_000.0,
            commission_paid: false,
            commission_paid_at: None,
            client_data: serde_json::json!({"nombre": "Maria Lopez"}),
            correction_enabled: false,
        }
    }
}
