//! Collaborator contracts the engine consumes.
//!
//! [`Store`] abstracts the persistent store (CRUD over the back-office
//! collections), [`AccountsDirectory`] the identity provider, and
//! [`NotificationOutbox`] the fire-and-forget notification queue.
//! Implementations can provide different backends; the in-memory ones here
//! back the tests and the demo binary.
//!
//! No multi-row transactions are assumed: multi-step mutations in the
//! lifecycle are written to tolerate partial completion.

mod memory;

pub use memory::{MemoryDirectory, MemoryOutbox, MemoryStore, QueuedNotification};

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{
    Account, AutomationRule, Credit, CreditComment, CreditHistoryEntry, CreditState,
    NotificationKind, Role, StateAction, WithdrawalRequest,
};

/// Persistent store contract.
///
/// All `put_*` methods have upsert semantics. History is append-only:
/// entries are never updated or deleted.
#[async_trait]
pub trait Store: Send + Sync {
    // Workflow states

    /// All states, ordered by `order` ascending.
    async fn list_states(&self) -> Result<Vec<CreditState>>;
    async fn get_state(&self, id: &str) -> Result<Option<CreditState>>;
    async fn put_state(&self, state: CreditState) -> Result<()>;
    async fn delete_state(&self, id: &str) -> Result<()>;

    // State actions

    /// Actions for one state, ordered by `order_index` ascending.
    async fn list_actions(&self, state_id: &str) -> Result<Vec<StateAction>>;
    async fn get_action(&self, id: &str) -> Result<Option<StateAction>>;
    async fn put_action(&self, action: StateAction) -> Result<()>;
    async fn delete_action(&self, id: &str) -> Result<()>;

    // Credits

    async fn get_credit(&self, id: &str) -> Result<Option<Credit>>;
    async fn put_credit(&self, credit: Credit) -> Result<()>;
    async fn list_credits(&self) -> Result<Vec<Credit>>;

    // History and activity feed

    async fn append_history(&self, entry: CreditHistoryEntry) -> Result<()>;
    /// History for one credit in ascending timestamp order (replay order).
    async fn list_history(&self, credit_id: &str) -> Result<Vec<CreditHistoryEntry>>;
    async fn add_comment(&self, comment: CreditComment) -> Result<()>;
    async fn list_comments(&self, credit_id: &str) -> Result<Vec<CreditComment>>;

    // Automation rules

    async fn list_rules(&self) -> Result<Vec<AutomationRule>>;
    async fn put_rule(&self, rule: AutomationRule) -> Result<()>;

    // Withdrawals

    async fn get_withdrawal(&self, id: &str) -> Result<Option<WithdrawalRequest>>;
    async fn put_withdrawal(&self, request: WithdrawalRequest) -> Result<()>;
}

/// Identity provider contract.
#[async_trait]
pub trait AccountsDirectory: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Account>>;
    /// Active accounts holding `role`, in stable (insertion) order. The
    /// balancer relies on this order for tie-breaking.
    async fn list_active(&self, role: Role) -> Result<Vec<Account>>;
}

/// Notification outbox contract. Fire-and-forget: no delivery guarantee is
/// required from the engine's perspective.
#[async_trait]
pub trait NotificationOutbox: Send + Sync {
    async fn enqueue(
        &self,
        user_id: &str,
        title: &str,
        message: &str,
        kind: NotificationKind,
        related_credit_id: Option<&str>,
    ) -> Result<()>;
}
