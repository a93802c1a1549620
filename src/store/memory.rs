//! In-memory implementations of the collaborator contracts.
//!
//! All state is held in `RwLock`-protected vectors and lost on drop. These
//! back the test suites and the demo binary; a production deployment plugs a
//! real store in behind the same traits.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{AccountsDirectory, NotificationOutbox, Store};
use crate::error::Result;
use crate::model::{
    Account, AutomationRule, Credit, CreditComment, CreditHistoryEntry, CreditState,
    NotificationKind, Role, StateAction, WithdrawalRequest,
};

/// In-memory persistent store.
#[derive(Default)]
pub struct MemoryStore {
    states: RwLock<Vec<CreditState>>,
    actions: RwLock<Vec<StateAction>>,
    credits: RwLock<Vec<Credit>>,
    history: RwLock<Vec<CreditHistoryEntry>>,
    comments: RwLock<Vec<CreditComment>>,
    rules: RwLock<Vec<AutomationRule>>,
    withdrawals: RwLock<Vec<WithdrawalRequest>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn upsert_by_id<T, F>(items: &mut Vec<T>, item: T, same_id: F)
where
    F: Fn(&T) -> bool,
{
    match items.iter_mut().find(|existing| same_id(existing)) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_states(&self) -> Result<Vec<CreditState>> {
        let mut states = self.states.read().await.clone();
        states.sort_by_key(|s| s.order);
        Ok(states)
    }

    async fn get_state(&self, id: &str) -> Result<Option<CreditState>> {
        let states = self.states.read().await;
        Ok(states.iter().find(|s| s.id == id).cloned())
    }

    async fn put_state(&self, state: CreditState) -> Result<()> {
        let mut states = self.states.write().await;
        let id = state.id.clone();
        upsert_by_id(&mut states, state, |s| s.id == id);
        Ok(())
    }

    async fn delete_state(&self, id: &str) -> Result<()> {
        let mut states = self.states.write().await;
        states.retain(|s| s.id != id);
        Ok(())
    }

    async fn list_actions(&self, state_id: &str) -> Result<Vec<StateAction>> {
        let actions = self.actions.read().await;
        let mut matching: Vec<StateAction> = actions
            .iter()
            .filter(|a| a.state_id == state_id)
            .cloned()
            .collect();
        matching.sort_by_key(|a| a.order_index);
        Ok(matching)
    }

    async fn get_action(&self, id: &str) -> Result<Option<StateAction>> {
        let actions = self.actions.read().await;
        Ok(actions.iter().find(|a| a.id == id).cloned())
    }

    async fn put_action(&self, action: StateAction) -> Result<()> {
        let mut actions = self.actions.write().await;
        let id = action.id.clone();
        upsert_by_id(&mut actions, action, |a| a.id == id);
        Ok(())
    }

    async fn delete_action(&self, id: &str) -> Result<()> {
        let mut actions = self.actions.write().await;
        actions.retain(|a| a.id != id);
        Ok(())
    }

    async fn get_credit(&self, id: &str) -> Result<Option<Credit>> {
        let credits = self.credits.read().await;
        Ok(credits.iter().find(|c| c.id == id).cloned())
    }

    async fn put_credit(&self, credit: Credit) -> Result<()> {
        let mut credits = self.credits.write().await;
        let id = credit.id.clone();
        upsert_by_id(&mut credits, credit, |c| c.id == id);
        Ok(())
    }

    async fn list_credits(&self) -> Result<Vec<Credit>> {
        Ok(self.credits.read().await.clone())
    }

    async fn append_history(&self, entry: CreditHistoryEntry) -> Result<()> {
        self.history.write().await.push(entry);
        Ok(())
    }

    async fn list_history(&self, credit_id: &str) -> Result<Vec<CreditHistoryEntry>> {
        let history = self.history.read().await;
        let mut matching: Vec<CreditHistoryEntry> = history
            .iter()
            .filter(|e| e.credit_id == credit_id)
            .cloned()
            .collect();
        matching.sort_by_key(|e| e.timestamp);
        Ok(matching)
    }

    async fn add_comment(&self, comment: CreditComment) -> Result<()> {
        self.comments.write().await.push(comment);
        Ok(())
    }

    async fn list_comments(&self, credit_id: &str) -> Result<Vec<CreditComment>> {
        let comments = self.comments.read().await;
        Ok(comments
            .iter()
            .filter(|c| c.credit_id == credit_id)
            .cloned()
            .collect())
    }

    async fn list_rules(&self) -> Result<Vec<AutomationRule>> {
        Ok(self.rules.read().await.clone())
    }

    async fn put_rule(&self, rule: AutomationRule) -> Result<()> {
        let mut rules = self.rules.write().await;
        let rule = rule.normalize();
        let id = rule.id.clone();
        upsert_by_id(&mut rules, rule, |r| r.id == id);
        Ok(())
    }

    async fn get_withdrawal(&self, id: &str) -> Result<Option<WithdrawalRequest>> {
        let withdrawals = self.withdrawals.read().await;
        Ok(withdrawals.iter().find(|w| w.id == id).cloned())
    }

    async fn put_withdrawal(&self, request: WithdrawalRequest) -> Result<()> {
        let mut withdrawals = self.withdrawals.write().await;
        let id = request.id.clone();
        upsert_by_id(&mut withdrawals, request, |w| w.id == id);
        Ok(())
    }
}

/// In-memory identity provider. Accounts keep insertion order.
#[derive(Default)]
pub struct MemoryDirectory {
    accounts: RwLock<Vec<Account>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, account: Account) {
        let mut accounts = self.accounts.write().await;
        let id = account.id.clone();
        upsert_by_id(&mut accounts, account, |a| a.id == id);
    }
}

#[async_trait]
impl AccountsDirectory for MemoryDirectory {
    async fn get(&self, id: &str) -> Result<Option<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn list_active(&self, role: Role) -> Result<Vec<Account>> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .iter()
            .filter(|a| a.role == role && a.active)
            .cloned()
            .collect())
    }
}

/// A notification captured by [`MemoryOutbox`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedNotification {
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub related_credit_id: Option<String>,
}

/// In-memory outbox that records every enqueued notification.
#[derive(Default)]
pub struct MemoryOutbox {
    queued: RwLock<Vec<QueuedNotification>>,
}

impl MemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn queued(&self) -> Vec<QueuedNotification> {
        self.queued.read().await.clone()
    }
}

#[async_trait]
impl NotificationOutbox for MemoryOutbox {
    async fn enqueue(
        &self,
        user_id: &str,
        title: &str,
        message: &str,
        kind: NotificationKind,
        related_credit_id: Option<&str>,
    ) -> Result<()> {
        self.queued.write().await.push(QueuedNotification {
            user_id: user_id.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            kind,
            related_credit_id: related_credit_id.map(|s| s.to_string()),
        });
        Ok(())
    }
}
