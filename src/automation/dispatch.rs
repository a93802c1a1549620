//! Webhook fan-out for matched automation rules.
//!
//! [`AutomationDispatcher`] is the [`EventPublisher`] the state machine is
//! wired to. `publish` is fire-and-forget: the triggering transition
//! resolves before any delivery completes. Each matched rule is delivered
//! independently and in parallel; one rule's failure never affects the
//! others, failures are logged and never retried.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::error::WebhookError;
use super::recipients::resolve_recipients;
use super::rules::match_rules;
use crate::lifecycle::{CreditEvent, EventPublisher};
use crate::model::{AutomationRule, Recipient};
use crate::store::{AccountsDirectory, Store};

/// Webhook transport contract: one JSON POST, success or failure.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post(&self, url: &str, body: &Value) -> Result<(), WebhookError>;
}

/// reqwest-backed transport.
pub struct HttpWebhookTransport {
    client: Client,
}

impl HttpWebhookTransport {
    pub fn new() -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self { client }
    }
}

impl Default for HttpWebhookTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebhookTransport for HttpWebhookTransport {
    async fn post(&self, url: &str, body: &Value) -> Result<(), WebhookError> {
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WebhookError::Status {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

/// Builds the dispatch envelope: stable header fields plus the event payload
/// flattened alongside them.
pub fn build_envelope(
    source: &str,
    rule_name: &str,
    event: &CreditEvent,
    recipients: &[Recipient],
) -> Value {
    let mut body = serde_json::Map::new();
    body.insert("event".into(), Value::String(event.event_type().into()));
    body.insert("timestamp".into(), Value::String(Utc::now().to_rfc3339()));
    body.insert("source".into(), Value::String(source.to_string()));
    body.insert("automationType".into(), Value::String(rule_name.to_string()));
    body.insert(
        "recipients".into(),
        serde_json::to_value(recipients).unwrap_or(Value::Array(Vec::new())),
    );
    if let Value::Object(payload) = event.payload_json() {
        body.extend(payload);
    }
    Value::Object(body)
}

/// Matches rules and fans events out to their webhooks.
#[derive(Clone)]
pub struct AutomationDispatcher {
    store: Arc<dyn Store>,
    directory: Arc<dyn AccountsDirectory>,
    transport: Arc<dyn WebhookTransport>,
    source: String,
}

impl AutomationDispatcher {
    pub fn new(
        store: Arc<dyn Store>,
        directory: Arc<dyn AccountsDirectory>,
        transport: Arc<dyn WebhookTransport>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            store,
            directory,
            transport,
            source: source.into(),
        }
    }

    /// Delivers `event` to every matching rule and waits for the whole
    /// fan-out. Returns how many deliveries succeeded.
    pub async fn deliver(&self, event: &CreditEvent) -> usize {
        let rules = match self.store.list_rules().await {
            Ok(rules) => rules,
            Err(err) => {
                warn!(error = %err, "could not load automation rules");
                return 0;
            }
        };
        let matched: Vec<AutomationRule> =
            match_rules(&rules, event).into_iter().cloned().collect();
        if matched.is_empty() {
            return 0;
        }

        let mut deliveries = JoinSet::new();
        for rule in matched {
            let recipients =
                resolve_recipients(self.directory.as_ref(), &rule.recipient_roles, event).await;
            let envelope = build_envelope(&self.source, &rule.name, event, &recipients);
            let transport = Arc::clone(&self.transport);
            deliveries.spawn(async move {
                match transport.post(&rule.webhook_url, &envelope).await {
                    Ok(()) => {
                        info!(rule = %rule.name, "webhook delivered");
                        true
                    }
                    Err(err) => {
                        warn!(
                            rule = %rule.name,
                            url = %rule.webhook_url,
                            error = %err,
                            "webhook delivery failed"
                        );
                        false
                    }
                }
            });
        }

        let mut delivered = 0;
        while let Some(result) = deliveries.join_next().await {
            if matches!(result, Ok(true)) {
                delivered += 1;
            }
        }
        delivered
    }
}

#[async_trait]
impl EventPublisher for AutomationDispatcher {
    /// Spawns the fan-out and returns immediately: the caller's transition
    /// never waits on webhook delivery.
    async fn publish(&self, event: CreditEvent) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            dispatcher.deliver(&event).await;
        });
    }
}
