mod dispatch;
mod error;
mod recipients;
mod rules;

pub use dispatch::{build_envelope, AutomationDispatcher, HttpWebhookTransport, WebhookTransport};
pub use error::WebhookError;
pub use recipients::resolve_recipients;
pub use rules::{match_rules, rule_matches};
