use thiserror::Error;

use crate::automation::WebhookError;
use crate::model::Role;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CrediflowError>;

#[derive(Debug, Error)]
pub enum CrediflowError {
    /// The requested target state does not exist. Rejected before any
    /// mutation.
    #[error("unknown credit state: {0}")]
    UnknownState(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The actor's role is not in the action's allowed set.
    #[error("action '{label}' not allowed for role {role}")]
    Forbidden { label: String, role: Role },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("webhook error: {0}")]
    Webhook(#[from] WebhookError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_state_display() {
        let err = CrediflowError::UnknownState("abc-123".into());
        assert_eq!(err.to_string(), "unknown credit state: abc-123");
    }

    #[test]
    fn forbidden_display_names_role() {
        let err = CrediflowError::Forbidden {
            label: "Aprobar".into(),
            role: Role::Gestor,
        };
        assert_eq!(err.to_string(), "action 'Aprobar' not allowed for role gestor");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CrediflowError>();
    }
}
