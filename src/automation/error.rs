//! Error type for webhook delivery.
//!
//! Deliveries are never retried by the engine and never surfaced to the
//! caller that triggered the event; these errors exist to be logged.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebhookError {
    /// The endpoint answered with a non-success status.
    #[error("endpoint returned status {status}")]
    Status { status: u16 },

    /// Network-layer failure (DNS, refused connection, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display() {
        let err = WebhookError::Status { status: 503 };
        assert_eq!(err.to_string(), "endpoint returned status 503");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WebhookError>();
    }
}
