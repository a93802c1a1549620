//! Engine configuration loaded from `crediflow.toml`.
//!
//! [`CrediflowConfig`] holds the dispatch source name, the auto-archive
//! retention window, and the state-name marker lists the lifecycle keys off.
//! Missing fields fall back to defaults; the `CREDIFLOW_SOURCE` environment
//! variable takes precedence over the file for the source name.
//!
//! Marker matching is by case-insensitive substring, so the defaults cover
//! both the Spanish state vocabulary the downstream automations use
//! (DEVUELTO, RECHAZADO, ...) and the English equivalents.

use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

/// Top-level configuration read from `crediflow.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct CrediflowConfig {
    /// `source` field stamped on every dispatched envelope.
    #[serde(default = "default_source")]
    pub source: String,

    /// Days a credit may sit in a returned state before the auto-archive
    /// sweep closes it.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,

    /// Markers identifying "returned" states (sweep candidates).
    #[serde(default = "default_returned_markers")]
    pub returned_markers: Vec<String>,

    /// Markers whose states notify with warning severity instead of info.
    #[serde(default = "default_alert_markers")]
    pub alert_markers: Vec<String>,

    /// Preference order for the final state the sweep archives into.
    #[serde(default = "default_archive_markers")]
    pub archive_markers: Vec<String>,
}

fn default_source() -> String {
    "crediflow".to_string()
}

// 4 months.
fn default_retention_days() -> i64 {
    120
}

fn default_returned_markers() -> Vec<String> {
    vec!["DEVUELTO".into(), "RETURNED".into()]
}

fn default_alert_markers() -> Vec<String> {
    vec![
        "DEVUELTO".into(),
        "RECHAZADO".into(),
        "RETURNED".into(),
        "REJECTED".into(),
    ]
}

fn default_archive_markers() -> Vec<String> {
    vec![
        "RECHAZADO".into(),
        "REJECTED".into(),
        "ANULADO".into(),
        "CANCELLED".into(),
        "VENCIDO".into(),
        "EXPIRED".into(),
    ]
}

impl Default for CrediflowConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            retention_days: default_retention_days(),
            returned_markers: default_returned_markers(),
            alert_markers: default_alert_markers(),
            archive_markers: default_archive_markers(),
        }
    }
}

impl CrediflowConfig {
    /// Loads configuration from `crediflow.toml` in the current directory,
    /// falling back to defaults if the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("crediflow.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<CrediflowConfig>(&contents)?
        } else {
            Self::default()
        };

        // Environment takes precedence over the file for the source name.
        if let Ok(source) = std::env::var("CREDIFLOW_SOURCE")
            && !source.is_empty()
        {
            config.source = source;
        }

        Ok(config)
    }

    /// Whether a state name marks a returned credit (sweep candidate).
    pub fn is_returned_state(&self, state_name: &str) -> bool {
        matches_any(state_name, &self.returned_markers)
    }

    /// Whether a transition into this state notifies with warning severity.
    pub fn is_alert_state(&self, state_name: &str) -> bool {
        matches_any(state_name, &self.alert_markers)
    }

    /// Rank of a final state as an archive target: position of the first
    /// matching marker, or past-the-end when none matches.
    pub fn archive_rank(&self, state_name: &str) -> usize {
        let upper = state_name.to_uppercase();
        self.archive_markers
            .iter()
            .position(|marker| upper.contains(&marker.to_uppercase()))
            .unwrap_or(self.archive_markers.len())
    }
}

fn matches_any(state_name: &str, markers: &[String]) -> bool {
    let upper = state_name.to_uppercase();
    markers
        .iter()
        .any(|marker| upper.contains(&marker.to_uppercase()))
}
