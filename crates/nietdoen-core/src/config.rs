//! Firebase project settings shared by the service clients.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Web app settings of the Firebase project, read once at startup.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub auth_domain: String,
    pub project_id: String,
    pub storage_bucket: String,
    pub messaging_sender_id: String,
    pub app_id: String,
}

impl FirebaseConfig {
    /// Names of required settings that are empty.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.api_key.is_empty() {
            missing.push("api_key");
        }
        if self.project_id.is_empty() {
            missing.push("project_id");
        }
        if self.storage_bucket.is_empty() {
            missing.push("storage_bucket");
        }
        if self.app_id.is_empty() {
            missing.push("app_id");
        }
        missing
    }
}

// The api key never reaches the log.
impl fmt::Debug for FirebaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirebaseConfig")
            .field("api_key", &redact(&self.api_key))
            .field("auth_domain", &self.auth_domain)
            .field("project_id", &self.project_id)
            .field("storage_bucket", &self.storage_bucket)
            .field("messaging_sender_id", &self.messaging_sender_id)
            .field("app_id", &self.app_id)
            .finish()
    }
}

pub fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "<unset>" } else { "<redacted>" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_api_key() {
        let config = FirebaseConfig {
            api_key: "AIza-secret".into(),
            project_id: "nietdoen".into(),
            ..Default::default()
        };
        let shown = format!("{config:?}");
        assert!(!shown.contains("AIza-secret"));
        assert!(shown.contains("<redacted>"));
        assert!(shown.contains("nietdoen"));
    }

    #[test]
    fn missing_settings_listed() {
        let config = FirebaseConfig {
            api_key: "k".into(),
            project_id: "p".into(),
            ..Default::default()
        };
        assert_eq!(config.missing(), vec!["storage_bucket", "app_id"]);
    }
}
