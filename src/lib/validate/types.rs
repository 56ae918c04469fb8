use serde::{Deserialize, Serialize};

use crate::lib::engine::types::HostPortBinding;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

/// One pre-flight finding. A result never blocks anything here; the
/// client decides that any `error` entry blocks deploy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub check: String,
    pub status: CheckStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ValidationResult {
    pub fn error(check: &str, message: impl Into<String>) -> Self {
        ValidationResult {
            check: check.to_string(),
            status: CheckStatus::Error,
            message: message.into(),
            details: None,
        }
    }

    pub fn warning(check: &str, message: impl Into<String>) -> Self {
        ValidationResult {
            check: check.to_string(),
            status: CheckStatus::Warning,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Live engine state gathered once per validation request and passed in
/// by value, keeping `validate` itself pure.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    pub port_bindings: Vec<HostPortBinding>,
}
