use serde::{Deserialize, Serialize};

use crate::lib::spec::types::ImageConfig;

/// Client request opening an inspect session. With `pull` unset an
/// absent image terminates the session in `not_found`; no implicit
/// network access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectRequest {
    pub image: String,
    #[serde(default)]
    pub pull: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectStatus {
    Connecting,
    Pulling,
    Pulled,
    Inspecting,
    Complete,
    NotFound,
    Error,
}

/// One server-to-client message of an inspect session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectMessage {
    pub status: InspectStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<ImageConfig>,
}

impl InspectMessage {
    pub fn status(status: InspectStatus) -> Self {
        InspectMessage {
            status,
            message: None,
            output: None,
            error: None,
            found: None,
            config: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn output(line: impl Into<String>) -> Self {
        let mut msg = InspectMessage::status(InspectStatus::Pulling);
        msg.output = Some(line.into());
        msg
    }

    pub fn error(error: impl Into<String>) -> Self {
        let mut msg = InspectMessage::status(InspectStatus::Error);
        msg.error = Some(error.into());
        msg
    }

    pub fn not_found() -> Self {
        let mut msg = InspectMessage::status(InspectStatus::NotFound);
        msg.found = Some(false);
        msg
    }

    pub fn complete(config: ImageConfig) -> Self {
        let mut msg = InspectMessage::status(InspectStatus::Complete);
        msg.found = Some(true);
        msg.config = Some(config);
        msg
    }
}
