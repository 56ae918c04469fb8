use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// The closed set of deploy stages. `Received` never reaches the wire;
/// the others emit steps under the short names in [`Stage::step_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Received,
    Replacing,
    Pulling,
    CreatingVolumes,
    Creating,
    Starting,
    Complete,
    Failed,
}

impl Stage {
    pub fn step_name(self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Replacing => "replace",
            Stage::Pulling => "pull",
            Stage::CreatingVolumes => "volumes",
            Stage::Creating => "create",
            Stage::Starting => "start",
            Stage::Complete => "complete",
            Stage::Failed => "failed",
        }
    }
}

/// One status message of a deploy session. Re-emitting the same step
/// name updates the observer's view in place; the ordered emission log
/// is the session's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployStep {
    pub step: String,
    pub message: String,
    pub error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complete: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<bool>,
}

/// The observer went away; the controller must not start new stages.
#[derive(Debug, PartialEq, Eq)]
pub struct SessionClosed;

/// Sending side of one session's step channel.
#[derive(Clone)]
pub struct StepSink {
    tx: mpsc::Sender<DeployStep>,
}

impl StepSink {
    pub fn new(tx: mpsc::Sender<DeployStep>) -> Self {
        StepSink { tx }
    }

    async fn send(&self, step: DeployStep) -> Result<(), SessionClosed> {
        self.tx.send(step).await.map_err(|_| SessionClosed)
    }

    /// In-progress status for a stage.
    pub async fn status(
        &self,
        stage: Stage,
        message: impl Into<String>,
    ) -> Result<(), SessionClosed> {
        self.send(DeployStep {
            step: stage.step_name().to_string(),
            message: message.into(),
            error: false,
            complete: None,
            output: None,
        })
        .await
    }

    /// One raw engine output line relayed under the stage's step name.
    pub async fn output(
        &self,
        stage: Stage,
        line: impl Into<String>,
    ) -> Result<(), SessionClosed> {
        self.send(DeployStep {
            step: stage.step_name().to_string(),
            message: line.into(),
            error: false,
            complete: None,
            output: Some(true),
        })
        .await
    }

    /// Terminal success marker for a stage.
    pub async fn complete(
        &self,
        stage: Stage,
        message: impl Into<String>,
    ) -> Result<(), SessionClosed> {
        self.send(DeployStep {
            step: stage.step_name().to_string(),
            message: message.into(),
            error: false,
            complete: Some(true),
            output: None,
        })
        .await
    }

    /// Terminal error for a stage; the session emits nothing after it.
    pub async fn fail(
        &self,
        stage: Stage,
        message: impl Into<String>,
    ) -> Result<(), SessionClosed> {
        self.send(DeployStep {
            step: stage.step_name().to_string(),
            message: message.into(),
            error: true,
            complete: None,
            output: None,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_are_omitted_on_the_wire() {
        let step = DeployStep {
            step: "pull".to_string(),
            message: "pulling".to_string(),
            error: false,
            complete: None,
            output: None,
        };
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"step": "pull", "message": "pulling", "error": false})
        );
    }

    #[test]
    fn complete_and_output_serialize_when_set() {
        let step = DeployStep {
            step: "complete".to_string(),
            message: "done".to_string(),
            error: false,
            complete: Some(true),
            output: None,
        };
        let json = serde_json::to_value(&step).unwrap();
        assert_eq!(json["complete"], serde_json::json!(true));
    }
}
