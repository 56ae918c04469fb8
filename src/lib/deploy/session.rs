use std::sync::Arc;

use futures_util::stream::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::state::valid_stage_transition;
use super::types::{DeployStep, SessionClosed, Stage, StepSink};
use crate::lib::engine::docker::ContainerEngine;
use crate::lib::spec::normalize::normalize;
use crate::lib::spec::types::{ContainerSpec, VolumeKind};

/// One deploy session: drives the engine through the staged pipeline and
/// streams ordered status to the observer. Stages run strictly
/// sequentially; the first failure halts the pipeline with no rollback
/// of already-applied effects. If the observer disconnects the session
/// stops before initiating the next stage.
pub struct DeploySession {
    id: uuid::Uuid,
    engine: Arc<dyn ContainerEngine>,
    steps: StepSink,
    stage: Stage,
}

impl DeploySession {
    pub fn new(engine: Arc<dyn ContainerEngine>, tx: mpsc::Sender<DeployStep>) -> Self {
        DeploySession {
            id: uuid::Uuid::new_v4(),
            engine,
            steps: StepSink::new(tx),
            stage: Stage::Received,
        }
    }

    /// Run the session to its terminal stage. `replace` carries the id
    /// of the container this deploy is updating in place, if any.
    pub async fn run(mut self, spec: ContainerSpec, replace: Option<String>) {
        let spec = normalize(spec);
        info!(session = %self.id, image = %spec.image, "deploy session started");

        let outcome = self.drive(&spec, replace).await;
        match outcome {
            Ok(()) => info!(session = %self.id, "deploy session finished"),
            Err(SessionClosed) => {
                // Stop at the next safe boundary; a stage already handed
                // to the engine cannot be recalled.
                warn!(session = %self.id, "observer disconnected, session abandoned");
            }
        }
    }

    async fn drive(
        &mut self,
        spec: &ContainerSpec,
        replace: Option<String>,
    ) -> Result<(), SessionClosed> {
        if let Some(old_id) = replace {
            if !self.advance(Stage::Replacing) {
                return Ok(());
            }
            if !self.replace_old(&old_id).await? {
                return Ok(());
            }
        }

        if !self.advance(Stage::Pulling) {
            return Ok(());
        }
        if !self.pull_image(spec).await? {
            return Ok(());
        }

        if !self.advance(Stage::CreatingVolumes) {
            return Ok(());
        }
        if !self.create_volumes(spec).await? {
            return Ok(());
        }

        if !self.advance(Stage::Creating) {
            return Ok(());
        }
        let id = match self.engine.create(spec).await {
            Ok(id) => id,
            Err(e) => {
                self.fail(Stage::Creating, format!("could not create container: {}", e))
                    .await?;
                return Ok(());
            }
        };
        self.steps
            .complete(Stage::Creating, format!("container {} created", short_id(&id)))
            .await?;

        if !self.advance(Stage::Starting) {
            return Ok(());
        }
        if spec.auto_start {
            if let Err(e) = self.engine.start(&id).await {
                // The container exists but is not running; cleanup is an
                // operator action, not ours.
                self.fail(Stage::Starting, format!("could not start container: {}", e))
                    .await?;
                return Ok(());
            }
            self.steps
                .complete(Stage::Starting, "container started")
                .await?;
        } else {
            self.steps
                .complete(Stage::Starting, "auto start disabled, container left stopped")
                .await?;
        }

        if !self.advance(Stage::Complete) {
            return Ok(());
        }
        self.steps
            .complete(Stage::Complete, "deployment finished")
            .await?;
        Ok(())
    }

    /// Tear down the container this deploy replaces. Stop failures are
    /// expected (it may already be stopped); a failed remove is fatal,
    /// the replacement is never created over a live identity.
    async fn replace_old(&mut self, old_id: &str) -> Result<bool, SessionClosed> {
        self.steps
            .status(Stage::Replacing, "removing current container")
            .await?;

        if let Err(e) = self.engine.stop(old_id).await {
            debug!(session = %self.id, container = old_id, %e, "stop before replace failed");
        }
        if let Err(e) = self.engine.remove(old_id, true).await {
            self.fail(
                Stage::Replacing,
                format!("could not remove container {}: {}", short_id(old_id), e),
            )
            .await?;
            return Ok(false);
        }

        self.steps
            .complete(Stage::Replacing, "old container removed")
            .await?;
        Ok(true)
    }

    async fn pull_image(&mut self, spec: &ContainerSpec) -> Result<bool, SessionClosed> {
        if self.engine.image_exists(&spec.image).await {
            self.steps
                .complete(Stage::Pulling, format!("image {} already present", spec.image))
                .await?;
            return Ok(true);
        }

        self.steps
            .status(Stage::Pulling, format!("pulling {}", spec.image))
            .await?;

        let mut lines = self.engine.pull(&spec.image);
        while let Some(line) = lines.next().await {
            match line {
                Ok(line) => self.steps.output(Stage::Pulling, line).await?,
                Err(e) => {
                    self.fail(Stage::Pulling, format!("pull failed: {}", e)).await?;
                    return Ok(false);
                }
            }
        }

        self.steps
            .complete(Stage::Pulling, format!("pulled {}", spec.image))
            .await?;
        Ok(true)
    }

    /// Create the managed volumes the spec references and the engine
    /// does not have yet. Bind mounts are only referenced, never created.
    async fn create_volumes(&mut self, spec: &ContainerSpec) -> Result<bool, SessionClosed> {
        let managed: Vec<_> = spec
            .volumes
            .iter()
            .filter(|v| v.kind == VolumeKind::Volume)
            .collect();

        if !managed.is_empty() {
            let existing = match self.engine.volume_list().await {
                Ok(list) => list,
                Err(e) => {
                    self.fail(
                        Stage::CreatingVolumes,
                        format!("could not list volumes: {}", e),
                    )
                    .await?;
                    return Ok(false);
                }
            };

            for mount in managed {
                if existing.contains(&mount.source) {
                    continue;
                }
                self.steps
                    .status(
                        Stage::CreatingVolumes,
                        format!("creating volume {}", mount.source),
                    )
                    .await?;
                if let Err(e) = self.engine.volume_create(&mount.source).await {
                    self.fail(
                        Stage::CreatingVolumes,
                        format!("could not create volume {}: {}", mount.source, e),
                    )
                    .await?;
                    return Ok(false);
                }
            }
        }

        self.steps
            .complete(Stage::CreatingVolumes, "volumes ready")
            .await?;
        Ok(true)
    }

    fn advance(&mut self, next: Stage) -> bool {
        if valid_stage_transition(&self.stage, &next) {
            self.stage = next;
            true
        } else {
            error!(
                session = %self.id,
                "illegal stage transition from {:?} to {:?}",
                self.stage,
                next
            );
            false
        }
    }

    /// Emit the stage's error step and move the session to Failed.
    async fn fail(&mut self, stage: Stage, message: String) -> Result<(), SessionClosed> {
        warn!(session = %self.id, step = stage.step_name(), %message, "deploy step failed");
        self.advance(Stage::Failed);
        self.steps.fail(stage, message).await
    }
}

fn short_id(id: &str) -> &str {
    // Ids are hex in practice, but this also sees caller-supplied
    // replace targets; fall back to the full string rather than slicing
    // inside a multi-byte character.
    id.get(..12).unwrap_or(id)
}
