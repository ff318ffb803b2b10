use lambda_runtime::{Error, LambdaEvent};
use serde::Serialize;
use tracing::{debug, info};

use crate::event::{qualifying_push, EcrImageActionEvent, ImagePushed};
use crate::replicator::Replicator;

/// Invocation outcome reported back to the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Replicated,
    Ignored,
}

/// Serialized response for one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplicationReport {
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ReplicationReport {
    fn ignored() -> Self {
        Self {
            status: ReportStatus::Ignored,
            repository: None,
            image: None,
            digest: None,
        }
    }

    fn replicated(pushed: &ImagePushed, digest: String) -> Self {
        Self {
            status: ReportStatus::Replicated,
            repository: Some(pushed.repository.clone()),
            image: Some(pushed.image.to_string()),
            digest: Some(digest),
        }
    }
}

/// Lambda entry point for one EventBridge event.
///
/// Non-qualifying events are acknowledged without touching either registry.
/// Replication errors propagate to the platform's failure channel unmodified;
/// retry policy, if any, is the platform's responsibility.
pub async fn handle(
    event: LambdaEvent<EcrImageActionEvent>,
    replicator: &Replicator,
) -> Result<ReplicationReport, Error> {
    debug!("Received event: {:?}", event.payload);

    let Some(pushed) = qualifying_push(&event.payload.detail, replicator.repo_name()) else {
        info!("Event does not qualify for replication, ignoring");
        return Ok(ReplicationReport::ignored());
    };

    let digest = replicator.replicate(&pushed.image).await?;
    Ok(ReplicationReport::replicated(&pushed, digest))
}
