use serde::Deserialize;
use tracing::warn;

use crate::registry::models::ImageId;

/// `action-type` value for image pushes
pub const ACTION_TYPE_PUSH: &str = "PUSH";
/// `result` value for completed actions
pub const RESULT_SUCCESS: &str = "SUCCESS";

/// EventBridge envelope for "ECR Image Action" events
#[derive(Debug, Clone, Deserialize)]
pub struct EcrImageActionEvent {
    #[serde(rename = "detail-type", default)]
    pub detail_type: String,
    #[serde(default)]
    pub source: String,
    pub detail: EcrImageActionDetail,
}

/// The `detail` block of an ECR Image Action event. All fields are optional
/// on the wire; the guard decides what qualifies.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct EcrImageActionDetail {
    pub action_type: Option<String>,
    pub result: Option<String>,
    pub repository_name: Option<String>,
    pub image_tag: Option<String>,
    pub image_digest: Option<String>,
}

/// Invocation context for one replication, produced by the guard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePushed {
    pub repository: String,
    pub image: ImageId,
}

/// Decide whether an event detail qualifies for replication.
///
/// Qualifies only when the action is a successful push into the configured
/// repository and the detail identifies an image (tag preferred over digest).
/// Everything else is ignored, never an error.
pub fn qualifying_push(detail: &EcrImageActionDetail, repo_name: &str) -> Option<ImagePushed> {
    if detail.action_type.as_deref() != Some(ACTION_TYPE_PUSH) {
        return None;
    }
    if detail.result.as_deref() != Some(RESULT_SUCCESS) {
        return None;
    }
    match detail.repository_name.as_deref() {
        Some(name) if name == repo_name => {}
        _ => return None,
    }

    let image = match (detail.image_tag.as_deref(), detail.image_digest.as_deref()) {
        (Some(tag), _) if !tag.is_empty() => ImageId::Tag(tag.to_string()),
        (_, Some(digest)) if !digest.is_empty() => ImageId::Digest(digest.to_string()),
        _ => {
            warn!(
                "Push event for repository '{}' carried neither tag nor digest, ignoring",
                repo_name
            );
            return None;
        }
    };

    Some(ImagePushed {
        repository: repo_name.to_string(),
        image,
    })
}
