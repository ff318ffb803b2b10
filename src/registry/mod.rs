pub mod ecr;
pub mod models;

use async_trait::async_trait;
use thiserror::Error;

use self::models::{ImageId, ImageManifest};

/// Errors surfaced by a registry for manifest reads and writes.
///
/// All variants are terminal for the current invocation: nothing is retried
/// locally, and retry policy belongs to the invoking platform.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("image '{image}' not found in repository '{repository}'")]
    NotFound { repository: String, image: ImageId },

    #[error("access denied to repository '{repository}': {message}")]
    AccessDenied { repository: String, message: String },

    /// The destination rejected the manifest because a referenced layer is
    /// not present. Layers are never pre-staged here; syncing them is an
    /// external concern.
    #[error("repository '{repository}' is missing layers referenced by '{image}': {message}")]
    LayerNotFound {
        repository: String,
        image: ImageId,
        message: String,
    },

    /// The destination already holds this exact manifest under this image id.
    /// The replicator treats a re-push of identical content as success.
    #[error("image '{image}' already exists in repository '{repository}'")]
    AlreadyExists {
        repository: String,
        image: ImageId,
        digest: Option<String>,
    },

    #[error("registry request failed for repository '{repository}': {message}")]
    Unexpected { repository: String, message: String },
}

/// One side of a replication: a registry manifests are read from or written
/// to. The two sides of an invocation hold independently-scoped clients.
#[async_trait]
pub trait ImageRegistry: Send + Sync {
    /// Fetch the manifest for an image
    async fn get_image(
        &self,
        repository: &str,
        image: &ImageId,
    ) -> Result<ImageManifest, RegistryError>;

    /// Write a manifest under the given image id, returning the digest the
    /// registry acknowledged
    async fn put_image(
        &self,
        repository: &str,
        image: &ImageId,
        manifest: &ImageManifest,
    ) -> Result<String, RegistryError>;

    /// Registry hostname (e.g., "123456789012.dkr.ecr.eu-west-1.amazonaws.com")
    fn registry_host(&self) -> &str;
}
