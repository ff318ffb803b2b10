use std::sync::Arc;

use tracing::info;

use crate::registry::models::ImageId;
use crate::registry::{ImageRegistry, RegistryError};

/// Copies one image manifest from a source registry to a destination
/// registry.
///
/// Holds two independently-scoped registry handles. The source is only ever
/// read and the destination only ever written; no state survives between
/// invocations.
pub struct Replicator {
    source: Arc<dyn ImageRegistry>,
    destination: Arc<dyn ImageRegistry>,
    repo_name: String,
}

impl Replicator {
    pub fn new(
        source: Arc<dyn ImageRegistry>,
        destination: Arc<dyn ImageRegistry>,
        repo_name: impl Into<String>,
    ) -> Self {
        Self {
            source,
            destination,
            repo_name: repo_name.into(),
        }
    }

    /// Repository name images are replicated under (same on both sides)
    pub fn repo_name(&self) -> &str {
        &self.repo_name
    }

    /// Replicate one image: fetch its manifest from the source and write it
    /// unchanged to the destination under the same repository and image id.
    ///
    /// Returns the manifest digest acknowledged by the destination. A re-push
    /// of a manifest the destination already holds counts as success, which
    /// makes repeated invocations for the same image idempotent. Every other
    /// registry error propagates unmodified; nothing has been written to the
    /// destination unless the put succeeded.
    pub async fn replicate(&self, image: &ImageId) -> Result<String, RegistryError> {
        info!(
            "Replicating {}:{} from {} to {}",
            self.repo_name,
            image,
            self.source.registry_host(),
            self.destination.registry_host()
        );

        let manifest = self.source.get_image(&self.repo_name, image).await?;
        info!(
            "Retrieved manifest (type: {}, digest: {})",
            manifest.media_type.as_deref().unwrap_or("unknown"),
            manifest.digest.as_deref().unwrap_or("unknown")
        );

        match self
            .destination
            .put_image(&self.repo_name, image, &manifest)
            .await
        {
            Ok(digest) => {
                info!(
                    "Replicated {}:{} to {} (digest: {})",
                    self.repo_name,
                    image,
                    self.destination.registry_host(),
                    digest
                );
                Ok(digest)
            }
            Err(RegistryError::AlreadyExists { digest, .. }) => {
                info!(
                    "Image {}:{} already present in destination, nothing to do",
                    self.repo_name, image
                );
                Ok(digest
                    .or(manifest.digest)
                    .unwrap_or_else(|| image.to_string()))
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::models::ImageManifest;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const DIGEST: &str = "sha256:aaa1111111111111111111111111111111111111111111111111111111111111";

    /// In-memory registry that records every call and replays canned results
    struct FakeRegistry {
        host: String,
        get_response: Result<ImageManifest, RegistryError>,
        put_response: Result<String, RegistryError>,
        gets: Mutex<Vec<(String, ImageId)>>,
        puts: Mutex<Vec<(String, ImageId, String)>>,
    }

    impl FakeRegistry {
        fn new(
            get_response: Result<ImageManifest, RegistryError>,
            put_response: Result<String, RegistryError>,
        ) -> Arc<Self> {
            Arc::new(Self {
                host: "fake.registry.test".to_string(),
                get_response,
                put_response,
                gets: Mutex::new(Vec::new()),
                puts: Mutex::new(Vec::new()),
            })
        }

        fn get_count(&self) -> usize {
            self.gets.lock().unwrap().len()
        }

        fn put_count(&self) -> usize {
            self.puts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ImageRegistry for FakeRegistry {
        async fn get_image(
            &self,
            repository: &str,
            image: &ImageId,
        ) -> Result<ImageManifest, RegistryError> {
            self.gets
                .lock()
                .unwrap()
                .push((repository.to_string(), image.clone()));
            self.get_response.clone()
        }

        async fn put_image(
            &self,
            repository: &str,
            image: &ImageId,
            manifest: &ImageManifest,
        ) -> Result<String, RegistryError> {
            self.puts.lock().unwrap().push((
                repository.to_string(),
                image.clone(),
                manifest.payload.clone(),
            ));
            self.put_response.clone()
        }

        fn registry_host(&self) -> &str {
            &self.host
        }
    }

    fn manifest() -> ImageManifest {
        ImageManifest {
            payload: r#"{"schemaVersion":2,"layers":[]}"#.to_string(),
            media_type: Some("application/vnd.docker.distribution.manifest.v2+json".to_string()),
            digest: Some(DIGEST.to_string()),
        }
    }

    fn not_found() -> RegistryError {
        RegistryError::NotFound {
            repository: "myrepo".to_string(),
            image: ImageId::Tag("prod".to_string()),
        }
    }

    #[tokio::test]
    async fn replicate_copies_manifest_to_destination() {
        let source = FakeRegistry::new(Ok(manifest()), Err(not_found()));
        let destination = FakeRegistry::new(Err(not_found()), Ok(DIGEST.to_string()));
        let replicator = Replicator::new(source.clone(), destination.clone(), "myrepo");

        let digest = replicator
            .replicate(&ImageId::Tag("prod".to_string()))
            .await
            .expect("replication should succeed");

        assert_eq!(digest, DIGEST);
        assert_eq!(source.get_count(), 1);
        assert_eq!(destination.put_count(), 1);

        // The destination received the exact manifest payload read from the
        // source, under the same repository and tag.
        let puts = destination.puts.lock().unwrap();
        assert_eq!(
            puts[0],
            (
                "myrepo".to_string(),
                ImageId::Tag("prod".to_string()),
                manifest().payload
            )
        );
    }

    #[tokio::test]
    async fn replicate_by_digest() {
        let source = FakeRegistry::new(Ok(manifest()), Err(not_found()));
        let destination = FakeRegistry::new(Err(not_found()), Ok(DIGEST.to_string()));
        let replicator = Replicator::new(source, destination.clone(), "myrepo");

        let digest = replicator
            .replicate(&ImageId::Digest(DIGEST.to_string()))
            .await
            .expect("digest replication should succeed");

        assert_eq!(digest, DIGEST);
        assert_eq!(destination.put_count(), 1);
    }

    #[tokio::test]
    async fn replicate_is_idempotent_when_destination_has_image() {
        let source = FakeRegistry::new(Ok(manifest()), Err(not_found()));
        let destination = FakeRegistry::new(
            Err(not_found()),
            Err(RegistryError::AlreadyExists {
                repository: "myrepo".to_string(),
                image: ImageId::Tag("prod".to_string()),
                digest: Some(DIGEST.to_string()),
            }),
        );
        let replicator = Replicator::new(source, destination, "myrepo");

        let first = replicator
            .replicate(&ImageId::Tag("prod".to_string()))
            .await
            .expect("first re-push should succeed");
        let second = replicator
            .replicate(&ImageId::Tag("prod".to_string()))
            .await
            .expect("second re-push should succeed");

        assert_eq!(first, DIGEST);
        assert_eq!(second, DIGEST);
    }

    #[tokio::test]
    async fn missing_source_image_leaves_destination_untouched() {
        let source = FakeRegistry::new(Err(not_found()), Err(not_found()));
        let destination = FakeRegistry::new(Err(not_found()), Ok(DIGEST.to_string()));
        let replicator = Replicator::new(source.clone(), destination.clone(), "myrepo");

        let err = replicator
            .replicate(&ImageId::Tag("prod".to_string()))
            .await
            .expect_err("missing source image should fail");

        assert!(matches!(err, RegistryError::NotFound { .. }));
        assert_eq!(source.get_count(), 1);
        assert_eq!(destination.put_count(), 0);
    }

    #[tokio::test]
    async fn access_denied_on_source_propagates() {
        let source = FakeRegistry::new(
            Err(RegistryError::AccessDenied {
                repository: "myrepo".to_string(),
                message: "not authorized".to_string(),
            }),
            Err(not_found()),
        );
        let destination = FakeRegistry::new(Err(not_found()), Ok(DIGEST.to_string()));
        let replicator = Replicator::new(source, destination.clone(), "myrepo");

        let err = replicator
            .replicate(&ImageId::Tag("prod".to_string()))
            .await
            .expect_err("access denied should fail");

        assert!(matches!(err, RegistryError::AccessDenied { .. }));
        assert_eq!(destination.put_count(), 0);
    }

    #[tokio::test]
    async fn missing_destination_layers_propagate() {
        let source = FakeRegistry::new(Ok(manifest()), Err(not_found()));
        let destination = FakeRegistry::new(
            Err(not_found()),
            Err(RegistryError::LayerNotFound {
                repository: "myrepo".to_string(),
                image: ImageId::Tag("prod".to_string()),
                message: "layer sha256:bbb not found".to_string(),
            }),
        );
        let replicator = Replicator::new(source, destination, "myrepo");

        let err = replicator
            .replicate(&ImageId::Tag("prod".to_string()))
            .await
            .expect_err("missing layers should fail");

        assert!(matches!(err, RegistryError::LayerNotFound { .. }));
    }
}
