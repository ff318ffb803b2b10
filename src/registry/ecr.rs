use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ecr::error::ProvideErrorMetadata;
use aws_sdk_ecr::types::{ImageFailureCode, ImageIdentifier};
use aws_sdk_ecr::Client as EcrClient;
use tracing::{debug, info};

use crate::registry::models::{ImageId, ImageManifest, RegistryCoordinate};
use crate::registry::{ImageRegistry, RegistryError};

/// Manifest media types accepted from the source registry. Whatever comes
/// back is relayed verbatim.
const ACCEPTED_MEDIA_TYPES: [&str; 3] = [
    "application/vnd.docker.distribution.manifest.v2+json",
    "application/vnd.oci.image.manifest.v1+json",
    "application/vnd.docker.distribution.manifest.list.v2+json",
];

/// Extract a clean error message from an AWS SDK error's Debug output
///
/// The AWS SDK errors have verbose Debug output, but we can extract just the
/// meaningful message by parsing for the `message: Some("...")` pattern.
fn format_sdk_error<E: std::fmt::Debug>(err: &E) -> String {
    let debug_str = format!("{:?}", err);

    if let Some(start) = debug_str.find("message: Some(\"") {
        let start = start + 15; // length of 'message: Some("'
        if let Some(end) = debug_str[start..].find("\")") {
            return debug_str[start..start + end].to_string();
        }
    }

    // Last resort: return a truncated debug string
    if debug_str.len() > 200 {
        format!("{}...", &debug_str[..200])
    } else {
        debug_str
    }
}

/// ECR-backed registry handle, scoped to one account and region.
///
/// Uses the default credential chain only: the execution role carries both
/// permission scopes, and cross-account reads are granted by the source
/// registry's resource policy established out-of-band.
pub struct EcrRegistry {
    coordinate: RegistryCoordinate,
    client: EcrClient,
    registry_host: String,
}

impl EcrRegistry {
    /// Create a registry handle for the given coordinate
    pub async fn new(coordinate: RegistryCoordinate) -> Self {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(coordinate.region.clone()))
            .load()
            .await;

        let client = EcrClient::new(&aws_config);
        let registry_host = coordinate.registry_host();

        Self {
            coordinate,
            client,
            registry_host,
        }
    }

    /// Map an SDK error with no modeled ECR variant. Cross-account policy
    /// problems surface as a bare AccessDeniedException code.
    fn unmodeled_error<E>(&self, err: &E, repository: &str) -> RegistryError
    where
        E: ProvideErrorMetadata + std::fmt::Debug,
    {
        if err.code() == Some("AccessDeniedException") {
            RegistryError::AccessDenied {
                repository: repository.to_string(),
                message: err.message().unwrap_or("access denied").to_string(),
            }
        } else {
            RegistryError::Unexpected {
                repository: repository.to_string(),
                message: format_sdk_error(err),
            }
        }
    }
}

#[async_trait]
impl ImageRegistry for EcrRegistry {
    async fn get_image(
        &self,
        repository: &str,
        image: &ImageId,
    ) -> Result<ImageManifest, RegistryError> {
        debug!(
            "Fetching manifest for {}:{} from {}",
            repository, image, self.registry_host
        );

        let image_id = match image {
            ImageId::Tag(tag) => ImageIdentifier::builder().image_tag(tag).build(),
            ImageId::Digest(digest) => ImageIdentifier::builder().image_digest(digest).build(),
        };

        let mut request = self
            .client
            .batch_get_image()
            .registry_id(&self.coordinate.account_id)
            .repository_name(repository)
            .image_ids(image_id);
        for media_type in ACCEPTED_MEDIA_TYPES {
            request = request.accepted_media_types(media_type);
        }

        let response = request.send().await.map_err(|err| {
            if let Some(service_err) = err.as_service_error() {
                if service_err.is_repository_not_found_exception() {
                    return RegistryError::NotFound {
                        repository: repository.to_string(),
                        image: image.clone(),
                    };
                }
            }
            self.unmodeled_error(&err, repository)
        })?;

        // BatchGetImage reports a missing image as a per-image failure, not
        // as a service error.
        if let Some(failure) = response.failures().first() {
            if matches!(failure.failure_code(), Some(ImageFailureCode::ImageNotFound)) {
                return Err(RegistryError::NotFound {
                    repository: repository.to_string(),
                    image: image.clone(),
                });
            }
            return Err(RegistryError::Unexpected {
                repository: repository.to_string(),
                message: format!(
                    "BatchGetImage failure ({:?}): {}",
                    failure.failure_code(),
                    failure.failure_reason().unwrap_or("no reason given")
                ),
            });
        }

        let Some(found) = response.images().first() else {
            return Err(RegistryError::NotFound {
                repository: repository.to_string(),
                image: image.clone(),
            });
        };

        let payload = found
            .image_manifest()
            .ok_or_else(|| RegistryError::Unexpected {
                repository: repository.to_string(),
                message: "BatchGetImage returned an image without a manifest".to_string(),
            })?;

        Ok(ImageManifest {
            payload: payload.to_string(),
            media_type: found.image_manifest_media_type().map(String::from),
            digest: found
                .image_id()
                .and_then(|id| id.image_digest())
                .map(String::from),
        })
    }

    async fn put_image(
        &self,
        repository: &str,
        image: &ImageId,
        manifest: &ImageManifest,
    ) -> Result<String, RegistryError> {
        info!(
            "Pushing manifest for {}:{} to {}",
            repository, image, self.registry_host
        );

        let mut request = self
            .client
            .put_image()
            .registry_id(&self.coordinate.account_id)
            .repository_name(repository)
            .image_manifest(&manifest.payload);
        if let ImageId::Tag(tag) = image {
            request = request.image_tag(tag);
        }
        if let Some(media_type) = &manifest.media_type {
            request = request.image_manifest_media_type(media_type);
        }

        let response = request.send().await.map_err(|err| {
            if let Some(service_err) = err.as_service_error() {
                if service_err.is_image_already_exists_exception() {
                    return RegistryError::AlreadyExists {
                        repository: repository.to_string(),
                        image: image.clone(),
                        digest: manifest.digest.clone(),
                    };
                }
                if service_err.is_layers_not_found_exception()
                    || service_err.is_referenced_images_not_found_exception()
                {
                    return RegistryError::LayerNotFound {
                        repository: repository.to_string(),
                        image: image.clone(),
                        message: format_sdk_error(service_err),
                    };
                }
                if service_err.is_repository_not_found_exception() {
                    return RegistryError::NotFound {
                        repository: repository.to_string(),
                        image: image.clone(),
                    };
                }
            }
            self.unmodeled_error(&err, repository)
        })?;

        let digest = response
            .image()
            .and_then(|img| img.image_id())
            .and_then(|id| id.image_digest())
            .ok_or_else(|| RegistryError::Unexpected {
                repository: repository.to_string(),
                message: "PutImage response carried no image digest".to_string(),
            })?;

        Ok(digest.to_string())
    }

    fn registry_host(&self) -> &str {
        &self.registry_host
    }
}
