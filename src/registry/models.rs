use serde::Deserialize;
use std::fmt;

/// Identifies one ECR registry side (source or destination)
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryCoordinate {
    /// AWS account ID (e.g., "123456789012")
    pub account_id: String,
    /// AWS region (e.g., "eu-west-1")
    pub region: String,
}

impl RegistryCoordinate {
    /// Registry hostname (e.g., "123456789012.dkr.ecr.eu-west-1.amazonaws.com")
    pub fn registry_host(&self) -> String {
        format!("{}.dkr.ecr.{}.amazonaws.com", self.account_id, self.region)
    }
}

/// Identifies an image within a repository, either by its mutable tag or by
/// its content digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageId {
    Tag(String),
    Digest(String),
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageId::Tag(tag) => write!(f, "{}", tag),
            ImageId::Digest(digest) => write!(f, "{}", digest),
        }
    }
}

/// An image manifest as returned by the registry.
///
/// The payload is an opaque blob: it is relayed to the destination byte for
/// byte, never parsed or mutated.
#[derive(Debug, Clone)]
pub struct ImageManifest {
    /// Raw manifest document
    pub payload: String,
    /// Manifest media type as reported by the registry
    pub media_type: Option<String>,
    /// Content digest as reported by the registry
    pub digest: Option<String>,
}
