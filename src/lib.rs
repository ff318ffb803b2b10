//! Replicates container images between two cross-account ECR repositories.
//!
//! The binary runs as an AWS Lambda function triggered by EventBridge
//! "ECR Image Action" events. On a qualifying push it fetches the image
//! manifest from the source registry and writes it unchanged to the
//! destination registry; the destination resolves layers itself.

pub mod event;
pub mod handler;
pub mod registry;
pub mod replicator;
pub mod settings;
