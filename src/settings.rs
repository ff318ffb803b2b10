use config::{Config, ConfigError, Environment};
use serde::Deserialize;

use crate::registry::models::RegistryCoordinate;

/// Environment-supplied configuration, loaded once at startup and immutable
/// for the process lifetime.
///
/// Expected variables: `SOURCE_ACCOUNT_ID`, `SOURCE_REGION`,
/// `DESTINATION_ACCOUNT_ID`, `DESTINATION_REGION`, `REPO_NAME`.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// AWS account ID of the source ECR registry
    pub source_account_id: String,
    /// AWS region of the source ECR registry (e.g., "eu-west-1")
    pub source_region: String,
    /// AWS account ID of the destination ECR registry
    pub destination_account_id: String,
    /// AWS region of the destination ECR registry
    pub destination_region: String,
    /// Repository name, identical in both registries
    pub repo_name: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_environment(Environment::default())
    }

    /// Build settings from an explicit environment source.
    ///
    /// Tests inject a `Map` via `Environment::default().source(..)` instead of
    /// mutating process environment variables.
    pub fn from_environment(env: Environment) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder().add_source(env).build()?.try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Coordinate of the registry images are read from
    pub fn source(&self) -> RegistryCoordinate {
        RegistryCoordinate {
            account_id: self.source_account_id.clone(),
            region: self.source_region.clone(),
        }
    }

    /// Coordinate of the registry images are written to
    pub fn destination(&self) -> RegistryCoordinate {
        RegistryCoordinate {
            account_id: self.destination_account_id.clone(),
            region: self.destination_region.clone(),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        Self::validate_account_id(&self.source_account_id, "source_account_id")?;
        Self::validate_account_id(&self.destination_account_id, "destination_account_id")?;
        Self::validate_non_empty(&self.source_region, "source_region")?;
        Self::validate_non_empty(&self.destination_region, "destination_region")?;
        Self::validate_non_empty(&self.repo_name, "repo_name")?;
        Ok(())
    }

    /// Validate that a value looks like an AWS account ID (12 ASCII digits)
    fn validate_account_id(value: &str, field_name: &str) -> Result<(), ConfigError> {
        if value.len() != 12 || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::Message(format!(
                "Configuration error: '{}' must be a 12-digit AWS account ID. Got: '{}'",
                field_name, value
            )));
        }
        Ok(())
    }

    fn validate_non_empty(value: &str, field_name: &str) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::Message(format!(
                "Configuration error: '{}' must not be empty",
                field_name
            )));
        }
        Ok(())
    }
}
