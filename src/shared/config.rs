//! Sync engine configuration
//!
//! Provides configuration types for the sync engine.

use thiserror::Error;

/// Default collection holding one document per signed-in user
const DEFAULT_USERS_COLLECTION: &str = "users";

/// Sync engine configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Remote collection that holds per-user documents
    pub users_collection: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let users_collection = std::env::var("LIGHTSYNC_USERS_COLLECTION")
            .unwrap_or_else(|_| DEFAULT_USERS_COLLECTION.to_string());
        Self { users_collection }
    }
}

impl SyncConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new SyncConfigBuilder
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Document path of the given user's remote document
    pub fn user_doc_path(&self, uid: &str) -> String {
        format!("{}/{}", self.users_collection, uid)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.users_collection.is_empty() {
            return Err(ConfigError::MissingValue("users_collection"));
        }
        Ok(())
    }
}

/// Builder for SyncConfig
#[derive(Debug, Default)]
pub struct SyncConfigBuilder {
    users_collection: Option<String>,
}

impl SyncConfigBuilder {
    /// Set the users collection name
    pub fn users_collection(mut self, collection: impl Into<String>) -> Self {
        self.users_collection = Some(collection.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<SyncConfig, ConfigError> {
        let config = SyncConfig {
            users_collection: self
                .users_collection
                .unwrap_or_else(|| DEFAULT_USERS_COLLECTION.to_string()),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing value: {0}")]
    MissingValue(&'static str),
}
