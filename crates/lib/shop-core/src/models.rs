use std::fmt;

use serde::{Deserialize, Serialize};

/// Admin API version used when a store does not pin one.
pub const DEFAULT_API_VERSION: &str = "2023-07";

/// Connection settings for one store, as supplied by a configuration source.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub domain: String,
    pub credential: String,
    pub api_version: Option<String>,
}

impl StoreConfig {
    #[must_use]
    pub fn new(domain: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            credential: credential.into(),
            api_version: None,
        }
    }

    #[must_use]
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("domain", &self.domain)
            .field("credential", &"<redacted>")
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// Public view of a registered store. Never carries the credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreInfo {
    pub alias: String,
    pub domain: String,
    pub api_version: String,
}
