//! Remote replica configuration.
//!
//! # Responsibility
//! - Carry the endpoint/principal/credential triple for a configured
//!   replica and validate it before any remote call.
//!
//! # Invariants
//! - Absent configuration means sync stays disabled; a present but invalid
//!   configuration is rejected at construction, never at call time.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Connection settings for one remote replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Base URL of the replica, `http://` or `https://`.
    pub endpoint: String,
    /// Authenticated principal whose collection is synced.
    pub principal: String,
    pub access_token: String,
}

/// Configuration validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncConfigError {
    EmptyField(&'static str),
    InvalidEndpoint(String),
}

impl Display for SyncConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField(field) => write!(f, "sync config field `{field}` must not be empty"),
            Self::InvalidEndpoint(value) => {
                write!(f, "sync endpoint must be an http(s) URL, got `{value}`")
            }
        }
    }
}

impl Error for SyncConfigError {}

impl SyncConfig {
    pub fn validate(&self) -> Result<(), SyncConfigError> {
        for (field, value) in [
            ("endpoint", &self.endpoint),
            ("principal", &self.principal),
            ("access_token", &self.access_token),
        ] {
            if value.trim().is_empty() {
                return Err(SyncConfigError::EmptyField(field));
            }
        }
        let endpoint = self.endpoint.trim();
        if !endpoint.starts_with("https://") && !endpoint.starts_with("http://") {
            return Err(SyncConfigError::InvalidEndpoint(endpoint.to_string()));
        }
        Ok(())
    }
}
