//! Connection settings for govc
//!
//! govc reads its endpoint and credentials from environment variables. The
//! client never inherits them implicitly: a [`GovcConfig`] is built up front
//! and turned into the child process environment by the executor.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{GovcError, Result};

pub const GOVC_URL: &str = "GOVC_URL";
pub const GOVC_USERNAME: &str = "GOVC_USERNAME";
pub const GOVC_PASSWORD: &str = "GOVC_PASSWORD";
pub const GOVC_INSECURE: &str = "GOVC_INSECURE";
pub const GOVC_DATACENTER: &str = "GOVC_DATACENTER";

/// Explicit govc connection configuration.
#[derive(Debug, Clone)]
pub struct GovcConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    pub insecure: bool,
    pub datacenter: String,
    /// Path or name of the govc binary.
    pub binary: PathBuf,
    /// Directory for files handed to govc (deploy options).
    pub state_dir: PathBuf,
}

impl GovcConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or(GovcError::MissingConfig(key))
        };

        let insecure = lookup(GOVC_INSECURE)
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true"))
            .unwrap_or(false);

        Ok(Self {
            url: required(GOVC_URL)?,
            username: required(GOVC_USERNAME)?,
            password: required(GOVC_PASSWORD)?,
            insecure,
            datacenter: required(GOVC_DATACENTER)?,
            binary: PathBuf::from("govc"),
            state_dir: std::env::temp_dir(),
        })
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_state_dir(mut self, state_dir: impl Into<PathBuf>) -> Self {
        self.state_dir = state_dir.into();
        self
    }

    /// Environment handed to every govc child process.
    pub fn env_map(&self) -> HashMap<String, String> {
        HashMap::from([
            (GOVC_URL.to_string(), self.url.clone()),
            (GOVC_USERNAME.to_string(), self.username.clone()),
            (GOVC_PASSWORD.to_string(), self.password.clone()),
            (GOVC_INSECURE.to_string(), self.insecure.to_string()),
            (GOVC_DATACENTER.to_string(), self.datacenter.clone()),
        ])
    }
}
