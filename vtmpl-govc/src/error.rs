use thiserror::Error;

/// Errors returned by the govc client.
#[derive(Debug, Error)]
pub enum GovcError {
    #[error("required govc setting {0} is not set")]
    MissingConfig(&'static str),

    #[error("failed to run govc: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("govc {command} failed: {stderr}")]
    Command { command: String, stderr: String },

    #[error("unmarshalling govc {command} response: {source}")]
    Decode {
        command: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("marshalling template deployment options: {0}")]
    DeployOptions(#[source] serde_json::Error),

    #[error("writing deploy options file {}: {source}", path.display())]
    WriteDeployOptions {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("govc failed to return element info for library element {0}")]
    MissingElementInfo(String),

    #[error("govc returned no vm info for {0}")]
    MissingVm(String),
}

impl GovcError {
    /// True when govc reported that the target object does not exist.
    pub fn is_not_found(&self) -> bool {
        self.output_contains("not found")
    }

    /// True when govc refused a create because the object is already there.
    pub fn is_already_exists(&self) -> bool {
        self.output_contains("already exists")
    }

    fn output_contains(&self, needle: &str) -> bool {
        match self {
            GovcError::Command { stderr, .. } => stderr.to_lowercase().contains(needle),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, GovcError>;
