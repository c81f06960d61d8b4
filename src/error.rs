// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Required tool '{tool}' not found in PATH: {hint}")]
    MissingTool { tool: String, hint: String },

    #[error("Artifact {} not found: {hint}", .path.display())]
    MissingArtifact { path: PathBuf, hint: String },

    #[error("Credential secret {namespace}/{name} not found: {hint}")]
    MissingSecret {
        namespace: String,
        name: String,
        hint: String,
    },

    #[error("Invalid credential data: {0}")]
    CredentialError(String),

    #[error("Job {0} is still running, refusing to start another deployment")]
    DeploymentInProgress(String),

    #[error("Job {job} failed: {reason}")]
    JobFailed { job: String, reason: String },

    #[error("Job {job} did not complete within {secs} seconds")]
    JobTimedOut { job: String, secs: u64 },

    #[error("Previous Job {job} was not removed within {secs} seconds, nothing was applied")]
    PreviousJobNotDeleted { job: String, secs: u64 },

    #[error("I/O error on {}: {source}", .path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize manifest: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to serialize service binding: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl DeployError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DeployError::IoError {
            path: path.into(),
            source,
        }
    }

    /// Whether the error was raised by the cluster after the manifests were applied
    pub fn is_platform_failure(&self) -> bool {
        matches!(
            self,
            DeployError::JobFailed { .. } | DeployError::JobTimedOut { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;
