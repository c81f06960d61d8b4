// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Environment checks that run before anything is rendered or applied.

use crate::constants::artifacts;
use crate::error::{DeployError, Result};
use crate::types::{DeploymentDescriptor, DeploymentTarget};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, instrument, warn};

/// Locate a binary on PATH
pub fn find_binary(name: &str) -> Option<PathBuf> {
    Command::new("which")
        .arg(name)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| PathBuf::from(s.trim()))
        .filter(|p| !p.as_os_str().is_empty())
}

/// Fail unless `name` can be invoked
pub fn require_tool(name: &str) -> Result<PathBuf> {
    find_binary(name).ok_or_else(|| DeployError::MissingTool {
        tool: name.to_string(),
        hint: format!("install {} and make sure it is on PATH", name),
    })
}

/// Fail unless `path` is an existing directory
pub fn require_dir(path: &Path, hint: &str) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(DeployError::MissingArtifact {
            path: path.to_path_buf(),
            hint: hint.to_string(),
        })
    }
}

fn require_file(path: &Path, hint: &str) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(DeployError::MissingArtifact {
            path: path.to_path_buf(),
            hint: hint.to_string(),
        })
    }
}

/// Run every precondition for a descriptor. Nothing is retried.
#[instrument(skip_all, fields(target = %descriptor.target))]
pub fn check_preconditions(
    descriptor: &DeploymentDescriptor,
    required_tools: &[String],
    strict_artifacts: bool,
) -> Result<()> {
    for tool in required_tools {
        let path = require_tool(tool)?;
        debug!("Found {} at {}", tool, path.display());
    }

    let hint = descriptor.target.build_hint();
    require_dir(&descriptor.artifact_dir, hint)?;

    match descriptor.target {
        DeploymentTarget::AmsPolicies => {
            for (_, relative) in artifacts::AMS_FILES {
                require_file(&descriptor.artifact_dir.join(relative), hint)?;
            }
        }
        DeploymentTarget::HanaSchema => {
            for relative in artifacts::HDI_EXPECTED_FILES {
                let path = descriptor.artifact_dir.join(relative);
                if path.is_file() {
                    continue;
                }
                if strict_artifacts {
                    return Err(DeployError::MissingArtifact {
                        path,
                        hint: hint.to_string(),
                    });
                }
                warn!(
                    "{} not found, the HDI deployer may fall back to its defaults",
                    path.display()
                );
            }
        }
    }

    info!(
        "Preconditions satisfied for {} in {}",
        descriptor.target,
        descriptor.artifact_dir.display()
    );
    Ok(())
}
