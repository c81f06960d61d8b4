// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{job, labels, MANAGER_NAME};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// The two deployment flows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentTarget {
    /// AMS authorization policies, shipped to the Job through a ConfigMap
    AmsPolicies,
    /// HANA schema deployed through HDI, artifacts baked into the deployer image
    HanaSchema,
}

impl DeploymentTarget {
    pub fn component(&self) -> &'static str {
        match self {
            DeploymentTarget::AmsPolicies => "ams-policies",
            DeploymentTarget::HanaSchema => "hana-deployer",
        }
    }

    pub fn job_name(&self, app_name: &str) -> String {
        match self {
            DeploymentTarget::AmsPolicies => format!("{}-ams-policies-deployer", app_name),
            DeploymentTarget::HanaSchema => format!("{}-hana-deployer", app_name),
        }
    }

    /// Only the AMS flow ships its artifacts through a ConfigMap
    pub fn config_map_name(&self, app_name: &str) -> Option<String> {
        match self {
            DeploymentTarget::AmsPolicies => Some(format!("{}-ams-policies", app_name)),
            DeploymentTarget::HanaSchema => None,
        }
    }

    /// Name of the pre-existing Secret the credential bridge reads from
    pub fn source_secret_name(&self, app_name: &str) -> String {
        match self {
            DeploymentTarget::AmsPolicies => format!("{}-ams", app_name),
            DeploymentTarget::HanaSchema => format!("{}-db", app_name),
        }
    }

    /// Name of the Secret carrying the synthesized service binding catalog
    pub fn binding_secret_name(&self, app_name: &str) -> String {
        match self {
            DeploymentTarget::AmsPolicies => format!("{}-ams-vcap", app_name),
            DeploymentTarget::HanaSchema => format!("{}-hana-vcap", app_name),
        }
    }

    pub fn default_timeout(&self) -> Duration {
        match self {
            DeploymentTarget::AmsPolicies => Duration::from_secs(job::AMS_TIMEOUT_SECS),
            DeploymentTarget::HanaSchema => Duration::from_secs(job::HANA_TIMEOUT_SECS),
        }
    }

    /// Hint printed when the artifact directory is missing
    pub fn build_hint(&self) -> &'static str {
        match self {
            DeploymentTarget::AmsPolicies => {
                "run the upstream build step first (e.g. `cds build --for ams`)"
            }
            DeploymentTarget::HanaSchema => {
                "run the upstream build step first (e.g. `cds build --production`)"
            }
        }
    }
}

impl fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeploymentTarget::AmsPolicies => "ams",
            DeploymentTarget::HanaSchema => "hana",
        })
    }
}

/// Everything needed to render and run one deployment, fixed for the duration of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentDescriptor {
    pub target: DeploymentTarget,
    pub app_name: String,
    pub namespace: String,
    pub artifact_dir: PathBuf,
    pub secret_ref: String,
    pub image: String,
}

impl DeploymentDescriptor {
    pub fn job_name(&self) -> String {
        self.target.job_name(&self.app_name)
    }

    pub fn config_map_name(&self) -> Option<String> {
        self.target.config_map_name(&self.app_name)
    }

    pub fn binding_secret_name(&self) -> String {
        self.target.binding_secret_name(&self.app_name)
    }

    /// Labels shared by every object generated for this descriptor
    pub fn labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (labels::NAME.to_string(), self.app_name.clone()),
            (labels::MANAGED_BY.to_string(), MANAGER_NAME.to_string()),
            (
                labels::COMPONENT.to_string(),
                self.target.component().to_string(),
            ),
        ])
    }
}

/// Progress of a single run. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunState {
    Pending,
    Checked,
    Rendered,
    Applied,
    Complete,
    Failed,
    TimedOut,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Complete | RunState::Failed | RunState::TimedOut
        )
    }

    /// Whether `next` is a legal successor of this state
    pub fn can_advance_to(&self, next: RunState) -> bool {
        match self {
            RunState::Pending => next == RunState::Checked,
            RunState::Checked => next == RunState::Rendered,
            RunState::Rendered => next == RunState::Applied,
            RunState::Applied => next.is_terminal(),
            RunState::Complete | RunState::Failed | RunState::TimedOut => false,
        }
    }
}
