// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{defaults, job};
use crate::types::descriptor::{DeploymentDescriptor, DeploymentTarget};
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

/// Command line options shared by every target, each with an environment fallback
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Application name, used as prefix for every generated resource
    #[arg(long, env = "APP_NAME", default_value = defaults::APP_NAME, global = true)]
    pub app_name: String,

    /// Target namespace
    #[arg(long, env = "NAMESPACE", default_value = defaults::NAMESPACE, global = true)]
    pub namespace: String,

    /// Directory holding the generated AMS policies
    #[arg(long, env = "GEN_POLICIES_DIR", default_value = defaults::POLICIES_DIR, global = true)]
    pub policies_dir: PathBuf,

    /// Directory holding the generated HDI database artifacts
    #[arg(long, env = "GEN_DB_DIR", default_value = defaults::DB_DIR, global = true)]
    pub db_dir: PathBuf,

    /// Directory the rendered manifests are written to
    #[arg(long, env = "MANIFEST_DIR", default_value = defaults::MANIFEST_DIR, global = true)]
    pub manifest_dir: PathBuf,

    #[arg(long, env = "AMS_DEPLOYER_IMAGE", default_value = defaults::AMS_DEPLOYER_IMAGE, global = true)]
    pub ams_deployer_image: String,

    #[arg(long, env = "HANA_DEPLOYER_IMAGE", default_value = defaults::HANA_DEPLOYER_IMAGE, global = true)]
    pub hana_deployer_image: String,

    /// Seconds to wait for the Job (defaults to 300 for ams, 600 for hana)
    #[arg(long = "timeout", env = "DEPLOY_TIMEOUT_SECS", global = true)]
    pub timeout_secs: Option<u64>,

    /// Tools that must be on PATH before anything is rendered
    #[arg(long = "require-tool", env = "REQUIRED_TOOLS", value_delimiter = ',', global = true)]
    pub required_tools: Vec<String>,

    /// Fail instead of warn when optional HDI artifacts are missing
    #[arg(long, env = "STRICT_ARTIFACTS", global = true)]
    pub strict_artifacts: bool,
}

/// Deployment configuration, resolved once at startup and passed into the pipeline
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub app_name: String,
    pub namespace: String,
    pub policies_dir: PathBuf,
    pub db_dir: PathBuf,
    pub manifest_dir: PathBuf,
    pub ams_deployer_image: String,
    pub hana_deployer_image: String,
    /// Overrides the per-target default timeout when set
    pub timeout: Option<Duration>,
    pub poll_interval: Duration,
    /// How long to wait for a previous Job to be removed before applying
    pub delete_timeout: Duration,
    pub required_tools: Vec<String>,
    pub strict_artifacts: bool,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            app_name: defaults::APP_NAME.to_string(),
            namespace: defaults::NAMESPACE.to_string(),
            policies_dir: PathBuf::from(defaults::POLICIES_DIR),
            db_dir: PathBuf::from(defaults::DB_DIR),
            manifest_dir: PathBuf::from(defaults::MANIFEST_DIR),
            ams_deployer_image: defaults::AMS_DEPLOYER_IMAGE.to_string(),
            hana_deployer_image: defaults::HANA_DEPLOYER_IMAGE.to_string(),
            timeout: None,
            poll_interval: Duration::from_secs(job::POLL_INTERVAL_SECS),
            delete_timeout: Duration::from_secs(job::DELETE_TIMEOUT_SECS),
            required_tools: Vec::new(),
            strict_artifacts: false,
        }
    }
}

impl From<ConfigArgs> for DeployConfig {
    fn from(args: ConfigArgs) -> Self {
        Self {
            app_name: args.app_name,
            namespace: args.namespace,
            policies_dir: args.policies_dir,
            db_dir: args.db_dir,
            manifest_dir: args.manifest_dir,
            ams_deployer_image: args.ams_deployer_image,
            hana_deployer_image: args.hana_deployer_image,
            timeout: args.timeout_secs.map(Duration::from_secs),
            required_tools: args
                .required_tools
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            strict_artifacts: args.strict_artifacts,
            ..Default::default()
        }
    }
}

impl DeployConfig {
    /// Resolve the descriptor for a single target
    pub fn descriptor(&self, target: DeploymentTarget) -> DeploymentDescriptor {
        let (artifact_dir, image) = match target {
            DeploymentTarget::AmsPolicies => (&self.policies_dir, &self.ams_deployer_image),
            DeploymentTarget::HanaSchema => (&self.db_dir, &self.hana_deployer_image),
        };

        DeploymentDescriptor {
            target,
            app_name: self.app_name.clone(),
            namespace: self.namespace.clone(),
            artifact_dir: artifact_dir.clone(),
            secret_ref: target.source_secret_name(&self.app_name),
            image: image.clone(),
        }
    }

    pub fn timeout_for(&self, target: DeploymentTarget) -> Duration {
        self.timeout.unwrap_or_else(|| target.default_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        config: ConfigArgs,
    }

    #[test]
    fn test_defaults() {
        let cli = TestCli::parse_from(["capdeploy"]);
        let config = DeployConfig::from(cli.config);

        assert_eq!(config.app_name, "bookshop");
        assert_eq!(config.namespace, "default");
        assert_eq!(config.policies_dir, PathBuf::from("gen/policies"));
        assert!(config.required_tools.is_empty());
        assert!(!config.strict_artifacts);
    }

    #[test]
    fn test_timeout_per_target() {
        let config = DeployConfig::default();
        assert_eq!(
            config.timeout_for(DeploymentTarget::AmsPolicies),
            Duration::from_secs(300)
        );
        assert_eq!(
            config.timeout_for(DeploymentTarget::HanaSchema),
            Duration::from_secs(600)
        );

        let config = DeployConfig {
            timeout: Some(Duration::from_secs(42)),
            ..Default::default()
        };
        assert_eq!(
            config.timeout_for(DeploymentTarget::HanaSchema),
            Duration::from_secs(42)
        );
    }

    #[test]
    fn test_required_tools_are_split_and_trimmed() {
        let cli = TestCli::parse_from(["capdeploy", "--require-tool", "kubectl, npm,,jq"]);
        let config = DeployConfig::from(cli.config);
        assert_eq!(config.required_tools, vec!["kubectl", "npm", "jq"]);
    }

    #[test]
    fn test_descriptor_for_ams() {
        let config = DeployConfig {
            app_name: "demo".to_string(),
            namespace: "test".to_string(),
            ..Default::default()
        };

        let descriptor = config.descriptor(DeploymentTarget::AmsPolicies);
        assert_eq!(descriptor.app_name, "demo");
        assert_eq!(descriptor.namespace, "test");
        assert_eq!(descriptor.artifact_dir, PathBuf::from("gen/policies"));
        assert_eq!(descriptor.secret_ref, "demo-ams");
        assert_eq!(descriptor.image, "node:20-slim");
    }
}
