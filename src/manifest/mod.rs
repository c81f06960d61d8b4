// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Manifest rendering. Manifests are built as typed objects and serialized,
//! never assembled from text templates.

pub mod ams;
pub mod hana;

use crate::constants::{files, job, VCAP_SERVICES};
use crate::error::{DeployError, Result};
use crate::types::{DeploymentDescriptor, DeploymentTarget};
use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, Container, EnvVar, EnvVarSource, PodSpec, PodTemplateSpec, SecretKeySelector,
    Volume,
};
use kube::api::ObjectMeta;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// The set of objects one run applies
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestSet {
    pub config_map: Option<ConfigMap>,
    pub job: Job,
}

/// (file name, YAML document)
pub type RenderedFile = (&'static str, String);

impl ManifestSet {
    /// Build the manifests for a descriptor, reading artifacts from disk where needed
    pub fn render(descriptor: &DeploymentDescriptor) -> Result<Self> {
        match descriptor.target {
            DeploymentTarget::AmsPolicies => ams::render(descriptor),
            DeploymentTarget::HanaSchema => Ok(hana::render(descriptor)),
        }
    }

    /// Serialize to YAML, one document per file. Output is deterministic for equal inputs.
    pub fn to_files(&self, target: DeploymentTarget) -> Result<Vec<RenderedFile>> {
        let mut rendered = Vec::new();
        match target {
            DeploymentTarget::AmsPolicies => {
                if let Some(cm) = &self.config_map {
                    rendered.push((files::AMS_CONFIGMAP, serde_yaml::to_string(cm)?));
                }
                rendered.push((files::AMS_JOB, serde_yaml::to_string(&self.job)?));
            }
            DeploymentTarget::HanaSchema => {
                rendered.push((files::HANA_JOB, serde_yaml::to_string(&self.job)?));
            }
        }
        Ok(rendered)
    }

    /// Write the manifests into `dir`, overwriting previous renders
    pub fn write_to(&self, target: DeploymentTarget, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir).map_err(|e| DeployError::io(dir, e))?;

        let mut written = Vec::new();
        for (name, yaml) in self.to_files(target)? {
            let path = dir.join(name);
            fs::write(&path, yaml).map_err(|e| DeployError::io(&path, e))?;
            debug!("Wrote {}", path.display());
            written.push(path);
        }

        info!("Rendered {} manifest(s) into {}", written.len(), dir.display());
        Ok(written)
    }
}

/// `VCAP_SERVICES` sourced from the binding Secret
pub(crate) fn vcap_env(descriptor: &DeploymentDescriptor) -> EnvVar {
    EnvVar {
        name: VCAP_SERVICES.to_string(),
        value_from: Some(EnvVarSource {
            secret_key_ref: Some(SecretKeySelector {
                name: descriptor.binding_secret_name(),
                key: VCAP_SERVICES.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Run-to-completion Job around a single deployer container
pub(crate) fn deployer_job(
    descriptor: &DeploymentDescriptor,
    container: Container,
    volumes: Vec<Volume>,
) -> Job {
    let labels = descriptor.labels();

    Job {
        metadata: ObjectMeta {
            name: Some(descriptor.job_name()),
            namespace: Some(descriptor.namespace.clone()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(JobSpec {
            backoff_limit: Some(job::BACKOFF_LIMIT),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    restart_policy: Some("Never".to_string()),
                    containers: vec![container],
                    volumes: (!volumes.is_empty()).then_some(volumes),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}
