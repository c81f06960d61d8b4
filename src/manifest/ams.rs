// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! AMS policy deployment: the generated DCL files travel to the deployer Job
//! inside a ConfigMap and are mounted back into their build layout.

use super::{deployer_job, vcap_env, ManifestSet};
use crate::constants::artifacts::AMS_FILES;
use crate::error::{DeployError, Result};
use crate::types::DeploymentDescriptor;
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, EmptyDirVolumeSource, KeyToPath, Volume,
    VolumeMount,
};
use kube::api::ObjectMeta;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const POLICIES_MOUNT: &str = "/policies";
const WORK_DIR: &str = "/app";

/// Copies the read-only policies into a writable directory before `npm start` runs the DCL upload
const DEPLOY_SCRIPT: &str =
    "cp -rL /policies/. /app && cd /app && npm install --omit=dev --no-audit --no-fund && npm start";

/// Read the policy artifacts, keyed by their ConfigMap key
pub fn read_policy_files(dir: &Path) -> Result<BTreeMap<String, String>> {
    AMS_FILES
        .iter()
        .map(|(key, relative)| {
            let path = dir.join(relative);
            fs::read_to_string(&path)
                .map(|content| (key.to_string(), content))
                .map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => DeployError::MissingArtifact {
                        path: path.clone(),
                        hint: "run the upstream build step first".to_string(),
                    },
                    _ => DeployError::io(&path, e),
                })
        })
        .collect()
}

pub fn config_map(descriptor: &DeploymentDescriptor, files: BTreeMap<String, String>) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: descriptor.config_map_name(),
            namespace: Some(descriptor.namespace.clone()),
            labels: Some(descriptor.labels()),
            ..Default::default()
        },
        data: Some(files),
        ..Default::default()
    }
}

fn container(descriptor: &DeploymentDescriptor) -> Container {
    Container {
        name: descriptor.target.component().to_string(),
        image: Some(descriptor.image.clone()),
        command: Some(vec![
            "sh".to_string(),
            "-c".to_string(),
            DEPLOY_SCRIPT.to_string(),
        ]),
        working_dir: Some(WORK_DIR.to_string()),
        env: Some(vec![vcap_env(descriptor)]),
        volume_mounts: Some(vec![
            VolumeMount {
                name: "policies".to_string(),
                mount_path: POLICIES_MOUNT.to_string(),
                read_only: Some(true),
                ..Default::default()
            },
            VolumeMount {
                name: "work".to_string(),
                mount_path: WORK_DIR.to_string(),
                ..Default::default()
            },
        ]),
        ..Default::default()
    }
}

fn volumes(config_map_name: String) -> Vec<Volume> {
    vec![
        Volume {
            name: "policies".to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: config_map_name,
                items: Some(
                    AMS_FILES
                        .iter()
                        .map(|(key, relative)| KeyToPath {
                            key: key.to_string(),
                            path: relative.to_string(),
                            ..Default::default()
                        })
                        .collect(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        },
        Volume {
            name: "work".to_string(),
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Default::default()
        },
    ]
}

pub fn render(descriptor: &DeploymentDescriptor) -> Result<ManifestSet> {
    let files = read_policy_files(&descriptor.artifact_dir)?;
    let config_map = config_map(descriptor, files);
    let config_map_name = config_map.metadata.name.clone().unwrap_or_default();

    Ok(ManifestSet {
        job: deployer_job(descriptor, container(descriptor), volumes(config_map_name)),
        config_map: Some(config_map),
    })
}
