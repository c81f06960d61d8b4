// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! HANA schema deployment through the HDI deployer image

use super::{deployer_job, vcap_env, ManifestSet};
use crate::types::DeploymentDescriptor;
use k8s_openapi::api::core::v1::{Container, EnvVar};

fn container(descriptor: &DeploymentDescriptor) -> Container {
    Container {
        name: descriptor.target.component().to_string(),
        image: Some(descriptor.image.clone()),
        image_pull_policy: Some("Always".to_string()),
        env: Some(vec![
            vcap_env(descriptor),
            // hdi-deploy keeps the process alive unless told to exit
            EnvVar {
                name: "EXIT".to_string(),
                value: Some("true".to_string()),
                ..Default::default()
            },
        ]),
        ..Default::default()
    }
}

pub fn render(descriptor: &DeploymentDescriptor) -> ManifestSet {
    ManifestSet {
        config_map: None,
        job: deployer_job(descriptor, container(descriptor), Vec::new()),
    }
}
