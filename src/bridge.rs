// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Credential bridge: turns service binding secrets into the legacy
//! `VCAP_SERVICES` catalog the deployer tools read from their environment.

use crate::constants::VCAP_SERVICES;
use crate::error::{DeployError, Result};
use crate::kubernetes::ClusterApi;
use crate::types::{DeploymentDescriptor, DeploymentTarget};
use k8s_openapi::api::core::v1::Secret;
use kube::api::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// One entry of a service binding catalog
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ServiceBinding<C> {
    pub name: String,
    pub label: String,
    pub plan: String,
    pub tags: Vec<String>,
    pub credentials: C,
}

/// Credentials of an identity service instance with AMS enabled
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct AmsCredentials {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clientid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_url: Option<String>,
    #[serde(rename = "credential-type", skip_serializing_if = "Option::is_none")]
    pub credential_type: Option<String>,
}

/// Credentials of an HDI container
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct HanaCredentials {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hdi_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hdi_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_id: Option<String>,
}

/// Read a single key from a Secret, looking at `data` first and `stringData` second
pub fn secret_field(secret: &Secret, key: &str) -> Result<Option<String>> {
    if let Some(bytes) = secret.data.as_ref().and_then(|d| d.get(key)) {
        return String::from_utf8(bytes.0.clone()).map(Some).map_err(|e| {
            DeployError::CredentialError(format!(
                "key '{}' of secret {} is not valid UTF-8: {}",
                key,
                secret.metadata.name.as_deref().unwrap_or_default(),
                e
            ))
        });
    }

    Ok(secret
        .string_data
        .as_ref()
        .and_then(|d| d.get(key))
        .cloned())
}

impl AmsCredentials {
    const FIELDS: [&'static str; 5] = ["clientid", "certificate", "key", "url", "bundle_url"];

    pub fn from_secret(secret: &Secret) -> Result<Self> {
        let mut fields = collect_fields(secret, &Self::FIELDS)?;
        Ok(Self {
            clientid: fields.remove("clientid"),
            certificate: fields.remove("certificate"),
            key: fields.remove("key"),
            url: fields.remove("url"),
            bundle_url: fields.remove("bundle_url"),
            credential_type: Some("X509_GENERATED".to_string()),
        })
    }
}

impl HanaCredentials {
    const FIELDS: [&'static str; 11] = [
        "host",
        "port",
        "schema",
        "user",
        "password",
        "hdi_user",
        "hdi_password",
        "certificate",
        "url",
        "driver",
        "database_id",
    ];

    pub fn from_secret(secret: &Secret) -> Result<Self> {
        let mut fields = collect_fields(secret, &Self::FIELDS)?;
        Ok(Self {
            host: fields.remove("host"),
            port: fields.remove("port"),
            schema: fields.remove("schema"),
            user: fields.remove("user"),
            password: fields.remove("password"),
            hdi_user: fields.remove("hdi_user"),
            hdi_password: fields.remove("hdi_password"),
            certificate: fields.remove("certificate"),
            url: fields.remove("url"),
            driver: fields.remove("driver"),
            database_id: fields.remove("database_id"),
        })
    }
}

/// Read each key independently, warning about the ones that are missing
fn collect_fields(secret: &Secret, keys: &[&'static str]) -> Result<BTreeMap<&'static str, String>> {
    let mut fields = BTreeMap::new();
    for key in keys {
        match secret_field(secret, key)? {
            Some(value) => {
                fields.insert(*key, value);
            }
            None => warn!(
                "Secret {} has no '{}' field, leaving it out of the binding",
                secret.metadata.name.as_deref().unwrap_or_default(),
                key
            ),
        }
    }
    Ok(fields)
}

/// Serialize a single-entry catalog keyed by the binding's label
pub fn catalog_json<C: Serialize>(binding: &ServiceBinding<C>) -> Result<String> {
    let catalog = BTreeMap::from([(binding.label.as_str(), vec![binding])]);
    Ok(serde_json::to_string(&catalog)?)
}

/// Build the catalog document for a target from its source secret
pub fn build_catalog(descriptor: &DeploymentDescriptor, source: &Secret) -> Result<String> {
    match descriptor.target {
        DeploymentTarget::AmsPolicies => catalog_json(&ServiceBinding {
            name: format!("{}-auth", descriptor.app_name),
            label: "identity".to_string(),
            plan: "application".to_string(),
            tags: vec!["ias".to_string()],
            credentials: AmsCredentials::from_secret(source)?,
        }),
        DeploymentTarget::HanaSchema => catalog_json(&ServiceBinding {
            name: format!("{}-db", descriptor.app_name),
            label: "hana".to_string(),
            plan: "hdi-shared".to_string(),
            tags: vec!["hana".to_string()],
            credentials: HanaCredentials::from_secret(source)?,
        }),
    }
}

/// The Secret that carries the catalog into the deployer Job
pub fn binding_secret(descriptor: &DeploymentDescriptor, catalog: String) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(descriptor.binding_secret_name()),
            namespace: Some(descriptor.namespace.clone()),
            labels: Some(descriptor.labels()),
            ..Default::default()
        },
        string_data: Some(BTreeMap::from([(VCAP_SERVICES.to_string(), catalog)])),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    }
}

/// Make sure the binding Secret exists before the Job is applied.
///
/// AMS rebuilds it from the source secret on every run. HANA keeps an existing
/// binding Secret and only builds one when it is absent.
#[instrument(skip_all, fields(target = %descriptor.target))]
pub async fn materialize_binding<C: ClusterApi + ?Sized>(
    cluster: &C,
    descriptor: &DeploymentDescriptor,
) -> Result<()> {
    let namespace = &descriptor.namespace;
    let binding_name = descriptor.binding_secret_name();

    if descriptor.target == DeploymentTarget::HanaSchema
        && cluster.get_secret(namespace, &binding_name).await?.is_some()
    {
        info!("Using existing binding secret {}/{}", namespace, binding_name);
        return Ok(());
    }

    let source = cluster
        .get_secret(namespace, &descriptor.secret_ref)
        .await?
        .ok_or_else(|| DeployError::MissingSecret {
            namespace: namespace.clone(),
            name: descriptor.secret_ref.clone(),
            hint: "create the service binding for this application first".to_string(),
        })?;

    debug!(
        "Building {} from {}/{}",
        binding_name, namespace, descriptor.secret_ref
    );
    let catalog = build_catalog(descriptor, &source)?;
    cluster
        .apply_secret(namespace, &binding_secret(descriptor, catalog))
        .await?;

    info!("Binding secret {}/{} is in place", namespace, binding_name);
    Ok(())
}
