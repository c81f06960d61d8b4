// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The cluster collaborator used by the deployment pipeline

use crate::constants::{labels, MANAGER_NAME};
use crate::error::Result;
use async_trait::async_trait;
use futures::future::join_all;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ConfigMap, Event, Pod, Secret};
use kube::{
    api::{DeleteParams, ListParams, LogParams, Patch, PatchParams, PostParams},
    Api, Client, Resource, ResourceExt,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use tracing::{debug, info, instrument};

/// Narrow view of the Kubernetes API the deployment needs.
/// Deletes report whether anything was removed and never fail on a missing object.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>>;
    async fn apply_secret(&self, namespace: &str, secret: &Secret) -> Result<()>;
    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<bool>;

    async fn apply_config_map(&self, namespace: &str, config_map: &ConfigMap) -> Result<()>;
    async fn delete_config_map(&self, namespace: &str, name: &str) -> Result<bool>;

    async fn get_job(&self, namespace: &str, name: &str) -> Result<Option<Job>>;
    async fn create_job(&self, namespace: &str, job: &Job) -> Result<()>;
    async fn delete_job(&self, namespace: &str, name: &str) -> Result<bool>;

    /// Logs of every pod the Job created, in pod name order
    async fn job_logs(&self, namespace: &str, job_name: &str) -> Result<String>;
    async fn job_events(&self, namespace: &str, job_name: &str) -> Result<Vec<Event>>;
}

/// `ClusterApi` backed by a live kube client
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn apply<K>(&self, namespace: &str, object: &K) -> Result<()>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()>
            + Clone
            + Debug
            + Serialize
            + DeserializeOwned,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let name = object.name_any();
        let pp = PatchParams::apply(MANAGER_NAME).force();
        api.patch(&name, &pp, &Patch::Apply(object)).await?;
        info!("Applied {} {}/{}", K::kind(&()), namespace, name);
        Ok(())
    }

    async fn delete<K>(&self, namespace: &str, name: &str) -> Result<bool>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope, DynamicType = ()>
            + Clone
            + Debug
            + DeserializeOwned,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        match api.delete(name, &DeleteParams::foreground()).await {
            Ok(_) => {
                info!("Deleted {} {}/{}", K::kind(&()), namespace, name);
                Ok(true)
            }
            Err(kube::Error::Api(err)) if err.code == 404 => {
                debug!("{} {}/{} not found", K::kind(&()), namespace, name);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    #[instrument(skip(self, secret), fields(secret = %secret.name_any()))]
    async fn apply_secret(&self, namespace: &str, secret: &Secret) -> Result<()> {
        self.apply(namespace, secret).await
    }

    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<bool> {
        self.delete::<Secret>(namespace, name).await
    }

    #[instrument(skip(self, config_map), fields(config_map = %config_map.name_any()))]
    async fn apply_config_map(&self, namespace: &str, config_map: &ConfigMap) -> Result<()> {
        self.apply(namespace, config_map).await
    }

    async fn delete_config_map(&self, namespace: &str, name: &str) -> Result<bool> {
        self.delete::<ConfigMap>(namespace, name).await
    }

    async fn get_job(&self, namespace: &str, name: &str) -> Result<Option<Job>> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    #[instrument(skip(self, job), fields(job = %job.name_any()))]
    async fn create_job(&self, namespace: &str, job: &Job) -> Result<()> {
        let api: Api<Job> = Api::namespaced(self.client.clone(), namespace);
        api.create(&PostParams::default(), job).await?;
        info!("Created Job {}/{}", namespace, job.name_any());
        Ok(())
    }

    async fn delete_job(&self, namespace: &str, name: &str) -> Result<bool> {
        self.delete::<Job>(namespace, name).await
    }

    #[instrument(skip(self))]
    async fn job_logs(&self, namespace: &str, job_name: &str) -> Result<String> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let lp = ListParams::default().labels(&format!("{}={}", labels::JOB_NAME, job_name));
        let mut names: Vec<String> = pods
            .list(&lp)
            .await?
            .items
            .iter()
            .map(|p| p.name_any())
            .collect();
        names.sort();

        if names.is_empty() {
            return Ok(format!("No pods found for Job {}\n", job_name));
        }

        // A pod that never started has no logs; report that inline instead of failing
        let logs = join_all(names.iter().map(|name| {
            let pods = pods.clone();
            async move {
                match pods.logs(name, &LogParams::default()).await {
                    Ok(text) => text,
                    Err(e) => format!("<logs unavailable: {}>\n", e),
                }
            }
        }))
        .await;

        Ok(names
            .iter()
            .zip(logs)
            .map(|(name, text)| format!("==> pod/{} <==\n{}", name, text))
            .collect())
    }

    async fn job_events(&self, namespace: &str, job_name: &str) -> Result<Vec<Event>> {
        let events: Api<Event> = Api::namespaced(self.client.clone(), namespace);
        let lp = ListParams::default().fields(&format!("involvedObject.name={}", job_name));
        Ok(events.list(&lp).await?.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{job_json, not_found_json, MockService};

    const JOBS: &str = "/apis/batch/v1/namespaces/test/jobs";
    const SECRETS: &str = "/api/v1/namespaces/test/secrets";
    const CONFIG_MAPS: &str = "/api/v1/namespaces/test/configmaps";

    #[tokio::test]
    async fn test_get_job_found() {
        let client = MockService::new()
            .on_get(
                &format!("{}/demo-hana-deployer", JOBS),
                200,
                &job_json("demo-hana-deployer", "Complete"),
            )
            .into_client();
        let cluster = KubeCluster::new(client);

        let job = cluster.get_job("test", "demo-hana-deployer").await.unwrap();
        assert_eq!(job.unwrap().name_any(), "demo-hana-deployer");
    }

    #[tokio::test]
    async fn test_get_secret_not_found() {
        let client = MockService::new()
            .on_get(
                &format!("{}/demo-db", SECRETS),
                404,
                &not_found_json("secrets", "demo-db"),
            )
            .into_client();
        let cluster = KubeCluster::new(client);

        assert!(cluster.get_secret("test", "demo-db").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_objects_is_not_an_error() {
        // Every request falls through to the default 404
        let cluster = KubeCluster::new(MockService::new().into_client());

        assert!(!cluster.delete_job("test", "demo-ams-policies-deployer").await.unwrap());
        assert!(!cluster.delete_config_map("test", "demo-ams-policies").await.unwrap());
        assert!(!cluster.delete_secret("test", "demo-ams-vcap").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_existing_job() {
        let client = MockService::new()
            .on_delete(
                &format!("{}/demo-hana-deployer", JOBS),
                200,
                &job_json("demo-hana-deployer", "Complete"),
            )
            .into_client();
        let cluster = KubeCluster::new(client);

        assert!(cluster.delete_job("test", "demo-hana-deployer").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_propagates_server_errors() {
        let client = MockService::new()
            .on_delete(
                &format!("{}/demo-ams-policies", CONFIG_MAPS),
                403,
                r#"{"kind":"Status","apiVersion":"v1","status":"Failure","message":"forbidden","reason":"Forbidden","code":403}"#,
            )
            .into_client();
        let cluster = KubeCluster::new(client);

        assert!(cluster
            .delete_config_map("test", "demo-ams-policies")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_job_logs_without_pods() {
        let client = MockService::new()
            .on_get(
                "/api/v1/namespaces/test/pods",
                200,
                r#"{"apiVersion":"v1","kind":"PodList","metadata":{},"items":[]}"#,
            )
            .into_client();
        let cluster = KubeCluster::new(client);

        let logs = cluster.job_logs("test", "demo-hana-deployer").await.unwrap();
        assert!(logs.contains("No pods found"));
    }
}
