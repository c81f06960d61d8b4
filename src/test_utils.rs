// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test doubles for the Kubernetes API: a mock HTTP service for the kube client
//! and an in-memory `ClusterApi`.

use crate::error::{DeployError, Result as DeployResult};
use crate::kubernetes::ClusterApi;
use async_trait::async_trait;
use http::{Request, Response};
use k8s_openapi::api::batch::v1::{Job, JobCondition, JobStatus};
use k8s_openapi::api::core::v1::{ConfigMap, Event, ObjectReference, Secret};
use kube::client::Body;
use kube::{Client, ResourceExt};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses.lock().unwrap().insert(
            (method.to_string(), path.to_string()),
            (status, body.to_string()),
        );
        self
    }

    /// Add a response for GET requests matching the path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for DELETE requests matching the path
    pub fn on_delete(self, path: &str, status: u16, body: &str) -> Self {
        self.on("DELETE", path, status, body)
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        // Prefix match for collection paths
        for ((m, p), resp) in responses.iter() {
            if m == method && path.starts_with(p) {
                return Some(resp.clone());
            }
        }

        None
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        let (status, body) = self.find_response(&method, &path).unwrap_or_else(|| {
            let name = path.rsplit('/').next().unwrap_or_default();
            (404, not_found_json("resource", name))
        });

        Box::pin(async move {
            Ok(Response::builder()
                .status(status)
                .header("content-type", "application/json")
                .body(Body::from(body.into_bytes()))
                .unwrap())
        })
    }
}

/// A Job JSON document carrying a single true condition
pub fn job_json(name: &str, condition: &str) -> String {
    serde_json::json!({
        "apiVersion": "batch/v1",
        "kind": "Job",
        "metadata": {
            "name": name,
            "namespace": "test",
            "uid": "test-uid"
        },
        "status": {
            "conditions": [{"type": condition, "status": "True"}]
        }
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

/// How jobs created on a `FakeCluster` behave when polled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobBehavior {
    /// Reports `Complete` after the given number of polls
    CompleteAfter(usize),
    /// Reports `Failed` after the given number of polls
    FailAfter(usize),
    /// Stays active forever
    Hang,
}

#[derive(Default)]
struct FakeState {
    secrets: BTreeMap<String, Secret>,
    config_maps: BTreeMap<String, ConfigMap>,
    jobs: BTreeMap<String, Job>,
    polls: HashMap<String, usize>,
    calls: Vec<String>,
    failing: BTreeSet<String>,
    keep_deleted_jobs: bool,
}

/// In-memory `ClusterApi` that records every call
#[derive(Clone)]
pub struct FakeCluster {
    state: Arc<Mutex<FakeState>>,
    behavior: JobBehavior,
    logs: String,
}

impl FakeCluster {
    pub fn new(behavior: JobBehavior) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
            behavior,
            logs: "deploying...\ndone\n".to_string(),
        }
    }

    pub fn with_secret(self, secret: Secret) -> Self {
        self.state
            .lock()
            .unwrap()
            .secrets
            .insert(secret.name_any(), secret);
        self
    }

    pub fn with_job(self, job: Job) -> Self {
        self.state.lock().unwrap().jobs.insert(job.name_any(), job);
        self
    }

    /// Make every call to `operation` (e.g. `job_events`) fail with 403 Forbidden
    pub fn failing_on(self, operation: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing
            .insert(operation.to_string());
        self
    }

    /// Deleted Jobs stay visible, as if stuck on a finalizer
    pub fn keeping_deleted_jobs(self) -> Self {
        self.state.lock().unwrap().keep_deleted_jobs = true;
        self
    }

    pub fn secret(&self, name: &str) -> Option<Secret> {
        self.state.lock().unwrap().secrets.get(name).cloned()
    }

    pub fn config_map(&self, name: &str) -> Option<ConfigMap> {
        self.state.lock().unwrap().config_maps.get(name).cloned()
    }

    pub fn job(&self, name: &str) -> Option<Job> {
        self.state.lock().unwrap().jobs.get(name).cloned()
    }

    /// Calls in the order they were made, e.g. `create_job demo-hana-deployer`
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn check(&self, operation: &str) -> DeployResult<()> {
        if self.state.lock().unwrap().failing.contains(operation) {
            return Err(DeployError::KubeError(kube::Error::Api(
                kube::error::ErrorResponse {
                    status: "Failure".to_string(),
                    message: format!("{} is forbidden", operation),
                    reason: "Forbidden".to_string(),
                    code: 403,
                },
            )));
        }
        Ok(())
    }
}

/// A Job whose status carries one condition set to true, or none
pub fn job_with_condition(name: &str, condition: Option<&str>) -> Job {
    Job {
        metadata: kube::api::ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        status: Some(JobStatus {
            active: condition.is_none().then_some(1),
            conditions: condition.map(|c| {
                vec![JobCondition {
                    type_: c.to_string(),
                    status: "True".to_string(),
                    message: (c == "Failed").then(|| "BackoffLimitExceeded".to_string()),
                    ..Default::default()
                }]
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn get_secret(&self, _namespace: &str, name: &str) -> DeployResult<Option<Secret>> {
        self.record(format!("get_secret {}", name));
        Ok(self.secret(name))
    }

    async fn apply_secret(&self, _namespace: &str, secret: &Secret) -> DeployResult<()> {
        self.record(format!("apply_secret {}", secret.name_any()));
        self.state
            .lock()
            .unwrap()
            .secrets
            .insert(secret.name_any(), secret.clone());
        Ok(())
    }

    async fn delete_secret(&self, _namespace: &str, name: &str) -> DeployResult<bool> {
        self.record(format!("delete_secret {}", name));
        Ok(self.state.lock().unwrap().secrets.remove(name).is_some())
    }

    async fn apply_config_map(&self, _namespace: &str, config_map: &ConfigMap) -> DeployResult<()> {
        self.record(format!("apply_config_map {}", config_map.name_any()));
        self.state
            .lock()
            .unwrap()
            .config_maps
            .insert(config_map.name_any(), config_map.clone());
        Ok(())
    }

    async fn delete_config_map(&self, _namespace: &str, name: &str) -> DeployResult<bool> {
        self.record(format!("delete_config_map {}", name));
        Ok(self.state.lock().unwrap().config_maps.remove(name).is_some())
    }

    async fn get_job(&self, _namespace: &str, name: &str) -> DeployResult<Option<Job>> {
        self.check("get_job")?;
        let mut state = self.state.lock().unwrap();
        let Some(job) = state.jobs.get(name).cloned() else {
            return Ok(None);
        };
        let polls = state.polls.entry(name.to_string()).or_insert(0);
        *polls += 1;

        // Jobs seeded through `with_job` are returned as-is
        if job.status.is_some() {
            return Ok(Some(job));
        }

        let condition = match self.behavior {
            JobBehavior::CompleteAfter(n) if *polls > n => Some("Complete"),
            JobBehavior::FailAfter(n) if *polls > n => Some("Failed"),
            _ => None,
        };
        Ok(Some(job_with_condition(name, condition)))
    }

    async fn create_job(&self, _namespace: &str, job: &Job) -> DeployResult<()> {
        self.record(format!("create_job {}", job.name_any()));
        let mut state = self.state.lock().unwrap();
        state.polls.remove(&job.name_any());
        state.jobs.insert(job.name_any(), job.clone());
        Ok(())
    }

    async fn delete_job(&self, _namespace: &str, name: &str) -> DeployResult<bool> {
        self.record(format!("delete_job {}", name));
        let mut state = self.state.lock().unwrap();
        if state.keep_deleted_jobs {
            return Ok(state.jobs.contains_key(name));
        }
        Ok(state.jobs.remove(name).is_some())
    }

    async fn job_logs(&self, _namespace: &str, job_name: &str) -> DeployResult<String> {
        self.record(format!("job_logs {}", job_name));
        self.check("job_logs")?;
        Ok(self.logs.clone())
    }

    async fn job_events(&self, _namespace: &str, job_name: &str) -> DeployResult<Vec<Event>> {
        self.record(format!("job_events {}", job_name));
        self.check("job_events")?;
        Ok(vec![Event {
            type_: Some("Normal".to_string()),
            reason: Some("SuccessfulCreate".to_string()),
            message: Some(format!("Created pod: {}-abcde", job_name)),
            involved_object: ObjectReference {
                name: Some(job_name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }])
    }
}
