// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! One deployment run: check, render, bridge credentials, apply and await.

use crate::bridge::materialize_binding;
use crate::config::DeployConfig;
use crate::constants::{labels, MANAGER_NAME};
use crate::deploy::wait::{await_job, await_job_deleted, JobOutcome};
use crate::error::{DeployError, Result};
use crate::kubernetes::{describe_job, ClusterApi, JobState};
use crate::manifest::ManifestSet;
use crate::preflight::check_preconditions;
use crate::types::{DeploymentDescriptor, DeploymentTarget, RunState};
use std::io::Write;
use tracing::{debug, info, instrument, warn};

/// Drives a single target through `CHECKED -> RENDERED -> APPLIED -> terminal`.
/// Job logs and diagnostics go to `out`; progress goes to tracing.
pub struct Deployment<'a, C: ClusterApi + ?Sized, W: Write> {
    cluster: &'a C,
    config: &'a DeployConfig,
    descriptor: DeploymentDescriptor,
    state: RunState,
    out: W,
}

impl<'a, C: ClusterApi + ?Sized, W: Write> Deployment<'a, C, W> {
    pub fn new(cluster: &'a C, config: &'a DeployConfig, target: DeploymentTarget, out: W) -> Self {
        Self {
            cluster,
            config,
            descriptor: config.descriptor(target),
            state: RunState::Pending,
            out,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn into_output(self) -> W {
        self.out
    }

    fn advance(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!("{}: {:?} -> {:?}", self.descriptor.target, self.state, next);
        self.state = next;
    }

    fn emit(&mut self, text: &str) -> Result<()> {
        self.out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.flush())
            .map_err(|e| DeployError::io("<output>", e))
    }

    /// Run the full pipeline. Any stage failure aborts the run; nothing is rolled back.
    #[instrument(skip(self), fields(target = %self.descriptor.target, app = %self.descriptor.app_name, namespace = %self.descriptor.namespace))]
    pub async fn run(&mut self) -> Result<()> {
        check_preconditions(
            &self.descriptor,
            &self.config.required_tools,
            self.config.strict_artifacts,
        )?;
        self.advance(RunState::Checked);

        let manifests = ManifestSet::render(&self.descriptor)?;
        manifests.write_to(self.descriptor.target, &self.config.manifest_dir)?;
        self.advance(RunState::Rendered);

        materialize_binding(self.cluster, &self.descriptor).await?;
        self.apply(&manifests).await?;
        self.advance(RunState::Applied);

        self.await_completion().await
    }

    async fn apply(&mut self, manifests: &ManifestSet) -> Result<()> {
        let namespace = self.descriptor.namespace.clone();
        let job_name = self.descriptor.job_name();

        self.replace_previous_job(&namespace, &job_name).await?;

        if let Some(config_map) = &manifests.config_map {
            self.cluster.apply_config_map(&namespace, config_map).await?;
        }
        self.cluster.create_job(&namespace, &manifests.job).await?;
        Ok(())
    }

    /// Jobs are immutable, so a finished Job with the same name is removed first.
    /// A Job that is still running belongs to another run and is left alone.
    async fn replace_previous_job(&self, namespace: &str, job_name: &str) -> Result<()> {
        let existing = self.cluster.get_job(namespace, job_name).await?;
        match JobState::of(existing.as_ref()) {
            JobState::NotFound => Ok(()),
            state if state.is_finished() => {
                info!("Removing previous Job {}/{}", namespace, job_name);
                self.cluster.delete_job(namespace, job_name).await?;
                await_job_deleted(
                    self.cluster,
                    namespace,
                    job_name,
                    self.config.delete_timeout,
                    self.config.poll_interval,
                )
                .await
            }
            _ => Err(DeployError::DeploymentInProgress(format!(
                "{}/{}",
                namespace, job_name
            ))),
        }
    }

    async fn await_completion(&mut self) -> Result<()> {
        let namespace = self.descriptor.namespace.clone();
        let job_name = self.descriptor.job_name();
        let limit = self.config.timeout_for(self.descriptor.target);

        let outcome = await_job(
            self.cluster,
            &namespace,
            &job_name,
            limit,
            self.config.poll_interval,
        )
        .await;

        match outcome {
            JobOutcome::Complete => {
                self.advance(RunState::Complete);
                info!("Job {}/{} completed", namespace, job_name);
                self.print_logs().await
            }
            JobOutcome::Failed(reason) => {
                self.advance(RunState::Failed);
                warn!("Job {}/{} failed: {}", namespace, job_name, reason);
                self.print_diagnostics().await;
                Err(DeployError::JobFailed {
                    job: job_name,
                    reason,
                })
            }
            JobOutcome::TimedOut => {
                self.advance(RunState::TimedOut);
                warn!(
                    "Job {}/{} did not finish within {}s",
                    namespace,
                    job_name,
                    limit.as_secs()
                );
                self.print_diagnostics().await;
                Err(DeployError::JobTimedOut {
                    job: job_name,
                    secs: limit.as_secs(),
                })
            }
        }
    }

    /// Print the Job's pod logs
    pub async fn print_logs(&mut self) -> Result<()> {
        let logs = self
            .cluster
            .job_logs(&self.descriptor.namespace, &self.descriptor.job_name())
            .await?;
        self.emit(&format!("--- Logs of Job {} ---\n", self.descriptor.job_name()))?;
        self.emit(&logs)
    }

    /// Print Job status, events and logs. Lookups that fail are noted inline,
    /// so the run still reports its own terminal error.
    async fn print_diagnostics(&mut self) {
        let namespace = self.descriptor.namespace.clone();
        let job_name = self.descriptor.job_name();

        let job = self.cluster.get_job(&namespace, &job_name).await;
        let events = self.cluster.job_events(&namespace, &job_name).await;
        let description = describe_job(
            &job_name,
            job.as_ref().map(Option::as_ref).map_err(|e| e.to_string()),
            events.as_deref().map_err(|e| e.to_string()),
        );
        let logs = match self.cluster.job_logs(&namespace, &job_name).await {
            Ok(logs) => logs,
            Err(e) => format!("<unavailable: {}>\n", e),
        };

        let text = format!(
            "--- Job {} ---\n{}--- Logs of Job {} ---\n{}",
            job_name, description, job_name, logs
        );
        if let Err(e) = self.emit(&text) {
            warn!("Could not print diagnostics for Job {}: {}", job_name, e);
        }
    }

    /// Delete everything a run creates. Missing objects are ignored, so this is idempotent.
    #[instrument(skip(self), fields(target = %self.descriptor.target, namespace = %self.descriptor.namespace))]
    pub async fn cleanup(&mut self) -> Result<()> {
        let namespace = self.descriptor.namespace.clone();
        let job_name = self.descriptor.job_name();

        let mut removed = Vec::new();
        if self.cluster.delete_job(&namespace, &job_name).await? {
            removed.push(format!("job/{}", job_name));
        }
        if let Some(cm) = self.descriptor.config_map_name() {
            if self.cluster.delete_config_map(&namespace, &cm).await? {
                removed.push(format!("configmap/{}", cm));
            }
        }

        // Only binding secrets this tool created; a hand-made one stays
        let binding = self.descriptor.binding_secret_name();
        let managed = self
            .cluster
            .get_secret(&namespace, &binding)
            .await?
            .and_then(|s| s.metadata.labels)
            .and_then(|l| l.get(labels::MANAGED_BY).cloned())
            .is_some_and(|v| v == MANAGER_NAME);
        if managed && self.cluster.delete_secret(&namespace, &binding).await? {
            removed.push(format!("secret/{}", binding));
        }

        if removed.is_empty() {
            info!("Nothing to clean up in {}", namespace);
        } else {
            info!("Removed {} from {}", removed.join(", "), namespace);
        }
        Ok(())
    }
}
