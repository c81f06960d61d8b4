// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Bounded polling of Job status

use crate::error::{DeployError, Result};
use crate::kubernetes::{ClusterApi, JobState};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// How a run's Job ended, as observed by the poller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Complete,
    Failed(String),
    TimedOut,
}

/// Poll a Job until it finishes or `limit` elapses. Never retries the Job itself.
pub async fn await_job<C: ClusterApi + ?Sized>(
    cluster: &C,
    namespace: &str,
    name: &str,
    limit: Duration,
    interval: Duration,
) -> JobOutcome {
    info!(
        "Waiting up to {}s for Job {}/{} to finish...",
        limit.as_secs(),
        namespace,
        name
    );

    timeout(limit, poll_until_finished(cluster, namespace, name, interval))
        .await
        .unwrap_or(JobOutcome::TimedOut)
}

async fn poll_until_finished<C: ClusterApi + ?Sized>(
    cluster: &C,
    namespace: &str,
    name: &str,
    interval: Duration,
) -> JobOutcome {
    loop {
        // The Job is already applied, so a failed lookup is retried until the limit
        let job = match cluster.get_job(namespace, name).await {
            Ok(job) => job,
            Err(e) => {
                warn!("Could not read Job {}/{}: {}", namespace, name, e);
                sleep(interval).await;
                continue;
            }
        };
        match JobState::of(job.as_ref()) {
            JobState::Succeeded => return JobOutcome::Complete,
            JobState::Failed(reason) => return JobOutcome::Failed(reason),
            JobState::NotFound => {
                return JobOutcome::Failed(format!(
                    "Job {}/{} disappeared while waiting",
                    namespace, name
                ))
            }
            JobState::Active => {
                debug!("Job {}/{} still running", namespace, name);
            }
        }
        sleep(interval).await;
    }
}

/// Wait for a deleted Job to be garbage collected so its name can be reused
pub async fn await_job_deleted<C: ClusterApi + ?Sized>(
    cluster: &C,
    namespace: &str,
    name: &str,
    limit: Duration,
    interval: Duration,
) -> Result<()> {
    let gone = async {
        loop {
            match cluster.get_job(namespace, name).await {
                Ok(None) => return Ok(()),
                Ok(Some(_)) => debug!("Job {}/{} still terminating", namespace, name),
                Err(e) => return Err(e),
            }
            sleep(interval).await;
        }
    };

    timeout(limit, gone)
        .await
        .map_err(|_| DeployError::PreviousJobNotDeleted {
            job: name.to_string(),
            secs: limit.as_secs(),
        })?
}
