// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Job status classification and diagnostic formatting

use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Event;
use kube::runtime::wait::{conditions, Condition};
use std::fmt::Write;

/// Observed state of a deployer Job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    NotFound,
    Active,
    Succeeded,
    Failed(String),
}

impl JobState {
    /// Classify a Job from its status conditions.
    /// The Job controller only sets `Failed` once the retry budget is exhausted.
    pub fn of(job: Option<&Job>) -> Self {
        let Some(job) = job else {
            return JobState::NotFound;
        };

        if conditions::is_job_completed().matches_object(Some(job)) {
            return JobState::Succeeded;
        }

        let failed = job
            .status
            .as_ref()
            .and_then(|s| s.conditions.as_ref())
            .and_then(|conds| {
                conds
                    .iter()
                    .find(|c| c.type_ == "Failed" && c.status == "True")
            });

        match failed {
            Some(c) => JobState::Failed(
                c.message
                    .clone()
                    .or_else(|| c.reason.clone())
                    .unwrap_or_else(|| "Job failed".to_string()),
            ),
            None => JobState::Active,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed(_))
    }
}

/// Render a `kubectl describe`-like summary of a Job and its events.
/// A lookup that failed is shown inline as `<unavailable: ...>`.
pub fn describe_job(
    name: &str,
    job: Result<Option<&Job>, String>,
    events: Result<&[Event], String>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Name:      {}", name);

    match job {
        Err(e) => {
            let _ = writeln!(out, "Status:    <unavailable: {}>", e);
        }
        Ok(None) => {
            let _ = writeln!(out, "Status:    <not found>");
        }
        Ok(Some(job)) => {
            let status = job.status.clone().unwrap_or_default();
            let _ = writeln!(
                out,
                "Pods:      {} active / {} succeeded / {} failed",
                status.active.unwrap_or(0),
                status.succeeded.unwrap_or(0),
                status.failed.unwrap_or(0)
            );
            if let Some(limit) = job.spec.as_ref().and_then(|s| s.backoff_limit) {
                let _ = writeln!(out, "Backoff:   {}", limit);
            }
            let _ = writeln!(out, "Conditions:");
            for c in status.conditions.unwrap_or_default() {
                let _ = writeln!(
                    out,
                    "  {}={} {} {}",
                    c.type_,
                    c.status,
                    c.reason.unwrap_or_default(),
                    c.message.unwrap_or_default()
                );
            }
        }
    }

    let events = match events {
        Ok(events) => events,
        Err(e) => {
            let _ = writeln!(out, "Events:    <unavailable: {}>", e);
            return out;
        }
    };
    let _ = writeln!(out, "Events:");
    if events.is_empty() {
        let _ = writeln!(out, "  <none>");
    }
    for e in events {
        let _ = writeln!(
            out,
            "  {} {} {}: {}",
            e.type_.as_deref().unwrap_or("Normal"),
            e.involved_object.name.as_deref().unwrap_or("-"),
            e.reason.as_deref().unwrap_or("-"),
            e.message.as_deref().unwrap_or("")
        );
    }

    out
}
