// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes access: the cluster collaborator and Job status helpers.

pub mod cluster;
pub mod jobs;

pub use cluster::{ClusterApi, KubeCluster};
pub use jobs::{describe_job, JobState};
