// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Apply & await orchestration.

pub mod pipeline;
pub mod wait;

pub use pipeline::Deployment;
pub use wait::{await_job, JobOutcome};
