// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Deployment descriptor and run state types.

pub mod descriptor;

pub use descriptor::{DeploymentDescriptor, DeploymentTarget, RunState};
