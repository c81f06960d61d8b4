// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod bridge;
pub mod config;
pub mod constants;
pub mod deploy;
pub mod error;
pub mod kubernetes;
pub mod manifest;
pub mod preflight;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;
