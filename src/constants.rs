// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// The tool name, used as server-side apply field manager and managed-by label
pub const MANAGER_NAME: &str = "capdeploy";

/// Defaults applied when neither a flag nor an environment variable is given
pub mod defaults {
    pub const APP_NAME: &str = "bookshop";
    pub const NAMESPACE: &str = "default";
    pub const POLICIES_DIR: &str = "gen/policies";
    pub const DB_DIR: &str = "gen/db";
    pub const MANIFEST_DIR: &str = ".";
    pub const AMS_DEPLOYER_IMAGE: &str = "node:20-slim";
    pub const HANA_DEPLOYER_IMAGE: &str = "bookshop-hana-deployer:latest";
}

/// Kubernetes label keys put on every generated object
pub mod labels {
    pub const NAME: &str = "app.kubernetes.io/name";
    pub const MANAGED_BY: &str = "app.kubernetes.io/managed-by";
    pub const COMPONENT: &str = "app.kubernetes.io/component";
    /// Set by the Job controller on the pods it creates
    pub const JOB_NAME: &str = "job-name";
}

/// Job execution parameters
pub mod job {
    /// Retry budget handed to the Job controller
    pub const BACKOFF_LIMIT: i32 = 2;
    pub const AMS_TIMEOUT_SECS: u64 = 300;
    pub const HANA_TIMEOUT_SECS: u64 = 600;
    pub const POLL_INTERVAL_SECS: u64 = 5;
    /// Upper bound on waiting for a previous Job to be garbage collected
    pub const DELETE_TIMEOUT_SECS: u64 = 60;
}

/// Artifact file layout produced by the upstream build step
pub mod artifacts {
    /// (ConfigMap key, path relative to the policies directory)
    pub const AMS_FILES: [(&str, &str); 3] = [
        ("package.json", "package.json"),
        ("basePolicies.dcl", "dcl/cap/basePolicies.dcl"),
        ("schema.dcl", "dcl/schema.dcl"),
    ];
    /// Files the HDI deployer expects but can run without
    pub const HDI_EXPECTED_FILES: [&str; 2] = ["package.json", "src/.hdiconfig"];
}

/// Names of the rendered manifest files
pub mod files {
    pub const AMS_CONFIGMAP: &str = "ams-policies-configmap.yaml";
    pub const AMS_JOB: &str = "ams-policies-job.yaml";
    pub const HANA_JOB: &str = "hana-deployer-job.yaml";
}

/// Environment variable the deployer tools read their bindings from
pub const VCAP_SERVICES: &str = "VCAP_SERVICES";
