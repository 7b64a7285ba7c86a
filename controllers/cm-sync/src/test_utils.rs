//! Test utilities for unit testing the reconciler.
//!
//! This module provides helpers for building ConfigMap fixtures and job
//! configurations.

use std::collections::BTreeMap;
use std::path::Path;

use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::config::{JobConfig, PostDeployAction, VerifyStep};

fn string_map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

/// Helper to create a test ConfigMap with the given identity, labels, and
/// data entries.
pub fn configmap(
    namespace: &str,
    name: &str,
    labels: &[(&str, &str)],
    data: &[(&str, &str)],
) -> ConfigMap {
    let labels = string_map(labels);
    let data = string_map(data);

    ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: if labels.is_empty() { None } else { Some(labels) },
            ..Default::default()
        },
        data: if data.is_empty() { None } else { Some(data) },
        ..Default::default()
    }
}

/// Helper to create a test job with no verify steps and no post-deploy
/// actions.
pub fn job(name: &str, selector: &[(&str, &str)], target_dir: &Path, flatten: bool) -> JobConfig {
    JobConfig {
        name: name.to_string(),
        selector: string_map(selector),
        verify: Vec::new(),
        target_dir: target_dir.to_path_buf(),
        flatten,
        post_deploy: Vec::new(),
    }
}

/// Helper to create a verify step from string literals.
pub fn verify_step(name: &str, cmd: &[&str]) -> VerifyStep {
    VerifyStep {
        name: name.to_string(),
        cmd: cmd.iter().map(|c| (*c).to_string()).collect(),
    }
}

/// Helper to create a post-deploy action from string literals.
pub fn post_deploy_action(name: &str, cmd: &[&str]) -> PostDeployAction {
    PostDeployAction {
        name: name.to_string(),
        cmd: cmd.iter().map(|c| (*c).to_string()).collect(),
    }
}
