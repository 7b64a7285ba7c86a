//! YAML configuration for the sync controller.
//!
//! The configuration file declares which ConfigMaps to mirror (one entry per
//! job) and what to do with them: where to write the files, whether to
//! flatten the directory layout, which verification commands gate a write,
//! and which post-deploy commands run after a successful sync.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ControllerError;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Namespace to watch; empty means all accessible namespaces.
    #[serde(default)]
    pub namespace: String,

    /// Optional wall-clock bound in seconds for every verify and
    /// post-deploy command. Absent means commands may run indefinitely.
    #[serde(default, rename = "command-timeout")]
    pub command_timeout: Option<u64>,

    /// Sync jobs, evaluated in order against every change event.
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

/// One sync job: a selector plus the target layout and hooks.
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    /// Job name, used in logs only.
    pub name: String,

    /// Labels a ConfigMap must carry to be picked up by this job. All
    /// entries must match. An empty selector accepts any labeled ConfigMap.
    #[serde(default)]
    pub selector: BTreeMap<String, String>,

    /// Verification steps run against each data entry before registration.
    #[serde(default)]
    pub verify: Vec<VerifyStep>,

    /// Directory the ConfigMap data entries are written under.
    #[serde(rename = "target-dir")]
    pub target_dir: PathBuf,

    /// Colocate all files in one flat directory using composite filenames
    /// instead of nested namespace/name directories.
    #[serde(default)]
    pub flatten: bool,

    /// Commands run after each successful registration or removal.
    #[serde(default, rename = "post-deploy")]
    pub post_deploy: Vec<PostDeployAction>,
}

/// A single verification command template.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyStep {
    /// Step name, used in logs only.
    pub name: String,

    /// Argument list; every `%s` occurrence is replaced with the path of a
    /// temporary file holding one data entry's content. An empty list
    /// disables the step.
    #[serde(default)]
    pub cmd: Vec<String>,
}

/// A single post-deploy command.
#[derive(Debug, Clone, Deserialize)]
pub struct PostDeployAction {
    /// Action name, used in logs only.
    pub name: String,

    /// Argument list, run verbatim with no substitution.
    #[serde(default)]
    pub cmd: Vec<String>,
}

/// Reads and validates the YAML configuration file.
pub fn load(path: &Path) -> Result<Config, ControllerError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ControllerError::ConfigRead {
        path: path.to_path_buf(),
        source,
    })?;

    let config: Config =
        serde_yaml::from_str(&raw).map_err(|source| ControllerError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

    validate(&config)?;
    Ok(config)
}

/// Rejects configurations the controller cannot meaningfully run with.
fn validate(config: &Config) -> Result<(), ControllerError> {
    if config.jobs.is_empty() {
        return Err(ControllerError::InvalidConfig(
            "at least one job must be configured".to_string(),
        ));
    }

    for job in &config.jobs {
        if job.name.is_empty() {
            return Err(ControllerError::InvalidConfig(
                "every job needs a non-empty name".to_string(),
            ));
        }
        if job.target_dir.as_os_str().is_empty() {
            return Err(ControllerError::InvalidConfig(format!(
                "job `{}` has an empty target-dir",
                job.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_CONFIG: &str = r#"
namespace: monitoring
command-timeout: 30
jobs:
- name: prometheus-rules
  selector:
    type: prometheus-rules
  verify:
  - name: promtool check rules
    cmd: ["promtool", "check", "rules", "%s"]
  target-dir: /etc/prometheus-rules
  flatten: true
  post-deploy:
  - name: reload prometheus
    cmd: ["curl", "-XPOST", "http://localhost:9090/-/reload"]
"#;

    #[test]
    fn test_parse_full_config() {
        let config: Config = serde_yaml::from_str(FULL_CONFIG).expect("Failed to parse config");

        assert_eq!(config.namespace, "monitoring");
        assert_eq!(config.command_timeout, Some(30));
        assert_eq!(config.jobs.len(), 1);

        let job = &config.jobs[0];
        assert_eq!(job.name, "prometheus-rules");
        assert_eq!(job.selector.get("type").map(String::as_str), Some("prometheus-rules"));
        assert_eq!(job.target_dir, PathBuf::from("/etc/prometheus-rules"));
        assert!(job.flatten);
        assert_eq!(job.verify.len(), 1);
        assert_eq!(job.verify[0].cmd[3], "%s");
        assert_eq!(job.post_deploy.len(), 1);
        assert_eq!(job.post_deploy[0].name, "reload prometheus");
    }

    #[test]
    fn test_parse_defaults() {
        let config: Config = serde_yaml::from_str(
            "jobs:\n- name: minimal\n  target-dir: /out\n",
        )
        .expect("Failed to parse minimal config");

        assert_eq!(config.namespace, "");
        assert_eq!(config.command_timeout, None);
        let job = &config.jobs[0];
        assert!(job.selector.is_empty());
        assert!(job.verify.is_empty());
        assert!(job.post_deploy.is_empty());
        assert!(!job.flatten);
    }

    #[test]
    fn test_missing_target_dir_is_a_parse_error() {
        let result: Result<Config, _> = serde_yaml::from_str("jobs:\n- name: broken\n");
        assert!(result.is_err(), "target-dir is required");
    }

    #[test]
    fn test_validate_rejects_empty_job_list() {
        let config: Config = serde_yaml::from_str("namespace: ns\n").expect("Failed to parse");
        let result = validate(&config);
        assert!(matches!(result, Err(ControllerError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_empty_target_dir() {
        let config: Config = serde_yaml::from_str(
            "jobs:\n- name: broken\n  target-dir: \"\"\n",
        )
        .expect("Failed to parse");
        let result = validate(&config);
        assert!(matches!(result, Err(ControllerError::InvalidConfig(_))));
    }

    #[test]
    fn test_load_reads_file_and_validates() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, FULL_CONFIG).expect("Failed to write config");

        let config = load(&path).expect("Failed to load config");
        assert_eq!(config.jobs.len(), 1);

        let missing = load(&dir.path().join("nope.yaml"));
        assert!(matches!(missing, Err(ControllerError::ConfigRead { .. })));
    }
}
