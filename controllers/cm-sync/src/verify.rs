//! Content verification.
//!
//! Before a matching ConfigMap is written to disk, each of its data entries
//! can be checked by user-defined commands. The entry content is staged into
//! a temporary file whose path is substituted into the command template; a
//! single rejection aborts the whole verification. A partially verified
//! ConfigMap is never registered.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::config::VerifyStep;
use crate::exec;

/// Placeholder token replaced with the staged file's path in verify commands.
const PLACEHOLDER: &str = "%s";

/// Why a verification attempt failed.
///
/// Every variant carries the per-entry outputs accumulated before the
/// failure, so callers can log the partial result.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// A step's command exited non-zero for an entry
    #[error("step `{step}` rejected entry `{entry}`: {output}")]
    Rejected {
        /// The failing step's name
        step: String,
        /// The data entry being checked
        entry: String,
        /// The failing command's combined output
        output: String,
        /// Entries verified before the rejection
        verified: BTreeMap<String, String>,
    },

    /// An entry could not be staged into a temporary file
    #[error("failed to stage entry `{entry}` for step `{step}`: {source}")]
    Stage {
        /// The step that was about to run
        step: String,
        /// The data entry being staged
        entry: String,
        /// The underlying I/O error
        source: std::io::Error,
        /// Entries verified before the failure
        verified: BTreeMap<String, String>,
    },

    /// A step's command could not be executed at all
    #[error("step `{step}` failed to run for entry `{entry}`: {source}")]
    Exec {
        /// The failing step's name
        step: String,
        /// The data entry being checked
        entry: String,
        /// The spawn failure or timeout
        source: exec::ExecError,
        /// Entries verified before the failure
        verified: BTreeMap<String, String>,
    },
}

impl VerifyError {
    /// Per-entry outputs accumulated before the failure.
    pub fn partial(&self) -> &BTreeMap<String, String> {
        match self {
            Self::Rejected { verified, .. }
            | Self::Stage { verified, .. }
            | Self::Exec { verified, .. } => verified,
        }
    }
}

/// Runs a job's verify steps against ConfigMap data entries.
#[derive(Debug)]
pub struct Verifier {
    timeout: Option<Duration>,
}

impl Verifier {
    /// Creates a verifier; `timeout` bounds each individual command.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Checks every data entry against every step, failing fast.
    ///
    /// Steps with an empty command are skipped. The staged temporary file is
    /// deleted on drop, on every exit path. On success the returned map
    /// holds the last command output per entry.
    pub async fn verify(
        &self,
        data: &BTreeMap<String, String>,
        steps: &[VerifyStep],
    ) -> Result<BTreeMap<String, String>, VerifyError> {
        let mut verified = BTreeMap::new();

        for (entry, contents) in data {
            for step in steps {
                if step.cmd.is_empty() {
                    continue;
                }

                let staged = stage_entry(entry, contents).map_err(|source| VerifyError::Stage {
                    step: step.name.clone(),
                    entry: entry.clone(),
                    source,
                    verified: verified.clone(),
                })?;

                let argv = substitute(&step.cmd, staged.path());
                let result =
                    exec::run(&argv, self.timeout)
                        .await
                        .map_err(|source| VerifyError::Exec {
                            step: step.name.clone(),
                            entry: entry.clone(),
                            source,
                            verified: verified.clone(),
                        })?;

                if !result.success {
                    return Err(VerifyError::Rejected {
                        step: step.name.clone(),
                        entry: entry.clone(),
                        output: result.output,
                        verified,
                    });
                }

                verified.insert(entry.clone(), result.output);
            }
        }

        Ok(verified)
    }
}

/// Writes one entry's content to a temporary file for checking.
fn stage_entry(entry: &str, contents: &str) -> std::io::Result<NamedTempFile> {
    let mut staged = tempfile::Builder::new()
        .prefix(&format!("cm-sync-{entry}-"))
        .tempfile()?;
    staged.write_all(contents.as_bytes())?;
    staged.flush()?;
    Ok(staged)
}

/// Replaces every placeholder occurrence in the template with the staged
/// file's path.
fn substitute(cmd: &[String], staged: &Path) -> Vec<String> {
    let path = staged.to_string_lossy();
    cmd.iter()
        .map(|arg| {
            if arg.contains(PLACEHOLDER) {
                arg.replace(PLACEHOLDER, &path)
            } else {
                arg.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::verify_step;

    fn data(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_successful_step_records_output_per_entry() {
        let verifier = Verifier::new(None);
        let data = data(&[("a.yml", "x: 1")]);
        let steps = vec![verify_step("cat entry", &["cat", "%s"])];

        let verified = verifier.verify(&data, &steps).await.expect("Verification failed");

        assert_eq!(verified.get("a.yml").map(String::as_str), Some("x: 1"));
    }

    #[tokio::test]
    async fn test_placeholder_is_substituted_everywhere() {
        let verifier = Verifier::new(None);
        let data = data(&[("a.yml", "content")]);
        // Both arguments reference the staged file; cmp succeeds only if the
        // substitution happened in each of them.
        let steps = vec![verify_step("self cmp", &["cmp", "%s", "%s"])];

        let result = verifier.verify(&data, &steps).await;
        assert!(result.is_ok(), "cmp of the staged file against itself failed");
    }

    #[tokio::test]
    async fn test_rejection_aborts_before_later_steps() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let marker = dir.path().join("marker");

        let verifier = Verifier::new(None);
        let data = data(&[("a.yml", "x: 1")]);
        let marker_arg = marker.to_string_lossy();
        let steps = vec![
            verify_step("always fails", &["false"]),
            verify_step("leaves a marker", &["touch", marker_arg.as_ref()]),
        ];

        let err = verifier
            .verify(&data, &steps)
            .await
            .expect_err("Verification must fail");

        assert!(matches!(&err, VerifyError::Rejected { step, .. } if step == "always fails"));
        assert!(err.partial().is_empty());
        assert!(!marker.exists(), "Later steps must not run after a rejection");
    }

    #[tokio::test]
    async fn test_partial_results_survive_a_late_rejection() {
        let verifier = Verifier::new(None);
        // BTreeMap iterates entries in key order: "good" passes, "zbad" fails.
        let data = data(&[("good", "ok"), ("zbad", "broken")]);
        let steps = vec![verify_step("expect ok", &["grep", "ok", "%s"])];

        let err = verifier
            .verify(&data, &steps)
            .await
            .expect_err("Verification must fail");

        assert!(matches!(&err, VerifyError::Rejected { entry, .. } if entry == "zbad"));
        assert_eq!(err.partial().len(), 1);
        assert!(err.partial().contains_key("good"));
    }

    #[tokio::test]
    async fn test_steps_with_empty_command_are_skipped() {
        let verifier = Verifier::new(None);
        let data = data(&[("a.yml", "x: 1")]);
        let steps = vec![verify_step("disabled", &[])];

        let verified = verifier.verify(&data, &steps).await.expect("Verification failed");
        assert!(verified.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_program_is_an_exec_error() {
        let verifier = Verifier::new(None);
        let data = data(&[("a.yml", "x: 1")]);
        let steps = vec![verify_step("broken", &["/nonexistent/checker", "%s"])];

        let err = verifier
            .verify(&data, &steps)
            .await
            .expect_err("Verification must fail");
        assert!(matches!(err, VerifyError::Exec { .. }));
    }

    #[tokio::test]
    async fn test_timeout_counts_as_verification_failure() {
        let verifier = Verifier::new(Some(Duration::from_millis(100)));
        let data = data(&[("a.yml", "x: 1")]);
        let steps = vec![verify_step("hangs", &["sleep", "30"])];

        let err = verifier
            .verify(&data, &steps)
            .await
            .expect_err("Verification must time out");
        assert!(matches!(
            err,
            VerifyError::Exec {
                source: exec::ExecError::TimedOut { .. },
                ..
            }
        ));
    }
}
