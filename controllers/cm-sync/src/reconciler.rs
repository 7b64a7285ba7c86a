//! Reconciliation logic for ConfigMap sync jobs.
//!
//! One change event is evaluated against every configured job, in order.
//! Per job the decision is: removal candidate (delete event or selector
//! mismatch), verify-then-register, or skip. Jobs are independent; a job's
//! outcome never feeds into another job's decision for the same event, and
//! work completed by earlier jobs is kept when a later job fails.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use filestore::FileStore;
use k8s_openapi::api::core::v1::ConfigMap;
use tracing::{debug, info, warn};

use crate::actions::ActionRunner;
use crate::config::{Config, JobConfig};
use crate::error::ControllerError;
use crate::selector;
use crate::verify::Verifier;

/// The two event shapes the watch stream delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// The ConfigMap was added or modified
    Applied,
    /// The ConfigMap was deleted from its namespace
    Deleted,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => f.write_str("applied"),
            Self::Deleted => f.write_str("deleted"),
        }
    }
}

/// Terminal outcome of evaluating one (job, event) pair.
#[derive(Debug, PartialEq, Eq)]
pub enum JobOutcome {
    /// All data entries were written under the job's target directory
    Registered(Vec<PathBuf>),
    /// Previously registered files were removed
    Removed(Vec<PathBuf>),
    /// The ConfigMap is of no interest to this job and nothing was on disk
    Skipped,
    /// A verify step rejected the ConfigMap; files on disk were left as-is
    SkippedInvalid,
}

/// One configured job together with its filesystem projection.
struct JobContext {
    config: JobConfig,
    store: FileStore,
}

/// Drives Verify, Register, and post-deploy actions per job per event.
///
/// All collaborators are injected at construction; nothing here touches
/// process-global state or terminates the process.
pub struct Reconciler {
    jobs: Vec<JobContext>,
    verifier: Verifier,
    runner: ActionRunner,
}

impl Reconciler {
    /// Builds a reconciler from the loaded configuration.
    pub fn new(config: &Config) -> Self {
        let timeout = config.command_timeout.map(Duration::from_secs);

        let jobs = config
            .jobs
            .iter()
            .cloned()
            .map(|config| {
                let store = FileStore::new(&config.target_dir, config.flatten);
                JobContext { config, store }
            })
            .collect();

        Self {
            jobs,
            verifier: Verifier::new(timeout),
            runner: ActionRunner::new(timeout),
        }
    }

    /// Evaluates one change event against every configured job, in order,
    /// and returns the per-job outcomes.
    ///
    /// Verification failures and post-deploy failures are handled (and
    /// logged) in place; only filesystem registration/removal errors
    /// propagate, and the caller decides whether they end the process.
    pub async fn reconcile(
        &self,
        event: EventKind,
        cm: &ConfigMap,
    ) -> Result<Vec<JobOutcome>, ControllerError> {
        let name = cm.metadata.name.as_deref().unwrap_or("<unknown>");
        let namespace = cm.metadata.namespace.as_deref().unwrap_or("default");

        let mut outcomes = Vec::with_capacity(self.jobs.len());
        for job in &self.jobs {
            let outcome = self.reconcile_job(job, event, cm, namespace, name).await?;
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// Applies the per-job state machine to one event.
    async fn reconcile_job(
        &self,
        job: &JobContext,
        event: EventKind,
        cm: &ConfigMap,
        namespace: &str,
        name: &str,
    ) -> Result<JobOutcome, ControllerError> {
        let empty = BTreeMap::new();
        let data = cm.data.as_ref().unwrap_or(&empty);
        let labels = cm.metadata.labels.as_ref().unwrap_or(&empty);

        // A deletion and a selector mismatch are the same case: the
        // ConfigMap must not (or no longer) be present on disk for this job.
        if event == EventKind::Deleted || !selector::matches(&job.config.selector, labels) {
            return self
                .remove_if_registered(job, event, namespace, name, data)
                .await;
        }

        info!(
            "Job {}: ConfigMap {}/{} matches selector ({event})",
            job.config.name, namespace, name
        );

        if !job.config.verify.is_empty() {
            debug!(
                "Job {}: verifying {} data entr(ies) of ConfigMap {}/{}",
                job.config.name,
                data.len(),
                namespace,
                name
            );

            match self.verifier.verify(data, &job.config.verify).await {
                Ok(verified) => {
                    debug!(
                        "Job {}: successfully verified ConfigMap {}/{}: {:?}",
                        job.config.name, namespace, name, verified
                    );
                }
                Err(err) => {
                    // Existing registered files stay untouched, even if they
                    // are now stale relative to the cluster.
                    warn!(
                        "Job {}: ConfigMap {}/{} failed verification, skipping (verified so far: {:?}): {}",
                        job.config.name,
                        namespace,
                        name,
                        err.partial(),
                        err
                    );
                    return Ok(JobOutcome::SkippedInvalid);
                }
            }
        }

        let written = job.store.register(namespace, name, data)?;
        info!(
            "Job {}: registered ConfigMap {}/{} ({} file(s))",
            job.config.name,
            namespace,
            name,
            written.len()
        );

        self.run_post_deploy(job, namespace, name).await;
        Ok(JobOutcome::Registered(written))
    }

    /// Removal path: delete the job's files for this ConfigMap if any exist.
    async fn remove_if_registered(
        &self,
        job: &JobContext,
        event: EventKind,
        namespace: &str,
        name: &str,
        data: &BTreeMap<String, String>,
    ) -> Result<JobOutcome, ControllerError> {
        if !job.store.is_registered(namespace, name, data) {
            debug!(
                "Job {}: ConfigMap {}/{} does not apply and is not registered, skipping ({event})",
                job.config.name, namespace, name
            );
            return Ok(JobOutcome::Skipped);
        }

        info!(
            "Job {}: ConfigMap {}/{} no longer applies ({event}), removing registered files",
            job.config.name, namespace, name
        );

        let removed = job.store.remove(namespace, name, data)?;
        info!(
            "Job {}: removed {} file(s) of ConfigMap {}/{}",
            job.config.name,
            removed.len(),
            namespace,
            name
        );

        self.run_post_deploy(job, namespace, name).await;
        Ok(JobOutcome::Removed(removed))
    }

    /// Runs every post-deploy action of the job. Failures are logged and do
    /// not affect the registration or removal that already happened.
    async fn run_post_deploy(&self, job: &JobContext, namespace: &str, name: &str) {
        for action in &job.config.post_deploy {
            match self.runner.run(action).await {
                Ok(output) => debug!(
                    "Job {}: post-deploy action `{}` after ConfigMap {}/{} succeeded: {}",
                    job.config.name, action.name, namespace, name, output
                ),
                Err(err) => warn!(
                    "Job {}: post-deploy action `{}` after ConfigMap {}/{} failed: {}",
                    job.config.name, action.name, namespace, name, err
                ),
            }
        }
    }
}
