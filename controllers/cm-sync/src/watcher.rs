//! ConfigMap watch loop.
//!
//! Pulls change events from a single watch stream and feeds them to the
//! reconciler one at a time; an event is fully processed across all jobs
//! before the next one is read. Error policy lives here: stream errors and
//! filesystem I/O errors end the loop, anything the reconciler already
//! downgraded never reaches it.

use futures::TryStreamExt;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::Api;
use kube_runtime::watcher;
use tracing::{debug, error, info, warn};

use crate::error::ControllerError;
use crate::reconciler::{EventKind, Reconciler};

/// Watches ConfigMaps and drives the reconciler.
pub struct Watcher {
    api: Api<ConfigMap>,
    reconciler: Reconciler,
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(api: Api<ConfigMap>, reconciler: Reconciler) -> Self {
        Self { api, reconciler }
    }

    /// Runs the watch loop until the stream fails or a reconciliation error
    /// is judged fatal.
    pub async fn watch_configmaps(&self) -> Result<(), ControllerError> {
        info!("Starting ConfigMap watcher");

        let mut stream = Box::pin(watcher(self.api.clone(), watcher::Config::default()));

        while let Some(event) = stream
            .try_next()
            .await
            .map_err(|e| ControllerError::Watch(format!("watch stream error: {e}")))?
        {
            match event {
                watcher::Event::Apply(cm) | watcher::Event::InitApply(cm) => {
                    self.dispatch(EventKind::Applied, &cm).await?;
                }
                watcher::Event::Delete(cm) => {
                    self.dispatch(EventKind::Deleted, &cm).await?;
                }
                watcher::Event::Init => {
                    debug!("ConfigMap watcher initializing");
                }
                watcher::Event::InitDone => {
                    info!("ConfigMap watcher initialization complete");
                }
            }
        }

        Ok(())
    }

    /// Hands one event to the reconciler and applies the error policy.
    async fn dispatch(&self, kind: EventKind, cm: &ConfigMap) -> Result<(), ControllerError> {
        let name = cm.metadata.name.as_deref().unwrap_or("<unknown>");
        let namespace = cm.metadata.namespace.as_deref().unwrap_or("default");
        debug!("ConfigMap {}/{} {}", namespace, name, kind);

        match self.reconciler.reconcile(kind, cm).await {
            Ok(outcomes) => {
                debug!(
                    "Processed ConfigMap {}/{} across {} job(s)",
                    namespace,
                    name,
                    outcomes.len()
                );
                Ok(())
            }
            Err(err) if err.is_fatal() => {
                if let ControllerError::FileStore(store_err) = &err {
                    error!(
                        "Failed to sync ConfigMap {}/{} ({} file(s) completed before the error): {}",
                        namespace,
                        name,
                        store_err.completed().len(),
                        store_err
                    );
                } else {
                    error!("Failed to process ConfigMap {}/{}: {}", namespace, name, err);
                }
                Err(err)
            }
            Err(err) => {
                warn!(
                    "Recoverable error while processing ConfigMap {}/{}: {}",
                    namespace, name, err
                );
                Ok(())
            }
        }
    }
}
