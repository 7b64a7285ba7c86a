//! Main controller implementation.
//!
//! Builds the Kubernetes client, validates connectivity at startup, and
//! wires the reconciler to the ConfigMap watch loop.

use std::path::Path;

use k8s_openapi::api::core::v1::ConfigMap;
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::watcher::Watcher;

/// Main controller for ConfigMap filesystem sync.
pub struct Controller {
    watcher: Watcher,
    namespace: String,
}

impl Controller {
    /// Creates a new controller instance.
    ///
    /// With an explicit kubeconfig path the client is built from that file;
    /// otherwise the default chain applies (in-cluster environment, then
    /// the usual kubeconfig locations).
    pub async fn new(config: Config, kubeconfig: Option<&Path>) -> Result<Self, ControllerError> {
        let client = match kubeconfig {
            Some(path) => {
                debug!("Loading kubeconfig from {}", path.display());
                let kubeconfig = Kubeconfig::read_from(path)?;
                let client_config =
                    kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                        .await?;
                Client::try_from(client_config)?
            }
            None => Client::try_default().await?,
        };
        debug!("Successfully loaded Kubernetes client");

        let api: Api<ConfigMap> = if config.namespace.is_empty() {
            Api::all(client)
        } else {
            Api::namespaced(client, &config.namespace)
        };

        // Fail at startup, not at the first event, when the cluster is
        // unreachable or the credentials cannot list ConfigMaps.
        debug!("Testing Kubernetes connectivity by listing ConfigMaps");
        api.list(&ListParams::default().limit(1)).await?;
        debug!("Successfully tested Kubernetes connectivity");

        let reconciler = Reconciler::new(&config);

        Ok(Self {
            watcher: Watcher::new(api, reconciler),
            namespace: config.namespace,
        })
    }

    /// Runs the watch loop until a fatal error ends it.
    pub async fn run(self) -> Result<(), ControllerError> {
        if self.namespace.is_empty() {
            info!("Watching for new/modified/deleted ConfigMaps in all accessible namespaces");
        } else {
            info!(
                "Watching for new/modified/deleted ConfigMaps in namespace {}",
                self.namespace
            );
        }

        self.watcher.watch_configmaps().await
    }
}
