//! machine-scaler - one-shot scaling of Cluster API Machine resources
//!
//! Brings the number of worker Machines in a cluster to a desired count by
//! cloning a template Machine or deleting surplus ones, one at a time.
//!
//! # Modules
//!
//! - [`crd`] - Machine custom resource and its provider config payload
//! - [`kubeconfig`] - Client construction from `KUBECONFIG_CONTENT`
//! - [`client`] - Machine list/create/delete behind a mockable trait
//! - [`reconcile`] - Worker count reconciliation
//! - [`naming`] - Names for cloned machines
//! - [`config`] - Runtime configuration
//! - [`telemetry`] - Logging setup
//! - [`error`] - Error types

#![deny(missing_docs)]

pub mod client;
pub mod config;
pub mod crd;
pub mod error;
pub mod kubeconfig;
pub mod naming;
pub mod reconcile;
pub mod telemetry;

use std::sync::Arc;

pub use client::{MachineClient, MachineClientImpl};
pub use config::ScalerConfig;
pub use error::Error;
pub use reconcile::{Reconciler, ScaleOutcome, ScalePolicy};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Scale the worker machines to `desired` using `KUBECONFIG_CONTENT` and the
/// default namespace and policy.
pub async fn update_machine_count(desired: usize) -> Result<ScaleOutcome> {
    update_machine_count_with(&ScalerConfig::default(), desired).await
}

/// Scale the worker machines to `desired` with an explicit configuration.
///
/// The kubeconfig still comes from `KUBECONFIG_CONTENT`.
pub async fn update_machine_count_with(
    config: &ScalerConfig,
    desired: usize,
) -> Result<ScaleOutcome> {
    reconciler_from_env(config).await?.reconcile(desired).await
}

/// Build a [`Reconciler`] for the configured namespace, with the kubeconfig
/// taken from `KUBECONFIG_CONTENT`.
pub async fn reconciler_from_env(config: &ScalerConfig) -> Result<Reconciler> {
    config.validate()?;
    let client = kubeconfig::client_from_env(&config.client).await?;
    let machines = MachineClientImpl::new(client, &config.namespace);
    Ok(Reconciler::with_policy(
        Arc::new(machines),
        config.policy.clone(),
    ))
}
