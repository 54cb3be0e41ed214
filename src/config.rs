//! Runtime configuration for a scaling run
//!
//! Command-line arguments (each with a `MACHINE_SCALER_*` environment
//! fallback) are collected here and turned into a [`ScalerConfig`].

use std::time::Duration;

use clap::Args;

use crate::kubeconfig::ClientOptions;
use crate::reconcile::{
    ScalePolicy, DEFAULT_DELETE_INDEX, DEFAULT_MIN_WORKERS, DEFAULT_RESERVED,
    DEFAULT_TEMPLATE_INDEX,
};
use crate::Error;

/// Namespace machines live in unless told otherwise
pub const DEFAULT_NAMESPACE: &str = "default";

/// Where to find the machines
#[derive(Args, Clone, Debug)]
pub struct ClusterArgs {
    /// Namespace holding the Machine resources
    #[arg(long, env = "MACHINE_SCALER_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Kubeconfig context to use (defaults to current-context)
    #[arg(long, env = "MACHINE_SCALER_CONTEXT")]
    pub context: Option<String>,

    /// API server connect timeout in seconds
    #[arg(long, env = "MACHINE_SCALER_CONNECT_TIMEOUT_SECS", default_value = "5")]
    pub connect_timeout_secs: u64,

    /// API server read timeout in seconds
    #[arg(long, env = "MACHINE_SCALER_READ_TIMEOUT_SECS", default_value = "30")]
    pub read_timeout_secs: u64,
}

impl ClusterArgs {
    /// Client options derived from these arguments
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            context: self.context.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
        }
    }
}

/// Which machines are counted, cloned and deleted
#[derive(Args, Clone, Debug)]
pub struct PolicyArgs {
    /// Leading control-plane machines excluded from the worker count
    #[arg(long, env = "MACHINE_SCALER_RESERVED", default_value_t = DEFAULT_RESERVED)]
    pub reserved: usize,

    /// Index of the machine cloned when scaling up
    #[arg(long, env = "MACHINE_SCALER_TEMPLATE_INDEX", default_value_t = DEFAULT_TEMPLATE_INDEX)]
    pub template_index: usize,

    /// Index of the machine deleted when scaling down
    #[arg(long, env = "MACHINE_SCALER_DELETE_INDEX", default_value_t = DEFAULT_DELETE_INDEX)]
    pub delete_index: usize,

    /// Worker machines never removed
    #[arg(long, env = "MACHINE_SCALER_MIN_WORKERS", default_value_t = DEFAULT_MIN_WORKERS)]
    pub min_workers: usize,
}

impl From<&PolicyArgs> for ScalePolicy {
    fn from(args: &PolicyArgs) -> Self {
        ScalePolicy {
            reserved: args.reserved,
            template_index: args.template_index,
            delete_index: args.delete_index,
            min_workers: args.min_workers,
        }
    }
}

/// Everything a scaling run needs besides the kubeconfig
#[derive(Clone, Debug)]
pub struct ScalerConfig {
    /// Namespace holding the Machine resources
    pub namespace: String,
    /// Client construction options
    pub client: ClientOptions,
    /// Scaling policy
    pub policy: ScalePolicy,
}

impl Default for ScalerConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            client: ClientOptions::default(),
            policy: ScalePolicy::default(),
        }
    }
}

impl ScalerConfig {
    /// Build a validated config from parsed arguments
    pub fn from_args(cluster: &ClusterArgs, policy: &PolicyArgs) -> Result<Self, Error> {
        let config = Self {
            namespace: cluster.namespace.clone(),
            client: cluster.client_options(),
            policy: policy.into(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), Error> {
        if self.namespace.is_empty() {
            return Err(Error::validation("namespace must not be empty"));
        }
        self.policy.validate()
    }
}
