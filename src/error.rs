//! Error types for the machine scaler
//!
//! Every failure from the Kubernetes API is wrapped with a short context
//! string naming the operation that failed. There is no categorization for
//! retry: the first error aborts the scaling run and is returned as-is.

use thiserror::Error;

/// Main error type for machine scaling operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error, wrapped with the operation that failed
    #[error("{context}: {source}")]
    Kube {
        /// Short description of the failed operation (e.g. "unable to list machines")
        context: String,
        /// The underlying kube-rs error
        #[source]
        source: kube::Error,
    },

    /// The kubeconfig environment variable is missing or empty
    #[error("missing environment variable [{0}]")]
    MissingKubeconfig(&'static str),

    /// The kubeconfig payload could not be parsed or turned into a client
    #[error("kubeconfig error: {0}")]
    Kubeconfig(String),

    /// Not enough machines to find the template machine to clone
    #[error("unable to find base machine: found {found} machines, need at least {required}")]
    BaseMachineNotFound {
        /// Number of machines listed
        found: usize,
        /// Number of machines required for the template index to exist
        required: usize,
    },

    /// The template machine's name has no usable prefix for generated names
    #[error("template machine name '{0}' has no '-' separated prefix")]
    InvalidTemplateName(String),

    /// Fewer machines than the reserved control-plane members were found
    #[error("invalid length of machines: found {found}, reserved {reserved}")]
    InvalidMachineCount {
        /// Number of machines listed
        found: usize,
        /// Number of reserved control-plane machines
        reserved: usize,
    },

    /// Invalid scaling policy or input
    #[error("validation error: {0}")]
    Validation(String),

    /// A manifest could not be rendered
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Wrap a kube error with a short context string
    pub fn kube(context: impl Into<String>, source: kube::Error) -> Self {
        Self::Kube {
            context: context.into(),
            source,
        }
    }

    /// Create a kubeconfig error with the given message
    pub fn kubeconfig(msg: impl Into<String>) -> Self {
        Self::Kubeconfig(msg.into())
    }

    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}
