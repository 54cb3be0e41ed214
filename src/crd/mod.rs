//! Custom Resource Definitions used by the machine scaler
//!
//! Only the Machine resource is modelled, along with the provider config
//! payload it carries.

mod machine;
mod types;

use kube::CustomResourceExt;

use crate::Error;

pub use machine::{Machine, MachineSpec, MachineStatus, MachineVersionInfo};
pub use types::{MachineProviderConfig, ServerPool};

/// Render the Machine CRD as a YAML manifest
pub fn crd_manifest() -> Result<String, Error> {
    serde_yaml::to_string(&Machine::crd())
        .map_err(|e| Error::serialization(format!("failed to serialize Machine CRD: {e}")))
}
