//! Machine client for listing, creating and deleting Machine resources
//!
//! Provides a trait-based abstraction over the Machine API, allowing tests to
//! mock Kubernetes interactions while production code uses real API calls.

use async_trait::async_trait;
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::Client;
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

use crate::crd::Machine;
use crate::Error;

/// Trait abstracting Machine resource operations
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MachineClient: Send + Sync {
    /// List all machines, in the order the API server returns them
    async fn list_machines(&self) -> Result<Vec<Machine>, Error>;

    /// Create a machine
    async fn create_machine(&self, machine: &Machine) -> Result<Machine, Error>;

    /// Delete a machine by name
    async fn delete_machine(&self, name: &str) -> Result<(), Error>;
}

/// Real machine client backed by `Api<Machine>` in a single namespace
pub struct MachineClientImpl {
    api: Api<Machine>,
    namespace: String,
}

impl MachineClientImpl {
    /// Create a client for machines in `namespace`
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
            namespace: namespace.to_string(),
        }
    }
}

#[async_trait]
impl MachineClient for MachineClientImpl {
    async fn list_machines(&self) -> Result<Vec<Machine>, Error> {
        let machines = self
            .api
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::kube("unable to list machines", e))?;

        debug!(
            namespace = %self.namespace,
            count = machines.items.len(),
            "Listed machines"
        );
        Ok(machines.items)
    }

    async fn create_machine(&self, machine: &Machine) -> Result<Machine, Error> {
        let created = self
            .api
            .create(&PostParams::default(), machine)
            .await
            .map_err(|e| Error::kube("unable to create machine", e))?;

        info!(
            namespace = %self.namespace,
            machine = ?created.metadata.name,
            "Created machine"
        );
        Ok(created)
    }

    async fn delete_machine(&self, name: &str) -> Result<(), Error> {
        self.api
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| Error::kube(format!("unable to delete machine {name}"), e))?;

        info!(namespace = %self.namespace, machine = %name, "Deleted machine");
        Ok(())
    }
}
