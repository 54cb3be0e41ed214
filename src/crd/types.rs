//! Provider config payload carried by Machine resources
//!
//! The payload is an opaque JSON string on the Machine spec. Only the server
//! pool description is modelled; everything else is preserved untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Decoded `spec.providerConfig` of a Machine
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineProviderConfig {
    /// Server pool this machine belongs to
    #[serde(default)]
    pub server_pool: ServerPool,

    /// Provider fields not modelled here
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A group of identical servers at the infrastructure provider
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerPool {
    /// Pool name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Pool type ("master" or "node")
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    /// Instance size at the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// Image the servers boot from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Lower bound on pool size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_count: Option<u32>,

    /// Upper bound on pool size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_count: Option<u32>,

    /// Pool fields not modelled here
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl MachineProviderConfig {
    /// Decode a provider config payload, falling back to the default on
    /// malformed input.
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str(raw) {
            Ok(config) => config,
            Err(e) => {
                debug!(error = %e, "ignoring undecodable provider config");
                Self::default()
            }
        }
    }

    /// Name of the server pool, if the payload names one
    pub fn pool_name(&self) -> Option<&str> {
        self.server_pool.name.as_deref()
    }
}
