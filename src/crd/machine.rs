//! Machine Custom Resource Definition
//!
//! A Machine represents one node of the managed cluster. The scaler never
//! edits a Machine in place: it lists them, clones one as a template for new
//! workers, and deletes surplus ones.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{ObjectReference, Taint};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::MachineProviderConfig;

/// Specification for a Machine
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "cluster.k8s.io",
    version = "v1alpha1",
    kind = "Machine",
    plural = "machines",
    status = "MachineStatus",
    namespaced,
    printcolumn = r#"{"name":"Kubelet","type":"string","jsonPath":".spec.versions.kubelet"}"#,
    printcolumn = r#"{"name":"Node","type":"string","jsonPath":".status.nodeRef.name"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MachineSpec {
    /// Taints applied to the node once it registers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<Taint>,

    /// Provider-specific configuration, JSON encoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<String>,

    /// Roles this machine fulfils (e.g. "Master", "Node")
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,

    /// Software versions to run on the machine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versions: Option<MachineVersionInfo>,

    /// Name of the config map or secret the node bootstraps from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_source: Option<String>,

    /// Fields this version of the scaler does not model, kept for cloning
    #[serde(flatten)]
    #[schemars(skip)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Kubernetes component versions for a Machine
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineVersionInfo {
    /// Kubelet version
    pub kubelet: String,

    /// Control plane version, only set on control-plane machines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_plane: Option<String>,
}

/// Status for a Machine
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachineStatus {
    /// Node this machine registered as
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_ref: Option<ObjectReference>,

    /// Last time the status was updated (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,

    /// Versions observed on the node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versions: Option<MachineVersionInfo>,

    /// Terminal error reason reported by the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,

    /// Human-readable error message reported by the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Machine {
    /// Decode the provider config payload
    ///
    /// Decoding is lenient: a missing or malformed payload yields the default
    /// config with an empty server pool.
    pub fn provider_config(&self) -> MachineProviderConfig {
        self.spec
            .provider_config
            .as_deref()
            .map(MachineProviderConfig::parse)
            .unwrap_or_default()
    }

    /// True once the API server has accepted a delete for this machine.
    ///
    /// Machines carrying finalizers stay listed with a deletion timestamp
    /// until their provider has torn the node down.
    pub fn is_terminating(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Build a copy of this machine under a new name, ready to be created.
    ///
    /// Server-assigned metadata (uid, resourceVersion, timestamps, managed
    /// fields, generation) and the status are dropped so the API server accepts the
    /// object as new. Labels, annotations and the spec are kept verbatim.
    pub fn clone_as(&self, name: impl Into<String>) -> Machine {
        let mut clone = self.clone();
        let meta = &mut clone.metadata;
        meta.name = Some(name.into());
        meta.generate_name = None;
        meta.uid = None;
        meta.resource_version = None;
        meta.creation_timestamp = None;
        meta.deletion_timestamp = None;
        meta.deletion_grace_period_seconds = None;
        meta.managed_fields = None;
        meta.generation = None;
        clone.status = None;
        clone
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use kube::CustomResourceExt;

    fn worker(name: &str) -> Machine {
        Machine {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("default".to_string()),
                uid: Some("1b4e28ba-2fa1-11d2-883f-0016d3cca427".to_string()),
                resource_version: Some("4711".to_string()),
                generation: Some(3),
                labels: Some(
                    [("set".to_string(), "node".to_string())]
                        .into_iter()
                        .collect(),
                ),
                ..Default::default()
            },
            spec: MachineSpec {
                provider_config: Some(
                    r#"{"serverPool":{"name":"worker","type":"node","size":"s-2vcpu-2gb"}}"#
                        .to_string(),
                ),
                roles: vec!["Node".to_string()],
                versions: Some(MachineVersionInfo {
                    kubelet: "1.9.3".to_string(),
                    control_plane: None,
                }),
                ..Default::default()
            },
            status: Some(MachineStatus {
                error_message: Some("boom".to_string()),
                ..Default::default()
            }),
        }
    }

    // =========================================================================
    // Cloning Stories
    // =========================================================================

    /// Story: A cloned machine is accepted by the API server as a new object
    ///
    /// The API server rejects creates that carry a resourceVersion or uid, so
    /// the clone must drop everything the server assigned to the original.
    #[test]
    fn story_clone_drops_server_assigned_metadata() {
        let original = worker("worker-abc");
        let clone = original.clone_as("worker-123-xyz");

        assert_eq!(clone.metadata.name.as_deref(), Some("worker-123-xyz"));
        assert!(clone.metadata.resource_version.is_none());
        assert!(clone.metadata.uid.is_none());
        assert!(clone.metadata.generation.is_none());
        assert!(clone.status.is_none());
    }

    /// Story: A cloned machine keeps the template's shape
    #[test]
    fn story_clone_keeps_spec_labels_and_namespace() {
        let original = worker("worker-abc");
        let clone = original.clone_as("worker-2");

        assert_eq!(clone.spec, original.spec);
        assert_eq!(clone.metadata.labels, original.metadata.labels);
        assert_eq!(clone.metadata.namespace.as_deref(), Some("default"));
        // The template itself is untouched
        assert_eq!(original.metadata.resource_version.as_deref(), Some("4711"));
    }

    /// Story: Spec fields the scaler does not model survive a clone
    #[test]
    fn story_unknown_spec_fields_round_trip() {
        let machine: Machine = serde_json::from_value(serde_json::json!({
            "apiVersion": "cluster.k8s.io/v1alpha1",
            "kind": "Machine",
            "metadata": { "name": "worker-1" },
            "spec": {
                "providerConfig": "{}",
                "futureField": { "enabled": true }
            }
        }))
        .unwrap();

        assert_eq!(machine.spec.extra["futureField"]["enabled"], true);

        let value = serde_json::to_value(machine.clone_as("worker-2")).unwrap();
        assert_eq!(value["spec"]["futureField"]["enabled"], true);
        assert_eq!(value["spec"]["providerConfig"], "{}");
    }

    #[test]
    fn deletion_timestamp_marks_machine_terminating() {
        let mut machine = worker("worker-abc");
        assert!(!machine.is_terminating());

        machine.metadata.deletion_timestamp =
            Some(serde_json::from_value(serde_json::json!("2024-05-01T10:00:00Z")).unwrap());
        assert!(machine.is_terminating());
        assert!(!machine.clone_as("worker-2").is_terminating());
    }

    #[test]
    fn provider_config_is_decoded_from_spec() {
        let config = worker("worker-abc").provider_config();
        assert_eq!(config.server_pool.name.as_deref(), Some("worker"));
        assert_eq!(config.server_pool.size.as_deref(), Some("s-2vcpu-2gb"));
    }

    #[test]
    fn missing_provider_config_yields_default() {
        let mut machine = worker("worker-abc");
        machine.spec.provider_config = None;
        assert_eq!(machine.provider_config(), MachineProviderConfig::default());
    }

    #[test]
    fn crd_is_namespaced_in_cluster_api_group() {
        let crd = Machine::crd();
        assert_eq!(crd.spec.group, "cluster.k8s.io");
        assert_eq!(crd.spec.names.kind, "Machine");
        assert_eq!(crd.spec.names.plural, "machines");
        assert_eq!(crd.spec.scope, "Namespaced");
        assert_eq!(crd.spec.versions[0].name, "v1alpha1");
    }
}
