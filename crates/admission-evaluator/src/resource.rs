use k8s_openapi::apimachinery::pkg::runtime::RawExtension;
use serde::Deserialize;
use std::collections::BTreeMap;

/// The embedded object of an AdmissionRequest, reduced to what policies
/// look at. Only `metadata` is decoded, the rest of the object is ignored.
///
/// A `null` metadata is read like a missing one.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Resource {
    #[serde(default)]
    metadata: Option<ResourceMetadata>,
}

/// Subset of the Kubernetes ObjectMeta. Label and annotation values are
/// optional: a key set to `null` is still a key carried by the object.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ResourceMetadata {
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub labels: Option<BTreeMap<String, Option<String>>>,
    #[serde(default)]
    pub annotations: Option<BTreeMap<String, Option<String>>>,
}

impl Resource {
    pub fn from_raw(raw: &RawExtension) -> serde_json::Result<Resource> {
        Resource::deserialize(&raw.0)
    }

    pub fn metadata(&self) -> Option<&ResourceMetadata> {
        self.metadata.as_ref()
    }

    pub fn namespace(&self) -> &str {
        self.metadata()
            .and_then(|metadata| metadata.namespace.as_deref())
            .unwrap_or_default()
    }

    pub fn name(&self) -> &str {
        self.metadata()
            .and_then(|metadata| metadata.name.as_deref())
            .unwrap_or_default()
    }

    /// A missing `labels` mapping is treated like an empty one.
    pub fn has_label(&self, key: &str) -> bool {
        self.metadata()
            .and_then(|metadata| metadata.labels.as_ref())
            .is_some_and(|labels| labels.contains_key(key))
    }

    pub fn has_annotation(&self, key: &str) -> bool {
        self.metadata()
            .and_then(|metadata| metadata.annotations.as_ref())
            .is_some_and(|annotations| annotations.contains_key(key))
    }
}
