//! Kind-erased view of a Terraform custom resource
//!
//! The lifecycle engine never touches the typed CRDs directly. Each CRD
//! projects itself into a [`ResourceRecord`] through [`TerraformResource`], and
//! the store maps records back onto the typed API by [`SubKind`].

use std::fmt::Debug;

use kube::core::NamespaceResourceScope;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::{DependencyRef, ResourceKind, SubKind, TerraformStatus};
use crate::finalizer::Marker;
use crate::Error;

/// Identity of a resource in the store
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    /// Concrete kind
    pub sub_kind: SubKind,
    /// Namespace the resource lives in
    pub namespace: String,
    /// Resource name
    pub name: String,
}

impl ObjectKey {
    /// Create a key for the given sub-kind, namespace and name
    pub fn new(sub_kind: SubKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            sub_kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of a dependency reference resolved in this key's namespace
    pub fn for_dependency(namespace: &str, dep: &DependencyRef) -> Self {
        Self::new(dep.kind.sub_kind(), namespace, dep.name.clone())
    }

    /// Category of the resource
    pub fn kind(&self) -> ResourceKind {
        self.sub_kind.kind()
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}/{}", self.sub_kind, self.namespace, self.name)
    }
}

/// Everything the lifecycle engine needs to know about one resource
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceRecord {
    /// Identity
    pub key: ObjectKey,
    /// `metadata.generation`
    pub generation: Option<i64>,
    /// `metadata.resourceVersion`, used for optimistic concurrency on write
    pub resource_version: Option<String>,
    /// `metadata.finalizers`
    pub finalizers: Vec<String>,
    /// Whether the store has set a deletion timestamp
    pub deleting: bool,
    /// Declared dependencies
    pub dependencies: Vec<DependencyRef>,
    /// Current status, default when never written
    pub status: TerraformStatus,
    /// Spec projection rendered into the configuration document
    pub config: serde_json::Value,
}

impl ResourceRecord {
    /// Category of the resource
    pub fn kind(&self) -> ResourceKind {
        self.key.kind()
    }

    /// Concrete kind of the resource
    pub fn sub_kind(&self) -> SubKind {
        self.key.sub_kind
    }

    /// Resource name
    pub fn name(&self) -> &str {
        &self.key.name
    }

    /// Resource namespace
    pub fn namespace(&self) -> &str {
        &self.key.namespace
    }

    /// Marker identifying this resource, used both as its own finalizer and
    /// as the reverse edge it leaves on its dependencies
    pub fn marker(&self) -> Marker {
        Marker::new(self.sub_kind(), self.name())
    }
}

/// A namespaced Terraform CRD the lifecycle engine can drive
pub trait TerraformResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Concrete kind of this CRD
    const SUB_KIND: SubKind;

    /// Declared dependency references
    fn dependencies(&self) -> &[DependencyRef];

    /// Current status, if any has been written
    fn terraform_status(&self) -> Option<&TerraformStatus>;

    /// Spec projection without dependency references
    fn config(&self) -> Result<serde_json::Value, Error>;

    /// Identity of this object
    fn object_key(&self) -> Result<ObjectKey, Error> {
        let namespace = self.namespace().ok_or_else(|| {
            Error::validation(format!(
                "{} {} must be namespaced",
                Self::SUB_KIND,
                self.name_any()
            ))
        })?;
        Ok(ObjectKey::new(Self::SUB_KIND, namespace, self.name_any()))
    }

    /// Project into a kind-erased record
    fn to_record(&self) -> Result<ResourceRecord, Error> {
        let meta = self.meta();
        Ok(ResourceRecord {
            key: self.object_key()?,
            generation: meta.generation,
            resource_version: meta.resource_version.clone(),
            finalizers: meta.finalizers.clone().unwrap_or_default(),
            deleting: meta.deletion_timestamp.is_some(),
            dependencies: self.dependencies().to_vec(),
            status: self.terraform_status().cloned().unwrap_or_default(),
            config: self.config()?,
        })
    }
}
