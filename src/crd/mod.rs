//! Custom Resource Definitions for the Terraform operator
//!
//! One CRD per resource category: [`EtcdV3`] (Backend), [`Google`] (Provider)
//! and [`GCS`] (Module).

mod backend;
mod module;
mod provider;
mod resource;
mod types;

pub use backend::{EtcdV3, EtcdV3Config, EtcdV3Spec};
pub use module::{GCS, GcsConfig, GcsSpec};
pub use provider::{Google, GoogleConfig, GoogleSpec};
pub use resource::{ObjectKey, ResourceRecord, TerraformResource};
pub use types::{
    DependencyRef, ResourceKind, ResourcePhase, ResourceState, SubKind, TerraformStatus,
};

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::CustomResourceExt;

/// Definitions of every CRD the operator serves, in dependency order
pub fn all() -> Vec<CustomResourceDefinition> {
    vec![EtcdV3::crd(), Google::crd(), GCS::crd()]
}

/// Render every CRD as one multi-document YAML stream
pub fn all_yaml() -> Result<String, serde_yaml::Error> {
    let docs = all()
        .iter()
        .map(serde_yaml::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(docs.join("---\n"))
}
