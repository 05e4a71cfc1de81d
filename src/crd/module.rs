//! GCS Custom Resource Definition
//!
//! A Module resource instantiates a deployable module. Modules may depend on
//! Providers only.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::resource::TerraformResource;
use super::types::{DependencyRef, SubKind, TerraformStatus};
use crate::Error;

/// Specification for a Google Cloud Storage bucket module
///
/// The generated resource type is named after the kind, [`GCS`].
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "module.terraform.io",
    version = "v1alpha1",
    kind = "GCS",
    plural = "gcses",
    shortname = "gcs",
    status = "TerraformStatus",
    namespaced,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
pub struct GcsSpec {
    /// Providers that must be ready before this module is rendered
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dep: Vec<DependencyRef>,

    /// Module inputs rendered into the configuration document
    #[serde(flatten)]
    pub config: GcsConfig,
}

/// Inputs of the gcs module block
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct GcsConfig {
    /// Module source path or registry address
    pub source: String,

    /// Bucket name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Project owning the bucket
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Bucket location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Storage class (STANDARD, NEARLINE, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,

    /// Bucket labels
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl TerraformResource for GCS {
    const SUB_KIND: SubKind = SubKind::Gcs;

    fn dependencies(&self) -> &[DependencyRef] {
        &self.spec.dep
    }

    fn terraform_status(&self) -> Option<&TerraformStatus> {
        self.status.as_ref()
    }

    fn config(&self) -> Result<serde_json::Value, Error> {
        Ok(serde_json::to_value(&self.spec.config)?)
    }
}
