//! Google Custom Resource Definition
//!
//! A Provider resource configures a cloud provider block. Providers may depend
//! on Backends, Modules and other Providers.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::resource::TerraformResource;
use super::types::{DependencyRef, SubKind, TerraformStatus};
use crate::Error;

/// Specification for a Google Cloud provider
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "provider.terraform.io",
    version = "v1alpha1",
    kind = "Google",
    plural = "googles",
    shortname = "gp",
    status = "TerraformStatus",
    namespaced,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Project","type":"string","jsonPath":".spec.project"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
pub struct GoogleSpec {
    /// Resources that must be ready before this provider is rendered
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dep: Vec<DependencyRef>,

    /// Provider settings rendered into the configuration document
    #[serde(flatten)]
    pub config: GoogleConfig,
}

/// Settings of the google provider block
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct GoogleConfig {
    /// Path to, or contents of, a service account key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,

    /// Default project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Default region
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Default zone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
}

impl TerraformResource for Google {
    const SUB_KIND: SubKind = SubKind::Google;

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
