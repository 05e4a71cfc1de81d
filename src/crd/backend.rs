//! EtcdV3 Custom Resource Definition
//!
//! A Backend resource configures where the provisioning tool keeps its state.
//! Backends never depend on anything; Providers depend on them.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::resource::TerraformResource;
use super::types::{DependencyRef, SubKind, TerraformStatus};
use crate::Error;

/// Specification for an etcd v3 state backend
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "backend.terraform.io",
    version = "v1alpha1",
    kind = "EtcdV3",
    plural = "etcdv3s",
    shortname = "etcd",
    status = "TerraformStatus",
    namespaced,
    printcolumn = r#"{"name":"State","type":"string","jsonPath":".status.state"}"#,
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
pub struct EtcdV3Spec {
    /// Declared dependencies (always empty for backends)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dep: Vec<DependencyRef>,

    /// Backend settings rendered into the configuration document
    #[serde(flatten)]
    pub config: EtcdV3Config,
}

/// Settings of the etcdv3 backend block
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct EtcdV3Config {
    /// etcd endpoints
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<String>,

    /// Whether to lock state access
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock: Option<bool>,

    /// Key prefix for stored state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    /// CA certificate path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cacert_path: Option<String>,

    /// Client certificate path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert_path: Option<String>,

    /// Client key path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<String>,
}

impl TerraformResource for EtcdV3 {
    const SUB_KIND: SubKind = SubKind::EtcdV3;

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
