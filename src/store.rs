//! Resource store access for Terraform resources
//!
//! [`ResourceStore`] is the only way the lifecycle engine reads or writes
//! resources. The production implementation maps a kind-erased
//! [`ResourceRecord`] back onto the typed API selected by its [`SubKind`].

use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams};
use kube::Client;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::crd::{
    EtcdV3, GCS, Google, ObjectKey, ResourceRecord, SubKind, TerraformResource,
};
use crate::Error;

/// Field manager recorded on every patch
pub const FIELD_MANAGER: &str = "terraform-operator";

/// Trait abstracting resource store operations
///
/// Writes carry the record's `resource_version`; a stale version fails with
/// [`Error::Conflict`] instead of overwriting a concurrent change.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetch a resource, failing with [`Error::NotFound`] if it does not exist
    async fn get(&self, key: &ObjectKey) -> Result<ResourceRecord, Error>;

    /// Persist the record's finalizers and return the stored result
    async fn update(&self, record: &ResourceRecord) -> Result<ResourceRecord, Error>;

    /// Persist the record's status and return the stored result
    async fn update_status(&self, record: &ResourceRecord) -> Result<ResourceRecord, Error>;
}

/// Kubernetes-backed resource store
pub struct KubeResourceStore {
    client: Client,
}

impl KubeResourceStore {
    /// Create a new store wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K: TerraformResource>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn get_typed<K: TerraformResource>(
        &self,
        key: &ObjectKey,
    ) -> Result<ResourceRecord, Error> {
        let obj = self
            .api::<K>(&key.namespace)
            .get(&key.name)
            .await
            .map_err(|e| classify(e, key))?;
        obj.to_record()
    }

    async fn update_typed<K: TerraformResource>(
        &self,
        record: &ResourceRecord,
    ) -> Result<ResourceRecord, Error> {
        let patch = serde_json::json!({
            "metadata": {
                "resourceVersion": record.resource_version,
                "finalizers": record.finalizers,
            }
        });
        let obj = self
            .api::<K>(record.namespace())
            .patch(
                record.name(),
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(&patch),
            )
            .await
            .map_err(|e| classify(e, &record.key))?;
        debug!(resource = %record.key, finalizers = ?record.finalizers, "updated finalizers");
        obj.to_record()
    }

    async fn update_status_typed<K: TerraformResource>(
        &self,
        record: &ResourceRecord,
    ) -> Result<ResourceRecord, Error> {
        let patch = status_patch(record);
        let obj = self
            .api::<K>(record.namespace())
            .patch_status(
                record.name(),
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(&patch),
            )
            .await
            .map_err(|e| classify(e, &record.key))?;
        debug!(resource = %record.key, status = ?record.status, "updated status");
        obj.to_record()
    }
}

#[async_trait]
impl ResourceStore for KubeResourceStore {
    async fn get(&self, key: &ObjectKey) -> Result<ResourceRecord, Error> {
        match key.sub_kind {
            SubKind::EtcdV3 => self.get_typed::<EtcdV3>(key).await,
            SubKind::Google => self.get_typed::<Google>(key).await,
            SubKind::Gcs => self.get_typed::<GCS>(key).await,
        }
    }

    async fn update(&self, record: &ResourceRecord) -> Result<ResourceRecord, Error> {
        match record.sub_kind() {
            SubKind::EtcdV3 => self.update_typed::<EtcdV3>(record).await,
            SubKind::Google => self.update_typed::<Google>(record).await,
            SubKind::Gcs => self.update_typed::<GCS>(record).await,
        }
    }

    async fn update_status(&self, record: &ResourceRecord) -> Result<ResourceRecord, Error> {
        match record.sub_kind() {
            SubKind::EtcdV3 => self.update_status_typed::<EtcdV3>(record).await,
            SubKind::Google => self.update_status_typed::<Google>(record).await,
            SubKind::Gcs => self.update_status_typed::<GCS>(record).await,
        }
    }
}

/// Merge patch replacing a record's status
///
/// Absent optional fields are sent as `null`, which a merge patch treats as
/// "delete", so the stored status ends up equal to `record.status`.
fn status_patch(record: &ResourceRecord) -> serde_json::Value {
    serde_json::json!({
        "metadata": {
            "resourceVersion": record.resource_version,
        },
        "status": record.status,
    })
}

/// Map API status codes onto the operator's error taxonomy
fn classify(err: kube::Error, key: &ObjectKey) -> Error {
    match &err {
        kube::Error::Api(resp) if resp.code == 404 => Error::not_found(
            key.sub_kind.to_string(),
            key.namespace.clone(),
            key.name.clone(),
        ),
        kube::Error::Api(resp) if resp.code == 409 => {
            Error::conflict(format!("{key}: {}", resp.message))
        }
        _ => Error::Kube(err),
    }
}
