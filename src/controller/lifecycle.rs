//! Lifecycle reconciliation for Backend, Provider and Module resources
//!
//! One state machine drives every Terraform resource kind. Each pass re-reads
//! the resource and walks it from the top:
//!
//! 1. gone: nothing to do
//! 2. deleting: release reverse edges, remove the document, drop the own finalizer
//! 3. invalid dependencies: publish the reason and wait for a spec change
//! 4. dependencies not ready: publish `{Failure, Dependency}` and requeue
//! 5. otherwise: publish `{Success, Dependency}`, add the own finalizer, write
//!    the document, publish `{Success, Output}`
//!
//! Every step is idempotent, so an interrupted pass is finished by the next one.

use std::sync::Arc;
use std::time::Duration;

use kube::runtime::controller::Action;
use kube::{Client, ResourceExt};
use tracing::{debug, error, info, instrument, warn};

use crate::config::OperatorConfig;
use crate::crd::{ObjectKey, ResourceRecord, TerraformResource, TerraformStatus};
use crate::dependency;
use crate::finalizer::{add_marker, remove_marker};
use crate::render::{file_name, render_record, ConfigSink, FsConfigSink};
use crate::store::{KubeResourceStore, ResourceStore};
use crate::Error;

/// Requeue delay while deletion is blocked by a live dependent
pub const PRECONDITION_REQUEUE: Duration = Duration::from_secs(15);

/// Requeue delay after any other failed pass
pub const ERROR_REQUEUE: Duration = Duration::from_secs(5);

/// Message published while waiting on dependencies
const WAITING_MESSAGE: &str = "waiting for dependencies to reach Success";

/// Controller context shared by every resource kind
pub struct Context {
    /// Resource store (trait object for testability)
    pub store: Arc<dyn ResourceStore>,
    /// Destination of rendered documents (trait object for testability)
    pub sink: Arc<dyn ConfigSink>,
    /// Runtime configuration
    pub config: OperatorConfig,
}

impl Context {
    /// Create a builder for constructing a Context
    pub fn builder(client: Client) -> ContextBuilder {
        ContextBuilder::new(client)
    }

    /// Create a context with default store, sink and configuration
    pub fn new(client: Client) -> Self {
        Self::builder(client).build()
    }

    /// Create a context for testing without a Kubernetes client
    #[cfg(test)]
    pub fn for_testing(
        store: Arc<dyn ResourceStore>,
        sink: Arc<dyn ConfigSink>,
        config: OperatorConfig,
    ) -> Self {
        Self {
            store,
            sink,
            config,
        }
    }

    /// File name of a resource's rendered document within its namespace directory
    pub fn document_name(&self, record: &ResourceRecord) -> String {
        file_name(record, &self.config.file_extension)
    }
}

/// Builder for constructing [`Context`] instances
///
/// ```ignore
/// let ctx = Context::builder(client)
///     .config(OperatorConfig::new("/var/lib/terraform"))
///     .build();
/// ```
pub struct ContextBuilder {
    client: Client,
    store: Option<Arc<dyn ResourceStore>>,
    sink: Option<Arc<dyn ConfigSink>>,
    config: OperatorConfig,
}

impl ContextBuilder {
    fn new(client: Client) -> Self {
        Self {
            client,
            store: None,
            sink: None,
            config: OperatorConfig::default(),
        }
    }

    /// Set the runtime configuration
    pub fn config(mut self, config: OperatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the resource store (primarily for testing)
    pub fn store(mut self, store: Arc<dyn ResourceStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Override the configuration sink
    pub fn sink(mut self, sink: Arc<dyn ConfigSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Build the Context
    pub fn build(self) -> Context {
        let config = self.config;
        Context {
            store: self
                .store
                .unwrap_or_else(|| Arc::new(KubeResourceStore::new(self.client.clone()))),
            sink: self
                .sink
                .unwrap_or_else(|| Arc::new(FsConfigSink::new(config.config_dir.clone()))),
            config,
        }
    }
}

/// Reconcile a Terraform resource of any kind
///
/// The host loop hands over the cached object; the pass itself works on a
/// fresh read from the store.
#[instrument(skip(obj, ctx), fields(kind = %K::SUB_KIND, resource = %obj.name_any()))]
pub async fn reconcile<K: TerraformResource>(obj: Arc<K>, ctx: Arc<Context>) -> Result<Action, Error> {
    let key = obj.object_key()?;
    reconcile_key(&key, &ctx).await
}

/// Run one lifecycle pass for the resource identified by `key`
pub async fn reconcile_key(key: &ObjectKey, ctx: &Context) -> Result<Action, Error> {
    let record = match ctx.store.get(key).await {
        Ok(record) => record,
        Err(e) if e.is_not_found() => {
            debug!(resource = %key, "resource no longer exists");
            return Ok(Action::await_change());
        }
        Err(e) => return Err(e),
    };

    if record.deleting {
        finalize(record, ctx).await?;
        return Ok(Action::await_change());
    }

    match dependency::validate(&record, ctx.store.as_ref()).await {
        Ok(()) => {}
        Err(Error::Validation(reason)) => {
            warn!(resource = %key, %reason, "invalid dependency declaration");
            publish(record, TerraformStatus::waiting().message(reason), ctx).await?;
            return Ok(Action::await_change());
        }
        Err(e) => return Err(e),
    }

    if !dependency::resolve(&record, ctx.store.as_ref()).await? {
        info!(resource = %key, "dependencies not ready");
        publish(
            record,
            TerraformStatus::waiting().message(WAITING_MESSAGE),
            ctx,
        )
        .await?;
        return Ok(Action::requeue(ctx.config.dependency_requeue));
    }

    let mut record = record;
    if !record.status.has_passed_dependency_gate() {
        record = publish(record, TerraformStatus::dependencies_met(), ctx).await?;
    }

    let own = record.marker();
    if add_marker(&mut record.finalizers, &own) {
        record = ctx.store.update(&record).await?;
        debug!(resource = %key, "registered own finalizer");
    }

    let document = render_record(&record)?;
    ctx.sink
        .write(record.namespace(), &ctx.document_name(&record), &document)
        .await?;

    publish(record, TerraformStatus::materialized(), ctx).await?;
    Ok(Action::requeue(ctx.config.resync_interval))
}

/// Deletion branch: release edges, remove the document, drop the own finalizer
async fn finalize(record: ResourceRecord, ctx: &Context) -> Result<(), Error> {
    let own = record.marker();
    let mut record = dependency::resolve_deletion(record, ctx.store.as_ref()).await?;

    ctx.sink
        .remove(record.namespace(), &ctx.document_name(&record))
        .await?;

    if remove_marker(&mut record.finalizers, &own) {
        ctx.store.update(&record).await?;
        info!(resource = %record.key, "configuration removed, finalizer released");
    }
    Ok(())
}

/// Persist `status` unless the stored status already matches
///
/// The status is stamped with the record's generation before comparing.
async fn publish(
    mut record: ResourceRecord,
    status: TerraformStatus,
    ctx: &Context,
) -> Result<ResourceRecord, Error> {
    let status = status.observed_generation(record.generation);
    if record.status == status {
        return Ok(record);
    }
    debug!(resource = %record.key, state = ?status.state, phase = ?status.phase, "publishing status");
    record.status = status;
    ctx.store.update_status(&record).await
}

/// Error policy for every resource kind
///
/// Blocked deletions are expected and retried quietly. Errors that need a
/// spec or code change wait for the next change instead of retrying.
pub fn error_policy<K: TerraformResource>(obj: Arc<K>, error: &Error, _ctx: Arc<Context>) -> Action {
    match error {
        Error::Precondition(_) => {
            info!(%error, kind = %K::SUB_KIND, resource = %obj.name_any(), "deletion blocked");
            Action::requeue(PRECONDITION_REQUEUE)
        }
        _ if !error.is_retryable() => {
            error!(?error, kind = %K::SUB_KIND, resource = %obj.name_any(), "reconciliation failed permanently");
            Action::await_change()
        }
        _ => {
            error!(?error, kind = %K::SUB_KIND, resource = %obj.name_any(), "reconciliation failed");
            Action::requeue(ERROR_REQUEUE)
        }
    }
}
