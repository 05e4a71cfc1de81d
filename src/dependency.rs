//! Dependency resolution between Terraform resources
//!
//! Dependencies are declared on the dependent. Once a dependency has reached
//! `Success` the dependent leaves its marker on the dependency, and the
//! dependency refuses to finish deletion while any such marker names a live
//! resource.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::crd::{ObjectKey, ResourceRecord};
use crate::finalizer::{add_marker, foreign_markers, remove_marker, Marker};
use crate::store::ResourceStore;
use crate::Error;

/// Check the declared references before anything is resolved
///
/// Rejects references the compatibility table forbids, references to the
/// resource itself, and cycles through resources that already exist in the
/// namespace. Resources that do not exist yet end the walk.
pub async fn validate(record: &ResourceRecord, store: &dyn ResourceStore) -> Result<(), Error> {
    let kind = record.kind();

    for dep in &record.dependencies {
        if !kind.may_depend_on(dep.kind) {
            return Err(Error::validation(format!(
                "{kind} {} may not depend on {} {}",
                record.name(),
                dep.kind,
                dep.name
            )));
        }
        if dep.kind == kind && dep.name == record.name() {
            return Err(Error::validation(format!(
                "{kind} {} depends on itself",
                record.name()
            )));
        }
    }

    let mut visited = HashSet::new();
    let mut pending: Vec<ObjectKey> = record
        .dependencies
        .iter()
        .map(|dep| ObjectKey::for_dependency(record.namespace(), dep))
        .collect();

    while let Some(key) = pending.pop() {
        if key == record.key {
            return Err(Error::validation(format!(
                "dependency cycle through {kind} {}",
                record.name()
            )));
        }
        if !visited.insert(key.clone()) {
            continue;
        }
        match store.get(&key).await {
            Ok(next) => pending.extend(
                next.dependencies
                    .iter()
                    .map(|dep| ObjectKey::for_dependency(&key.namespace, dep)),
            ),
            Err(e) if e.is_not_found() => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

/// Whether every declared dependency has reached `Success`
///
/// Each satisfied dependency gets this resource's marker, persisted
/// immediately. A missing dependency is an error, not a wait. A dependency
/// that is being deleted never counts as satisfied.
pub async fn resolve(record: &ResourceRecord, store: &dyn ResourceStore) -> Result<bool, Error> {
    let marker = record.marker();
    let mut satisfied = true;

    for dep in &record.dependencies {
        let key = ObjectKey::for_dependency(record.namespace(), dep);
        let mut dependency = store.get(&key).await?;

        if dependency.deleting || !dependency.status.is_success() {
            debug!(
                resource = %record.key,
                dependency = %key,
                state = ?dependency.status.state,
                deleting = dependency.deleting,
                "dependency not ready"
            );
            satisfied = false;
            continue;
        }

        if add_marker(&mut dependency.finalizers, &marker) {
            store.update(&dependency).await?;
            debug!(resource = %record.key, dependency = %key, "registered reverse edge");
        }
    }

    Ok(satisfied)
}

/// Clear reverse edges left by dependents that no longer exist
///
/// Every marker naming another resource must point at something the store no
/// longer has. The first live dependent blocks deletion with
/// [`Error::Precondition`]. Returns the record as last persisted.
pub async fn resolve_deletion(
    mut record: ResourceRecord,
    store: &dyn ResourceStore,
) -> Result<ResourceRecord, Error> {
    let own = record.marker();
    let dependents: Vec<Marker> = foreign_markers(&record.finalizers, &own)
        .map(|(_, marker)| marker)
        .collect();

    for dependent in dependents {
        let key = dependent.object_key(record.namespace());
        match store.get(&key).await {
            Ok(_) => {
                return Err(Error::precondition(format!(
                    "{} {} still depends on {} {}, deletion blocked",
                    dependent.kind,
                    dependent.name,
                    record.kind(),
                    record.name()
                )));
            }
            Err(e) if e.is_not_found() => {
                remove_marker(&mut record.finalizers, &dependent);
                record = store.update(&record).await?;
                info!(resource = %record.key, dependent = %dependent, "released reverse edge");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(record)
}
