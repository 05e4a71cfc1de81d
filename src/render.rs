//! Configuration document rendering and the shared configuration directory
//!
//! Rendering is a pure projection of a resource spec into the JSON document the
//! provisioning tool reads. Output is tab-indented with every object's keys in
//! sorted order, so equal specs always produce byte-identical files.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::crd::{ResourceKind, ResourceRecord};
use crate::Error;

/// Default extension of rendered documents
pub const DEFAULT_EXTENSION: &str = "tf.json";

/// Keys the sub-kind block is nested under for each category
pub fn document_root(kind: ResourceKind) -> &'static [&'static str] {
    match kind {
        ResourceKind::Backend => &["terraform", "backend"],
        ResourceKind::Provider => &["provider"],
        ResourceKind::Module => &["module"],
    }
}

/// Render `spec` under `discriminator`, nested inside the category's document root
pub fn render<T: Serialize + ?Sized>(
    kind: ResourceKind,
    discriminator: &str,
    spec: &T,
) -> Result<Vec<u8>, Error> {
    let mut document = canonicalize(serde_json::to_value(spec)?);
    document = wrap(discriminator, document);
    for key in document_root(kind).iter().rev() {
        document = wrap(key, document);
    }

    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    document.serialize(&mut ser)?;
    Ok(out)
}

/// Render the configuration document for a resource record
pub fn render_record(record: &ResourceRecord) -> Result<Vec<u8>, Error> {
    render(
        record.kind(),
        &record.sub_kind().discriminator(),
        &record.config,
    )
}

/// File name of a resource's document: `<Kind>_<SubKind>_<Name>.<extension>`
///
/// The name is unique within a namespace; [`ConfigSink`] places it in the
/// resource's namespace directory.
pub fn file_name(record: &ResourceRecord, extension: &str) -> String {
    format!("{}.{}", record.marker(), extension)
}

fn wrap(key: &str, value: serde_json::Value) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert(key.to_string(), value);
    serde_json::Value::Object(map)
}

/// Rebuild every object with keys inserted in sorted order
///
/// Keeps output ordering stable even if serde_json's `preserve_order` feature
/// is enabled somewhere in the dependency graph.
fn canonicalize(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect(),
            )
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(canonicalize).collect())
        }
        other => other,
    }
}

/// Destination for rendered configuration documents
///
/// Documents are grouped by the namespace of the resource they were rendered
/// from, so equally named resources in different namespaces never share a file.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConfigSink: Send + Sync {
    /// Replace the named document in `namespace` with `contents`
    async fn write(&self, namespace: &str, file_name: &str, contents: &[u8]) -> Result<(), Error>;

    /// Remove the named document from `namespace`; a missing document is not an error
    async fn remove(&self, namespace: &str, file_name: &str) -> Result<(), Error>;
}

/// Configuration directory on the local filesystem
///
/// Each namespace gets its own subdirectory: `<dir>/<namespace>/<file>`.
/// Writes go to a hidden temporary file next to the target and are renamed
/// into place, so a concurrent provisioning pass never reads a partial file.
#[derive(Clone, Debug)]
pub struct FsConfigSink {
    dir: PathBuf,
}

impl FsConfigSink {
    /// Create a sink writing below `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn namespace_dir(&self, namespace: &str) -> Result<PathBuf, Error> {
        if namespace.is_empty() || namespace.contains(['/', '\\']) || namespace.starts_with('.') {
            return Err(Error::validation(format!(
                "namespace {namespace:?} cannot be used as a directory name"
            )));
        }
        Ok(self.dir.join(namespace))
    }
}

#[async_trait]
impl ConfigSink for FsConfigSink {
    async fn write(&self, namespace: &str, file_name: &str, contents: &[u8]) -> Result<(), Error> {
        let dir = self.namespace_dir(namespace)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::io(&dir, e))?;

        let temp = dir.join(format!(".{file_name}.tmp"));
        let target = dir.join(file_name);

        let mut file = tokio::fs::File::create(&temp)
            .await
            .map_err(|e| Error::io(&temp, e))?;
        file.write_all(contents)
            .await
            .map_err(|e| Error::io(&temp, e))?;
        file.sync_all().await.map_err(|e| Error::io(&temp, e))?;
        drop(file);

        tokio::fs::rename(&temp, &target)
            .await
            .map_err(|e| Error::io(&target, e))?;

        debug!(path = %target.display(), bytes = contents.len(), "wrote configuration document");
        Ok(())
    }

    async fn remove(&self, namespace: &str, file_name: &str) -> Result<(), Error> {
        let target = self.namespace_dir(namespace)?.join(file_name);
        match tokio::fs::remove_file(&target).await {
            Ok(()) => {
                debug!(path = %target.display(), "removed configuration document");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(&target, e)),
        }
    }
}
