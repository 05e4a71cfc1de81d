//! Finalizer markers and the per-resource finalizer ledger
//!
//! A marker `<Kind>_<SubKind>_<Name>` names a resource. Placed on the resource
//! itself it means "materialized, deletion must go through the lifecycle
//! protocol". Placed on a dependency it is a reverse edge: the named dependent
//! still needs the dependency to exist.
//!
//! The string form is stored in `metadata.finalizers` and must stay stable
//! across upgrades. Everything inside the operator works with [`Marker`].

use std::fmt;
use std::str::FromStr;

use crate::crd::{ObjectKey, ResourceKind, SubKind};
use crate::Error;

/// Structured form of a finalizer marker
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Marker {
    /// Category of the named resource
    pub kind: ResourceKind,
    /// Concrete kind of the named resource
    pub sub_kind: SubKind,
    /// Name of the named resource
    pub name: String,
}

impl Marker {
    /// Marker naming the given resource
    pub fn new(sub_kind: SubKind, name: impl Into<String>) -> Self {
        Self {
            kind: sub_kind.kind(),
            sub_kind,
            name: name.into(),
        }
    }

    /// Key of the named resource, resolved in `namespace`
    pub fn object_key(&self, namespace: &str) -> ObjectKey {
        ObjectKey::new(self.sub_kind, namespace, self.name.clone())
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.kind, self.sub_kind, self.name)
    }
}

impl FromStr for Marker {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, '_');
        let (Some(kind), Some(sub_kind), Some(name)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::validation(format!("malformed finalizer marker: {s}")));
        };
        if name.is_empty() {
            return Err(Error::validation(format!("finalizer marker has no name: {s}")));
        }

        let kind: ResourceKind = kind.parse()?;
        let sub_kind: SubKind = sub_kind.parse()?;
        if sub_kind.kind() != kind {
            return Err(Error::validation(format!(
                "finalizer marker {s}: {sub_kind} is not a {kind}"
            )));
        }

        Ok(Self {
            kind,
            sub_kind,
            name: name.to_string(),
        })
    }
}

/// Whether `finalizers` contains `marker`
pub fn has_marker(finalizers: &[String], marker: &Marker) -> bool {
    let marker = marker.to_string();
    finalizers.iter().any(|f| *f == marker)
}

/// Add `marker` to `finalizers`; returns false if it was already present
pub fn add_marker(finalizers: &mut Vec<String>, marker: &Marker) -> bool {
    if has_marker(finalizers, marker) {
        return false;
    }
    finalizers.push(marker.to_string());
    true
}

/// Remove every copy of `marker` from `finalizers`; returns false if absent
pub fn remove_marker(finalizers: &mut Vec<String>, marker: &Marker) -> bool {
    let marker = marker.to_string();
    let before = finalizers.len();
    finalizers.retain(|f| *f != marker);
    finalizers.len() != before
}

/// Markers on a resource that name some other resource
///
/// Finalizers owned by other controllers do not parse and are skipped.
pub fn foreign_markers<'a>(
    finalizers: &'a [String],
    own: &'a Marker,
) -> impl Iterator<Item = (&'a String, Marker)> + 'a {
    finalizers.iter().filter_map(move |raw| match raw.parse::<Marker>() {
        Ok(marker) if marker != *own => Some((raw, marker)),
        _ => None,
    })
}
