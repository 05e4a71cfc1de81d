//! Terraform operator - renders Backend, Provider and Module resources into
//! Terraform configuration with dependency-ordered lifecycle
//!
//! # Architecture
//!
//! Each custom resource is rendered into one JSON document in its namespace's
//! subdirectory of the configuration directory the terraform CLI reads.
//! Resources declare dependencies on each other and are only materialized once every dependency
//! has reached `Success`. Reverse edges are recorded as finalizers on the
//! dependencies, so nothing is deleted while a dependent still exists.
//!
//! # Modules
//!
//! - [`crd`] - Custom Resource Definitions (EtcdV3, Google, GCS)
//! - [`controller`] - Lifecycle reconciliation shared by all kinds
//! - [`dependency`] - Dependency validation and resolution
//! - [`finalizer`] - Finalizer markers encoding dependency edges
//! - [`render`] - Configuration document rendering and the config directory
//! - [`store`] - Resource store abstraction over the Kubernetes API
//! - [`config`] - Operator runtime configuration
//! - [`preflight`] - Startup readiness check
//! - [`retry`] - Bounded retry with backoff
//! - [`terraform`] - terraform CLI runner
//! - [`error`] - Error types for the operator

#![deny(missing_docs)]

pub mod config;
pub mod controller;
pub mod crd;
pub mod dependency;
pub mod error;
pub mod finalizer;
pub mod preflight;
pub mod render;
pub mod retry;
pub mod store;
pub mod terraform;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
