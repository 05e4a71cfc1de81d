//! Integration tests against a real API server
//!
//! - `crd_operations`: users creating and reading Terraform resources
//! - `lifecycle`: the reconciler driving resources through creation and
//!   dependency-ordered deletion, with documents written to a temp directory

mod crd_operations;
mod helpers;
mod lifecycle;
