//! Controller implementations for the Terraform CRDs
//!
//! Backend, Provider and Module resources share one lifecycle state machine;
//! each kind gets its own `kube::runtime::Controller` driving it.

mod lifecycle;

pub use lifecycle::{
    error_policy, reconcile, reconcile_key, Context, ContextBuilder, ERROR_REQUEUE,
    PRECONDITION_REQUEUE,
};
