//! Workflow nodes. Each `run` mutates the [`WorkflowState`](crate::core::types::WorkflowState)
//! and returns `Err` to trip the failure boundary in [`crate::workflow`].

pub mod branch;
pub mod checkout;
pub mod code_modification;
pub mod error_handler;
pub mod initialize;
pub mod reporting;
