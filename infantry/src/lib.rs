//! Mission executor for the AI development army.
//!
//! One mission = one spec file in a mission folder of the target repository.
//! The crate is split the same way throughout:
//!
//! - **[`core`]**: Pure, deterministic logic (mission types, branch naming,
//!   summary application, invariants). No I/O.
//! - **[`io`]**: Side-effecting adapters (config, git, subprocesses, LLM
//!   provider, templates).
//! - **[`workflow`]** and **[`nodes`]**: the state machine that drives a
//!   [`mission::Mission`] from spec to commit to report.
//!
//! The `secretary` and `general` binaries reuse the `io` layer, [`logging`]
//! and [`exit_codes`].

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod mission;
pub mod nodes;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod workflow;
