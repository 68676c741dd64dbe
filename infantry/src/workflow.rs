//! Mission state machine.
//!
//! A fixed table of nodes and a router. The router reads exactly one field,
//! `critical_error_message`: once it is set, the next node is the error
//! handler, which always ends the run.
//!
//! ```text
//! initialize_mission -> git_branch -> code_modification -> mission_reporting
//!     -> git_checkout_original_branch -> END
//! any node --(critical_error_message set)--> error_handler -> END
//! ```

use std::fmt;

use tracing::{debug, error, info_span};

use crate::core::types::{MissionStatus, WorkflowState};
use crate::io::code_agent::CodeAgent;
use crate::io::llm::LlmClient;
use crate::mission::Mission;
use crate::nodes::{branch, checkout, code_modification, error_handler, initialize, reporting};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeId {
    InitializeMission,
    GitBranch,
    CodeModification,
    MissionReporting,
    GitCheckoutOriginalBranch,
    ErrorHandler,
}

impl NodeId {
    pub const ENTRY: NodeId = NodeId::InitializeMission;

    pub fn as_str(self) -> &'static str {
        match self {
            NodeId::InitializeMission => "initialize_mission",
            NodeId::GitBranch => "git_branch",
            NodeId::CodeModification => "code_modification",
            NodeId::MissionReporting => "mission_reporting",
            NodeId::GitCheckoutOriginalBranch => "git_checkout_original_branch",
            NodeId::ErrorHandler => "error_handler",
        }
    }

    /// Declared happy-path successor. `None` ends the run.
    pub fn successor(self) -> Option<NodeId> {
        match self {
            NodeId::InitializeMission => Some(NodeId::GitBranch),
            NodeId::GitBranch => Some(NodeId::CodeModification),
            NodeId::CodeModification => Some(NodeId::MissionReporting),
            NodeId::MissionReporting => Some(NodeId::GitCheckoutOriginalBranch),
            NodeId::GitCheckoutOriginalBranch | NodeId::ErrorHandler => None,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Next(NodeId),
    End,
}

/// Decide where to go after `node` ran.
pub fn route(node: NodeId, state: &WorkflowState) -> Route {
    if node == NodeId::ErrorHandler {
        return Route::End;
    }
    if state.critical_error_message.is_some() {
        return Route::Next(NodeId::ErrorHandler);
    }
    match node.successor() {
        Some(next) => Route::Next(next),
        None => Route::End,
    }
}

/// Drive a fresh [`WorkflowState`] through the graph.
pub fn run_workflow<L: LlmClient, A: CodeAgent>(mission: &Mission<L, A>) -> WorkflowState {
    let mut state = WorkflowState::default();
    let mut node = NodeId::ENTRY;
    loop {
        run_node(mission, node, &mut state);
        match route(node, &state) {
            Route::Next(next) => {
                debug!(from = %node, to = %next, "routing");
                node = next;
            }
            Route::End => break,
        }
    }
    state
}

/// Run one node inside its failure boundary.
fn run_node<L: LlmClient, A: CodeAgent>(
    mission: &Mission<L, A>,
    node: NodeId,
    state: &mut WorkflowState,
) {
    let span = info_span!("node", node = node.as_str());
    let _guard = span.enter();
    state.current_step_name = Some(node.as_str().to_string());

    let result = match node {
        NodeId::InitializeMission => initialize::run(mission, state),
        NodeId::GitBranch => branch::run(mission, state),
        NodeId::CodeModification => code_modification::run(mission, state),
        NodeId::MissionReporting => reporting::run(mission, state),
        NodeId::GitCheckoutOriginalBranch => checkout::run(mission, state),
        NodeId::ErrorHandler => {
            error_handler::run(mission, state);
            Ok(())
        }
    };

    if let Err(err) = result {
        let message = format!("{node}: {err:#}");
        error!(%message, "node failed");
        state.critical_error_message = Some(message);
        state.failed_step_name = Some(node.as_str().to_string());
        state.mission_context.status = Some(MissionStatus::Error);
    }
}
