//! Safe-eject engine
//!
//! Ejecting the matched node directly is often refused - open handles or
//! a legacy driver veto it - while ejecting the hub port it hangs off
//! succeeds. The engine therefore loops over self-then-ancestors: the
//! first node that accepts the eject ends the walk, and when none does,
//! the **last** failure is reported, since deeper ancestors tend to
//! carry the veto information closest to actionable.

use std::sync::Arc;

use model::{ConfigRet, DeviceId, EjectResult};
use platform::{
    DEFAULT_MAX_ANCESTOR_DEPTH, DeviceNodeGraph, resolve_with_fallback, self_then_ancestors,
};
use tracing::{debug, info};

/// Ancestor-retry eject protocol
pub struct EjectEngine {
    graph: Arc<dyn DeviceNodeGraph + Send + Sync>,
    max_ancestor_depth: usize,
}

impl EjectEngine {
    pub fn new(graph: Arc<dyn DeviceNodeGraph + Send + Sync>) -> Self {
        Self {
            graph,
            max_ancestor_depth: DEFAULT_MAX_ANCESTOR_DEPTH,
        }
    }

    /// Override the ancestor-walk depth bound
    pub fn with_max_ancestor_depth(mut self, max_ancestor_depth: usize) -> Self {
        self.max_ancestor_depth = max_ancestor_depth;
        self
    }

    /// Try to eject `target`, walking up its ancestor chain on refusal
    ///
    /// A node that cannot be located yields a failing attempt carrying
    /// the raw status code - that is a stale id, not a veto - and the
    /// walk moves on.
    pub fn eject(&self, target: &DeviceId) -> EjectResult {
        let candidates =
            self_then_ancestors(&*self.graph, target.clone(), self.max_ancestor_depth);

        let resolved = resolve_with_fallback(candidates, |candidate| {
            let node = match self.graph.locate(candidate) {
                Ok(node) => node,
                Err(status) => {
                    debug!(id = %candidate, status = status.0, "eject candidate not present");
                    return Err(EjectResult::failed(candidate.clone(), status, None, None));
                }
            };

            let attempt = self.graph.request_eject(node);
            if attempt.status.is_success() {
                info!(id = %candidate, "eject accepted");
                Ok(EjectResult::succeeded(candidate.clone()))
            } else {
                debug!(
                    id = %candidate,
                    status = attempt.status.0,
                    veto = ?attempt.veto_type,
                    "eject refused, trying ancestor"
                );
                Err(EjectResult::failed(
                    candidate.clone(),
                    attempt.status,
                    attempt.veto_type,
                    attempt.veto_name,
                ))
            }
        });

        match resolved {
            Some(Ok(result) | Err(result)) => result,
            None => EjectResult::failed(target.clone(), ConfigRet::NO_SUCH_DEVNODE, None, None),
        }
    }
}
