//! Device-node graph and ancestor walking
//!
//! The device tree links every node to the hub or controller it hangs
//! off. Storage nodes frequently lack the properties the manager wants,
//! so resolution walks upward: try the node itself, then each ancestor in
//! turn. The walk is bounded because device trees are normally shallow
//! (five levels or so) and corrupted topology data must not produce an
//! unbounded loop.

use model::{ConfigRet, DeviceId, VetoType};

/// Upper bound on ancestor-chain walks
pub const DEFAULT_MAX_ANCESTOR_DEPTH: usize = 10;

/// Opaque handle to one node in the device tree
///
/// Only valid against the graph that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(pub u64);

/// Outcome of one eject request against one node
#[derive(Debug, Clone, PartialEq)]
pub struct EjectAttempt {
    /// Raw status code; zero means the node accepted the eject
    pub status: ConfigRet,
    /// Veto reason class, when the OS reported one
    pub veto_type: Option<VetoType>,
    /// Name of the vetoing resource, when the OS reported one
    pub veto_name: Option<String>,
}

impl EjectAttempt {
    /// An attempt that succeeded
    pub fn success() -> Self {
        Self {
            status: ConfigRet::SUCCESS,
            veto_type: None,
            veto_name: None,
        }
    }
}

/// The OS device-node graph
pub trait DeviceNodeGraph {
    /// Find the present node for an instance id
    ///
    /// The error carries the raw status code, typically
    /// [`ConfigRet::NO_SUCH_DEVNODE`].
    fn locate(&self, instance_id: &DeviceId) -> std::result::Result<NodeHandle, ConfigRet>;

    /// The node one level up, or `None` at the root
    fn parent_of(&self, node: NodeHandle) -> Option<NodeHandle>;

    /// The instance id of a node, when readable
    fn instance_id_of(&self, node: NodeHandle) -> Option<String>;

    /// Ask the OS to eject a node
    fn request_eject(&self, node: NodeHandle) -> EjectAttempt;
}

/// Lazy walk over a node's ancestor instance ids
///
/// Starts at the immediate parent and stops at the first lookup failure,
/// a missing parent, or the depth bound. Never yields the starting id.
/// One pass per call; nothing is cached between calls.
pub struct Ancestors<'a> {
    graph: &'a dyn DeviceNodeGraph,
    current: Option<NodeHandle>,
    remaining: usize,
}

/// Walk the ancestors of `instance_id`, nearest first
pub fn ancestors<'a>(
    graph: &'a dyn DeviceNodeGraph,
    instance_id: &DeviceId,
    max_depth: usize,
) -> Ancestors<'a> {
    Ancestors {
        graph,
        current: graph.locate(instance_id).ok(),
        remaining: max_depth,
    }
}

impl Iterator for Ancestors<'_> {
    type Item = DeviceId;

    fn next(&mut self) -> Option<DeviceId> {
        if self.remaining == 0 {
            return None;
        }

        // take() keeps the iterator finished once any step fails
        let node = self.current.take()?;
        let parent = self.graph.parent_of(node)?;
        let raw_id = self.graph.instance_id_of(parent)?;
        let id = DeviceId::new(raw_id).ok()?;

        self.current = Some(parent);
        self.remaining -= 1;
        Some(id)
    }
}

/// The starting id followed by its ancestors
///
/// This self-first ordering is the backbone of every fallback algorithm
/// in the manager: prefer the most specific node's own data, fall back to
/// parents only on failure.
pub fn self_then_ancestors(
    graph: &dyn DeviceNodeGraph,
    instance_id: DeviceId,
    max_depth: usize,
) -> impl Iterator<Item = DeviceId> + '_ {
    let walk = ancestors(graph, &instance_id, max_depth);
    std::iter::once(instance_id).chain(walk)
}

/// Try `attempt` against each candidate until one succeeds
///
/// Returns the first `Ok`, otherwise the **last** `Err`; `None` only when
/// the candidate sequence is empty. Property lookup reads this as
/// "first non-absent value wins"; the eject engine reads it as "the
/// deepest ancestor's failure is the one worth reporting". Both behaviors
/// hang off this single combinator on purpose.
pub fn resolve_with_fallback<C, T, E, F>(candidates: C, mut attempt: F) -> Option<Result<T, E>>
where
    C: IntoIterator<Item = DeviceId>,
    F: FnMut(&DeviceId) -> Result<T, E>,
{
    let mut last_failure = None;
    for candidate in candidates {
        match attempt(&candidate) {
            Ok(value) => return Some(Ok(value)),
            Err(failure) => last_failure = Some(Err(failure)),
        }
    }
    last_failure
}
