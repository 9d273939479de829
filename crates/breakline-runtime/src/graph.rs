//! User call-graph membership for state reporting.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;

/// Static set of user-function names eligible for state reporting.
///
/// Built once when a debug session is configured and read-only afterward.
/// Library code and forwarding wrappers are never members.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallGraph {
    nodes: FxHashSet<SmolStr>,
}

impl CallGraph {
    /// Build a call graph from a set of function names.
    #[must_use]
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SmolStr>,
    {
        Self {
            nodes: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `name` belongs to the user call graph.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains(name)
    }

    /// Whether the graph has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
