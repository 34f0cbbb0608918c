//! In-memory hypergraph of Subject–Verb–Object facts.
//!
//! Each extracted triple becomes one hyperedge connecting any number of
//! role-tagged nodes. The index is sealed by [`HypergraphBuilder::finish`]
//! and read-only afterwards: every accessor takes `&self`, so a single index
//! can be shared across concurrent readers (the vectorizer, the path finder,
//! and the layout all borrow the same instance).

mod builder;

use std::fmt;

pub use self::builder::{HypergraphBuilder, HypergraphError, Triple};

/// Stable identifier of a node (entity) in the hypergraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Creates a node identifier.
    #[rustfmt::skip]
    #[must_use]
    pub const fn new(id: u64) -> Self { Self(id) }

    /// Returns the underlying numeric identifier.
    #[rustfmt::skip]
    #[must_use]
    pub const fn get(self) -> u64 { self.0 }

    #[rustfmt::skip]
    pub(crate) const fn index(self) -> usize { self.0 as usize }
}

/// Stable identifier of a hyperedge (event).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(u64);

impl EdgeId {
    /// Creates an edge identifier.
    #[rustfmt::skip]
    #[must_use]
    pub const fn new(id: u64) -> Self { Self(id) }

    /// Returns the underlying numeric identifier.
    #[rustfmt::skip]
    #[must_use]
    pub const fn get(self) -> u64 { self.0 }

    #[rustfmt::skip]
    pub(crate) const fn index(self) -> usize { self.0 as usize }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Role a node plays inside a hyperedge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Subject side of the relation.
    Source,
    /// Object side of the relation.
    Target,
    /// Contextual participant without subject/object semantics.
    Member,
}

impl Role {
    /// Returns the stable lowercase name of this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Target => "target",
            Self::Member => "member",
        }
    }
}

/// One node participation in a hyperedge.
///
/// `position` preserves the order participants appeared in within a role and
/// is the tie-breaker for role-scoped listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Incidence {
    /// Participating node.
    pub node: NodeId,
    /// Role the node plays in this edge.
    pub role: Role,
    /// Zero-based order within the role.
    pub position: u32,
}

/// Immutable bidirectional node↔edge index with role-typed incidences.
#[derive(Debug, Clone)]
pub struct HypergraphIndex {
    node_labels: Vec<String>,
    node_types: Vec<Option<String>>,
    node_edges: Vec<Vec<EdgeId>>,
    edge_verbs: Vec<String>,
    edge_chunks: Vec<u64>,
    edge_incidences: Vec<Vec<Incidence>>,
    // Sorted, deduplicated participant sets per edge; kept separate from the
    // ordered incidences so set intersections stay a linear merge.
    edge_nodes: Vec<Vec<NodeId>>,
}

impl HypergraphIndex {
    /// Returns the number of nodes in the index.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.node_labels.len()
    }

    /// Returns the number of hyperedges in the index.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_verbs.len()
    }

    /// Iterates every edge identifier in ascending order.
    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> + '_ {
        (0..self.edge_verbs.len()).map(|id| EdgeId::new(id as u64))
    }

    /// Iterates every node identifier in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.node_labels.len()).map(|id| NodeId::new(id as u64))
    }

    /// Returns the edges incident to `node`, in ascending edge order.
    #[must_use]
    pub fn edges_of(&self, node: NodeId) -> &[EdgeId] {
        self.node_edges
            .get(node.index())
            .map_or(&[], Vec::as_slice)
    }

    /// Returns the deduplicated participant set of `edge`, sorted ascending.
    #[must_use]
    pub fn nodes_of(&self, edge: EdgeId) -> &[NodeId] {
        self.edge_nodes
            .get(edge.index())
            .map_or(&[], Vec::as_slice)
    }

    /// Returns the ordered incidences of `edge`.
    #[must_use]
    pub fn incidences_of(&self, edge: EdgeId) -> &[Incidence] {
        self.edge_incidences
            .get(edge.index())
            .map_or(&[], Vec::as_slice)
    }

    /// Returns the nodes playing `role` in `edge`, ordered by position.
    #[must_use]
    pub fn nodes_by_role(&self, edge: EdgeId, role: Role) -> Vec<NodeId> {
        self.incidences_of(edge)
            .iter()
            .filter(|incidence| incidence.role == role)
            .map(|incidence| incidence.node)
            .collect()
    }

    /// Returns the label of `node`, or `None` for an unknown identifier.
    #[must_use]
    pub fn node_label(&self, node: NodeId) -> Option<&str> {
        self.node_labels.get(node.index()).map(String::as_str)
    }

    /// Returns the optional type string recorded for `node`.
    #[must_use]
    pub fn node_type(&self, node: NodeId) -> Option<&str> {
        self.node_types
            .get(node.index())
            .and_then(|ty| ty.as_deref())
    }

    /// Returns the verb of `edge`, or `None` for an unknown identifier.
    #[must_use]
    pub fn verb(&self, edge: EdgeId) -> Option<&str> {
        self.edge_verbs.get(edge.index()).map(String::as_str)
    }

    /// Returns the source-chunk identifier of `edge`.
    #[must_use]
    pub fn chunk_of(&self, edge: EdgeId) -> Option<u64> {
        self.edge_chunks.get(edge.index()).copied()
    }

    /// Resolves a case-sensitive label to its node identifier.
    #[must_use]
    pub fn node_id(&self, label: &str) -> Option<NodeId> {
        // Linear probe over the label table; label lookup sits outside the
        // per-edge hot loops so an extra map is not worth carrying.
        self.node_labels
            .iter()
            .position(|candidate| candidate == label)
            .map(|index| NodeId::new(index as u64))
    }

    /// Returns the document frequency of `node`: the number of incident edges.
    #[must_use]
    pub fn degree(&self, node: NodeId) -> usize {
        self.edges_of(node).len()
    }

    /// Returns the edges sharing at least `s` nodes with `edge`, ascending.
    ///
    /// `edge` itself is never part of the result. A threshold of zero is
    /// treated as one: every edge trivially shares zero nodes with all
    /// others.
    #[must_use]
    pub fn neighbor_edges(&self, edge: EdgeId, s: usize) -> Vec<EdgeId> {
        let threshold = s.max(1);
        let mut shared: Vec<(EdgeId, usize)> = Vec::new();
        for &node in self.nodes_of(edge) {
            for &other in self.edges_of(node) {
                if other == edge {
                    continue;
                }
                match shared.binary_search_by_key(&other, |&(id, _)| id) {
                    Ok(found) => shared[found].1 += 1,
                    Err(slot) => shared.insert(slot, (other, 1)),
                }
            }
        }
        shared
            .into_iter()
            .filter(|&(_, count)| count >= threshold)
            .map(|(id, _)| id)
            .collect()
    }

    /// Returns the sorted intersection of two edges' participant sets.
    #[must_use]
    pub fn shared_nodes(&self, left: EdgeId, right: EdgeId) -> Vec<NodeId> {
        let mut lhs = self.nodes_of(left).iter();
        let mut rhs = self.nodes_of(right).iter();
        let mut out = Vec::new();
        let (mut a, mut b) = (lhs.next(), rhs.next());
        while let (Some(&l), Some(&r)) = (a, b) {
            match l.cmp(&r) {
                std::cmp::Ordering::Less => a = lhs.next(),
                std::cmp::Ordering::Greater => b = rhs.next(),
                std::cmp::Ordering::Equal => {
                    out.push(l);
                    a = lhs.next();
                    b = rhs.next();
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> HypergraphIndex {
        let mut builder = HypergraphBuilder::new();
        let rejected = builder.add_all(vec![
            Triple::new("acquired", ["Apple"], ["Beats"], 1),
            Triple::new("launched", ["Apple"], ["Vision Pro"], 2),
            Triple::new("sued", ["DOJ"], ["Apple"], 3),
        ]);
        assert_eq!(rejected, 0);
        builder.finish()
    }

    #[test]
    fn bidirectional_lookups_agree() {
        let index = sample_index();
        assert_eq!(index.edge_count(), 3);
        let apple = index.node_id("Apple").expect("Apple must be indexed");
        assert_eq!(index.degree(apple), 3);
        for &edge in index.edges_of(apple) {
            assert!(index.nodes_of(edge).contains(&apple));
        }
        assert_eq!(index.chunk_of(EdgeId::new(2)), Some(3));
        assert_eq!(index.verb(EdgeId::new(0)), Some("acquired"));
    }

    #[test]
    fn labels_are_case_sensitive() {
        let index = sample_index();
        assert!(index.node_id("Apple").is_some());
        assert!(index.node_id("apple").is_none());
    }

    #[test]
    fn roles_preserve_position_order() {
        let mut builder = HypergraphBuilder::new();
        builder
            .add_triple(Triple::new("partnered with", ["Sony", "Honda"], ["Afeela"], 9))
            .expect("triple has participants");
        let index = builder.finish();
        let edge = EdgeId::new(0);
        let sources = index.nodes_by_role(edge, Role::Source);
        assert_eq!(index.node_label(sources[0]), Some("Sony"));
        assert_eq!(index.node_label(sources[1]), Some("Honda"));
        assert_eq!(index.nodes_by_role(edge, Role::Member), Vec::new());
    }

    #[test]
    fn neighbor_edges_respect_threshold() {
        let index = sample_index();
        // Edges 0, 1, and 2 all share exactly one node (Apple).
        let neighbours = index.neighbor_edges(EdgeId::new(0), 1);
        assert_eq!(neighbours, vec![EdgeId::new(1), EdgeId::new(2)]);
        assert!(index.neighbor_edges(EdgeId::new(0), 2).is_empty());
    }

    #[test]
    fn shared_nodes_is_a_sorted_intersection() {
        let index = sample_index();
        let shared = index.shared_nodes(EdgeId::new(0), EdgeId::new(1));
        assert_eq!(shared.len(), 1);
        assert_eq!(index.node_label(shared[0]), Some("Apple"));
    }
}
