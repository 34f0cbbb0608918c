//! Construction of the hypergraph index from extracted triples.
//!
//! The builder owns the only mutable phase of the index lifecycle. Nodes are
//! created on first mention of a case-sensitive label and never renumbered;
//! duplicate `(edge, node, role)` participations collapse to one incidence.

use std::collections::HashMap;

use thiserror::Error;

use super::{EdgeId, HypergraphIndex, Incidence, NodeId, Role};

/// One extracted Subject–Verb–Object fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple {
    /// Relation verb as extracted, case preserved.
    pub verb: String,
    /// Subject-side labels in extraction order.
    pub sources: Vec<String>,
    /// Object-side labels in extraction order.
    pub targets: Vec<String>,
    /// Contextual participants without subject/object semantics.
    pub members: Vec<String>,
    /// Identifier of the text chunk the triple came from.
    pub chunk_id: u64,
}

impl Triple {
    /// Creates a triple from verb, source labels, and target labels.
    ///
    /// # Examples
    /// ```
    /// use kiji_core::Triple;
    ///
    /// let triple = Triple::new("acquired", ["Apple"], ["Beats"], 42);
    /// assert_eq!(triple.sources, vec!["Apple".to_owned()]);
    /// ```
    #[must_use]
    pub fn new<S, T>(
        verb: impl Into<String>,
        sources: impl IntoIterator<Item = S>,
        targets: impl IntoIterator<Item = T>,
        chunk_id: u64,
    ) -> Self
    where
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            verb: verb.into(),
            sources: sources.into_iter().map(Into::into).collect(),
            targets: targets.into_iter().map(Into::into).collect(),
            members: Vec::new(),
            chunk_id,
        }
    }

    /// Attaches contextual member labels to the triple.
    #[must_use]
    pub fn with_members<M: Into<String>>(
        mut self,
        members: impl IntoIterator<Item = M>,
    ) -> Self {
        self.members = members.into_iter().map(Into::into).collect();
        self
    }
}

/// Errors raised while building the hypergraph index.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum HypergraphError {
    /// A triple carried no participant labels at all.
    #[error("triple with verb `{verb}` has no participants")]
    EmptyEdge {
        /// Verb of the rejected triple.
        verb: String,
    },
}

/// Accumulates triples and seals them into a [`HypergraphIndex`].
#[derive(Debug, Default)]
pub struct HypergraphBuilder {
    label_to_node: HashMap<String, NodeId>,
    node_labels: Vec<String>,
    node_types: Vec<Option<String>>,
    node_edges: Vec<Vec<EdgeId>>,
    edge_verbs: Vec<String>,
    edge_chunks: Vec<u64>,
    edge_incidences: Vec<Vec<Incidence>>,
}

impl HypergraphBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of nodes interned so far.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.node_labels.len()
    }

    fn intern_node(&mut self, label: &str) -> NodeId {
        if let Some(&node) = self.label_to_node.get(label) {
            return node;
        }
        let node = NodeId::new(self.node_labels.len() as u64);
        self.label_to_node.insert(label.to_owned(), node);
        self.node_labels.push(label.to_owned());
        self.node_types.push(None);
        self.node_edges.push(Vec::new());
        node
    }

    /// Records an optional type string for a label, interning it if needed.
    pub fn set_node_type(&mut self, label: &str, node_type: impl Into<String>) {
        let node = self.intern_node(label);
        self.node_types[node.index()] = Some(node_type.into());
    }

    /// Adds one triple as a new hyperedge.
    ///
    /// Duplicate `(node, role)` participations within the triple collapse to
    /// a single incidence; positions count distinct participations per role.
    ///
    /// # Errors
    /// Returns [`HypergraphError::EmptyEdge`] when the triple has no
    /// participant labels in any role.
    pub fn add_triple(&mut self, triple: Triple) -> Result<EdgeId, HypergraphError> {
        if triple.sources.is_empty() && triple.targets.is_empty() && triple.members.is_empty() {
            return Err(HypergraphError::EmptyEdge { verb: triple.verb });
        }

        let edge = EdgeId::new(self.edge_verbs.len() as u64);
        let mut incidences: Vec<Incidence> = Vec::new();

        for (role, labels) in [
            (Role::Source, &triple.sources),
            (Role::Target, &triple.targets),
            (Role::Member, &triple.members),
        ] {
            let mut position = 0u32;
            for label in labels {
                let node = self.intern_node(label);
                let duplicate = incidences
                    .iter()
                    .any(|existing| existing.node == node && existing.role == role);
                if duplicate {
                    continue;
                }
                incidences.push(Incidence {
                    node,
                    role,
                    position,
                });
                position += 1;
            }
        }

        for incidence in &incidences {
            let edges = &mut self.node_edges[incidence.node.index()];
            if edges.last() != Some(&edge) {
                edges.push(edge);
            }
        }

        self.edge_verbs.push(triple.verb);
        self.edge_chunks.push(triple.chunk_id);
        self.edge_incidences.push(incidences);
        Ok(edge)
    }

    /// Adds every triple from an iterator, dropping empty ones with a count.
    ///
    /// Returns the number of rejected triples. This is the ingestion shape
    /// collaborating triple sources use: extraction noise should not abort a
    /// whole corpus.
    pub fn add_all(&mut self, triples: impl IntoIterator<Item = Triple>) -> usize {
        let mut rejected = 0usize;
        for triple in triples {
            if self.add_triple(triple).is_err() {
                rejected += 1;
            }
        }
        rejected
    }

    /// Seals the builder into an immutable index.
    #[must_use]
    pub fn finish(self) -> HypergraphIndex {
        let edge_nodes = self
            .edge_incidences
            .iter()
            .map(|incidences| {
                let mut nodes: Vec<NodeId> =
                    incidences.iter().map(|incidence| incidence.node).collect();
                nodes.sort_unstable();
                nodes.dedup();
                nodes
            })
            .collect();

        HypergraphIndex {
            node_labels: self.node_labels,
            node_types: self.node_types,
            node_edges: self.node_edges,
            edge_verbs: self.edge_verbs,
            edge_chunks: self.edge_chunks,
            edge_incidences: self.edge_incidences,
            edge_nodes,
        }
    }
}
