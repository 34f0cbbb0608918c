//! Multi-hop reasoning paths between query concepts.
//!
//! A path is a chain of hyperedges in which consecutive edges share at
//! least `s` nodes. The finder runs a multi-source BFS seeded from every
//! edge containing the start concept and records, per discovered edge, the
//! set of parents that reached it at its minimum depth. That parent DAG is
//! then enumerated from each terminal edge, so all shortest edge-paths
//! surface, not just one per terminal. The finder only reads the index; a
//! cancelled search returns whatever paths were already reconstructed.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, instrument};

use crate::{
    cancel::CancelToken,
    hypergraph::{EdgeId, HypergraphIndex, NodeId},
};

/// Default cap on paths returned per concept pair.
pub const DEFAULT_MAX_PATHS: usize = 5;

/// Default cap on BFS depth (edges beyond the seed).
pub const DEFAULT_MAX_DEPTH: usize = 4;

/// A path query over two or more concepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathQuery {
    /// Concept node ids; every unordered pair is searched.
    pub nodes: Vec<NodeId>,
    /// Minimum number of shared nodes between consecutive edges.
    pub intersection_threshold: usize,
    /// Maximum paths returned per pair.
    pub max_paths: usize,
    /// Maximum BFS depth.
    pub max_depth: usize,
}

impl PathQuery {
    /// Creates a query with default thresholds.
    #[must_use]
    pub fn new(nodes: Vec<NodeId>) -> Self {
        Self {
            nodes,
            intersection_threshold: 1,
            max_paths: DEFAULT_MAX_PATHS,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Overrides the intersection threshold `s`.
    #[must_use]
    pub fn with_intersection_threshold(mut self, s: usize) -> Self {
        self.intersection_threshold = s;
        self
    }

    /// Overrides the per-pair path cap.
    #[must_use]
    pub fn with_max_paths(mut self, max_paths: usize) -> Self {
        self.max_paths = max_paths;
        self
    }

    /// Overrides the depth cap.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// One reconstructed reasoning path between two concepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningPath {
    /// Label of the start concept.
    pub source: String,
    /// Label of the end concept.
    pub target: String,
    /// Edge ids from an edge containing the source to one containing the target.
    pub edges: Vec<EdgeId>,
    /// Per-hop intersection labels; one entry per consecutive edge pair.
    pub intersections: Vec<Vec<String>>,
    /// Relation (verb) labels in edge order.
    pub relations: Vec<String>,
}

/// Read-only path search over a shared [`HypergraphIndex`].
#[derive(Debug, Clone, Copy)]
pub struct PathFinder<'a> {
    index: &'a HypergraphIndex,
}

impl<'a> PathFinder<'a> {
    /// Creates a finder over the given index.
    #[must_use]
    pub fn new(index: &'a HypergraphIndex) -> Self {
        Self { index }
    }

    /// Finds up to `max_paths` shortest edge-paths for every unordered pair.
    ///
    /// Disconnected pairs contribute nothing; a query with fewer than two
    /// nodes returns empty. Cancellation is polled between BFS layers and
    /// yields the paths found so far.
    #[instrument(
        name = "pathfinder.find",
        skip(self, cancel),
        fields(concepts = query.nodes.len(), s = query.intersection_threshold),
    )]
    #[must_use]
    pub fn find_paths(&self, query: &PathQuery, cancel: &CancelToken) -> Vec<ReasoningPath> {
        let mut paths = Vec::new();
        if query.nodes.len() < 2 {
            return paths;
        }

        for i in 0..query.nodes.len() {
            for j in (i + 1)..query.nodes.len() {
                let a = query.nodes[i];
                let b = query.nodes[j];
                if a == b {
                    continue;
                }
                if cancel.is_cancelled() {
                    return paths;
                }
                self.find_pair(a, b, query, cancel, &mut paths);
            }
        }
        paths
    }

    fn find_pair(
        &self,
        a: NodeId,
        b: NodeId,
        query: &PathQuery,
        cancel: &CancelToken,
        out: &mut Vec<ReasoningPath>,
    ) {
        let target_edges = self.index.edges_of(b);
        if target_edges.is_empty() {
            return;
        }

        let mut depth: HashMap<EdgeId, usize> = HashMap::new();
        let mut parents: HashMap<EdgeId, Vec<EdgeId>> = HashMap::new();
        let mut layer: VecDeque<EdgeId> = VecDeque::new();
        let mut terminals: Vec<EdgeId> = Vec::new();

        for &seed in self.index.edges_of(a) {
            depth.insert(seed, 0);
            layer.push_back(seed);
        }

        let mut current_depth = 0usize;
        while !layer.is_empty() {
            if cancel.is_cancelled() {
                debug!(pair = ?(a, b), depth = current_depth, "path search cancelled");
                break;
            }

            let mut next: VecDeque<EdgeId> = VecDeque::new();
            let mut found_terminal = false;
            for &edge in &layer {
                if target_edges.binary_search(&edge).is_ok() {
                    terminals.push(edge);
                    found_terminal = true;
                    continue;
                }
                if current_depth >= query.max_depth {
                    continue;
                }
                for neighbour in self
                    .index
                    .neighbor_edges(edge, query.intersection_threshold)
                {
                    match depth.get(&neighbour).copied() {
                        None => {
                            depth.insert(neighbour, current_depth + 1);
                            parents.insert(neighbour, vec![edge]);
                            next.push_back(neighbour);
                        }
                        Some(d) if d == current_depth + 1 => {
                            parents
                                .entry(neighbour)
                                .or_default()
                                .push(edge);
                        }
                        Some(_) => {}
                    }
                }
            }

            // Terminals end the search at this layer: deeper paths cannot be
            // shortest any more.
            if found_terminal {
                break;
            }
            layer = next;
            current_depth += 1;
        }

        terminals.sort_unstable();
        terminals.dedup();
        let mut pair_paths: Vec<Vec<EdgeId>> = Vec::new();
        for terminal in terminals {
            if pair_paths.len() >= query.max_paths {
                break;
            }
            let mut chain = vec![terminal];
            self.enumerate(terminal, &depth, &parents, query.max_paths, &mut chain, &mut pair_paths);
        }

        for chain in pair_paths {
            out.push(self.materialise(a, b, chain));
        }
    }

    /// Depth-first enumeration over the parent DAG; chains are bounded by
    /// `max_depth + 1`, so recursion depth is safe here.
    fn enumerate(
        &self,
        edge: EdgeId,
        depth: &HashMap<EdgeId, usize>,
        parents: &HashMap<EdgeId, Vec<EdgeId>>,
        max_paths: usize,
        chain: &mut Vec<EdgeId>,
        out: &mut Vec<Vec<EdgeId>>,
    ) {
        if out.len() >= max_paths {
            return;
        }
        if depth.get(&edge) == Some(&0) {
            let mut path = chain.clone();
            path.reverse();
            out.push(path);
            return;
        }
        let Some(edge_parents) = parents.get(&edge) else {
            return;
        };
        let mut ordered = edge_parents.clone();
        ordered.sort_unstable();
        for parent in ordered {
            chain.push(parent);
            self.enumerate(parent, depth, parents, max_paths, chain, out);
            chain.pop();
            if out.len() >= max_paths {
                return;
            }
        }
    }

    fn materialise(&self, a: NodeId, b: NodeId, edges: Vec<EdgeId>) -> ReasoningPath {
        let intersections = edges
            .windows(2)
            .map(|pair| {
                self.index
                    .shared_nodes(pair[0], pair[1])
                    .into_iter()
                    .filter_map(|node| self.index.node_label(node).map(str::to_owned))
                    .collect()
            })
            .collect();
        let relations = edges
            .iter()
            .map(|&edge| self.index.verb(edge).unwrap_or("").to_owned())
            .collect();

        ReasoningPath {
            source: self.index.node_label(a).unwrap_or("").to_owned(),
            target: self.index.node_label(b).unwrap_or("").to_owned(),
            edges,
            intersections,
            relations,
        }
    }
}
