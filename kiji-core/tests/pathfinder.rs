//! Multi-hop path search over a shared index.

use kiji_core::{
    CancelToken, HypergraphBuilder, HypergraphIndex, NodeId, PathFinder, PathQuery, Triple,
};

fn corpus() -> HypergraphIndex {
    let mut builder = HypergraphBuilder::new();
    let rejected = builder.add_all(vec![
        Triple::new("announced", ["A"], ["B"], 1),
        Triple::new("launched", ["B"], ["C"], 2),
        Triple::new("partnered with", ["A"], ["D"], 3),
        Triple::new("supplies", ["D"], ["C"], 4),
        Triple::new("regulates", ["X"], ["Y"], 5),
    ]);
    assert_eq!(rejected, 0);
    builder.finish()
}

fn id(index: &HypergraphIndex, label: &str) -> NodeId {
    index.node_id(label).expect("label must be indexed")
}

#[test]
fn bridged_concepts_yield_a_two_edge_path_through_the_bridge() {
    let index = corpus();
    let query = PathQuery::new(vec![id(&index, "A"), id(&index, "C")])
        .with_intersection_threshold(1)
        .with_max_paths(3)
        .with_max_depth(4);
    let paths = PathFinder::new(&index).find_paths(&query, &CancelToken::new());

    assert!(!paths.is_empty());
    // Both the B-bridge and the D-bridge are shortest (two edges).
    assert_eq!(paths.len(), 2);
    let bridges: Vec<&str> = paths
        .iter()
        .map(|path| path.intersections[0][0].as_str())
        .collect();
    assert!(bridges.contains(&"B"));
    assert!(bridges.contains(&"D"));
    for path in &paths {
        assert_eq!(path.edges.len(), 2);
        assert_eq!(path.source, "A");
        assert_eq!(path.target, "C");
        assert!(index.nodes_of(path.edges[0]).contains(&id(&index, "A")));
        assert!(index
            .nodes_of(*path.edges.last().expect("paths are non-empty"))
            .contains(&id(&index, "C")));
    }
}

#[test]
fn max_paths_caps_enumeration() {
    let index = corpus();
    let query = PathQuery::new(vec![id(&index, "A"), id(&index, "C")]).with_max_paths(1);
    let paths = PathFinder::new(&index).find_paths(&query, &CancelToken::new());
    assert_eq!(paths.len(), 1);
}

#[test]
fn every_returned_path_respects_the_intersection_threshold() {
    let index = corpus();
    for s in 1..=2 {
        let query = PathQuery::new(vec![id(&index, "A"), id(&index, "C")])
            .with_intersection_threshold(s);
        for path in PathFinder::new(&index).find_paths(&query, &CancelToken::new()) {
            assert!(path.edges.len() <= query.max_depth + 1);
            for pair in path.edges.windows(2) {
                assert!(index.shared_nodes(pair[0], pair[1]).len() >= s);
            }
        }
    }
}

#[test]
fn disconnected_concepts_yield_nothing() {
    let index = corpus();
    let query = PathQuery::new(vec![id(&index, "A"), id(&index, "Y")]);
    assert!(PathFinder::new(&index)
        .find_paths(&query, &CancelToken::new())
        .is_empty());
}

#[test]
fn three_concepts_search_every_unordered_pair() {
    let index = corpus();
    let query = PathQuery::new(vec![id(&index, "A"), id(&index, "C"), id(&index, "Y")]);
    let paths = PathFinder::new(&index).find_paths(&query, &CancelToken::new());
    // A↔C connects (twice); A↔Y and C↔Y do not.
    assert_eq!(paths.len(), 2);
    assert!(paths.iter().all(|p| p.source == "A" && p.target == "C"));
}

#[test]
fn relations_follow_edge_order() {
    let index = corpus();
    let query = PathQuery::new(vec![id(&index, "A"), id(&index, "C")]).with_max_paths(10);
    let paths = PathFinder::new(&index).find_paths(&query, &CancelToken::new());
    for path in paths {
        assert_eq!(path.relations.len(), path.edges.len());
        for (edge, relation) in path.edges.iter().zip(path.relations.iter()) {
            assert_eq!(index.verb(*edge), Some(relation.as_str()));
        }
    }
}
