//! Corpus parsing wired into the core hypergraph builder.

use kiji_core::{HypergraphBuilder, Role};
use kiji_providers_triples::parse_triples_str;

#[test]
fn parsed_corpus_builds_a_hypergraph() {
    let corpus = concat!(
        "# seed corpus\n",
        "acquired\tApple\tBeats\t1\n",
        "partnered with\tSony|Honda\tAfeela\t2\n",
        "\n",
        "sued\tDOJ\tApple\t3\n",
    );
    let triples = parse_triples_str(corpus).expect("corpus is well-formed");
    assert_eq!(triples.len(), 3);

    let mut builder = HypergraphBuilder::new();
    let rejected = builder.add_all(triples);
    assert_eq!(rejected, 0);
    let index = builder.finish();

    assert_eq!(index.edge_count(), 3);
    let apple = index.node_id("Apple").expect("Apple must be indexed");
    assert_eq!(index.degree(apple), 2);

    let partnership = index
        .edge_ids()
        .find(|&edge| index.verb(edge) == Some("partnered with"))
        .expect("partnership edge exists");
    assert_eq!(index.nodes_by_role(partnership, Role::Source).len(), 2);
}

#[test]
fn triples_without_participants_are_counted_not_fatal() {
    let corpus = "announced\t \t \t1\nacquired\tApple\tBeats\t2\n";
    let triples = parse_triples_str(corpus).expect("corpus is well-formed");
    assert_eq!(triples.len(), 2);

    let mut builder = HypergraphBuilder::new();
    let rejected = builder.add_all(triples);
    assert_eq!(rejected, 1);
    assert_eq!(builder.node_count(), 2);
}
