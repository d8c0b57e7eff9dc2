use litsearch::core::config::QueryConfig;
use litsearch::query::{QueryNode, QueryParser};

fn parser() -> QueryParser {
    QueryParser::new(&QueryConfig::default()).unwrap()
}

#[test]
fn parsing_is_deterministic() {
    let parser = parser();
    let query = "Title:deep learning <AND> 2018..2020 <OR> <NOT> kernel";
    let first = parser.parse(query);
    for _ in 0..10 {
        assert_eq!(parser.parse(query), first);
    }
}

#[test]
fn and_binds_weaker_than_or() {
    let node = parser().parse("graph <AND> kernel <OR> brain");
    let QueryNode::And(elements) = node else {
        panic!("expected AND at the root");
    };
    assert_eq!(elements.len(), 2);
    assert_eq!(elements[0], QueryNode::And(vec![QueryNode::leaf("graph")]));
    assert_eq!(elements[1], QueryNode::or(vec![
        QueryNode::And(vec![QueryNode::leaf("kernel")]),
        QueryNode::And(vec![QueryNode::leaf("brain")]),
    ]));
}

#[test]
fn not_binds_tightest() {
    let node = parser().parse("graph <OR> <NOT> kernel");
    assert_eq!(node, QueryNode::or(vec![
        QueryNode::And(vec![QueryNode::leaf("graph")]),
        QueryNode::not(QueryNode::And(vec![QueryNode::leaf("kernel")])),
    ]));
}

#[test]
fn person_name_tries_both_orders_then_keywords() {
    let node = parser().parse("Smith John");
    assert_eq!(node, QueryNode::optional_or(vec![
        QueryNode::And(vec![QueryNode::leaf("author.fullname:smith john")]),
        QueryNode::And(vec![QueryNode::leaf("author.fullname:john smith")]),
        QueryNode::And(vec![QueryNode::leaf("smith john")]),
    ], 1));
}

#[test]
fn name_inside_longer_text_is_keywords() {
    let node = parser().parse("graph kernel by John Smith");
    assert!(!node.terms().iter().any(|t| t.starts_with("author.")));
}

#[test]
fn title_case_topic_is_not_an_author() {
    let parser = parser();
    let node = parser.parse("Graph Neural Networks");
    assert_eq!(node, parser.parse("graph neural networks"));
    assert!(!node.terms().iter().any(|t| t.starts_with("author.")));
    assert!(!node.terms().is_empty());

    let node = parser.parse("John Smith");
    assert!(node.terms().contains(&"author.fullname:john smith"));
}

#[test]
fn blank_query_matches_everything() {
    assert!(parser().parse("   ").is_match_all());
    assert!(parser().parse("<AND>").is_match_all());
}
