use cypher_bolt::prelude::*;
use cypher_bolt::qb::expr::Expression;
use cypher_bolt::qb::pattern::{Direction, PatternElement};
use cypher_bolt::qb::value::Value;

#[test]
fn match_with_property_filter_renders_and_interns_one_parameter() {
    let query = Query::new()
        .match_clause(vec![node()
            .alias("person")
            .label("Person")
            .prop("name", Expression::literal("Alice"))
            .into()])
        .unwrap()
        .return_(vec![Expression::prop("person", "name")], false);

    let (text, params) = query.build();

    assert_eq!(text, "MATCH (person:Person {name: $p1})\nRETURN person.name");
    assert_eq!(params.get("p1"), Some(&Value::String("Alice".to_string())));
    assert_eq!(params.len(), 1);
}

#[test]
fn skip_and_limit_render_in_canonical_order_regardless_of_call_order() {
    let forwards = Query::new()
        .match_clause(vec![node().alias("n").into()])
        .unwrap()
        .return_(vec![Expression::var("n")], false)
        .skip(10)
        .limit(5)
        .build();

    let backwards = Query::new()
        .match_clause(vec![node().alias("n").into()])
        .unwrap()
        .return_(vec![Expression::var("n")], false)
        .limit(5)
        .skip(10)
        .build();

    assert_eq!(forwards.0, "MATCH (n)\nRETURN n\nSKIP $p1\nLIMIT $p2");
    assert_eq!(forwards, backwards);
}

#[test]
fn repeating_a_path_pattern_reuses_its_literal_parameter() {
    let build_path = || {
        path(vec![
            PatternElement::Node(
                node().alias("person").label("Person").prop("name", Expression::literal("Alice")),
            ),
            PatternElement::Relationship(rel().rel_type("KNOWS").direction(Direction::Out)),
            PatternElement::Node(node().alias("friend").label("Person")),
        ])
        .unwrap()
    };

    let query = Query::new()
        .match_clause(vec![build_path().into()])
        .unwrap()
        .optional_match(vec![build_path().into()])
        .unwrap()
        .return_(vec![Expression::prop("friend", "name")], false);

    let (text, params) = query.build();
    assert!(text.contains("\nOPTIONAL MATCH "));
    assert_eq!(params.len(), 1);
    assert_eq!(params.get("p1"), Some(&Value::String("Alice".to_string())));
}

#[test]
fn match_path_binds_a_path_variable_and_optional_match_renders_the_keyword() {
    let query = Query::new()
        .match_path(
            "p",
            vec![
                node().alias("person").label("Person").prop("name", Expression::literal("Alice")).into(),
            ],
            false,
        )
        .unwrap()
        .return_(vec![Expression::var("p")], false);

    let (text, _params) = query.build();
    assert_eq!(text, "MATCH p = (person:Person {name: $p1})\nRETURN p");
}

#[test]
fn alias_conflict_between_incompatible_label_sets_is_rejected() {
    let result = Query::new()
        .match_clause(vec![node().alias("n").label("Person").into()])
        .unwrap()
        .match_clause(vec![node().alias("n").label("Movie").into()]);

    assert!(result.is_err());
}

#[test]
fn call_subquery_renders_nested_clauses_against_the_outer_parameter_table() {
    let inner = Query::new()
        .match_clause(vec![node().alias("m").label("Movie").into()])
        .unwrap()
        .return_(vec![Expression::var("m")], false);

    let outer = Query::new()
        .match_clause(vec![node().alias("n").into()])
        .unwrap()
        .call_subquery(inner);

    let (text, _params) = outer.build();
    assert!(text.contains("CALL {\nMATCH (m:Movie)\nRETURN m\n}"));
}
