// tests/planner/join_graph_test.rs
use upbound::model::{ColumnRef, CompareOp, FilterHint, JoinPredicate, JoinQuery, RelationRef};
use upbound::planner::join_optimizer::join_graph::*;
use upbound::planner::PlanError;
use upbound::stats::{StatisticsContext, TableStatistics};

fn col(s: &str) -> ColumnRef {
    s.parse().unwrap()
}

fn star_stats() -> StatisticsContext {
    StatisticsContext::new()
        .with_table(
            "customer",
            TableStatistics::new(1500)
                .with_column("id", 1500, 1)
                .with_column("nation", 25, 80),
        )
        .with_table(
            "orders",
            TableStatistics::new(15000)
                .with_column("id", 15000, 1)
                .with_column("customer_id", 1000, 40),
        )
        .with_table(
            "lineitem",
            TableStatistics::new(60000).with_column("order_id", 15000, 7),
        )
}

fn star_query() -> JoinQuery {
    JoinQuery::new()
        .relation(RelationRef::new("customer"))
        .relation(RelationRef::new("orders"))
        .relation(RelationRef::new("lineitem"))
        .equi_join(col("orders.customer_id"), col("customer.id"))
        .equi_join(col("lineitem.order_id"), col("orders.id"))
}

fn build(query: &JoinQuery) -> Result<JoinGraph, PlanError> {
    JoinGraphBuilder::new(&star_stats()).build(query)
}

#[test]
fn test_build_star_graph() {
    let graph = build(&star_query()).unwrap();

    assert_eq!(graph.relation_count(), 3);
    assert_eq!(graph.edge_count(), 2);
    assert!(graph.is_connected());
    assert_eq!(
        graph.relation_names().collect::<Vec<_>>(),
        vec!["customer", "lineitem", "orders"]
    );
}

#[test]
fn test_edges_are_normalized_and_numbered_in_order() {
    let graph = build(&star_query()).unwrap();
    let edges = graph.edges();

    assert_eq!(edges[0].id, EdgeId(0));
    assert_eq!(edges[0].to_string(), "customer.id = orders.customer_id");
    assert_eq!(edges[1].id, EdgeId(1));
    assert_eq!(edges[1].to_string(), "lineitem.order_id = orders.id");
}

#[test]
fn test_edge_ids_do_not_depend_on_predicate_order() {
    let reordered = JoinQuery::new()
        .relation(RelationRef::new("lineitem"))
        .relation(RelationRef::new("orders"))
        .relation(RelationRef::new("customer"))
        .equi_join(col("orders.id"), col("lineitem.order_id"))
        .equi_join(col("customer.id"), col("orders.customer_id"));

    let a = build(&star_query()).unwrap();
    let b = build(&reordered).unwrap();

    assert_eq!(a.edges(), b.edges());
}

#[test]
fn test_duplicate_predicates_collapse() {
    let query = star_query().equi_join(col("customer.id"), col("orders.customer_id"));
    let graph = build(&query).unwrap();

    assert_eq!(graph.edge_count(), 2);
}

#[test]
fn test_edge_lookup_helpers() {
    let graph = build(&star_query()).unwrap();
    let edge = graph.edge(EdgeId(1)).unwrap();

    assert!(edge.touches("orders"));
    assert!(!edge.touches("customer"));
    assert_eq!(edge.column_on("orders"), Some(&col("orders.id")));
    assert_eq!(edge.opposite("orders"), Some(&col("lineitem.order_id")));
    assert_eq!(graph.edges_of("orders").len(), 2);
    assert!(graph.are_joinable("customer", "orders"));
    assert!(!graph.are_joinable("customer", "lineitem"));
}

#[test]
fn test_filters_are_folded_into_relations() {
    let mut query = star_query();
    query.relations[0] = RelationRef::new("customer").with_filter(FilterHint::RowCount(30));
    let graph = build(&query).unwrap();

    let customer = graph.relation("customer").unwrap();
    assert_eq!(customer.cardinality, 30);
    assert!(customer.filtered);
    let id = customer.column("id").unwrap();
    assert_eq!(id.distinct_count, 30);
    assert_eq!(id.max_frequency, 1);
    assert!(id.unique);

    let orders = graph.relation("orders").unwrap();
    assert_eq!(orders.cardinality, 15000);
    assert!(!orders.filtered);
}

#[test]
fn test_selectivity_filter_rounds_up() {
    let mut query = star_query();
    query.relations[1] = RelationRef::new("orders").with_filter(FilterHint::Selectivity(0.0001));
    let graph = build(&query).unwrap();

    // 15000 * 0.0001 = 1.5
    assert_eq!(graph.relation("orders").unwrap().cardinality, 2);
}

#[test]
fn test_only_join_columns_are_kept() {
    let graph = build(&star_query()).unwrap();
    let customer = graph.relation("customer").unwrap();

    assert!(customer.column("id").is_some());
    assert!(customer.column("nation").is_none());
}

#[test]
fn test_self_join_through_aliases() {
    let stats = StatisticsContext::new().with_table(
        "employee",
        TableStatistics::new(500)
            .with_column("id", 500, 1)
            .with_column("manager_id", 40, 25),
    );
    let query = JoinQuery::new()
        .relation(RelationRef::new("e").on_table("employee"))
        .relation(RelationRef::new("m").on_table("employee"))
        .equi_join(col("e.manager_id"), col("m.id"));

    let graph = JoinGraphBuilder::new(&stats).build(&query).unwrap();

    assert_eq!(graph.relation_count(), 2);
    assert_eq!(graph.relation("e").unwrap().table, "employee");
    assert_eq!(graph.edges()[0].to_string(), "e.manager_id = m.id");
}

#[test]
fn test_connected_subgraphs() {
    let stats = StatisticsContext::new()
        .with_table("a", TableStatistics::new(10).with_column("id", 10, 1))
        .with_table("b", TableStatistics::new(20).with_column("a_id", 10, 2))
        .with_table("c", TableStatistics::new(7));
    let query = JoinQuery::new()
        .relation(RelationRef::new("c"))
        .relation(RelationRef::new("b"))
        .relation(RelationRef::new("a"))
        .equi_join(col("a.id"), col("b.a_id"));

    let graph = JoinGraphBuilder::new(&stats).build(&query).unwrap();

    assert!(!graph.is_connected());
    assert_eq!(
        graph.connected_subgraphs(),
        vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["c".to_string()]
        ]
    );
}

#[test]
fn test_empty_query_is_malformed() {
    let result = build(&JoinQuery::new());
    assert!(matches!(result, Err(PlanError::MalformedQuery(_))));
}

#[test]
fn test_duplicate_relation_is_malformed() {
    let query = star_query().relation(RelationRef::new("orders"));
    assert!(matches!(build(&query), Err(PlanError::MalformedQuery(_))));
}

#[test]
fn test_non_equi_predicate_is_malformed() {
    let query = star_query().predicate(JoinPredicate::new(
        col("customer.id"),
        CompareOp::Lt,
        col("orders.id"),
    ));

    let err = build(&query).unwrap_err();
    assert_eq!(
        err,
        PlanError::MalformedQuery(
            "unsupported non-equi join predicate: customer.id < orders.id".to_string()
        )
    );
}

#[test]
fn test_predicate_within_one_relation_is_malformed() {
    let query = star_query().equi_join(col("orders.id"), col("orders.customer_id"));
    assert!(matches!(build(&query), Err(PlanError::MalformedQuery(_))));
}

#[test]
fn test_unknown_relation_is_malformed() {
    let query = star_query().equi_join(col("part.id"), col("lineitem.order_id"));
    assert!(matches!(build(&query), Err(PlanError::MalformedQuery(_))));
}

#[test]
fn test_unknown_column_is_malformed() {
    let query = star_query().equi_join(col("customer.zip"), col("orders.id"));
    assert!(matches!(build(&query), Err(PlanError::MalformedQuery(_))));
}

#[test]
fn test_missing_row_count() {
    let stats = StatisticsContext::new()
        .with_table("a", TableStatistics::new(10).with_column("id", 10, 1))
        .with_table("b", TableStatistics::default().with_column("a_id", 5, 3));
    let query = JoinQuery::new()
        .relation(RelationRef::new("a"))
        .relation(RelationRef::new("b"))
        .equi_join(col("a.id"), col("b.a_id"));

    let err = JoinGraphBuilder::new(&stats).build(&query).unwrap_err();
    assert_eq!(
        err,
        PlanError::MissingStatistics {
            table: "b".to_string(),
            column: None,
        }
    );
    assert_eq!(err.to_string(), "Missing statistics for b");
}

#[test]
fn test_table_without_statistics() {
    let query = star_query().relation(RelationRef::new("part"));
    assert!(matches!(
        build(&query),
        Err(PlanError::MissingStatistics { column: None, .. })
    ));
}

#[test]
fn test_uncollected_join_column() {
    let stats = StatisticsContext::new()
        .with_table("a", TableStatistics::new(10).with_column("id", 10, 1))
        .with_table("b", TableStatistics::new(40).with_uncollected_column("a_id"));
    let query = JoinQuery::new()
        .relation(RelationRef::new("a"))
        .relation(RelationRef::new("b"))
        .equi_join(col("a.id"), col("b.a_id"));

    let err = JoinGraphBuilder::new(&stats).build(&query).unwrap_err();
    assert_eq!(
        err,
        PlanError::MissingStatistics {
            table: "b".to_string(),
            column: Some("a_id".to_string()),
        }
    );
    assert_eq!(err.to_string(), "Missing statistics for b.a_id");
}

#[test]
fn test_invalid_selectivity_is_malformed() {
    let mut query = star_query();
    query.relations[0] = RelationRef::new("customer").with_filter(FilterHint::Selectivity(2.0));
    assert!(matches!(build(&query), Err(PlanError::MalformedQuery(_))));
}
