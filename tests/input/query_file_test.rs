// tests/input/query_file_test.rs
use upbound::input::{InputError, QueryFile};
use upbound::model::{Bound, CompareOp, FilterHint};
use upbound::planner::{BoundOptimizer, PlanError};
use upbound::stats::StatisticsProvider;

const TOML_QUERY: &str = r#"
[statistics.a]
row_count = 1000
columns.id = { distinct_count = 1000, max_frequency = 1 }

[statistics.b]
row_count = 50
columns.a_id = { distinct_count = 50, max_frequency = 1 }

[query]
relations = [
    { name = "a" },
    { name = "b", filters = [{ selectivity = 0.5 }] },
]
predicates = [{ left = "a.id", right = "b.a_id" }]
"#;

const JSON_QUERY: &str = r#"{
  "statistics": {
    "a": { "row_count": 1000, "columns": { "id": { "distinct_count": 1000, "max_frequency": 1 } } },
    "b": { "row_count": 50, "columns": { "a_id": { "distinct_count": 50, "max_frequency": 1 } } }
  },
  "query": {
    "relations": [{ "name": "a" }, { "name": "b", "filters": [{ "selectivity": 0.5 }] }],
    "predicates": [{ "left": "a.id", "op": "=", "right": "b.a_id" }]
  }
}"#;

#[test]
fn test_parse_toml_query_file() {
    let file = QueryFile::from_toml_str(TOML_QUERY).unwrap();

    assert_eq!(file.statistics.table_count(), 2);
    assert_eq!(file.statistics.row_count("b"), Some(50));
    assert_eq!(file.query.relations.len(), 2);
    assert_eq!(file.query.relations[1].filters, vec![FilterHint::Selectivity(0.5)]);
    assert_eq!(file.query.predicates[0].op, CompareOp::Eq);
    assert_eq!(file.query.predicates[0].to_string(), "a.id = b.a_id");
}

#[test]
fn test_toml_and_json_agree() {
    let toml = QueryFile::from_toml_str(TOML_QUERY).unwrap();
    let json = QueryFile::from_json_str(JSON_QUERY).unwrap();

    assert_eq!(toml, json);
}

#[test]
fn test_optimize_parsed_query() {
    let file = QueryFile::from_json_str(JSON_QUERY).unwrap();
    let plan = BoundOptimizer::default()
        .optimize_query(&file.query, &file.statistics)
        .unwrap();

    assert_eq!(plan.bound(), Bound::new(25));
}

#[test]
fn test_non_equi_operator_parses_but_does_not_optimize() {
    let json = JSON_QUERY.replace(r#""op": "=""#, r#""op": "<""#);
    let file = QueryFile::from_json_str(&json).unwrap();

    assert_eq!(file.query.predicates[0].op, CompareOp::Lt);
    let result = BoundOptimizer::default().optimize_query(&file.query, &file.statistics);
    assert!(matches!(result, Err(PlanError::MalformedQuery(_))));
}

#[test]
fn test_bad_column_reference() {
    let toml = TOML_QUERY.replace("right = \"b.a_id\"", "right = \"a_id\"");
    assert!(matches!(
        QueryFile::from_toml_str(&toml),
        Err(InputError::Toml(_))
    ));
}

#[test]
fn test_invalid_json() {
    assert!(matches!(
        QueryFile::from_json_str("{ \"query\": "),
        Err(InputError::Json(_))
    ));
}

#[test]
fn test_unsupported_extension() {
    let result = QueryFile::from_file("query.yaml");
    assert!(matches!(result, Err(InputError::UnsupportedFormat(_))));
}

#[test]
fn test_missing_file() {
    let result = QueryFile::from_file("/nonexistent/query.toml");
    assert!(matches!(result, Err(InputError::Read { .. })));
}

#[test]
fn test_demo_file() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/star.toml");
    let file = QueryFile::from_file(path).unwrap();

    let plan = BoundOptimizer::default()
        .optimize_query(&file.query, &file.statistics)
        .unwrap();

    assert_eq!(plan.join_order(), vec!["customer", "orders", "lineitem"]);
    assert_eq!(plan.bound(), Bound::new(8400));
}
