// tests/compile_tests.rs

use abcd::{
    Backend, Compile, Config, Record, Value,
    compile::{self, DocumentCompiler, SearchCompiler, search::DATE_FORMAT},
    parse,
};
use serde_json::{Value as Json, json};

fn document(query: &str) -> Json {
    DocumentCompiler.compile(&parse(query).unwrap()).unwrap()
}

fn search(query: &str) -> Json {
    SearchCompiler::new("keyword")
        .compile(&parse(query).unwrap())
        .unwrap()
}

// ============================================================================
// Document Store
// ============================================================================

#[test]
fn test_document_comparisons() {
    let test_cases = vec![
        ("energy < -10", json!({"energy": {"$lt": -10}})),
        ("energy <= 1.5", json!({"energy": {"$lte": 1.5}})),
        ("n_atoms > 8", json!({"n_atoms": {"$gt": 8}})),
        ("n_atoms >= 8", json!({"n_atoms": {"$gte": 8}})),
        ("name = \"x\"", json!({"name": {"$eq": "x"}})),
        (
            "name != \"x\"",
            json!({"$nor": [{"name": {"$eq": "x"}}]}),
        ),
        (
            "all(name) != \"x\"",
            json!({"$and": [
                {"$nor": [
                    {"name": {"$elemMatch": {"$not": {"$ne": "x"}}}},
                    {"name": {"$ne": [], "$not": {"$ne": "x"}}},
                ]},
                {"$or": [
                    {"name": {"$elemMatch": {"$ne": "x"}}},
                    {"name": {"$exists": true, "$not": {"$type": "array"}, "$ne": "x"}},
                ]},
            ]}),
        ),
        (
            "config_type ~= \"^bulk\"",
            json!({"config_type": {"$regex": "^bulk"}}),
        ),
        (
            "pbc = [true, true, false]",
            json!({"pbc": {"$eq": [true, true, false]}}),
        ),
        (
            "derived.elements.Si >= 2",
            json!({"derived.elements.Si": {"$gte": 2}}),
        ),
    ];

    for (input, expected) in test_cases {
        assert_eq!(document(input), expected, "Failed for input: {}", input);
    }
}

#[test]
fn test_document_membership() {
    assert_eq!(
        document(r#"calculator_name in ["vasp", "castep"]"#),
        json!({"calculator_name": {"$in": ["vasp", "castep"]}})
    );
}

#[test]
fn test_document_range_tests_one_element() {
    let bounds = json!({"$gte": 8, "$lt": 64});
    assert_eq!(
        document("n_atoms in 8..<64"),
        json!({"$or": [
            {"n_atoms": {"$elemMatch": bounds}},
            {"n_atoms": {"$exists": true, "$not": {"$type": "array"}, "$gte": 8, "$lt": 64}},
        ]})
    );
}

#[test]
fn test_document_all_quantifier() {
    assert_eq!(
        document("all(forces) < 0.1"),
        json!({"$and": [
            {"$nor": [
                {"forces": {"$elemMatch": {"$not": {"$lt": 0.1}}}},
                {"forces": {"$ne": [], "$not": {"$lt": 0.1}}},
            ]},
            {"$or": [
                {"forces": {"$elemMatch": {"$lt": 0.1}}},
                {"forces": {"$exists": true, "$not": {"$type": "array"}, "$lt": 0.1}},
            ]},
        ]})
    );
}

#[test]
fn test_document_dates_use_extended_json() {
    assert_eq!(
        document("uploaded >= 2021-05-01"),
        json!({"uploaded": {"$gte": {"$date": "2021-05-01T00:00:00Z"}}})
    );
}

#[test]
fn test_document_boolean_structure() {
    assert_eq!(
        document("a = 1 or b = 2 and c = 3 or d = 4"),
        json!({"$or": [
            {"a": {"$eq": 1}},
            {"$and": [{"b": {"$eq": 2}}, {"c": {"$eq": 3}}]},
            {"d": {"$eq": 4}},
        ]})
    );
    assert_eq!(
        document("not (a = 1 and b = 2)"),
        json!({"$nor": [{"$and": [{"a": {"$eq": 1}}, {"b": {"$eq": 2}}]}]})
    );
}

// ============================================================================
// Search Index
// ============================================================================

#[test]
fn test_search_terms_and_ranges() {
    let test_cases = vec![
        ("n_atoms = 8", json!({"term": {"n_atoms": 8}})),
        ("pbc = true", json!({"term": {"pbc": true}})),
        ("name = \"x\"", json!({"term": {"name.keyword": "x"}})),
        ("energy < -10", json!({"range": {"energy": {"lt": -10}}})),
        ("energy >= 1.5", json!({"range": {"energy": {"gte": 1.5}}})),
        (
            "n_atoms in 8..<64",
            json!({"range": {"n_atoms": {"gte": 8, "lt": 64}}}),
        ),
        (
            "name in \"a\"<..\"m\"",
            json!({"range": {"name.keyword": {"gt": "a", "lte": "m"}}}),
        ),
        ("virial", json!({"exists": {"field": "virial"}})),
    ];

    for (input, expected) in test_cases {
        assert_eq!(search(input), expected, "Failed for input: {}", input);
    }
}

#[test]
fn test_search_dates() {
    assert_eq!(
        search("uploaded = 2021-05-01"),
        json!({"range": {"uploaded": {
            "gte": "2021-05-01T00:00:00Z",
            "lte": "2021-05-01T00:00:00Z",
            "format": DATE_FORMAT,
        }}})
    );
}

#[test]
fn test_search_membership_groups_by_field() {
    assert_eq!(
        search(r#"elements in ["Si", "O"]"#),
        json!({"terms": {"elements.keyword": ["Si", "O"]}})
    );
    assert_eq!(
        search(r#"tag in ["a", 1, "b", 2]"#),
        json!({"bool": {
            "should": [
                {"terms": {"tag.keyword": ["a", "b"]}},
                {"terms": {"tag": [1, 2]}},
            ],
            "minimum_should_match": 1,
        }})
    );
}

#[test]
fn test_search_boolean_structure() {
    assert_eq!(
        search("a = 1 and b != 2 and c = 3"),
        json!({"bool": {"filter": [
            {"term": {"a": 1}},
            {"bool": {"must_not": [{"term": {"b": 2}}]}},
            {"term": {"c": 3}},
        ]}})
    );
    assert_eq!(
        search("a = 1 or (b = 2 or c = 3)"),
        json!({"bool": {
            "should": [{"term": {"a": 1}}, {"term": {"b": 2}}, {"term": {"c": 3}}],
            "minimum_should_match": 1,
        }})
    );
}

#[test]
fn test_search_unsupported_constructs() {
    let test_cases = vec![
        ("name ~= \"^Si\"", "~="),
        ("all(forces) < 1", "all(...)"),
        ("pbc = [true, true, true]", "array literal"),
        ("a = 1 or (b = 2 and not name ~= \"x\")", "~="),
    ];

    for (input, construct) in test_cases {
        let err = SearchCompiler::new("keyword")
            .compile(&parse(input).unwrap())
            .unwrap_err();
        assert_eq!(err.backend, Backend::SearchIndex);
        assert!(
            err.construct.contains(construct),
            "Expected {:?} in {:?} for input: {}",
            construct,
            err.construct,
            input
        );
        assert!(err.to_string().contains("search_index"));
    }
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn test_absent_query_matches_everything() {
    let config = Config::default();

    let compiled = compile::compile(None, Backend::DocumentStore, &config).unwrap();
    assert_eq!(compiled.as_json(), Some(&json!({})));

    let compiled = compile::compile(None, Backend::SearchIndex, &config).unwrap();
    assert_eq!(compiled.as_json(), Some(&json!({"match_all": {}})));

    let compiled = compile::compile(None, Backend::Memory, &config).unwrap();
    let abcd::Compiled::Predicate(predicate) = compiled else {
        panic!("expected a predicate");
    };
    assert!(predicate.matches(&Record::new()));
}

#[test]
fn test_long_chains_compile_flat() {
    let tree = parse(&vec!["n = 1"; 200].join(" or ")).unwrap();
    let config = Config::default();

    let compiled = compile::compile(Some(&tree), Backend::DocumentStore, &config).unwrap();
    let clauses = compiled.as_json().unwrap()["$or"].as_array().unwrap().len();
    assert_eq!(clauses, 200);

    let compiled = compile::compile(Some(&tree), Backend::SearchIndex, &config).unwrap();
    let clauses = compiled.as_json().unwrap()["bool"]["should"]
        .as_array()
        .unwrap()
        .len();
    assert_eq!(clauses, 200);

    let compiled = compile::compile(Some(&tree), Backend::Memory, &config).unwrap();
    let abcd::Compiled::Predicate(predicate) = compiled else {
        panic!("expected a predicate");
    };
    assert!(predicate.matches(&Record::new().with("n", Value::Integer(1))));
    assert!(!predicate.matches(&Record::new()));
}

#[test]
fn test_keyword_suffix_comes_from_config() {
    let config = Config::from_toml("[search]\nkeyword_suffix = \"raw\"").unwrap();
    let tree = parse("name = \"x\"").unwrap();
    let compiled = compile::compile(Some(&tree), Backend::SearchIndex, &config).unwrap();
    assert_eq!(
        compiled.as_json(),
        Some(&json!({"term": {"name.raw": "x"}}))
    );
}

#[test]
fn test_compilation_is_pure() {
    let tree = parse("n_atoms in 1..10 and not (name = \"x\" or virial)").unwrap();
    let before = tree.clone();
    let config = Config::default();

    for backend in [Backend::Memory, Backend::DocumentStore, Backend::SearchIndex] {
        let first = compile::compile(Some(&tree), backend, &config).unwrap();
        let second = compile::compile(Some(&tree), backend, &config).unwrap();
        assert_eq!(first.backend(), backend);
        assert_eq!(first.as_json(), second.as_json());
    }
    assert_eq!(tree, before);
}

#[test]
fn test_memory_predicate_follows_tree() {
    let tree = parse("n_atoms in 1..10 and name != \"x\"").unwrap();
    let compiled = compile::compile(Some(&tree), Backend::Memory, &Config::default()).unwrap();
    let abcd::Compiled::Predicate(predicate) = compiled else {
        panic!("expected a predicate");
    };

    let small = Record::new().with("n_atoms", Value::Integer(4));
    let named = small.clone().with("name", Value::from("x"));
    let large = Record::new().with("n_atoms", Value::Integer(40));
    assert!(predicate.matches(&small));
    assert!(!predicate.matches(&named));
    assert!(!predicate.matches(&large));
}
