// tests/database_tests.rs

use std::collections::BTreeSet;

use abcd::{
    Abcd, Aggregation, Backend, BackendError, Config, Database, DocumentStore, Error, FieldPath,
    FindOptions, MemoryStore, Patch, Predicate, Record, RecordId, SearchIndex, SortDirection,
    Value,
};
use serde_json::json;

const BACKENDS: [Backend; 3] = [Backend::Memory, Backend::DocumentStore, Backend::SearchIndex];

fn structure(name: &str, n_atoms: i64, energy: f64) -> Record {
    Record::new()
        .with("name", Value::from(name))
        .with("n_atoms", Value::Integer(n_atoms))
        .with("energy", Value::Float(energy))
}

fn open(backend: Backend) -> Abcd {
    let db = Abcd::open(Config::default().with_backend(backend)).unwrap();
    db.insert_many(vec![
        structure("a", 2, -1.0),
        structure("b", 5, -3.5),
        structure("c", 8, 0.5),
        structure("d", 4, -2.0).with("virial", Value::from(vec![1.0, 0.0, 0.0])),
    ])
    .unwrap();
    db
}

fn names(db: &Abcd, query: Option<&str>, options: FindOptions) -> Vec<String> {
    db.find(query, options)
        .unwrap()
        .map(|record| match record.get("name") {
            Some(Value::String(name)) => name.clone(),
            other => panic!("record without a name: {:?}", other),
        })
        .collect()
}

// ============================================================================
// Records
// ============================================================================

#[test]
fn test_insert_assigns_sequential_ids() {
    for backend in BACKENDS {
        let db = Abcd::open(Config::default().with_backend(backend)).unwrap();
        assert_eq!(db.insert(structure("a", 1, 0.0)).unwrap(), RecordId(1));
        assert_eq!(
            db.insert_many(vec![structure("b", 1, 0.0), structure("c", 1, 0.0)])
                .unwrap(),
            vec![RecordId(2), RecordId(3)]
        );

        let found: Vec<Record> = db.find(None, FindOptions::new()).unwrap().collect();
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].id, Some(RecordId(1)));
        assert_eq!(found[0].to_json()["_id"], json!(1));
    }
}

#[test]
fn test_inclusive_bounds_on_every_backend() {
    for backend in BACKENDS {
        let db = open(backend);
        assert_eq!(db.count(Some("n_atoms >= 5")).unwrap(), 2, "{}", backend);
        assert_eq!(db.count(Some("n_atoms > 5")).unwrap(), 1, "{}", backend);
        assert_eq!(db.count(Some("n_atoms in 4..5")).unwrap(), 2, "{}", backend);
        assert_eq!(db.count(Some("n_atoms in 4<..<5")).unwrap(), 0, "{}", backend);
        assert_eq!(db.count(Some("n_atoms in 8..2")).unwrap(), 0, "{}", backend);
    }
}

#[test]
fn test_blank_query_selects_everything() {
    for backend in BACKENDS {
        let db = open(backend);
        assert_eq!(db.count(None).unwrap(), 4);
        assert_eq!(db.count(Some("   ")).unwrap(), 4);
        assert_eq!(db.count(Some("virial")).unwrap(), 1);
        assert_eq!(db.count(Some("not virial")).unwrap(), 3);
    }
}

#[test]
fn test_update_and_remove() {
    for backend in BACKENDS {
        let db = open(backend);
        let patch = Patch::new().set("info.tag", "small").unset("virial");
        assert_eq!(db.update(Some("n_atoms < 5"), &patch).unwrap(), 2);
        assert_eq!(db.count(Some("info.tag = \"small\"")).unwrap(), 2);
        assert_eq!(db.count(Some("virial")).unwrap(), 0);

        // Patches that change nothing are not counted
        assert_eq!(db.update(Some("n_atoms < 5"), &patch).unwrap(), 0);

        assert_eq!(db.remove(Some("info.tag = \"small\"")).unwrap(), 2);
        assert_eq!(db.count(None).unwrap(), 2);
        assert_eq!(db.remove(Some("n_atoms > 100")).unwrap(), 0);
    }
}

#[test]
fn test_rename_property() {
    let db = open(Backend::Memory);
    let patch = Patch::new().rename("energy", "total_energy");
    assert_eq!(db.update(None, &patch).unwrap(), 4);
    assert_eq!(db.count(Some("energy")).unwrap(), 0);
    assert_eq!(db.count(Some("total_energy < 0")).unwrap(), 3);
}

// ============================================================================
// Cursors
// ============================================================================

#[test]
fn test_sort_skip_and_limit() {
    let db = open(Backend::Memory);
    let options = FindOptions::new().sort_by("energy", SortDirection::Ascending);
    assert_eq!(names(&db, None, options.clone()), vec!["b", "d", "a", "c"]);

    let options = FindOptions::new()
        .sort_by("n_atoms", SortDirection::Descending)
        .skip(1)
        .limit(2);
    assert_eq!(names(&db, None, options), vec!["b", "d"]);

    let options = FindOptions::new().skip(3).limit(10);
    assert_eq!(names(&db, None, options), vec!["d"]);
}

#[test]
fn test_missing_sort_keys_sort_first() {
    let db = open(Backend::DocumentStore);
    let options = FindOptions::new().sort_by("virial", SortDirection::Ascending);
    assert_eq!(names(&db, None, options), vec!["a", "b", "c", "d"]);

    let options = FindOptions::new().sort_by("virial", SortDirection::Descending);
    assert_eq!(names(&db, None, options)[0], "d");
}

#[test]
fn test_dropping_a_cursor_leaves_the_store_unchanged() {
    for backend in BACKENDS {
        let db = open(backend);
        let mut cursor = db.find(Some("n_atoms > 0"), FindOptions::new()).unwrap();
        assert!(cursor.next().is_some());
        drop(cursor);

        assert_eq!(db.count(None).unwrap(), 4);
        assert_eq!(names(&db, None, FindOptions::new()), vec!["a", "b", "c", "d"]);
    }
}

#[test]
fn test_cursor_reads_a_snapshot() {
    let db = open(Backend::Memory);
    let cursor = db.find(Some("n_atoms > 0"), FindOptions::new()).unwrap();

    db.insert(structure("e", 16, -9.0)).unwrap();
    db.remove(Some("name = \"a\"")).unwrap();

    assert_eq!(cursor.count(), 4);
    assert_eq!(db.count(Some("n_atoms > 0")).unwrap(), 4);
    assert_eq!(db.count(Some("name = \"a\"")).unwrap(), 0);
}

#[test]
fn test_default_limit_applies_when_none_given() {
    let config = Config::from_toml("[query]\ndefault_limit = 2").unwrap();
    let db = Abcd::open(config).unwrap();
    db.insert_many((0..5).map(|i| structure("x", i, 0.0))).unwrap();

    assert_eq!(db.find(None, FindOptions::new()).unwrap().count(), 2);
    assert_eq!(db.find(None, FindOptions::new().limit(4)).unwrap().count(), 4);
    assert_eq!(db.count(None).unwrap(), 5);
}

// ============================================================================
// Availability and Errors
// ============================================================================

#[test]
fn test_closed_store_is_unavailable() {
    for backend in BACKENDS {
        let db = open(backend);
        let cursor = db.find(None, FindOptions::new()).unwrap();
        db.close();

        let err = db.count(None).unwrap_err();
        assert!(
            matches!(err, Error::Backend(BackendError::Unavailable { backend: b, .. }) if b == backend),
            "unexpected error: {}",
            err
        );
        assert!(db.insert(structure("e", 1, 0.0)).is_err());
        assert!(db.find(Some("n_atoms > 1"), FindOptions::new()).is_err());

        // Cursors opened before the outage keep their snapshot
        assert_eq!(cursor.count(), 4);

        db.reopen();
        assert_eq!(db.count(None).unwrap(), 4);
    }
}

#[test]
fn test_info_reports_the_store() {
    for backend in BACKENDS {
        let db = open(backend);
        let info = db.info().unwrap();
        assert_eq!(info["type"], Value::from(backend.name()));
        assert_eq!(info["name"], Value::from("atoms"));
        assert_eq!(info["count"], Value::Integer(4));

        db.close();
        assert!(matches!(
            db.info(),
            Err(Error::Backend(BackendError::Unavailable { .. }))
        ));
    }
}

#[test]
fn test_destroy_drops_every_record() {
    for backend in BACKENDS {
        let db = open(backend);
        let cursor = db.find(None, FindOptions::new()).unwrap();

        assert_eq!(db.destroy().unwrap(), 4);
        assert_eq!(db.count(None).unwrap(), 0);
        assert_eq!(db.info().unwrap()["count"], Value::Integer(0));
        assert_eq!(cursor.count(), 4);

        // Ids keep counting after a destroy
        assert_eq!(db.insert(structure("e", 1, 0.0)).unwrap(), RecordId(5));

        db.close();
        assert!(matches!(
            db.destroy(),
            Err(Error::Backend(BackendError::Unavailable { .. }))
        ));
        db.reopen();
        assert_eq!(db.count(None).unwrap(), 1);
    }

    let store = MemoryStore::default();
    store.insert(structure("a", 1, 0.0)).unwrap();
    assert_eq!(store.destroy().unwrap(), 1);
    assert_eq!(store.info().unwrap()["count"], Value::Integer(0));
}

#[test]
fn test_native_filters_are_validated() {
    let store = DocumentStore::default();
    store.insert(structure("a", 1, 0.0)).unwrap();

    let err = store.count(&json!({"energy": {"$near": 1}})).unwrap_err();
    assert!(matches!(
        err,
        BackendError::Query {
            backend: Backend::DocumentStore,
            ..
        }
    ));
    assert!(store.count(&json!({"$or": []})).is_err());
    assert!(store.count(&json!(["not", "an", "object"])).is_err());
    assert_eq!(store.count(&json!({"n_atoms": 1})).unwrap(), 1);

    let index = SearchIndex::new("atoms", "keyword");
    index.insert(structure("a", 1, 0.0)).unwrap();
    assert!(matches!(
        index.count(&json!({"regexp": {"name": "a.*"}})),
        Err(BackendError::Query { .. })
    ));
    assert!(index.count(&json!({"range": {"n_atoms": {}}})).is_err());
    assert_eq!(index.count(&json!({"term": {"name.keyword": "a"}})).unwrap(), 1);
}

#[test]
fn test_query_errors_surface_through_the_facade() {
    let db = open(Backend::SearchIndex);
    assert!(matches!(db.count(Some("n_atoms >")), Err(Error::Query(_))));
    assert!(matches!(db.count(Some("name ~= 1")), Err(Error::Query(_))));

    let err = db.count(Some("name ~= \"^a\"")).unwrap_err();
    assert!(matches!(err, Error::Unsupported(_)));
    assert!(err.to_string().contains("~="));
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = Config::default();
    config.document.collection = String::new();
    assert!(matches!(Abcd::open(config), Err(Error::Config(_))));
}

// ============================================================================
// Direct Store Access
// ============================================================================

#[test]
fn test_memory_store_runs_predicates() {
    let store = MemoryStore::default();
    store
        .insert_many(vec![structure("a", 1, 0.0), structure("b", 2, 0.0)])
        .unwrap();

    let even = Predicate::new(|record| record.get("n_atoms") == Some(&Value::Integer(2)));
    let found: Vec<Record> = store.find(&even, &FindOptions::new()).unwrap().collect();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("name"), Some(&Value::from("b")));
    assert_eq!(store.count(&Predicate::always()).unwrap(), 2);
    assert!(store.is_open());
}

#[test]
fn test_concurrent_inserts_get_unique_ids() {
    let db = Abcd::open(Config::default()).unwrap();
    let ids: Vec<RecordId> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let db = &db;
                scope.spawn(move || {
                    (0..25)
                        .map(|i| db.insert(structure("x", worker * 100 + i, 0.0)).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect()
    });

    let unique: BTreeSet<RecordId> = ids.iter().copied().collect();
    assert_eq!(unique.len(), 100);
    assert_eq!(db.count(None).unwrap(), 100);
}

// ============================================================================
// Aggregation
// ============================================================================

#[test]
fn test_property_statistics() {
    for backend in BACKENDS {
        let db = open(backend);
        let rows = db.aggregate(Some("n_atoms < 8"), &Aggregation::Properties).unwrap();

        let virial = rows
            .iter()
            .find(|row| row["property"] == Value::from("virial"))
            .unwrap();
        assert_eq!(virial["count"], Value::Integer(1));
        assert_eq!(virial["dtype"], Value::from("vector(float)"));

        let energy = rows
            .iter()
            .find(|row| row["property"] == Value::from("energy"))
            .unwrap();
        assert_eq!(energy["count"], Value::Integer(3));
        assert_eq!(energy["dtype"], Value::from("scalar(float)"));
    }
}

#[test]
fn test_values_and_value_counts() {
    let db = open(Backend::Memory);
    db.insert(structure("a", 3, 0.0)).unwrap();

    let rows = db
        .aggregate(
            Some("n_atoms < 5"),
            &Aggregation::Values {
                field: FieldPath::parse("name"),
            },
        )
        .unwrap();
    let values: Vec<&Value> = rows.iter().map(|row| &row["value"]).collect();
    assert_eq!(values, vec![&Value::from("a"), &Value::from("d"), &Value::from("a")]);

    let rows = db
        .aggregate(
            None,
            &Aggregation::ValueCounts {
                field: FieldPath::parse("name"),
            },
        )
        .unwrap();
    assert_eq!(rows[0]["value"], Value::from("a"));
    assert_eq!(rows[0]["count"], Value::Integer(2));
    assert_eq!(rows.len(), 4);
}
