use super::*;
use crate::{db::collection::Collection, record::Record, value::Value};

fn people() -> Collection {
    let mut collection = Collection::new("people", "id");
    collection
        .create_index("age", vec!["age".into()])
        .expect("create index");

    let rows = [
        (1, "ann", 30, "admin"),
        (2, "bob", 31, "user"),
        (3, "cy", 32, "user"),
        (4, "di", 33, "guest"),
        (5, "Ed", 33, "user"),
    ];
    for (id, name, age, role) in rows {
        collection
            .insert(Record::from_fields([
                ("id", Value::from(id)),
                ("name", Value::from(name)),
                ("age", Value::from(age)),
                ("role", Value::from(role)),
            ]))
            .expect("insert");
    }

    collection
}

fn ids(records: &[&Record]) -> Vec<i64> {
    records
        .iter()
        .map(|record| match record.value("id") {
            Value::Int(id) => *id,
            other => panic!("unexpected id {other:?}"),
        })
        .collect()
}

fn object(entries: Vec<(&str, Value)>) -> Value {
    Value::Map(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

///
/// SEEDING
///

#[test]
fn between_on_secondary_index_is_right_inclusive_when_asked() {
    let collection = people();

    let found = collection
        .query()
        .between(
            &[Value::Int(31)],
            &[Value::Int(33)],
            Some("age"),
            &BetweenOptions::default().right_inclusive(true),
        )
        .expect("between")
        .run();

    assert_eq!(ids(&found), vec![2, 3, 4, 5]);
}

#[test]
fn seeding_twice_is_rejected() {
    let collection = people();

    let err = collection
        .query()
        .get(&[Value::Int(1)], None)
        .expect("get")
        .between(&[Value::Int(0)], &[Value::Int(9)], None, &BetweenOptions::default())
        .err()
        .expect("second seed must fail");

    assert_eq!(err, QueryError::AlreadySeeded { method: "between" });
    assert_eq!(err.class(), crate::error::ErrorClass::InvariantViolation);
}

#[test]
fn transforms_seed_the_whole_collection() {
    let collection = people();

    let err = collection
        .query()
        .limit(2)
        .get(&[Value::Int(1)], None)
        .err()
        .expect("get after limit must fail");

    assert!(matches!(err, QueryError::AlreadySeeded { method: "get" }));
}

#[test]
fn get_all_concatenates_key_lists() {
    let collection = people();

    let found = collection
        .get_all(&[vec![Value::Int(33)], vec![Value::Int(30)]], Some("age"))
        .expect("get_all");

    assert_eq!(ids(&found), vec![4, 5, 1]);
}

#[test]
fn unknown_index_is_not_found() {
    let collection = people();

    let err = collection.find(&[Value::Int(1)], Some("nope")).unwrap_err();
    assert_eq!(
        err,
        QueryError::UnknownIndex {
            name: "nope".into()
        }
    );
}

///
/// FILTERS
///

#[test]
fn clause_builder_ands_and_ors() {
    let collection = people();

    let filter = Filter::new()
        .clause("age", ">=", 32)
        .expect("clause")
        .clause("role", "==", "user")
        .expect("clause")
        .clause("name", "|==", "ann")
        .expect("clause");

    assert_eq!(ids(&collection.filter(&filter)), vec![1, 3, 5]);
}

#[test]
fn object_notation_shorthand_and_paging() {
    let collection = people();

    let filter = Filter::try_from(&object(vec![
        ("role", Value::from("user")),
        ("orderBy", Value::List(vec!["age".into(), "DESC".into()])),
        ("skip", Value::Int(1)),
        ("limit", Value::Int(1)),
    ]))
    .expect("filter");

    assert_eq!(ids(&collection.filter(&filter)), vec![3]);
}

#[test]
fn object_notation_where_operators() {
    let collection = people();

    let filter = Filter::try_from(&object(vec![(
        "where",
        object(vec![
            ("age", object(vec![(">", Value::Int(30)), ("<", Value::Int(33))])),
            ("role", Value::from("user")),
        ]),
    )]))
    .expect("filter");

    assert_eq!(ids(&collection.filter(&filter)), vec![2, 3]);
}

#[test]
fn non_numeric_limit_is_rejected() {
    let err = Filter::try_from(&object(vec![("limit", Value::from("ten"))])).unwrap_err();

    assert!(matches!(err, QueryError::NotNumeric { ref option, .. } if option == "limit"));
}

#[test]
fn unknown_operator_is_rejected_at_build_time() {
    let err = Filter::new().clause("age", "~=", 3).unwrap_err();

    assert_eq!(
        err,
        QueryError::UnknownOperator {
            operator: "~=".into()
        }
    );
}

#[test]
fn like_escapes_metacharacters_and_honours_flags() {
    let mut record = Record::new();
    record.set("name", "a.c (x)");

    let literal = Clause::new("name", "like", "a.c (%)").expect("clause");
    assert!(literal.matches(&record));

    let dot_is_literal = Clause::new("name", "like", "abc%").expect("clause");
    assert!(!dot_is_literal.matches(&record));

    let single = Clause::new("name", "like", "a_c%").expect("clause");
    assert!(single.matches(&record));

    let insensitive = Clause::new("name", "likei", "A.C%").expect("clause");
    assert!(insensitive.matches(&record));

    let negated = Clause::new("name", "notLikeg", "zzz%").expect("clause");
    assert!(negated.matches(&record));
}

#[test]
fn unknown_like_flag_is_rejected() {
    assert!(matches!(
        Clause::new("name", "likeq", "x"),
        Err(QueryError::UnknownOperator { .. })
    ));
}

#[test]
fn contains_and_intersection_operators() {
    let mut record = Record::new();
    record.set("tags", Value::from(vec!["red", "blue"]));
    record.set("title", "hello world");

    let check = |op: &str, predicate: Value| {
        Clause::new(if op.contains("sect") { "tags" } else { "title" }, op, predicate)
            .expect("clause")
            .matches(&record)
    };

    assert!(check("contains", "world".into()));
    assert!(check("notContains", "moon".into()));
    assert!(check("isectNotEmpty", Value::from(vec!["blue", "green"])));
    assert!(check("isectEmpty", Value::from(vec!["green"])));

    let list = Clause::new("tags", "contains", "red").expect("clause");
    assert!(list.matches(&record));
    let strict = Clause::new("tags", "contains", 1).expect("clause");
    assert!(!strict.matches(&record));
}

#[test]
fn in_operator_uses_strict_equality() {
    let record = Record::from_fields([("age", 30)]);

    assert!(Clause::new("age", "in", vec![29, 30]).expect("clause").matches(&record));
    assert!(!Clause::new("age", "in", vec!["30"]).expect("clause").matches(&record));
    assert!(Clause::new("age", "notIn", vec![1]).expect("clause").matches(&record));
}

#[test]
fn loose_and_strict_equality_differ_on_text_numbers() {
    let record = Record::from_fields([("age", 30)]);

    assert!(Clause::new("age", "==", "30").expect("clause").matches(&record));
    assert!(!Clause::new("age", "===", "30").expect("clause").matches(&record));
    assert!(Clause::new("age", "!==", "30").expect("clause").matches(&record));
}

#[test]
fn comparisons_against_null_are_false() {
    let record = Record::from_fields([("id", 1)]);

    for op in [">", ">=", "<", "<="] {
        let clause = Clause::new("age", op, 0).expect("clause");
        assert!(!clause.matches(&record), "{op} should not match a missing field");
    }
}

///
/// SORTING & TERMINALS
///

#[test]
fn sort_upper_cases_text_and_is_stable() {
    let collection = people();

    let names = collection
        .query()
        .sort(&[OrderBy::asc("name")])
        .map(|record| record.value("name").clone());
    assert_eq!(
        names,
        ["ann", "bob", "cy", "di", "Ed"]
            .into_iter()
            .map(Value::from)
            .collect::<Vec<_>>()
    );

    let by_age = collection.query().sort(&[OrderBy::desc("age")]).run();
    assert_eq!(ids(&by_age), vec![4, 5, 3, 2, 1]);
}

#[test]
fn ties_fall_through_to_next_order() {
    let collection = people();

    let found = collection
        .query()
        .sort(&[OrderBy::desc("age"), OrderBy::desc("name")])
        .run();

    assert_eq!(ids(&found), vec![5, 4, 3, 2, 1]);
}

#[test]
fn map_call_invokes_named_method() {
    let mut collection = people();
    collection.define_method("shout", |record| record.value("name").upper_cased());

    let out = collection
        .query()
        .get(&[Value::Int(2)], None)
        .expect("get")
        .map_call("shout")
        .expect("map_call");
    assert_eq!(out, vec![Value::from("BOB")]);

    let err = collection.map_call("whisper").unwrap_err();
    assert_eq!(err.class(), crate::error::ErrorClass::NotFound);
}

#[test]
fn reduce_and_skip_compose() {
    let collection = people();

    let total = collection
        .query()
        .skip(3)
        .reduce(0, |acc, record| match record.value("age") {
            Value::Int(age) => acc + age,
            _ => acc,
        });

    assert_eq!(total, 66);
}
