use super::*;
use crate::{record::Record, value::Value};
use proptest::prelude::*;

fn person(id: i64, age: i64) -> Record {
    Record::from_fields([("id", Value::Int(id)), ("age", Value::Int(age))])
}

fn ids(entries: &[&RecordRef]) -> Vec<i64> {
    entries
        .iter()
        .map(|entry| match entry.id() {
            Value::Int(id) => *id,
            other => panic!("unexpected id {other:?}"),
        })
        .collect()
}

fn age_index(ages: &[i64]) -> Index {
    let mut index = Index::new(vec!["age".into()]);
    for (i, age) in ages.iter().enumerate() {
        let id = i64::try_from(i).expect("small id") + 1;
        index.insert_record(&person(id, *age)).expect("insert");
    }
    index
}

#[test]
fn between_right_inclusive_matches_scenario() {
    let index = age_index(&[30, 31, 32, 33, 33]);

    let found = index
        .between(
            &[Value::Int(31)],
            &[Value::Int(33)],
            &BetweenOptions::default().right_inclusive(true),
        )
        .expect("between");

    assert_eq!(ids(&found), vec![2, 3, 4, 5]);
}

#[test]
fn between_default_bounds_are_half_open() {
    let index = age_index(&[33, 30, 32, 31]);

    let found = index
        .between(&[Value::Int(31)], &[Value::Int(33)], &BetweenOptions::default())
        .expect("between");

    assert_eq!(ids(&found), vec![4, 3]);
}

#[test]
fn between_left_exclusive_skips_exact_match() {
    let index = age_index(&[30, 31, 32]);

    let found = index
        .between(
            &[Value::Int(30)],
            &[Value::Int(40)],
            &BetweenOptions::default().left_inclusive(false),
        )
        .expect("between");

    assert_eq!(ids(&found), vec![2, 3]);
}

#[test]
fn between_applies_offset_after_limit_bounded_scan() {
    let index = age_index(&[10, 20, 30, 40, 50]);

    let found = index
        .between(
            &[Value::Int(0)],
            &[Value::Int(100)],
            &BetweenOptions::default().offset(1).limit(2),
        )
        .expect("between");

    assert_eq!(ids(&found), vec![2, 3]);
}

#[test]
fn between_rejects_mismatched_bounds() {
    let index = age_index(&[1]);

    let err = index
        .between(&[Value::Int(1)], &[], &BetweenOptions::default())
        .unwrap_err();

    assert_eq!(err, IndexError::BoundArityMismatch { left: 1, right: 0 });
}

#[test]
fn inserting_same_identity_twice_keeps_bucket_size() {
    let mut index = age_index(&[30]);
    index.insert_record(&person(1, 30)).expect("insert");

    assert_eq!(index.get(&[Value::Int(30)]).expect("get").len(), 1);
    assert_eq!(index.len(), 1);
}

#[test]
fn bucket_is_sorted_by_hash_code() {
    let mut index = Index::new(vec!["age".into()]);
    for id in [5, 1, 3] {
        index.insert_record(&person(id, 20)).expect("insert");
    }

    let bucket = index.get(&[Value::Int(20)]).expect("get");
    assert_eq!(ids(&bucket), vec![1, 3, 5]);
}

#[test]
fn custom_hash_code_deduplicates_bucket() {
    let hash: KeyFn = std::rc::Rc::new(|record: &Record| record.value("email").clone());
    let mut index = Index::new(vec!["age".into()]).with_hash_code(Some(hash));

    let mut a = person(1, 20);
    a.set("email", "x@y");
    let mut b = person(2, 20);
    b.set("email", "x@y");
    index.insert_record(&a).expect("insert");
    index.insert_record(&b).expect("insert");

    assert_eq!(ids(&index.get(&[Value::Int(20)]).expect("get")), vec![1]);
}

#[test]
fn remove_prunes_empty_keys() {
    let mut index = age_index(&[30, 31]);

    assert!(index.remove_record(&person(1, 30)).expect("remove"));
    assert_eq!(index.keys(), &[Value::Int(31)]);
    assert!(index.get(&[Value::Int(30)]).expect("get").is_empty());
}

#[test]
fn remove_record_finds_entry_after_key_change() {
    let mut index = age_index(&[30]);

    // The record moved to 45 without the index hearing about it.
    assert!(index.remove_record(&person(1, 45)).expect("remove"));
    assert!(index.is_empty());
}

#[test]
fn update_record_moves_bucket() {
    let mut index = age_index(&[30, 30]);
    index.update_record(&person(2, 50)).expect("update");

    assert_eq!(ids(&index.get(&[Value::Int(30)]).expect("get")), vec![1]);
    assert_eq!(ids(&index.get(&[Value::Int(50)]).expect("get")), vec![2]);
}

#[test]
fn missing_field_keys_as_null_and_sorts_first() {
    let mut index = age_index(&[5]);
    index
        .insert_record(&Record::from_fields([("id", 9)]))
        .expect("insert");

    assert_eq!(index.keys(), &[Value::Null, Value::Int(5)]);
    assert_eq!(ids(index.peek().iter().collect::<Vec<_>>().as_slice()), vec![9]);
}

#[test]
fn map_keys_are_rejected() {
    let mut index = Index::new(vec!["meta".into()]);
    let mut record = Record::from_fields([("id", 1)]);
    record.set("meta", Value::Map(vec![]));

    let err = index.insert_record(&record).unwrap_err();
    assert_eq!(
        err,
        IndexError::UnindexableKey {
            field: "meta".into()
        }
    );
    assert!(index.is_empty());
}

///
/// COMPOUND
///

fn compound() -> Index {
    let mut index = Index::new(vec!["role".into(), "age".into()]);
    let rows = [
        (1, "admin", 40),
        (2, "user", 20),
        (3, "admin", 30),
        (4, "user", 35),
        (5, "guest", 25),
        (6, "user", 20),
    ];
    for (id, role, age) in rows {
        index
            .insert_record(&Record::from_fields([
                ("id", Value::from(id)),
                ("role", Value::from(role)),
                ("age", Value::from(age)),
            ]))
            .expect("insert");
    }
    index
}

#[test]
fn compound_get_scopes_to_full_key_and_prefix() {
    let index = compound();

    let exact = index
        .get(&[Value::from("user"), Value::Int(20)])
        .expect("get");
    assert_eq!(ids(&exact), vec![2, 6]);

    let prefix = index.get(&[Value::from("user")]).expect("get");
    assert_eq!(ids(&prefix), vec![2, 6, 4]);

    let miss = index.get(&[Value::from("user"), Value::Int(99)]).expect("get");
    assert!(miss.is_empty());
}

#[test]
fn compound_between_recurses_into_boundary_keys() {
    let index = compound();

    // admin ≥ 35 .. user < 25
    let found = index
        .between(
            &[Value::from("admin"), Value::Int(35)],
            &[Value::from("user"), Value::Int(25)],
            &BetweenOptions::default(),
        )
        .expect("between");

    assert_eq!(ids(&found), vec![1, 5, 2, 6]);
}

#[test]
fn compound_between_within_one_leading_key_honours_both_bounds() {
    let index = compound();

    let found = index
        .between(
            &[Value::from("user"), Value::Int(20)],
            &[Value::from("user"), Value::Int(35)],
            &BetweenOptions::default(),
        )
        .expect("between");

    assert_eq!(ids(&found), vec![2, 6]);
}

#[test]
fn set_rejects_partial_key_lists() {
    let mut index = compound();

    let err = index
        .set(&[Value::from("user")], RecordRef::from_id(Value::Int(7)))
        .unwrap_err();
    assert_eq!(
        err,
        IndexError::KeyArity {
            expected: 2,
            found: 1
        }
    );
}

#[test]
fn visit_all_walks_compound_keys_in_order() {
    let index = compound();
    let mut seen = Vec::new();
    index.visit_all(|entry| seen.push(entry.id().clone()));

    assert_eq!(
        seen,
        vec![3, 1, 5, 2, 6, 4]
            .into_iter()
            .map(Value::Int)
            .collect::<Vec<_>>()
    );
}

#[test]
fn clear_drops_everything() {
    let mut index = compound();
    index.clear();

    assert!(index.is_empty());
    assert!(index.peek().is_empty());
}

///
/// PROPERTIES
///

proptest! {
    #[test]
    fn visit_all_yields_non_decreasing_keys(ages in prop::collection::vec(-50i64..50, 0..40)) {
        let index = age_index(&ages);
        let mut seen = Vec::new();
        index.visit_all(|entry| {
            let Value::Int(id) = entry.id() else {
                panic!("integer ids only");
            };
            let pos = usize::try_from(*id - 1).expect("positive id");
            seen.push(ages[pos]);
        });

        prop_assert_eq!(seen.len(), ages.len());
        prop_assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn between_matches_linear_filter(
        ages in prop::collection::vec(0i64..30, 0..40),
        low in 0i64..30,
        span in 0i64..15,
    ) {
        let high = low + span;
        let index = age_index(&ages);
        let found = index
            .between(&[Value::Int(low)], &[Value::Int(high)], &BetweenOptions::default())
            .unwrap();

        let mut got = ids(&found);
        got.sort_unstable();
        let mut expected: Vec<i64> = ages
            .iter()
            .enumerate()
            .filter(|(_, age)| low <= **age && **age < high)
            .map(|(i, _)| i64::try_from(i).unwrap() + 1)
            .collect();
        expected.sort_unstable();

        prop_assert_eq!(got, expected);
    }
}
