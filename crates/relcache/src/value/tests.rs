use super::Value;
use proptest::prelude::*;
use std::cmp::Ordering;

#[test]
fn canonical_order_ranks_families() {
    let mut values = vec![
        Value::Text("a".into()),
        Value::Int(3),
        Value::List(vec![]),
        Value::Null,
        Value::Bool(true),
        Value::Float(1.5),
    ];
    values.sort();

    assert_eq!(
        values,
        vec![
            Value::Null,
            Value::Bool(true),
            Value::Float(1.5),
            Value::Int(3),
            Value::Text("a".into()),
            Value::List(vec![]),
        ]
    );
}

#[test]
fn int_and_float_share_numeric_order() {
    assert_eq!(Value::Int(2).cmp(&Value::Float(2.0)), Ordering::Equal);
    assert!(Value::Int(2) < Value::Float(2.5));
    assert!(Value::Float(-1.0) < Value::Int(0));
}

#[test]
fn mixed_numbers_compare_exactly_above_float_precision() {
    let edge = 1_i64 << 53;
    let below = Value::Int(edge);
    let float = Value::Float(2f64.powi(53));
    let above = Value::Int(edge + 1);

    assert_eq!(below.cmp(&float), Ordering::Equal);
    assert_eq!(float.cmp(&above), Ordering::Less);
    assert_eq!(below.cmp(&above), Ordering::Less);
    assert!(!above.strict_eq(&float));

    assert!(Value::Int(i64::MAX) < Value::Float(2f64.powi(63)));
    assert!(Value::Int(i64::MIN) == Value::Float(-(2f64.powi(63))));
    assert!(Value::Int(-2) < Value::Float(-1.5));
    assert!(Value::Float(f64::NEG_INFINITY) < Value::Int(i64::MIN));
    assert!(Value::Float(f64::NAN) > Value::Int(i64::MAX));
    assert_eq!(Value::Float(-0.0).cmp(&Value::Float(0.0)), Ordering::Equal);
}

#[test]
fn loose_eq_coerces_scalars() {
    assert!(Value::Int(1).loose_eq(&Value::Text("1".into())));
    assert!(Value::Bool(true).loose_eq(&Value::Int(1)));
    assert!(Value::Null.loose_eq(&Value::Null));
    assert!(!Value::Null.loose_eq(&Value::Int(0)));
    assert!(!Value::Text("a".into()).loose_eq(&Value::Int(0)));
}

#[test]
fn strict_eq_keeps_families_apart() {
    assert!(Value::Int(1).strict_eq(&Value::Float(1.0)));
    assert!(!Value::Int(1).strict_eq(&Value::Text("1".into())));
    assert!(!Value::Bool(true).strict_eq(&Value::Int(1)));
}

#[test]
fn loose_cmp_rejects_null_and_containers() {
    assert_eq!(Value::Null.loose_cmp(&Value::Int(1)), None);
    assert_eq!(Value::List(vec![]).loose_cmp(&Value::Int(1)), None);
    assert_eq!(
        Value::Text("10".into()).loose_cmp(&Value::Int(9)),
        Some(Ordering::Greater)
    );
}

#[test]
fn path_walks_nested_maps() {
    let value = Value::Map(vec![(
        "author".into(),
        Value::Map(vec![("name".into(), Value::from("ann"))]),
    )]);

    assert_eq!(value.path("author.name"), Some(&Value::from("ann")));
    assert_eq!(value.path("author.age"), None);
}

#[test]
fn json_conversion_keeps_map_order() {
    let json: serde_json::Value = serde_json::from_str(r#"{"z": 1, "a": [true, 2.5, null]}"#)
        .expect("valid json");
    let value = Value::from(json.clone());

    let keys: Vec<_> = value
        .as_map()
        .expect("object")
        .iter()
        .map(|(k, _)| k.as_str())
        .collect();
    assert_eq!(keys, vec!["z", "a"]);
    assert_eq!(value.to_json(), json);
}

#[test]
fn as_count_accepts_whole_non_negative_numbers() {
    assert_eq!(Value::Int(3).as_count(), Some(3));
    assert_eq!(Value::Float(2.0).as_count(), Some(2));
    assert_eq!(Value::Float(2.5).as_count(), None);
    assert_eq!(Value::Int(-1).as_count(), None);
    assert_eq!(Value::from("3").as_count(), None);
}

///
/// PROPERTIES
///

fn number() -> impl Strategy<Value = Value> {
    let edge = 1_i64 << 53;
    prop_oneof![
        (edge - 4..edge + 4).prop_map(Value::Int),
        (edge - 4..edge + 4).prop_map(|n| Value::Float(n as f64)),
        (-8_i64..8).prop_map(Value::Int),
        (-16_i64..16).prop_map(|n| Value::Float(n as f64 / 2.0)),
    ]
}

proptest! {
    #[test]
    fn numeric_order_is_transitive(a in number(), b in number(), c in number()) {
        if a <= b && b <= c {
            prop_assert!(a <= c);
        }
        if a == b && b == c {
            prop_assert!(a == c);
        }
    }
}
