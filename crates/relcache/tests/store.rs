use relcache::{
    db::notify::ManualClock,
    error::ErrorClass,
    obs::{MetricsEvent, MetricsSink, with_metrics_sink},
    prelude::*,
};
use std::{cell::RefCell, rc::Rc};

fn people(store: &mut Store) {
    store
        .define_mapper(MapperDef::new("person").index("age", vec![IndexField::field("age")]))
        .expect("person");

    for (id, age) in [(1, 30), (2, 31), (3, 32), (4, 33), (5, 33)] {
        store
            .add("person", record! { "id" => id, "age" => age })
            .expect("person");
    }
}

#[test]
fn right_inclusive_between_on_a_declared_index() {
    let mut store = Store::new(StoreConfig::default());
    people(&mut store);

    let opts = BetweenOptions::default().right_inclusive(true);
    let found = store
        .collection("person")
        .expect("collection")
        .between(&[Value::Int(30)], &[Value::Int(32)], Some("age"), &opts)
        .expect("between");
    assert_eq!(found.len(), 3);

    let found = store
        .collection("person")
        .expect("collection")
        .between(&[Value::Int(31)], &[Value::Int(33)], Some("age"), &opts)
        .expect("between");
    assert_eq!(found.len(), 4);
}

#[test]
fn failed_index_planning_leaves_the_record_untouched() {
    let mut store = Store::new(StoreConfig::default());
    people(&mut store);

    let nested = Value::Map(vec![("years".into(), Value::Int(40))]);
    let err = store
        .set_field("person", &Value::Int(1), "age", nested)
        .unwrap_err();
    assert_eq!(err.class, ErrorClass::Unsupported);

    assert_eq!(
        store.get("person", &Value::Int(1)).expect("person").value("age"),
        &Value::Int(30)
    );
    let bucket = store
        .collection("person")
        .expect("collection")
        .find(&[Value::Int(30)], Some("age"))
        .expect("find");
    assert_eq!(bucket.len(), 1);
    store.verify_consistency().expect("consistent");
}

#[test]
fn store_defaults_come_from_toml() {
    let mut store = Store::from_toml(
        r#"
        id_attribute = "uuid"
        on_conflict = "replace"
        "#,
    )
    .expect("config");
    store.define_mapper(MapperDef::new("note")).expect("note");

    store
        .add("note", record! { "uuid" => "a", "body" => "x", "pinned" => true })
        .expect("note");
    store
        .add("note", record! { "uuid" => "a", "body" => "y" })
        .expect("note");

    let note = store.get("note", &Value::from("a")).expect("note");
    assert_eq!(note.value("body"), &Value::from("y"));
    assert!(!note.contains("pinned"));

    assert!(Store::from_toml("notify_delay = \"soon\"").is_err());
}

#[test]
fn observers_see_one_coalesced_change_per_record() {
    let clock = Rc::new(ManualClock::new());
    let config = StoreConfig {
        notify_delay: 5,
        ..StoreConfig::default()
    };
    let mut store = Store::with_clock(config, clock);
    store.define_mapper(MapperDef::new("task")).expect("task");
    store
        .add_many(
            "task",
            [
                record! { "id" => 1, "done" => false },
                record! { "id" => 2, "done" => false },
            ],
        )
        .expect("tasks");

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    store
        .subscribe(
            "task",
            Rc::new(move |event: &CollectionEvent| {
                if let CollectionEvent::Change { id, changes, .. } = event {
                    sink.borrow_mut().push((id.clone(), changes.clone()));
                }
            }),
        )
        .expect("subscribe");

    store.set_field("task", &Value::Int(1), "done", true).expect("set");
    store.set_field("task", &Value::Int(1), "note", "later").expect("set");
    store.set_field("task", &Value::Int(2), "done", true).expect("set");
    store.set_field("task", &Value::Int(2), "done", false).expect("set");

    assert_eq!(store.advance(4), 0);
    assert_eq!(store.advance(1), 1);

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    let (id, changes) = &seen[0];
    assert_eq!(id, &Value::Int(1));
    assert_eq!(changes.changed.get("done"), Some(&Value::Bool(true)));
    assert_eq!(changes.added.get("note"), Some(&Value::from("later")));
}

#[derive(Default)]
struct Relinks {
    count: RefCell<u64>,
}

impl MetricsSink for Relinks {
    fn record(&self, event: MetricsEvent<'_>) {
        if matches!(event, MetricsEvent::Relink { .. }) {
            *self.count.borrow_mut() += 1;
        }
    }
}

#[test]
fn relinks_are_reported_to_the_metrics_sink() {
    let relinks = Rc::new(Relinks::default());

    with_metrics_sink(relinks.clone(), || {
        let mut store = Store::new(StoreConfig::default());
        store
            .define_mapper(MapperDef::new("team").relation(
                Relation::has_many(
                    "member",
                    RelationOptions::new().local_field("members").foreign_key("team_id"),
                )
                .expect("members"),
            ))
            .expect("team");
        store
            .define_mapper(MapperDef::new("member").relation(
                Relation::belongs_to(
                    "team",
                    RelationOptions::new().local_field("team").foreign_key("team_id"),
                )
                .expect("team"),
            ))
            .expect("member");

        store.add("team", record! { "id" => 1 }).expect("team");
        store.add("member", record! { "id" => 7 }).expect("member");
        store
            .set_link_one("member", &Value::Int(7), "team", Some(Value::Int(1)))
            .expect("link");
        store
            .set_link_one("member", &Value::Int(7), "team", Some(Value::Int(1)))
            .expect("unchanged");
    });

    assert_eq!(*relinks.count.borrow(), 1);
}
