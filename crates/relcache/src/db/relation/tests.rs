use super::*;
use crate::{config::StoreConfig, db::mapper::MapperDef, record::Record};

fn fk(local: &str, key: &str) -> RelationOptions {
    RelationOptions::new().local_field(local).foreign_key(key)
}

fn registry(defs: Vec<MapperDef>) -> MapperRegistry {
    let mut registry = MapperRegistry::new();
    for def in defs {
        let (mapper, _) = def.build(&StoreConfig::default()).expect("build");
        registry.insert(mapper.name().to_string(), mapper);
    }
    registry
}

fn author_and_post() -> MapperRegistry {
    registry(vec![
        MapperDef::new("author")
            .relation(Relation::has_many("post", fk("posts", "author_id")).expect("relation")),
        MapperDef::new("post")
            .relation(Relation::belongs_to("author", fk("author", "author_id")).expect("relation"))
            .relation(Relation::belongs_to("author", fk("editor", "editor_id")).expect("relation")),
    ])
}

///
/// CONSTRUCTION
///

#[test]
fn constructors_validate_required_options() {
    let err = Relation::belongs_to("author", RelationOptions::new().foreign_key("a")).unwrap_err();
    assert!(matches!(err, RelationError::MissingLocalField { .. }));

    let err = Relation::has_one("profile", RelationOptions::new().local_field("p")).unwrap_err();
    assert!(matches!(
        err,
        RelationError::MissingForeignKey {
            kind: RelationKind::HasOne,
            ..
        }
    ));
    assert_eq!(err.class(), ErrorClass::Unsupported);

    let err = Relation::has_many("post", RelationOptions::new().local_field("posts")).unwrap_err();
    assert!(matches!(err, RelationError::MissingKeys { .. }));
}

#[test]
fn has_many_prefers_foreign_key_then_local_keys() {
    let relation = Relation::has_many(
        "tag",
        RelationOptions::new()
            .local_field("tags")
            .local_keys("tag_ids")
            .foreign_keys("post_ids"),
    )
    .expect("relation");

    assert_eq!(relation.keys(), &RelationKeys::LocalKeys("tag_ids".into()));
    assert_eq!(relation.foreign_key(), None);
}

#[test]
fn add_descriptor_installs_link_and_foreign_key_accessors() {
    let relation = Relation::belongs_to("author", fk("author", "author_id")).expect("relation");
    let mut accessors = BTreeMap::new();
    relation.add_descriptor(3, &mut accessors);

    assert_eq!(accessors.get("author"), Some(&Accessor::Link(3)));
    assert_eq!(accessors.get("author_id"), Some(&Accessor::ForeignKey(3)));

    let children = Relation::has_many("post", fk("posts", "author_id")).expect("relation");
    let mut accessors = BTreeMap::new();
    children.add_descriptor(0, &mut accessors);
    assert_eq!(accessors.len(), 1);
}

#[test]
fn assign_to_binds_once() {
    let mut relation = Relation::belongs_to("author", fk("author", "author_id")).expect("relation");
    relation.assign_to("post", "id");
    relation.assign_to("comment", "id");

    assert_eq!(relation.owner(), Some("post"));
    assert!(relation.is_associated_with("author"));
    assert!(!relation.is_associated_with("post"));
}

#[test]
fn unassigned_relations_cannot_touch_the_link_table() {
    let relation = Relation::belongs_to("author", fk("author", "author_id")).expect("relation");
    let mut links = LinkTable::new();

    let err = relation
        .set_local_field(&mut links, &Value::Int(1), Link::One(None))
        .unwrap_err();
    assert!(matches!(err, RelationError::NotAssigned { .. }));
    assert!(relation.get_local_field(&links, &Value::Int(1)).is_none());
}

///
/// INVERSE
///

#[test]
fn inverse_matches_on_foreign_key() {
    let registry = author_and_post();
    let posts = &registry.get("author").expect("author").relations()[0];

    let inverse = posts.get_inverse(&registry).expect("inverse").expect("some");
    assert_eq!(inverse.local_field(), "author");

    let editor = &registry.get("post").expect("post").relations()[1];
    assert!(editor.get_inverse(&registry).expect("inverse").is_none());
}

#[test]
fn inverse_without_foreign_keys_is_ambiguous_when_tied() {
    let registry = registry(vec![
        MapperDef::new("post").relation(
            Relation::has_many(
                "tag",
                RelationOptions::new().local_field("tags").local_keys("tag_ids"),
            )
            .expect("relation"),
        ),
        MapperDef::new("tag")
            .relation(
                Relation::has_many(
                    "post",
                    RelationOptions::new().local_field("posts").foreign_keys("tag_ids"),
                )
                .expect("relation"),
            )
            .relation(
                Relation::has_many(
                    "post",
                    RelationOptions::new().local_field("featured").foreign_keys("hero_ids"),
                )
                .expect("relation"),
            ),
    ]);

    let tags = &registry.get("post").expect("post").relations()[0];
    let err = tags.get_inverse(&registry).unwrap_err();
    assert!(matches!(
        err,
        RelationError::AmbiguousInverse { ref candidates, .. } if candidates.len() == 2
    ));
}

#[test]
fn unknown_related_mapper_is_reported() {
    let registry = registry(vec![
        MapperDef::new("post")
            .relation(Relation::belongs_to("author", fk("author", "author_id")).expect("relation")),
    ]);
    let relation = &registry.get("post").expect("post").relations()[0];

    assert!(matches!(
        relation.get_relation(&registry),
        Err(RelationError::UnknownMapper { .. })
    ));
}

///
/// LOOKUP
///

fn collection_of(name: &str, rows: Vec<Record>) -> Collection {
    let mut collection = Collection::new(name, "id");
    for row in rows {
        collection.insert(row).expect("insert");
    }
    collection
}

#[test]
fn belongs_to_resolves_only_present_targets() {
    let registry = author_and_post();
    let author = &registry.get("post").expect("post").relations()[0];
    let authors = collection_of("author", vec![Record::from_fields([("id", 1)])]);

    let post = Record::from_fields([("id", 10), ("author_id", 1)]);
    assert_eq!(
        author.find_existing_links_for(&post, &authors).expect("link"),
        Link::One(Some(Value::Int(1)))
    );

    let orphan = Record::from_fields([("id", 11), ("author_id", 9)]);
    assert_eq!(
        author.find_existing_links_for(&orphan, &authors).expect("link"),
        Link::One(None)
    );
}

#[test]
fn has_many_by_foreign_key_uses_index_or_scan() {
    let registry = author_and_post();
    let posts_rel = &registry.get("author").expect("author").relations()[0];
    let rows = vec![
        Record::from_fields([("id", 12), ("author_id", 1)]),
        Record::from_fields([("id", 10), ("author_id", 1)]),
        Record::from_fields([("id", 11), ("author_id", 2)]),
    ];
    let author = Record::from_fields([("id", 1)]);

    let scanned = collection_of("post", rows.clone());
    assert_eq!(
        posts_rel.find_existing_links_for(&author, &scanned).expect("link"),
        Link::Many(vec![Value::Int(10), Value::Int(12)])
    );

    let mut indexed = collection_of("post", rows);
    indexed
        .create_index("author_id", vec!["author_id".into()])
        .expect("index");
    assert_eq!(
        posts_rel.find_existing_links_for(&author, &indexed).expect("link"),
        Link::Many(vec![Value::Int(10), Value::Int(12)])
    );
}

#[test]
fn local_and_foreign_key_lists() {
    let registry = registry(vec![
        MapperDef::new("post").relation(
            Relation::has_many(
                "tag",
                RelationOptions::new().local_field("tags").local_keys("tag_ids"),
            )
            .expect("relation"),
        ),
        MapperDef::new("tag").relation(
            Relation::has_many(
                "post",
                RelationOptions::new().local_field("posts").foreign_keys("tag_ids"),
            )
            .expect("relation"),
        ),
    ]);
    let tags_rel = &registry.get("post").expect("post").relations()[0];
    let posts_rel = &registry.get("tag").expect("tag").relations()[0];

    let tags = collection_of(
        "tag",
        vec![Record::from_fields([("id", 1)]), Record::from_fields([("id", 2)])],
    );
    let post = Record::from_fields([("id", Value::from(7)), ("tag_ids", Value::from(vec![2, 9, 1]))]);
    assert_eq!(
        tags_rel.find_existing_links_for(&post, &tags).expect("link"),
        Link::Many(vec![Value::Int(2), Value::Int(1)])
    );

    let posts = collection_of("post", vec![post.clone()]);
    let tag = Record::from_fields([("id", 1)]);
    assert_eq!(
        posts_rel.find_existing_links_for(&tag, &posts).expect("link"),
        Link::Many(vec![Value::Int(7)])
    );
}

#[test]
fn has_one_takes_the_first_holder() {
    let registry = registry(vec![
        MapperDef::new("user")
            .relation(Relation::has_one("profile", fk("profile", "user_id")).expect("relation")),
    ]);
    let profile_rel = &registry.get("user").expect("user").relations()[0];
    let profiles = collection_of(
        "profile",
        vec![
            Record::from_fields([("id", 5), ("user_id", 1)]),
            Record::from_fields([("id", 3), ("user_id", 1)]),
        ],
    );

    let user = Record::from_fields([("id", 1)]);
    assert_eq!(
        profile_rel.find_existing_links_for(&user, &profiles).expect("link"),
        Link::One(Some(Value::Int(3)))
    );
}
