//! Cached-link upkeep after a record is added, rewritten or removed.
//!
//! Links are either refreshed in place (when the owner already has one
//! cached) or dropped so the next `link` call resolves them again.

use super::Store;
use crate::{
    db::relation::{Link, Relation, RelationKeys, RelationKind},
    record::Record,
    value::Value,
};
use std::{collections::BTreeSet, rc::Rc};

static NULL: Value = Value::Null;

fn key<'r>(record: Option<&'r Record>, field: &str) -> &'r Value {
    record.map_or(&NULL, |record| record.value(field))
}

fn key_list(record: Option<&Record>, field: &str) -> BTreeSet<Value> {
    key(record, field)
        .as_list()
        .map(|keys| keys.iter().cloned().collect())
        .unwrap_or_default()
}

impl Store {
    /// Bring cached links in line with one record moving from `before` to
    /// `after`. `None` on either side means added or removed.
    pub(super) fn reconcile(
        &mut self,
        mapper: &str,
        before: Option<&Record>,
        after: Option<&Record>,
    ) {
        let Some(schema) = self.registry.get(mapper) else {
            return;
        };
        let Some(id) = after
            .or(before)
            .map(|record| record.value(schema.id_attribute()).clone())
        else {
            return;
        };
        let own: Vec<Rc<Relation>> = schema.relations().to_vec();
        let incoming = self.registry.relations_to(mapper);

        if let (Some(before), Some(after)) = (before, after) {
            for relation in &own {
                self.reconcile_own(mapper, &id, relation, before, after);
            }
        }

        let added = before.is_none();
        let removed = after.is_none();
        for (owner, relation) in incoming {
            let local = relation.local_field();

            match (relation.kind(), relation.keys()) {
                (RelationKind::BelongsTo, RelationKeys::ForeignKey(field)) => {
                    if removed {
                        self.links.forget_where(&owner, local, |_, link| link.contains(&id));
                    } else if added {
                        let owners = self.collections.get(&owner);
                        self.links.forget_where(&owner, local, |owner_id, link| {
                            *link == Link::One(None)
                                && owners
                                    .and_then(|c| c.get(owner_id))
                                    .is_some_and(|record| record.value(field) == &id)
                        });
                    }
                }
                (_, RelationKeys::ForeignKey(field)) => {
                    let old_owner = key(before, field);
                    let new_owner = key(after, field);
                    if !added && !removed && old_owner == new_owner {
                        continue;
                    }
                    for owner_id in [old_owner, new_owner] {
                        if !owner_id.is_null() {
                            self.refresh(&owner, &relation, owner_id);
                        }
                    }
                }
                (_, RelationKeys::ForeignKeys(field)) => {
                    let old_owners = key_list(before, field);
                    let new_owners = key_list(after, field);
                    for owner_id in old_owners.symmetric_difference(&new_owners) {
                        self.refresh(&owner, &relation, owner_id);
                    }
                }
                (_, RelationKeys::LocalKeys(field)) => {
                    if !added && !removed {
                        continue;
                    }
                    let owners = self.collections.get(&owner);
                    self.links.forget_where(&owner, local, |owner_id, link| {
                        link.contains(&id)
                            || owners
                                .and_then(|c| c.get(owner_id))
                                .and_then(|record| record.value(field).as_list())
                                .is_some_and(|keys| keys.contains(&id))
                    });
                }
            }
        }
    }

    // Keys held on the record itself: a belongsTo key or a local key list.
    fn reconcile_own(
        &mut self,
        mapper: &str,
        id: &Value,
        relation: &Relation,
        before: &Record,
        after: &Record,
    ) {
        let local = relation.local_field();

        match (relation.kind(), relation.keys()) {
            (RelationKind::BelongsTo, RelationKeys::ForeignKey(field)) => {
                let target = after.value(field);
                if before.value(field) == target {
                    return;
                }

                let exists = self
                    .collections
                    .get(relation.related())
                    .is_some_and(|related| related.contains(target));
                if target.is_null() {
                    self.links.cache(mapper, id, local, Link::One(None));
                } else if exists {
                    self.links
                        .cache(mapper, id, local, Link::One(Some(target.clone())));
                } else {
                    self.links.forget(mapper, id, local);
                }
            }
            (_, RelationKeys::LocalKeys(field)) => {
                if before.value(field) != after.value(field) {
                    self.links.forget(mapper, id, local);
                }
            }
            _ => {}
        }
    }

    // Recompute an owner's cached link; owners without one stay lazy.
    fn refresh(&mut self, owner: &str, relation: &Relation, owner_id: &Value) {
        if relation.get_local_field(&self.links, owner_id).is_none() {
            return;
        }

        let link = self
            .collections
            .get(owner)
            .and_then(|collection| collection.get(owner_id))
            .zip(self.collections.get(relation.related()))
            .and_then(|(record, related)| relation.find_existing_links_for(record, related).ok());

        match link {
            Some(link) => self.links.cache(owner, owner_id, relation.local_field(), link),
            None => {
                self.links.forget(owner, owner_id, relation.local_field());
            }
        }
    }
}
