use super::{Link, Relation, RelationError, RelationKeys};
use crate::{db::collection::Collection, record::Record, value::Value};

pub(super) fn find_existing_links(
    relation: &Relation,
    owner_id: &Value,
    record: &Record,
    related: &Collection,
) -> Result<Link, RelationError> {
    let ids = match relation.keys() {
        RelationKeys::ForeignKey(field) => children_by_foreign_key(related, field, owner_id)?,
        RelationKeys::LocalKeys(field) => record
            .value(field)
            .as_list()
            .map(|keys| {
                keys.iter()
                    .filter(|key| related.contains(key))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default(),
        RelationKeys::ForeignKeys(field) => related
            .query()
            .filter_by(|child| {
                child
                    .value(field)
                    .as_list()
                    .is_some_and(|keys| keys.contains(owner_id))
            })
            .map(|child| related.record_id(child).clone()),
    };

    Ok(Link::Many(ids))
}

/// Ids of related records whose `field` equals `owner_id`, in index order.
/// Falls back to a primary-order scan when `field` has no index.
pub(super) fn children_by_foreign_key(
    related: &Collection,
    field: &str,
    owner_id: &Value,
) -> Result<Vec<Value>, RelationError> {
    if owner_id.is_null() {
        return Ok(Vec::new());
    }

    let children = match related.index(field) {
        Some(_) => related.find(std::slice::from_ref(owner_id), Some(field))?,
        None => related
            .query()
            .filter_by(|child| child.value(field) == owner_id)
            .run(),
    };

    Ok(children
        .into_iter()
        .map(|child| related.record_id(child).clone())
        .collect())
}
