use super::{Link, Relation};
use crate::{db::collection::Collection, record::Record};

/// The owner's foreign key, when it names a record present in `related`.
pub(super) fn find_existing_link(
    relation: &Relation,
    record: &Record,
    related: &Collection,
) -> Link {
    let key = relation.get_foreign_key(record);

    if key.is_null() || !related.contains(key) {
        return Link::One(None);
    }

    Link::One(Some(key.clone()))
}
