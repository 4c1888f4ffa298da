use super::{Link, Relation, RelationError, has_many};
use crate::{db::collection::Collection, value::Value};

/// First related record carrying the owner's id in the foreign key.
pub(super) fn find_existing_link(
    relation: &Relation,
    owner_id: &Value,
    related: &Collection,
) -> Result<Link, RelationError> {
    let Some(field) = relation.foreign_key() else {
        return Ok(Link::One(None));
    };

    let first = has_many::children_by_foreign_key(related, field, owner_id)?
        .into_iter()
        .next();

    Ok(Link::One(first))
}
