use super::{Collection, CollectionError};
use crate::{
    db::index::{Index, RecordRef},
    record::Record,
    value::Value,
};

///
/// IndexTarget
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub(super) enum IndexTarget {
    Primary,
    Secondary(String),
}

///
/// PlanScope
///

#[derive(Clone, Copy, Debug)]
pub(super) enum PlanScope<'a> {
    All,
    Only(&'a str),
}

///
/// IndexOp
///
/// One index's share of a record transition. An empty removal key list
/// forces a full scan for the entry.
///

#[derive(Debug)]
pub(super) struct IndexOp {
    target: IndexTarget,
    remove: Option<(Vec<Value>, RecordRef)>,
    insert: Option<(Vec<Value>, RecordRef)>,
}

///
/// MutationPlan
///

#[derive(Debug, Default)]
pub(super) struct MutationPlan {
    ops: Vec<IndexOp>,
}

///
/// IndexDelta
///

#[derive(Clone, Copy, Debug, Default)]
pub(super) struct IndexDelta {
    pub inserts: u64,
    pub removes: u64,
}

impl Collection {
    /// Plan every index write for one record transition.
    ///
    /// All fallible work happens here. The returned plan is safe to apply
    /// infallibly; a failure leaves every index untouched.
    pub(super) fn plan_mutation(
        &self,
        old: Option<&Record>,
        new: Option<&Record>,
        scope: PlanScope<'_>,
    ) -> Result<MutationPlan, CollectionError> {
        let mut ops = Vec::with_capacity(self.indexes.len() + 1);

        for (target, index) in self.targets(scope) {
            let remove = old.map(|old| {
                let keys = index.key_for(old).unwrap_or_default();
                (keys, index.entry_for(old))
            });
            let insert = match new {
                Some(new) => Some((index.key_for(new)?, index.entry_for(new))),
                None => None,
            };

            // Unchanged position: nothing to move.
            if let (Some((old_keys, old_entry)), Some((new_keys, new_entry))) = (&remove, &insert)
                && !old_keys.is_empty()
                && old_keys == new_keys
                && old_entry.hash() == new_entry.hash()
                && old_entry.id() == new_entry.id()
            {
                continue;
            }

            ops.push(IndexOp {
                target,
                remove,
                insert,
            });
        }

        Ok(MutationPlan { ops })
    }

    /// Plan the removal of a record that may have been indexed under keys it
    /// no longer produces. Never fails.
    pub(super) fn plan_resync(&self, record: &Record, scope: PlanScope<'_>) -> MutationPlan {
        let ops = self
            .targets(scope)
            .map(|(target, index)| IndexOp {
                target,
                remove: Some((Vec::new(), index.entry_for(record))),
                insert: None,
            })
            .collect();

        MutationPlan { ops }
    }

    /// Plan the removal of an indexed record. Never fails.
    pub(super) fn plan_removal(&self, old: &Record) -> MutationPlan {
        let ops = self
            .targets(PlanScope::All)
            .map(|(target, index)| IndexOp {
                target,
                remove: Some((index.key_for(old).unwrap_or_default(), index.entry_for(old))),
                insert: None,
            })
            .collect();

        MutationPlan { ops }
    }

    pub(super) fn apply_plan(&mut self, plan: MutationPlan) -> IndexDelta {
        let mut delta = IndexDelta::default();

        for op in plan.ops {
            let index = match &op.target {
                IndexTarget::Primary => &mut self.primary,
                IndexTarget::Secondary(name) => match self.indexes.get_mut(name) {
                    Some(index) => index,
                    None => continue,
                },
            };

            if let Some((keys, entry)) = &op.remove
                && index.remove_planned(keys, entry)
            {
                delta.removes += 1;
            }
            if let Some((keys, entry)) = op.insert {
                index.insert_planned(&keys, entry);
                delta.inserts += 1;
            }
        }

        delta
    }

    fn targets<'a>(
        &'a self,
        scope: PlanScope<'a>,
    ) -> impl Iterator<Item = (IndexTarget, &'a Index)> + 'a {
        let primary = match scope {
            PlanScope::All => Some((IndexTarget::Primary, &self.primary)),
            PlanScope::Only(_) => None,
        };
        let secondary = self
            .indexes
            .iter()
            .filter(move |(name, _)| match scope {
                PlanScope::All => true,
                PlanScope::Only(only) => name.as_str() == only,
            })
            .map(|(name, index)| (IndexTarget::Secondary(name.clone()), index));

        primary.into_iter().chain(secondary)
    }
}

impl MutationPlan {
    /// Chain another plan after this one.
    pub(super) fn then(mut self, other: Self) -> Self {
        self.ops.extend(other.ops);
        self
    }
}
