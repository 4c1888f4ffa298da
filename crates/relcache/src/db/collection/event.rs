use crate::{record::Changes, value::Value};

///
/// CollectionEvent
///
/// Membership and change notifications delivered to collection observers.
/// `Change` events are re-emitted for member records once their coalesced
/// notification fires.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CollectionEvent {
    Add {
        collection: String,
        ids: Vec<Value>,
    },
    Remove {
        collection: String,
        ids: Vec<Value>,
    },
    Change {
        collection: String,
        id: Value,
        changes: Changes,
    },
}

impl CollectionEvent {
    #[must_use]
    pub fn collection(&self) -> &str {
        match self {
            Self::Add { collection, .. }
            | Self::Remove { collection, .. }
            | Self::Change { collection, .. } => collection,
        }
    }
}

///
/// CollectionObserver
///

pub trait CollectionObserver {
    fn on_event(&self, event: &CollectionEvent);
}

impl<F> CollectionObserver for F
where
    F: Fn(&CollectionEvent),
{
    fn on_event(&self, event: &CollectionEvent) {
        self(event);
    }
}
