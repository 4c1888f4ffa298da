use crate::{record::Record, value::Value};
use std::{fmt, rc::Rc};

/// Key-extraction function over a whole record.
pub type KeyFn = Rc<dyn Fn(&Record) -> Value>;

///
/// IndexField
///
/// One component of an index key: a (possibly dotted) field path or a
/// computed key. Missing fields produce `Null`.
///

#[derive(Clone)]
pub enum IndexField {
    Field(String),
    Computed { name: String, key: KeyFn },
}

impl IndexField {
    #[must_use]
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    pub fn computed(name: impl Into<String>, key: impl Fn(&Record) -> Value + 'static) -> Self {
        Self::Computed {
            name: name.into(),
            key: Rc::new(key),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Field(name) | Self::Computed { name, .. } => name,
        }
    }

    #[must_use]
    pub fn extract(&self, record: &Record) -> Value {
        match self {
            Self::Field(path) => record.get_path(path).cloned().unwrap_or(Value::Null),
            Self::Computed { key, .. } => key(record),
        }
    }
}

impl fmt::Debug for IndexField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => f.debug_tuple("Field").field(name).finish(),
            Self::Computed { name, .. } => f.debug_struct("Computed").field("name", name).finish(),
        }
    }
}

impl From<&str> for IndexField {
    fn from(name: &str) -> Self {
        Self::field(name)
    }
}

impl From<String> for IndexField {
    fn from(name: String) -> Self {
        Self::Field(name)
    }
}
