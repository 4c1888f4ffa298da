use crate::{
    config::ConfigError,
    db::{
        collection::{CollectionError, ConsistencyError},
        index::IndexError,
        query::QueryError,
        relation::RelationError,
        store::StoreError,
    },
};
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable classification.
/// Every store-level entry point returns this; module errors convert into it
/// and stay reachable through `detail`.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    /// The variant (if present) must correspond to `origin`.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    fn with_detail(class: ErrorClass, origin: ErrorOrigin, detail: ErrorDetail) -> Self {
        Self {
            class,
            origin,
            message: detail.to_string(),
            detail: Some(detail),
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class, ErrorClass::NotFound)
    }

    #[must_use]
    pub const fn is_corruption(&self) -> bool {
        matches!(self.class, ErrorClass::Corruption)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`InternalError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Index(IndexError),
    #[error("{0}")]
    Collection(CollectionError),
    #[error("{0}")]
    Query(QueryError),
    #[error("{0}")]
    Relation(RelationError),
    #[error("{0}")]
    Store(StoreError),
    #[error("{0}")]
    Config(ConfigError),
}

impl From<IndexError> for InternalError {
    fn from(err: IndexError) -> Self {
        Self::with_detail(err.class(), ErrorOrigin::Index, ErrorDetail::Index(err))
    }
}

impl From<QueryError> for InternalError {
    fn from(err: QueryError) -> Self {
        Self::with_detail(err.class(), ErrorOrigin::Query, ErrorDetail::Query(err))
    }
}

impl From<CollectionError> for InternalError {
    fn from(err: CollectionError) -> Self {
        Self::with_detail(
            err.class(),
            ErrorOrigin::Collection,
            ErrorDetail::Collection(err),
        )
    }
}

impl From<ConsistencyError> for InternalError {
    fn from(err: ConsistencyError) -> Self {
        CollectionError::from(err).into()
    }
}

impl From<RelationError> for InternalError {
    fn from(err: RelationError) -> Self {
        Self::with_detail(
            err.class(),
            ErrorOrigin::Relation,
            ErrorDetail::Relation(err),
        )
    }
}

impl From<StoreError> for InternalError {
    fn from(err: StoreError) -> Self {
        Self::with_detail(err.class(), ErrorOrigin::Store, ErrorDetail::Store(err))
    }
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        Self::with_detail(
            ErrorClass::Unsupported,
            ErrorOrigin::Config,
            ErrorDetail::Config(err),
        )
    }
}

///
/// ErrorClass
/// Error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Corruption,
    NotFound,
    Conflict,
    Unsupported,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Corruption => "corruption",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Index,
    Collection,
    Query,
    Relation,
    Store,
    Config,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Index => "index",
            Self::Collection => "collection",
            Self::Query => "query",
            Self::Relation => "relation",
            Self::Store => "store",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn module_errors_keep_class_origin_and_detail() {
        let err = InternalError::from(StoreError::RecordNotFound {
            mapper: "post".into(),
            id: Value::Int(7),
        });
        assert!(err.is_not_found());
        assert_eq!(err.origin, ErrorOrigin::Store);
        assert!(matches!(err.detail, Some(ErrorDetail::Store(_))));
        assert_eq!(
            err.display_with_class(),
            "store:not_found: record 7 not found in 'post'"
        );

        let err = InternalError::from(ConsistencyError::StaleLink {
            mapper: "post".into(),
            id: Value::Int(7),
            field: "author".into(),
        });
        assert!(err.is_corruption());
        assert_eq!(err.origin, ErrorOrigin::Collection);
    }
}
