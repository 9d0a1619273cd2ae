use liab_flake::FlakeError;
use liab_types::TypeError;

use crate::schema::DeclKind;

/// Errors from store operations.
///
/// Only the generator's clock-regression and sequence-overrun conditions are
/// recovered below this layer; everything here reaches the caller, and inside
/// [`Store::write`](crate::Store::write) any of them aborts the transaction.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A schema lookup named an undeclared type or field.
    #[error("unknown field `{name}` on `{owner}`")]
    UnknownField { owner: String, name: String },

    /// A declared field was used as the wrong kind of handle.
    #[error("`{owner}.{name}` is a {found}, not a {expected}")]
    KindMismatch {
        owner: String,
        name: String,
        expected: DeclKind,
        found: DeclKind,
    },

    /// An item of the wrong type was added to a bucket.
    #[error("bucket `{bucket}` holds `{expected}` items, got `{found}`")]
    WrongMemberType {
        bucket: String,
        expected: String,
        found: String,
    },

    /// The schema failed validation at open time.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// Configuration could not be parsed or is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Identifier generation failed.
    #[error(transparent)]
    Flake(#[from] FlakeError),

    /// A key segment could not be decoded.
    #[error("key codec error: {0}")]
    Codec(#[from] TypeError),

    /// Payload serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// I/O error while reading configuration or schema files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
