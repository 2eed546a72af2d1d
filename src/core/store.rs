//! Store traits for the relational data store
//!
//! The store is an external collaborator: everything above this module
//! talks to it only through [`EntityStore`] and [`StoreTransaction`].
//! Records travel as JSON objects keyed by column name; the typed
//! [`Entity`](crate::core::entity::Entity) layer converts at the edges.

use crate::core::schema::{EntityKind, JoinRelation};
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// A row: column name to value, always including `id`
pub type Record = Map<String, Value>;

/// Column values supplied to a write
pub type Fields = Map<String, Value>;

/// Constraint and backend failures reported by a store
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("No {kind} record found for id {id}")]
    NotFound { kind: EntityKind, id: i64 },

    #[error("Unique constraint failed on the fields: (`{field}`)")]
    UniqueViolation { kind: EntityKind, field: String },

    #[error("Foreign key constraint failed on the field: `{field}` ({target} {id} does not exist)")]
    ForeignKeyViolation {
        kind: EntityKind,
        field: String,
        target: EntityKind,
        id: i64,
    },

    #[error("{kind} {id} is still referenced by {dependent}")]
    Restricted {
        kind: EntityKind,
        id: i64,
        dependent: String,
    },

    #[error("Unknown argument `{field}` for {kind}")]
    UnknownField { kind: EntityKind, field: String },

    #[error("Argument `{field}` is missing for {kind}")]
    MissingField { kind: EntityKind, field: String },

    #[error("Invalid value for argument `{field}`: {message}")]
    InvalidField {
        kind: EntityKind,
        field: String,
        message: String,
    },

    #[error("`{field}` is not a unique key of {kind}")]
    InvalidKey { kind: EntityKind, field: String },

    #[error("Failed to decode {kind} record: {message}")]
    Decode { kind: EntityKind, message: String },

    #[error("Store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Entry point of a store: hands out transactions
///
/// Implementations must make every transaction atomic: either all of its
/// writes become visible at [`StoreTransaction::commit`], or none do.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Start a new transaction
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;
}

/// Unit of work against the store
///
/// Dropping a transaction without calling [`commit`](Self::commit)
/// discards all of its writes.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Insert a row, assigning a fresh id
    ///
    /// Fails on unknown columns, wrong types, missing required columns,
    /// unique violations and dangling foreign keys.
    async fn create(&mut self, kind: EntityKind, fields: Fields) -> StoreResult<Record>;

    /// Fetch a row by id
    async fn find_by_id(&mut self, kind: EntityKind, id: i64) -> StoreResult<Option<Record>>;

    /// Fetch every row whose `field` equals `value`, ordered by id
    async fn find_by(
        &mut self,
        kind: EntityKind,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<Record>>;

    /// Overwrite the given columns of an existing row
    async fn update(&mut self, kind: EntityKind, id: i64, fields: Fields) -> StoreResult<Record>;

    /// Remove a row, returning it
    ///
    /// Fails with [`StoreError::Restricted`] while another row or a join
    /// pair still references it.
    async fn delete(&mut self, kind: EntityKind, id: i64) -> StoreResult<Record>;

    /// Return the row whose unique `key` matches `fields[key]`, creating it
    /// from `fields` when there is none
    ///
    /// An existing row is returned untouched.
    async fn upsert_by_unique_key(
        &mut self,
        kind: EntityKind,
        key: &str,
        fields: Fields,
    ) -> StoreResult<Record>;

    /// Add a pair to a join relation
    ///
    /// Returns `false` when the pair was already present. Both endpoints
    /// must exist.
    async fn connect(&mut self, relation: JoinRelation, left: i64, right: i64) -> StoreResult<bool>;

    /// Remove a pair from a join relation
    ///
    /// Returns `false` when the pair was absent.
    async fn disconnect(
        &mut self,
        relation: JoinRelation,
        left: i64,
        right: i64,
    ) -> StoreResult<bool>;

    /// Right-hand ids paired with `left`, ascending
    async fn linked(&mut self, relation: JoinRelation, left: i64) -> StoreResult<Vec<i64>>;

    /// Publish every write made through this transaction
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
