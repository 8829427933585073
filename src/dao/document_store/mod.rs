pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::{future::BoxFuture, stream::BoxStream};
use serde_json::Value;

use crate::dao::storage::StorageResult;

/// Field map of a single document as stored in a collection.
///
/// Every document carries its identity in the `id` field; backends that use a
/// different primary-key column (e.g. Mongo's `_id`) translate on the way in
/// and out.
pub type Fields = serde_json::Map<String, Value>;

/// Abstraction over the shared document store consumed by the repository.
///
/// The contract is deliberately small: per-document atomic read-modify-write,
/// equality-filtered queries, and change subscriptions. There are no
/// cross-document transactions; every consistency guarantee above this seam is
/// built from conditional single-document writes.
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by identity.
    fn get(
        &self,
        collection: &'static str,
        id: &str,
    ) -> BoxFuture<'static, StorageResult<Option<Fields>>>;

    /// Create or fully overwrite the document with the given identity.
    fn set(
        &self,
        collection: &'static str,
        id: &str,
        fields: Fields,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Atomically merge the given fields into an existing document.
    ///
    /// Fails with [`StorageError::NotFound`] when the document is absent.
    fn update(
        &self,
        collection: &'static str,
        id: &str,
        fields: Fields,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Conditionally merge fields: the write applies only when the document
    /// exists and `guard_field` currently equals `guard`. A `Value::Null`
    /// guard also matches an absent field.
    ///
    /// Returns whether the write was applied. This is the compare-and-swap
    /// primitive used to claim a venue's current round and to let the deadline
    /// scheduler race admin actions safely.
    fn update_where_eq(
        &self,
        collection: &'static str,
        id: &str,
        guard_field: &'static str,
        guard: Value,
        fields: Fields,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    /// Create a document with a store-generated identity, returned to the
    /// caller.
    fn add(&self, collection: &'static str, fields: Fields)
    -> BoxFuture<'static, StorageResult<String>>;

    /// Return every document whose `field` equals `value`.
    fn query_eq(
        &self,
        collection: &'static str,
        field: &'static str,
        value: Value,
    ) -> BoxFuture<'static, StorageResult<Vec<Fields>>>;

    /// Return every document in the collection.
    fn list(&self, collection: &'static str) -> BoxFuture<'static, StorageResult<Vec<Fields>>>;

    /// Stream the document's value, emitting the current state immediately and
    /// again after every change. `None` items signal that the document does
    /// not (or no longer) exist.
    fn watch_doc(&self, collection: &'static str, id: &str) -> BoxStream<'static, Option<Fields>>;

    /// Stream the result set of an equality query, emitting the current rows
    /// immediately and again whenever the set changes.
    fn watch_query_eq(
        &self,
        collection: &'static str,
        field: &'static str,
        value: Value,
    ) -> BoxStream<'static, Vec<Fields>>;

    /// Cheap connectivity probe used by the storage supervisor.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;

    /// Attempt to re-establish the backend connection after a failed probe.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Narrow a JSON value down to a field map, yielding an empty map for
/// non-object values. Callers build updates with `serde_json::json!` and this
/// keeps the conversion in one place.
pub fn to_fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => Fields::new(),
    }
}
