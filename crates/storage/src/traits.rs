use async_trait::async_trait;
use dynfields_core::HostRef;

use crate::error::StorageError;
use crate::record::{FieldRecord, ValueChanges, ValueRow};

/// The storage trait for custom-field backends.
///
/// A `FieldStorage` implementation persists field definitions and the value
/// rows that hang off them. Backends enforce two integrity rules:
///
/// - at most one value row per `(host_type, host_id, field_id)`;
/// - deleting a field deletes its values.
///
/// Field name uniqueness is not enforced here. It depends on scope overlap
/// rules that live with the host layer; [`field_name_taken`] gives that
/// layer the query it needs.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` so they can be shared
/// across async task boundaries.
///
/// [`field_name_taken`]: FieldStorage::field_name_taken
#[async_trait]
pub trait FieldStorage: Send + Sync + 'static {
    // ── Field definitions ────────────────────────────────────────────────────

    /// Returns `Err(StorageError::FieldAlreadyExists)` if the id is in use.
    async fn insert_field(&self, field: FieldRecord) -> Result<(), StorageError>;

    /// Replace a stored definition. Returns `Err(StorageError::FieldNotFound)`
    /// if no definition has this id.
    async fn update_field(&self, field: FieldRecord) -> Result<(), StorageError>;

    /// Delete a definition and its values. Returns the number of values
    /// removed.
    async fn delete_field(&self, field_id: &str) -> Result<usize, StorageError>;

    async fn get_field(&self, field_id: &str) -> Result<FieldRecord, StorageError>;

    /// Definitions for `host_type` whose scope is NULL or equal to `scope`,
    /// in insertion order.
    async fn list_fields(
        &self,
        host_type: &str,
        scope: Option<&str>,
    ) -> Result<Vec<FieldRecord>, StorageError>;

    /// Whether another definition (not `exclude_id`) already uses `name`
    /// for `host_type` in an overlapping scope. A NULL scope overlaps every
    /// scope.
    async fn field_name_taken(
        &self,
        name: &str,
        host_type: &str,
        scope: Option<&str>,
        exclude_id: Option<&str>,
    ) -> Result<bool, StorageError>;

    // ── Values ───────────────────────────────────────────────────────────────

    /// Returns `Err(StorageError::DuplicateValue)` when the host already has
    /// a value for the field, and `Err(StorageError::FieldNotFound)` when the
    /// field does not exist.
    async fn insert_value(&self, row: ValueRow) -> Result<(), StorageError>;

    /// Replace the stored value of an existing row.
    async fn update_value(&self, row: ValueRow) -> Result<(), StorageError>;

    async fn delete_value(&self, value_id: &str) -> Result<(), StorageError>;

    /// Apply inserts, updates and deletes atomically: every precondition is
    /// checked before anything is written.
    async fn apply_values(&self, changes: ValueChanges) -> Result<(), StorageError>;

    /// All values of one host, in insertion order.
    async fn list_values(&self, host: &HostRef) -> Result<Vec<ValueRow>, StorageError>;

    /// Delete all values of one host. Returns the number removed.
    async fn delete_host_values(&self, host: &HostRef) -> Result<usize, StorageError>;

    /// The value rows of one field: the sub-relation a query condition on
    /// that field ranges over.
    async fn scoped_values(&self, field_id: &str) -> Result<Vec<ValueRow>, StorageError>;
}
