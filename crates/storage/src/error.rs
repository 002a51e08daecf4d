/// All errors that can be returned by a FieldStorage implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// No field definition with the given id.
    #[error("field not found: {field_id}")]
    FieldNotFound { field_id: String },

    /// A field definition with this id already exists.
    #[error("field already exists: {field_id}")]
    FieldAlreadyExists { field_id: String },

    /// No value row with the given id.
    #[error("value not found: {value_id}")]
    ValueNotFound { value_id: String },

    /// A host already has a value for this field. At most one row may exist
    /// per `(host_type, host_id, field_id)`.
    #[error("duplicate value for field {field_id} on {host_type}/{host_id}")]
    DuplicateValue {
        host_type: String,
        host_id: String,
        field_id: String,
    },

    /// A backend-specific storage error (DB connection, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}
