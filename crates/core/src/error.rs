/// Programmer errors: raised immediately and never collected into an
/// `Errors` set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    /// A type discriminator outside the closed set of field types.
    #[error("unknown field type: {0}")]
    UnknownFieldType(String),

    /// An operator that the finder's alias table does not know.
    #[error("invalid operator '{operator}' for {finder}")]
    InvalidOperator { operator: String, finder: String },

    /// A filter or assignment collection that is neither a list nor a map.
    #[error("expected {expected}, got {got}")]
    InvalidCollection { expected: String, got: String },

    /// A single filter or assignment entry that is not a map.
    #[error("invalid {what} descriptor: {got}")]
    InvalidDescriptor { what: String, got: String },
}

/// Errors raised while binding a value record to its field definition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// The host record's type differs from the field's declared host type.
    #[error("field '{field}' belongs to host type '{expected}', not '{got}'")]
    HostTypeMismatch {
        field: String,
        expected: String,
        got: String,
    },

    /// An operation needed the field definition before one was bound.
    #[error("value {value_id} is not bound to a field definition")]
    UnboundField { value_id: String },

    #[error(transparent)]
    Usage(#[from] UsageError),
}

/// Short JSON kind name used in error messages.
pub fn json_kind(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
