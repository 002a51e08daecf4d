//! Value records: one host record's value for one field definition.
//!
//! A record can be assigned before it knows its field. The raw input is
//! parked in [`PendingValue`] and cast once the field is bound, so
//! assignment order never matters.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ulid::Ulid;

use crate::error::FieldError;
use crate::field::FieldDefinition;
use crate::types::TypedValue;
use crate::validate::{ErrorCode, Errors};

/// Identity of a host record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HostRef {
    pub host_type: String,
    pub host_id: String,
}

impl HostRef {
    pub fn new(host_type: impl Into<String>, host_id: impl Into<String>) -> Self {
        HostRef {
            host_type: host_type.into(),
            host_id: host_id.into(),
        }
    }
}

impl fmt::Display for HostRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.host_type, self.host_id)
    }
}

/// Raw input waiting for a field. `Set(None)` is an explicit nil, distinct
/// from never having been assigned.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PendingValue {
    #[default]
    Unset,
    Set(Option<Value>),
}

#[derive(Debug, Clone)]
pub struct ValueRecord {
    id: String,
    host: HostRef,
    field: Option<Arc<FieldDefinition>>,
    stored: Value,
    pending: PendingValue,
    persisted: bool,
    changed: bool,
}

impl ValueRecord {
    /// A new, unbound record for `host`.
    pub fn new(host: HostRef) -> Self {
        ValueRecord {
            id: Ulid::new().to_string(),
            host,
            field: None,
            stored: Value::Null,
            pending: PendingValue::Unset,
            persisted: false,
            changed: false,
        }
    }

    /// A new record bound to `field`, holding the field's default.
    pub fn for_field(host: HostRef, field: Arc<FieldDefinition>) -> Result<Self, FieldError> {
        let mut record = ValueRecord::new(host);
        record.bind(field)?;
        Ok(record)
    }

    /// A persisted record loaded from storage. `stored` is taken verbatim.
    pub fn from_stored(
        id: impl Into<String>,
        host: HostRef,
        field: Arc<FieldDefinition>,
        stored: Value,
    ) -> Result<Self, FieldError> {
        check_host(&host, &field)?;
        Ok(ValueRecord {
            id: id.into(),
            host,
            field: Some(field),
            stored,
            pending: PendingValue::Unset,
            persisted: true,
            changed: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn host(&self) -> &HostRef {
        &self.host
    }

    pub fn field(&self) -> Option<&Arc<FieldDefinition>> {
        self.field.as_ref()
    }

    pub fn field_id(&self) -> Option<&str> {
        self.field.as_deref().map(FieldDefinition::id)
    }

    pub fn stored_value(&self) -> &Value {
        &self.stored
    }

    pub fn pending(&self) -> &PendingValue {
        &self.pending
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// True once an assignment has been applied since load or creation.
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn mark_persisted(&mut self) {
        self.persisted = true;
        self.changed = false;
    }

    /// Assign raw input. JSON null and `None` are both nil. Unbound records
    /// park the input until [`bind`](ValueRecord::bind).
    pub fn assign(&mut self, raw: Option<Value>) {
        let raw = raw.filter(|v| !v.is_null());
        match &self.field {
            Some(field) => {
                self.stored = match &raw {
                    Some(v) => field.caster().serialize(v).unwrap_or(Value::Null),
                    None => Value::Null,
                };
                self.changed = true;
            }
            None => self.pending = PendingValue::Set(raw),
        }
    }

    /// Attach the field definition. A parked assignment is cast now; a
    /// fresh record with nothing parked takes the field's default.
    pub fn bind(&mut self, field: Arc<FieldDefinition>) -> Result<(), FieldError> {
        check_host(&self.host, &field)?;
        let fresh = !self.persisted && !self.changed;
        self.field = Some(field);
        match std::mem::take(&mut self.pending) {
            PendingValue::Set(raw) => self.assign(raw),
            PendingValue::Unset => {
                if fresh {
                    if let Some(field) = &self.field {
                        self.stored = field.default_value().clone();
                    }
                }
            }
        }
        Ok(())
    }

    /// The typed value. Nil when unbound or when storage is malformed.
    pub fn value(&self) -> Option<TypedValue> {
        let field = self.field.as_deref()?;
        field.caster().deserialize(&self.stored)
    }

    /// Validate against the bound field's validator, under `value`. An
    /// unbound record reports `field: required`.
    pub fn validate(&self) -> Errors {
        let mut errors = Errors::new();
        match &self.field {
            None => errors.add("field", ErrorCode::Required),
            Some(field) => {
                let value = self.value();
                errors.merge("value", field.validator().validate(value.as_ref()));
            }
        }
        errors
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

fn check_host(host: &HostRef, field: &FieldDefinition) -> Result<(), FieldError> {
    if host.host_type != field.host_type() {
        return Err(FieldError::HostTypeMismatch {
            field: field.name().to_string(),
            expected: field.host_type().to_string(),
            got: host.host_type.clone(),
        });
    }
    Ok(())
}
