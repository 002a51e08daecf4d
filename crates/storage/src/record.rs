use std::sync::Arc;

use dynfields_core::{FieldDefinition, FieldError, HostRef, UsageError, ValueRecord};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A field definition as stored in the backend.
///
/// `field_type` is the type discriminator string; `default_value` is
/// already in stored form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    #[serde(default = "new_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub host_type: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub constraints: Map<String, Value>,
    #[serde(default)]
    pub default_value: Value,
}

fn new_id() -> String {
    ulid::Ulid::new().to_string()
}

impl FieldRecord {
    pub fn from_definition(field: &FieldDefinition) -> Self {
        FieldRecord {
            id: field.id().to_string(),
            name: field.name().to_string(),
            field_type: field.field_type().to_string(),
            host_type: field.host_type().to_string(),
            scope: field.scope().map(str::to_string),
            constraints: field.constraints(),
            default_value: field.default_value().clone(),
        }
    }

    /// Rebuild the definition. An unknown type discriminator is a usage
    /// error; constraint keys that fail to cast surface on validation.
    pub fn to_definition(&self) -> Result<FieldDefinition, UsageError> {
        FieldDefinition::from_parts(
            self.id.clone(),
            self.name.clone(),
            self.host_type.clone(),
            self.scope.clone(),
            &self.field_type,
            &self.constraints,
            self.default_value.clone(),
        )
    }
}

/// One stored value: the row behind a [`ValueRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRow {
    pub id: String,
    pub host_type: String,
    pub host_id: String,
    pub field_id: String,
    pub value: Value,
}

impl ValueRow {
    /// Snapshot a bound record. Unbound records have nothing to store.
    pub fn from_record(record: &ValueRecord) -> Result<Self, FieldError> {
        let field_id = record.field_id().ok_or_else(|| FieldError::UnboundField {
            value_id: record.id().to_string(),
        })?;
        Ok(ValueRow {
            id: record.id().to_string(),
            host_type: record.host().host_type.clone(),
            host_id: record.host().host_id.clone(),
            field_id: field_id.to_string(),
            value: record.stored_value().clone(),
        })
    }

    pub fn host(&self) -> HostRef {
        HostRef::new(self.host_type.clone(), self.host_id.clone())
    }

    /// Load into a persisted record bound to `field`.
    pub fn into_record(self, field: Arc<FieldDefinition>) -> Result<ValueRecord, FieldError> {
        let host = self.host();
        ValueRecord::from_stored(self.id, host, field, self.value)
    }
}

/// A set of value writes applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueChanges {
    pub inserts: Vec<ValueRow>,
    pub updates: Vec<ValueRow>,
    pub deletes: Vec<String>,
}

impl ValueChanges {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynfields_core::{FieldKind, FieldType};
    use serde_json::json;

    #[test]
    fn field_record_round_trips_a_definition() {
        let constraints = json!({ "min": 1, "max": 10, "required": true });
        let field = FieldDefinition::with_constraints(
            "age",
            "Author",
            FieldType::Integer,
            constraints.as_object().unwrap(),
        )
        .with_scope("tenant-1")
        .with_default(&json!("5"));

        let record = FieldRecord::from_definition(&field);
        assert_eq!(record.field_type, "integer");
        assert_eq!(record.default_value, json!(5));
        assert_eq!(record.to_definition().unwrap(), field);
    }

    #[test]
    fn nanosecond_datetime_bounds_survive_a_reload() {
        let constraints = json!({ "precision": 9, "max": "2024-01-01T00:00:00.123456789Z" });
        let field = FieldDefinition::with_constraints(
            "stamp",
            "Author",
            FieldType::DateTime,
            constraints.as_object().unwrap(),
        )
        .with_default(&json!("2024-01-01T00:00:00.123456789Z"));
        assert!(field.validate().is_empty());

        let record = FieldRecord::from_definition(&field);
        assert_eq!(
            record.constraints.get("max"),
            Some(&json!("2024-01-01T00:00:00.123456789Z"))
        );

        let loaded = record.to_definition().unwrap();
        assert!(loaded.validate().is_empty(), "{}", loaded.validate());
        assert_eq!(loaded, field);
    }

    #[test]
    fn field_record_json_shape() {
        let record: FieldRecord = serde_json::from_value(json!({
            "name": "tags",
            "type": "enum_array",
            "host_type": "Post",
            "constraints": { "allowed_values": ["a", "b"] }
        }))
        .unwrap();
        assert!(!record.id.is_empty());
        assert_eq!(record.scope, None);
        assert_eq!(record.default_value, Value::Null);
        let field = record.to_definition().unwrap();
        assert_eq!(field.field_type(), FieldType::EnumArray);
    }

    #[test]
    fn unknown_type_is_usage_error() {
        let record = FieldRecord {
            id: "1".into(),
            name: "x".into(),
            field_type: "money".into(),
            host_type: "Author".into(),
            scope: None,
            constraints: Map::new(),
            default_value: Value::Null,
        };
        assert!(record.to_definition().is_err());
    }

    #[test]
    fn value_row_needs_a_bound_record() {
        let unbound = ValueRecord::new(HostRef::new("Author", "1"));
        assert!(matches!(
            ValueRow::from_record(&unbound),
            Err(FieldError::UnboundField { .. })
        ));

        let field = Arc::new(FieldDefinition::new(
            "age",
            "Author",
            FieldKind::unconstrained(FieldType::Integer),
        ));
        let mut record = ValueRecord::for_field(HostRef::new("Author", "1"), field.clone()).unwrap();
        record.assign(Some(json!("7")));
        let row = ValueRow::from_record(&record).unwrap();
        assert_eq!(row.value, json!(7));
        assert_eq!(row.field_id, field.id());

        let loaded = row.into_record(field).unwrap();
        assert!(loaded.is_persisted());
        assert_eq!(loaded.stored_value(), &json!(7));
    }
}
