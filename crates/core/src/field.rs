//! Field definitions: a named, typed, constrained custom attribute declared
//! for one host type.

use std::str::FromStr;

use serde_json::{Map, Value};
use ulid::Ulid;

use crate::cast::Caster;
use crate::constraints::*;
use crate::error::UsageError;
use crate::types::{FieldType, TypedValue};
use crate::validate::{ErrorCode, Errors, Validator};

// ──────────────────────────────────────────────
// Field kinds
// ──────────────────────────────────────────────

/// A field type together with its typed constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Boolean(BooleanConstraints),
    Integer(IntegerConstraints),
    IntegerArray(IntegerArrayConstraints),
    Decimal(DecimalConstraints),
    DecimalArray(DecimalArrayConstraints),
    Text(TextConstraints),
    TextArray(TextArrayConstraints),
    Enum(EnumConstraints),
    EnumArray(EnumArrayConstraints),
    Date(DateConstraints),
    DateArray(DateArrayConstraints),
    DateTime(DateTimeConstraints),
    DateTimeArray(DateTimeArrayConstraints),
}

impl FieldKind {
    /// The unconstrained kind for `field_type`.
    pub fn unconstrained(field_type: FieldType) -> FieldKind {
        match field_type {
            FieldType::Boolean => FieldKind::Boolean(Default::default()),
            FieldType::Integer => FieldKind::Integer(Default::default()),
            FieldType::IntegerArray => FieldKind::IntegerArray(Default::default()),
            FieldType::Decimal => FieldKind::Decimal(Default::default()),
            FieldType::DecimalArray => FieldKind::DecimalArray(Default::default()),
            FieldType::Text => FieldKind::Text(Default::default()),
            FieldType::TextArray => FieldKind::TextArray(Default::default()),
            FieldType::Enum => FieldKind::Enum(Default::default()),
            FieldType::EnumArray => FieldKind::EnumArray(Default::default()),
            FieldType::Date => FieldKind::Date(Default::default()),
            FieldType::DateArray => FieldKind::DateArray(Default::default()),
            FieldType::DateTime => FieldKind::DateTime(Default::default()),
            FieldType::DateTimeArray => FieldKind::DateTimeArray(Default::default()),
        }
    }

    /// Read constraints for `field_type` from a JSON map. Keys foreign to
    /// the type are ignored; keys that cannot be cast come back as
    /// `invalid` errors alongside the kind.
    pub fn parse(field_type: FieldType, constraints: &Map<String, Value>) -> (FieldKind, Errors) {
        let mut r = ConstraintReader::new(constraints);
        let kind = match field_type {
            FieldType::Boolean => FieldKind::Boolean(BooleanConstraints {
                required: r.flag("required"),
                nullable: r.flag("nullable"),
            }),
            FieldType::Integer => FieldKind::Integer(IntegerConstraints {
                required: r.flag("required"),
                bounds: r.integer_bounds(),
            }),
            FieldType::IntegerArray => FieldKind::IntegerArray(IntegerArrayConstraints {
                bounds: r.integer_bounds(),
                size: r.size(),
            }),
            FieldType::Decimal => FieldKind::Decimal(DecimalConstraints {
                required: r.flag("required"),
                bounds: r.decimal_bounds(),
                precision: r.integer("precision"),
            }),
            FieldType::DecimalArray => FieldKind::DecimalArray(DecimalArrayConstraints {
                bounds: r.decimal_bounds(),
                precision: r.integer("precision"),
                size: r.size(),
            }),
            FieldType::Text => FieldKind::Text(TextConstraints {
                required: r.flag("required"),
                length: r.length(),
            }),
            FieldType::TextArray => FieldKind::TextArray(TextArrayConstraints {
                length: r.length(),
                size: r.size(),
            }),
            FieldType::Enum => FieldKind::Enum(EnumConstraints {
                allowed_values: r.allowed_values(true),
            }),
            FieldType::EnumArray => FieldKind::EnumArray(EnumArrayConstraints {
                allowed_values: r.allowed_values(false).into_iter().flatten().collect(),
                size: r.size(),
            }),
            FieldType::Date => FieldKind::Date(DateConstraints {
                required: r.flag("required"),
                bounds: r.date_bounds(),
            }),
            FieldType::DateArray => FieldKind::DateArray(DateArrayConstraints {
                bounds: r.date_bounds(),
                size: r.size(),
            }),
            FieldType::DateTime => FieldKind::DateTime(DateTimeConstraints {
                required: r.flag("required"),
                bounds: r.datetime_bounds(),
                precision: r.integer("precision"),
            }),
            FieldType::DateTimeArray => FieldKind::DateTimeArray(DateTimeArrayConstraints {
                bounds: r.datetime_bounds(),
                precision: r.integer("precision"),
                size: r.size(),
            }),
        };
        (kind, r.finish())
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            FieldKind::Boolean(_) => FieldType::Boolean,
            FieldKind::Integer(_) => FieldType::Integer,
            FieldKind::IntegerArray(_) => FieldType::IntegerArray,
            FieldKind::Decimal(_) => FieldType::Decimal,
            FieldKind::DecimalArray(_) => FieldType::DecimalArray,
            FieldKind::Text(_) => FieldType::Text,
            FieldKind::TextArray(_) => FieldType::TextArray,
            FieldKind::Enum(_) => FieldType::Enum,
            FieldKind::EnumArray(_) => FieldType::EnumArray,
            FieldKind::Date(_) => FieldType::Date,
            FieldKind::DateArray(_) => FieldType::DateArray,
            FieldKind::DateTime(_) => FieldType::DateTime,
            FieldKind::DateTimeArray(_) => FieldType::DateTimeArray,
        }
    }

    pub fn precision(&self) -> Option<i64> {
        match self {
            FieldKind::Decimal(c) => c.precision,
            FieldKind::DecimalArray(c) => c.precision,
            FieldKind::DateTime(c) => c.precision,
            FieldKind::DateTimeArray(c) => c.precision,
            _ => None,
        }
    }

    pub fn caster(&self) -> Caster {
        Caster::for_type(self.field_type(), self.precision())
    }

    pub fn validator(&self) -> Validator<'_> {
        Validator::new(self)
    }

    /// The JSON constraint map. Unset optional keys are omitted; flags are
    /// always written.
    pub fn constraints(&self) -> Map<String, Value> {
        let mut m = Map::new();
        match self {
            FieldKind::Boolean(c) => {
                put_flag(&mut m, "required", c.required);
                put_flag(&mut m, "nullable", c.nullable);
            }
            FieldKind::Integer(c) => {
                put_flag(&mut m, "required", c.required);
                put_bounds(&mut m, &c.bounds);
            }
            FieldKind::IntegerArray(c) => {
                put_bounds(&mut m, &c.bounds);
                put_size(&mut m, &c.size);
            }
            FieldKind::Decimal(c) => {
                put_flag(&mut m, "required", c.required);
                put_bounds(&mut m, &c.bounds);
                put(&mut m, "precision", c.precision.map(Value::from));
            }
            FieldKind::DecimalArray(c) => {
                put_bounds(&mut m, &c.bounds);
                put(&mut m, "precision", c.precision.map(Value::from));
                put_size(&mut m, &c.size);
            }
            FieldKind::Text(c) => {
                put_flag(&mut m, "required", c.required);
                put_length(&mut m, &c.length);
            }
            FieldKind::TextArray(c) => {
                put_length(&mut m, &c.length);
                put_size(&mut m, &c.size);
            }
            FieldKind::Enum(c) => {
                let allowed = c
                    .allowed_values
                    .iter()
                    .map(|v| v.clone().map(Value::String).unwrap_or(Value::Null))
                    .collect();
                m.insert("allowed_values".to_string(), Value::Array(allowed));
            }
            FieldKind::EnumArray(c) => {
                let allowed = c.allowed_values.iter().cloned().map(Value::String).collect();
                m.insert("allowed_values".to_string(), Value::Array(allowed));
                put_size(&mut m, &c.size);
            }
            FieldKind::Date(c) => {
                put_flag(&mut m, "required", c.required);
                put_bounds(&mut m, &c.bounds);
            }
            FieldKind::DateArray(c) => {
                put_bounds(&mut m, &c.bounds);
                put_size(&mut m, &c.size);
            }
            FieldKind::DateTime(c) => {
                put_flag(&mut m, "required", c.required);
                put_bounds(&mut m, &c.bounds);
                put(&mut m, "precision", c.precision.map(Value::from));
            }
            FieldKind::DateTimeArray(c) => {
                put_bounds(&mut m, &c.bounds);
                put(&mut m, "precision", c.precision.map(Value::from));
                put_size(&mut m, &c.size);
            }
        }
        m
    }

    /// Constraint-vs-constraint consistency: ordered bounds, non-negative
    /// counts, precision in range, non-empty enum value lists.
    pub fn check_structure(&self, errors: &mut Errors) {
        match self {
            FieldKind::Boolean(_) => {}
            FieldKind::Integer(c) => check_bounds(&c.bounds, errors),
            FieldKind::IntegerArray(c) => {
                check_bounds(&c.bounds, errors);
                check_size(&c.size, errors);
            }
            FieldKind::Decimal(c) => {
                check_bounds(&c.bounds, errors);
                check_decimal_precision(c.precision, errors);
            }
            FieldKind::DecimalArray(c) => {
                check_bounds(&c.bounds, errors);
                check_decimal_precision(c.precision, errors);
                check_size(&c.size, errors);
            }
            FieldKind::Text(c) => check_length(&c.length, errors),
            FieldKind::TextArray(c) => {
                check_length(&c.length, errors);
                check_size(&c.size, errors);
            }
            FieldKind::Enum(c) => {
                if c.allowed_values.is_empty() {
                    errors.add("allowed_values", ErrorCode::Invalid);
                }
            }
            FieldKind::EnumArray(c) => {
                if c.allowed_values.is_empty() {
                    errors.add("allowed_values", ErrorCode::Invalid);
                }
                check_size(&c.size, errors);
            }
            FieldKind::Date(c) => check_bounds(&c.bounds, errors),
            FieldKind::DateArray(c) => {
                check_bounds(&c.bounds, errors);
                check_size(&c.size, errors);
            }
            FieldKind::DateTime(c) => {
                check_bounds(&c.bounds, errors);
                check_datetime_precision(c.precision, errors);
            }
            FieldKind::DateTimeArray(c) => {
                check_bounds(&c.bounds, errors);
                check_datetime_precision(c.precision, errors);
                check_size(&c.size, errors);
            }
        }
    }
}

// ──────────────────────────────────────────────
// Field definitions
// ──────────────────────────────────────────────

/// A custom attribute declared for a host type, optionally narrowed to one
/// scope.
///
/// `default_value` is held in stored form. Constraint keys that failed to
/// cast are kept in `constraint_errors` and reported by [`validate`].
///
/// [`validate`]: FieldDefinition::validate
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    id: String,
    name: String,
    host_type: String,
    scope: Option<String>,
    kind: FieldKind,
    default_value: Value,
    constraint_errors: Errors,
}

impl FieldDefinition {
    /// A fresh definition with a generated id. Array kinds default to `[]`,
    /// scalars to nil.
    pub fn new(name: impl Into<String>, host_type: impl Into<String>, kind: FieldKind) -> Self {
        let default_value = if kind.field_type().is_array() {
            Value::Array(Vec::new())
        } else {
            Value::Null
        };
        FieldDefinition {
            id: Ulid::new().to_string(),
            name: name.into(),
            host_type: host_type.into(),
            scope: None,
            kind,
            default_value,
            constraint_errors: Errors::new(),
        }
    }

    /// Rebuild a definition from its persisted parts. `default_value` is
    /// taken as already stored.
    pub fn from_parts(
        id: impl Into<String>,
        name: impl Into<String>,
        host_type: impl Into<String>,
        scope: Option<String>,
        type_name: &str,
        constraints: &Map<String, Value>,
        default_value: Value,
    ) -> Result<Self, UsageError> {
        let field_type = FieldType::from_str(type_name)?;
        let (kind, constraint_errors) = FieldKind::parse(field_type, constraints);
        Ok(FieldDefinition {
            id: id.into(),
            name: name.into(),
            host_type: host_type.into(),
            scope,
            kind,
            default_value,
            constraint_errors,
        })
    }

    /// Parse constraints for a new definition, keeping cast failures for
    /// [`validate`](FieldDefinition::validate).
    pub fn with_constraints(
        name: impl Into<String>,
        host_type: impl Into<String>,
        field_type: FieldType,
        constraints: &Map<String, Value>,
    ) -> Self {
        let (kind, constraint_errors) = FieldKind::parse(field_type, constraints);
        let mut field = FieldDefinition::new(name, host_type, kind);
        field.constraint_errors = constraint_errors;
        field
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Set the default from raw input.
    pub fn with_default(mut self, raw: &Value) -> Self {
        self.set_default(raw);
        self
    }

    /// Cast and store a raw default. Uncastable input becomes nil.
    pub fn set_default(&mut self, raw: &Value) {
        self.default_value = self.caster().serialize(raw).unwrap_or(Value::Null);
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Replace the constraints. The field type is fixed at creation, so a
    /// kind of another type is a usage error.
    pub fn set_kind(&mut self, kind: FieldKind) -> Result<(), UsageError> {
        if kind.field_type() != self.kind.field_type() {
            return Err(UsageError::InvalidDescriptor {
                what: "field kind".to_string(),
                got: kind.field_type().to_string(),
            });
        }
        self.kind = kind;
        self.constraint_errors = Errors::new();
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host_type(&self) -> &str {
        &self.host_type
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn field_type(&self) -> FieldType {
        self.kind.field_type()
    }

    /// Stored form of the default.
    pub fn default_value(&self) -> &Value {
        &self.default_value
    }

    pub fn typed_default(&self) -> Option<TypedValue> {
        self.caster().deserialize(&self.default_value)
    }

    pub fn caster(&self) -> Caster {
        self.kind.caster()
    }

    pub fn validator(&self) -> Validator<'_> {
        self.kind.validator()
    }

    pub fn constraints(&self) -> Map<String, Value> {
        self.kind.constraints()
    }

    /// Self-contained validation: constraint cast failures, structural
    /// consistency, and the default judged by the field's own validator
    /// (reported under `default_value`). Name uniqueness and host type
    /// admission need other definitions and live with the host layer.
    pub fn validate(&self) -> Errors {
        let mut errors = self.constraint_errors.clone();
        self.kind.check_structure(&mut errors);
        let default = self.typed_default();
        errors.merge("default_value", self.validator().validate(default.as_ref()));
        if !errors.is_empty() {
            tracing::debug!(
                field = %self.name,
                host_type = %self.host_type,
                errors = %errors,
                "field definition invalid"
            );
        }
        errors
    }

    /// Whether this field applies to a host of `host_type` in `scope`.
    /// Unscoped fields apply to every scope.
    pub fn applies_to(&self, host_type: &str, scope: Option<&str>) -> bool {
        self.host_type == host_type && (self.scope.is_none() || self.scope.as_deref() == scope)
    }

    /// Whether `other` would collide with this definition on name: same
    /// name and host type, overlapping scopes, different identity.
    pub fn conflicts_with(&self, other: &FieldDefinition) -> bool {
        self.id != other.id
            && self.name == other.name
            && self.host_type == other.host_type
            && scopes_overlap(self.scope.as_deref(), other.scope.as_deref())
    }
}

/// A NULL scope overlaps every scope; two concrete scopes overlap when equal.
pub fn scopes_overlap(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (None, _) | (_, None) => true,
        (Some(a), Some(b)) => a == b,
    }
}
