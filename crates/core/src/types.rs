//! Field type discriminators and typed runtime values.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::error::UsageError;

// ──────────────────────────────────────────────
// Field types
// ──────────────────────────────────────────────

/// The closed set of field types. Each selects one caster, validator and
/// finder; there is no runtime extension point.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum FieldType {
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "integer")]
    Integer,
    #[serde(rename = "integer_array")]
    IntegerArray,
    #[serde(rename = "decimal")]
    Decimal,
    #[serde(rename = "decimal_array")]
    DecimalArray,
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "text_array")]
    TextArray,
    #[serde(rename = "enum")]
    Enum,
    #[serde(rename = "enum_array")]
    EnumArray,
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "date_array")]
    DateArray,
    #[serde(rename = "datetime")]
    DateTime,
    #[serde(rename = "datetime_array")]
    DateTimeArray,
}

impl FieldType {
    pub const ALL: [FieldType; 13] = [
        FieldType::Boolean,
        FieldType::Integer,
        FieldType::IntegerArray,
        FieldType::Decimal,
        FieldType::DecimalArray,
        FieldType::Text,
        FieldType::TextArray,
        FieldType::Enum,
        FieldType::EnumArray,
        FieldType::Date,
        FieldType::DateArray,
        FieldType::DateTime,
        FieldType::DateTimeArray,
    ];

    /// The stored discriminator string.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Boolean => "boolean",
            FieldType::Integer => "integer",
            FieldType::IntegerArray => "integer_array",
            FieldType::Decimal => "decimal",
            FieldType::DecimalArray => "decimal_array",
            FieldType::Text => "text",
            FieldType::TextArray => "text_array",
            FieldType::Enum => "enum",
            FieldType::EnumArray => "enum_array",
            FieldType::Date => "date",
            FieldType::DateArray => "date_array",
            FieldType::DateTime => "datetime",
            FieldType::DateTimeArray => "datetime_array",
        }
    }

    pub fn is_array(self) -> bool {
        matches!(
            self,
            FieldType::IntegerArray
                | FieldType::DecimalArray
                | FieldType::TextArray
                | FieldType::EnumArray
                | FieldType::DateArray
                | FieldType::DateTimeArray
        )
    }

    /// The scalar type of an array's elements; scalars return themselves.
    pub fn element_type(self) -> FieldType {
        match self {
            FieldType::IntegerArray => FieldType::Integer,
            FieldType::DecimalArray => FieldType::Decimal,
            FieldType::TextArray => FieldType::Text,
            FieldType::EnumArray => FieldType::Enum,
            FieldType::DateArray => FieldType::Date,
            FieldType::DateTimeArray => FieldType::DateTime,
            scalar => scalar,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UsageError::UnknownFieldType(s.to_string()))
    }
}

// ──────────────────────────────────────────────
// Typed values
// ──────────────────────────────────────────────

/// A caster-normalized value. Enum values are carried as `Text`.
///
/// Array elements are `Option` so that arrays of nil survive casting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    Boolean(bool),
    Integer(i64),
    Decimal(Decimal),
    Text(String),
    Date(Date),
    DateTime(OffsetDateTime),
    Array(Vec<Option<TypedValue>>),
}

impl TypedValue {
    /// Returns a human-readable type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            TypedValue::Boolean(_) => "Boolean",
            TypedValue::Integer(_) => "Integer",
            TypedValue::Decimal(_) => "Decimal",
            TypedValue::Text(_) => "Text",
            TypedValue::Date(_) => "Date",
            TypedValue::DateTime(_) => "DateTime",
            TypedValue::Array(_) => "Array",
        }
    }

    pub fn as_array(&self) -> Option<&[Option<TypedValue>]> {
        match self {
            TypedValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            TypedValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Orders two values of the same variant. Mixed variants (and arrays)
    /// have no order.
    pub fn compare(&self, other: &TypedValue) -> Option<Ordering> {
        match (self, other) {
            (TypedValue::Boolean(l), TypedValue::Boolean(r)) => Some(l.cmp(r)),
            (TypedValue::Integer(l), TypedValue::Integer(r)) => Some(l.cmp(r)),
            (TypedValue::Decimal(l), TypedValue::Decimal(r)) => Some(l.cmp(r)),
            (TypedValue::Text(l), TypedValue::Text(r)) => Some(l.cmp(r)),
            (TypedValue::Date(l), TypedValue::Date(r)) => Some(l.cmp(r)),
            (TypedValue::DateTime(l), TypedValue::DateTime(r)) => Some(l.cmp(r)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn discriminators_round_trip_through_from_str() {
        for ty in FieldType::ALL {
            assert_eq!(ty.as_str().parse::<FieldType>().unwrap(), ty);
        }
    }

    #[test]
    fn unknown_discriminator_is_usage_error() {
        let err = "money".parse::<FieldType>().unwrap_err();
        assert_eq!(err, UsageError::UnknownFieldType("money".to_string()));
    }

    #[test]
    fn serde_uses_discriminator_strings() {
        let json = serde_json::to_value(FieldType::DateTimeArray).unwrap();
        assert_eq!(json, serde_json::json!("datetime_array"));
        let back: FieldType = serde_json::from_value(serde_json::json!("enum")).unwrap();
        assert_eq!(back, FieldType::Enum);
    }

    #[test]
    fn element_types() {
        assert_eq!(FieldType::EnumArray.element_type(), FieldType::Enum);
        assert_eq!(FieldType::Date.element_type(), FieldType::Date);
        assert!(FieldType::DateTimeArray.is_array());
        assert!(!FieldType::Text.is_array());
    }

    #[test]
    fn compare_same_variant_only() {
        let a = TypedValue::Date(date!(2024 - 01 - 01));
        let b = TypedValue::Date(date!(2024 - 02 - 01));
        assert_eq!(a.compare(&b), Some(Ordering::Less));
        assert_eq!(TypedValue::Integer(1).compare(&TypedValue::Boolean(true)), None);
    }
}
