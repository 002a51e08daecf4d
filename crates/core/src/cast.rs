//! Type casters: best-effort coercion between raw JSON input, the stored
//! JSON encoding, and [`TypedValue`].
//!
//! Casters never fail. Input that cannot be coerced maps to `None`, and it
//! is up to the validators to decide whether absence is an error.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::types::{FieldType, TypedValue};

/// Fractional-second digits kept by DateTime fields without a `precision`.
pub const DEFAULT_DATETIME_PRECISION: u32 = 6;
/// Nanosecond resolution.
pub const MAX_DATETIME_PRECISION: u32 = 9;
/// Largest scale `rust_decimal` can represent.
pub const MAX_DECIMAL_PRECISION: u32 = 28;

// ──────────────────────────────────────────────
// Scalar casters
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarCaster {
    Boolean,
    Integer,
    /// `precision` is the number of fractional digits kept; `None` keeps all.
    Decimal {
        precision: Option<u32>,
    },
    Text,
    Enum,
    Date,
    DateTime {
        precision: u32,
    },
}

impl ScalarCaster {
    pub fn field_type(&self) -> FieldType {
        match self {
            ScalarCaster::Boolean => FieldType::Boolean,
            ScalarCaster::Integer => FieldType::Integer,
            ScalarCaster::Decimal { .. } => FieldType::Decimal,
            ScalarCaster::Text => FieldType::Text,
            ScalarCaster::Enum => FieldType::Enum,
            ScalarCaster::Date => FieldType::Date,
            ScalarCaster::DateTime { .. } => FieldType::DateTime,
        }
    }

    /// Coerce raw input into a typed value.
    pub fn cast(&self, raw: &Value) -> Option<TypedValue> {
        match self {
            ScalarCaster::Boolean => cast_boolean(raw).map(TypedValue::Boolean),
            ScalarCaster::Integer => cast_integer(raw).map(TypedValue::Integer),
            ScalarCaster::Decimal { precision } => {
                let d = cast_decimal(raw)?;
                Some(TypedValue::Decimal(truncate_decimal(d, *precision)))
            }
            ScalarCaster::Text | ScalarCaster::Enum => cast_text(raw).map(TypedValue::Text),
            ScalarCaster::Date => cast_date(raw).map(TypedValue::Date),
            ScalarCaster::DateTime { precision } => {
                let dt = cast_datetime(raw)?;
                Some(TypedValue::DateTime(truncate_datetime(dt, *precision)))
            }
        }
    }

    /// Encode a typed value in its stored form. A value of another type
    /// encodes as `None`.
    pub fn encode(&self, value: &TypedValue) -> Option<Value> {
        match (self, value) {
            (ScalarCaster::Boolean, TypedValue::Boolean(b)) => Some(Value::Bool(*b)),
            (ScalarCaster::Integer, TypedValue::Integer(i)) => Some(Value::from(*i)),
            (ScalarCaster::Decimal { precision }, TypedValue::Decimal(d)) => Some(Value::String(
                truncate_decimal(*d, *precision).normalize().to_string(),
            )),
            (ScalarCaster::Text | ScalarCaster::Enum, TypedValue::Text(s)) => {
                Some(Value::String(s.clone()))
            }
            (ScalarCaster::Date, TypedValue::Date(d)) => Some(Value::String(format_date(*d))),
            (ScalarCaster::DateTime { precision }, TypedValue::DateTime(dt)) => {
                let utc = dt.checked_to_offset(UtcOffset::UTC)?;
                Some(Value::String(format_datetime(
                    truncate_datetime(utc, *precision),
                    *precision,
                )))
            }
            _ => None,
        }
    }

    /// Cast then encode.
    pub fn serialize(&self, raw: &Value) -> Option<Value> {
        self.cast(raw).and_then(|v| self.encode(&v))
    }
}

// ──────────────────────────────────────────────
// Field casters
// ──────────────────────────────────────────────

/// A caster for one field type. Array casters apply their element caster
/// element-wise and reject non-array input outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caster {
    Scalar(ScalarCaster),
    Array(ScalarCaster),
}

impl Caster {
    /// Caster for `field_type`. `precision` applies to the decimal and
    /// datetime families and is clamped into range there; other types
    /// ignore it.
    pub fn for_type(field_type: FieldType, precision: Option<i64>) -> Caster {
        let element = match field_type.element_type() {
            FieldType::Boolean => ScalarCaster::Boolean,
            FieldType::Integer => ScalarCaster::Integer,
            FieldType::Decimal => ScalarCaster::Decimal {
                precision: precision
                    .and_then(|p| u32::try_from(p).ok())
                    .map(|p| p.min(MAX_DECIMAL_PRECISION)),
            },
            FieldType::Text => ScalarCaster::Text,
            FieldType::Enum => ScalarCaster::Enum,
            FieldType::Date => ScalarCaster::Date,
            FieldType::DateTime => ScalarCaster::DateTime {
                precision: precision
                    .map(|p| p.clamp(0, i64::from(MAX_DATETIME_PRECISION)) as u32)
                    .unwrap_or(DEFAULT_DATETIME_PRECISION),
            },
            // element_type() only ever yields scalars
            _ => ScalarCaster::Text,
        };
        if field_type.is_array() {
            Caster::Array(element)
        } else {
            Caster::Scalar(element)
        }
    }

    pub fn element(&self) -> ScalarCaster {
        match self {
            Caster::Scalar(c) | Caster::Array(c) => *c,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Caster::Array(_))
    }

    pub fn field_type(&self) -> FieldType {
        match (self, self.element().field_type()) {
            (Caster::Scalar(_), t) => t,
            (Caster::Array(_), FieldType::Integer) => FieldType::IntegerArray,
            (Caster::Array(_), FieldType::Decimal) => FieldType::DecimalArray,
            (Caster::Array(_), FieldType::Text) => FieldType::TextArray,
            (Caster::Array(_), FieldType::Enum) => FieldType::EnumArray,
            (Caster::Array(_), FieldType::Date) => FieldType::DateArray,
            (Caster::Array(_), FieldType::DateTime) => FieldType::DateTimeArray,
            (Caster::Array(_), t) => t,
        }
    }

    /// Raw input to stored form. `None` is nil.
    pub fn serialize(&self, raw: &Value) -> Option<Value> {
        match self {
            Caster::Scalar(c) => c.serialize(raw),
            Caster::Array(c) => {
                let items = raw.as_array()?;
                Some(Value::Array(
                    items
                        .iter()
                        .map(|item| c.serialize(item).unwrap_or(Value::Null))
                        .collect(),
                ))
            }
        }
    }

    /// Stored form to typed value. Malformed storage reads as nil.
    pub fn deserialize(&self, stored: &Value) -> Option<TypedValue> {
        match self {
            Caster::Scalar(c) => c.cast(stored),
            Caster::Array(c) => {
                let items = stored.as_array()?;
                Some(TypedValue::Array(items.iter().map(|i| c.cast(i)).collect()))
            }
        }
    }

    /// Typed value to stored form.
    pub fn encode(&self, value: &TypedValue) -> Option<Value> {
        match (self, value) {
            (Caster::Scalar(c), v) => c.encode(v),
            (Caster::Array(c), TypedValue::Array(items)) => Some(Value::Array(
                items
                    .iter()
                    .map(|item| item.as_ref().and_then(|v| c.encode(v)).unwrap_or(Value::Null))
                    .collect(),
            )),
            (Caster::Array(_), _) => None,
        }
    }
}

// ──────────────────────────────────────────────
// Coercions
// ──────────────────────────────────────────────

fn cast_boolean(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "t" | "on" => Some(true),
            "0" | "false" | "f" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn cast_integer(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i)
            } else if n.is_u64() {
                None
            } else {
                n.as_f64().and_then(float_to_i64)
            }
        }
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| parse_decimal(s).and_then(|d| d.trunc().to_i64()))
        }
        _ => None,
    }
}

fn float_to_i64(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound
    if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f.trunc() as i64)
    } else {
        None
    }
}

fn cast_decimal(raw: &Value) -> Option<Decimal> {
    match raw {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s.trim()),
        _ => None,
    }
}

/// Parse plain or scientific decimal notation.
pub fn parse_decimal(s: &str) -> Option<Decimal> {
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s)
        .ok()
        .or_else(|| Decimal::from_scientific(s).ok())
}

fn truncate_decimal(d: Decimal, precision: Option<u32>) -> Decimal {
    match precision {
        Some(p) => d.round_dp_with_strategy(p, RoundingStrategy::ToZero),
        None => d,
    }
}

fn cast_text(raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn cast_date(raw: &Value) -> Option<Date> {
    let s = raw.as_str()?.trim();
    let parsed = Date::parse(s, format_description!("[year]-[month]-[day]"))
        .ok()
        // A full timestamp keeps the calendar date it was written in.
        .or_else(|| OffsetDateTime::parse(s, &Rfc3339).ok().map(|dt| dt.date()))
        .or_else(|| parse_naive_datetime(s).map(|dt| dt.date()))?;
    Some(parsed).filter(|d| (0..=9999).contains(&d.year()))
}

fn cast_datetime(raw: &Value) -> Option<OffsetDateTime> {
    let s = raw.as_str()?.trim();
    let parsed = OffsetDateTime::parse(s, &Rfc3339)
        .ok()
        .or_else(|| parse_naive_datetime(s).map(PrimitiveDateTime::assume_utc))
        .or_else(|| {
            Date::parse(s, format_description!("[year]-[month]-[day]"))
                .ok()
                .map(|d| PrimitiveDateTime::new(d, Time::MIDNIGHT).assume_utc())
        })?;
    parsed
        .checked_to_offset(UtcOffset::UTC)
        .filter(|dt| (0..=9999).contains(&dt.year()))
}

fn parse_naive_datetime(s: &str) -> Option<PrimitiveDateTime> {
    let formats = [
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
        format_description!("[year]-[month]-[day]T[hour]:[minute]"),
    ];
    formats
        .into_iter()
        .find_map(|f| PrimitiveDateTime::parse(s, f).ok())
}

fn truncate_datetime(dt: OffsetDateTime, precision: u32) -> OffsetDateTime {
    let precision = precision.min(MAX_DATETIME_PRECISION);
    let unit = 10u32.pow(MAX_DATETIME_PRECISION - precision);
    let nanos = dt.nanosecond();
    dt.replace_nanosecond(nanos - nanos % unit).unwrap_or(dt)
}

pub fn format_date(d: Date) -> String {
    format!("{:04}-{:02}-{:02}", d.year(), u8::from(d.month()), d.day())
}

/// `YYYY-MM-DDTHH:MM:SS[.f…]Z` with exactly `precision` fractional digits.
pub fn format_datetime(dt: OffsetDateTime, precision: u32) -> String {
    let mut out = format!(
        "{}T{:02}:{:02}:{:02}",
        format_date(dt.date()),
        dt.hour(),
        dt.minute(),
        dt.second()
    );
    let precision = precision.min(MAX_DATETIME_PRECISION) as usize;
    if precision > 0 {
        let frac = format!("{:09}", dt.nanosecond());
        out.push('.');
        out.push_str(&frac[..precision]);
    }
    out.push('Z');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;
    use time::macros::{date, datetime};

    fn scalar(ty: FieldType) -> Caster {
        Caster::for_type(ty, None)
    }

    #[test]
    fn boolean_literals() {
        let c = scalar(FieldType::Boolean);
        for truthy in [json!(1), json!("1"), json!("true"), json!("t"), json!(true), json!("TRUE")] {
            assert_eq!(c.serialize(&truthy), Some(json!(true)), "{truthy}");
        }
        for falsy in [json!(0), json!("0"), json!("false"), json!("f"), json!(false), json!("off")] {
            assert_eq!(c.serialize(&falsy), Some(json!(false)), "{falsy}");
        }
        for nil in [json!(""), json!(null), json!("maybe"), json!(2), json!([true])] {
            assert_eq!(c.serialize(&nil), None, "{nil}");
        }
    }

    #[test]
    fn integer_truncates_numeric_input() {
        let c = scalar(FieldType::Integer);
        assert_eq!(c.serialize(&json!(5)), Some(json!(5)));
        assert_eq!(c.serialize(&json!("5")), Some(json!(5)));
        assert_eq!(c.serialize(&json!(" -7 ")), Some(json!(-7)));
        assert_eq!(c.serialize(&json!(5.9)), Some(json!(5)));
        assert_eq!(c.serialize(&json!("-5.9")), Some(json!(-5)));
        assert_eq!(c.serialize(&json!("1e3")), Some(json!(1000)));
        assert_eq!(c.serialize(&json!("")), None);
        assert_eq!(c.serialize(&json!("abc")), None);
        assert_eq!(c.serialize(&json!(true)), None);
        assert_eq!(c.serialize(&json!(u64::MAX)), None);
        assert_eq!(c.serialize(&json!(1e300)), None);
    }

    #[test]
    fn decimal_truncates_to_precision() {
        let c = Caster::for_type(FieldType::Decimal, Some(2));
        assert_eq!(c.serialize(&json!("1.239")), Some(json!("1.23")));
        assert_eq!(c.serialize(&json!(-1.239)), Some(json!("-1.23")));
        assert_eq!(c.serialize(&json!("2.50")), Some(json!("2.5")));
        let unbounded = scalar(FieldType::Decimal);
        assert_eq!(
            unbounded.serialize(&json!("3.14159265358979")),
            Some(json!("3.14159265358979"))
        );
        assert_eq!(unbounded.serialize(&json!("1e2")), Some(json!("100")));
        assert_eq!(unbounded.serialize(&json!("")), None);
        assert_eq!(unbounded.serialize(&json!("1.2.3")), None);
    }

    #[test]
    fn decimal_round_trip() {
        let c = scalar(FieldType::Decimal);
        let v = TypedValue::Decimal(Decimal::new(12345, 3));
        let stored = c.encode(&v).unwrap();
        assert_eq!(c.deserialize(&stored), Some(v));
    }

    #[test]
    fn date_parsing() {
        let c = scalar(FieldType::Date);
        assert_eq!(c.serialize(&json!("2024-02-29")), Some(json!("2024-02-29")));
        assert_eq!(
            c.serialize(&json!("2024-02-29T23:30:00-05:00")),
            Some(json!("2024-02-29"))
        );
        assert_eq!(c.serialize(&json!("2023-02-29")), None);
        assert_eq!(c.serialize(&json!("yesterday")), None);
        assert_eq!(c.serialize(&json!(20240101)), None);
        assert_eq!(c.serialize(&json!("-0005-01-01")), None);
        assert_eq!(c.serialize(&json!("0000-01-01")), Some(json!("0000-01-01")));
        assert_eq!(
            c.deserialize(&json!("2024-01-05")),
            Some(TypedValue::Date(date!(2024 - 01 - 05)))
        );
    }

    #[test]
    fn datetime_normalizes_to_utc_with_fixed_precision() {
        let c = scalar(FieldType::DateTime);
        assert_eq!(
            c.serialize(&json!("2024-01-02T03:04:05.123456789+02:00")),
            Some(json!("2024-01-02T01:04:05.123456Z"))
        );
        assert_eq!(
            c.serialize(&json!("2024-01-02 03:04:05")),
            Some(json!("2024-01-02T03:04:05.000000Z"))
        );
        assert_eq!(
            c.serialize(&json!("2024-01-02")),
            Some(json!("2024-01-02T00:00:00.000000Z"))
        );
        let coarse = Caster::for_type(FieldType::DateTime, Some(0));
        assert_eq!(
            coarse.serialize(&json!("2024-01-02T03:04:05.999Z")),
            Some(json!("2024-01-02T03:04:05Z"))
        );
        assert_eq!(c.serialize(&json!("not a time")), None);
    }

    #[test]
    fn datetime_round_trip_up_to_precision() {
        let c = Caster::for_type(FieldType::DateTime, Some(3));
        let v = TypedValue::DateTime(datetime!(2024-06-01 12:00:00.123456 UTC));
        let back = c.deserialize(&c.encode(&v).unwrap()).unwrap();
        assert_eq!(back, TypedValue::DateTime(datetime!(2024-06-01 12:00:00.123 UTC)));
    }

    #[test]
    fn text_stringifies_scalars() {
        let c = scalar(FieldType::Text);
        assert_eq!(c.serialize(&json!("hi")), Some(json!("hi")));
        assert_eq!(c.serialize(&json!(12)), Some(json!("12")));
        assert_eq!(c.serialize(&json!(1.5)), Some(json!("1.5")));
        assert_eq!(c.serialize(&json!(false)), Some(json!("false")));
        assert_eq!(c.serialize(&json!({"a": 1})), None);
        assert_eq!(c.serialize(&json!(["a"])), None);
        assert_eq!(scalar(FieldType::Enum).serialize(&json!(3)), Some(json!("3")));
    }

    #[test]
    fn arrays_cast_element_wise() {
        let c = scalar(FieldType::IntegerArray);
        assert_eq!(
            c.serialize(&json!(["1", 2, "x", null])),
            Some(json!([1, 2, null, null]))
        );
        assert_eq!(c.serialize(&json!("1")), None);
        assert_eq!(c.serialize(&json!(null)), None);
        assert_eq!(c.serialize(&json!({"0": 1})), None);
        assert_eq!(
            c.deserialize(&json!([null])),
            Some(TypedValue::Array(vec![None]))
        );
    }

    #[test]
    fn encode_rejects_other_types() {
        let c = scalar(FieldType::Integer);
        assert_eq!(c.encode(&TypedValue::Text("5".into())), None);
        assert_eq!(scalar(FieldType::TextArray).encode(&TypedValue::Text("a".into())), None);
    }

    #[test]
    fn precision_is_clamped() {
        assert_eq!(
            Caster::for_type(FieldType::DateTime, Some(42)),
            Caster::Scalar(ScalarCaster::DateTime { precision: 9 })
        );
        assert_eq!(
            Caster::for_type(FieldType::DecimalArray, Some(-1)),
            Caster::Array(ScalarCaster::Decimal { precision: None })
        );
        assert_eq!(
            Caster::for_type(FieldType::DateTimeArray, None).field_type(),
            FieldType::DateTimeArray
        );
    }
}
