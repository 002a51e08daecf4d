//! Per-type constraint sets, their JSON form, and structural checks.
//!
//! Constraints are read from a JSON map through the same casters values
//! use, so `"5"` and `5` are equivalent bounds. A key whose value cannot be
//! cast is remembered as an `invalid` error on that key rather than
//! silently dropped.

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use time::{Date, OffsetDateTime};

use crate::cast::{ScalarCaster, MAX_DATETIME_PRECISION, MAX_DECIMAL_PRECISION};
use crate::types::TypedValue;
use crate::validate::{Bound, ErrorCode, Errors, ValidationError};

// ──────────────────────────────────────────────
// Shared building blocks
// ──────────────────────────────────────────────

/// Inclusive value bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bounds<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T> Default for Bounds<T> {
    fn default() -> Self {
        Bounds {
            min: None,
            max: None,
        }
    }
}

/// Character-count limits for text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Length {
    pub min_length: Option<i64>,
    pub max_length: Option<i64>,
}

/// Element-count limits for arrays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Size {
    pub min_size: Option<i64>,
    pub max_size: Option<i64>,
}

// ──────────────────────────────────────────────
// Per-type constraint sets
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BooleanConstraints {
    pub required: bool,
    pub nullable: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegerConstraints {
    pub required: bool,
    pub bounds: Bounds<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegerArrayConstraints {
    pub bounds: Bounds<i64>,
    pub size: Size,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecimalConstraints {
    pub required: bool,
    pub bounds: Bounds<Decimal>,
    pub precision: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecimalArrayConstraints {
    pub bounds: Bounds<Decimal>,
    pub precision: Option<i64>,
    pub size: Size,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextConstraints {
    pub required: bool,
    pub length: Length,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextArrayConstraints {
    pub length: Length,
    pub size: Size,
}

/// `None` in `allowed_values` admits nil.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumConstraints {
    pub allowed_values: Vec<Option<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumArrayConstraints {
    pub allowed_values: Vec<String>,
    pub size: Size,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateConstraints {
    pub required: bool,
    pub bounds: Bounds<Date>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateArrayConstraints {
    pub bounds: Bounds<Date>,
    pub size: Size,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateTimeConstraints {
    pub required: bool,
    pub bounds: Bounds<OffsetDateTime>,
    pub precision: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateTimeArrayConstraints {
    pub bounds: Bounds<OffsetDateTime>,
    pub precision: Option<i64>,
    pub size: Size,
}

// ──────────────────────────────────────────────
// Reading
// ──────────────────────────────────────────────

/// Reads typed constraints out of a JSON map, collecting `invalid` errors
/// for keys whose values cannot be cast.
pub(crate) struct ConstraintReader<'a> {
    map: &'a Map<String, Value>,
    errors: Errors,
}

impl<'a> ConstraintReader<'a> {
    pub(crate) fn new(map: &'a Map<String, Value>) -> Self {
        ConstraintReader {
            map,
            errors: Errors::new(),
        }
    }

    pub(crate) fn finish(self) -> Errors {
        self.errors
    }

    fn read<T>(&mut self, key: &str, cast: impl FnOnce(&Value) -> Option<T>) -> Option<T> {
        match self.map.get(key) {
            None | Some(Value::Null) => None,
            Some(raw) => {
                let cast = cast(raw);
                if cast.is_none() {
                    self.errors.add(key, ErrorCode::Invalid);
                }
                cast
            }
        }
    }

    pub(crate) fn flag(&mut self, key: &str) -> bool {
        self.read(key, |v| match ScalarCaster::Boolean.cast(v) {
            Some(TypedValue::Boolean(b)) => Some(b),
            _ => None,
        })
        .unwrap_or(false)
    }

    pub(crate) fn integer(&mut self, key: &str) -> Option<i64> {
        self.read(key, |v| match ScalarCaster::Integer.cast(v) {
            Some(TypedValue::Integer(i)) => Some(i),
            _ => None,
        })
    }

    pub(crate) fn decimal(&mut self, key: &str) -> Option<Decimal> {
        self.read(key, |v| {
            match (ScalarCaster::Decimal { precision: None }).cast(v) {
                Some(TypedValue::Decimal(d)) => Some(d),
                _ => None,
            }
        })
    }

    pub(crate) fn date(&mut self, key: &str) -> Option<Date> {
        self.read(key, |v| match ScalarCaster::Date.cast(v) {
            Some(TypedValue::Date(d)) => Some(d),
            _ => None,
        })
    }

    pub(crate) fn datetime(&mut self, key: &str) -> Option<OffsetDateTime> {
        let caster = ScalarCaster::DateTime {
            precision: MAX_DATETIME_PRECISION,
        };
        self.read(key, |v| match caster.cast(v) {
            Some(TypedValue::DateTime(dt)) => Some(dt),
            _ => None,
        })
    }

    pub(crate) fn integer_bounds(&mut self) -> Bounds<i64> {
        Bounds {
            min: self.integer("min"),
            max: self.integer("max"),
        }
    }

    pub(crate) fn decimal_bounds(&mut self) -> Bounds<Decimal> {
        Bounds {
            min: self.decimal("min"),
            max: self.decimal("max"),
        }
    }

    pub(crate) fn date_bounds(&mut self) -> Bounds<Date> {
        Bounds {
            min: self.date("min"),
            max: self.date("max"),
        }
    }

    pub(crate) fn datetime_bounds(&mut self) -> Bounds<OffsetDateTime> {
        Bounds {
            min: self.datetime("min"),
            max: self.datetime("max"),
        }
    }

    pub(crate) fn size(&mut self) -> Size {
        Size {
            min_size: self.integer("min_size"),
            max_size: self.integer("max_size"),
        }
    }

    pub(crate) fn length(&mut self) -> Length {
        Length {
            min_length: self.integer("min_length"),
            max_length: self.integer("max_length"),
        }
    }

    /// `allowed_values` must be a list of strings (plus nil when
    /// `allow_nil`). Offending entries are dropped and reported once.
    pub(crate) fn allowed_values(&mut self, allow_nil: bool) -> Vec<Option<String>> {
        let items = match self.map.get("allowed_values") {
            None | Some(Value::Null) => return Vec::new(),
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.errors.add("allowed_values", ErrorCode::Invalid);
                return Vec::new();
            }
        };
        let mut allowed = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::String(s) => allowed.push(Some(s.clone())),
                Value::Null if allow_nil => allowed.push(None),
                _ => self.errors.add("allowed_values", ErrorCode::Invalid),
            }
        }
        allowed
    }
}

// ──────────────────────────────────────────────
// Writing
// ──────────────────────────────────────────────

pub(crate) fn put(map: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value);
    }
}

pub(crate) fn put_flag(map: &mut Map<String, Value>, key: &str, value: bool) {
    map.insert(key.to_string(), Value::Bool(value));
}

pub(crate) fn put_bounds<T: Clone + Into<Bound>>(map: &mut Map<String, Value>, bounds: &Bounds<T>) {
    put(map, "min", bounds.min.clone().map(|b| Into::<Bound>::into(b).to_stored_json()));
    put(map, "max", bounds.max.clone().map(|b| Into::<Bound>::into(b).to_stored_json()));
}

pub(crate) fn put_size(map: &mut Map<String, Value>, size: &Size) {
    put(map, "min_size", size.min_size.map(Value::from));
    put(map, "max_size", size.max_size.map(Value::from));
}

pub(crate) fn put_length(map: &mut Map<String, Value>, length: &Length) {
    put(map, "min_length", length.min_length.map(Value::from));
    put(map, "max_length", length.max_length.map(Value::from));
}

// ──────────────────────────────────────────────
// Structural checks
// ──────────────────────────────────────────────

/// `max` must not be below `min`.
pub(crate) fn check_bounds<T>(bounds: &Bounds<T>, errors: &mut Errors)
where
    T: PartialOrd + Clone + Into<Bound>,
{
    if let (Some(min), Some(max)) = (&bounds.min, &bounds.max) {
        if max < min {
            errors.add(
                "max",
                ValidationError::with_count(ErrorCode::GreaterThanOrEqualTo, min.clone()),
            );
        }
    }
}

/// Both ends non-negative, and the upper end not below the lower.
fn check_count_pair(
    (min_key, min): (&str, Option<i64>),
    (max_key, max): (&str, Option<i64>),
    errors: &mut Errors,
) {
    if let Some(min) = min {
        if min < 0 {
            errors.add(min_key, ValidationError::with_count(ErrorCode::GreaterThanOrEqualTo, 0i64));
        }
    }
    if let Some(max) = max {
        if max < 0 {
            errors.add(max_key, ValidationError::with_count(ErrorCode::GreaterThanOrEqualTo, 0i64));
        }
        if let Some(min) = min {
            if max < min {
                errors.add(
                    max_key,
                    ValidationError::with_count(ErrorCode::GreaterThanOrEqualTo, min),
                );
            }
        }
    }
}

pub(crate) fn check_size(size: &Size, errors: &mut Errors) {
    check_count_pair(
        ("min_size", size.min_size),
        ("max_size", size.max_size),
        errors,
    );
}

pub(crate) fn check_length(length: &Length, errors: &mut Errors) {
    check_count_pair(
        ("min_length", length.min_length),
        ("max_length", length.max_length),
        errors,
    );
}

pub(crate) fn check_decimal_precision(precision: Option<i64>, errors: &mut Errors) {
    check_precision(precision, MAX_DECIMAL_PRECISION, errors);
}

pub(crate) fn check_datetime_precision(precision: Option<i64>, errors: &mut Errors) {
    check_precision(precision, MAX_DATETIME_PRECISION, errors);
}

fn check_precision(precision: Option<i64>, max: u32, errors: &mut Errors) {
    let Some(p) = precision else { return };
    if p < 0 {
        errors.add(
            "precision",
            ValidationError::with_count(ErrorCode::GreaterThanOrEqualTo, 0i64),
        );
    } else if p > i64::from(max) {
        errors.add(
            "precision",
            ValidationError::with_count(ErrorCode::LessThanOrEqualTo, i64::from(max)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::date;

    fn map(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn reader_casts_through_casters() {
        let m = map(json!({ "min": "5", "max": 10.7, "required": "yes" }));
        let mut r = ConstraintReader::new(&m);
        assert_eq!(r.integer_bounds(), Bounds { min: Some(5), max: Some(10) });
        assert!(r.flag("required"));
        assert!(!r.flag("nullable"));
        assert!(r.finish().is_empty());
    }

    #[test]
    fn reader_records_uncastable_keys() {
        let m = map(json!({ "min": "abc", "max_size": [1], "allowed_values": ["a", 1, null] }));
        let mut r = ConstraintReader::new(&m);
        assert_eq!(r.integer("min"), None);
        assert_eq!(r.integer("max_size"), None);
        assert_eq!(r.allowed_values(false), vec![Some("a".to_string())]);
        let errors = r.finish();
        assert!(errors.has("min", ErrorCode::Invalid));
        assert!(errors.has("max_size", ErrorCode::Invalid));
        assert!(errors.has("allowed_values", ErrorCode::Invalid));
    }

    #[test]
    fn reader_allows_nil_enum_entries_when_asked() {
        let m = map(json!({ "allowed_values": ["a", null] }));
        let mut r = ConstraintReader::new(&m);
        assert_eq!(r.allowed_values(true), vec![Some("a".to_string()), None]);
        assert!(r.finish().is_empty());
    }

    #[test]
    fn reader_reads_dates() {
        let m = map(json!({ "min": "2024-01-01" }));
        let mut r = ConstraintReader::new(&m);
        assert_eq!(r.date_bounds().min, Some(date!(2024 - 01 - 01)));
    }

    #[test]
    fn structural_checks() {
        let mut errors = Errors::new();
        check_bounds(&Bounds { min: Some(10), max: Some(1) }, &mut errors);
        check_size(&Size { min_size: Some(-1), max_size: Some(3) }, &mut errors);
        check_length(&Length { min_length: Some(5), max_length: Some(2) }, &mut errors);
        check_datetime_precision(Some(12), &mut errors);
        assert_eq!(
            errors.to_json(),
            json!({
                "max": [{ "error": "greater_than_or_equal_to", "count": 10 }],
                "min_size": [{ "error": "greater_than_or_equal_to", "count": 0 }],
                "max_length": [{ "error": "greater_than_or_equal_to", "count": 5 }],
                "precision": [{ "error": "less_than_or_equal_to", "count": 9 }]
            })
        );
    }
}
