//! Value validators and the error surface they produce.
//!
//! A validator is a pure function of `(typed value, constraints)`. It never
//! short-circuits across independent constraints: size errors and every
//! element's errors are all collected. Results are insertion-ordered and
//! de-duplicated.

use std::collections::HashSet;
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use rust_decimal::Decimal;
use serde_json::Value;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::cast::{format_date, format_datetime, DEFAULT_DATETIME_PRECISION, MAX_DATETIME_PRECISION};
use crate::constraints::{Bounds, Length, Size};
use crate::field::FieldKind;
use crate::types::TypedValue;

// ──────────────────────────────────────────────
// Error codes
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Required,
    Invalid,
    Exclusion,
    Inclusion,
    GreaterThanOrEqualTo,
    LessThanOrEqualTo,
    TooShort,
    TooLong,
    SizeTooShort,
    SizeTooLong,
    Duplicate,
    Taken,
}

impl ErrorCode {
    /// Symbol used by message catalogs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Required => "required",
            ErrorCode::Invalid => "invalid",
            ErrorCode::Exclusion => "exclusion",
            ErrorCode::Inclusion => "inclusion",
            ErrorCode::GreaterThanOrEqualTo => "greater_than_or_equal_to",
            ErrorCode::LessThanOrEqualTo => "less_than_or_equal_to",
            ErrorCode::TooShort => "too_short",
            ErrorCode::TooLong => "too_long",
            ErrorCode::SizeTooShort => "size_too_short",
            ErrorCode::SizeTooLong => "size_too_long",
            ErrorCode::Duplicate => "duplicate",
            ErrorCode::Taken => "taken",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interpolation data attached to bound violations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Bound {
    Integer(i64),
    Decimal(Decimal),
    Date(Date),
    DateTime(OffsetDateTime),
}

impl Bound {
    /// Interpolation form used on the error surface.
    pub fn to_json(&self) -> Value {
        self.render(DEFAULT_DATETIME_PRECISION)
    }

    /// Stored constraint form. Datetimes keep every fractional digit so a
    /// reloaded bound compares equal to the one that was saved.
    pub fn to_stored_json(&self) -> Value {
        self.render(MAX_DATETIME_PRECISION)
    }

    fn render(&self, datetime_precision: u32) -> Value {
        match self {
            Bound::Integer(i) => Value::from(*i),
            Bound::Decimal(d) => Value::String(d.normalize().to_string()),
            Bound::Date(d) => Value::String(format_date(*d)),
            Bound::DateTime(dt) => {
                let utc = dt.checked_to_offset(UtcOffset::UTC).unwrap_or(*dt);
                Value::String(format_datetime(utc, datetime_precision))
            }
        }
    }
}

impl From<i64> for Bound {
    fn from(v: i64) -> Self {
        Bound::Integer(v)
    }
}

impl From<Decimal> for Bound {
    fn from(v: Decimal) -> Self {
        Bound::Decimal(v)
    }
}

impl From<Date> for Bound {
    fn from(v: Date) -> Self {
        Bound::Date(v)
    }
}

impl From<OffsetDateTime> for Bound {
    fn from(v: OffsetDateTime) -> Self {
        Bound::DateTime(v)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidationError {
    pub code: ErrorCode,
    pub count: Option<Bound>,
}

impl ValidationError {
    pub fn new(code: ErrorCode) -> Self {
        ValidationError { code, count: None }
    }

    pub fn with_count(code: ErrorCode, count: impl Into<Bound>) -> Self {
        ValidationError {
            code,
            count: Some(count.into()),
        }
    }

    pub fn to_json(&self) -> Value {
        let mut obj = serde_json::Map::new();
        obj.insert("error".to_string(), Value::from(self.code.as_str()));
        if let Some(count) = &self.count {
            obj.insert("count".to_string(), count.to_json());
        }
        Value::Object(obj)
    }
}

impl From<ErrorCode> for ValidationError {
    fn from(code: ErrorCode) -> Self {
        ValidationError::new(code)
    }
}

// ──────────────────────────────────────────────
// Error collections
// ──────────────────────────────────────────────

/// Ordered, de-duplicated set of violations for one attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorSet(IndexSet<ValidationError>);

impl ErrorSet {
    pub fn new() -> Self {
        ErrorSet(IndexSet::new())
    }

    /// Returns false when the error was already present.
    pub fn push(&mut self, error: impl Into<ValidationError>) -> bool {
        self.0.insert(error.into())
    }

    pub fn contains(&self, error: &ValidationError) -> bool {
        self.0.contains(error)
    }

    pub fn contains_code(&self, code: ErrorCode) -> bool {
        self.0.iter().any(|e| e.code == code)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    pub fn to_vec(&self) -> Vec<ValidationError> {
        self.0.iter().cloned().collect()
    }

    pub fn to_json(&self) -> Value {
        Value::Array(self.0.iter().map(ValidationError::to_json).collect())
    }
}

impl FromIterator<ValidationError> for ErrorSet {
    fn from_iter<I: IntoIterator<Item = ValidationError>>(iter: I) -> Self {
        ErrorSet(iter.into_iter().collect())
    }
}

impl IntoIterator for ErrorSet {
    type Item = ValidationError;
    type IntoIter = indexmap::set::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Violations keyed by public attribute name (`value`, `default_value`,
/// `max`, ...), in the order attributes first failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Errors(IndexMap<String, ErrorSet>);

impl Errors {
    pub fn new() -> Self {
        Errors(IndexMap::new())
    }

    pub fn add(&mut self, attribute: &str, error: impl Into<ValidationError>) {
        self.0
            .entry(attribute.to_string())
            .or_default()
            .push(error);
    }

    /// Merge a validator result under `attribute`. Empty sets add nothing.
    pub fn merge(&mut self, attribute: &str, set: ErrorSet) {
        for error in set {
            self.add(attribute, error);
        }
    }

    pub fn extend(&mut self, other: Errors) {
        for (attribute, set) in other.0 {
            self.merge(&attribute, set);
        }
    }

    pub fn get(&self, attribute: &str) -> Option<&ErrorSet> {
        self.0.get(attribute)
    }

    /// True when `attribute` carries an error with `code`.
    pub fn has(&self, attribute: &str, code: ErrorCode) -> bool {
        self.get(attribute).is_some_and(|s| s.contains_code(code))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ErrorSet)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (attribute, set) in &self.0 {
            for error in set.iter() {
                if !first {
                    f.write_str(", ")?;
                }
                first = false;
                match &error.count {
                    Some(count) => write!(f, "{} {} ({})", attribute, error.code, count.to_json())?,
                    None => write!(f, "{} {}", attribute, error.code)?,
                }
            }
        }
        Ok(())
    }
}

// ──────────────────────────────────────────────
// Validator
// ──────────────────────────────────────────────

/// Validator bound to one field kind's constraints.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    kind: &'a FieldKind,
}

impl<'a> Validator<'a> {
    pub fn new(kind: &'a FieldKind) -> Self {
        Validator { kind }
    }

    /// Validate a typed value. `None` is nil.
    pub fn validate(&self, value: Option<&TypedValue>) -> ErrorSet {
        let mut errors = ErrorSet::new();
        match self.kind {
            FieldKind::Boolean(c) => match value {
                None => {
                    if !c.nullable {
                        errors.push(ErrorCode::Exclusion);
                    }
                }
                Some(TypedValue::Boolean(b)) => {
                    if c.required && !b {
                        errors.push(ErrorCode::Required);
                    }
                }
                Some(_) => {
                    errors.push(ErrorCode::Invalid);
                }
            },
            FieldKind::Integer(c) => scalar(value, c.required, &mut errors, as_integer, |v, e| {
                check_bounds(v, &c.bounds, e)
            }),
            FieldKind::IntegerArray(c) => array(value, &c.size, &mut errors, as_integer, |v, e| {
                check_bounds(v, &c.bounds, e)
            }),
            FieldKind::Decimal(c) => scalar(value, c.required, &mut errors, as_decimal, |v, e| {
                check_bounds(v, &c.bounds, e)
            }),
            FieldKind::DecimalArray(c) => array(value, &c.size, &mut errors, as_decimal, |v, e| {
                check_bounds(v, &c.bounds, e)
            }),
            FieldKind::Text(c) => scalar(value, c.required, &mut errors, as_text, |v, e| {
                check_length(v, &c.length, e)
            }),
            FieldKind::TextArray(c) => array(value, &c.size, &mut errors, as_text, |v, e| {
                check_length(v, &c.length, e)
            }),
            FieldKind::Enum(c) => match value {
                None => {
                    if !c.allowed_values.contains(&None) {
                        errors.push(ErrorCode::Inclusion);
                    }
                }
                Some(TypedValue::Text(s)) => {
                    if !c.allowed_values.iter().any(|a| a.as_deref() == Some(s.as_str())) {
                        errors.push(ErrorCode::Inclusion);
                    }
                }
                Some(_) => {
                    errors.push(ErrorCode::Invalid);
                }
            },
            FieldKind::EnumArray(c) => {
                let mut seen = HashSet::new();
                array(value, &c.size, &mut errors, as_text, |v, e| {
                    if !c.allowed_values.iter().any(|a| a == v) {
                        e.push(ErrorCode::Inclusion);
                    }
                    if !seen.insert(v.clone()) {
                        e.push(ErrorCode::Duplicate);
                    }
                })
            }
            FieldKind::Date(c) => scalar(value, c.required, &mut errors, as_date, |v, e| {
                check_bounds(v, &c.bounds, e)
            }),
            FieldKind::DateArray(c) => array(value, &c.size, &mut errors, as_date, |v, e| {
                check_bounds(v, &c.bounds, e)
            }),
            FieldKind::DateTime(c) => scalar(value, c.required, &mut errors, as_datetime, |v, e| {
                check_bounds(v, &c.bounds, e)
            }),
            FieldKind::DateTimeArray(c) => {
                array(value, &c.size, &mut errors, as_datetime, |v, e| {
                    check_bounds(v, &c.bounds, e)
                })
            }
        }
        errors
    }
}

fn scalar<T>(
    value: Option<&TypedValue>,
    required: bool,
    errors: &mut ErrorSet,
    extract: fn(&TypedValue) -> Option<T>,
    check: impl FnOnce(&T, &mut ErrorSet),
) {
    match value {
        None => {
            if required {
                errors.push(ErrorCode::Required);
            }
        }
        Some(v) => match extract(v) {
            Some(inner) => check(&inner, errors),
            None => {
                errors.push(ErrorCode::Invalid);
            }
        },
    }
}

fn array<T>(
    value: Option<&TypedValue>,
    size: &Size,
    errors: &mut ErrorSet,
    extract: fn(&TypedValue) -> Option<T>,
    mut check: impl FnMut(&T, &mut ErrorSet),
) {
    let Some(items) = value.and_then(TypedValue::as_array) else {
        errors.push(ErrorCode::Invalid);
        return;
    };
    check_size(items.len(), size, errors);
    for item in items {
        match item.as_ref().and_then(extract) {
            Some(inner) => check(&inner, errors),
            None => {
                errors.push(ErrorCode::Invalid);
            }
        }
    }
}

fn check_bounds<T>(value: &T, bounds: &Bounds<T>, errors: &mut ErrorSet)
where
    T: PartialOrd + Clone + Into<Bound>,
{
    if let Some(min) = &bounds.min {
        if value < min {
            errors.push(ValidationError::with_count(
                ErrorCode::GreaterThanOrEqualTo,
                min.clone(),
            ));
        }
    }
    if let Some(max) = &bounds.max {
        if value > max {
            errors.push(ValidationError::with_count(
                ErrorCode::LessThanOrEqualTo,
                max.clone(),
            ));
        }
    }
}

fn check_length(value: &String, length: &Length, errors: &mut ErrorSet) {
    let len = value.chars().count() as i64;
    if let Some(min) = length.min_length {
        if len < min {
            errors.push(ValidationError::with_count(ErrorCode::TooShort, min));
        }
    }
    if let Some(max) = length.max_length {
        if len > max {
            errors.push(ValidationError::with_count(ErrorCode::TooLong, max));
        }
    }
}

fn check_size(len: usize, size: &Size, errors: &mut ErrorSet) {
    let len = len as i64;
    if let Some(min) = size.min_size {
        if len < min {
            errors.push(ValidationError::with_count(ErrorCode::SizeTooShort, min));
        }
    }
    if let Some(max) = size.max_size {
        if len > max {
            errors.push(ValidationError::with_count(ErrorCode::SizeTooLong, max));
        }
    }
}

fn as_integer(v: &TypedValue) -> Option<i64> {
    match v {
        TypedValue::Integer(i) => Some(*i),
        _ => None,
    }
}

fn as_decimal(v: &TypedValue) -> Option<Decimal> {
    match v {
        TypedValue::Decimal(d) => Some(*d),
        _ => None,
    }
}

fn as_text(v: &TypedValue) -> Option<String> {
    match v {
        TypedValue::Text(s) => Some(s.clone()),
        _ => None,
    }
}

fn as_date(v: &TypedValue) -> Option<Date> {
    match v {
        TypedValue::Date(d) => Some(*d),
        _ => None,
    }
}

fn as_datetime(v: &TypedValue) -> Option<OffsetDateTime> {
    match v {
        TypedValue::DateTime(dt) => Some(*dt),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::*;
    use rust_decimal::Decimal;
    use time::macros::{date, datetime};

    fn errors_of(kind: &FieldKind, value: Option<TypedValue>) -> Vec<ValidationError> {
        Validator::new(kind).validate(value.as_ref()).to_vec()
    }

    fn boolean(required: bool, nullable: bool) -> FieldKind {
        FieldKind::Boolean(BooleanConstraints { required, nullable })
    }

    #[test]
    fn boolean_required_nullable_matrix() {
        assert_eq!(
            errors_of(&boolean(false, false), None),
            vec![ErrorCode::Exclusion.into()]
        );
        assert_eq!(
            errors_of(&boolean(true, true), Some(TypedValue::Boolean(false))),
            vec![ErrorCode::Required.into()]
        );
        assert!(errors_of(&boolean(true, true), None).is_empty());
        assert!(errors_of(&boolean(true, true), Some(TypedValue::Boolean(true))).is_empty());
        assert!(errors_of(&boolean(false, false), Some(TypedValue::Boolean(false))).is_empty());
        assert_eq!(
            errors_of(&boolean(false, true), Some(TypedValue::Integer(1))),
            vec![ErrorCode::Invalid.into()]
        );
    }

    fn integer(min: Option<i64>, max: Option<i64>, required: bool) -> FieldKind {
        FieldKind::Integer(IntegerConstraints {
            required,
            bounds: Bounds { min, max },
        })
    }

    #[test]
    fn integer_bounds() {
        let kind = integer(Some(5), Some(10), false);
        assert_eq!(
            errors_of(&kind, Some(TypedValue::Integer(4))),
            vec![ValidationError::with_count(ErrorCode::GreaterThanOrEqualTo, 5i64)]
        );
        assert_eq!(
            errors_of(&kind, Some(TypedValue::Integer(11))),
            vec![ValidationError::with_count(ErrorCode::LessThanOrEqualTo, 10i64)]
        );
        assert!(errors_of(&kind, Some(TypedValue::Integer(5))).is_empty());
        assert!(errors_of(&kind, Some(TypedValue::Integer(10))).is_empty());
        assert!(errors_of(&kind, None).is_empty());
    }

    #[test]
    fn required_and_type_mismatch() {
        let kind = integer(None, None, true);
        assert_eq!(errors_of(&kind, None), vec![ErrorCode::Required.into()]);
        assert_eq!(
            errors_of(&kind, Some(TypedValue::Text("5".into()))),
            vec![ErrorCode::Invalid.into()]
        );
    }

    #[test]
    fn decimal_and_date_bounds() {
        let kind = FieldKind::Decimal(DecimalConstraints {
            required: false,
            bounds: Bounds {
                min: Some(Decimal::new(15, 1)),
                max: None,
            },
            precision: None,
        });
        assert_eq!(
            errors_of(&kind, Some(TypedValue::Decimal(Decimal::new(14, 1)))),
            vec![ValidationError::with_count(
                ErrorCode::GreaterThanOrEqualTo,
                Decimal::new(15, 1)
            )]
        );

        let kind = FieldKind::DateTime(DateTimeConstraints {
            required: false,
            bounds: Bounds {
                min: None,
                max: Some(datetime!(2024-01-01 0:00 UTC)),
            },
            precision: None,
        });
        assert_eq!(
            errors_of(&kind, Some(TypedValue::DateTime(datetime!(2024-01-01 0:00:01 UTC)))),
            vec![ValidationError::with_count(
                ErrorCode::LessThanOrEqualTo,
                datetime!(2024-01-01 0:00 UTC)
            )]
        );

        let kind = FieldKind::Date(DateConstraints {
            required: true,
            bounds: Bounds {
                min: Some(date!(2024 - 01 - 01)),
                max: Some(date!(2024 - 12 - 31)),
            },
        });
        assert!(errors_of(&kind, Some(TypedValue::Date(date!(2024 - 06 - 01)))).is_empty());
    }

    #[test]
    fn text_length_counts_chars() {
        let kind = FieldKind::Text(TextConstraints {
            required: false,
            length: Length {
                min_length: Some(2),
                max_length: Some(3),
            },
        });
        assert_eq!(
            errors_of(&kind, Some(TypedValue::Text("é".into()))),
            vec![ValidationError::with_count(ErrorCode::TooShort, 2i64)]
        );
        assert!(errors_of(&kind, Some(TypedValue::Text("héé".into()))).is_empty());
        assert_eq!(
            errors_of(&kind, Some(TypedValue::Text("four".into()))),
            vec![ValidationError::with_count(ErrorCode::TooLong, 3i64)]
        );
    }

    fn int_array(min_size: i64, max_size: i64, min: Option<i64>) -> FieldKind {
        FieldKind::IntegerArray(IntegerArrayConstraints {
            bounds: Bounds { min, max: None },
            size: Size {
                min_size: Some(min_size),
                max_size: Some(max_size),
            },
        })
    }

    fn ints(values: &[i64]) -> Option<TypedValue> {
        Some(TypedValue::Array(
            values.iter().map(|v| Some(TypedValue::Integer(*v))).collect(),
        ))
    }

    #[test]
    fn array_size_bounds() {
        let kind = int_array(2, 4, None);
        assert_eq!(
            errors_of(&kind, ints(&[1])),
            vec![ValidationError::with_count(ErrorCode::SizeTooShort, 2i64)]
        );
        assert_eq!(
            errors_of(&kind, ints(&[1, 2, 3, 4, 5])),
            vec![ValidationError::with_count(ErrorCode::SizeTooLong, 4i64)]
        );
        for n in 2..=4 {
            let values: Vec<i64> = (0..n).collect();
            assert!(errors_of(&kind, ints(&values)).is_empty());
        }
    }

    #[test]
    fn array_errors_accumulate_and_deduplicate() {
        let kind = int_array(0, 10, Some(5));
        let value = Some(TypedValue::Array(vec![
            Some(TypedValue::Integer(1)),
            None,
            Some(TypedValue::Integer(2)),
            Some(TypedValue::Integer(7)),
        ]));
        assert_eq!(
            errors_of(&kind, value),
            vec![
                ValidationError::with_count(ErrorCode::GreaterThanOrEqualTo, 5i64),
                ErrorCode::Invalid.into(),
            ]
        );
    }

    #[test]
    fn array_rejects_non_array_without_further_checks() {
        let kind = int_array(2, 4, Some(5));
        assert_eq!(
            errors_of(&kind, Some(TypedValue::Integer(1))),
            vec![ErrorCode::Invalid.into()]
        );
        assert_eq!(errors_of(&kind, None), vec![ErrorCode::Invalid.into()]);
    }

    #[test]
    fn enum_inclusion() {
        let kind = FieldKind::Enum(EnumConstraints {
            allowed_values: vec![Some("a".into()), Some("b".into())],
        });
        assert!(errors_of(&kind, Some(TypedValue::Text("a".into()))).is_empty());
        assert_eq!(
            errors_of(&kind, Some(TypedValue::Text("z".into()))),
            vec![ErrorCode::Inclusion.into()]
        );
        assert_eq!(errors_of(&kind, None), vec![ErrorCode::Inclusion.into()]);

        let nullable = FieldKind::Enum(EnumConstraints {
            allowed_values: vec![Some("a".into()), None],
        });
        assert!(errors_of(&nullable, None).is_empty());
    }

    #[test]
    fn enum_array_inclusion_and_duplicates() {
        let kind = FieldKind::EnumArray(EnumArrayConstraints {
            allowed_values: vec!["a".into(), "b".into(), "c".into()],
            size: Size {
                min_size: Some(1),
                max_size: None,
            },
        });
        let texts = |v: &[&str]| {
            Some(TypedValue::Array(
                v.iter().map(|s| Some(TypedValue::Text(s.to_string()))).collect(),
            ))
        };
        assert_eq!(
            errors_of(&kind, texts(&[])),
            vec![ValidationError::with_count(ErrorCode::SizeTooShort, 1i64)]
        );
        assert_eq!(errors_of(&kind, texts(&["a", "z"])), vec![ErrorCode::Inclusion.into()]);
        assert_eq!(errors_of(&kind, texts(&["a", "a"])), vec![ErrorCode::Duplicate.into()]);
        assert!(errors_of(&kind, texts(&["a", "b"])).is_empty());
    }

    #[test]
    fn errors_map_to_json() {
        let mut errors = Errors::new();
        errors.add("value", ValidationError::with_count(ErrorCode::LessThanOrEqualTo, 10i64));
        errors.add("value", ValidationError::with_count(ErrorCode::LessThanOrEqualTo, 10i64));
        errors.add("name", ErrorCode::Taken);
        assert_eq!(
            errors.to_json(),
            serde_json::json!({
                "value": [{ "error": "less_than_or_equal_to", "count": 10 }],
                "name": [{ "error": "taken" }]
            })
        );
        assert!(errors.has("name", ErrorCode::Taken));
        assert_eq!(errors.to_string(), "value less_than_or_equal_to (10), name taken");
    }
}
