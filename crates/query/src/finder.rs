//! Finders: per-field translation of `(operator, raw value)` into a
//! [`FieldCondition`].
//!
//! Raw filter values go through the field's own caster, so a filter on a
//! DateTime field with precision 0 compares at whole seconds, and `"3"`
//! filters an Integer field like `3`. A blank string is nil.

use dynfields_core::{Caster, FieldDefinition, FieldType, ScalarCaster, TypedValue, UsageError};
use serde_json::Value;

use crate::operator::Operation;
use crate::predicate::{Cmp, ElementTest, Pattern, Predicate};

/// One translated filter, detached from the definition it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCondition {
    pub field_id: String,
    pub field_name: String,
    pub field_type: FieldType,
    pub caster: Caster,
    pub operation: Operation,
    pub predicate: Predicate,
}

impl FieldCondition {
    /// Whether a stored value satisfies the condition.
    pub fn matches(&self, stored: &Value) -> bool {
        let value = self.caster.deserialize(stored);
        self.predicate.matches(value.as_ref())
    }
}

/// Finder bound to one field definition.
#[derive(Debug, Clone, Copy)]
pub struct Finder<'a> {
    field: &'a FieldDefinition,
}

impl<'a> Finder<'a> {
    pub fn new(field: &'a FieldDefinition) -> Self {
        Finder { field }
    }

    pub fn operations(&self) -> &'static [Operation] {
        Operation::for_type(self.field.field_type())
    }

    /// Soft search: `None` when the operator is not in this field type's
    /// table.
    pub fn find(&self, operator: &str, value: Option<&Value>) -> Option<FieldCondition> {
        self.lookup(operator).map(|operation| self.condition(operation, value))
    }

    /// Strict search: an operator outside this field type's table is a
    /// usage error.
    pub fn search(&self, operator: &str, value: Option<&Value>) -> Result<FieldCondition, UsageError> {
        let operation = self
            .lookup(operator)
            .ok_or_else(|| UsageError::InvalidOperator {
                operator: operator.to_string(),
                finder: format!("{} finder", self.field.field_type()),
            })?;
        Ok(self.condition(operation, value))
    }

    fn lookup(&self, operator: &str) -> Option<Operation> {
        Operation::parse(operator).filter(|op| op.supports(self.field.field_type()))
    }

    fn condition(&self, operation: Operation, value: Option<&Value>) -> FieldCondition {
        tracing::trace!(field = self.field.name(), %operation, "building filter condition");
        FieldCondition {
            field_id: self.field.id().to_string(),
            field_name: self.field.name().to_string(),
            field_type: self.field.field_type(),
            caster: self.field.caster(),
            operation,
            predicate: self.predicate(operation, value),
        }
    }

    /// Predicate for a supported operation. Blank and nil values follow
    /// the nil policies of each operation family.
    pub fn predicate(&self, operation: Operation, value: Option<&Value>) -> Predicate {
        let raw = normalize(value);
        let caster = self.field.caster();
        match operation {
            Operation::Eq => match cast(caster.element(), raw) {
                Some(literal) => Predicate::Compare {
                    cmp: Cmp::Eq,
                    literal,
                },
                None => Predicate::IsNull,
            },
            Operation::NotEq => match cast(caster.element(), raw) {
                Some(literal) => Predicate::Compare {
                    cmp: Cmp::NotEq,
                    literal,
                }
                .or_null(),
                None => Predicate::IsNotNull,
            },
            Operation::Gt => compare(caster.element(), Cmp::Gt, raw),
            Operation::Gteq => compare(caster.element(), Cmp::Gteq, raw),
            Operation::Lt => compare(caster.element(), Cmp::Lt, raw),
            Operation::Lteq => compare(caster.element(), Cmp::Lteq, raw),

            Operation::StartWith => like(Pattern::Prefix, false, raw),
            Operation::EndWith => like(Pattern::Suffix, false, raw),
            Operation::Contain => like(Pattern::Contains, false, raw),
            Operation::IStartWith => like(Pattern::Prefix, true, raw),
            Operation::IEndWith => like(Pattern::Suffix, true, raw),
            Operation::IContain => like(Pattern::Contains, true, raw),
            Operation::NotStartWith => not_like(Pattern::Prefix, false, raw),
            Operation::NotEndWith => not_like(Pattern::Suffix, false, raw),
            Operation::NotContain => not_like(Pattern::Contains, false, raw),
            Operation::NotIStartWith => not_like(Pattern::Prefix, true, raw),
            Operation::NotIEndWith => not_like(Pattern::Suffix, true, raw),
            Operation::NotIContain => not_like(Pattern::Contains, true, raw),

            Operation::Include => match element_test(caster.element(), Cmp::Eq, raw) {
                Some(test) => Predicate::AnyElement(test),
                None => Predicate::Nothing,
            },
            Operation::NotInclude => match element_test(caster.element(), Cmp::Eq, raw) {
                Some(test) => Predicate::AnyElement(test).not(),
                None => Predicate::All,
            },
            Operation::AnyGt => any(caster.element(), Cmp::Gt, raw),
            Operation::AnyGteq => any(caster.element(), Cmp::Gteq, raw),
            Operation::AnyLt => any(caster.element(), Cmp::Lt, raw),
            Operation::AnyLteq => any(caster.element(), Cmp::Lteq, raw),
            Operation::AllGt => all(caster.element(), Cmp::Gt, raw),
            Operation::AllGteq => all(caster.element(), Cmp::Gteq, raw),
            Operation::AllLt => all(caster.element(), Cmp::Lt, raw),
            Operation::AllLteq => all(caster.element(), Cmp::Lteq, raw),
            Operation::AnyStartWith => match text(raw) {
                Some(prefix) => Predicate::AnyElement(ElementTest::StartsWith(prefix)),
                None => Predicate::Nothing,
            },
            Operation::AllStartWith => match text(raw) {
                Some(prefix) => Predicate::AllElements(ElementTest::StartsWith(prefix)),
                None => Predicate::Nothing,
            },

            Operation::SizeEq => size(Cmp::Eq, raw),
            Operation::SizeNotEq => size(Cmp::NotEq, raw),
            Operation::SizeGt => size(Cmp::Gt, raw),
            Operation::SizeGteq => size(Cmp::Gteq, raw),
            Operation::SizeLt => size(Cmp::Lt, raw),
            Operation::SizeLteq => size(Cmp::Lteq, raw),
        }
    }
}

/// Finder access on field definitions.
pub trait FieldFinder {
    fn finder(&self) -> Finder<'_>;
}

impl FieldFinder for FieldDefinition {
    fn finder(&self) -> Finder<'_> {
        Finder::new(self)
    }
}

fn normalize(value: Option<&Value>) -> Option<&Value> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(v) => Some(v),
    }
}

fn cast(caster: ScalarCaster, raw: Option<&Value>) -> Option<TypedValue> {
    raw.and_then(|v| caster.cast(v))
}

fn text(raw: Option<&Value>) -> Option<String> {
    match cast(ScalarCaster::Text, raw) {
        Some(TypedValue::Text(s)) => Some(s),
        _ => None,
    }
}

fn compare(caster: ScalarCaster, cmp: Cmp, raw: Option<&Value>) -> Predicate {
    match cast(caster, raw) {
        Some(literal) => Predicate::Compare { cmp, literal },
        None => Predicate::Nothing,
    }
}

fn like(pattern: Pattern, case_insensitive: bool, raw: Option<&Value>) -> Predicate {
    match text(raw) {
        Some(needle) => Predicate::Like {
            pattern,
            needle,
            case_insensitive,
        },
        None => Predicate::Nothing,
    }
}

fn not_like(pattern: Pattern, case_insensitive: bool, raw: Option<&Value>) -> Predicate {
    match text(raw) {
        Some(needle) => Predicate::Like {
            pattern,
            needle,
            case_insensitive,
        }
        .not()
        .or_null(),
        None => Predicate::All,
    }
}

fn element_test(caster: ScalarCaster, cmp: Cmp, raw: Option<&Value>) -> Option<ElementTest> {
    cast(caster, raw).map(|literal| ElementTest::Compare { cmp, literal })
}

fn any(caster: ScalarCaster, cmp: Cmp, raw: Option<&Value>) -> Predicate {
    match element_test(caster, cmp, raw) {
        Some(test) => Predicate::AnyElement(test),
        None => Predicate::Nothing,
    }
}

fn all(caster: ScalarCaster, cmp: Cmp, raw: Option<&Value>) -> Predicate {
    match element_test(caster, cmp, raw) {
        Some(test) => Predicate::AllElements(test),
        None => Predicate::Nothing,
    }
}

fn size(cmp: Cmp, raw: Option<&Value>) -> Predicate {
    match cast(ScalarCaster::Integer, raw) {
        Some(TypedValue::Integer(n)) => Predicate::Size { cmp, size: n },
        _ if cmp == Cmp::NotEq => Predicate::All,
        _ => Predicate::Nothing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynfields_core::FieldKind;
    use serde_json::json;

    fn field(ty: FieldType) -> FieldDefinition {
        FieldDefinition::new("f", "Host", FieldKind::unconstrained(ty))
    }

    fn matches(field: &FieldDefinition, op: &str, filter: Value, stored: Value) -> bool {
        field
            .finder()
            .search(op, Some(&filter))
            .unwrap()
            .matches(&stored)
    }

    #[test]
    fn unknown_or_unsupported_operator_is_usage_error() {
        let text = field(FieldType::Text);
        let err = text.finder().search("between", Some(&json!(1))).unwrap_err();
        assert_eq!(
            err,
            UsageError::InvalidOperator {
                operator: "between".into(),
                finder: "text finder".into()
            }
        );
        assert!(text.finder().search(">", Some(&json!("a"))).is_err());
    }

    #[test]
    fn soft_find_returns_none_for_unsupported_operator() {
        let text = field(FieldType::Text);
        assert!(text.finder().find("between", Some(&json!(1))).is_none());
        assert!(text.finder().find(">", Some(&json!("a"))).is_none());

        let cond = text.finder().find("start_with", Some(&json!("ab"))).unwrap();
        assert_eq!(cond.operation, Operation::StartWith);
        assert_eq!(cond, text.finder().search("start_with", Some(&json!("ab"))).unwrap());
    }

    #[test]
    fn eq_with_nil_or_blank_finds_nulls() {
        let int = field(FieldType::Integer);
        for filter in [Value::Null, json!(""), json!("   ")] {
            let cond = int.finder().search("eq", Some(&filter)).unwrap();
            assert_eq!(cond.predicate, Predicate::IsNull);
            assert!(cond.matches(&Value::Null));
            assert!(!cond.matches(&json!(0)));
        }
        let cond = int.finder().search("eq", None).unwrap();
        assert_eq!(cond.predicate, Predicate::IsNull);
    }

    #[test]
    fn not_eq_includes_null_rows() {
        let int = field(FieldType::Integer);
        assert!(matches(&int, "!=", json!("3"), json!(4)));
        assert!(matches(&int, "!=", json!("3"), Value::Null));
        assert!(!matches(&int, "!=", json!("3"), json!(3)));
        assert!(!matches(&int, "not_eq", Value::Null, Value::Null));
        assert!(matches(&int, "not_eq", Value::Null, json!(1)));
    }

    #[test]
    fn ordered_comparisons_cast_the_filter() {
        let int = field(FieldType::Integer);
        assert!(matches(&int, "gt", json!("3"), json!(5)));
        assert!(!matches(&int, ">", json!(3.9), json!(3)));
        assert!(!matches(&int, "gt", Value::Null, json!(5)));

        let date = field(FieldType::Date);
        assert!(matches(&date, "<=", json!("2024-01-31"), json!("2024-01-31")));
        assert!(!matches(&date, "<", json!("2024-01-31"), json!("2024-02-01")));

        let dec = field(FieldType::Decimal);
        assert!(matches(&dec, ">=", json!("1.50"), json!("1.5")));
    }

    #[test]
    fn text_patterns() {
        let text = field(FieldType::Text);
        assert!(matches(&text, "^", json!("ab"), json!("abc")));
        assert!(matches(&text, "$*", json!("BC"), json!("abc")));
        assert!(matches(&text, "~", json!("b"), json!("abc")));
        assert!(!matches(&text, "~", json!("B"), json!("abc")));
        assert!(!matches(&text, "start_with", Value::Null, json!("abc")));

        assert!(!matches(&text, "!^", json!("ab"), json!("abc")));
        assert!(matches(&text, "!^", json!("ab"), Value::Null));
        assert!(matches(&text, "not_contain", json!(""), json!("abc")));
        assert!(matches(&text, "!~*", json!("Q"), json!("abc")));
    }

    #[test]
    fn datetime_filter_uses_field_precision() {
        let constraints = json!({ "precision": 0 });
        let at = FieldDefinition::with_constraints(
            "at",
            "Host",
            FieldType::DateTime,
            constraints.as_object().unwrap(),
        );
        assert!(matches(
            &at,
            "eq",
            json!("2024-01-01T10:00:00.999+00:00"),
            json!("2024-01-01T10:00:00Z")
        ));
    }

    #[test]
    fn array_include_policies() {
        let ints = field(FieldType::IntegerArray);
        assert!(matches(&ints, "|=", json!("2"), json!([1, 2])));
        assert!(!matches(&ints, "include", json!(3), json!([1, 2])));
        assert!(!matches(&ints, "include", Value::Null, json!([1, 2])));
        assert!(!matches(&ints, "include", json!(""), Value::Null));

        assert!(matches(&ints, "!|=", json!(3), json!([1, 2])));
        assert!(matches(&ints, "not_include", json!(3), Value::Null));
        assert!(matches(&ints, "not_include", Value::Null, json!([1, 2])));
        assert!(matches(&ints, "not_include", json!(""), Value::Null));
    }

    #[test]
    fn all_quantifier_excludes_empty_arrays() {
        let ints = field(FieldType::IntegerArray);
        assert!(!matches(&ints, "all_gt", json!(0), json!([])));
        assert!(matches(&ints, "&>", json!(0), json!([1, 2])));
        assert!(!matches(&ints, "&>", json!(1), json!([1, 2])));
        assert!(matches(&ints, "|>", json!(1), json!([1, 2])));
        assert!(!matches(&ints, "any_gt", json!(1), Value::Null));
    }

    #[test]
    fn text_array_prefixes() {
        let tags = field(FieldType::TextArray);
        assert!(matches(&tags, "|^", json!("ru"), json!(["rust", "go"])));
        assert!(!matches(&tags, "&^", json!("ru"), json!(["rust", "go"])));
        assert!(matches(&tags, "all_start_with", json!("r"), json!(["rust", "ruby"])));
        assert!(!matches(&tags, "any_start_with", Value::Null, json!(["rust"])));
    }

    #[test]
    fn size_operations() {
        let tags = field(FieldType::EnumArray);
        assert!(matches(&tags, "#=", json!("2"), json!(["a", "b"])));
        assert!(matches(&tags, "size_lt", json!(3), json!(["a", "b"])));
        assert!(!matches(&tags, "size_gt", json!(3), json!(["a", "b"])));
        assert!(!matches(&tags, "size_eq", json!(0), Value::Null));
        assert!(!matches(&tags, "size_eq", Value::Null, json!([])));
        assert!(matches(&tags, "size_not_eq", Value::Null, json!([])));
    }
}
