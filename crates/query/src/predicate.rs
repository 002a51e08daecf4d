//! Predicate trees over one field's typed value.
//!
//! Evaluation follows SQL three-valued logic: `Some(true)`, `Some(false)`,
//! or `None` for unknown. A row matches only on `Some(true)`, which keeps
//! in-memory evaluation and the rendered SQL in agreement on NULLs.

use std::cmp::Ordering;

use dynfields_core::TypedValue;

/// Binary comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmp {
    Eq,
    NotEq,
    Gt,
    Gteq,
    Lt,
    Lteq,
}

impl Cmp {
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            Cmp::Eq => ordering == Ordering::Equal,
            Cmp::NotEq => ordering != Ordering::Equal,
            Cmp::Gt => ordering == Ordering::Greater,
            Cmp::Gteq => ordering != Ordering::Less,
            Cmp::Lt => ordering == Ordering::Less,
            Cmp::Lteq => ordering != Ordering::Greater,
        }
    }

    /// SQL operator token.
    pub fn sql(self) -> &'static str {
        match self {
            Cmp::Eq => "=",
            Cmp::NotEq => "<>",
            Cmp::Gt => ">",
            Cmp::Gteq => ">=",
            Cmp::Lt => "<",
            Cmp::Lteq => "<=",
        }
    }

    /// SQL/JSON path operator token.
    pub fn jsonpath(self) -> &'static str {
        match self {
            Cmp::Eq => "==",
            Cmp::NotEq => "!=",
            other => other.sql(),
        }
    }
}

/// Where a LIKE needle must appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    Prefix,
    Suffix,
    Contains,
}

/// Test applied to each element of an array value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementTest {
    Compare { cmp: Cmp, literal: TypedValue },
    StartsWith(String),
}

impl ElementTest {
    /// Nil elements never pass.
    pub fn passes(&self, element: Option<&TypedValue>) -> bool {
        let Some(element) = element else {
            return false;
        };
        match self {
            ElementTest::Compare { cmp, literal } => element
                .compare(literal)
                .is_some_and(|ordering| cmp.holds(ordering)),
            ElementTest::StartsWith(prefix) => element
                .as_text()
                .is_some_and(|text| text.starts_with(prefix.as_str())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Every row.
    All,
    /// No row.
    Nothing,
    IsNull,
    IsNotNull,
    Compare {
        cmp: Cmp,
        literal: TypedValue,
    },
    Like {
        pattern: Pattern,
        needle: String,
        case_insensitive: bool,
    },
    /// Some element passes. A nil array has no elements.
    AnyElement(ElementTest),
    /// The array is non-empty and every element passes. Unknown on nil.
    AllElements(ElementTest),
    /// Array length comparison. Unknown on nil.
    Size {
        cmp: Cmp,
        size: i64,
    },
    Not(Box<Predicate>),
    Or(Vec<Predicate>),
    And(Vec<Predicate>),
}

impl Predicate {
    pub fn not(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }

    /// `self OR value IS NULL`.
    pub fn or_null(self) -> Predicate {
        Predicate::Or(vec![self, Predicate::IsNull])
    }

    /// Evaluate against a deserialized value. `None` is nil.
    pub fn eval(&self, value: Option<&TypedValue>) -> Option<bool> {
        match self {
            Predicate::All => Some(true),
            Predicate::Nothing => Some(false),
            Predicate::IsNull => Some(value.is_none()),
            Predicate::IsNotNull => Some(value.is_some()),
            Predicate::Compare { cmp, literal } => {
                let ordering = value?.compare(literal)?;
                Some(cmp.holds(ordering))
            }
            Predicate::Like {
                pattern,
                needle,
                case_insensitive,
            } => {
                let text = value?.as_text()?;
                let (text, needle) = if *case_insensitive {
                    (text.to_lowercase(), needle.to_lowercase())
                } else {
                    (text.to_string(), needle.clone())
                };
                Some(match pattern {
                    Pattern::Prefix => text.starts_with(&needle),
                    Pattern::Suffix => text.ends_with(&needle),
                    Pattern::Contains => text.contains(&needle),
                })
            }
            Predicate::AnyElement(test) => match value {
                None => Some(false),
                Some(v) => {
                    let items = v.as_array()?;
                    Some(items.iter().any(|item| test.passes(item.as_ref())))
                }
            },
            Predicate::AllElements(test) => {
                let items = value?.as_array()?;
                Some(!items.is_empty() && items.iter().all(|item| test.passes(item.as_ref())))
            }
            Predicate::Size { cmp, size } => {
                let items = value?.as_array()?;
                Some(cmp.holds((items.len() as i64).cmp(size)))
            }
            Predicate::Not(inner) => inner.eval(value).map(|b| !b),
            Predicate::Or(parts) => {
                let mut unknown = false;
                for part in parts {
                    match part.eval(value) {
                        Some(true) => return Some(true),
                        Some(false) => {}
                        None => unknown = true,
                    }
                }
                if unknown {
                    None
                } else {
                    Some(false)
                }
            }
            Predicate::And(parts) => {
                let mut unknown = false;
                for part in parts {
                    match part.eval(value) {
                        Some(false) => return Some(false),
                        Some(true) => {}
                        None => unknown = true,
                    }
                }
                if unknown {
                    None
                } else {
                    Some(true)
                }
            }
        }
    }

    pub fn matches(&self, value: Option<&TypedValue>) -> bool {
        self.eval(value) == Some(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(i: i64) -> TypedValue {
        TypedValue::Integer(i)
    }

    fn ints(values: &[Option<i64>]) -> TypedValue {
        TypedValue::Array(values.iter().map(|v| v.map(TypedValue::Integer)).collect())
    }

    #[test]
    fn comparisons_are_unknown_on_nil() {
        let gt = Predicate::Compare {
            cmp: Cmp::Gt,
            literal: int(3),
        };
        assert_eq!(gt.eval(Some(&int(5))), Some(true));
        assert_eq!(gt.eval(Some(&int(3))), Some(false));
        assert_eq!(gt.eval(None), None);
        assert_eq!(gt.clone().not().eval(None), None);
    }

    #[test]
    fn not_eq_or_null_includes_nil() {
        let p = Predicate::Compare {
            cmp: Cmp::NotEq,
            literal: int(3),
        }
        .or_null();
        assert!(p.matches(None));
        assert!(p.matches(Some(&int(4))));
        assert!(!p.matches(Some(&int(3))));
    }

    #[test]
    fn like_patterns() {
        let text = TypedValue::Text("Hello World".into());
        let like = |pattern, needle: &str, ci| Predicate::Like {
            pattern,
            needle: needle.into(),
            case_insensitive: ci,
        };
        assert!(like(Pattern::Prefix, "Hello", false).matches(Some(&text)));
        assert!(!like(Pattern::Prefix, "hello", false).matches(Some(&text)));
        assert!(like(Pattern::Prefix, "hello", true).matches(Some(&text)));
        assert!(like(Pattern::Suffix, "WORLD", true).matches(Some(&text)));
        assert!(like(Pattern::Contains, "o W", false).matches(Some(&text)));
        assert_eq!(like(Pattern::Contains, "x", false).eval(None), None);
    }

    #[test]
    fn element_quantifiers() {
        let any_gt = Predicate::AnyElement(ElementTest::Compare {
            cmp: Cmp::Gt,
            literal: int(5),
        });
        let all_gt = Predicate::AllElements(ElementTest::Compare {
            cmp: Cmp::Gt,
            literal: int(5),
        });

        assert!(any_gt.matches(Some(&ints(&[Some(1), Some(7)]))));
        assert!(!all_gt.matches(Some(&ints(&[Some(1), Some(7)]))));
        assert!(all_gt.matches(Some(&ints(&[Some(6), Some(7)]))));
        assert!(!all_gt.matches(Some(&ints(&[]))));
        assert!(!all_gt.matches(Some(&ints(&[Some(6), None]))));

        // a nil array has no elements
        assert_eq!(any_gt.eval(None), Some(false));
        assert!(any_gt.clone().not().matches(None));
        assert_eq!(all_gt.eval(None), None);
    }

    #[test]
    fn size_comparisons() {
        let p = Predicate::Size {
            cmp: Cmp::Gteq,
            size: 2,
        };
        assert!(p.matches(Some(&ints(&[Some(1), None]))));
        assert!(!p.matches(Some(&ints(&[Some(1)]))));
        assert_eq!(p.eval(None), None);
    }

    #[test]
    fn three_valued_connectives() {
        let unknown = Predicate::Compare {
            cmp: Cmp::Eq,
            literal: int(1),
        };
        assert_eq!(
            Predicate::Or(vec![unknown.clone(), Predicate::All]).eval(None),
            Some(true)
        );
        assert_eq!(
            Predicate::Or(vec![unknown.clone(), Predicate::Nothing]).eval(None),
            None
        );
        assert_eq!(
            Predicate::And(vec![unknown.clone(), Predicate::Nothing]).eval(None),
            Some(false)
        );
        assert_eq!(
            Predicate::And(vec![unknown, Predicate::All]).eval(None),
            None
        );
    }
}
