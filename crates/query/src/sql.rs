//! PostgreSQL rendering for field conditions.
//!
//! Values live in one table with a `jsonb` value column. Each condition
//! reads from its own CTE restricted to one field and host type; the
//! per-condition host id sets are intersected.

use dynfields_core::{FieldType, ScalarCaster, TypedValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::finder::FieldCondition;
use crate::predicate::{Cmp, ElementTest, Pattern, Predicate};

// ──────────────────────────────────────────────
// Configuration
// ──────────────────────────────────────────────

/// Names of the values table, its columns, and the CTE prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlConfig {
    pub values_table: String,
    pub id_column: String,
    pub host_type_column: String,
    pub host_id_column: String,
    pub field_id_column: String,
    pub value_column: String,
    pub cte_prefix: String,
}

impl Default for SqlConfig {
    fn default() -> Self {
        SqlConfig {
            values_table: "custom_field_values".to_string(),
            id_column: "id".to_string(),
            host_type_column: "host_type".to_string(),
            host_id_column: "host_id".to_string(),
            field_id_column: "field_id".to_string(),
            value_column: "value".to_string(),
            cte_prefix: "field_values_".to_string(),
        }
    }
}

/// Rendered statement with positional `$n` parameters.
///
/// String parameters bind as text; `jsonb` parameters are carried as their
/// JSON text and cast in the statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sql {
    pub text: String,
    pub params: Vec<Value>,
}

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Escape LIKE metacharacters with the default `\` escape.
pub fn escape_like(needle: &str) -> String {
    let mut out = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// ──────────────────────────────────────────────
// Rendering
// ──────────────────────────────────────────────

#[derive(Debug, Default)]
pub(crate) struct Params {
    values: Vec<Value>,
}

impl Params {
    pub(crate) fn bind(&mut self, value: Value) -> String {
        self.values.push(value);
        format!("${}", self.values.len())
    }

    pub(crate) fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// `CTE name AS (SELECT host_id, value FROM ... WHERE field_id = $a AND host_type = $b)`.
pub(crate) fn scoped_cte(
    config: &SqlConfig,
    name: &str,
    field_id: &str,
    host_type: &str,
    params: &mut Params,
) -> String {
    let field_param = params.bind(Value::String(field_id.to_string()));
    let host_param = params.bind(Value::String(host_type.to_string()));
    format!(
        "{} AS (SELECT {}, {} FROM {} WHERE {} = {} AND {} = {})",
        quote_identifier(name),
        quote_identifier(&config.host_id_column),
        quote_identifier(&config.value_column),
        quote_identifier(&config.values_table),
        quote_identifier(&config.field_id_column),
        field_param,
        quote_identifier(&config.host_type_column),
        host_param,
    )
}

/// Boolean SQL expression for one condition over `value_column`.
pub(crate) fn condition_sql(config: &SqlConfig, condition: &FieldCondition, params: &mut Params) -> String {
    let renderer = Renderer {
        column: quote_identifier(&config.value_column),
        field_type: condition.field_type,
        element: condition.caster.element(),
    };
    renderer.render(&condition.predicate, params)
}

struct Renderer {
    column: String,
    field_type: FieldType,
    element: ScalarCaster,
}

impl Renderer {
    fn scalar(&self) -> String {
        format!("({} #>> '{{}}')", self.column)
    }

    fn render(&self, predicate: &Predicate, params: &mut Params) -> String {
        match predicate {
            Predicate::All => "TRUE".to_string(),
            Predicate::Nothing => "FALSE".to_string(),
            Predicate::IsNull => format!("{} IS NULL", self.scalar()),
            Predicate::IsNotNull => format!("{} IS NOT NULL", self.scalar()),
            Predicate::Compare { cmp, literal } => {
                let cast = sql_cast(self.field_type);
                let param = params.bind(self.encode(literal));
                match cast {
                    Some(ty) => format!("{}::{} {} {}::{}", self.scalar(), ty, cmp.sql(), param, ty),
                    None => format!("{} {} {}", self.scalar(), cmp.sql(), param),
                }
            }
            Predicate::Like {
                pattern,
                needle,
                case_insensitive,
            } => {
                let escaped = escape_like(needle);
                let pattern = match pattern {
                    Pattern::Prefix => format!("{}%", escaped),
                    Pattern::Suffix => format!("%{}", escaped),
                    Pattern::Contains => format!("%{}%", escaped),
                };
                let param = params.bind(Value::String(pattern));
                let op = if *case_insensitive { "ILIKE" } else { "LIKE" };
                format!("{} {} {}", self.scalar(), op, param)
            }
            Predicate::AnyElement(test) => {
                let (path, vars) = self.jsonpath(test, params);
                format!(
                    "COALESCE({}({}, {}, {}), FALSE)",
                    self.path_fn("jsonb_path_exists"),
                    self.column,
                    path,
                    vars
                )
            }
            Predicate::AllElements(test) => {
                let (path, vars) = self.jsonpath(test, params);
                let length = self.array_length();
                format!(
                    "({len} > 0 AND {len} = jsonb_array_length({}({}, {}, {})))",
                    self.path_fn("jsonb_path_query_array"),
                    self.column,
                    path,
                    vars,
                    len = length
                )
            }
            Predicate::Size { cmp, size } => {
                let param = params.bind(Value::from(*size));
                format!("{} {} {}::bigint", self.array_length(), cmp.sql(), param)
            }
            Predicate::Not(inner) => format!("NOT ({})", self.render(inner, params)),
            Predicate::Or(parts) => self.join(parts, " OR ", params),
            Predicate::And(parts) => self.join(parts, " AND ", params),
        }
    }

    fn join(&self, parts: &[Predicate], sep: &str, params: &mut Params) -> String {
        let rendered: Vec<String> = parts.iter().map(|p| self.render(p, params)).collect();
        format!("({})", rendered.join(sep))
    }

    fn array_length(&self) -> String {
        format!(
            "(CASE WHEN jsonb_typeof({col}) = 'array' THEN jsonb_array_length({col}) END)",
            col = self.column
        )
    }

    fn path_fn(&self, name: &str) -> String {
        if self.element.field_type() == FieldType::DateTime {
            format!("{}_tz", name)
        } else {
            name.to_string()
        }
    }

    /// The jsonpath filter and its `vars` argument.
    fn jsonpath(&self, test: &ElementTest, params: &mut Params) -> (String, String) {
        let (filter, literal) = match test {
            ElementTest::Compare { cmp, literal } => {
                let item = self.path_item("@");
                let var = self.path_item("$value");
                (format!("{} {} {}", item, cmp.jsonpath(), var), self.encode(literal))
            }
            ElementTest::StartsWith(prefix) => {
                ("@ starts with $value".to_string(), Value::String(prefix.clone()))
            }
        };
        let param = params.bind(Value::String(literal.to_string()));
        (
            format!("'$[*] ? ({})'", filter),
            format!("jsonb_build_object('value', {}::jsonb)", param),
        )
    }

    /// Per-type jsonpath accessor so stored strings compare by value.
    ///
    /// Jsonpath has no exact numeric conversion, so decimal elements compare
    /// as `double`. Array predicates on decimals finer than f64 can disagree
    /// with [`Predicate::eval`](crate::predicate::Predicate::eval) in the
    /// last digits; scalar decimal columns cast to `numeric` and stay exact.
    fn path_item(&self, item: &str) -> String {
        match self.element.field_type() {
            FieldType::Decimal => format!("{}.double()", item),
            FieldType::Date | FieldType::DateTime => format!("{}.datetime()", item),
            _ => item.to_string(),
        }
    }

    fn encode(&self, literal: &TypedValue) -> Value {
        self.element.encode(literal).unwrap_or(Value::Null)
    }
}

fn sql_cast(field_type: FieldType) -> Option<&'static str> {
    match field_type {
        FieldType::Boolean => Some("boolean"),
        FieldType::Integer => Some("bigint"),
        FieldType::Decimal => Some("numeric"),
        FieldType::Date => Some("date"),
        FieldType::DateTime => Some("timestamptz"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_identifier("value"), "\"value\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn params_number_from_one() {
        let mut params = Params::default();
        assert_eq!(params.bind(Value::from(1)), "$1");
        assert_eq!(params.bind(Value::from(2)), "$2");
        assert_eq!(params.into_values().len(), 2);
    }

    #[test]
    fn config_defaults_fill_missing_keys() {
        let config: SqlConfig =
            serde_json::from_value(serde_json::json!({ "values_table": "vals" })).unwrap();
        assert_eq!(config.values_table, "vals");
        assert_eq!(config.value_column, "value");
    }
}
