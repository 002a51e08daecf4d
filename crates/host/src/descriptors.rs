//! Parsing of filter and assignment collections.
//!
//! Both accept either a JSON array of descriptor objects or a JSON object
//! whose values are descriptor objects (a keyed collection, taken in key
//! order). Anything else is a usage error.

use dynfields_core::error::json_kind;
use dynfields_core::{ScalarCaster, TypedValue, UsageError};
use serde_json::{Map, Value};

/// One `{name|n, operator|op, value|v}` filter entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterDescriptor {
    pub name: Option<String>,
    pub operator: String,
    pub value: Option<Value>,
}

/// One `{name, value, _destroy}` assignment entry. `value` is `None` when
/// the key is absent, which leaves the record's value untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignDescriptor {
    pub name: Option<String>,
    pub value: Option<Value>,
    pub destroy: bool,
}

pub fn parse_filters(input: &Value) -> Result<Vec<FilterDescriptor>, UsageError> {
    entries(input, "filter")?
        .into_iter()
        .map(|entry| {
            let operator = match pick(entry, &["operator", "op"]) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => {
                    return Err(UsageError::InvalidDescriptor {
                        what: "filter operator".to_string(),
                        got: json_kind(other).to_string(),
                    })
                }
            };
            Ok(FilterDescriptor {
                name: name_of(entry, &["name", "n"]),
                operator,
                value: pick(entry, &["value", "v"]).cloned(),
            })
        })
        .collect()
}

pub fn parse_assignments(input: &Value) -> Result<Vec<AssignDescriptor>, UsageError> {
    Ok(entries(input, "assignment")?
        .into_iter()
        .map(|entry| AssignDescriptor {
            name: name_of(entry, &["name"]),
            value: entry.get("value").cloned(),
            destroy: entry.get("_destroy").is_some_and(truthy),
        })
        .collect())
}

fn entries<'a>(input: &'a Value, what: &str) -> Result<Vec<&'a Map<String, Value>>, UsageError> {
    let items: Vec<&Value> = match input {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        other => {
            return Err(UsageError::InvalidCollection {
                expected: "array or object".to_string(),
                got: json_kind(other).to_string(),
            })
        }
    };
    items
        .into_iter()
        .map(|item| {
            item.as_object().ok_or_else(|| UsageError::InvalidDescriptor {
                what: what.to_string(),
                got: json_kind(item).to_string(),
            })
        })
        .collect()
}

fn pick<'a>(entry: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| entry.get(*k))
}

fn name_of(entry: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    pick(entry, keys).and_then(Value::as_str).map(str::to_string)
}

fn truthy(flag: &Value) -> bool {
    matches!(ScalarCaster::Boolean.cast(flag), Some(TypedValue::Boolean(true)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filters_accept_short_and_long_keys() {
        let parsed = parse_filters(&json!([
            { "name": "age", "operator": "gt", "value": 3 },
            { "n": "tags", "op": "|=", "v": "a" },
        ]))
        .unwrap();
        assert_eq!(parsed[0].name.as_deref(), Some("age"));
        assert_eq!(parsed[0].operator, "gt");
        assert_eq!(parsed[1].name.as_deref(), Some("tags"));
        assert_eq!(parsed[1].value, Some(json!("a")));
    }

    #[test]
    fn keyed_collections_keep_key_order() {
        let parsed = parse_filters(&json!({
            "1": { "n": "b", "op": "eq" },
            "0": { "n": "a", "op": "eq" },
        }))
        .unwrap();
        let names: Vec<_> = parsed.iter().filter_map(|d| d.name.as_deref()).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(parsed[0].value, None);
    }

    #[test]
    fn non_collections_are_usage_errors() {
        assert!(matches!(
            parse_filters(&json!("age > 3")),
            Err(UsageError::InvalidCollection { .. })
        ));
        assert!(matches!(
            parse_assignments(&json!([1])),
            Err(UsageError::InvalidDescriptor { .. })
        ));
        assert!(matches!(
            parse_filters(&json!([{ "n": "a", "op": 5 }])),
            Err(UsageError::InvalidDescriptor { .. })
        ));
    }

    #[test]
    fn destroy_flag_uses_boolean_casting() {
        let parsed = parse_assignments(&json!([
            { "name": "a", "_destroy": "1" },
            { "name": "b", "_destroy": "false" },
            { "name": "c", "value": null },
            { "name": "d" },
        ]))
        .unwrap();
        assert!(parsed[0].destroy);
        assert!(!parsed[1].destroy);
        assert_eq!(parsed[2].value, Some(Value::Null));
        assert_eq!(parsed[3].value, None);
    }
}
