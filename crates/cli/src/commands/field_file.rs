use std::path::Path;

use dynfields_core::FieldDefinition;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{fail, read_json_file, OutputFormat};

/// A field definition file: the stored field record shape, with
/// `default_value` taken as raw input.
#[derive(Debug, Deserialize)]
struct FieldDoc {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(rename = "type")]
    field_type: String,
    host_type: String,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    constraints: Map<String, Value>,
    #[serde(default)]
    default_value: Value,
}

pub(crate) fn load_field(path: &Path, output: OutputFormat, quiet: bool) -> FieldDefinition {
    let doc: FieldDoc = match serde_json::from_value(read_json_file(path, output, quiet)) {
        Ok(d) => d,
        Err(e) => fail(
            &format!("invalid field definition in '{}': {}", path.display(), e),
            output,
            quiet,
        ),
    };
    let mut field = match FieldDefinition::from_parts(
        doc.id.unwrap_or_else(|| "cli".to_string()),
        doc.name,
        doc.host_type,
        doc.scope,
        &doc.field_type,
        &doc.constraints,
        Value::Null,
    ) {
        Ok(f) => f,
        Err(e) => fail(&e.to_string(), output, quiet),
    };

    if !doc.default_value.is_null() {
        field.set_default(&doc.default_value);
    } else if field.field_type().is_array() {
        field.set_default(&Value::Array(Vec::new()));
    }
    field
}
