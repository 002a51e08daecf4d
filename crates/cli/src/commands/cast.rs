use dynfields_core::FieldKind;
use serde_json::{json, Map, Value};

use crate::{fail, parse_field_type, parse_json_arg, print_json, OutputFormat};

pub(crate) fn cmd_cast(
    field_type: &str,
    constraints: Option<&str>,
    value: &str,
    output: OutputFormat,
    quiet: bool,
) {
    let field_type = parse_field_type(field_type, output, quiet);
    let constraints = match constraints.map(serde_json::from_str::<Map<String, Value>>) {
        None => Map::new(),
        Some(Ok(m)) => m,
        Some(Err(e)) => fail(&format!("invalid --constraints: {}", e), output, quiet),
    };
    let (kind, errors) = FieldKind::parse(field_type, &constraints);
    if !errors.is_empty() {
        fail(&format!("invalid constraints: {}", errors), output, quiet);
    }

    let raw = parse_json_arg(value);
    let stored = kind.caster().serialize(&raw).unwrap_or(Value::Null);
    match output {
        OutputFormat::Text => println!("{}", stored),
        OutputFormat::Json => print_json(&json!({
            "type": field_type.as_str(),
            "input": raw,
            "stored": stored,
        })),
    }
}
