use std::path::Path;
use std::process;
use std::sync::Arc;

use dynfields_core::{ErrorCode, Errors, HostRef, ValueRecord};
use serde_json::json;

use super::field_file::load_field;
use crate::config::Config;
use crate::{fail, parse_json_arg, print_json, OutputFormat};

pub(crate) fn cmd_validate(
    field_path: &Path,
    value: Option<&str>,
    config: &Config,
    output: OutputFormat,
    quiet: bool,
) {
    let field = load_field(field_path, output, quiet);

    let mut field_errors = field.validate();
    if let Some(registry) = config.registry() {
        if !registry.allows(field.host_type(), field.field_type()) {
            field_errors.add("type", ErrorCode::Inclusion);
        }
    }

    let value_errors = value.map(|raw| {
        let field = Arc::new(field.clone());
        let host = HostRef::new(field.host_type(), "cli");
        let mut record = match ValueRecord::for_field(host, field) {
            Ok(r) => r,
            Err(e) => fail(&e.to_string(), output, quiet),
        };
        record.assign(Some(parse_json_arg(raw)));
        record.validate()
    });

    let valid = field_errors.is_empty() && value_errors.as_ref().map_or(true, Errors::is_empty);
    match output {
        OutputFormat::Json => print_json(&json!({
            "valid": valid,
            "field": field_errors.to_json(),
            "value": value_errors.as_ref().map(Errors::to_json),
        })),
        OutputFormat::Text => {
            if !field_errors.is_empty() {
                println!("field {}: {}", field.name(), field_errors);
            }
            if let Some(errors) = value_errors.as_ref().filter(|e| !e.is_empty()) {
                println!("value: {}", errors);
            }
            if valid && !quiet {
                println!("valid");
            }
        }
    }
    if !valid {
        process::exit(1);
    }
}
