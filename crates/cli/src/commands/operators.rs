use dynfields_query::Operation;
use serde_json::json;

use crate::{parse_field_type, print_json, OutputFormat};

pub(crate) fn cmd_operators(field_type: &str, output: OutputFormat, quiet: bool) {
    let field_type = parse_field_type(field_type, output, quiet);
    let operations = Operation::for_type(field_type);
    match output {
        OutputFormat::Json => {
            let list: Vec<_> = operations
                .iter()
                .map(|op| json!({ "name": op.name(), "alias": op.alias() }))
                .collect();
            print_json(&json!({ "type": field_type.as_str(), "operators": list }));
        }
        OutputFormat::Text => {
            for op in operations {
                println!("{:<16} {}", op.name(), op.alias());
            }
        }
    }
}
