use std::path::Path;

use dynfields_query::{FieldFinder, FieldQuery};
use serde_json::json;

use super::field_file::load_field;
use crate::config::Config;
use crate::{fail, parse_json_arg, print_json, OutputFormat};

pub(crate) fn cmd_search(
    field_path: &Path,
    op: &str,
    value: Option<&str>,
    config: &Config,
    output: OutputFormat,
    quiet: bool,
) {
    let field = load_field(field_path, output, quiet);
    let value = value.map(parse_json_arg);

    let condition = match field.finder().search(op, value.as_ref()) {
        Ok(c) => c,
        Err(e) => fail(&e.to_string(), output, quiet),
    };
    tracing::debug!(field = field.name(), operation = %condition.operation, "rendering filter");

    let query = FieldQuery::new(field.host_type()).with(condition);
    let Some(sql) = query.to_sql(&config.sql) else {
        fail("query has no conditions", output, quiet);
    };
    match output {
        OutputFormat::Json => print_json(&json!({ "sql": sql.text, "params": sql.params })),
        OutputFormat::Text => {
            println!("{}", sql.text);
            if !quiet {
                for (i, param) in sql.params.iter().enumerate() {
                    println!("-- ${} = {}", i + 1, param);
                }
            }
        }
    }
}
