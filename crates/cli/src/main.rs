mod commands;
mod config;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use dynfields_core::FieldType;
use tracing_subscriber::EnvFilter;

use config::Config;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Custom-field toolkit: cast values, validate definitions, render filters.
#[derive(Parser)]
#[command(name = "dynfields", version, about = "Custom-field toolkit")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cast a raw JSON value to a field type's stored form
    Cast {
        /// Field type discriminator (e.g. integer, decimal_array)
        #[arg(long = "type")]
        field_type: String,
        /// Constraints as a JSON object (only `precision` affects casting)
        #[arg(long)]
        constraints: Option<String>,
        /// Raw value as JSON; text that is not JSON is taken as a string
        value: String,
    },

    /// Validate a field definition and optionally a value against it
    Validate {
        /// Path to the field definition JSON file
        field: PathBuf,
        /// Raw value as JSON
        #[arg(long)]
        value: Option<String>,
    },

    /// Render one filter on a field as PostgreSQL
    Search {
        /// Path to the field definition JSON file
        field: PathBuf,
        /// Operator name or alias (e.g. gt, >, |=)
        #[arg(long)]
        op: String,
        /// Filter value as JSON
        #[arg(long)]
        value: Option<String>,
    },

    /// List the filter operators a field type supports
    Operators {
        /// Field type discriminator
        #[arg(long = "type")]
        field_type: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            report_error(&e.to_string(), cli.output, cli.quiet);
            process::exit(1);
        }
    };
    init_logging(&config);

    match cli.command {
        Commands::Cast {
            field_type,
            constraints,
            value,
        } => {
            commands::cast::cmd_cast(
                &field_type,
                constraints.as_deref(),
                &value,
                cli.output,
                cli.quiet,
            );
        }
        Commands::Validate { field, value } => {
            commands::validate::cmd_validate(
                &field,
                value.as_deref(),
                &config,
                cli.output,
                cli.quiet,
            );
        }
        Commands::Search { field, op, value } => {
            commands::search::cmd_search(
                &field,
                &op,
                value.as_deref(),
                &config,
                cli.output,
                cli.quiet,
            );
        }
        Commands::Operators { field_type } => {
            commands::operators::cmd_operators(&field_type, cli.output, cli.quiet);
        }
    }
}

/// `RUST_LOG` wins over `[logging] level`; the fallback is `warn`.
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.logging.level.as_deref().unwrap_or("warn")))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}

/// Print `msg` and exit 1.
pub(crate) fn fail(msg: &str, output: OutputFormat, quiet: bool) -> ! {
    report_error(msg, output, quiet);
    process::exit(1);
}

pub(crate) fn parse_field_type(name: &str, output: OutputFormat, quiet: bool) -> FieldType {
    match name.parse() {
        Ok(t) => t,
        Err(e) => fail(&format!("{e}"), output, quiet),
    }
}

/// Parse a JSON argument. Text that is not valid JSON is taken as a string.
pub(crate) fn parse_json_arg(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

pub(crate) fn print_json(value: &serde_json::Value) {
    let pretty = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("serialization error: {}", e));
    println!("{}", pretty);
}

pub(crate) fn read_json_file(path: &Path, output: OutputFormat, quiet: bool) -> serde_json::Value {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => fail(
            &format!("error reading file '{}': {}", path.display(), e),
            output,
            quiet,
        ),
    };
    match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => fail(
            &format!("error parsing JSON in '{}': {}", path.display(), e),
            output,
            quiet,
        ),
    }
}
