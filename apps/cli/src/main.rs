//! `ferrum` command line tool
//!
//! Usage:
//!   ferrum types
//!   ferrum describe AuditEvent.Agent
//!   ferrum convert encounter.json --to xml
//!   ferrum validate auditevent.xml --config validator.yaml

mod logging;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ferrum_format::{
    deserialize, to_hash, to_json_string, to_xml_string, DeserializeOptions, JsonFormat,
    XmlFormat,
};
use ferrum_models::{FieldDescriptor, Instance, TypeDescriptor, TypeRegistry};
use ferrum_validator::{Validator, ValidatorConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[clap(name = "ferrum")]
#[clap(about = "Describe, convert and validate FHIR R4 resources")]
struct Args {
    /// Debug logging for the ferrum crates (RUST_LOG overrides)
    #[clap(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[clap(long, global = true)]
    log_json: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the resource types known to the registry
    Types,

    /// Show the fields of a type (`AuditEvent`, `Coding`, `AuditEvent.Agent`)
    Describe {
        type_name: String,

        /// Print the descriptor as JSON
        #[clap(long)]
        json: bool,
    },

    /// Convert a resource between JSON, XML and the hash form
    Convert {
        file: PathBuf,

        #[clap(long, value_enum)]
        to: OutputFormat,

        /// Skip unknown elements instead of failing
        #[clap(long)]
        lenient: bool,
    },

    /// Validate a resource and print the findings
    Validate {
        file: PathBuf,

        /// Validator configuration (YAML)
        #[clap(short, long)]
        config: Option<PathBuf>,

        /// Print an OperationOutcome instead of one line per issue
        #[clap(long)]
        outcome: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Xml,
    Hash,
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init_logging(args.verbose, args.log_json);

    match run(args.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run(command: Command) -> Result<ExitCode> {
    let registry = TypeRegistry::r4();

    match command {
        Command::Types => {
            for descriptor in registry.resource_types() {
                println!("{}", descriptor.name());
            }
        }
        Command::Describe { type_name, json } => {
            let descriptor = registry.lookup(&type_name)?;
            if json {
                println!("{}", serde_json::to_string_pretty(descriptor.as_ref())?);
            } else {
                describe(&registry, &descriptor);
            }
        }
        Command::Convert { file, to, lenient } => {
            let options = if lenient {
                DeserializeOptions::lenient()
            } else {
                DeserializeOptions::default()
            };
            let instance = read_resource(&registry, &file, &options)?;
            let output = match to {
                OutputFormat::Json => to_json_string(&instance, true)?,
                OutputFormat::Xml => to_xml_string(&instance)?,
                OutputFormat::Hash => format!("{:#?}", to_hash(&instance)?),
            };
            println!("{}", output);
        }
        Command::Validate {
            file,
            config,
            outcome,
        } => {
            let config = match config {
                Some(path) => {
                    let yaml = fs::read_to_string(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    ValidatorConfig::from_yaml(&yaml)?
                }
                None => ValidatorConfig::default(),
            };
            let validator = Validator::from_config(&config)?;
            let instance = read_resource(&registry, &file, &DeserializeOptions::default())?;
            let result = validator.validate(&instance);

            if outcome {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&result.to_operation_outcome())?
                );
            } else {
                for issue in &result.issues {
                    println!(
                        "{:<11} {:<14} {:<40} {}",
                        issue.severity.to_string().to_lowercase(),
                        issue.code,
                        issue.location.as_deref().unwrap_or("-"),
                        issue.diagnostics
                    );
                }
                println!(
                    "{}: {} error(s), {} warning(s)",
                    file.display(),
                    result.error_count(),
                    result.warning_count()
                );
            }

            if !result.valid {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn read_resource(
    registry: &Arc<TypeRegistry>,
    path: &Path,
    options: &DeserializeOptions,
) -> Result<Instance> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let trimmed = content.trim_start();

    let instance = if trimmed.starts_with('<') {
        deserialize(&XmlFormat::default(), &content, registry, options)
    } else if trimmed.starts_with('{') {
        let value: serde_json::Value = serde_json::from_str(&content)?;
        deserialize(&JsonFormat, &value, registry, options)
    } else {
        bail!("{}: neither JSON nor XML", path.display());
    };

    let instance = instance.with_context(|| format!("parsing {}", path.display()))?;
    tracing::debug!(resource_type = %instance.type_name(), "resource loaded");
    Ok(instance)
}

fn describe(registry: &TypeRegistry, descriptor: &TypeDescriptor) {
    println!("{} ({:?})", descriptor.name(), descriptor.kind());
    if let Some(base) = descriptor.base() {
        println!("  base: {}", base);
    }

    for field in descriptor.fields() {
        println!("  {}", field_line(field));
    }

    let nested: Vec<_> = registry
        .nested_types(descriptor.name())
        .map(|t| t.name().to_string())
        .collect();
    if !nested.is_empty() {
        println!("  nested: {}", nested.join(", "));
    }
}

fn field_line(field: &FieldDescriptor) -> String {
    let mut name = field.wire_name().to_string();
    if field.is_choice() {
        name.push_str("[x]");
    }
    if field.name() != field.wire_name() {
        name = format!("{} ({})", name, field.name());
    }

    let mut line = format!(
        "{:<32} {:<6} {}",
        name,
        field.cardinality().to_string(),
        field.type_codes()
    );
    if let Some(binding) = field.binding() {
        line.push_str(&format!(
            "  [{} {}]",
            binding.strength.code(),
            binding.value_set.as_deref().unwrap_or("-")
        ));
    }
    line
}
