use crate::config::GeneratorConfig;
use crate::diagnostics::print_diagnostics;
use crate::filters::FilterRegistry;
use crate::generator::{self, write_atomic};
use crate::params::normalize_document;
use crate::schema::{load_schema, SchemaOptions};
use crate::spec::{parse_document, render_document, Endpoint, KeyValue};
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

/// Command-line interface for querygen
///
/// Generates typed query handlers from a compiled protobuf schema and the
/// OpenAPI description of the same service.
#[derive(Parser)]
#[command(name = "querygen")]
#[command(about = "Generate filter constructors and query handlers", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Inputs shared by every subcommand
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Path to the OpenAPI description (YAML or JSON)
    #[arg(long)]
    pub openapi: PathBuf,

    /// Descriptor set file, or a directory of them (*.pb, *.bin, *.desc)
    #[arg(long)]
    pub descriptors: PathBuf,

    /// Prefix stripped from REST paths before taking the resource segment.
    /// Defaults to the path of servers[0].url
    #[arg(long)]
    pub base_path: Option<String>,

    /// Path to the generator config (querygen.toml).
    /// If not provided, will auto-detect alongside the OpenAPI description
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl InputArgs {
    /// Load the config file and apply command-line overrides.
    pub fn generator_config(&self) -> anyhow::Result<GeneratorConfig> {
        let mut config = GeneratorConfig::resolve(self.config.as_deref(), &self.openapi)?;
        if let Some(base_path) = &self.base_path {
            config.base_path = Some(base_path.clone());
        }
        Ok(config)
    }
}

/// Available querygen commands
#[derive(Subcommand)]
pub enum Commands {
    /// Generate filters.rs, handlers.rs and mod.rs into an output directory
    Generate {
        #[command(flatten)]
        inputs: InputArgs,

        /// Output directory for the generated modules
        #[arg(short, long)]
        output: PathBuf,

        /// Perform a dry run: show what would change without writing files
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Rewrite an OpenAPI description into its flattened, canonical form
    ///
    /// Renames dotted and camelCase parameters to snake_case, coerces array
    /// parameters to comma-separated strings, corrects wrapper-typed
    /// parameters and applies the digit-boundary fixup to schema names.
    Normalize {
        #[command(flatten)]
        inputs: InputArgs,

        /// Where to write the normalized document (format follows the extension)
        #[arg(short, long)]
        output: PathBuf,

        /// Exit with an error if the document is not already normalized
        #[arg(long, default_value_t = false)]
        check: bool,
    },
    /// Print the endpoint model and every diagnostic without writing anything
    Inspect {
        #[command(flatten)]
        inputs: InputArgs,
    },
}

/// Execute the CLI command provided by the user
///
/// # Errors
///
/// Returns an error if:
/// - Either input cannot be read or parsed
/// - The config file is missing or invalid
/// - Rendering or writing the output fails
pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate {
            inputs,
            output,
            dry_run,
        } => run_generate(&inputs, &output, dry_run),
        Commands::Normalize {
            inputs,
            output,
            check,
        } => run_normalize(&inputs, &output, check),
        Commands::Inspect { inputs } => run_inspect(&inputs),
    }
}

fn run_generate(inputs: &InputArgs, output: &Path, dry_run: bool) -> anyhow::Result<()> {
    let config = inputs.generator_config()?;
    let (generation, report) =
        generator::generate(&inputs.openapi, &inputs.descriptors, output, &config, dry_run)?;
    print_diagnostics(&generation.model.diagnostics);

    let verb = if dry_run { "Would write" } else { "Wrote" };
    for path in &report.written {
        println!("✅ {verb} {}", path.display());
    }
    for path in &report.unchanged {
        println!("ℹ️  Unchanged {}", path.display());
    }
    Ok(())
}

fn run_normalize(inputs: &InputArgs, output: &Path, check: bool) -> anyhow::Result<()> {
    let config = inputs.generator_config()?;
    let registry = FilterRegistry::standard();
    let schema = load_schema(
        &inputs.descriptors,
        SchemaOptions {
            registry: &registry,
            required_group_extension: &config.required_group_extension,
        },
    )
    .with_context(|| format!("failed to load descriptors from {}", inputs.descriptors.display()))?;

    let content = std::fs::read_to_string(&inputs.openapi).with_context(|| {
        format!("failed to read REST description '{}'", inputs.openapi.display())
    })?;
    let mut document = parse_document(&inputs.openapi, &content)?;
    let report = normalize_document(&mut document, &schema, &registry, config.base_path.as_deref());
    info!(
        renamed_params = report.renamed_params,
        coerced_lists = report.coerced_lists,
        renamed_schemas = report.renamed_schemas.len(),
        "Normalized REST description"
    );

    if check {
        if !report.is_unchanged() {
            anyhow::bail!(
                "{} is not normalized: {} parameter(s) renamed, {} list(s) coerced, {} schema(s) renamed",
                inputs.openapi.display(),
                report.renamed_params,
                report.coerced_lists,
                report.renamed_schemas.len()
            );
        }
        println!("✅ {} is already normalized", inputs.openapi.display());
        return Ok(());
    }

    let rendered = render_document(output, &document)?;
    write_atomic(output, rendered.as_bytes())?;
    println!("✅ Wrote {}", output.display());
    Ok(())
}

fn run_inspect(inputs: &InputArgs) -> anyhow::Result<()> {
    let config = inputs.generator_config()?;
    let registry = FilterRegistry::standard();
    let (description, schema) =
        generator::load_inputs(&inputs.openapi, &inputs.descriptors, &registry, &config)?;
    let model = generator::endpoint_model(&description, &schema, &registry, &config);

    for endpoint in &model.endpoints {
        print!("{}", describe_endpoint(endpoint));
    }
    println!(
        "{} endpoint(s), {} diagnostic(s)",
        model.endpoints.len(),
        model.diagnostics.len()
    );
    print_diagnostics(&model.diagnostics);
    Ok(())
}

/// Human-readable summary of one endpoint, as printed by `inspect`.
pub fn describe_endpoint(endpoint: &Endpoint) -> String {
    let mut out = format!(
        "{} -> {} ({} {}, {} -> {})\n",
        endpoint.location(),
        endpoint.handler_name,
        endpoint.kind,
        endpoint.resource,
        endpoint.request_message,
        endpoint.response_message,
    );
    if let Some(key) = &endpoint.key {
        let value = match &key.value {
            KeyValue::Scalar(kind) => kind.to_string(),
            KeyValue::Filter(filter_type) => format!("{filter_type}.eq"),
        };
        out.push_str(&format!("  key {} -> {} ({value})\n", key.param.raw_name, key.field));
    }
    for filter in &endpoint.filters {
        let operators: Vec<&str> = filter.operators.iter().map(|b| b.operator.token()).collect();
        out.push_str(&format!(
            "  filter {}: {} [{}]\n",
            filter.field,
            filter.filter_type,
            operators.join(", ")
        ));
    }
    for scalar in &endpoint.scalars {
        out.push_str(&format!("  param {} -> {}\n", scalar.param, scalar.field));
    }
    if let Some(page_size) = &endpoint.page_size_field {
        out.push_str(&format!("  page size {page_size}\n"));
    }
    for group in &endpoint.required_groups {
        out.push_str(&format!(
            "  required one of {}: {}\n",
            group.name,
            group.members.join(", ")
        ));
    }
    out
}
