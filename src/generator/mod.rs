//! # Generator Module
//!
//! The code synthesizer. Takes the endpoint model and the schema model and
//! renders the Rust source a service compiles against its prost messages.
//!
//! ## Generated Structure
//!
//! ```text
//! <output>/
//! ├── mod.rs       # declares the two modules below
//! ├── filters.rs   # one build_<family>_filter constructor per referenced filter family
//! └── handlers.rs  # one handler per endpoint plus row translators
//! ```
//!
//! ## Architecture
//!
//! ```text
//! descriptor set ─┐
//!                 ├─> SchemaModel + EndpointModel ─> syn AST (quote!) ─> prettyplease ─> files
//! OpenAPI spec ───┘
//! ```
//!
//! Every file is built as a token stream, parsed into a `syn::File` and
//! printed once. Rendering happens fully in memory before anything is
//! written, and iteration only ever walks sorted collections, so the same
//! inputs produce the same bytes.
//!
//! ## Usage
//!
//! ```bash
//! querygen generate \
//!     --openapi openapi.yaml \
//!     --descriptors protos.pb \
//!     --output src/generated
//! ```
//!
//! The generated code expects three modules, configurable through
//! [`GeneratorConfig`]:
//!
//! - `pb`: prost messages. Filter oneofs live in `<snake(name)>::Filter`.
//! - `runtime`: `QueryParams` (`parse`, `parse_list`, `path`, `require_any`),
//!   `Connection` (`query_rows`, `query_row`), `Row::get`, `HandlerError`
//!   (`not_found`) and `next_page_token`.
//! - `queries`: `build_list_<resource>_query` and `build_get_<resource>_query`.

mod filters;
mod handlers;
mod output;
mod render;

pub use filters::{filter_constructor, render_filters};
pub use handlers::{referenced_filters, translator_name, HandlerRenderer};
pub use output::{render_files, write_atomic, write_files, GeneratedFile, WriteReport};
pub use render::{format_rust, ident, RenderContext, GENERATED_BANNER};

use crate::config::GeneratorConfig;
use crate::filters::FilterRegistry;
use crate::schema::{load_schema, SchemaModel, SchemaOptions};
use crate::spec::{build_endpoints, load_rest_description, BuildOptions, EndpointModel, RestDescription};
use anyhow::Context;
use std::path::Path;
use tracing::info;

/// Endpoint model plus the files rendered from it.
#[derive(Debug, Clone)]
pub struct Generation {
    pub model: EndpointModel,
    pub files: Vec<GeneratedFile>,
}

/// Read both inputs. Either failing is fatal.
pub fn load_inputs(
    openapi: &Path,
    descriptors: &Path,
    registry: &FilterRegistry,
    config: &GeneratorConfig,
) -> anyhow::Result<(RestDescription, SchemaModel)> {
    let description = load_rest_description(openapi)?;
    let options = SchemaOptions {
        registry,
        required_group_extension: &config.required_group_extension,
    };
    let schema = load_schema(descriptors, options)
        .with_context(|| format!("failed to load descriptors from {}", descriptors.display()))?;
    Ok((description, schema))
}

/// Merge the inputs into endpoints.
pub fn endpoint_model(
    description: &RestDescription,
    schema: &SchemaModel,
    registry: &FilterRegistry,
    config: &GeneratorConfig,
) -> EndpointModel {
    let options = BuildOptions {
        registry,
        base_path: config.base_path.as_deref(),
        page_size_field: &config.page_size_param,
    };
    build_endpoints(description, schema, options)
}

/// Build the endpoint model and render every file, without touching disk.
pub fn plan(
    description: &RestDescription,
    schema: &SchemaModel,
    registry: &FilterRegistry,
    config: &GeneratorConfig,
) -> anyhow::Result<Generation> {
    let ctx = RenderContext::from_config(config)?;
    let model = endpoint_model(description, schema, registry, config);
    let files = render_files(&model.endpoints, schema, registry, &ctx)?;
    Ok(Generation { model, files })
}

/// Run the whole pipeline: read inputs, render, then commit to `output`.
pub fn generate(
    openapi: &Path,
    descriptors: &Path,
    output: &Path,
    config: &GeneratorConfig,
    dry_run: bool,
) -> anyhow::Result<(Generation, WriteReport)> {
    let registry = FilterRegistry::standard();
    let (description, schema) = load_inputs(openapi, descriptors, &registry, config)?;
    let generation = plan(&description, &schema, &registry, config)?;
    let report = write_files(output, &generation.files, dry_run)?;
    info!(
        endpoints = generation.model.endpoints.len(),
        written = report.written.len(),
        unchanged = report.unchanged.len(),
        dry_run,
        "Generation complete"
    );
    Ok((generation, report))
}
