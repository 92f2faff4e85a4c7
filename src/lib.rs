//! # querygen
//!
//! **querygen** generates typed query handlers for a read-only data API from
//! two descriptions of the same service: a compiled protobuf schema
//! (descriptor set) and its OpenAPI surface.
//!
//! ## Overview
//!
//! Request messages expose filter-typed fields (`UInt32Filter`,
//! `NullableStringFilter`, ...). The OpenAPI description exposes the same
//! filters as flat query parameters (`slot_eq`, `slot_not_in`). querygen
//! matches the two up and emits Rust code that turns query parameters into a
//! populated request message, runs the resource's query and translates the
//! result rows.
//!
//! ## Architecture
//!
//! - **[`naming`]** - Canonicalization between `snake_case` and `PascalCase`
//! - **[`filters`]** - The filter type registry: operator sets per filter family
//! - **[`params`]** - Parameter flattening (`slot_not_in` → `slot` + `not_in`) and document normalization
//! - **[`schema`]** - Descriptor set extraction through `prost-reflect`
//! - **[`spec`]** - OpenAPI loading and the endpoint model builder
//! - **[`generator`]** - Code synthesis with `syn`/`quote`/`prettyplease`
//! - **[`config`]** - `querygen.toml` generator settings
//! - **[`diagnostics`]** - Non-fatal problems found while merging the inputs
//! - **[`logging`]** - `tracing-subscriber` setup
//! - **[`cli`]** - The `querygen` command line
//!
//! ```text
//! descriptor set ─> schema::SchemaModel ─┐
//!                                        ├─> spec::EndpointModel ─> generator ─> filters.rs, handlers.rs, mod.rs
//! OpenAPI ───────> spec::RestDescription ┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! querygen generate \
//!     --openapi api/openapi.yaml \
//!     --descriptors target/protos.pb \
//!     --output src/generated
//! ```
//!
//! Programmatic use:
//!
//! ```rust,no_run
//! use querygen::config::GeneratorConfig;
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = GeneratorConfig::default();
//! let (generation, report) = querygen::generator::generate(
//!     Path::new("openapi.yaml"),
//!     Path::new("protos.pb"),
//!     Path::new("src/generated"),
//!     &config,
//!     false,
//! )?;
//! println!("{} endpoints, {} files written", generation.model.endpoints.len(), report.written.len());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod filters;
pub mod generator;
pub mod logging;
pub mod naming;
pub mod params;
pub mod schema;
pub mod spec;

pub use config::GeneratorConfig;
pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use filters::{FilterRegistry, FilterTypeDescriptor, Operator, ScalarKind};
pub use spec::{build_endpoints, load_rest_description, Endpoint, EndpointModel};
