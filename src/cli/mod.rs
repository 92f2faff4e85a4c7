//! # CLI Module
//!
//! Command-line surface of the `querygen` binary.
//!
//! ## Commands
//!
//! ### `generate`
//!
//! ```bash
//! querygen generate --openapi openapi.yaml --descriptors protos.pb --output src/generated
//! ```
//!
//! Options:
//! - `--openapi <FILE>` - OpenAPI description (required)
//! - `--descriptors <PATH>` - Descriptor set file or directory (required)
//! - `--output <DIR>` - Directory receiving `filters.rs`, `handlers.rs`, `mod.rs` (required)
//! - `--base-path <PATH>` - Prefix stripped before taking the resource segment
//! - `--config <FILE>` - Generator config, default `querygen.toml` next to the OpenAPI file
//! - `--dry-run` - Report what would change without writing
//!
//! ### `normalize`
//!
//! Writes the flattened form of an OpenAPI description. `--check` fails
//! instead when the document would change.
//!
//! ### `inspect`
//!
//! Prints the endpoint model and diagnostics.
//!
//! Missing or unreadable inputs exit non-zero with the error on stderr and
//! nothing written.

mod commands;


pub use commands::{describe_endpoint, run_cli, Cli, Commands, InputArgs};
