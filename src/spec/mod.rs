//! # Endpoint Model Builder
//!
//! Correlates REST operations with the schema model. Every GET operation
//! becomes an [`Endpoint`]: its resource is the first path segment after the
//! base path, a path parameter makes it a Get (otherwise a List), and the
//! request message `List<Resource>Request` / `Get<Resource>Request` decides
//! which flattened parameters resolve.
//!
//! Anything that cannot be resolved is left out and reported as a
//! [`Diagnostic`](crate::diagnostics::Diagnostic); the rest of the model is
//! still built.

mod build;
mod load;
mod types;

pub use build::*;
pub use load::*;
pub use types::*;
