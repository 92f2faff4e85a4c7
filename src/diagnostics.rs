//! # Diagnostics
//!
//! Non-fatal findings collected while building the endpoint model. A
//! diagnostic never stops generation: the offending parameter, group or
//! operation is left out and the rest of the model is still produced.
//!
//! ```
//! use querygen::diagnostics::{Diagnostic, DiagnosticKind, Severity};
//!
//! let diagnostic = Diagnostic::warning(
//!     "GET /fct_block",
//!     DiagnosticKind::UnresolvedField,
//!     "query parameter 'slott_eq' targets unknown field 'slott'",
//! );
//! assert_eq!(diagnostic.severity, Severity::Warning);
//! ```

use std::fmt;
use tracing::{info, warn};

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Something was skipped
    Warning,
    /// Informational only
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticKind {
    /// A filter parameter names a field missing from the request message
    UnresolvedField,
    /// A request field uses a filter message unknown to the registry
    UnknownFilterType,
    /// The operator is not legal for the field's filter type
    UnsupportedOperator,
    /// No List/Get method in the schema serves the operation's resource
    MissingSchemaMethod,
    /// The path does not yield a resource name
    UnresolvedResource,
    /// A required group is empty or spans several messages
    InvalidRequiredGroup,
    /// A Get operation without exactly one path parameter
    InvalidKeyParam,
    /// The response message carries no row message field
    MissingRowMessage,
    /// A `$ref` that does not resolve
    UnresolvedReference,
    /// Two operations map to the same handler function name
    DuplicateHandler,
    /// An operation whose HTTP method has no generated handler
    UnsupportedMethod,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticKind::UnresolvedField => "unresolved_field",
            DiagnosticKind::UnknownFilterType => "unknown_filter_type",
            DiagnosticKind::UnsupportedOperator => "unsupported_operator",
            DiagnosticKind::MissingSchemaMethod => "missing_schema_method",
            DiagnosticKind::UnresolvedResource => "unresolved_resource",
            DiagnosticKind::InvalidRequiredGroup => "invalid_required_group",
            DiagnosticKind::InvalidKeyParam => "invalid_key_param",
            DiagnosticKind::MissingRowMessage => "missing_row_message",
            DiagnosticKind::UnresolvedReference => "unresolved_reference",
            DiagnosticKind::DuplicateHandler => "duplicate_handler",
            DiagnosticKind::UnsupportedMethod => "unsupported_method",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finding raised while merging the REST description with the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Where it occurred (`GET /fct_block/{slot}`)
    pub location: String,
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// Human-readable description of the problem
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        location: impl Into<String>,
        severity: Severity,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) -> Self {
        Diagnostic {
            location: location.into(),
            severity,
            kind,
            message: message.into(),
        }
    }

    pub fn warning(
        location: impl Into<String>,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) -> Self {
        Self::new(location, Severity::Warning, kind, message)
    }

    pub fn info(
        location: impl Into<String>,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) -> Self {
        Self::new(location, Severity::Info, kind, message)
    }

    /// Emit this diagnostic through `tracing`.
    pub fn log(&self) {
        match self.severity {
            Severity::Warning => warn!(
                location = %self.location,
                kind = %self.kind,
                "{}",
                self.message
            ),
            Severity::Info => info!(
                location = %self.location,
                kind = %self.kind,
                "{}",
                self.message
            ),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            self.severity, self.location, self.message, self.kind
        )
    }
}

/// Print diagnostics the way the CLI reports them.
pub fn print_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    let warnings = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .count();
    eprintln!("\n{} diagnostic(s), {} warning(s):", diagnostics.len(), warnings);
    for diagnostic in diagnostics {
        eprintln!("  {diagnostic}");
    }
}
