//! # Parameter Flattener
//!
//! Turns REST-facing parameter names into `(field, operator)` pairs and
//! normalizes their declared shape.
//!
//! REST descriptions expose filters as flat query parameters:
//!
//! ```text
//! slot_eq=100            → field "slot", operator eq
//! slot_not_in=1,2,3      → field "slot", operator not_in (comma-separated list)
//! slotStartDateTime.gte  → normalized to slot_start_date_time_gte
//! page_size=50           → field "page_size", no operator
//! ```
//!
//! Two layers live here:
//!
//! - [`flatten`] works on one parameter: name normalization, suffix matching
//!   with three/two/one-token precedence, descriptions and list coercion.
//! - [`normalize`] applies the same rules to a whole OpenAPI document so the
//!   normalized document can be written back out (`querygen normalize`).

pub mod flatten;
pub mod normalize;

pub use flatten::*;
pub use normalize::{normalize_document, NormalizeReport};

use crate::filters::Operator;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Where a parameter is carried in the HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterLocation::Path => write!(f, "Path"),
            ParameterLocation::Query => write!(f, "Query"),
            ParameterLocation::Header => write!(f, "Header"),
            ParameterLocation::Cookie => write!(f, "Cookie"),
        }
    }
}

/// A parameter object exactly as it appears in the REST description.
///
/// Unknown keys are preserved in `extra` so a normalized document keeps
/// everything the author wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawParameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub schema: Value,
    /// Alternative-satisfies-requirement group (`x-required-group`)
    #[serde(
        rename = "x-required-group",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub required_group: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Element type of a list-shaped parameter, used to pick its validation pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListElement {
    Unsigned,
    Signed,
    Float,
    String,
}

/// Declared REST type of a parameter after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamType {
    /// OpenAPI `type` (`integer`, `string`, ...)
    pub ty: String,
    /// OpenAPI `format` (`uint32`, `int64`, ...)
    pub format: Option<String>,
    /// Validation pattern for comma-separated lists
    pub pattern: Option<String>,
    /// Element type when the parameter was coerced from an array
    pub list_element: Option<ListElement>,
}

impl ParamType {
    pub fn from_schema(schema: &Value) -> Self {
        ParamType {
            ty: schema
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("string")
                .to_string(),
            format: schema
                .get("format")
                .and_then(Value::as_str)
                .map(str::to_string),
            pattern: schema
                .get("pattern")
                .and_then(Value::as_str)
                .map(str::to_string),
            list_element: None,
        }
    }
}

/// One REST parameter after flattening. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Name as written in the REST description
    pub raw_name: String,
    /// Delimited name (`slot_start_date_time_gte`)
    pub name: String,
    /// Schema field the parameter targets
    pub field: String,
    /// Filter operator, `None` for plain parameters such as pagination
    pub operator: Option<Operator>,
    pub location: ParameterLocation,
    pub required: bool,
    pub value_type: ParamType,
    pub description: Option<String>,
    pub required_group: Option<String>,
}
