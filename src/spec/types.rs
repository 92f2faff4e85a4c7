use crate::filters::{Operator, ScalarKind};
use crate::params::Param;
use crate::schema::{MethodKind, WrapperKind};
use http::Method;

/// Alternative parameters where supplying any one satisfies the requirement.
///
/// Never empty. Every member is a resolved parameter of the owning endpoint,
/// so all of them target fields of the same request message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredGroup {
    pub name: String,
    /// Parameter names, sorted
    pub members: Vec<String>,
}

/// One operator position of a filter constructor call fed by a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorBinding {
    pub operator: Operator,
    /// Query parameter supplying the value
    pub param: String,
}

/// A request field built through a filter constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterBinding {
    /// Request message field
    pub field: String,
    /// Registry filter type name (`UInt32Filter`)
    pub filter_type: String,
    /// Bound operators in registry order
    pub operators: Vec<OperatorBinding>,
}

impl FilterBinding {
    pub fn param_for(&self, operator: Operator) -> Option<&str> {
        self.operators
            .iter()
            .find(|binding| binding.operator == operator)
            .map(|binding| binding.param.as_str())
    }
}

/// How a plain value is represented in the request message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Scalar(ScalarKind),
    /// `google.protobuf.*Value`, an `Option<T>` in prost
    Wrapper(WrapperKind),
}

/// A request field assigned straight from one query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarBinding {
    pub field: String,
    pub param: String,
    pub value: ValueKind,
    pub repeated: bool,
}

/// How the Get key reaches the request message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyValue {
    /// Plain scalar field
    Scalar(ScalarKind),
    /// Filter-typed field, built with only its `eq` position set
    Filter(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    pub param: Param,
    pub field: String,
    pub value: KeyValue,
}

/// Everything needed to synthesize one handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub path: String,
    pub method: Method,
    pub operation_id: Option<String>,
    /// Delimited resource name (`fct_block`)
    pub resource: String,
    pub kind: MethodKind,
    pub handler_name: String,
    pub request_message: String,
    pub response_message: String,
    /// Message each result row is translated into
    pub row_message: String,
    /// Response field carrying the rows (List) or the single row (Get)
    pub rows_field: String,
    /// Request page size field, defaulted when the caller leaves it unset
    pub page_size_field: Option<String>,
    /// Request page token field, when the response carries `next_page_token`
    pub page_token_field: Option<String>,
    /// Resolved parameters in declaration order
    pub params: Vec<Param>,
    /// Path parameter of a Get endpoint
    pub key: Option<KeyBinding>,
    pub filters: Vec<FilterBinding>,
    pub scalars: Vec<ScalarBinding>,
    pub required_groups: Vec<RequiredGroup>,
}

impl Endpoint {
    /// `GET /fct_block/{slot}`, used to locate diagnostics.
    pub fn location(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    pub fn filter_types(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().map(|binding| binding.filter_type.as_str())
    }
}
