use crate::filters::ScalarKind;
use crate::naming::to_pascal_case;
use std::collections::BTreeMap;
use std::fmt;

/// The two method shapes the generator understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MethodKind {
    /// Returns a page of rows and accepts filters
    List,
    /// Returns one row and accepts a single key
    Get,
}

impl MethodKind {
    /// Prefix of request/response message names (`List` in `ListFctBlockRequest`).
    pub fn prefix(self) -> &'static str {
        match self {
            MethodKind::List => "List",
            MethodKind::Get => "Get",
        }
    }

    /// Infer the kind from a method name suffix (`FctBlockList`, `List`).
    pub fn from_method_name(name: &str) -> Option<Self> {
        if name.ends_with("List") {
            Some(MethodKind::List)
        } else if name.ends_with("Get") {
            Some(MethodKind::Get)
        } else {
            None
        }
    }

    /// Request message name for a resource (`List` + `FctBlock` + `Request`).
    pub fn request_message_name(self, resource: &str) -> String {
        format!("{}{}Request", self.prefix(), to_pascal_case(resource))
    }

    /// Split a request message name into its kind and capitalized resource.
    pub fn parse_request_message_name(name: &str) -> Option<(Self, &str)> {
        let stem = name.strip_suffix("Request")?;
        [MethodKind::List, MethodKind::Get]
            .into_iter()
            .find_map(|kind| {
                stem.strip_prefix(kind.prefix())
                    .filter(|resource| !resource.is_empty())
                    .map(|resource| (kind, resource))
            })
    }
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Single-value boxed scalars from `google/protobuf/wrappers.proto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WrapperKind {
    Int32,
    UInt32,
    Int64,
    UInt64,
    Double,
    Float,
    Bool,
    String,
    Bytes,
}

impl WrapperKind {
    const ALL: [WrapperKind; 9] = [
        WrapperKind::Int32,
        WrapperKind::UInt32,
        WrapperKind::Int64,
        WrapperKind::UInt64,
        WrapperKind::Double,
        WrapperKind::Float,
        WrapperKind::Bool,
        WrapperKind::String,
        WrapperKind::Bytes,
    ];

    /// Fully qualified wrapper message name.
    pub fn full_name(self) -> &'static str {
        match self {
            WrapperKind::Int32 => "google.protobuf.Int32Value",
            WrapperKind::UInt32 => "google.protobuf.UInt32Value",
            WrapperKind::Int64 => "google.protobuf.Int64Value",
            WrapperKind::UInt64 => "google.protobuf.UInt64Value",
            WrapperKind::Double => "google.protobuf.DoubleValue",
            WrapperKind::Float => "google.protobuf.FloatValue",
            WrapperKind::Bool => "google.protobuf.BoolValue",
            WrapperKind::String => "google.protobuf.StringValue",
            WrapperKind::Bytes => "google.protobuf.BytesValue",
        }
    }

    pub fn from_full_name(name: &str) -> Option<Self> {
        let name = name.strip_prefix('.').unwrap_or(name);
        WrapperKind::ALL
            .into_iter()
            .find(|kind| kind.full_name() == name)
    }

    /// OpenAPI `(type, format)` of the unwrapped value.
    pub fn openapi_type(self) -> (&'static str, Option<&'static str>) {
        match self {
            WrapperKind::Int32 => ("integer", Some("int32")),
            WrapperKind::UInt32 => ("integer", Some("uint32")),
            WrapperKind::Int64 => ("integer", Some("int64")),
            WrapperKind::UInt64 => ("integer", Some("uint64")),
            WrapperKind::Double => ("number", Some("double")),
            WrapperKind::Float => ("number", Some("float")),
            WrapperKind::Bool => ("boolean", None),
            WrapperKind::String => ("string", None),
            WrapperKind::Bytes => ("string", Some("byte")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLabel {
    Singular,
    Repeated,
}

/// Declared type of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// Protobuf scalar the generator knows how to parse from a query string
    Scalar(ScalarKind),
    /// Any other scalar (`double`, `bytes`, enums, ...), by protobuf name
    Other(String),
    /// Message-typed field, by short message name
    Message(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    pub name: String,
    pub number: u32,
    pub ty: FieldType,
    pub label: FieldLabel,
    /// Registry filter type name when the field's message is a filter
    pub filter_type: Option<String>,
    pub wrapper: Option<WrapperKind>,
    /// Text of a `Filter by <field> - <description>` comment
    pub description: Option<String>,
    /// Value of the declared required-group field option
    pub required_group: Option<String>,
}

impl SchemaField {
    pub fn is_repeated(&self) -> bool {
        self.label == FieldLabel::Repeated
    }

    pub fn scalar(&self) -> Option<ScalarKind> {
        match &self.ty {
            FieldType::Scalar(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Short name of the message type, wrappers and filters included.
    pub fn message_type(&self) -> Option<&str> {
        match &self.ty {
            FieldType::Message(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaMessage {
    pub name: String,
    pub full_name: String,
    /// Fields in declaration order
    pub fields: Vec<SchemaField>,
}

impl SchemaMessage {
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn filter_fields(&self) -> impl Iterator<Item = &SchemaField> {
        self.fields.iter().filter(|field| field.filter_type.is_some())
    }

    /// Documented descriptions keyed by field name.
    pub fn descriptions(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .filter_map(|field| {
                field
                    .description
                    .as_ref()
                    .map(|text| (field.name.clone(), text.clone()))
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaMethod {
    pub name: String,
    pub kind: MethodKind,
    /// Short name of the request message
    pub input: String,
    /// Short name of the response message
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaService {
    pub name: String,
    pub full_name: String,
    pub methods: Vec<SchemaMethod>,
}

/// Everything the generator needs from the compiled schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaModel {
    /// Services sorted by name
    pub services: Vec<SchemaService>,
    /// Messages keyed by short name
    pub messages: BTreeMap<String, SchemaMessage>,
    /// Field name to wrapper kind, collected from request messages
    pub wrappers: BTreeMap<String, WrapperKind>,
}

impl SchemaModel {
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn message(&self, name: &str) -> Option<&SchemaMessage> {
        self.messages.get(name)
    }

    /// The method serving `(resource, kind)`, matched by request message name.
    pub fn method_for(&self, resource: &str, kind: MethodKind) -> Option<&SchemaMethod> {
        let request = kind.request_message_name(resource);
        self.services
            .iter()
            .flat_map(|service| service.methods.iter())
            .find(|method| method.kind == kind && method.input == request)
    }

    pub fn request_message(&self, resource: &str, kind: MethodKind) -> Option<&SchemaMessage> {
        self.method_for(resource, kind)
            .and_then(|method| self.message(&method.input))
    }

    /// Merge another model into this one. Later definitions win on name clashes.
    pub fn merge(&mut self, other: SchemaModel) {
        for service in other.services {
            self.services.retain(|existing| existing.full_name != service.full_name);
            self.services.push(service);
        }
        self.services.sort_by(|a, b| a.name.cmp(&b.name));
        self.messages.extend(other.messages);
        self.wrappers.extend(other.wrappers);
    }

    /// `(message, field) -> filter type` for every request message.
    pub fn filter_fields(&self) -> BTreeMap<(String, String), String> {
        self.messages
            .values()
            .filter(|message| MethodKind::parse_request_message_name(&message.name).is_some())
            .flat_map(|message| {
                message.filter_fields().filter_map(|field| {
                    field
                        .filter_type
                        .as_ref()
                        .map(|ty| ((message.name.clone(), field.name.clone()), ty.clone()))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_kind_from_suffix() {
        assert_eq!(MethodKind::from_method_name("FctBlockList"), Some(MethodKind::List));
        assert_eq!(MethodKind::from_method_name("List"), Some(MethodKind::List));
        assert_eq!(MethodKind::from_method_name("FctBlockGet"), Some(MethodKind::Get));
        assert_eq!(MethodKind::from_method_name("Stream"), None);
    }

    #[test]
    fn test_request_message_names() {
        assert_eq!(
            MethodKind::List.request_message_name("fct_node_active_last_24h"),
            "ListFctNodeActiveLast24HRequest"
        );
        assert_eq!(
            MethodKind::parse_request_message_name("GetFctBlockRequest"),
            Some((MethodKind::Get, "FctBlock"))
        );
        assert_eq!(MethodKind::parse_request_message_name("ListRequest"), None);
        assert_eq!(MethodKind::parse_request_message_name("FctBlock"), None);
    }

    #[test]
    fn test_wrapper_lookup() {
        assert_eq!(
            WrapperKind::from_full_name(".google.protobuf.UInt32Value"),
            Some(WrapperKind::UInt32)
        );
        assert_eq!(WrapperKind::from_full_name("google.protobuf.Timestamp"), None);
        assert_eq!(WrapperKind::Bytes.openapi_type(), ("string", Some("byte")));
    }

    #[test]
    fn test_merge_replaces_services_by_full_name() {
        let service = |methods: usize| SchemaService {
            name: "FctBlockService".to_string(),
            full_name: "cbt.v1.FctBlockService".to_string(),
            methods: (0..methods)
                .map(|i| SchemaMethod {
                    name: format!("M{i}List"),
                    kind: MethodKind::List,
                    input: "ListFctBlockRequest".to_string(),
                    output: "ListFctBlockResponse".to_string(),
                })
                .collect(),
        };
        let mut model = SchemaModel {
            services: vec![service(1)],
            ..SchemaModel::default()
        };
        model.merge(SchemaModel {
            services: vec![service(2)],
            ..SchemaModel::default()
        });
        assert_eq!(model.services.len(), 1);
        assert_eq!(model.services[0].methods.len(), 2);
    }
}
