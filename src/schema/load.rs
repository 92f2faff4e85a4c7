use super::comments::field_description;
use super::types::{
    FieldLabel, FieldType, MethodKind, SchemaField, SchemaMessage, SchemaMethod, SchemaModel,
    SchemaService, WrapperKind,
};
use crate::filters::{FilterRegistry, ScalarKind};
use prost_reflect::{
    DescriptorPool, ExtensionDescriptor, FieldDescriptor, Kind, MessageDescriptor, Value,
};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Field option marking a request field as member of a required group.
pub const DEFAULT_REQUIRED_GROUP_EXTENSION: &str = "querygen.v1.required_group";

/// File extensions recognized as descriptor sets when loading a directory.
pub const DESCRIPTOR_SET_EXTENSIONS: &[&str] = &["pb", "bin", "desc"];

const WELL_KNOWN_PACKAGE: &str = "google.protobuf";

/// Failure to read or decode a descriptor set.
#[derive(Debug)]
pub enum SchemaError {
    /// The file or directory could not be read
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The bytes are not a valid `FileDescriptorSet`
    Decode { path: PathBuf, message: String },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::Read { path, source } => {
                write!(f, "failed to read schema '{}': {}", path.display(), source)
            }
            SchemaError::Decode { path, message } => {
                write!(
                    f,
                    "failed to decode descriptor set '{}': {}",
                    path.display(),
                    message
                )
            }
        }
    }
}

impl std::error::Error for SchemaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SchemaError::Read { source, .. } => Some(source),
            SchemaError::Decode { .. } => None,
        }
    }
}

/// Knobs the extractor needs besides the bytes themselves.
#[derive(Debug, Clone, Copy)]
pub struct SchemaOptions<'a> {
    pub registry: &'a FilterRegistry,
    /// Fully qualified name of the required-group field option
    pub required_group_extension: &'a str,
}

impl<'a> SchemaOptions<'a> {
    pub fn new(registry: &'a FilterRegistry) -> Self {
        Self {
            registry,
            required_group_extension: DEFAULT_REQUIRED_GROUP_EXTENSION,
        }
    }
}

impl SchemaModel {
    /// Decode a serialized `FileDescriptorSet`.
    pub fn from_bytes(
        bytes: &[u8],
        options: SchemaOptions<'_>,
    ) -> Result<Self, prost_reflect::DescriptorError> {
        let pool = DescriptorPool::decode(bytes)?;
        Ok(Self::from_pool(&pool, options))
    }

    /// Build the model from an already decoded pool.
    ///
    /// A pool without services yields an empty model.
    pub fn from_pool(pool: &DescriptorPool, options: SchemaOptions<'_>) -> Self {
        let mut model = SchemaModel::default();
        if pool.services().next().is_none() {
            return model;
        }

        let required_group = pool.get_extension_by_name(options.required_group_extension);
        if required_group.is_none() {
            debug!(
                extension = options.required_group_extension,
                "Required-group extension not declared in descriptor set"
            );
        }

        for service in pool.services() {
            let mut methods = Vec::new();
            for method in service.methods() {
                let Some(kind) = MethodKind::from_method_name(method.name()) else {
                    debug!(
                        service = service.name(),
                        method = method.name(),
                        "Ignoring method that is neither List nor Get"
                    );
                    continue;
                };
                methods.push(SchemaMethod {
                    name: method.name().to_string(),
                    kind,
                    input: method.input().name().to_string(),
                    output: method.output().name().to_string(),
                });
            }
            model.services.push(SchemaService {
                name: service.name().to_string(),
                full_name: service.full_name().to_string(),
                methods,
            });
        }
        model.services.sort_by(|a, b| a.name.cmp(&b.name));

        for message in pool.all_messages() {
            if message.package_name() == WELL_KNOWN_PACKAGE || message.is_map_entry() {
                continue;
            }
            let extracted = extract_message(&message, options.registry, required_group.as_ref());
            if MethodKind::parse_request_message_name(&extracted.name).is_some() {
                for field in &extracted.fields {
                    if let Some(wrapper) = field.wrapper {
                        model.wrappers.insert(field.name.clone(), wrapper);
                    }
                }
            }
            if let Some(previous) = model.messages.insert(extracted.name.clone(), extracted) {
                warn!(
                    message = %previous.full_name,
                    "Message short name defined twice, keeping the later definition"
                );
            }
        }

        model
    }
}

fn extract_message(
    message: &MessageDescriptor,
    registry: &FilterRegistry,
    required_group: Option<&ExtensionDescriptor>,
) -> SchemaMessage {
    let is_request = MethodKind::parse_request_message_name(message.name()).is_some();
    let fields = message
        .fields()
        .map(|field| extract_field(&field, is_request, registry, required_group))
        .collect();
    SchemaMessage {
        name: message.name().to_string(),
        full_name: message.full_name().to_string(),
        fields,
    }
}

fn extract_field(
    field: &FieldDescriptor,
    is_request: bool,
    registry: &FilterRegistry,
    required_group: Option<&ExtensionDescriptor>,
) -> SchemaField {
    let (ty, wrapper) = match field.kind() {
        _ if field.is_map() => (FieldType::Other("map".to_string()), None),
        Kind::Message(message) => (
            FieldType::Message(message.name().to_string()),
            WrapperKind::from_full_name(message.full_name()),
        ),
        kind => (scalar_type(&kind), None),
    };

    let filter_type = match &ty {
        FieldType::Message(name) if is_request && registry.contains(name) => Some(name.clone()),
        _ => None,
    };

    let label = if field.is_list() {
        FieldLabel::Repeated
    } else {
        FieldLabel::Singular
    };

    SchemaField {
        name: field.name().to_string(),
        number: field.number(),
        ty,
        label,
        filter_type,
        wrapper,
        description: if is_request {
            field_description(field)
        } else {
            None
        },
        required_group: required_group.and_then(|ext| read_required_group(field, ext)),
    }
}

fn scalar_type(kind: &Kind) -> FieldType {
    match kind {
        Kind::Uint32 | Kind::Fixed32 => FieldType::Scalar(ScalarKind::UInt32),
        Kind::Uint64 | Kind::Fixed64 => FieldType::Scalar(ScalarKind::UInt64),
        Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => FieldType::Scalar(ScalarKind::Int32),
        Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => FieldType::Scalar(ScalarKind::Int64),
        Kind::String => FieldType::Scalar(ScalarKind::String),
        Kind::Bool => FieldType::Scalar(ScalarKind::Bool),
        Kind::Double => FieldType::Other("double".to_string()),
        Kind::Float => FieldType::Other("float".to_string()),
        Kind::Bytes => FieldType::Other("bytes".to_string()),
        Kind::Enum(e) => FieldType::Other(e.name().to_string()),
        Kind::Message(m) => FieldType::Message(m.name().to_string()),
    }
}

fn read_required_group(field: &FieldDescriptor, ext: &ExtensionDescriptor) -> Option<String> {
    let options = field.options();
    if !options.has_extension(ext) {
        return None;
    }
    match options.get_extension(ext).as_ref() {
        Value::String(group) if !group.is_empty() => Some(group.clone()),
        _ => None,
    }
}

/// Read and decode one descriptor set file.
pub fn load_descriptor_set(
    path: &Path,
    options: SchemaOptions<'_>,
) -> Result<SchemaModel, SchemaError> {
    let bytes = std::fs::read(path).map_err(|source| SchemaError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let model = SchemaModel::from_bytes(&bytes, options).map_err(|e| SchemaError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    if model.is_empty() {
        info!(path = %path.display(), "No services in descriptor set, skipping");
    } else {
        debug!(
            path = %path.display(),
            services = model.services.len(),
            messages = model.messages.len(),
            "Loaded descriptor set"
        );
    }
    Ok(model)
}

/// Merge every descriptor set in `dir`, in sorted path order.
pub fn load_schema_dir(dir: &Path, options: SchemaOptions<'_>) -> Result<SchemaModel, SchemaError> {
    let read_err = |source| SchemaError::Read {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        let is_descriptor_set = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| DESCRIPTOR_SET_EXTENSIONS.contains(&ext));
        if path.is_file() && is_descriptor_set {
            files.push(path);
        }
    }
    files.sort();

    if files.is_empty() {
        warn!(dir = %dir.display(), "No descriptor sets found in schema directory");
    }

    let mut model = SchemaModel::default();
    for file in files {
        model.merge(load_descriptor_set(&file, options)?);
    }
    Ok(model)
}

/// Load a descriptor set file, or every descriptor set in a directory.
pub fn load_schema(path: &Path, options: SchemaOptions<'_>) -> Result<SchemaModel, SchemaError> {
    if path.is_dir() {
        load_schema_dir(path, options)
    } else {
        load_descriptor_set(path, options)
    }
}
