use super::load::{server_base_path, RestDescription};
use super::types::{
    Endpoint, FilterBinding, KeyBinding, KeyValue, OperatorBinding, RequiredGroup, ScalarBinding,
    ValueKind,
};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::filters::{FilterRegistry, Operator};
use crate::naming::to_snake_case;
use crate::params::{flatten_parameter, FlattenContext, Param, ParameterLocation, RawParameter};
use crate::schema::{FieldType, MethodKind, SchemaField, SchemaMessage, SchemaModel};
use http::Method;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Request field conventionally holding the page size.
pub const DEFAULT_PAGE_SIZE_FIELD: &str = "page_size";
/// Request field holding the opaque page token.
pub const PAGE_TOKEN_FIELD: &str = "page_token";
/// Response field receiving the token of the following page.
pub const NEXT_PAGE_TOKEN_FIELD: &str = "next_page_token";

/// Inputs of the endpoint builder besides the two models.
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions<'a> {
    pub registry: &'a FilterRegistry,
    /// Prefix stripped from paths before taking the resource segment.
    /// Falls back to the path of `servers[0].url`.
    pub base_path: Option<&'a str>,
    pub page_size_field: &'a str,
}

impl<'a> BuildOptions<'a> {
    pub fn new(registry: &'a FilterRegistry) -> Self {
        Self {
            registry,
            base_path: None,
            page_size_field: DEFAULT_PAGE_SIZE_FIELD,
        }
    }
}

/// Endpoints sorted by `(resource, kind, path)` plus everything that was skipped.
#[derive(Debug, Clone, Default)]
pub struct EndpointModel {
    pub endpoints: Vec<Endpoint>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Owning resource of a REST path: the first segment after the base path.
///
/// ```
/// use querygen::spec::resource_from_path;
///
/// assert_eq!(resource_from_path("/api/v1/fct_block/{slot}", "/api/v1").as_deref(), Some("fct_block"));
/// assert_eq!(resource_from_path("/fct-block", "").as_deref(), Some("fct_block"));
/// assert_eq!(resource_from_path("/{slot}", ""), None);
/// // The base path only matches whole segments.
/// assert_eq!(resource_from_path("/api/v10/fct_block", "/api/v1").as_deref(), Some("api"));
/// ```
pub fn resource_from_path(path: &str, base_path: &str) -> Option<String> {
    let base = base_path.trim_end_matches('/');
    let rest = match path.strip_prefix(base) {
        Some(rest) if !base.is_empty() && (rest.is_empty() || rest.starts_with('/')) => rest,
        _ => path,
    };
    let segment = rest.trim_start_matches('/').split('/').next()?;
    if segment.is_empty() || segment.starts_with('{') {
        return None;
    }
    let resource = to_snake_case(&segment.replace('-', "_"));
    (!resource.is_empty()).then_some(resource)
}

/// Resolve a local `$ref` (`#/components/parameters/Slot`) inside the document.
pub fn resolve_local_ref<'a>(document: &'a Value, reference: &str) -> Option<&'a Value> {
    document.pointer(reference.strip_prefix('#')?)
}

/// Path-item and operation parameters, operation entries overriding path
/// entries with the same name and location.
pub fn collect_parameters(
    document: &Value,
    path: &str,
    method: &str,
    location: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<RawParameter> {
    let item = document.get("paths").and_then(|paths| paths.get(path));
    let levels = [
        item.and_then(|item| item.get("parameters")),
        item.and_then(|item| item.get(method))
            .and_then(|operation| operation.get("parameters")),
    ];

    let mut out: Vec<RawParameter> = Vec::new();
    for entries in levels.into_iter().flatten() {
        for entry in entries.as_array().into_iter().flatten() {
            let resolved = match entry.get("$ref").and_then(Value::as_str) {
                Some(reference) => match resolve_local_ref(document, reference) {
                    Some(target) => target,
                    None => {
                        diagnostics.push(Diagnostic::warning(
                            location,
                            DiagnosticKind::UnresolvedReference,
                            format!("parameter reference '{reference}' does not resolve"),
                        ));
                        continue;
                    }
                },
                None => entry,
            };
            let raw: RawParameter = match serde_json::from_value(resolved.clone()) {
                Ok(raw) => raw,
                Err(e) => {
                    diagnostics.push(Diagnostic::warning(
                        location,
                        DiagnosticKind::UnresolvedReference,
                        format!("malformed parameter object: {e}"),
                    ));
                    continue;
                }
            };
            out.retain(|existing| !(existing.name == raw.name && existing.location == raw.location));
            out.push(raw);
        }
    }
    out
}

/// Merge the REST description with the schema model.
pub fn build_endpoints(
    description: &RestDescription,
    schema: &SchemaModel,
    options: BuildOptions<'_>,
) -> EndpointModel {
    let base_path = options
        .base_path
        .map(str::to_string)
        .unwrap_or_else(|| server_base_path(&description.spec));
    let mut model = EndpointModel::default();

    if let Some(paths) = description.spec.paths.as_ref() {
        for (path, item) in paths {
            for (method, operation) in item.methods() {
                let location = format!("{method} {path}");
                if method != Method::GET {
                    model.diagnostics.push(Diagnostic::info(
                        &location,
                        DiagnosticKind::UnsupportedMethod,
                        "only GET operations are generated",
                    ));
                    continue;
                }
                let Some(resource) = resource_from_path(path, &base_path) else {
                    model.diagnostics.push(Diagnostic::warning(
                        &location,
                        DiagnosticKind::UnresolvedResource,
                        format!("no resource segment after base path '{base_path}'"),
                    ));
                    continue;
                };

                let raw_params = collect_parameters(
                    &description.document,
                    path,
                    &method.as_str().to_ascii_lowercase(),
                    &location,
                    &mut model.diagnostics,
                );
                let builder = EndpointBuilder {
                    schema,
                    options,
                    location: location.clone(),
                    diagnostics: &mut model.diagnostics,
                };
                if let Some(endpoint) = builder.build(
                    path,
                    method.clone(),
                    operation.operation_id.clone(),
                    resource,
                    &raw_params,
                ) {
                    model.endpoints.push(endpoint);
                }
            }
        }
    }

    model.endpoints.sort_by(|a, b| {
        (&a.resource, a.kind, &a.path).cmp(&(&b.resource, b.kind, &b.path))
    });
    drop_duplicate_handlers(&mut model);
    for diagnostic in &model.diagnostics {
        diagnostic.log();
    }
    info!(
        endpoints = model.endpoints.len(),
        diagnostics = model.diagnostics.len(),
        "Built endpoint model"
    );
    model
}

struct EndpointBuilder<'a> {
    schema: &'a SchemaModel,
    options: BuildOptions<'a>,
    location: String,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl EndpointBuilder<'_> {
    fn warn(&mut self, kind: DiagnosticKind, message: String) {
        self.diagnostics
            .push(Diagnostic::warning(&self.location, kind, message));
    }

    fn build(
        mut self,
        path: &str,
        method: Method,
        operation_id: Option<String>,
        resource: String,
        raw_params: &[RawParameter],
    ) -> Option<Endpoint> {
        let schema = self.schema;
        let registry = self.options.registry;
        let path_params: Vec<&RawParameter> = raw_params
            .iter()
            .filter(|p| p.location == ParameterLocation::Path)
            .collect();
        let kind = if path_params.is_empty() {
            MethodKind::List
        } else {
            MethodKind::Get
        };

        let Some(method_record) = schema.method_for(&resource, kind) else {
            self.warn(
                DiagnosticKind::MissingSchemaMethod,
                format!(
                    "no {kind} method with request '{}' in schema",
                    kind.request_message_name(&resource)
                ),
            );
            return None;
        };
        let (Some(request), Some(response)) = (
            schema.message(&method_record.input),
            schema.message(&method_record.output),
        ) else {
            self.warn(
                DiagnosticKind::MissingSchemaMethod,
                format!(
                    "messages of method '{}' are not in the descriptor set",
                    method_record.name
                ),
            );
            return None;
        };

        let Some(rows) = row_field(response, kind) else {
            self.warn(
                DiagnosticKind::MissingRowMessage,
                format!("response '{}' has no row message field", response.name),
            );
            return None;
        };
        let row_message = rows.message_type().unwrap_or_default().to_string();
        let rows_field = rows.name.clone();
        if schema.message(&row_message).is_none() {
            self.warn(
                DiagnosticKind::MissingRowMessage,
                format!("row message '{row_message}' is not in the descriptor set"),
            );
            return None;
        }

        let descriptions = request.descriptions();
        let ctx = FlattenContext {
            registry,
            descriptions: Some(&descriptions),
            wrappers: &schema.wrappers,
        };

        let mut params = Vec::new();
        let mut filters: BTreeMap<String, FilterBinding> = BTreeMap::new();
        let mut scalars = Vec::new();
        let mut key = None;
        let mut unresolved_groups: BTreeMap<String, Vec<String>> = BTreeMap::new();

        if kind == MethodKind::Get && path_params.len() != 1 {
            self.warn(
                DiagnosticKind::InvalidKeyParam,
                format!("expected one path parameter, found {}", path_params.len()),
            );
            return None;
        }

        for raw in raw_params {
            let param = flatten_parameter(raw, ctx).param;
            let resolved = match param.location {
                ParameterLocation::Path => match self.resolve_key(request, &param) {
                    Some(binding) => {
                        key = Some(binding);
                        true
                    }
                    None => return None,
                },
                ParameterLocation::Query => match param.operator {
                    Some(op) => self.resolve_filter(request, &param, op, &mut filters),
                    None => self.resolve_scalar(request, &param, &mut scalars),
                },
                _ => {
                    debug!(
                        location = %self.location,
                        param = %param.name,
                        "Ignoring {} parameter",
                        param.location
                    );
                    false
                }
            };
            if resolved {
                params.push(param);
            } else if let Some(group) = &param.required_group {
                unresolved_groups
                    .entry(group.clone())
                    .or_default()
                    .push(param.name.clone());
            }
        }

        let required_groups = self.required_groups(request, &params, unresolved_groups);

        let page_size_field = (kind == MethodKind::List)
            .then_some(self.options.page_size_field)
            .filter(|field| request.field(field).is_some())
            .map(str::to_string);
        let page_token_field = (kind == MethodKind::List
            && response.field(NEXT_PAGE_TOKEN_FIELD).is_some()
            && request.field(PAGE_TOKEN_FIELD).is_some()
            && page_size_field.is_some())
        .then(|| PAGE_TOKEN_FIELD.to_string());

        let handler_name = operation_id
            .as_deref()
            .map(|id| to_snake_case(&id.replace(|c: char| !c.is_ascii_alphanumeric(), "_")))
            .unwrap_or_else(|| format!("{}_{}", kind.prefix().to_ascii_lowercase(), resource));

        Some(Endpoint {
            path: path.to_string(),
            method,
            operation_id,
            resource,
            kind,
            handler_name,
            request_message: request.name.clone(),
            response_message: response.name.clone(),
            row_message,
            rows_field,
            page_size_field,
            page_token_field,
            params,
            key,
            filters: filters.into_values().collect(),
            scalars,
            required_groups,
        })
    }

    fn resolve_key(&mut self, request: &SchemaMessage, param: &Param) -> Option<KeyBinding> {
        let Some(field) = request.field(&param.field) else {
            self.warn(
                DiagnosticKind::InvalidKeyParam,
                format!(
                    "path parameter '{}' has no field in '{}'",
                    param.name, request.name
                ),
            );
            return None;
        };
        let value = match (&field.filter_type, field.scalar()) {
            (Some(filter_type), _) => {
                let supports_eq = self
                    .options
                    .registry
                    .get(filter_type)
                    .is_some_and(|descriptor| descriptor.supports(Operator::Eq));
                if !supports_eq {
                    self.warn(
                        DiagnosticKind::InvalidKeyParam,
                        format!("key field '{}' of type '{filter_type}' has no eq operator", field.name),
                    );
                    return None;
                }
                KeyValue::Filter(filter_type.clone())
            }
            (None, Some(scalar)) if !field.is_repeated() => KeyValue::Scalar(scalar),
            _ => {
                self.warn(
                    DiagnosticKind::InvalidKeyParam,
                    format!("key field '{}' is neither a scalar nor a filter", field.name),
                );
                return None;
            }
        };
        Some(KeyBinding {
            param: param.clone(),
            field: field.name.clone(),
            value,
        })
    }

    fn resolve_filter(
        &mut self,
        request: &SchemaMessage,
        param: &Param,
        op: Operator,
        filters: &mut BTreeMap<String, FilterBinding>,
    ) -> bool {
        let Some(field) = request.field(&param.field) else {
            self.warn(
                DiagnosticKind::UnresolvedField,
                format!(
                    "query parameter '{}' targets unknown field '{}' of '{}'",
                    param.name, param.field, request.name
                ),
            );
            return false;
        };
        let Some(filter_type) = &field.filter_type else {
            let (kind, message) = match &field.ty {
                FieldType::Message(name) if name.ends_with("Filter") => (
                    DiagnosticKind::UnknownFilterType,
                    format!("field '{}' uses unknown filter type '{name}'", field.name),
                ),
                _ => (
                    DiagnosticKind::UnsupportedOperator,
                    format!(
                        "query parameter '{}' applies '{op}' to non-filter field '{}'",
                        param.name, field.name
                    ),
                ),
            };
            self.warn(kind, message);
            return false;
        };
        let Some(descriptor) = self.options.registry.get(filter_type) else {
            self.warn(
                DiagnosticKind::UnknownFilterType,
                format!("field '{}' uses unknown filter type '{filter_type}'", field.name),
            );
            return false;
        };
        if !descriptor.supports(op) {
            self.warn(
                DiagnosticKind::UnsupportedOperator,
                format!("'{filter_type}' does not support '{op}' (parameter '{}')", param.name),
            );
            return false;
        }

        let binding = filters
            .entry(field.name.clone())
            .or_insert_with(|| FilterBinding {
                field: field.name.clone(),
                filter_type: filter_type.clone(),
                operators: Vec::new(),
            });
        if binding.param_for(op).is_some() {
            self.warn(
                DiagnosticKind::UnsupportedOperator,
                format!("'{op}' on field '{}' is bound twice, keeping the first", field.name),
            );
            return false;
        }
        binding.operators.push(OperatorBinding {
            operator: op,
            param: param.raw_name.clone(),
        });
        let order = descriptor.operators();
        binding.operators.sort_by_key(|b| order.iter().position(|o| *o == b.operator));
        true
    }

    fn resolve_scalar(
        &mut self,
        request: &SchemaMessage,
        param: &Param,
        scalars: &mut Vec<ScalarBinding>,
    ) -> bool {
        let Some(field) = request.field(&param.field) else {
            self.warn(
                DiagnosticKind::UnresolvedField,
                format!(
                    "query parameter '{}' has no field in '{}'",
                    param.name, request.name
                ),
            );
            return false;
        };
        let value = match (field.wrapper, field.scalar()) {
            (Some(wrapper), _) => ValueKind::Wrapper(wrapper),
            (None, Some(scalar)) => ValueKind::Scalar(scalar),
            _ => {
                self.warn(
                    DiagnosticKind::UnresolvedField,
                    format!(
                        "query parameter '{}' targets field '{}' that is not a plain value",
                        param.name, field.name
                    ),
                );
                return false;
            }
        };
        scalars.push(ScalarBinding {
            field: field.name.clone(),
            param: param.raw_name.clone(),
            value,
            repeated: field.is_repeated(),
        });
        true
    }

    fn required_groups(
        &mut self,
        request: &SchemaMessage,
        params: &[Param],
        unresolved: BTreeMap<String, Vec<String>>,
    ) -> Vec<RequiredGroup> {
        let mut groups: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for param in params {
            if let Some(group) = &param.required_group {
                groups
                    .entry(group.clone())
                    .or_default()
                    .insert(param.raw_name.clone());
            }
        }
        for field in request.fields.iter().filter(|f| f.required_group.is_some()) {
            let Some(group) = &field.required_group else {
                continue;
            };
            let members = groups.entry(group.clone()).or_default();
            members.extend(
                params
                    .iter()
                    .filter(|p| p.field == field.name)
                    .map(|p| p.raw_name.clone()),
            );
        }

        let names: BTreeSet<String> = groups.keys().chain(unresolved.keys()).cloned().collect();
        let mut out = Vec::new();
        for name in names {
            let members = groups.remove(&name).unwrap_or_default();
            if let Some(foreign) = unresolved.get(&name) {
                self.warn(
                    DiagnosticKind::InvalidRequiredGroup,
                    format!(
                        "required group '{name}' dropped: members {} do not belong to '{}'",
                        foreign.join(", "),
                        request.name
                    ),
                );
                continue;
            }
            if members.is_empty() {
                self.warn(
                    DiagnosticKind::InvalidRequiredGroup,
                    format!("required group '{name}' has no members"),
                );
                continue;
            }
            out.push(RequiredGroup {
                name,
                members: members.into_iter().collect(),
            });
        }
        out
    }
}

/// Keep the first endpoint, in model order, for every handler name.
fn drop_duplicate_handlers(model: &mut EndpointModel) {
    let mut seen: BTreeMap<String, String> = BTreeMap::new();
    let diagnostics = &mut model.diagnostics;
    model.endpoints.retain(|endpoint| {
        match seen.get(&endpoint.handler_name) {
            Some(first) => {
                diagnostics.push(Diagnostic::warning(
                    endpoint.location(),
                    DiagnosticKind::DuplicateHandler,
                    format!(
                        "handler '{}' is already generated for {first}",
                        endpoint.handler_name
                    ),
                ));
                false
            }
            None => {
                seen.insert(endpoint.handler_name.clone(), endpoint.location());
                true
            }
        }
    });
}

/// Response field carrying rows: repeated for List, singular for Get.
fn row_field(response: &SchemaMessage, kind: MethodKind) -> Option<&SchemaField> {
    response.fields.iter().find(|field| {
        field.message_type().is_some()
            && field.wrapper.is_none()
            && field.is_repeated() == (kind == MethodKind::List)
    })
}
