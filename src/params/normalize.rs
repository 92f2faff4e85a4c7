//! Document-level normalization of a REST description.
//!
//! Applies the flattener to every parameter of every operation, renames
//! component schemas through the digit-boundary fixup and rewrites the
//! `$ref`s pointing at them. The result is what `querygen normalize` writes.

use super::flatten::{flatten_parameter, FlattenContext};
use super::{ParameterLocation, RawParameter};
use crate::filters::FilterRegistry;
use crate::naming::{to_pascal_case, to_snake_case};
use crate::schema::{MethodKind, SchemaModel};
use crate::spec::{base_path_from_url, resource_from_path};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

const METHODS: [&str; 8] = ["get", "post", "put", "delete", "patch", "options", "head", "trace"];
const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// What a normalization pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Parameters whose name changed
    pub renamed_params: usize,
    /// Array parameters coerced to comma-separated strings
    pub coerced_lists: usize,
    /// Component schemas renamed, old name to new name
    pub renamed_schemas: BTreeMap<String, String>,
}

impl NormalizeReport {
    pub fn is_unchanged(&self) -> bool {
        self.renamed_params == 0 && self.coerced_lists == 0 && self.renamed_schemas.is_empty()
    }
}

/// Normalize `document` in place.
///
/// `base_path` overrides the path of `servers[0].url` when deriving the
/// resource that owns each operation.
pub fn normalize_document(
    document: &mut Value,
    schema: &SchemaModel,
    registry: &FilterRegistry,
    base_path: Option<&str>,
) -> NormalizeReport {
    let base_path = base_path.map(str::to_string).unwrap_or_else(|| {
        document
            .pointer("/servers/0/url")
            .and_then(Value::as_str)
            .map(base_path_from_url)
            .unwrap_or_default()
    });

    let mut report = NormalizeReport::default();
    let no_descriptions = BTreeMap::new();

    if let Some(Value::Object(paths)) = document.get_mut("paths") {
        for (path, item) in paths.iter_mut() {
            let Some(item) = item.as_object_mut() else {
                continue;
            };
            let resource = resource_from_path(path, &base_path);
            let path_level_has_key = has_path_param(item.get("parameters"));

            for method in METHODS {
                let Some(operation) = item.get_mut(method).and_then(Value::as_object_mut) else {
                    continue;
                };
                let kind = if path_level_has_key || has_path_param(operation.get("parameters")) {
                    MethodKind::Get
                } else {
                    MethodKind::List
                };
                let descriptions = resource
                    .as_deref()
                    .and_then(|r| schema.request_message(r, kind))
                    .map(|message| message.descriptions())
                    .unwrap_or_default();
                let ctx = FlattenContext {
                    registry,
                    descriptions: Some(&descriptions),
                    wrappers: &schema.wrappers,
                };
                normalize_parameter_list(operation.get_mut("parameters"), ctx, &mut report);
            }

            let ctx = FlattenContext {
                registry,
                descriptions: Some(&no_descriptions),
                wrappers: &schema.wrappers,
            };
            normalize_parameter_list(item.get_mut("parameters"), ctx, &mut report);
        }
    }

    if let Some(Value::Object(parameters)) = document.pointer_mut("/components/parameters") {
        let ctx = FlattenContext {
            registry,
            descriptions: None,
            wrappers: &schema.wrappers,
        };
        for parameter in parameters.values_mut() {
            normalize_parameter(parameter, ctx, &mut report);
        }
    }

    rename_component_schemas(document, &mut report);
    report
}

fn has_path_param(parameters: Option<&Value>) -> bool {
    parameters
        .and_then(Value::as_array)
        .is_some_and(|list| list.iter().any(|p| p.get("in").and_then(Value::as_str) == Some("path")))
}

fn normalize_parameter_list(
    parameters: Option<&mut Value>,
    ctx: FlattenContext<'_>,
    report: &mut NormalizeReport,
) {
    let Some(Value::Array(list)) = parameters else {
        return;
    };
    for parameter in list.iter_mut() {
        normalize_parameter(parameter, ctx, report);
    }
}

fn normalize_parameter(parameter: &mut Value, ctx: FlattenContext<'_>, report: &mut NormalizeReport) {
    if parameter.get("$ref").is_some() {
        return;
    }
    let mut raw: RawParameter = match serde_json::from_value(parameter.clone()) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "Leaving malformed parameter object untouched");
            return;
        }
    };
    let was_array = raw.schema.get("type").and_then(Value::as_str) == Some("array");

    let flattened = flatten_parameter(&raw, ctx);
    if flattened.param.name != raw.name {
        debug!(from = %raw.name, to = %flattened.param.name, "Renamed parameter");
        report.renamed_params += 1;
    }
    if was_array && flattened.param.value_type.list_element.is_some() {
        report.coerced_lists += 1;
    }

    raw.name = flattened.param.name;
    if raw.location == ParameterLocation::Query || raw.description.is_none() {
        raw.description = flattened.param.description.or(raw.description);
    }
    if !flattened.schema.is_null() {
        raw.schema = flattened.schema;
    }

    match serde_json::to_value(&raw) {
        Ok(value) => *parameter = value,
        Err(e) => warn!(error = %e, "Failed to serialize normalized parameter"),
    }
}

fn rename_component_schemas(document: &mut Value, report: &mut NormalizeReport) {
    let Some(Value::Object(schemas)) = document.pointer_mut("/components/schemas") else {
        return;
    };

    let names: Vec<String> = schemas.keys().cloned().collect();
    for name in names {
        let fixed = to_pascal_case(&to_snake_case(&name));
        if fixed.is_empty() || fixed == name {
            continue;
        }
        if schemas.contains_key(&fixed) {
            warn!(from = %name, to = %fixed, "Schema rename target already exists, keeping original");
            continue;
        }
        if let Some(body) = schemas.remove(&name) {
            schemas.insert(fixed.clone(), body);
            report.renamed_schemas.insert(name, fixed);
        }
    }

    if !report.renamed_schemas.is_empty() {
        sort_object(schemas);
        rewrite_refs(document, &report.renamed_schemas);
    }
}

fn sort_object(object: &mut Map<String, Value>) {
    let mut entries: Vec<(String, Value)> = std::mem::take(object).into_iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    object.extend(entries);
}

fn rewrite_refs(value: &mut Value, renames: &BTreeMap<String, String>) {
    match value {
        Value::Object(obj) => {
            if let Some(Value::String(reference)) = obj.get_mut("$ref") {
                if let Some(target) = reference
                    .strip_prefix(SCHEMA_REF_PREFIX)
                    .and_then(|name| renames.get(name))
                {
                    *reference = format!("{SCHEMA_REF_PREFIX}{target}");
                }
            }
            for v in obj.values_mut() {
                rewrite_refs(v, renames);
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                rewrite_refs(v, renames);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        FieldLabel, FieldType, SchemaField, SchemaMessage, SchemaMethod, SchemaService,
        WrapperKind,
    };
    use serde_json::json;

    fn schema() -> SchemaModel {
        let field = |name: &str, ty: FieldType, description: Option<&str>| SchemaField {
            name: name.to_string(),
            number: 1,
            ty,
            label: FieldLabel::Singular,
            filter_type: None,
            wrapper: None,
            description: description.map(str::to_string),
            required_group: None,
        };
        let mut slot = field(
            "slot",
            FieldType::Message("UInt32Filter".to_string()),
            Some("The slot number"),
        );
        slot.filter_type = Some("UInt32Filter".to_string());
        let mut epoch = field("epoch", FieldType::Message("UInt32Value".to_string()), None);
        epoch.wrapper = Some(WrapperKind::UInt32);

        let mut model = SchemaModel::default();
        model.services.push(SchemaService {
            name: "FctBlockService".to_string(),
            full_name: "cbt.FctBlockService".to_string(),
            methods: vec![SchemaMethod {
                name: "List".to_string(),
                kind: MethodKind::List,
                input: "ListFctBlockRequest".to_string(),
                output: "ListFctBlockResponse".to_string(),
            }],
        });
        model.messages.insert(
            "ListFctBlockRequest".to_string(),
            SchemaMessage {
                name: "ListFctBlockRequest".to_string(),
                full_name: "cbt.ListFctBlockRequest".to_string(),
                fields: vec![slot, epoch],
            },
        );
        model.wrappers.insert("epoch".to_string(), WrapperKind::UInt32);
        model
    }

    fn document() -> Value {
        json!({
            "openapi": "3.1.0",
            "info": { "title": "cbt", "version": "1" },
            "servers": [{ "url": "/api/v1" }],
            "paths": {
                "/api/v1/fct_block": {
                    "get": {
                        "operationId": "FctBlockService_List",
                        "parameters": [
                            { "name": "slot.eq", "in": "query", "schema": { "type": "integer" } },
                            {
                                "name": "slot.notIn",
                                "in": "query",
                                "schema": { "type": "array", "items": { "type": "integer", "format": "uint32" } }
                            },
                            { "name": "epoch", "in": "query", "schema": { "type": "string" } },
                            { "$ref": "#/components/parameters/PageSize" }
                        ],
                        "responses": {
                            "200": {
                                "description": "ok",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/FctNodeActiveLast24h" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "parameters": {
                    "PageSize": { "name": "pageSize", "in": "query", "schema": { "type": "integer" } }
                },
                "schemas": {
                    "FctNodeActiveLast24h": { "type": "object" }
                }
            }
        })
    }

    #[test]
    fn test_parameters_are_flattened() {
        let registry = FilterRegistry::standard();
        let mut doc = document();
        let report = normalize_document(&mut doc, &schema(), &registry, None);

        let params = &doc["paths"]["/api/v1/fct_block"]["get"]["parameters"];
        assert_eq!(params[0]["name"], "slot_eq");
        assert_eq!(params[0]["description"], "The slot number (filter: eq)");
        assert_eq!(params[1]["name"], "slot_not_in");
        assert_eq!(params[1]["schema"]["type"], "string");
        assert_eq!(
            params[1]["description"],
            "The slot number (filter: not_in) (comma-separated list)"
        );
        assert_eq!(params[2]["schema"]["type"], "integer");
        assert_eq!(params[2]["schema"]["format"], "uint32");
        assert_eq!(params[3]["$ref"], "#/components/parameters/PageSize");
        assert_eq!(doc["components"]["parameters"]["PageSize"]["name"], "page_size");

        assert_eq!(report.renamed_params, 3);
        assert_eq!(report.coerced_lists, 1);
    }

    #[test]
    fn test_schema_names_get_digit_fixup() {
        let registry = FilterRegistry::standard();
        let mut doc = document();
        let report = normalize_document(&mut doc, &schema(), &registry, None);

        assert_eq!(
            report.renamed_schemas.get("FctNodeActiveLast24h").map(String::as_str),
            Some("FctNodeActiveLast24H")
        );
        assert!(doc["components"]["schemas"].get("FctNodeActiveLast24H").is_some());
        assert_eq!(
            doc["paths"]["/api/v1/fct_block"]["get"]["responses"]["200"]["content"]
                ["application/json"]["schema"]["$ref"],
            "#/components/schemas/FctNodeActiveLast24H"
        );
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let registry = FilterRegistry::standard();
        let mut once = document();
        normalize_document(&mut once, &schema(), &registry, None);
        let mut twice = once.clone();
        let report = normalize_document(&mut twice, &schema(), &registry, None);
        assert_eq!(once, twice);
        assert!(report.is_unchanged());
    }
}
