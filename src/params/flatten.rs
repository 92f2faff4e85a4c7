use super::{ListElement, Param, ParamType, ParameterLocation, RawParameter};
use crate::filters::{FilterRegistry, Operator, ValueShape};
use crate::naming::{to_snake_case, DELIMITER};
use crate::schema::WrapperKind;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Longest operator suffix, in delimiter-separated tokens.
pub const MAX_OPERATOR_TOKENS: usize = 3;

/// Suffix appended to the description of list-shaped parameters.
pub const LIST_SUFFIX: &str = " (comma-separated list)";

/// Normalize a REST parameter name to delimited form.
///
/// Every dot-separated segment is converted on its own and the segments are
/// joined with the plain delimiter.
///
/// ```
/// use querygen::params::normalize_param_name;
///
/// assert_eq!(normalize_param_name("slotStartDateTime.gte"), "slot_start_date_time_gte");
/// assert_eq!(normalize_param_name("slot.notIn"), "slot_not_in");
/// assert_eq!(normalize_param_name("page_size"), "page_size");
/// ```
pub fn normalize_param_name(raw: &str) -> String {
    raw.split('.')
        .map(to_snake_case)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(&DELIMITER.to_string())
}

/// Split a delimited parameter name into its field and operator.
///
/// The last three, then two, then one tokens are tried against the registry
/// vocabulary; the first match wins and at least one token must be left for
/// the field. A name with no matching suffix is a plain field.
///
/// ```
/// use querygen::filters::{FilterRegistry, Operator};
/// use querygen::params::split_param_name;
///
/// let registry = FilterRegistry::standard();
/// assert_eq!(split_param_name("slot_not_in", &registry), ("slot".to_string(), Some(Operator::NotIn)));
/// assert_eq!(split_param_name("page_size", &registry), ("page_size".to_string(), None));
/// ```
pub fn split_param_name(name: &str, registry: &FilterRegistry) -> (String, Option<Operator>) {
    let tokens: Vec<&str> = name.split(DELIMITER).collect();

    for suffix_len in (1..=MAX_OPERATOR_TOKENS).rev() {
        if tokens.len() <= suffix_len {
            continue;
        }
        let split_at = tokens.len() - suffix_len;
        let field = tokens[..split_at].join(&DELIMITER.to_string());
        if field.is_empty() {
            continue;
        }
        let suffix = tokens[split_at..].join(&DELIMITER.to_string());
        if let Some(op) = registry.match_operator(&suffix) {
            return (field, Some(op));
        }
    }

    (name.to_string(), None)
}

/// Compose the human-readable description of a filter parameter.
///
/// ```
/// use querygen::filters::Operator;
/// use querygen::params::describe;
///
/// assert_eq!(describe("slot", Operator::Eq, Some("The slot number")), "The slot number (filter: eq)");
/// assert_eq!(describe("slot", Operator::Gte, None), "Filter slot using gte");
/// ```
pub fn describe(field: &str, operator: Operator, known: Option<&str>) -> String {
    match known {
        Some(description) => format!("{description} (filter: {operator})"),
        None => format!("Filter {field} using {operator}"),
    }
}

impl ListElement {
    /// Validation pattern for a comma-separated list of this element type.
    pub fn pattern(self) -> &'static str {
        match self {
            ListElement::Unsigned => r"^\d+(,\d+)*$",
            ListElement::Signed => r"^-?\d+(,-?\d+)*$",
            ListElement::Float => r"^-?\d+(\.\d+)?(,-?\d+(\.\d+)?)*$",
            ListElement::String => r"^[^,]+(,[^,]+)*$",
        }
    }

    /// Recover the element type from a previously written pattern.
    pub fn from_pattern(pattern: &str) -> Option<Self> {
        [
            ListElement::Unsigned,
            ListElement::Signed,
            ListElement::Float,
            ListElement::String,
        ]
        .into_iter()
        .find(|element| element.pattern() == pattern)
    }

    /// Element type of an array's `items` schema.
    pub fn from_items(items: &Value) -> Self {
        let ty = items.get("type").and_then(Value::as_str).unwrap_or("string");
        let format = items.get("format").and_then(Value::as_str).unwrap_or("");
        let non_negative = items
            .get("minimum")
            .and_then(Value::as_f64)
            .is_some_and(|min| min >= 0.0);
        match ty {
            "integer" if format.starts_with("uint") || non_negative => ListElement::Unsigned,
            "integer" => ListElement::Signed,
            "number" => ListElement::Float,
            _ => ListElement::String,
        }
    }
}

/// Rewrite an array schema into a pattern-validated string schema.
///
/// Returns `None` when the schema is not an array.
pub fn coerce_list_schema(schema: &Value) -> Option<(Value, ListElement)> {
    if schema.get("type").and_then(Value::as_str) != Some("array") {
        return None;
    }
    let element = schema
        .get("items")
        .map(ListElement::from_items)
        .unwrap_or(ListElement::String);
    Some((
        json!({ "type": "string", "pattern": element.pattern() }),
        element,
    ))
}

/// Correct the declared scalar type of a schema from its wrapper kind.
///
/// Arrays get their `items` corrected. Schemas that were already coerced to
/// a list pattern are left alone.
pub fn apply_wrapper(schema: &mut Value, wrapper: WrapperKind) {
    let (ty, format) = wrapper.openapi_type();
    let is_array = schema.get("type").and_then(Value::as_str) == Some("array");
    let target = if is_array {
        match schema.get_mut("items") {
            Some(items) => items,
            None => return,
        }
    } else if schema.get("pattern").is_some() {
        return;
    } else {
        schema
    };
    let Some(object) = target.as_object_mut() else {
        return;
    };
    object.insert("type".to_string(), Value::from(ty));
    match format {
        Some(format) => {
            object.insert("format".to_string(), Value::from(format));
        }
        None => {
            object.remove("format");
        }
    }
}

/// Lookups the flattener consults for one operation.
#[derive(Debug, Clone, Copy)]
pub struct FlattenContext<'a> {
    pub registry: &'a FilterRegistry,
    /// Documented field descriptions of the owning request message
    pub descriptions: Option<&'a BTreeMap<String, String>>,
    /// Field name to wrapper kind
    pub wrappers: &'a BTreeMap<String, WrapperKind>,
}

/// A parameter after flattening, plus the rewritten schema and description
/// that belong back in the REST description.
#[derive(Debug, Clone, PartialEq)]
pub struct Flattened {
    pub param: Param,
    pub schema: Value,
}

/// Flatten one raw REST parameter.
pub fn flatten_parameter(raw: &RawParameter, ctx: FlattenContext<'_>) -> Flattened {
    let name = normalize_param_name(&raw.name);
    let (field, operator) = match raw.location {
        ParameterLocation::Query => split_param_name(&name, ctx.registry),
        _ => (name.clone(), None),
    };

    let mut schema = raw.schema.clone();
    // Null checks carry a boolean, not a value of the wrapped type.
    let flag = operator.is_some_and(|op| op.shape() == ValueShape::Flag);
    if let Some(wrapper) = ctx.wrappers.get(&field).filter(|_| !flag) {
        apply_wrapper(&mut schema, *wrapper);
    }

    let mut list_element = None;
    if operator.is_some_and(Operator::is_list) {
        if let Some((coerced, element)) = coerce_list_schema(&schema) {
            schema = coerced;
            list_element = Some(element);
        } else if let Some(pattern) = schema.get("pattern").and_then(Value::as_str) {
            list_element = ListElement::from_pattern(pattern);
        }
    }

    let known = ctx
        .descriptions
        .and_then(|descriptions| descriptions.get(&field))
        .map(String::as_str);
    let description = match operator {
        Some(op) => {
            let mut text = describe(&field, op, known);
            if list_element.is_some() {
                text.push_str(LIST_SUFFIX);
            }
            Some(text)
        }
        None => raw.description.clone().or_else(|| known.map(str::to_string)),
    };

    let mut value_type = ParamType::from_schema(&schema);
    value_type.list_element = list_element;

    Flattened {
        param: Param {
            raw_name: raw.name.clone(),
            name,
            field,
            operator,
            location: raw.location,
            required: raw.required,
            value_type,
            description,
            required_group: raw.required_group.clone(),
        },
        schema,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn raw(name: &str, schema: Value) -> RawParameter {
        RawParameter {
            name: name.to_string(),
            location: ParameterLocation::Query,
            description: None,
            required: false,
            schema,
            required_group: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn test_operator_precedence() {
        let registry = FilterRegistry::standard();
        assert_eq!(
            split_param_name("slot_not_in", &registry),
            ("slot".to_string(), Some(Operator::NotIn))
        );
        assert_eq!(
            split_param_name("slot_is_not_null", &registry),
            ("slot".to_string(), Some(Operator::IsNotNull))
        );
        assert_eq!(
            split_param_name("labels_has_all_keys", &registry),
            ("labels".to_string(), Some(Operator::HasAllKeys))
        );
        assert_eq!(
            split_param_name("slot_start_date_time_gte", &registry),
            ("slot_start_date_time".to_string(), Some(Operator::Gte))
        );
        assert_eq!(
            split_param_name("meta_client_name_not_like", &registry),
            ("meta_client_name".to_string(), Some(Operator::NotLike))
        );
    }

    #[test]
    fn test_non_filter_names() {
        let registry = FilterRegistry::standard();
        assert_eq!(split_param_name("page_size", &registry), ("page_size".to_string(), None));
        assert_eq!(split_param_name("page_token", &registry), ("page_token".to_string(), None));
        assert_eq!(split_param_name("order_by", &registry), ("order_by".to_string(), None));
    }

    #[test]
    fn test_operator_alone_is_a_field() {
        let registry = FilterRegistry::standard();
        assert_eq!(split_param_name("eq", &registry), ("eq".to_string(), None));
        assert_eq!(split_param_name("not_in", &registry), ("not".to_string(), Some(Operator::In)));
        assert_eq!(split_param_name("is_null", &registry), ("is_null".to_string(), None));
    }

    #[test]
    fn test_restricted_vocabulary() {
        let registry = FilterRegistry::from_descriptors([crate::filters::FilterTypeDescriptor::new(
            crate::filters::ScalarKind::Bool,
            false,
            false,
        )]);
        assert_eq!(split_param_name("active_eq", &registry), ("active".to_string(), Some(Operator::Eq)));
        assert_eq!(split_param_name("slot_gte", &registry), ("slot_gte".to_string(), None));
    }

    #[test]
    fn test_normalize_param_name() {
        assert_eq!(normalize_param_name("slotStartDateTime.gte"), "slot_start_date_time_gte");
        assert_eq!(normalize_param_name("metaClientName.notLike"), "meta_client_name_not_like");
        assert_eq!(normalize_param_name("slot.isNotNull"), "slot_is_not_null");
        assert_eq!(normalize_param_name("last24H.eq"), "last_24h_eq");
        assert_eq!(normalize_param_name("slot..eq"), "slot_eq");
    }

    #[test]
    fn test_list_coercion_by_element_type() {
        let cases = [
            (json!({"type": "integer", "format": "uint32"}), ListElement::Unsigned),
            (json!({"type": "integer", "format": "int64"}), ListElement::Signed),
            (json!({"type": "integer", "minimum": 0}), ListElement::Unsigned),
            (json!({"type": "number", "format": "double"}), ListElement::Float),
            (json!({"type": "string"}), ListElement::String),
        ];
        for (items, expected) in cases {
            let (coerced, element) =
                coerce_list_schema(&json!({"type": "array", "items": items})).unwrap();
            assert_eq!(element, expected);
            assert_eq!(coerced["type"], "string");
            assert_eq!(coerced["pattern"], expected.pattern());
        }
        assert!(coerce_list_schema(&json!({"type": "string"})).is_none());
    }

    #[test]
    fn test_list_patterns_accept_lists() {
        let unsigned = regex::Regex::new(ListElement::Unsigned.pattern()).unwrap();
        assert!(unsigned.is_match("1,2,3"));
        assert!(!unsigned.is_match("1,-2"));
        let signed = regex::Regex::new(ListElement::Signed.pattern()).unwrap();
        assert!(signed.is_match("-1,2"));
        let float = regex::Regex::new(ListElement::Float.pattern()).unwrap();
        assert!(float.is_match("1.5,-2"));
        let string = regex::Regex::new(ListElement::String.pattern()).unwrap();
        assert!(string.is_match("alpha,beta"));
        assert!(!string.is_match("alpha,,beta"));
    }

    #[test]
    fn test_flatten_list_parameter() {
        let registry = FilterRegistry::standard();
        let wrappers = BTreeMap::new();
        let mut descriptions = BTreeMap::new();
        descriptions.insert("slot".to_string(), "The slot number".to_string());
        let ctx = FlattenContext {
            registry: &registry,
            descriptions: Some(&descriptions),
            wrappers: &wrappers,
        };

        let flattened = flatten_parameter(
            &raw(
                "slot.notIn",
                json!({"type": "array", "items": {"type": "integer", "format": "uint32"}}),
            ),
            ctx,
        );
        let param = flattened.param;
        assert_eq!(param.name, "slot_not_in");
        assert_eq!(param.field, "slot");
        assert_eq!(param.operator, Some(Operator::NotIn));
        assert_eq!(param.value_type.ty, "string");
        assert_eq!(param.value_type.list_element, Some(ListElement::Unsigned));
        assert_eq!(
            param.description.as_deref(),
            Some("The slot number (filter: not_in) (comma-separated list)")
        );
    }

    #[test]
    fn test_flatten_is_stable_on_normalized_input() {
        let registry = FilterRegistry::standard();
        let wrappers = BTreeMap::new();
        let ctx = FlattenContext {
            registry: &registry,
            descriptions: None,
            wrappers: &wrappers,
        };
        let first = flatten_parameter(
            &raw("slot.in", json!({"type": "array", "items": {"type": "integer"}})),
            ctx,
        );
        let mut again = raw(&first.param.name, first.schema.clone());
        again.description = first.param.description.clone();
        let second = flatten_parameter(&again, ctx);
        assert_eq!(first.param.name, second.param.name);
        assert_eq!(first.param.description, second.param.description);
        assert_eq!(first.schema, second.schema);
    }

    #[test]
    fn test_wrapper_corrects_declared_type() {
        let registry = FilterRegistry::standard();
        let mut wrappers = BTreeMap::new();
        wrappers.insert("epoch".to_string(), WrapperKind::UInt32);
        let ctx = FlattenContext {
            registry: &registry,
            descriptions: None,
            wrappers: &wrappers,
        };
        let flattened = flatten_parameter(&raw("epoch", json!({"type": "string"})), ctx);
        assert_eq!(flattened.param.value_type.ty, "integer");
        assert_eq!(flattened.param.value_type.format.as_deref(), Some("uint32"));
        assert_eq!(flattened.param.operator, None);
    }

    #[test]
    fn test_null_check_keeps_boolean_type() {
        let registry = FilterRegistry::standard();
        let mut wrappers = BTreeMap::new();
        wrappers.insert("epoch".to_string(), WrapperKind::UInt32);
        let ctx = FlattenContext {
            registry: &registry,
            descriptions: None,
            wrappers: &wrappers,
        };
        let flattened = flatten_parameter(&raw("epoch_is_null", json!({"type": "boolean"})), ctx);
        assert_eq!(flattened.param.operator, Some(Operator::IsNull));
        assert_eq!(flattened.schema, json!({"type": "boolean"}));
        assert_eq!(flattened.param.value_type.ty, "boolean");
        assert_eq!(flattened.param.value_type.format, None);
    }

    #[test]
    fn test_path_parameters_are_not_split() {
        let registry = FilterRegistry::standard();
        let wrappers = BTreeMap::new();
        let ctx = FlattenContext {
            registry: &registry,
            descriptions: None,
            wrappers: &wrappers,
        };
        let mut path = raw("slot_eq", json!({"type": "integer"}));
        path.location = ParameterLocation::Path;
        let flattened = flatten_parameter(&path, ctx);
        assert_eq!(flattened.param.field, "slot_eq");
        assert_eq!(flattened.param.operator, None);
    }
}
