use anyhow::Context;
use oas3::OpenApiV3Spec;
use serde_json::Value;
use std::path::Path;

/// A parsed REST description.
///
/// The typed `spec` drives iteration over paths and operations. Parameters
/// are read from the raw `document` so vendor extensions such as
/// `x-required-group` survive untouched.
#[derive(Debug, Clone)]
pub struct RestDescription {
    pub spec: OpenApiV3Spec,
    pub document: Value,
}

fn strip_unknown_verbs(val: &mut Value) {
    const METHODS: [&str; 8] = ["get", "post", "put", "delete", "patch", "options", "head", "trace"];

    if let Some(Value::Object(paths_map)) = val.get_mut("paths") {
        for item in paths_map.values_mut() {
            if let Value::Object(obj) = item {
                obj.retain(|k, _| {
                    let lk = k.to_ascii_lowercase();
                    match lk.as_str() {
                        "summary" | "description" | "servers" | "parameters" | "$ref" => true,
                        m if METHODS.contains(&m) => true,
                        _ => k.starts_with("x-"),
                    }
                });
            }
        }
    }
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext == "yaml" || ext == "yml")
        .unwrap_or(false)
}

/// Parse YAML or JSON text into a JSON value, chosen by file extension.
pub fn parse_document(path: &Path, content: &str) -> anyhow::Result<Value> {
    let value = if is_yaml(path) {
        serde_yaml::from_str(content)
            .with_context(|| format!("failed to parse YAML '{}'", path.display()))?
    } else {
        serde_json::from_str(content)
            .with_context(|| format!("failed to parse JSON '{}'", path.display()))?
    };
    Ok(value)
}

/// Validate an in-memory document and keep both views of it.
pub fn rest_description_from_value(mut document: Value) -> anyhow::Result<RestDescription> {
    strip_unknown_verbs(&mut document);
    let spec: OpenApiV3Spec = serde_json::from_value(document.clone())
        .context("document is not a valid OpenAPI 3 description")?;
    Ok(RestDescription { spec, document })
}

/// Read a REST description from disk.
pub fn load_rest_description(path: &Path) -> anyhow::Result<RestDescription> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read REST description '{}'", path.display()))?;
    let document = parse_document(path, &content)?;
    rest_description_from_value(document)
        .with_context(|| format!("invalid REST description '{}'", path.display()))
}

/// Serialize a document back out in the format its extension names.
pub fn render_document(path: &Path, document: &Value) -> anyhow::Result<String> {
    if is_yaml(path) {
        serde_yaml::to_string(document).context("failed to serialize YAML")
    } else {
        let mut text = serde_json::to_string_pretty(document).context("failed to serialize JSON")?;
        text.push('\n');
        Ok(text)
    }
}

/// Path component of `servers[0].url`, without a trailing slash.
pub fn server_base_path(spec: &OpenApiV3Spec) -> String {
    spec.servers
        .first()
        .map(|server| base_path_from_url(&server.url))
        .unwrap_or_default()
}

/// Path component of a server URL, absolute or relative.
pub fn base_path_from_url(url_str: &str) -> String {
    url::Url::parse(url_str)
        .or_else(|_| url::Url::parse(&format!("http://dummy{url_str}")))
        .map(|u| {
            let p = u.path().trim_end_matches('/');
            if p == "/" || p.is_empty() {
                String::new()
            } else {
                p.to_string()
            }
        })
        .unwrap_or_default()
}
