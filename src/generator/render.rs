use crate::config::GeneratorConfig;
use anyhow::Context;
use heck::{ToSnakeCase, ToUpperCamelCase};
use proc_macro2::{Ident, Span, TokenStream};
use quote::quote;

/// First line of every generated file.
pub const GENERATED_BANNER: &str = "// @generated by querygen. DO NOT EDIT.";

const RESERVED_PATH_SEGMENTS: [&str; 4] = ["self", "super", "crate", "Self"];

/// Module paths the generated code refers to.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub proto: syn::Path,
    pub runtime: syn::Path,
    pub queries: syn::Path,
    pub default_page_size: u32,
}

impl RenderContext {
    pub fn from_config(config: &GeneratorConfig) -> anyhow::Result<Self> {
        Ok(Self {
            proto: parse_module_path(&config.proto_module)?,
            runtime: parse_module_path(&config.runtime_module)?,
            queries: parse_module_path(&config.queries_module)?,
            default_page_size: config.default_page_size,
        })
    }

    /// `use` item binding the message module to `pb`.
    pub fn proto_import(&self) -> TokenStream {
        use_as(&self.proto, "pb")
    }

    /// `use` items binding the configured modules to `pb`, `runtime` and `queries`.
    pub fn imports(&self) -> TokenStream {
        let proto = use_as(&self.proto, "pb");
        let runtime = use_as(&self.runtime, "runtime");
        let queries = use_as(&self.queries, "queries");
        quote! {
            #proto
            #runtime
            #queries
        }
    }
}

fn parse_module_path(path: &str) -> anyhow::Result<syn::Path> {
    syn::parse_str::<syn::Path>(path).with_context(|| format!("invalid module path '{path}'"))
}

fn use_as(path: &syn::Path, alias: &str) -> TokenStream {
    let last = path.segments.last().map(|segment| segment.ident.to_string());
    if last.as_deref() == Some(alias) {
        quote! { use #path; }
    } else {
        let alias = ident(alias);
        quote! { use #path as #alias; }
    }
}

/// Identifier for a schema or REST name, escaped the way prost escapes them.
///
/// Keywords become raw identifiers (`in` → `r#in`), path keywords get a
/// trailing underscore (`self` → `self_`) and anything that is not an
/// identifier character is replaced with `_`.
pub fn ident(name: &str) -> Ident {
    let mut clean: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if clean.is_empty() || clean.starts_with(|c: char| c.is_ascii_digit()) {
        clean.insert(0, '_');
    }
    if RESERVED_PATH_SEGMENTS.contains(&clean.as_str()) {
        return Ident::new(&format!("{clean}_"), Span::call_site());
    }
    match syn::parse_str::<Ident>(&clean) {
        Ok(id) => id,
        Err(_) if clean == "_" => Ident::new("__", Span::call_site()),
        Err(_) => Ident::new_raw(&clean, Span::call_site()),
    }
}

/// Message type name as prost emits it (`FctMEVBid` → `FctMevBid`).
pub fn type_ident(name: &str) -> Ident {
    ident(&name.to_upper_camel_case())
}

/// Message field name as prost emits it (`blockRoot` → `block_root`).
pub fn field_ident(name: &str) -> Ident {
    ident(&name.to_snake_case())
}

/// Parse the token stream as a file and pretty-print it under the banner.
pub fn format_rust(tokens: TokenStream) -> anyhow::Result<String> {
    let file = syn::parse2::<syn::File>(tokens).context("generated invalid Rust code")?;
    Ok(format!("{GENERATED_BANNER}\n\n{}", prettyplease::unparse(&file)))
}
