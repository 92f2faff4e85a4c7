use super::render::{field_ident, format_rust, ident, type_ident, RenderContext};
use crate::filters::{FilterRegistry, FilterTypeDescriptor, Operator};
use crate::naming::to_snake_case;
use crate::schema::{FieldType, MethodKind, SchemaMessage, SchemaModel};
use crate::spec::{Endpoint, FilterBinding, KeyValue, ScalarBinding, ValueKind};
use anyhow::Context;
use proc_macro2::TokenStream;
use quote::quote;
use std::collections::BTreeSet;

/// Name of the function translating a result row into `message`.
pub fn translator_name(message: &str) -> String {
    format!("translate_{}_row", to_snake_case(message))
}

/// Shared state of one `handlers.rs` rendering.
pub struct HandlerRenderer<'a> {
    pub schema: &'a SchemaModel,
    pub registry: &'a FilterRegistry,
    pub ctx: &'a RenderContext,
}

impl HandlerRenderer<'_> {
    fn descriptor(&self, filter_type: &str) -> anyhow::Result<&FilterTypeDescriptor> {
        self.registry
            .get(filter_type)
            .with_context(|| format!("filter type '{filter_type}' is not registered"))
    }

    fn request(&self, endpoint: &Endpoint) -> anyhow::Result<&SchemaMessage> {
        self.schema
            .message(&endpoint.request_message)
            .with_context(|| format!("request message '{}' disappeared", endpoint.request_message))
    }

    /// Constructor call with each operator position filled from `value_for`,
    /// `None` everywhere else.
    fn constructor_call(
        &self,
        filter_type: &str,
        value_for: impl Fn(Operator) -> Option<TokenStream>,
    ) -> anyhow::Result<TokenStream> {
        let descriptor = self.descriptor(filter_type)?;
        let name = ident(&descriptor.constructor_name());
        let args = self
            .registry
            .operators_for(descriptor)
            .iter()
            .map(|op| value_for(*op).unwrap_or_else(|| quote! { None }));
        Ok(quote! { filters::#name(#(#args),*) })
    }

    fn filter_field(&self, binding: &FilterBinding) -> anyhow::Result<TokenStream> {
        let field = field_ident(&binding.field);
        debug_assert!(
            binding.operators.iter().all(|b| self
                .registry
                .get(&binding.filter_type)
                .is_some_and(|d| d.supports(b.operator))),
            "operator outside the {} set",
            binding.filter_type
        );
        let call = self.constructor_call(&binding.filter_type, |op| {
            binding.param_for(op).map(|param| {
                if op.is_list() {
                    quote! { params.parse_list(#param)? }
                } else {
                    quote! { params.parse(#param)? }
                }
            })
        })?;
        Ok(quote! { #field: #call })
    }

    fn scalar_field(&self, binding: &ScalarBinding) -> TokenStream {
        let field = field_ident(&binding.field);
        let param = &binding.param;
        match (binding.value, binding.repeated) {
            (ValueKind::Wrapper(_), _) => quote! { #field: params.parse(#param)? },
            (ValueKind::Scalar(_), true) => {
                quote! { #field: params.parse_list(#param)?.unwrap_or_default() }
            }
            (ValueKind::Scalar(_), false) => {
                quote! { #field: params.parse(#param)?.unwrap_or_default() }
            }
        }
    }

    fn page_size_field(
        &self,
        endpoint: &Endpoint,
        request: &SchemaMessage,
        page_size: &str,
    ) -> TokenStream {
        let field = field_ident(page_size);
        let default = proc_macro2::Literal::u32_unsuffixed(self.ctx.default_page_size);
        let wrapped = request
            .field(page_size)
            .is_some_and(|field| field.wrapper.is_some());
        let bound = endpoint
            .scalars
            .iter()
            .find(|binding| binding.field == page_size)
            .map(|binding| &binding.param);
        match (bound, wrapped) {
            (Some(param), false) => quote! { #field: params.parse(#param)?.unwrap_or(#default) },
            (Some(param), true) => {
                quote! { #field: Some(params.parse(#param)?.unwrap_or(#default)) }
            }
            (None, false) => quote! { #field: #default },
            (None, true) => quote! { #field: Some(#default) },
        }
    }

    fn list_handler(&self, endpoint: &Endpoint) -> anyhow::Result<TokenStream> {
        let request = self.request(endpoint)?;
        let name = ident(&endpoint.handler_name);
        let request_ty = type_ident(&endpoint.request_message);
        let response_ty = type_ident(&endpoint.response_message);
        let rows_field = field_ident(&endpoint.rows_field);
        let translate = ident(&translator_name(&endpoint.row_message));
        let build_query = ident(&format!("build_list_{}_query", endpoint.resource));

        let checks = endpoint.required_groups.iter().map(|group| {
            let name = &group.name;
            let members = &group.members;
            quote! { params.require_any(#name, &[#(#members),*])?; }
        });

        let mut assigned = BTreeSet::new();
        let mut fields = Vec::new();
        for binding in &endpoint.filters {
            if assigned.insert(binding.field.as_str()) {
                fields.push(self.filter_field(binding)?);
            }
        }
        if let Some(page_size) = endpoint.page_size_field.as_deref() {
            assigned.insert(page_size);
            fields.push(self.page_size_field(endpoint, request, page_size));
        }
        for binding in &endpoint.scalars {
            if assigned.insert(binding.field.as_str()) {
                fields.push(self.scalar_field(binding));
            }
        }

        let (next_page, next_page_field) = match endpoint.page_token_field.as_deref() {
            Some(page_token) => {
                let token = field_ident(page_token);
                let size = field_ident(endpoint.page_size_field.as_deref().unwrap_or_default());
                (
                    Some(quote! {
                        let next_page_token =
                            runtime::next_page_token(&request.#token, request.#size, items.len());
                    }),
                    Some(quote! { next_page_token, }),
                )
            }
            None => (None, None),
        };

        let doc = format!(" `{}` lists `{}` rows.", endpoint.location(), endpoint.resource);
        Ok(quote! {
            #[doc = #doc]
            pub fn #name(
                params: &runtime::QueryParams,
                conn: &impl runtime::Connection,
            ) -> Result<pb::#response_ty, runtime::HandlerError> {
                #(#checks)*
                let request = pb::#request_ty {
                    #(#fields,)*
                    ..Default::default()
                };
                let query = queries::#build_query(&request)?;
                let rows = conn.query_rows(&query)?;
                let items = rows
                    .iter()
                    .map(#translate)
                    .collect::<Result<Vec<_>, _>>()?;
                #next_page
                Ok(pb::#response_ty {
                    #rows_field: items,
                    #next_page_field
                    ..Default::default()
                })
            }
        })
    }

    fn get_handler(&self, endpoint: &Endpoint) -> anyhow::Result<TokenStream> {
        let key = endpoint
            .key
            .as_ref()
            .with_context(|| format!("{} has no key parameter", endpoint.location()))?;
        let name = ident(&endpoint.handler_name);
        let request_ty = type_ident(&endpoint.request_message);
        let response_ty = type_ident(&endpoint.response_message);
        let rows_field = field_ident(&endpoint.rows_field);
        let translate = ident(&translator_name(&endpoint.row_message));
        let build_query = ident(&format!("build_get_{}_query", endpoint.resource));
        let resource = &endpoint.resource;
        let key_field = field_ident(&key.field);
        let key_param = &key.param.raw_name;

        let key_value = match &key.value {
            KeyValue::Scalar(_) => quote! { params.path(#key_param)? },
            KeyValue::Filter(filter_type) => self.constructor_call(filter_type, |op| {
                (op == Operator::Eq).then(|| quote! { Some(params.path(#key_param)?) })
            })?,
        };

        let doc = format!(" `{}` fetches one `{resource}` row.", endpoint.location());
        Ok(quote! {
            #[doc = #doc]
            pub fn #name(
                params: &runtime::QueryParams,
                conn: &impl runtime::Connection,
            ) -> Result<pb::#response_ty, runtime::HandlerError> {
                let request = pb::#request_ty {
                    #key_field: #key_value,
                    ..Default::default()
                };
                let query = queries::#build_query(&request)?;
                match conn.query_row(&query)? {
                    Some(row) => Ok(pb::#response_ty {
                        #rows_field: Some(#translate(&row)?),
                        ..Default::default()
                    }),
                    None => Err(runtime::HandlerError::not_found(#resource, #key_param)),
                }
            }
        })
    }

    /// Row translator copying every plain column into `message`.
    ///
    /// Nested messages and maps are left at their defaults.
    fn translator(&self, message: &SchemaMessage) -> TokenStream {
        let name = ident(&translator_name(&message.name));
        let ty = type_ident(&message.name);
        let mut skipped = false;
        let fields: Vec<TokenStream> = message
            .fields
            .iter()
            .filter(|field| {
                let plain = match &field.ty {
                    FieldType::Scalar(_) => true,
                    FieldType::Other(other) => other != "map",
                    FieldType::Message(_) => field.wrapper.is_some(),
                };
                skipped |= !plain;
                plain
            })
            .map(|field| {
                let column = &field.name;
                let field = field_ident(column);
                quote! { #field: row.get(#column)? }
            })
            .collect();
        let rest = skipped.then(|| quote! { ..Default::default() });

        quote! {
            pub fn #name(row: &runtime::Row) -> Result<pb::#ty, runtime::HandlerError> {
                Ok(pb::#ty {
                    #(#fields,)*
                    #rest
                })
            }
        }
    }

    pub fn handler(&self, endpoint: &Endpoint) -> anyhow::Result<TokenStream> {
        match endpoint.kind {
            MethodKind::List => self.list_handler(endpoint),
            MethodKind::Get => self.get_handler(endpoint),
        }
    }

    /// Render `handlers.rs`: handlers in endpoint order, then one translator
    /// per row message, sorted by name.
    pub fn render(&self, endpoints: &[Endpoint]) -> anyhow::Result<String> {
        let handlers = endpoints
            .iter()
            .map(|endpoint| {
                self.handler(endpoint)
                    .with_context(|| format!("failed to render handler for {}", endpoint.location()))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let row_messages: BTreeSet<&str> = endpoints
            .iter()
            .map(|endpoint| endpoint.row_message.as_str())
            .collect();
        let translators = row_messages
            .into_iter()
            .map(|name| {
                self.schema
                    .message(name)
                    .map(|message| self.translator(message))
                    .with_context(|| format!("row message '{name}' is not in the schema"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let imports = self.ctx.imports();
        let filters = (!referenced_filters(endpoints, self.registry).is_empty())
            .then(|| quote! { use super::filters; });
        format_rust(quote! {
            #![allow(clippy::too_many_arguments, clippy::needless_update)]

            #imports
            #filters

            #(#handlers)*

            #(#translators)*
        })
    }
}

/// Filter families the rendered handlers call, in name order.
pub fn referenced_filters<'a>(
    endpoints: &[Endpoint],
    registry: &'a FilterRegistry,
) -> Vec<&'a FilterTypeDescriptor> {
    let mut names: BTreeSet<&str> = BTreeSet::new();
    for endpoint in endpoints {
        match endpoint.kind {
            MethodKind::List => names.extend(endpoint.filter_types()),
            MethodKind::Get => {
                if let Some(KeyValue::Filter(filter_type)) = endpoint.key.as_ref().map(|k| &k.value) {
                    names.insert(filter_type);
                }
            }
        }
    }
    names.into_iter().filter_map(|name| registry.get(name)).collect()
}
