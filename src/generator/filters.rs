use super::render::{format_rust, ident, type_ident, RenderContext};
use crate::filters::{FilterRegistry, FilterTypeDescriptor, Operator, ValueShape};
use proc_macro2::TokenStream;
use quote::quote;

/// Rust type of the constructor argument feeding `op`.
fn argument_type(descriptor: &FilterTypeDescriptor, op: Operator) -> TokenStream {
    let value = ident(descriptor.kind().rust_type());
    match op.shape() {
        ValueShape::Single => quote! { Option<#value> },
        ValueShape::List => quote! { Option<Vec<#value>> },
        ValueShape::Flag => quote! { Option<bool> },
        ValueShape::Key => quote! { Option<String> },
        ValueShape::KeyList => quote! { Option<Vec<String>> },
    }
}

/// `if let` arm producing the oneof variant for `op`.
fn operator_arm(descriptor: &FilterTypeDescriptor, op: Operator) -> TokenStream {
    let arg = ident(op.token());
    let variant = ident(&op.variant_name());
    match op.shape() {
        ValueShape::Single | ValueShape::Key => quote! {
            if let Some(value) = #arg { Filter::#variant(value) }
        },
        ValueShape::List | ValueShape::KeyList => {
            let list = type_ident(&descriptor.list_message());
            let field = ident(descriptor.list_field());
            quote! {
                if let Some(#field) = #arg { Filter::#variant(pb::#list { #field }) }
            }
        }
        ValueShape::Flag => quote! {
            if #arg == Some(true) { Filter::#variant(()) }
        },
    }
}

/// Constructor for one filter family.
///
/// Returns `None` when every argument is unset. For numeric families a
/// `gte` and `lte` pair collapses into a single `Between` before any single
/// comparison is considered; otherwise the first set operator in registry
/// order wins.
pub fn filter_constructor(registry: &FilterRegistry, descriptor: &FilterTypeDescriptor) -> TokenStream {
    let name = ident(&descriptor.constructor_name());
    let message = type_ident(descriptor.name());
    let oneof = ident(&descriptor.oneof_module());
    let operators = registry.operators_for(descriptor);

    let args = operators.iter().map(|op| {
        let arg = ident(op.token());
        let ty = argument_type(descriptor, *op);
        quote! { #arg: #ty }
    });

    let range = (registry.builds_range_for(descriptor)
        && descriptor.supports(Operator::Gte)
        && descriptor.supports(Operator::Lte))
    .then(|| {
        let range = type_ident(&descriptor.range_message());
        quote! {
            if let (Some(min), Some(max)) = (gte, lte) {
                return Some(pb::#message {
                    filter: Some(Filter::Between(pb::#range { min, max })),
                });
            }
        }
    });

    let arms = operators.iter().map(|op| operator_arm(descriptor, *op));

    quote! {
        pub fn #name(#(#args),*) -> Option<pb::#message> {
            use pb::#oneof::Filter;
            #range
            let filter = #(#arms else)* {
                return None;
            };
            Some(pb::#message { filter: Some(filter) })
        }
    }
}

/// Render `filters.rs` for the given families, sorted by name.
pub fn render_filters(
    registry: &FilterRegistry,
    descriptors: &[&FilterTypeDescriptor],
    ctx: &RenderContext,
) -> anyhow::Result<String> {
    let mut sorted = descriptors.to_vec();
    sorted.sort_by(|a, b| a.name().cmp(b.name()));
    sorted.dedup_by(|a, b| a.name() == b.name());

    let proto = ctx.proto_import();
    let constructors = sorted.iter().map(|d| filter_constructor(registry, d));
    format_rust(quote! {
        #![allow(clippy::too_many_arguments)]

        #proto

        #(#constructors)*
    })
}
