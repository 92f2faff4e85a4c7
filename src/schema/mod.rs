//! # Schema Extractor
//!
//! Reads compiled descriptor sets (`protoc --descriptor_set_out`) into a
//! [`SchemaModel`]: services with their List/Get methods, messages with their
//! fields, filter-typed request fields, wrapper hints and documented field
//! descriptions.
//!
//! Decoding goes through [`prost_reflect::DescriptorPool`]; the required-group
//! annotation is a declared field option read with
//! `DescriptorPool::get_extension_by_name`, never by raw field number.

mod comments;
mod load;
mod types;

pub use comments::{field_comment, field_description, parse_filter_comment};
pub use load::{
    load_descriptor_set, load_schema, load_schema_dir, SchemaError, SchemaOptions,
    DEFAULT_REQUIRED_GROUP_EXTENSION, DESCRIPTOR_SET_EXTENSIONS,
};
pub use types::*;
