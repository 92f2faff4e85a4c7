//! Shared fixtures: a small `cbt` service compiled to a descriptor set by
//! hand, plus the OpenAPI description that exposes it.

#![allow(dead_code)]

use prost::encoding::{encode_key, encode_varint, WireType};
use prost::Message;
use prost_reflect::DescriptorPool;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::source_code_info::Location;
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, MethodDescriptorProto,
    ServiceDescriptorProto, SourceCodeInfo,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Field number of `querygen.v1.required_group` on `google.protobuf.FieldOptions`.
pub const REQUIRED_GROUP_NUMBER: u32 = 50001;

pub fn scalar(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

pub fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_string()),
        ..scalar(name, number, Type::Message)
    }
}

pub fn repeated(mut field: FieldDescriptorProto) -> FieldDescriptorProto {
    field.label = Some(Label::Repeated as i32);
    field
}

pub fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields,
        ..Default::default()
    }
}

fn method(name: &str, input: &str, output: &str) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(format!(".cbt.{input}")),
        output_type: Some(format!(".cbt.{output}")),
        ..Default::default()
    }
}

fn well_known(name: &str) -> FileDescriptorProto {
    DescriptorPool::global()
        .get_file_by_name(name)
        .unwrap_or_else(|| panic!("{name} missing from the global pool"))
        .file_descriptor_proto()
        .clone()
}

/// `google/protobuf/wrappers.proto`, one `value` field per wrapper.
pub fn wrappers_file() -> FileDescriptorProto {
    let wrappers = [
        ("DoubleValue", Type::Double),
        ("FloatValue", Type::Float),
        ("Int64Value", Type::Int64),
        ("UInt64Value", Type::Uint64),
        ("Int32Value", Type::Int32),
        ("UInt32Value", Type::Uint32),
        ("BoolValue", Type::Bool),
        ("StringValue", Type::String),
        ("BytesValue", Type::Bytes),
    ];
    FileDescriptorProto {
        name: Some("google/protobuf/wrappers.proto".to_string()),
        package: Some("google.protobuf".to_string()),
        message_type: wrappers
            .into_iter()
            .map(|(name, ty)| message(name, vec![scalar("value", 1, ty)]))
            .collect(),
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

/// `querygen/v1/options.proto` declaring the required-group field option.
pub fn options_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("querygen/v1/options.proto".to_string()),
        package: Some("querygen.v1".to_string()),
        dependency: vec!["google/protobuf/descriptor.proto".to_string()],
        extension: vec![FieldDescriptorProto {
            extendee: Some(".google.protobuf.FieldOptions".to_string()),
            ..scalar("required_group", REQUIRED_GROUP_NUMBER as i32, Type::String)
        }],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

/// The `cbt` service: one List and one Get method over `fct_block`.
pub fn cbt_file() -> FileDescriptorProto {
    let messages = vec![
        message("UInt32Filter", vec![]),
        message("StringFilter", vec![]),
        message("NullableUInt32Filter", vec![]),
        message(
            "FctBlock",
            vec![
                scalar("slot", 1, Type::Uint32),
                scalar("block_root", 2, Type::String),
                message_field("epoch", 3, ".google.protobuf.UInt32Value"),
                scalar("block_total_bytes", 4, Type::Double),
            ],
        ),
        message(
            "ListFctBlockRequest",
            vec![
                message_field("slot", 1, ".cbt.UInt32Filter"),
                message_field("block_root", 2, ".cbt.StringFilter"),
                message_field("proposer_index", 3, ".cbt.NullableUInt32Filter"),
                message_field("epoch", 4, ".google.protobuf.UInt32Value"),
                scalar("page_size", 5, Type::Int32),
                scalar("page_token", 6, Type::String),
                scalar("order_by", 7, Type::String),
            ],
        ),
        message(
            "ListFctBlockResponse",
            vec![
                repeated(message_field("fct_block", 1, ".cbt.FctBlock")),
                scalar("next_page_token", 2, Type::String),
            ],
        ),
        message("GetFctBlockRequest", vec![scalar("slot", 1, Type::Uint32)]),
        message(
            "GetFctBlockResponse",
            vec![message_field("item", 1, ".cbt.FctBlock")],
        ),
    ];

    let comment = |message: i32, field: i32, text: &str| Location {
        path: vec![4, message, 2, field],
        leading_comments: Some(text.to_string()),
        ..Default::default()
    };

    FileDescriptorProto {
        name: Some("cbt/fct_block.proto".to_string()),
        package: Some("cbt".to_string()),
        dependency: vec![
            "google/protobuf/wrappers.proto".to_string(),
            "querygen/v1/options.proto".to_string(),
        ],
        message_type: messages,
        service: vec![ServiceDescriptorProto {
            name: Some("FctBlockService".to_string()),
            method: vec![
                method("List", "ListFctBlockRequest", "ListFctBlockResponse"),
                method("Get", "GetFctBlockRequest", "GetFctBlockResponse"),
            ],
            ..Default::default()
        }],
        source_code_info: Some(SourceCodeInfo {
            location: vec![
                comment(4, 0, " Filter by slot - The slot number\n"),
                comment(4, 1, " Filter by block_root - The beacon block root hash (hex)\n"),
            ],
        }),
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

fn push_len_delimited(out: &mut Vec<u8>, tag: u32, bytes: &[u8]) {
    encode_key(tag, WireType::LengthDelimited, out);
    encode_varint(bytes.len() as u64, out);
    out.extend_from_slice(bytes);
}

/// `(message, field, group)` triples get the required-group option.
///
/// prost drops extension fields, so the option is spliced into the encoded
/// `FieldDescriptorProto` as a second `options` entry, which protobuf merges.
fn encode_message(message: &DescriptorProto, groups: &[(&str, &str, &str)]) -> Vec<u8> {
    let mut stripped = message.clone();
    let fields = std::mem::take(&mut stripped.field);
    let mut out = stripped.encode_to_vec();
    for field in &fields {
        let mut bytes = field.encode_to_vec();
        let group = groups.iter().find(|(m, f, _)| {
            Some(*m) == message.name.as_deref() && Some(*f) == field.name.as_deref()
        });
        if let Some((_, _, group)) = group {
            let mut options = Vec::new();
            push_len_delimited(&mut options, REQUIRED_GROUP_NUMBER, group.as_bytes());
            push_len_delimited(&mut bytes, 8, &options);
        }
        push_len_delimited(&mut out, 2, &bytes);
    }
    out
}

fn encode_file(file: &FileDescriptorProto, groups: &[(&str, &str, &str)]) -> Vec<u8> {
    let mut stripped = file.clone();
    let messages = std::mem::take(&mut stripped.message_type);
    let mut out = stripped.encode_to_vec();
    for message in &messages {
        push_len_delimited(&mut out, 4, &encode_message(message, groups));
    }
    out
}

/// Serialized `FileDescriptorSet` with dependencies first.
pub fn descriptor_set(files: &[FileDescriptorProto], groups: &[(&str, &str, &str)]) -> Vec<u8> {
    let mut all = vec![
        well_known("google/protobuf/descriptor.proto"),
        wrappers_file(),
        options_file(),
    ];
    all.extend_from_slice(files);

    let mut out = Vec::new();
    for file in &all {
        push_len_delimited(&mut out, 1, &encode_file(file, groups));
    }
    out
}

/// Descriptor set of the `cbt` service with `slot` in required group `slot_key`.
pub fn cbt_descriptor_set() -> Vec<u8> {
    descriptor_set(&[cbt_file()], &[("ListFctBlockRequest", "slot", "slot_key")])
}

pub fn query(name: &str, ty: &str) -> Value {
    json!({ "name": name, "in": "query", "schema": { "type": ty } })
}

pub fn cbt_openapi() -> Value {
    json!({
        "openapi": "3.1.0",
        "info": { "title": "cbt", "version": "1.0.0" },
        "servers": [{ "url": "https://cbt.example.com/api/v1" }],
        "paths": {
            "/api/v1/fct_block": {
                "get": {
                    "operationId": "FctBlockService_List",
                    "parameters": [
                        query("slot_eq", "integer"),
                        query("slot_gte", "integer"),
                        query("slot_lte", "integer"),
                        {
                            "name": "slot_in",
                            "in": "query",
                            "schema": { "type": "array", "items": { "type": "integer", "format": "uint32" } }
                        },
                        query("block_root_starts_with", "string"),
                        query("proposer_index_is_null", "boolean"),
                        query("epoch", "string"),
                        query("page_size", "integer"),
                        query("page_token", "string"),
                        query("order_by", "string")
                    ],
                    "responses": { "200": { "description": "ok" } }
                }
            },
            "/api/v1/fct_block/{slot}": {
                "get": {
                    "operationId": "FctBlockService_Get",
                    "parameters": [
                        { "name": "slot", "in": "path", "required": true, "schema": { "type": "integer" } }
                    ],
                    "responses": { "200": { "description": "ok" } }
                }
            }
        }
    })
}

/// Write both inputs into `dir` and return `(openapi, descriptors)`.
pub fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
    let openapi = dir.join("openapi.json");
    let descriptors = dir.join("cbt.pb");
    std::fs::write(&openapi, serde_json::to_string_pretty(&cbt_openapi()).unwrap()).unwrap();
    std::fs::write(&descriptors, cbt_descriptor_set()).unwrap();
    (openapi, descriptors)
}
