mod common;

use querygen::generator::{self, GENERATED_BANNER};
use querygen::GeneratorConfig;
use std::collections::BTreeSet;

fn function_names(source: &str) -> BTreeSet<String> {
    let file = syn::parse_file(source).unwrap();
    file.items
        .iter()
        .filter_map(|item| match item {
            syn::Item::Fn(function) => Some(function.sig.ident.to_string()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_generate_writes_all_files() {
    let dir = tempfile::tempdir().unwrap();
    let (openapi, descriptors) = common::write_inputs(dir.path());
    let output = dir.path().join("generated");

    let (generation, report) = generator::generate(
        &openapi,
        &descriptors,
        &output,
        &GeneratorConfig::default(),
        false,
    )
    .unwrap();
    assert_eq!(generation.model.endpoints.len(), 2);
    assert_eq!(report.written.len(), 3);
    assert!(report.unchanged.is_empty());

    let filters = std::fs::read_to_string(output.join("filters.rs")).unwrap();
    let handlers = std::fs::read_to_string(output.join("handlers.rs")).unwrap();
    let module = std::fs::read_to_string(output.join("mod.rs")).unwrap();
    for source in [&filters, &handlers, &module] {
        assert!(source.starts_with(GENERATED_BANNER));
    }

    assert_eq!(
        function_names(&filters),
        BTreeSet::from([
            "build_nullable_uint32_filter".to_string(),
            "build_string_filter".to_string(),
            "build_uint32_filter".to_string(),
        ])
    );
    assert_eq!(
        function_names(&handlers),
        BTreeSet::from([
            "fct_block_service_get".to_string(),
            "fct_block_service_list".to_string(),
            "translate_fct_block_row".to_string(),
        ])
    );
    assert!(module.contains("pub mod filters;"));
    assert!(module.contains("pub mod handlers;"));
}

#[test]
fn test_list_handler_enforces_required_group() {
    let dir = tempfile::tempdir().unwrap();
    let (openapi, descriptors) = common::write_inputs(dir.path());
    let output = dir.path().join("generated");
    generator::generate(&openapi, &descriptors, &output, &GeneratorConfig::default(), false)
        .unwrap();

    let handlers = std::fs::read_to_string(output.join("handlers.rs")).unwrap();
    let require = regex::Regex::new(
        r#"require_any\(\s*"slot_key",\s*&\["slot_eq", "slot_gte", "slot_in", "slot_lte"\]"#,
    )
    .unwrap();
    assert!(require.is_match(&handlers), "{handlers}");
    assert!(handlers.contains("HandlerError::not_found"));
    assert!(handlers.contains("next_page_token"));
}

#[test]
fn test_second_run_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let (openapi, descriptors) = common::write_inputs(dir.path());
    let output = dir.path().join("generated");
    let config = GeneratorConfig::default();

    generator::generate(&openapi, &descriptors, &output, &config, false).unwrap();
    let first = std::fs::read(output.join("handlers.rs")).unwrap();

    let (_, report) = generator::generate(&openapi, &descriptors, &output, &config, false).unwrap();
    assert!(report.written.is_empty());
    assert_eq!(report.unchanged.len(), 3);
    assert_eq!(std::fs::read(output.join("handlers.rs")).unwrap(), first);
}

#[test]
fn test_dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (openapi, descriptors) = common::write_inputs(dir.path());
    let output = dir.path().join("generated");

    let (_, report) = generator::generate(
        &openapi,
        &descriptors,
        &output,
        &GeneratorConfig::default(),
        true,
    )
    .unwrap();
    assert_eq!(report.written.len(), 3);
    assert!(!output.exists());
}

#[test]
fn test_missing_input_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let (openapi, _) = common::write_inputs(dir.path());
    let output = dir.path().join("generated");

    let err = generator::generate(
        &openapi,
        &dir.path().join("missing.pb"),
        &output,
        &GeneratorConfig::default(),
        false,
    )
    .unwrap_err();
    assert!(format!("{err:#}").contains("missing.pb"));
    assert!(!output.exists());
}
