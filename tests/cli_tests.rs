mod common;

use std::path::Path;
use std::process::{Command, Output};

fn querygen(args: &[&str], dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_querygen"))
        .current_dir(dir)
        .args(args)
        .env("QUERYGEN_LOG_LEVEL", "warn")
        .output()
        .expect("run querygen")
}

#[test]
fn test_cli_generate_writes_modules() {
    let dir = tempfile::tempdir().unwrap();
    common::write_inputs(dir.path());

    let out = querygen(
        &[
            "generate",
            "--openapi",
            "openapi.json",
            "--descriptors",
            "cbt.pb",
            "--output",
            "generated",
        ],
        dir.path(),
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    for name in ["filters.rs", "handlers.rs", "mod.rs"] {
        assert!(dir.path().join("generated").join(name).exists(), "{name} missing");
    }
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Wrote"));

    let again = querygen(
        &[
            "generate",
            "--openapi",
            "openapi.json",
            "--descriptors",
            "cbt.pb",
            "--output",
            "generated",
        ],
        dir.path(),
    );
    assert!(again.status.success());
    assert!(String::from_utf8_lossy(&again.stdout).contains("Unchanged"));
}

#[test]
fn test_cli_inspect_prints_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    common::write_inputs(dir.path());

    let out = querygen(
        &["inspect", "--openapi", "openapi.json", "--descriptors", "cbt.pb"],
        dir.path(),
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("GET /api/v1/fct_block -> fct_block_service_list"));
    assert!(stdout.contains("required one of slot_key"));
    assert!(stdout.contains("2 endpoint(s), 0 diagnostic(s)"));
}

#[test]
fn test_cli_missing_input_exits_non_zero() {
    let dir = tempfile::tempdir().unwrap();
    common::write_inputs(dir.path());

    let out = querygen(
        &[
            "generate",
            "--openapi",
            "openapi.json",
            "--descriptors",
            "missing.pb",
            "--output",
            "generated",
        ],
        dir.path(),
    );
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("error:"));
    assert!(!dir.path().join("generated").exists());
}

#[test]
fn test_cli_normalize_then_check() {
    let dir = tempfile::tempdir().unwrap();
    common::write_inputs(dir.path());

    // `slot_in` is still an array parameter.
    let check = querygen(
        &[
            "normalize",
            "--openapi",
            "openapi.json",
            "--descriptors",
            "cbt.pb",
            "--output",
            "normalized.json",
            "--check",
        ],
        dir.path(),
    );
    assert!(!check.status.success());
    assert!(!dir.path().join("normalized.json").exists());

    let write = querygen(
        &[
            "normalize",
            "--openapi",
            "openapi.json",
            "--descriptors",
            "cbt.pb",
            "--output",
            "normalized.json",
        ],
        dir.path(),
    );
    assert!(write.status.success(), "{}", String::from_utf8_lossy(&write.stderr));

    let recheck = querygen(
        &[
            "normalize",
            "--openapi",
            "normalized.json",
            "--descriptors",
            "cbt.pb",
            "--output",
            "unused.json",
            "--check",
        ],
        dir.path(),
    );
    assert!(recheck.status.success(), "{}", String::from_utf8_lossy(&recheck.stderr));
}
