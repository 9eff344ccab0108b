use assert_cmd::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn repo_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("expected crates/<name> layout")
        .to_path_buf()
}

fn fixture(name: &str) -> PathBuf {
    let path = repo_root().join("fixtures").join("ownership").join(name);
    assert!(path.exists(), "fixture missing: {}", path.display());
    path
}

#[test]
fn cli_renders_svg_to_stdout() {
    let root = repo_root();
    let exe = assert_cmd::cargo_bin!("stakemap-cli");
    let output = Command::new(exe)
        .current_dir(&root)
        .args(["render", fixture("basic.json").to_string_lossy().as_ref()])
        .output()
        .expect("run cli");
    assert!(output.status.success());

    let svg = String::from_utf8(output.stdout).expect("utf-8 svg");
    assert!(svg.starts_with("<svg"), "not an svg: {svg:.80}");
    assert!(svg.contains(r#"id="acme""#));
    assert!(svg.contains("Acme Holdings Ltd"));
}

#[test]
fn cli_renders_png_smoke() {
    let root = repo_root();
    let tmp = tempfile::tempdir().expect("tempdir");
    let out = tmp.path().join("out.png");

    let exe = assert_cmd::cargo_bin!("stakemap-cli");
    Command::new(exe)
        .current_dir(&root)
        .args([
            "render",
            "--format",
            "png",
            "--scale",
            "0.5",
            "--out",
            out.to_string_lossy().as_ref(),
            fixture("basic.json").to_string_lossy().as_ref(),
        ])
        .assert()
        .success();

    let bytes = fs::read(&out).expect("read png");
    assert!(
        bytes.starts_with(b"\x89PNG\r\n\x1a\n"),
        "output is not a PNG"
    );
}

#[test]
fn cli_exports_paginated_pdf_next_to_input() {
    let root = repo_root();
    let tmp = tempfile::tempdir().expect("tempdir");
    let tmp_fixture = tmp.path().join("basic.json");
    fs::copy(fixture("basic.json"), &tmp_fixture).expect("copy fixture");

    let exe = assert_cmd::cargo_bin!("stakemap-cli");
    Command::new(exe)
        .current_dir(&root)
        .args([
            "render",
            "--format",
            "pdf",
            "--scale",
            "0.5",
            tmp_fixture.to_string_lossy().as_ref(),
        ])
        .assert()
        .success();

    let expected_out = tmp.path().join("Acme_Holdings_Ltd_ownership_structure.pdf");
    let bytes = fs::read(&expected_out).expect("read pdf");
    assert!(bytes.starts_with(b"%PDF-"), "output is not a PDF");
}

#[test]
fn cli_layout_emits_json_from_stdin() {
    let root = repo_root();
    let input = fs::read(fixture("representatives_only.json")).expect("read fixture");

    let exe = assert_cmd::cargo_bin!("stakemap-cli");
    let output = assert_cmd::Command::new(exe)
        .current_dir(&root)
        .args(["layout", "-"])
        .write_stdin(input)
        .output()
        .expect("run cli");
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("layout json");
    let nodes = json["nodes"].as_array().expect("nodes array");
    assert!(nodes.iter().any(|n| n["id"] == "shell"));
    assert!(nodes.iter().any(|n| n["entity_id"] == "r1"));
}

#[test]
fn cli_classify_orders_shareholders_by_priority_and_holding() {
    let root = repo_root();
    let exe = assert_cmd::cargo_bin!("stakemap-cli");
    let output = Command::new(exe)
        .current_dir(&root)
        .args(["classify", fixture("basic.json").to_string_lossy().as_ref()])
        .output()
        .expect("run cli");
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("classify json");
    let ids: Vec<&str> = json["shareholders"]
        .as_array()
        .expect("shareholders")
        .iter()
        .filter_map(|e| e["id"].as_str())
        .collect();
    assert_eq!(ids, ["c-north", "p-chan", "p-wong", "c-pearl"]);
    assert_eq!(json["excluded"][0]["id"], "p-silent");
}

#[test]
fn cli_reports_usage_with_exit_code_2() {
    let exe = assert_cmd::cargo_bin!("stakemap-cli");
    Command::new(exe)
        .args(["render", "--format", "gif"])
        .assert()
        .code(2);
}

#[test]
fn cli_reports_missing_data_with_exit_code_3() {
    let exe = assert_cmd::cargo_bin!("stakemap-cli");
    assert_cmd::Command::new(exe)
        .args(["render", "-"])
        .write_stdin("null")
        .assert()
        .code(3);
}
