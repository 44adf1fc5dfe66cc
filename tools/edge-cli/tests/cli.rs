//! Integration tests for the edge CLI

use std::fs;
use std::path::Path;

use assert_cmd::{cargo::cargo_bin_cmd, Command};
use predicates::prelude::*;
use tempfile::TempDir;

const CONFIG: &str = r#"
base_url = "https://shop.test"

[cache]
debug = 0

[cache.esi]
ignored = ["checkout_"]

[cache.esi.translator]
default = "d"
catalog_product_view = "pv"
"#;

fn edge(dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("edge");
    cmd.current_dir(dir);
    cmd
}

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("edge.toml"), CONFIG).unwrap();
    dir
}

#[test]
fn help_displays() {
    let dir = TempDir::new().unwrap();
    edge(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("evaluate"));
}

#[test]
fn translate_prints_one_tag_per_line() {
    let dir = TempDir::new().unwrap();
    edge(dir.path())
        .args(["translate", "catalog_product_5", "catalog_category_product_7", "cms_page_1"])
        .assert()
        .success()
        .stdout("P.5\nC.7\ncms_page_1\n");
}

#[test]
fn translate_join_deduplicates() {
    let dir = TempDir::new().unwrap();
    edge(dir.path())
        .args(["translate", "--join", "catalog_category_7", "catalog_category_product_7", "catalog_product_1"])
        .assert()
        .success()
        .stdout("C.7,P.1\n");
}

#[test]
fn translate_json() {
    let dir = TempDir::new().unwrap();
    edge(dir.path())
        .args(["--json", "translate", "catalog_product_5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"P.5\""));
}

#[test]
fn esi_encode_stops_at_ignored_handle() {
    let dir = workspace();
    edge(dir.path())
        .args(["esi", "encode", "default", "catalog_product_view", "checkout_cart", "cms_page"])
        .assert()
        .success()
        .stdout("d,pv\n");
}

#[test]
fn esi_decode_restores_handles() {
    let dir = workspace();
    edge(dir.path())
        .args(["esi", "decode", "d,pv,cms_page"])
        .assert()
        .success()
        .stdout("default\ncatalog_product_view\ncms_page\n");
}

#[test]
fn esi_url_uses_configured_base() {
    let dir = workspace();
    edge(dir.path())
        .args(["esi", "url", "--block", "header.panel", "default", "catalog_product_view"])
        .assert()
        .success()
        .stdout("https://shop.test/litemage/block/esi?b=header.panel&h=d%2Cpv\n");
}

#[test]
fn evaluate_cacheable_scenario() {
    let dir = workspace();
    fs::write(
        dir.path().join("product.toml"),
        r#"
path = "/catalog/product/view/id/9"
cacheable_ttl = 3600
cache_tags = ["catalog_product_9"]
"#,
    )
    .unwrap();

    edge(dir.path())
        .args(["evaluate", "product.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("public,max-age=3600"))
        .stdout(predicate::str::contains("P.9"));
}

#[test]
fn evaluate_json_reports_vary_cookie() {
    let dir = workspace();
    fs::write(
        dir.path().join("vary.json"),
        r#"{ "cacheable_ttl": 600, "vary": { "currency": "EUR" } }"#,
    )
    .unwrap();

    edge(dir.path())
        .args(["--json", "evaluate", "vary.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"vary\": \"currency=EUR changed\""))
        .stdout(predicate::str::contains("_lscache_vary="))
        .stdout(predicate::str::contains("x-litespeed-cache-control").not());
}

#[test]
fn evaluate_missing_scenario_fails() {
    let dir = workspace();
    edge(dir.path())
        .args(["evaluate", "missing.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read scenario"));
}

#[test]
fn config_init_creates_file() {
    let dir = TempDir::new().unwrap();
    edge(dir.path())
        .args(["config", "init"])
        .assert()
        .success();

    let content = fs::read_to_string(dir.path().join("edge.toml")).unwrap();
    assert!(content.contains("[cache.esi.translator]"));

    // Not attended, so no prompt: refuse without --force
    edge(dir.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    edge(dir.path())
        .args(["config", "init", "--force"])
        .assert()
        .success();
}

#[test]
fn config_show_json() {
    let dir = workspace();
    edge(dir.path())
        .args(["--json", "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"base_url\": \"https://shop.test\""))
        .stdout(predicate::str::contains("\"catalog_product_view\": \"pv\""));
}

#[test]
fn config_validate_accepts_valid_file() {
    let dir = workspace();
    edge(dir.path())
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"));
}

#[test]
fn config_validate_rejects_duplicate_codes() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("edge.toml"),
        "[cache.esi.translator]\ndefault = \"d\"\ndefault_v2 = \"d\"\n",
    )
    .unwrap();

    edge(dir.path())
        .args(["config", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid"));
}
