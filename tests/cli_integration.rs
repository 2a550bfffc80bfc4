//! CLI integration tests for poolwire
//!
//! These tests run the binary against container descriptions written to a
//! temporary directory and check what it prints or writes.

use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const CONTAINER: &str = r#"
[parameters]
"kernel.project_dir" = "/proj"
"kernel.container_class" = "App\\Kernel"

[services."cache.early_expiration_handler"]
class = "EarlyExpirationHandler"

[services."cache.app_clearer"]
class = "Psr6CacheClearer"

[services."cache.adapter.redis"]
class = "RedisAdapter"
abstract = true
tags = [{ name = "cache.pool", provider = "redis://localhost" }]

[services."cache.app"]
parent = "cache.adapter.redis"
tags = [{ name = "cache.pool", clearer = "cache.app_clearer", default_lifetime = 300 }]

[services."cache.sessions"]
class = "Symfony\\Component\\Cache\\Adapter\\ArrayAdapter"
tags = [{ name = "cache.pool", name_ = "x" }]
"#;

/// Get a command instance for the poolwire binary
fn poolwire_cmd(home: &TempDir) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("poolwire"));
    // Keep a developer's global config out of the tests
    cmd.env("XDG_CONFIG_HOME", home.path())
        .env("HOME", home.path())
        .env_remove("POOLWIRE_CONFIG")
        .env_remove("POOLWIRE_LOG");
    cmd
}

/// Writes a container description into a fresh temporary directory
fn setup_container(content: &str, file_name: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(file_name);
    fs::write(&path, content).unwrap();
    (dir, path)
}

fn valid_container() -> String {
    CONTAINER.replace(", name_ = \"x\"", "")
}

// =============================================================================
// Namespace
// =============================================================================

#[test]
fn test_namespace_command() {
    let dir = TempDir::new().unwrap();

    poolwire_cmd(&dir)
        .args(["namespace", "foo", "--seed", ""])
        .assert()
        .success()
        .stdout(predicate::str::diff("LCa0a2j-xo\n"));
}

#[test]
fn test_namespace_command_json() {
    let dir = TempDir::new().unwrap();

    let output = poolwire_cmd(&dir)
        .args(["--format", "json", "namespace", "app.cache.foo", "--seed", "_/proj.App\\Kernel"])
        .args(["--class", "GenericAdapter"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["name"], "app.cache.foo");
    assert_eq!(json["namespace"].as_str().unwrap().len(), 10);
}

// =============================================================================
// Compile
// =============================================================================

#[test]
fn test_compile_json_rewrites_pools() {
    let (dir, path) = setup_container(&valid_container(), "container.toml");

    let output = poolwire_cmd(&dir)
        .args(["--format", "json", "compile"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let services = &json["services"];

    let app_args = services["cache.app"]["arguments"].as_array().unwrap();
    assert_eq!(app_args.len(), 3);
    assert!(app_args[0].as_str().unwrap().starts_with("@.cache_connection."));
    assert_eq!(app_args[1].as_str().unwrap().len(), 10);
    assert_eq!(app_args[2], 300);

    // Array adapters take no namespace
    assert!(services["cache.sessions"].get("arguments").is_none());

    let clearer_args = &services["cache.app_clearer"]["arguments"][0];
    assert_eq!(clearer_args["cache.app"], "@?cache.app");

    // No pool uses early expiration
    assert!(services.get("cache.early_expiration_handler").is_none());
}

#[test]
fn test_compile_text_summary() {
    let (dir, path) = setup_container(&valid_container(), "container.toml");

    poolwire_cmd(&dir)
        .arg("compile")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wired 2 cache pools (1 clearers, 1 connections)"))
        .stdout(predicate::str::contains("cache.app_clearer\tcache.app"));
}

#[test]
fn test_compile_writes_output_file() {
    let (dir, path) = setup_container(&valid_container(), "container.toml");
    let out = dir.path().join("compiled.json");

    poolwire_cmd(&dir)
        .arg("compile")
        .arg(&path)
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wired 2 cache pools into"));

    let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert!(written["services"]["cache.app"]["arguments"].is_array());
}

#[test]
fn test_compile_rejects_unknown_attribute() {
    let (dir, path) = setup_container(CONTAINER, "container.toml");

    poolwire_cmd(&dir)
        .arg("compile")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"cache.sessions\""))
        .stderr(predicate::str::contains("found \"name_\""));
}

#[test]
fn test_compile_rejects_nested_chain() {
    let container = r#"
services:
  cache.inner:
    class: Symfony\Component\Cache\Adapter\ChainAdapter
    abstract: true
  cache.outer:
    class: Symfony\Component\Cache\Adapter\ChainAdapter
    arguments: [[cache.inner]]
    tags: [{ name: cache.pool }]
"#;
    let (dir, path) = setup_container(container, "container.yaml");

    poolwire_cmd(&dir)
        .arg("compile")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("chain of adapters cannot reference another chain"));
}

#[test]
fn test_compile_unsupported_format() {
    let (dir, path) = setup_container("<container/>", "container.xml");

    poolwire_cmd(&dir)
        .arg("compile")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported container format"));
}

// =============================================================================
// Pools
// =============================================================================

#[test]
fn test_pools_lists_wired_pools() {
    let (dir, path) = setup_container(&valid_container(), "container.toml");

    poolwire_cmd(&dir)
        .arg("pools")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache pools (2)"))
        .stdout(predicate::str::contains("cache.app\tcache.app\tother"))
        .stdout(predicate::str::contains("300s"))
        .stdout(predicate::str::contains("cache.sessions\tcache.sessions\tarray"));
}

#[test]
fn test_pools_json() {
    let container = r#"{
        "services": {
            "cache.short": {
                "class": "GenericAdapter",
                "tags": [{"name": "cache.pool", "default_lifetime": "5 minutes"}]
            }
        }
    }"#;
    let (dir, path) = setup_container(container, "container.json");

    let output = poolwire_cmd(&dir)
        .args(["-f", "json", "pools"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["name"], "cache.short");
    assert_eq!(json[0]["default_lifetime"], 300);
    assert_eq!(json[0]["adapter"], "other");
}

#[test]
fn test_custom_config_changes_pool_tag() {
    let container = r#"
[services."cache.custom"]
class = "GenericAdapter"
tags = [{ name = "app.pool" }]
"#;
    let (dir, path) = setup_container(container, "container.toml");
    let config = dir.path().join("poolwire.toml");
    fs::write(&config, "[tags]\npool = \"app.pool\"\n").unwrap();

    poolwire_cmd(&dir)
        .arg("--config")
        .arg(&config)
        .arg("pools")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache pools (1)"));
}

#[test]
fn test_pools_empty_container() {
    let (dir, path) = setup_container("[services]\n", "container.toml");

    poolwire_cmd(&dir)
        .arg("pools")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("No cache pools found"));
}
