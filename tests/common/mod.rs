#![allow(dead_code)]

use std::{fs, path::Path};

use assert_cmd::{assert::Assert, Command};
use serde_json::Value;

pub const POST_ID: &str = "7d3f0c52-1b7e-4c55-9a43-2f1d1f5b9e01";

/// Runs `ekami_cli` in script mode against an isolated home directory.
pub fn run_script(home: &Path, script: &str) -> Assert {
    Command::cargo_bin("ekami_cli")
        .expect("ekami_cli binary")
        .env("EKAMI_CLI_SCRIPT", "1")
        .env("EKAMI_HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .write_stdin(script.to_string())
        .assert()
}

pub fn stdout_of(assert: &Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stdout).into_owned()
}

/// Rows of a stored collection; empty when the collection file does not exist.
pub fn collection_rows(home: &Path, collection: &str) -> Vec<Value> {
    let path = home
        .join("data")
        .join("collections")
        .join(format!("{collection}.json"));
    match fs::read_to_string(path) {
        Ok(json) => serde_json::from_str(&json).expect("collection is a JSON array"),
        Err(_) => Vec::new(),
    }
}

/// Walks the six intake steps with valid answers, leaving the session on the contact step filled in.
pub const COMPLETE_INTAKE: &str = r#"repair start oil-change
repair next
repair set make Toyota
repair set model Corolla
repair set year 2015
repair next
repair next
repair next
repair set date 2025-01-01
repair set time 10:00
repair next
repair set name "Amina Bello"
repair set email amina@example.com
repair set phone "+237 600 000 000"
"#;
