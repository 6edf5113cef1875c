mod common;

use std::process::{Command, Output};

use anyhow::Result;
use serde_json::Value;

// Runs the crud-list binary against the users fixtures

fn crud_list(args: &[&str], env: &[(&str, &str)]) -> Result<Output> {
    let columns = common::fixture("users.yaml");
    let request = common::fixture("request.json");

    let mut cmd = Command::new(env!("CARGO_BIN_EXE_crud-list"));
    cmd.args(args)
        .arg("--columns")
        .arg(columns)
        .arg("--request")
        .arg(request)
        .env_remove("APP_ENV")
        .env_remove("LIST_STRICT_VALUES")
        .env("RUST_LOG", "off");
    for (key, value) in env {
        cmd.env(key, value);
    }
    Ok(cmd.output()?)
}

fn data(output: &Output) -> Result<Value> {
    let body: Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(body["success"], true);
    Ok(body["data"].clone())
}

#[test]
fn extract_json() -> Result<()> {
    let output = crud_list(&["--json", "extract"], &[])?;
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let data = data(&output)?;
    assert_eq!(data["page"], 2);
    assert_eq!(data["page_size"], 10);
    assert_eq!(data["number_filters"]["age"], 30);
    assert_eq!(data["sort"]["field"], "age");
    Ok(())
}

#[test]
fn search_json() -> Result<()> {
    let output = crud_list(&["--json", "search"], &[])?;
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let data = data(&output)?;
    assert_eq!(
        data["query"],
        "@age:[30 30] @score:[10 90] @status:{active} @name:jo* @verified:{true} ((@email:jo*))"
    );
    assert_eq!(data["sort"]["desc"], true);
    Ok(())
}

#[test]
fn sql_strict_rejects_range_filter() -> Result<()> {
    let output = crud_list(&["sql", "--strict"], &[])?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("score"));
    Ok(())
}

#[test]
fn sql_lenient_skips_range_filter() -> Result<()> {
    let output = crud_list(
        &["--json", "sql", "--table", "users"],
        &[("APP_ENV", "production"), ("LIST_STRICT_VALUES", "false")],
    )?;
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let data = data(&output)?;
    let query = data["query"].as_str().unwrap_or_default();
    assert!(query.starts_with("SELECT * FROM `users` WHERE 1 AND age = ?"));
    assert!(!query.contains("score"));
    assert_eq!(data["params"].as_array().map(Vec::len), Some(7));
    Ok(())
}
