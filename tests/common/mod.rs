#![allow(dead_code)]

use std::path::PathBuf;

use anyhow::Result;
use crud_list::crud::{ColumnSchema, ListRequest};

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

/// Column schema of the users listing screen
pub fn users_schema() -> Result<ColumnSchema> {
    let raw = std::fs::read_to_string(fixture("users.yaml"))?;
    Ok(ColumnSchema::from_yaml(&raw)?)
}

pub fn request(value: serde_json::Value) -> Result<ListRequest> {
    Ok(serde_json::from_value(value)?)
}
