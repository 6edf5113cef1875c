use thiserror::Error;

use super::types::FilterShape;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Invalid column name: {0}")]
    InvalidColumn(String),

    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Invalid value for '{field}': {value} (expected {expected})")]
    InvalidValue {
        field: String,
        value: String,
        expected: &'static str,
    },

    #[error("{backend} backend does not support {shape} filter on '{field}'")]
    UnsupportedShape {
        backend: &'static str,
        field: String,
        shape: FilterShape,
    },

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}
