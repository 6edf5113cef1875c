use std::collections::HashMap;

use super::error::FilterError;
use super::types::{Column, FilterType, IntOption, StringOption};

/// Column definitions of one listing screen, indexed by key.
#[derive(Debug, Clone)]
pub struct ColumnSchema {
    columns: Vec<Column>,
    searchable: HashMap<String, usize>,
    sortable: HashMap<String, usize>,
}

impl ColumnSchema {
    pub fn new(columns: Vec<Column>) -> Result<Self, FilterError> {
        let mut searchable = HashMap::new();
        let mut sortable = HashMap::new();

        for (idx, column) in columns.iter().enumerate() {
            validate_identifier(&column.key).map_err(FilterError::InvalidColumn)?;

            if column.searchable && column.filter_type.is_some() {
                searchable.entry(column.key.clone()).or_insert(idx);
            }
            if column.sortable {
                sortable.entry(column.key.clone()).or_insert(idx);
            }
        }

        Ok(Self { columns, searchable, sortable })
    }

    pub fn from_json(json: &str) -> Result<Self, FilterError> {
        Self::new(serde_json::from_str(json)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, FilterError> {
        Self::new(serde_yaml::from_str(yaml)?)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Searchable column for `key`, if any
    pub fn searchable(&self, key: &str) -> Option<&Column> {
        self.searchable.get(key).map(|&idx| &self.columns[idx])
    }

    /// Filter widget of a searchable column
    pub fn filter_type(&self, key: &str) -> Option<FilterType> {
        self.searchable(key).and_then(|c| c.filter_type)
    }

    pub fn is_sortable(&self, key: &str) -> bool {
        self.sortable.contains_key(key)
    }

    /// Declared keys of a searchable string select column
    pub fn string_options(&self, key: &str) -> &[StringOption] {
        self.searchable(key).map(|c| c.string_options.as_slice()).unwrap_or(&[])
    }

    /// Declared keys of a searchable integer select column
    pub fn int_options(&self, key: &str) -> &[IntOption] {
        self.searchable(key).map(|c| c.int_options.as_slice()).unwrap_or(&[])
    }
}

/// Keys and table names end up verbatim in SQL and search syntax.
pub(crate) fn validate_identifier(name: &str) -> Result<(), String> {
    let mut chars = name.chars();
    match chars.next() {
        None => return Err("name cannot be empty".to_string()),
        Some(first) if !(first.is_ascii_alphabetic() || first == '_') => {
            return Err(format!("invalid name format: {}", name));
        }
        _ => {}
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!("invalid name format: {}", name));
    }
    Ok(())
}
