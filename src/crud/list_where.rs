use serde::Serialize;
use serde_json::Value;

use super::column::validate_identifier;
use super::emitter::QueryEmitter;
use super::error::FilterError;
use super::types::{FilterShape, SearchParams};

const SUPPORTED: &[FilterShape] = &[
    FilterShape::Number,
    FilterShape::Tag,
    FilterShape::Boolean,
    FilterShape::StringPrefix,
    FilterShape::StringOr,
];

/// Parameterized WHERE fragment with `?` placeholders, in bind order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlWhere {
    pub clause: String,
    pub params: Vec<Value>,
}

/// Complete statement ready for binding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}

impl SqlWhere {
    fn new() -> Self {
        Self { clause: "1".to_string(), params: vec![] }
    }

    fn append(&mut self, statement: &str, params: impl IntoIterator<Item = Value>) {
        self.clause.push(' ');
        self.clause.push_str(statement);
        self.params.extend(params);
    }

    /// `SELECT *` for the page described by `params`
    pub fn select_sql(&self, table: &str, params: &SearchParams) -> Result<SqlResult, FilterError> {
        validate_identifier(table).map_err(FilterError::InvalidTableName)?;

        let mut bound = self.params.clone();
        bound.push(Value::from(params.limit()));
        bound.push(Value::from(params.offset()));
        Ok(SqlResult {
            query: format!("SELECT * FROM `{}` WHERE {} LIMIT ? OFFSET ?", table, self.clause),
            params: bound,
        })
    }

    pub fn count_sql(&self, table: &str) -> Result<SqlResult, FilterError> {
        validate_identifier(table).map_err(FilterError::InvalidTableName)?;

        Ok(SqlResult {
            query: format!("SELECT COUNT(*) AS count FROM `{}` WHERE {}", table, self.clause),
            params: self.params.clone(),
        })
    }
}

/// Relational backend. Equality, boolean and prefix filters only.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlWhereEmitter;

impl QueryEmitter for SqlWhereEmitter {
    type Output = SqlWhere;

    const BACKEND: &'static str = "relational";

    fn capabilities(&self) -> &'static [FilterShape] {
        SUPPORTED
    }

    fn emit(&self, params: &SearchParams) -> SqlWhere {
        for (field, shape) in self.unsupported(params) {
            tracing::debug!(field = %field, "skipping {} filter, not supported by {} backend", shape, Self::BACKEND);
        }

        let mut where_ = SqlWhere::new();

        for (field, value) in &params.number_filters {
            where_.append(&format!("AND {} = ?", field), [Value::from(*value)]);
        }
        for (field, value) in &params.tag_filters {
            where_.append(&format!("AND {} = ?", field), [Value::from(value.as_str())]);
        }
        for (field, value) in &params.boolean_filters {
            where_.append(&format!("AND {} = ?", field), [Value::from(*value)]);
        }

        // TODO: use full text search once the tables carry FULLTEXT indexes
        for (field, value) in &params.string_filters {
            where_.append(&format!("AND {} LIKE ?", field), [Value::from(format!("{}%", value))]);
        }

        if !params.string_or_filters.is_empty() {
            let statements: Vec<String> = params
                .string_or_filters
                .keys()
                .map(|field| format!("{} LIKE ?", field))
                .collect();
            let values = params
                .string_or_filters
                .values()
                .map(|value| Value::from(format!("{}%", value)));
            where_.append(&format!("AND ({})", statements.join(" OR ")), values);
        }

        if let Some(sort) = &params.sort {
            let direction = if sort.ascending { "ASC" } else { "DESC" };
            where_.append(&format!("ORDER BY {} {}", sort.field, direction), std::iter::empty::<Value>());
        }

        where_
    }
}

/// Short form of `SqlWhereEmitter.emit(params)`
pub fn to_sql_where(params: &SearchParams) -> SqlWhere {
    SqlWhereEmitter.emit(params)
}
