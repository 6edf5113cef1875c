use serde_json::Value;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::query::{Query, QueryAs};
use sqlx::{Arguments, FromRow, MySql, MySqlPool, Row};
use thiserror::Error;

use crate::crud::{FilterError, SearchParams, SqlResult, SqlWhere};

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// One page of a listing table, filtered by a [`SqlWhere`]
pub struct ListQuery<'a> {
    table: &'a str,
    params: &'a SearchParams,
    where_: &'a SqlWhere,
}

impl<'a> ListQuery<'a> {
    pub fn new(table: &'a str, params: &'a SearchParams, where_: &'a SqlWhere) -> Self {
        Self { table, params, where_ }
    }

    /// Paged `SELECT` statement for this listing
    pub fn select(&self) -> Result<SqlResult, FilterError> {
        self.where_.select_sql(self.table, self.params)
    }

    pub fn count_statement(&self) -> Result<SqlResult, FilterError> {
        self.where_.count_sql(self.table)
    }

    pub async fn fetch_page<T>(&self, pool: &MySqlPool) -> Result<Vec<T>, DatabaseError>
    where
        T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
    {
        let sql = self.select()?;
        tracing::debug!(query = %sql.query, params = sql.params.len(), "fetching list page");

        Ok(bind_query_as::<T>(&sql).fetch_all(pool).await?)
    }

    pub async fn count(&self, pool: &MySqlPool) -> Result<i64, DatabaseError> {
        let sql = self.count_statement()?;
        let row = bind_query(&sql).fetch_one(pool).await?;
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }
}

/// `sqlx` query for `sql` with all parameters bound in order
pub fn bind_query(sql: &SqlResult) -> Query<'_, MySql, MySqlArguments> {
    sqlx::query_with(&sql.query, arguments(&sql.params))
}

/// Typed variant of [`bind_query`]
pub fn bind_query_as<T>(sql: &SqlResult) -> QueryAs<'_, MySql, T, MySqlArguments>
where
    T: for<'r> FromRow<'r, MySqlRow>,
{
    sqlx::query_as_with(&sql.query, arguments(&sql.params))
}

fn arguments(params: &[Value]) -> MySqlArguments {
    let mut args = MySqlArguments::default();
    for value in params {
        match value {
            Value::Null => args.add(None::<String>),
            Value::Bool(b) => args.add(*b),
            Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
                (Some(i), _, _) => args.add(i),
                (None, Some(u), _) => args.add(u),
                (None, None, Some(f)) => args.add(f),
                _ => args.add(n.to_string()),
            },
            Value::String(s) => args.add(s.clone()),
            // arrays and objects go in as JSON documents
            Value::Array(_) | Value::Object(_) => args.add(value.clone()),
        }
    }
    args
}
