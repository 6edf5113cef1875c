pub mod types;
pub mod column;
pub mod extract;
pub mod emitter;
pub mod list_search;
pub mod list_where;
pub mod error;

pub use types::*;
pub use column::ColumnSchema;
pub use emitter::QueryEmitter;
pub use error::FilterError;
pub use extract::{normalize, NormalizeOptions, Normalizer};
pub use list_search::{escape_search_string, to_search_query, SearchQuery, SearchQueryEmitter, SearchSort};
pub use list_where::{to_sql_where, SqlResult, SqlWhere, SqlWhereEmitter};
