pub mod list_query;

pub use list_query::{bind_query, DatabaseError, ListQuery};
