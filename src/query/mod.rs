pub mod builder;
pub mod query;

pub use builder::{Order, QueryBuilder};
pub use query::Query;
