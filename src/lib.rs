// ============================================================================
// recordmgr Library
// ============================================================================

pub mod context;
pub mod core;
pub mod manager;
pub mod pager;
pub mod query;
pub mod record;
pub mod repository;

pub use context::{EntityState, InMemoryContext, PersistenceContext, SharedContext, shared};
pub use crate::core::{ManagerError, Result, Row, Value};
pub use manager::{ManagerConfig, RecordManager, RecordOrId, slug::slug};
pub use pager::{Pager, PagerAdapter, QueryAdapter, VecAdapter};
pub use query::{Order, Query, QueryBuilder};
pub use record::{EntityRegistry, Record, entity_class};
pub use repository::Repository;
