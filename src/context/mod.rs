// ============================================================================
// Persistence Context
// ============================================================================
//
// The unit of work a manager delegates to: it tracks record identity, stages
// inserts/updates/removals and applies them on flush. One context is owned
// per request and shared by the managers serving that request.
//
// ============================================================================

pub mod change;
pub mod memory;

pub use change::Change;
pub use memory::InMemoryContext;

use crate::core::{Result, Row, Value};
use crate::query::QueryBuilder;
use crate::record::Record;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Identity state of a record as seen by the unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Never persisted in this context.
    New,
    /// Tracked: staged for insert, or loaded from the store.
    Managed,
    /// Staged for removal on the next flush.
    Removed,
}

#[async_trait]
pub trait PersistenceContext: Send {
    /// Whether the entity reference (`Bundle:Name`) is mapped.
    fn is_mapped(&self, entity_ref: &str) -> bool;

    /// Mapped field names of an entity, excluding the identifier.
    fn fields(&self, entity_ref: &str) -> Result<Vec<String>>;

    fn entity_state(&self, record: &Record) -> EntityState;

    /// Stages the record for insert or update. Assigns an identifier if missing.
    async fn persist(&mut self, record: &mut Record) -> Result<()>;

    /// Stages the record for removal.
    async fn remove(&mut self, record: &Record) -> Result<()>;

    /// Applies every staged change.
    async fn flush(&mut self) -> Result<()>;

    async fn find(&mut self, entity_ref: &str, id: &Value) -> Result<Option<Record>>;

    async fn load(&mut self, query: &QueryBuilder) -> Result<Vec<Record>>;

    /// Projects the selected fields of every matching record.
    async fn select_rows(&mut self, query: &QueryBuilder) -> Result<Vec<Row>>;

    /// Number of matching records, ignoring the result window.
    async fn count(&mut self, query: &QueryBuilder) -> Result<usize>;
}

/// Handle to the request's persistence context.
pub type SharedContext = Arc<Mutex<dyn PersistenceContext>>;

pub fn shared<C: PersistenceContext + 'static>(context: C) -> SharedContext {
    Arc::new(Mutex::new(context))
}
