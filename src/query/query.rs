use super::QueryBuilder;
use crate::context::SharedContext;
use crate::core::{ManagerError, Result, Row, Value};
use crate::record::Record;

/// An executable query bound to a persistence context.
pub struct Query {
    builder: QueryBuilder,
    context: SharedContext,
}

impl Query {
    pub(crate) fn new(builder: QueryBuilder, context: SharedContext) -> Self {
        Self { builder, context }
    }

    pub async fn get_result(&self) -> Result<Vec<Record>> {
        let mut ctx = self.context.lock().await;
        ctx.load(&self.builder).await
    }

    pub async fn get_one_or_null_result(&self) -> Result<Option<Record>> {
        let mut records = self.get_result().await?;
        match records.len() {
            0 => Ok(None),
            1 => Ok(records.pop()),
            n => Err(ManagerError::NonUniqueResult(n)),
        }
    }

    pub async fn get_scalar_rows(&self) -> Result<Vec<Row>> {
        let mut ctx = self.context.lock().await;
        ctx.select_rows(&self.builder).await
    }

    /// First column of the only row. Zero or several rows are errors.
    pub async fn get_single_scalar_result(&self) -> Result<Value> {
        let mut rows = self.get_scalar_rows().await?;
        if rows.len() > 1 {
            return Err(ManagerError::NonUniqueResult(rows.len()));
        }
        let row = rows.pop().ok_or(ManagerError::NoResult)?;
        row.into_iter().next().ok_or(ManagerError::NoResult)
    }

    /// Number of matching records, ignoring the result window.
    pub async fn count(&self) -> Result<usize> {
        let mut ctx = self.context.lock().await;
        ctx.count(&self.builder).await
    }
}

impl std::fmt::Debug for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query").field("builder", &self.builder).finish()
    }
}
