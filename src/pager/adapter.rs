use crate::context::SharedContext;
use crate::core::Result;
use crate::query::QueryBuilder;
use crate::record::Record;
use async_trait::async_trait;

/// Source of paginated records.
#[async_trait]
pub trait PagerAdapter: Send + Sync {
    async fn nb_results(&self) -> Result<usize>;

    async fn slice(&self, offset: usize, length: usize) -> Result<Vec<Record>>;
}

/// Paginates a query builder against a persistence context.
pub struct QueryAdapter {
    builder: QueryBuilder,
    context: SharedContext,
}

impl QueryAdapter {
    pub fn new(builder: QueryBuilder, context: SharedContext) -> Self {
        Self { builder, context }
    }
}

#[async_trait]
impl PagerAdapter for QueryAdapter {
    async fn nb_results(&self) -> Result<usize> {
        self.builder.get_query(&self.context).count().await
    }

    async fn slice(&self, offset: usize, length: usize) -> Result<Vec<Record>> {
        self.builder
            .without_window()
            .set_first_result(offset)
            .set_max_results(Some(length))
            .get_query(&self.context)
            .get_result()
            .await
    }
}

/// Paginates records already in memory.
pub struct VecAdapter {
    records: Vec<Record>,
}

impl VecAdapter {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl PagerAdapter for VecAdapter {
    async fn nb_results(&self) -> Result<usize> {
        Ok(self.records.len())
    }

    async fn slice(&self, offset: usize, length: usize) -> Result<Vec<Record>> {
        Ok(self
            .records
            .iter()
            .skip(offset)
            .take(length)
            .cloned()
            .collect())
    }
}
