// ============================================================================
// Repository
// ============================================================================
//
// Query entry point for one entity type, bound to the request's persistence
// context.
//
// ============================================================================

use crate::context::SharedContext;
use crate::core::{ManagerError, Result, Value};
use crate::query::{Order, QueryBuilder};
use crate::record::Record;

#[derive(Clone)]
pub struct Repository {
    entity_ref: String,
    context: SharedContext,
}

impl Repository {
    /// Resolves the repository of `entity_ref`; the entity must be mapped.
    pub async fn new(context: &SharedContext, entity_ref: &str) -> Result<Self> {
        if !context.lock().await.is_mapped(entity_ref) {
            return Err(ManagerError::UnknownEntity(entity_ref.to_string()));
        }
        Ok(Self {
            entity_ref: entity_ref.to_string(),
            context: context.clone(),
        })
    }

    pub fn entity_ref(&self) -> &str {
        &self.entity_ref
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    pub fn create_query_builder(&self, alias: &str) -> QueryBuilder {
        QueryBuilder::new(self.entity_ref.clone(), alias)
    }

    pub async fn find(&self, id: impl Into<Value>) -> Result<Option<Record>> {
        let id = id.into();
        self.context.lock().await.find(&self.entity_ref, &id).await
    }

    /// Every record, in identifier order.
    pub async fn find_all(&self) -> Result<Vec<Record>> {
        self.create_query_builder("e")
            .get_query(&self.context)
            .get_result()
            .await
    }

    pub async fn find_by<I, K, V>(
        &self,
        criteria: I,
        order_by: &[(&str, Order)],
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<Record>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut qb = self.criteria_query(criteria);
        for (field, order) in order_by {
            qb = qb.add_order_by(field, *order);
        }
        qb.set_first_result(offset.unwrap_or(0))
            .set_max_results(limit)
            .get_query(&self.context)
            .get_result()
            .await
    }

    /// First record matching the criteria, in identifier order.
    pub async fn find_one_by<I, K, V>(&self, criteria: I) -> Result<Option<Record>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut records = self
            .criteria_query(criteria)
            .set_max_results(Some(1))
            .get_query(&self.context)
            .get_result()
            .await?;
        Ok(records.pop())
    }

    pub async fn count<I, K, V>(&self, criteria: I) -> Result<usize>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.criteria_query(criteria)
            .get_query(&self.context)
            .count()
            .await
    }

    fn criteria_query<I, K, V>(&self, criteria: I) -> QueryBuilder
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        criteria
            .into_iter()
            .fold(self.create_query_builder("e"), |qb, (field, value)| {
                qb.and_where_eq(field.as_ref(), value)
            })
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("entity_ref", &self.entity_ref)
            .finish()
    }
}
