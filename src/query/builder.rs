// ============================================================================
// Query Builder
// ============================================================================
//
// Describes a query over one entity type: projection, equality filters,
// ordering and a result window. Execution is owned by the persistence
// context; the builder is plain data.
//
// ============================================================================

use super::Query;
use crate::context::SharedContext;
use crate::core::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryBuilder {
    entity_ref: String,
    alias: String,
    select: Vec<String>,
    criteria: Vec<(String, Value)>,
    order_by: Vec<(String, Order)>,
    first_result: usize,
    max_results: Option<usize>,
}

impl QueryBuilder {
    pub fn new(entity_ref: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            entity_ref: entity_ref.into(),
            alias: alias.into(),
            select: Vec::new(),
            criteria: Vec::new(),
            order_by: Vec::new(),
            first_result: 0,
            max_results: None,
        }
    }

    /// Replaces the projection. Fields may be prefixed with the alias (`e.title`).
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.select = fields
            .into_iter()
            .map(|f| self.strip_alias(f.as_ref()))
            .collect();
        self
    }

    /// Replaces every equality filter with a single one.
    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.criteria.clear();
        self.and_where_eq(field, value)
    }

    pub fn and_where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        let field = self.strip_alias(field);
        self.criteria.push((field, value.into()));
        self
    }

    pub fn order_by(mut self, field: &str, order: Order) -> Self {
        self.order_by.clear();
        self.add_order_by(field, order)
    }

    pub fn add_order_by(mut self, field: &str, order: Order) -> Self {
        let field = self.strip_alias(field);
        self.order_by.push((field, order));
        self
    }

    pub fn set_first_result(mut self, offset: usize) -> Self {
        self.first_result = offset;
        self
    }

    pub fn set_max_results(mut self, limit: Option<usize>) -> Self {
        self.max_results = limit;
        self
    }

    pub fn get_query(&self, context: &SharedContext) -> Query {
        Query::new(self.clone(), context.clone())
    }

    pub fn entity_ref(&self) -> &str {
        &self.entity_ref
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn selection(&self) -> &[String] {
        &self.select
    }

    pub fn criteria(&self) -> &[(String, Value)] {
        &self.criteria
    }

    pub fn ordering(&self) -> &[(String, Order)] {
        &self.order_by
    }

    pub fn first_result(&self) -> usize {
        self.first_result
    }

    pub fn max_results(&self) -> Option<usize> {
        self.max_results
    }

    /// Same query with its result window removed.
    pub fn without_window(&self) -> Self {
        Self {
            first_result: 0,
            max_results: None,
            ..self.clone()
        }
    }

    fn strip_alias(&self, field: &str) -> String {
        field
            .strip_prefix(&self.alias)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(field)
            .to_string()
    }
}
