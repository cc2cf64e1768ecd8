// ============================================================================
// Record Manager
// ============================================================================
//
// Generic CRUD, pagination and state helpers shared by every per-entity
// manager. A manager is configured once per managed entity (bundle name,
// bundle namespace, entity reference) and then only delegates to the
// persistence context it was given.
//
// Concrete managers wrap a `RecordManager` and add entity-specific queries.
//
// ============================================================================

pub mod config;
pub mod properties;
pub mod slug;

pub use config::ManagerConfig;
pub use properties::{PropertyTable, PropertyValue};

use crate::context::{EntityState, SharedContext};
use crate::core::{ManagerError, Result, Value};
use crate::pager::Pager;
use crate::pager::QueryAdapter;
use crate::query::QueryBuilder;
use crate::record::{EntityRegistry, Record, entity_class};
use crate::repository::Repository;
use log::{debug, warn};
use properties::{ENTITY_NAME_PROPERTY, REPOSITORY_PROPERTY, repository_property};
use regex::RegexBuilder;
use std::path::{Path, PathBuf};

/// Either a record or the identifier of one.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOrId {
    Record(Record),
    Id(Value),
}

impl From<Record> for RecordOrId {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

impl From<i64> for RecordOrId {
    fn from(id: i64) -> Self {
        Self::Id(Value::Integer(id))
    }
}

impl From<i32> for RecordOrId {
    fn from(id: i32) -> Self {
        Self::Id(Value::Integer(id as i64))
    }
}

impl From<&str> for RecordOrId {
    fn from(id: &str) -> Self {
        Self::Id(Value::Text(id.to_string()))
    }
}

impl From<String> for RecordOrId {
    fn from(id: String) -> Self {
        Self::Id(Value::Text(id))
    }
}

#[derive(Clone)]
pub struct RecordManager {
    context: Option<SharedContext>,
    registry: EntityRegistry,
    class_name: String,
    bundle_name: String,
    bundle_namespace: String,
    properties: PropertyTable,
    default_page_size: usize,
    root_dir: Option<PathBuf>,
    strict_entity_refs: bool,
}

impl RecordManager {
    pub fn new(class_name: &str) -> Self {
        let defaults = ManagerConfig::default();
        Self {
            context: None,
            registry: EntityRegistry::new(),
            class_name: class_name.to_string(),
            bundle_name: defaults.bundle_name,
            bundle_namespace: defaults.bundle_namespace,
            properties: PropertyTable::new(),
            default_page_size: defaults.default_page_size,
            root_dir: defaults.root_dir,
            strict_entity_refs: defaults.strict_entity_refs,
        }
    }

    /// Builds a fully configured manager. Bundle settings are applied before
    /// the entity reference is decoded.
    pub async fn from_config(
        context: SharedContext,
        registry: EntityRegistry,
        config: ManagerConfig,
    ) -> Result<Self> {
        config.validate()?;

        let mut manager = Self::new(&config.class_name);
        manager.set_persistence_context(context);
        manager.set_registry(registry);
        manager.set_bundle_name(&config.bundle_name);
        manager.set_bundle_namespace(&config.bundle_namespace);
        manager.set_default_page_size(config.default_page_size);
        manager.set_strict_entity_refs(config.strict_entity_refs);
        if let Some(root_dir) = config.root_dir {
            manager.set_root_directory(root_dir);
        }
        if let Some(entity) = &config.entity {
            manager.set_entity(entity).await?;
        }
        Ok(manager)
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    pub fn set_persistence_context(&mut self, context: SharedContext) {
        self.context = Some(context);
    }

    pub fn set_registry(&mut self, registry: EntityRegistry) {
        self.registry = registry;
    }

    pub fn set_bundle_name(&mut self, bundle_name: &str) {
        self.bundle_name = bundle_name.to_string();
    }

    pub fn set_bundle_namespace(&mut self, bundle_namespace: &str) {
        self.bundle_namespace = bundle_namespace.to_string();
    }

    pub fn set_default_page_size(&mut self, size: usize) {
        self.default_page_size = size;
    }

    pub fn set_root_directory(&mut self, root_dir: impl Into<PathBuf>) {
        self.root_dir = Some(root_dir.into());
    }

    pub fn set_strict_entity_refs(&mut self, strict: bool) {
        self.strict_entity_refs = strict;
    }

    /// Declares an extra binding slot, e.g. `commentRepository`.
    pub fn declare_property(&mut self, name: &str) {
        self.properties.declare(name);
    }

    /// Sets the managed entity from a `Bundle:Entity` reference.
    pub async fn set_entity(&mut self, entity_ref: &str) -> Result<()> {
        if self.bundle_name.is_empty() || self.bundle_namespace.is_empty() {
            return Err(ManagerError::Config(format!(
                "{}: bundle name and namespace must be set before the entity",
                self.class_name
            )));
        }
        self.decode_entity_name(
            entity_ref,
            Some(ENTITY_NAME_PROPERTY),
            Some(REPOSITORY_PROPERTY),
        )
        .await
    }

    /// Decodes `Bundle:Entity` and stores the entity name and its repository
    /// into the given slots.
    ///
    /// The bundle prefix matches case-insensitively; the repository is resolved
    /// for the canonical `<bundle name>:<Entity>` reference. A reference outside
    /// the managed bundle leaves every slot untouched and is not an error
    /// unless strict entity references are enabled.
    pub async fn decode_entity_name(
        &mut self,
        entity_ref: &str,
        entity_property: Option<&str>,
        repo_property: Option<&str>,
    ) -> Result<()> {
        let entity_property = entity_property.filter(|p| !p.is_empty());
        let repo_property = repo_property.filter(|p| !p.is_empty());
        for property in [entity_property, repo_property].into_iter().flatten() {
            if !self.properties.contains(property) {
                return Err(ManagerError::no_such_property(property, &self.class_name));
            }
        }

        let pattern = format!("^{}:([a-zA-Z]+)$", regex::escape(&self.bundle_name));
        let matcher = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| ManagerError::Config(e.to_string()))?;

        let Some(captures) = matcher.captures(entity_ref) else {
            if self.strict_entity_refs {
                return Err(ManagerError::InvalidEntityReference(entity_ref.to_string()));
            }
            warn!(
                "{}: entity reference '{}' does not match bundle '{}', ignored",
                self.class_name, entity_ref, self.bundle_name
            );
            return Ok(());
        };
        let name = captures[1].to_string();

        if let Some(property) = repo_property {
            let canonical = format!("{}:{}", self.bundle_name, name);
            let repository = Repository::new(self.context()?, &canonical).await?;
            self.properties
                .set(property, PropertyValue::Repository(repository));
        }
        if let Some(property) = entity_property {
            self.properties
                .set(property, PropertyValue::EntityName(name));
        }
        debug!("{}: bound entity reference {}", self.class_name, entity_ref);
        Ok(())
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn bundle_name(&self) -> &str {
        &self.bundle_name
    }

    pub fn bundle_namespace(&self) -> &str {
        &self.bundle_namespace
    }

    pub fn entity_name(&self) -> Option<&str> {
        self.properties.entity_name(ENTITY_NAME_PROPERTY)
    }

    pub fn default_page_size(&self) -> usize {
        self.default_page_size
    }

    pub fn root_directory(&self) -> Option<&Path> {
        self.root_dir.as_deref()
    }

    pub fn properties(&self) -> &PropertyTable {
        &self.properties
    }

    pub fn context(&self) -> Result<&SharedContext> {
        self.context.as_ref().ok_or_else(|| {
            ManagerError::Config(format!(
                "{}: persistence context is not set",
                self.class_name
            ))
        })
    }

    /// Repository of the managed entity.
    pub fn repository(&self) -> Result<&Repository> {
        self.repository_slot(REPOSITORY_PROPERTY)
    }

    /// Undeclared and unset slots both read as a missing property.
    fn repository_slot(&self, property: &str) -> Result<&Repository> {
        self.properties
            .repository(property)
            .ok_or_else(|| ManagerError::no_such_property(property, &self.class_name))
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Persists and commits the record.
    pub async fn save(&self, mut record: Record) -> Result<Record> {
        self.persist_and_flush(&mut record).await?;
        Ok(record)
    }

    /// Stages the record for the next commit.
    pub async fn persist(&self, mut record: Record) -> Result<Record> {
        self.context()?.lock().await.persist(&mut record).await?;
        Ok(record)
    }

    pub async fn commit(&self) -> Result<()> {
        self.context()?.lock().await.flush().await
    }

    /// Removes and commits. Returns the number of deleted records.
    pub async fn delete(&self, record: &Record) -> Result<u64> {
        let mut ctx = self.context()?.lock().await;
        ctx.remove(record).await?;
        ctx.flush().await?;
        debug!("{}: deleted {} #{:?}", self.class_name, record.entity_ref(), record.id());
        Ok(1)
    }

    /// Stages the record for removal; the caller commits.
    pub async fn remove(&self, record: &Record) -> Result<()> {
        self.context()?.lock().await.remove(record).await
    }

    async fn persist_and_flush(&self, record: &mut Record) -> Result<()> {
        let mut ctx = self.context()?.lock().await;
        ctx.persist(record).await?;
        ctx.flush().await?;
        debug!("{}: saved {} #{:?}", self.class_name, record.entity_ref(), record.id());
        Ok(())
    }

    /// Builds an empty instance of the managed entity, or of `entity_name`.
    pub fn create_new(&self, entity_name: Option<&str>) -> Result<Record> {
        let name = entity_name.or(self.entity_name()).unwrap_or_default();
        self.registry
            .create(&self.bundle_namespace, &self.bundle_name, name)
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    /// Finds by identifier, through the repository bound for `entity_name`
    /// (`<entityName>Repository`) when given.
    pub async fn find(
        &self,
        id: impl Into<Value>,
        entity_name: Option<&str>,
    ) -> Result<Option<Record>> {
        let property = entity_name
            .map(repository_property)
            .unwrap_or_else(|| REPOSITORY_PROPERTY.to_string());
        self.repository_slot(&property)?.find(id).await
    }

    pub async fn find_all(&self) -> Result<Vec<Record>> {
        self.repository()?.find_all().await
    }

    pub async fn get_by_field<I, K, V>(&self, criteria: I) -> Result<Option<Record>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.repository()?.find_one_by(criteria).await
    }

    pub async fn get_all_by_field<I, K, V>(&self, criteria: I) -> Result<Vec<Record>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        self.repository()?.find_by(criteria, &[], None, None).await
    }

    /// Value of one field of the record `id`.
    pub async fn get_single_scalar_field(
        &self,
        id: impl Into<Value>,
        field_name: &str,
    ) -> Result<Value> {
        let repository = self.repository()?;
        repository
            .create_query_builder("e")
            .select([format!("e.{}", field_name)])
            .where_eq("e.id", id)
            .get_query(repository.context())
            .get_single_scalar_result()
            .await
    }

    // ------------------------------------------------------------------
    // Pagination
    // ------------------------------------------------------------------

    pub async fn find_all_paginated(&self, page: usize, max_per_page: usize) -> Result<Pager> {
        let query_builder = self.repository()?.create_query_builder("e");
        let mut pager = self.get_pager_from_query_builder(query_builder, Some(max_per_page))?;
        pager.set_current_page(page).await?;
        Ok(pager)
    }

    /// Wraps a query in a pager; a missing or zero page size falls back to
    /// the configured default.
    pub fn get_pager_from_query_builder(
        &self,
        query_builder: QueryBuilder,
        max_per_page: Option<usize>,
    ) -> Result<Pager> {
        let adapter = QueryAdapter::new(query_builder, self.context()?.clone());
        let mut pager = Pager::new(adapter);
        let max_per_page = max_per_page
            .filter(|max| *max > 0)
            .unwrap_or(self.default_page_size);
        pager.set_max_per_page(max_per_page)?;
        Ok(pager)
    }

    // ------------------------------------------------------------------
    // State helpers
    // ------------------------------------------------------------------

    pub async fn is_new(&self, record: &Record) -> Result<bool> {
        let ctx = self.context()?.lock().await;
        Ok(ctx.entity_state(record) == EntityState::New)
    }

    /// Flips the boolean state, saves, and returns the new state.
    pub async fn toggle_state(&self, record: &mut Record) -> Result<bool> {
        let next = !record.state()?.as_bool();
        record.set_state(next)?;
        self.persist_and_flush(record).await?;
        Ok(next)
    }

    /// Switches the state between 0 and 1 and saves. Anything but exactly
    /// integer 1 switches to 1.
    pub async fn switch_state(&self, target: impl Into<RecordOrId>) -> Result<i64> {
        let resolved = match target.into() {
            RecordOrId::Record(record) => Some(record),
            RecordOrId::Id(id) => self.find(id, None).await?,
        };

        let mut record = match resolved {
            Some(record) if self.check_instance(&record) => record,
            _ => {
                return Err(ManagerError::TypeMismatch(format!(
                    "Entity is not an instance of {}",
                    self.entity_name().unwrap_or_default()
                )));
            }
        };

        let next = if record.state()?.is_identical(&Value::Integer(1)) {
            0
        } else {
            1
        };
        record.set_state(next)?;
        self.persist_and_flush(&mut record).await?;
        Ok(next)
    }

    /// Whether the record is an instance of the managed entity class.
    pub fn check_instance(&self, record: &Record) -> bool {
        match self.entity_name() {
            Some(name) => record.class() == entity_class(&self.bundle_namespace, name),
            None => false,
        }
    }

    pub fn slug(&self, input: &str) -> String {
        slug::slug(input)
    }
}

impl std::fmt::Debug for RecordManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordManager")
            .field("class_name", &self.class_name)
            .field("bundle_name", &self.bundle_name)
            .field("bundle_namespace", &self.bundle_namespace)
            .field("entity_name", &self.entity_name())
            .field("default_page_size", &self.default_page_size)
            .finish()
    }
}
