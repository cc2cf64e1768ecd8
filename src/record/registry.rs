use super::{Record, entity_class};
use crate::core::{ManagerError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Initialises the fields of a freshly constructed record.
pub type EntityFactory = Arc<dyn Fn(&mut Record) + Send + Sync>;

/// Explicit mapping from entity type names to constructors.
#[derive(Clone, Default)]
pub struct EntityRegistry {
    factories: HashMap<String, EntityFactory>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&mut Record) + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Builder form of [`EntityRegistry::register`].
    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&mut Record) + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Constructs an empty instance of `name` living under `namespace`.
    pub fn create(&self, namespace: &str, bundle: &str, name: &str) -> Result<Record> {
        let class = entity_class(namespace, name);
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ManagerError::Construction(class.clone()))?;

        let mut record = Record::new(format!("{}:{}", bundle, name), class);
        factory(&mut record);
        Ok(record)
    }
}

impl std::fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("EntityRegistry").field("entities", &names).finish()
    }
}
