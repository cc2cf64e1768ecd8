// ============================================================================
// Managed Records
// ============================================================================
//
// A record is an opaque application value whose persistence is delegated to
// a manager. The shape is dynamic: an ordered field map plus identity.
//
// ============================================================================

pub mod registry;

pub use registry::{EntityFactory, EntityRegistry};

use crate::core::{ManagerError, Result, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Field carrying the two-valued record state.
pub const STATE_FIELD: &str = "state";

/// Builds the fully qualified class name of an entity: `<ns>::Entity::<Name>`.
pub fn entity_class(namespace: &str, name: &str) -> String {
    format!("{}::Entity::{}", namespace, name)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Stable identity used by the unit of work, independent of the id.
    uid: Uuid,
    /// Entity reference, `Bundle:Name`.
    entity_ref: String,
    /// Fully qualified class name.
    class: String,
    id: Option<Value>,
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new(entity_ref: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            uid: Uuid::new_v4(),
            entity_ref: entity_ref.into(),
            class: class.into(),
            id: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn uid(&self) -> Uuid {
        self.uid
    }

    pub fn entity_ref(&self) -> &str {
        &self.entity_ref
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    /// Short type name, the last segment of the class.
    pub fn type_name(&self) -> &str {
        self.class.rsplit("::").next().unwrap_or(&self.class)
    }

    pub fn id(&self) -> Option<&Value> {
        self.id.as_ref()
    }

    pub fn set_id(&mut self, id: impl Into<Value>) {
        self.id = Some(id.into());
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        if field == "id" {
            return self.id.as_ref();
        }
        self.fields.get(field)
    }

    /// Declares or overwrites a field.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        if field == "id" {
            self.id = Some(value.into());
            return;
        }
        self.fields.insert(field, value.into());
    }

    /// Builder form of [`Record::set`].
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn has_state(&self) -> bool {
        self.has_field(STATE_FIELD)
    }

    pub fn state(&self) -> Result<&Value> {
        self.fields
            .get(STATE_FIELD)
            .ok_or_else(|| ManagerError::no_such_property("getState", self.class.clone()))
    }

    pub fn set_state(&mut self, state: impl Into<Value>) -> Result<()> {
        match self.fields.get_mut(STATE_FIELD) {
            Some(slot) => {
                *slot = state.into();
                Ok(())
            }
            None => Err(ManagerError::no_such_property(
                "setState",
                self.class.clone(),
            )),
        }
    }
}
