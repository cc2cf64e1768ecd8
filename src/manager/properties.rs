use crate::repository::Repository;
use std::collections::HashMap;

pub const ENTITY_NAME_PROPERTY: &str = "entityName";
pub const REPOSITORY_PROPERTY: &str = "repository";

#[derive(Debug, Clone, Default)]
pub enum PropertyValue {
    #[default]
    Unset,
    EntityName(String),
    Repository(Repository),
}

/// Named slots a manager exposes for entity bindings.
///
/// Only declared slots can be written; `entityName` and `repository` always exist.
#[derive(Debug, Clone)]
pub struct PropertyTable {
    slots: HashMap<String, PropertyValue>,
}

impl Default for PropertyTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyTable {
    pub fn new() -> Self {
        let mut table = Self {
            slots: HashMap::new(),
        };
        table.declare(ENTITY_NAME_PROPERTY);
        table.declare(REPOSITORY_PROPERTY);
        table
    }

    pub fn declare(&mut self, name: impl Into<String>) {
        self.slots.entry(name.into()).or_default();
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Writes a declared slot; returns false when `name` was never declared.
    pub fn set(&mut self, name: &str, value: PropertyValue) -> bool {
        match self.slots.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn entity_name(&self, name: &str) -> Option<&str> {
        match self.slots.get(name) {
            Some(PropertyValue::EntityName(value)) => Some(value),
            _ => None,
        }
    }

    pub fn repository(&self, name: &str) -> Option<&Repository> {
        match self.slots.get(name) {
            Some(PropertyValue::Repository(repo)) => Some(repo),
            _ => None,
        }
    }
}

/// `Comment` -> `commentRepository`.
pub fn repository_property(type_name: &str) -> String {
    let mut chars = type_name.chars();
    match chars.next() {
        Some(first) => format!(
            "{}{}Repository",
            first.to_lowercase(),
            chars.as_str()
        ),
        None => REPOSITORY_PROPERTY.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_slots() {
        let mut table = PropertyTable::new();
        assert!(table.contains("entityName"));
        assert!(table.contains("repository"));
        assert!(!table.set("tagName", PropertyValue::EntityName("Tag".into())));

        table.declare("tagName");
        assert!(table.set("tagName", PropertyValue::EntityName("Tag".into())));
        assert_eq!(table.entity_name("tagName"), Some("Tag"));
        assert!(table.repository("tagName").is_none());
    }

    #[test]
    fn test_repository_property_name() {
        assert_eq!(repository_property("Comment"), "commentRepository");
        assert_eq!(repository_property("BlogPost"), "blogPostRepository");
        assert_eq!(repository_property(""), "repository");
    }
}
