use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ManagerError {
    #[error("The property {property} does not exist for class {class}")]
    NoSuchProperty { property: String, class: String },

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("No result was found for query although at least one row was expected")]
    NoResult,

    #[error("Non-unique result: expected one row, got {0}")]
    NonUniqueResult(usize),

    #[error("Cannot construct '{0}': class is not registered")]
    Construction(String),

    #[error("Entity '{0}' is not mapped by the persistence context")]
    UnknownEntity(String),

    #[error("Entity reference '{0}' does not belong to the managed bundle")]
    InvalidEntityReference(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Pagination error: {0}")]
    Pagination(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl ManagerError {
    pub fn no_such_property(property: impl Into<String>, class: impl Into<String>) -> Self {
        Self::NoSuchProperty {
            property: property.into(),
            class: class.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ManagerError>;

impl From<std::io::Error> for ManagerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ManagerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}
