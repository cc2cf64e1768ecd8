pub mod error;
pub mod value;

pub use error::{ManagerError, Result};
pub use value::{Row, Value};
