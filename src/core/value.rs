use crate::core::{ManagerError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A projected row, one value per selected field.
pub type Row = Vec<Value>;

/// Field value of a managed record.
///
/// Serialized untagged so records read naturally as JSON objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
        }
    }

    fn number(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Sort order used by queries. NULL sorts after everything else; integers
    /// and floats compare numerically; other mixed kinds are an error.
    pub fn compare(&self, other: &Value) -> Result<Ordering> {
        match (self, other) {
            (Self::Null, Self::Null) => Ok(Ordering::Equal),
            (Self::Null, _) => Ok(Ordering::Greater),
            (_, Self::Null) => Ok(Ordering::Less),
            (Self::Integer(a), Self::Integer(b)) => Ok(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Ok(a.cmp(b)),
            (Self::Boolean(a), Self::Boolean(b)) => Ok(a.cmp(b)),
            _ => match (self.number(), other.number()) {
                (Some(a), Some(b)) => Ok(a.total_cmp(&b)),
                _ => Err(ManagerError::TypeMismatch(format!(
                    "cannot order {} against {}",
                    self.kind(),
                    other.kind()
                ))),
            },
        }
    }

    /// Truthiness of a boolean-like state field.
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Boolean(b) => *b,
            Self::Integer(i) => *i != 0,
            Self::Float(f) => *f != 0.0 && !f.is_nan(),
            Self::Text(s) => !s.is_empty() && s != "0",
        }
    }

    /// Identifier form: integers, or text holding an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Strict comparison: same variant and same payload, no numeric coercion.
    pub fn is_identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Float(_), _) | (_, Self::Float(_)) => false,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other) && self == other,
        }
    }
}

/// Criteria equality: integers and floats compare numerically.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            _ => matches!((self.number(), other.number()), (Some(a), Some(b)) if a == b),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Text(s) => f.write_str(s),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Boolean,
    i32 => Integer,
    i64 => Integer,
    f64 => Float,
    String => Text,
    &str => Text,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_criteria_equality_is_numeric() {
        assert_eq!(Value::Integer(42), Value::Integer(42));
        assert_eq!(Value::Integer(1), Value::Float(1.0));
        assert_ne!(Value::Integer(1), Value::Text("1".into()));
        assert_ne!(Value::Integer(1), Value::Boolean(true));
    }

    #[test]
    fn test_identical_does_not_coerce() {
        assert!(Value::Integer(1).is_identical(&Value::Integer(1)));
        assert!(!Value::Integer(1).is_identical(&Value::Boolean(true)));
        assert!(!Value::Integer(1).is_identical(&Value::Float(1.0)));
        assert!(Value::Text("a".into()).is_identical(&Value::from("a")));
    }

    #[test]
    fn test_compare_nulls_last() {
        assert_eq!(
            Value::Null.compare(&Value::Integer(3)).unwrap(),
            Ordering::Greater
        );
        assert_eq!(
            Value::Integer(2).compare(&Value::Float(2.5)).unwrap(),
            Ordering::Less
        );
        assert!(Value::Text("a".into()).compare(&Value::Integer(1)).is_err());
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_string(&vec![
            Value::Integer(7),
            Value::Text("x".into()),
            Value::Boolean(true),
            Value::Null,
        ])
        .unwrap();
        assert_eq!(json, r#"[7,"x",true,null]"#);
    }
}
