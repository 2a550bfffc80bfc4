//! Argument and tag-attribute values
//!
//! A [`Value`] is anything that can sit in a constructor argument slot, a
//! method-call argument list or a tag attribute: scalars, collections,
//! references to other components and inline (anonymous) definitions.

use std::fmt;

use indexmap::IndexMap;

use super::definition::Definition;

/// What the container does when a referenced component is missing or not
/// yet built at the time the reference is dereferenced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidBehavior {
    /// Fail the build
    #[default]
    Exception,
    /// Yield nothing until the target has been initialized by someone else
    IgnoreOnUninitialized,
}

/// A reference to another component by id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub id: String,
    pub invalid_behavior: InvalidBehavior,
}

impl Reference {
    /// Creates a strict reference
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            invalid_behavior: InvalidBehavior::Exception,
        }
    }

    /// Creates a reference that tolerates an uninitialized target
    pub fn ignore_on_uninitialized(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            invalid_behavior: InvalidBehavior::IgnoreOnUninitialized,
        }
    }

    pub fn is_lenient(&self) -> bool {
        self.invalid_behavior == InvalidBehavior::IgnoreOnUninitialized
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.invalid_behavior {
            InvalidBehavior::Exception => write!(f, "@{}", self.id),
            InvalidBehavior::IgnoreOnUninitialized => write!(f, "@?{}", self.id),
        }
    }
}

/// A value usable as an argument or tag attribute
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    Reference(Reference),
    Definition(Box<Definition>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true for values that count as "set" on a tag
    pub fn is_set(&self) -> bool {
        !self.is_null()
    }

    /// Loose truthiness, as used by the `reset` tag attribute
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty() && s != "0",
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::Reference(_) | Value::Definition(_) => true,
        }
    }

    /// Returns true for numbers and strings holding a number
    pub fn is_numeric(&self) -> bool {
        match self {
            Value::Int(_) | Value::Float(_) => true,
            Value::String(s) => {
                let s = s.trim();
                !s.is_empty() && s.parse::<f64>().is_ok_and(f64::is_finite)
            }
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Renders scalars as plain strings (used for names and provider ids)
    pub fn to_plain_string(&self) -> Option<String> {
        match self {
            Value::String(s) => Some(s.clone()),
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Bool(b) => Some(if *b { "1".to_string() } else { String::new() }),
            Value::Reference(r) => Some(r.id.clone()),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Reference> for Value {
    fn from(r: Reference) -> Self {
        Value::Reference(r)
    }
}

impl From<Definition> for Value {
    fn from(d: Definition) -> Self {
        Value::Definition(Box::new(d))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::from("0").is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::from("reset").is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
    }

    #[test]
    fn numeric_detection() {
        assert!(Value::Int(300).is_numeric());
        assert!(Value::Float(1.5).is_numeric());
        assert!(Value::from("300").is_numeric());
        assert!(Value::from(" 12.5 ").is_numeric());
        assert!(!Value::from("5 minutes").is_numeric());
        assert!(!Value::from("").is_numeric());
        assert!(!Value::Null.is_numeric());
    }

    #[test]
    fn reference_display() {
        assert_eq!(Reference::new("cache.app").to_string(), "@cache.app");
        assert_eq!(
            Reference::ignore_on_uninitialized("cache.app").to_string(),
            "@?cache.app"
        );
    }
}
