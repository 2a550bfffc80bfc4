//! Adapter kinds the pool pass treats specially

use serde::{Deserialize, Serialize};

/// Class ids of the adapters with dedicated wiring rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterClasses {
    /// Adapter composed of an ordered list of nested pools
    pub chain: String,
    /// In-memory adapter (takes no namespace)
    pub array: String,
    /// No-op adapter (takes no namespace)
    pub null: String,
}

impl Default for AdapterClasses {
    fn default() -> Self {
        Self {
            chain: "Symfony\\Component\\Cache\\Adapter\\ChainAdapter".to_string(),
            array: "Symfony\\Component\\Cache\\Adapter\\ArrayAdapter".to_string(),
            null: "Symfony\\Component\\Cache\\Adapter\\NullAdapter".to_string(),
        }
    }
}

/// Adapter kind of a pool, derived from its resolved class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    Chain,
    Array,
    Null,
    Other,
}

impl AdapterKind {
    pub fn classify(class: Option<&str>, classes: &AdapterClasses) -> Self {
        match class {
            Some(c) if c == classes.chain => AdapterKind::Chain,
            Some(c) if c == classes.array => AdapterKind::Array,
            Some(c) if c == classes.null => AdapterKind::Null,
            _ => AdapterKind::Other,
        }
    }

    /// Adapters that ignore the namespace argument
    pub fn is_trivial(self) -> bool {
        match self {
            AdapterKind::Array | AdapterKind::Null => true,
            AdapterKind::Chain | AdapterKind::Other => false,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AdapterKind::Chain => "chain",
            AdapterKind::Array => "array",
            AdapterKind::Null => "null",
            AdapterKind::Other => "other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_known_classes() {
        let classes = AdapterClasses::default();

        assert_eq!(
            AdapterKind::classify(Some(&classes.chain), &classes),
            AdapterKind::Chain
        );
        assert_eq!(
            AdapterKind::classify(Some(&classes.null), &classes),
            AdapterKind::Null
        );
        assert_eq!(
            AdapterKind::classify(Some("App\\RedisAdapter"), &classes),
            AdapterKind::Other
        );
        assert_eq!(AdapterKind::classify(None, &classes), AdapterKind::Other);
    }

    #[test]
    fn only_memory_and_null_are_trivial() {
        assert!(AdapterKind::Array.is_trivial());
        assert!(AdapterKind::Null.is_trivial());
        assert!(!AdapterKind::Chain.is_trivial());
        assert!(!AdapterKind::Other.is_trivial());
    }
}
