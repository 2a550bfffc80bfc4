//! Provider reference resolution
//!
//! A `provider` attribute is either a component id or a DSN. DSNs (a
//! `scheme:` prefix, or any `%env(...)%` placeholder) get a hidden
//! connection component named `.cache_connection.<hash>`, created once per
//! distinct DSN.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::config::FactoryNames;
use crate::domain::{Definition, Factory, Value};
use crate::registry::Registry;

const CONNECTION_PREFIX: &str = ".cache_connection.";

static DSN_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]+:").expect("scheme pattern is valid"));

/// Outcome of resolving one provider attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProvider {
    /// Id the pool should reference
    pub id: String,
    /// True when this call registered the connection component
    pub created: bool,
}

/// Returns the component id a provider attribute points at
pub fn resolve_provider(registry: &mut Registry, factories: &FactoryNames, name: &str) -> ResolvedProvider {
    let (resolved, used_env) = registry.resolve_env_placeholders(name);

    if used_env.is_empty() && !DSN_SCHEME.is_match(&resolved) {
        return ResolvedProvider {
            id: name.to_string(),
            created: false,
        };
    }

    let mut id = format!("{}{}", CONNECTION_PREFIX, Registry::hash(name));
    if let Ok(existing) = registry.get_definition(&id) {
        if connection_dsn(existing) == Some(name) {
            return ResolvedProvider { id, created: false };
        }
        // Short hash already names another DSN's connection
        id = format!("{}{}", CONNECTION_PREFIX, Registry::full_hash(name));
        if registry.has_definition(&id) {
            return ResolvedProvider { id, created: false };
        }
    }

    let mut options = IndexMap::new();
    options.insert("lazy".to_string(), Value::Bool(true));

    let mut connection = Definition::new(factories.connection_class.clone())
        .with_factory(Factory::Static {
            class: factories.connection_class.clone(),
            method: factories.connection_method.clone(),
        })
        .with_argument(name)
        .with_argument(Value::Map(options));
    connection.public = false;

    tracing::debug!(dsn = name, connection = %id, env = ?used_env, "registering connection for DSN provider");
    registry.set_definition(id.clone(), connection);

    ResolvedProvider { id, created: true }
}

fn connection_dsn(connection: &Definition) -> Option<&str> {
    connection.argument(0).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_ids_are_returned_unchanged() {
        let mut registry = Registry::new();
        let resolved = resolve_provider(&mut registry, &FactoryNames::default(), "cache.default_redis_provider");

        assert_eq!(resolved.id, "cache.default_redis_provider");
        assert!(!resolved.created);
        assert!(registry.is_empty());
    }

    #[test]
    fn dsn_creates_hidden_connection_once() {
        let mut registry = Registry::new();
        let factories = FactoryNames::default();

        let first = resolve_provider(&mut registry, &factories, "redis://localhost:6379");
        let second = resolve_provider(&mut registry, &factories, "redis://localhost:6379");

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.id, second.id);
        assert!(first.id.starts_with(".cache_connection."));
        assert_eq!(registry.len(), 1);

        let connection = registry.get_definition(&first.id).unwrap();
        assert!(!connection.public);
        assert_eq!(connection.arguments[0], Value::from("redis://localhost:6379"));
        assert!(matches!(&connection.arguments[1], Value::Map(m) if m.get("lazy") == Some(&Value::Bool(true))));
        assert_eq!(
            connection.factory,
            Some(Factory::Static {
                class: factories.connection_class.clone(),
                method: "createConnection".to_string(),
            })
        );
    }

    #[test]
    fn env_placeholders_mark_a_dsn() {
        let mut registry = Registry::new();
        let resolved = resolve_provider(&mut registry, &FactoryNames::default(), "%env(CACHE_DSN)%");

        assert!(resolved.created);
        let connection = registry.get_definition(&resolved.id).unwrap();
        assert_eq!(connection.arguments[0], Value::from("%env(CACHE_DSN)%"));
    }

    #[test]
    fn distinct_dsns_get_distinct_connections() {
        let mut registry = Registry::new();
        let factories = FactoryNames::default();

        let a = resolve_provider(&mut registry, &factories, "redis://a");
        let b = resolve_provider(&mut registry, &factories, "memcached://b");
        assert_ne!(a.id, b.id);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn taken_short_hash_falls_back_to_full_hash() {
        let mut registry = Registry::new();
        let factories = FactoryNames::default();
        let short = format!(".cache_connection.{}", Registry::hash("redis://a"));
        registry.set_definition(short.clone(), Definition::new("Connection").with_argument("memcached://other"));

        let first = resolve_provider(&mut registry, &factories, "redis://a");
        assert!(first.created);
        assert_eq!(first.id, format!(".cache_connection.{}", Registry::full_hash("redis://a")));
        assert_eq!(registry.get_definition(&short).unwrap().arguments[0], Value::from("memcached://other"));

        let again = resolve_provider(&mut registry, &factories, "redis://a");
        assert!(!again.created);
        assert_eq!(again.id, first.id);
        assert_eq!(registry.len(), 2);
    }
}
