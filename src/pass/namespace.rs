//! Seed and namespace derivation
//!
//! Namespace format: the first 10 characters of
//! `base64(sha256(name + seed[.class]))`, with `/` replaced by `-`.
//! Same name, class and seed always give the same namespace.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha2::{Digest, Sha256};

use crate::config::SeedParameters;
use crate::domain::Value;
use crate::registry::{Registry, RegistryError};

const NAMESPACE_LEN: usize = 10;

/// Computes the build seed shared by every pool namespace
///
/// An explicit seed parameter is used verbatim (after parameter
/// resolution); otherwise the seed is `_<project dir>.<container class>`.
pub fn compute_seed(registry: &Registry, params: &SeedParameters) -> Result<String, RegistryError> {
    if registry.has_parameter(&params.seed) {
        let raw = registry.get_parameter(&params.seed)?;
        let resolved = registry.resolve_value(raw)?;
        return Ok(resolved.to_plain_string().unwrap_or_default());
    }

    let project_dir = parameter_string(registry, &params.project_dir)?;
    let container_class = parameter_string(registry, &params.container_class)?;

    Ok(format!("_{}.{}", project_dir, container_class))
}

fn parameter_string(registry: &Registry, name: &str) -> Result<String, RegistryError> {
    if !registry.has_parameter(name) {
        tracing::debug!(parameter = name, "seed parameter not defined, using an empty value");
        return Ok(String::new());
    }
    let resolved = registry.resolve_value(registry.get_parameter(name)?)?;
    Ok(match resolved {
        Value::Null => String::new(),
        other => other.to_plain_string().unwrap_or_default(),
    })
}

/// Derives the namespace of a pool
pub fn derive_namespace(seed: &str, class: Option<&str>, name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update(seed.as_bytes());
    if let Some(class) = class {
        hasher.update(b".");
        hasher.update(class.as_bytes());
    }

    let encoded = STANDARD.encode(hasher.finalize());
    encoded[..NAMESPACE_LEN].replace('/', "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn seed_from_project_and_container_class() {
        let mut registry = Registry::new();
        registry.set_parameter("kernel.project_dir", "/proj");
        registry.set_parameter("kernel.container_class", "App\\Kernel");

        let seed = compute_seed(&registry, &SeedParameters::default()).unwrap();
        assert_eq!(seed, "_/proj.App\\Kernel");
    }

    #[test]
    fn explicit_seed_wins() {
        let mut registry = Registry::new();
        registry.set_parameter("kernel.project_dir", "/proj");
        registry.set_parameter("kernel.container_class", "App\\Kernel");
        registry.set_parameter("app.secret", "s3cr3t");
        registry.set_parameter("cache.prefix.seed", "%app.secret%-v2");

        let seed = compute_seed(&registry, &SeedParameters::default()).unwrap();
        assert_eq!(seed, "s3cr3t-v2");
    }

    #[test]
    fn missing_parameters_give_a_bare_seed() {
        let seed = compute_seed(&Registry::new(), &SeedParameters::default()).unwrap();
        assert_eq!(seed, "_.");
    }

    #[test]
    fn class_is_appended_to_the_seed() {
        let with_class = derive_namespace("_/proj.App\\Kernel", Some("GenericAdapter"), "app.cache.foo");
        let same_input = {
            let mut hasher = Sha256::new();
            hasher.update(b"app.cache.foo_/proj.App\\Kernel.GenericAdapter");
            STANDARD.encode(hasher.finalize())[..10].replace('/', "-")
        };
        assert_eq!(with_class, same_input);
        assert_ne!(with_class, derive_namespace("_/proj.App\\Kernel", None, "app.cache.foo"));
    }

    #[test]
    fn known_namespace() {
        // sha256("foo") = 2c26b46b68ffc68ff99b453c1d30413413422d706483bfa0f98a5e886266e7ae
        assert_eq!(derive_namespace("", None, "foo"), "LCa0a2j-xo");
    }

    proptest! {
        #[test]
        fn namespace_is_stable_and_token_safe(
            seed in ".{0,40}",
            class in proptest::option::of("[A-Za-z\\\\]{1,30}"),
            name in "[a-z._]{1,30}",
        ) {
            let first = derive_namespace(&seed, class.as_deref(), &name);
            let second = derive_namespace(&seed, class.as_deref(), &name);

            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.len(), 10);
            prop_assert!(!first.contains('/'));
        }

        #[test]
        fn seed_changes_namespace(name in "[a-z._]{1,30}") {
            prop_assert_ne!(
                derive_namespace("_/proj.App\\Kernel", None, &name),
                derive_namespace("_/other.App\\Kernel", None, &name)
            );
        }
    }
}
