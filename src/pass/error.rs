//! Configuration validation errors raised by the pool pass

use thiserror::Error;

use crate::registry::RegistryError;

#[derive(Debug, Error, PartialEq)]
pub enum PassError {
    #[error(
        "Invalid \"{tag}\" tag for service \"{id}\": accepted attributes are \"clearer\", \"provider\", \"name\", \"namespace\", \"default_lifetime\", \"early_expiration_message_bus\" and \"reset\", found \"{keys}\".",
        keys = .found.join("\", \"")
    )]
    InvalidTagAttributes {
        id: String,
        tag: String,
        found: Vec<String>,
    },

    #[error("Invalid service \"{id}\": chain of adapters cannot reference another chain, found \"{parent}\".")]
    NestedChain { id: String, parent: String },

    #[error("Invalid service \"{id}\": {message}")]
    InvalidAttribute { id: String, message: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl PassError {
    /// Id of the component the error is about, when there is one
    pub fn component_id(&self) -> Option<&str> {
        match self {
            PassError::InvalidTagAttributes { id, .. }
            | PassError::NestedChain { id, .. }
            | PassError::InvalidAttribute { id, .. } => Some(id),
            PassError::Registry(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_attributes_message() {
        let err = PassError::InvalidTagAttributes {
            id: "app.cache".to_string(),
            tag: "cache.pool".to_string(),
            found: vec!["foo".to_string(), "bar".to_string()],
        };

        let message = err.to_string();
        assert!(message.starts_with("Invalid \"cache.pool\" tag for service \"app.cache\""));
        assert!(message.ends_with("found \"foo\", \"bar\"."));
        assert_eq!(err.component_id(), Some("app.cache"));
    }

    #[test]
    fn nested_chain_message() {
        let err = PassError::NestedChain {
            id: "cache.chain".to_string(),
            parent: "cache.inner_chain".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid service \"cache.chain\": chain of adapters cannot reference another chain, found \"cache.inner_chain\"."
        );
    }

    #[test]
    fn registry_errors_are_transparent() {
        let err: PassError = RegistryError::DefinitionNotFound("missing".to_string()).into();
        assert_eq!(err.to_string(), "Component not found: missing");
        assert_eq!(err.component_id(), None);
    }
}
