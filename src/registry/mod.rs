//! # Component Registry
//!
//! The in-memory container being built: component definitions, aliases,
//! parameters and the environment table used for placeholder resolution.
//! Build passes read and mutate it in place.
//!
//! ## Key Types
//!
//! - [`Registry`] - definitions, aliases and parameters keyed by id
//! - [`RegistryError`] - lookup failures
//! - [`loader`] - reads a container description from TOML, YAML or JSON

pub mod loader;
mod placeholders;

use std::collections::HashSet;

use indexmap::IndexMap;
use thiserror::Error;

use crate::domain::{Definition, TagAttributes, Value};

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("Component not found: {0}")]
    DefinitionNotFound(String),

    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),

    #[error("Circular alias detected: {0}")]
    CircularAlias(String),

    #[error("Circular definition inheritance detected: {0}")]
    CircularParent(String),

    #[error("Circular parameter reference detected: {0}")]
    CircularParameter(String),
}

/// Definitions, aliases and parameters of one container build
#[derive(Debug, Clone, Default)]
pub struct Registry {
    definitions: IndexMap<String, Definition>,
    aliases: IndexMap<String, String>,
    parameters: IndexMap<String, Value>,
    env: IndexMap<String, String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------------
    // Definitions
    // ---------------------------------------------------------------------

    /// Registers (or replaces) a definition and returns it for further edits
    pub fn set_definition(&mut self, id: impl Into<String>, definition: Definition) -> &mut Definition {
        let id = id.into();
        self.aliases.shift_remove(&id);
        match self.definitions.entry(id) {
            indexmap::map::Entry::Occupied(mut slot) => {
                slot.insert(definition);
                slot.into_mut()
            }
            indexmap::map::Entry::Vacant(slot) => slot.insert(definition),
        }
    }

    pub fn has_definition(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    pub fn get_definition(&self, id: &str) -> Result<&Definition, RegistryError> {
        self.definitions
            .get(id)
            .ok_or_else(|| RegistryError::DefinitionNotFound(id.to_string()))
    }

    pub fn get_definition_mut(&mut self, id: &str) -> Result<&mut Definition, RegistryError> {
        self.definitions
            .get_mut(id)
            .ok_or_else(|| RegistryError::DefinitionNotFound(id.to_string()))
    }

    /// Looks a definition up after following aliases
    pub fn find_definition(&self, id: &str) -> Result<&Definition, RegistryError> {
        let id = self.resolve_alias(id)?;
        self.get_definition(&id)
    }

    /// Removes a definition, keeping the order of the others
    pub fn remove_definition(&mut self, id: &str) -> Option<Definition> {
        self.definitions.shift_remove(id)
    }

    pub fn definitions(&self) -> impl Iterator<Item = (&String, &Definition)> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Returns every definition carrying `tag`, with all its occurrences,
    /// in registration order
    pub fn find_tagged(&self, tag: &str) -> IndexMap<String, Vec<TagAttributes>> {
        self.definitions
            .iter()
            .filter(|(_, def)| def.has_tag(tag))
            .map(|(id, def)| (id.clone(), def.tag(tag).to_vec()))
            .collect()
    }

    /// Walks the inheritance chain of `id`, starting with `id` itself
    ///
    /// The callback sees each definition from the most derived to the root.
    pub fn walk_ancestors<'a>(
        &'a self,
        start: &'a Definition,
        start_id: &str,
        mut visit: impl FnMut(&'a Definition),
    ) -> Result<&'a Definition, RegistryError> {
        let mut seen = HashSet::new();
        seen.insert(start_id.to_string());

        let mut current = start;
        visit(current);
        while let Some(parent) = current.parent() {
            let parent_id = self.resolve_alias(parent)?;
            if !seen.insert(parent_id.clone()) {
                return Err(RegistryError::CircularParent(format!(
                    "{} -> {}",
                    start_id, parent_id
                )));
            }
            current = self.get_definition(&parent_id)?;
            visit(current);
        }
        Ok(current)
    }

    // ---------------------------------------------------------------------
    // Aliases
    // ---------------------------------------------------------------------

    pub fn set_alias(&mut self, alias: impl Into<String>, target: impl Into<String>) {
        self.aliases.insert(alias.into(), target.into());
    }

    pub fn has_alias(&self, id: &str) -> bool {
        self.aliases.contains_key(id)
    }

    pub fn aliases(&self) -> impl Iterator<Item = (&String, &String)> {
        self.aliases.iter()
    }

    /// Follows alias indirections until reaching an id that is not an alias
    pub fn resolve_alias(&self, id: &str) -> Result<String, RegistryError> {
        let mut current = id.to_string();
        let mut seen = HashSet::new();

        while let Some(target) = self.aliases.get(&current) {
            if !seen.insert(current.clone()) {
                return Err(RegistryError::CircularAlias(id.to_string()));
            }
            current = target.clone();
        }

        Ok(current)
    }

    // ---------------------------------------------------------------------
    // Parameters and environment
    // ---------------------------------------------------------------------

    pub fn set_parameter(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.parameters.insert(name.into(), value.into());
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains_key(name)
    }

    pub fn get_parameter(&self, name: &str) -> Result<&Value, RegistryError> {
        self.parameters
            .get(name)
            .ok_or_else(|| RegistryError::ParameterNotFound(name.to_string()))
    }

    pub fn parameters(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.parameters.iter()
    }

    /// Resolves `%param%` references inside a value
    pub fn resolve_value(&self, value: &Value) -> Result<Value, RegistryError> {
        placeholders::resolve_value(&self.parameters, value)
    }

    /// Sets the build-time value of an environment variable
    pub fn set_env(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.env.insert(name.into(), value.into());
    }

    pub fn env(&self) -> impl Iterator<Item = (&String, &String)> {
        self.env.iter()
    }

    /// Substitutes known `%env(...)%` placeholders, returning the result
    /// and the names of every environment variable referenced
    pub fn resolve_env_placeholders(&self, s: &str) -> (String, Vec<String>) {
        placeholders::resolve_env(&self.env, s)
    }

    /// Stable 7-character hash used to name synthesized components
    pub fn hash(value: &str) -> String {
        let hash = blake3::hash(value.as_bytes());
        hash.to_hex()[..7].to_string()
    }

    /// Full 64-character form of [`Registry::hash`], used when the short
    /// form is already taken by a different value
    pub fn full_hash(value: &str) -> String {
        blake3::hash(value.as_bytes()).to_hex().to_string()
    }
}
