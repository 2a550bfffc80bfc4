//! Parameter and environment placeholder resolution
//!
//! - `%name%` refers to a container parameter, `%%` is a literal percent
//! - `%env(NAME)%` / `%env(processor:NAME)%` refers to an environment
//!   variable that is only known when the container runs

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::{Captures, Regex};

use super::RegistryError;
use crate::domain::Value;

static PARAMETER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%%|%([^%\s]+)%").expect("parameter pattern is valid"));

static ENV_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"%env\((?:[^():%]+:)*([A-Za-z_][A-Za-z0-9_]*)\)%").expect("env pattern is valid")
});

fn is_env_reference(name: &str) -> bool {
    name.starts_with("env(") && name.ends_with(')')
}

/// Resolves `%param%` references inside a value, recursively
pub(super) fn resolve_value(
    parameters: &IndexMap<String, Value>,
    value: &Value,
) -> Result<Value, RegistryError> {
    let mut stack = Vec::new();
    resolve_with_stack(parameters, value, &mut stack)
}

fn resolve_with_stack(
    parameters: &IndexMap<String, Value>,
    value: &Value,
    stack: &mut Vec<String>,
) -> Result<Value, RegistryError> {
    match value {
        Value::String(s) => resolve_string(parameters, s, stack),
        Value::List(items) => items
            .iter()
            .map(|item| resolve_with_stack(parameters, item, stack))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Value::Map(map) => map
            .iter()
            .map(|(k, v)| Ok((k.clone(), resolve_with_stack(parameters, v, stack)?)))
            .collect::<Result<IndexMap<_, _>, RegistryError>>()
            .map(Value::Map),
        other => Ok(other.clone()),
    }
}

fn lookup(
    parameters: &IndexMap<String, Value>,
    name: &str,
    stack: &mut Vec<String>,
) -> Result<Value, RegistryError> {
    if stack.iter().any(|seen| seen == name) {
        let mut path = stack.clone();
        path.push(name.to_string());
        return Err(RegistryError::CircularParameter(path.join(" -> ")));
    }

    let raw = parameters
        .get(name)
        .ok_or_else(|| RegistryError::ParameterNotFound(name.to_string()))?;

    stack.push(name.to_string());
    let resolved = resolve_with_stack(parameters, raw, stack);
    stack.pop();
    resolved
}

fn resolve_string(
    parameters: &IndexMap<String, Value>,
    s: &str,
    stack: &mut Vec<String>,
) -> Result<Value, RegistryError> {
    // A string that is exactly one parameter keeps the parameter's type
    if let Some(caps) = PARAMETER.captures(s) {
        if let Some(name) = caps.get(1) {
            let whole = caps.get(0).map(|m| m.as_str().len()) == Some(s.len());
            if whole && !is_env_reference(name.as_str()) {
                return lookup(parameters, name.as_str(), stack);
            }
        }
    }

    let mut error = None;
    let replaced = PARAMETER.replace_all(s, |caps: &Captures<'_>| {
        let Some(name) = caps.get(1) else {
            return "%".to_string();
        };
        if is_env_reference(name.as_str()) {
            return caps[0].to_string();
        }
        match lookup(parameters, name.as_str(), stack) {
            Ok(value) => value.to_plain_string().unwrap_or_default(),
            Err(e) => {
                error.get_or_insert(e);
                String::new()
            }
        }
    });

    match error {
        Some(e) => Err(e),
        None => Ok(Value::String(replaced.into_owned())),
    }
}

/// Substitutes known environment variables and reports every variable used
pub(super) fn resolve_env(env: &IndexMap<String, String>, s: &str) -> (String, Vec<String>) {
    let mut used = Vec::new();
    let resolved = ENV_PLACEHOLDER.replace_all(s, |caps: &Captures<'_>| {
        let name = caps[1].to_string();
        let replacement = env.get(&name).cloned().unwrap_or_else(|| caps[0].to_string());
        if !used.contains(&name) {
            used.push(name);
        }
        replacement
    });
    (resolved.into_owned(), used)
}
