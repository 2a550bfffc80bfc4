//! Container description files
//!
//! A container description lists parameters, environment values, aliases
//! and service definitions. TOML, YAML and JSON are accepted; all three go
//! through the same JSON-shaped tree.
//!
//! ```toml
//! [parameters]
//! "kernel.project_dir" = "/srv/app"
//!
//! [aliases]
//! "cache.global_clearer" = "cache.default_clearer"
//!
//! [services."cache.app"]
//! parent = "cache.adapter.filesystem"
//! tags = [{ name = "cache.pool", clearer = "cache.app_clearer" }]
//! ```
//!
//! Value conventions inside arguments and tag attributes:
//!
//! | Written as | Meaning |
//! |------------|---------|
//! | `"@id"` | reference to component `id` |
//! | `"@?id"` | reference tolerating an uninitialized target |
//! | `"@@text"` | the literal string `@text` |
//! | `{ "$service" = { ... } }` | inline definition |

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde_json::{json, Map as JsonMap, Value as Json};
use thiserror::Error;

use super::Registry;
use crate::domain::{Definition, Factory, MethodCall, Reference, TagAttributes, Value};

const INLINE_SERVICE_KEY: &str = "$service";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported container format: {0} (expected toml, yaml, yml or json)")]
    UnsupportedFormat(String),

    #[error("Failed to parse {format} container description: {message}")]
    Parse { format: Format, message: String },

    #[error("Invalid container description at {location}: {message}")]
    Invalid { location: String, message: String },
}

fn invalid(location: &str, message: impl Into<String>) -> LoadError {
    LoadError::Invalid {
        location: location.to_string(),
        message: message.into(),
    }
}

/// Container description syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Yaml,
    Json,
}

impl Format {
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        match ext.as_str() {
            "toml" => Ok(Format::Toml),
            "yaml" | "yml" => Ok(Format::Yaml),
            "json" => Ok(Format::Json),
            other => Err(LoadError::UnsupportedFormat(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Format::Toml => "toml",
            Format::Yaml => "yaml",
            Format::Json => "json",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reads a container description from disk
pub fn load_file(path: &Path) -> Result<Registry, LoadError> {
    let format = Format::from_path(path)?;
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    load_str(&content, format)
}

/// Parses a container description
pub fn load_str(content: &str, format: Format) -> Result<Registry, LoadError> {
    let parse_error = |message: String| LoadError::Parse { format, message };

    let tree: Json = match format {
        Format::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string()))?,
        Format::Yaml => serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))?,
        Format::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string()))?,
    };

    from_json(&tree)
}

fn from_json(tree: &Json) -> Result<Registry, LoadError> {
    let root = match tree {
        Json::Object(root) => root,
        Json::Null => return Ok(Registry::new()),
        _ => return Err(invalid("<root>", "expected a table")),
    };

    let mut registry = Registry::new();

    for (key, section) in root {
        match key.as_str() {
            "parameters" => {
                for (name, value) in object(section, "parameters")? {
                    let location = format!("parameters.{}", name);
                    registry.set_parameter(name.clone(), parse_value(value, &location)?);
                }
            }
            "env" => {
                for (name, value) in object(section, "env")? {
                    let value = scalar_string(value)
                        .ok_or_else(|| invalid(&format!("env.{}", name), "expected a scalar"))?;
                    registry.set_env(name.clone(), value);
                }
            }
            "aliases" => {
                for (alias, target) in object(section, "aliases")? {
                    let target = target
                        .as_str()
                        .ok_or_else(|| invalid(&format!("aliases.{}", alias), "expected a service id"))?;
                    registry.set_alias(alias.clone(), target.trim_start_matches('@'));
                }
            }
            "services" => {
                for (id, spec) in object(section, "services")? {
                    let location = format!("services.{}", id);
                    // `alias = "target"` declares an alias inline
                    if let Some(target) = spec.get("alias").and_then(Json::as_str) {
                        registry.set_alias(id.clone(), target.trim_start_matches('@'));
                        continue;
                    }
                    let definition = parse_definition(spec, &location)?;
                    registry.set_definition(id.clone(), definition);
                }
            }
            other => return Err(invalid(other, "unknown section")),
        }
    }

    Ok(registry)
}

fn object<'a>(value: &'a Json, location: &str) -> Result<&'a JsonMap<String, Json>, LoadError> {
    match value {
        Json::Object(map) => Ok(map),
        _ => Err(invalid(location, "expected a table")),
    }
}

fn scalar_string(value: &Json) -> Option<String> {
    match value {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        Json::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_value(value: &Json, location: &str) -> Result<Value, LoadError> {
    Ok(match value {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or_default()),
        },
        Json::String(s) => parse_string(s),
        Json::Array(items) => Value::List(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| parse_value(item, &format!("{}[{}]", location, i)))
                .collect::<Result<_, _>>()?,
        ),
        Json::Object(map) => {
            if let (1, Some(inline)) = (map.len(), map.get(INLINE_SERVICE_KEY)) {
                let location = format!("{}.{}", location, INLINE_SERVICE_KEY);
                return Ok(Value::Definition(Box::new(parse_definition(inline, &location)?)));
            }
            Value::Map(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), parse_value(v, &format!("{}.{}", location, k))?)))
                    .collect::<Result<IndexMap<_, _>, LoadError>>()?,
            )
        }
    })
}

fn parse_string(s: &str) -> Value {
    if let Some(literal) = s.strip_prefix("@@") {
        Value::String(format!("@{}", literal))
    } else if let Some(id) = s.strip_prefix("@?") {
        Value::Reference(Reference::ignore_on_uninitialized(id))
    } else if let Some(id) = s.strip_prefix('@').filter(|id| !id.is_empty()) {
        Value::Reference(Reference::new(id))
    } else {
        Value::String(s.to_string())
    }
}

fn parse_definition(spec: &Json, location: &str) -> Result<Definition, LoadError> {
    // A bare string is shorthand for a class name
    if let Json::String(class) = spec {
        return Ok(Definition::new(class.clone()));
    }
    if spec.is_null() {
        return Ok(Definition::default());
    }

    let spec = object(spec, location)?;
    let mut def = Definition::default();

    for (key, value) in spec {
        let here = format!("{}.{}", location, key);
        match key.as_str() {
            "class" => def.class = Some(expect_str(value, &here)?.to_string()),
            "parent" => def.parent = Some(expect_str(value, &here)?.trim_start_matches('@').to_string()),
            "abstract" => def.is_abstract = expect_bool(value, &here)?,
            "public" => def.public = expect_bool(value, &here)?,
            "lazy" => def.lazy = expect_bool(value, &here)?,
            "arguments" => match value {
                Json::Array(items) => {
                    def.arguments = items
                        .iter()
                        .enumerate()
                        .map(|(i, item)| parse_value(item, &format!("{}[{}]", here, i)))
                        .collect::<Result<_, _>>()?;
                }
                _ => return Err(invalid(&here, "expected a list")),
            },
            "calls" => match value {
                Json::Array(items) => {
                    for (i, item) in items.iter().enumerate() {
                        def.method_calls.push(parse_call(item, &format!("{}[{}]", here, i))?);
                    }
                }
                _ => return Err(invalid(&here, "expected a list")),
            },
            "tags" => match value {
                Json::Array(items) => {
                    for (i, item) in items.iter().enumerate() {
                        let (name, attributes) = parse_tag(item, &format!("{}[{}]", here, i))?;
                        def.add_tag(name, attributes);
                    }
                }
                _ => return Err(invalid(&here, "expected a list")),
            },
            "factory" => def.factory = Some(parse_factory(value, &here)?),
            other => return Err(invalid(&here, format!("unknown definition key '{}'", other))),
        }
    }

    Ok(def)
}

fn expect_str<'a>(value: &'a Json, location: &str) -> Result<&'a str, LoadError> {
    value.as_str().ok_or_else(|| invalid(location, "expected a string"))
}

fn expect_bool(value: &Json, location: &str) -> Result<bool, LoadError> {
    value.as_bool().ok_or_else(|| invalid(location, "expected a boolean"))
}

fn parse_call(item: &Json, location: &str) -> Result<MethodCall, LoadError> {
    let call = object(item, location)?;
    let method = call
        .get("method")
        .and_then(Json::as_str)
        .ok_or_else(|| invalid(location, "method call needs a 'method'"))?;

    let arguments = match call.get("arguments") {
        None => Vec::new(),
        Some(Json::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, arg)| parse_value(arg, &format!("{}.arguments[{}]", location, i)))
            .collect::<Result<_, _>>()?,
        Some(_) => return Err(invalid(location, "method call arguments must be a list")),
    };

    Ok(MethodCall {
        method: method.to_string(),
        arguments,
    })
}

fn parse_tag(item: &Json, location: &str) -> Result<(String, TagAttributes), LoadError> {
    match item {
        Json::String(name) => Ok((name.clone(), TagAttributes::new())),
        Json::Object(map) => {
            let name = map
                .get("name")
                .and_then(Json::as_str)
                .ok_or_else(|| invalid(location, "tag needs a 'name'"))?;

            let mut attributes = TagAttributes::new();
            for (key, value) in map.iter().filter(|(k, _)| k.as_str() != "name") {
                attributes.insert(key.clone(), parse_value(value, &format!("{}.{}", location, key))?);
            }
            Ok((name.to_string(), attributes))
        }
        _ => Err(invalid(location, "tag must be a name or a table")),
    }
}

fn parse_factory(value: &Json, location: &str) -> Result<Factory, LoadError> {
    match value {
        Json::String(s) => {
            let (class, method) = s
                .split_once("::")
                .ok_or_else(|| invalid(location, "factory string must be 'Class::method'"))?;
            Ok(Factory::Static {
                class: class.to_string(),
                method: method.to_string(),
            })
        }
        Json::Array(parts) if parts.len() == 2 => {
            let target = expect_str(&parts[0], location)?;
            let method = expect_str(&parts[1], location)?.to_string();
            match target.strip_prefix('@') {
                Some(id) => Ok(Factory::Service {
                    target: Reference::new(id),
                    method,
                }),
                None => Ok(Factory::Static {
                    class: target.to_string(),
                    method,
                }),
            }
        }
        _ => Err(invalid(location, "factory must be 'Class::method' or [target, method]")),
    }
}

// -------------------------------------------------------------------------
// Dumping
// -------------------------------------------------------------------------

/// Renders the registry with the same conventions the loader reads
pub fn to_json(registry: &Registry) -> Json {
    let parameters: JsonMap<String, Json> = registry
        .parameters()
        .map(|(k, v)| (k.clone(), value_to_json(v)))
        .collect();
    let env: JsonMap<String, Json> = registry
        .env()
        .map(|(k, v)| (k.clone(), Json::String(v.clone())))
        .collect();
    let aliases: JsonMap<String, Json> = registry
        .aliases()
        .map(|(k, v)| (k.clone(), Json::String(v.clone())))
        .collect();
    let services: JsonMap<String, Json> = registry
        .definitions()
        .map(|(id, def)| (id.clone(), definition_to_json(def)))
        .collect();

    json!({
        "parameters": parameters,
        "env": env,
        "aliases": aliases,
        "services": services,
    })
}

pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => json!(i),
        Value::Float(f) => json!(f),
        Value::String(s) if s.starts_with('@') => Json::String(format!("@{}", s)),
        Value::String(s) => Json::String(s.clone()),
        Value::List(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Map(map) => Json::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
        Value::Reference(r) => Json::String(r.to_string()),
        Value::Definition(def) => {
            let mut inline = JsonMap::new();
            inline.insert(INLINE_SERVICE_KEY.to_string(), definition_to_json(def));
            Json::Object(inline)
        }
    }
}

pub fn definition_to_json(def: &Definition) -> Json {
    let mut out = JsonMap::new();

    if let Some(class) = &def.class {
        out.insert("class".into(), Json::String(class.clone()));
    }
    if let Some(parent) = &def.parent {
        out.insert("parent".into(), Json::String(parent.clone()));
    }
    if def.is_abstract {
        out.insert("abstract".into(), Json::Bool(true));
    }
    if !def.public {
        out.insert("public".into(), Json::Bool(false));
    }
    if def.lazy {
        out.insert("lazy".into(), Json::Bool(true));
    }
    if let Some(factory) = &def.factory {
        let factory = match factory {
            Factory::Static { class, method } => Json::String(format!("{}::{}", class, method)),
            Factory::Service { target, method } => json!([format!("@{}", target.id), method]),
        };
        out.insert("factory".into(), factory);
    }
    if !def.arguments.is_empty() {
        out.insert(
            "arguments".into(),
            Json::Array(def.arguments.iter().map(value_to_json).collect()),
        );
    }
    if !def.method_calls.is_empty() {
        let calls = def
            .method_calls
            .iter()
            .map(|call| {
                json!({
                    "method": call.method,
                    "arguments": call.arguments.iter().map(value_to_json).collect::<Vec<_>>(),
                })
            })
            .collect();
        out.insert("calls".into(), Json::Array(calls));
    }
    if !def.tags.is_empty() {
        let mut tags = Vec::new();
        for (name, occurrences) in &def.tags {
            for attributes in occurrences {
                let mut tag = JsonMap::new();
                tag.insert("name".into(), Json::String(name.clone()));
                for (k, v) in attributes {
                    tag.insert(k.clone(), value_to_json(v));
                }
                tags.push(Json::Object(tag));
            }
        }
        out.insert("tags".into(), Json::Array(tags));
    }

    Json::Object(out)
}
