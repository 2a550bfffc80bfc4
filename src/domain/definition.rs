//! Component definitions
//!
//! A [`Definition`] describes how the container will construct one
//! component: its class, ordered constructor arguments, method calls to
//! run after construction and the tags other build passes look for. A
//! definition with a `parent` inherits from another definition; only the
//! argument slots it overrides are stored on it.

use indexmap::IndexMap;

use super::value::{Reference, Value};

/// Attributes attached to one occurrence of a tag
pub type TagAttributes = IndexMap<String, Value>;

/// A method call recorded on a definition
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method: String,
    pub arguments: Vec<Value>,
}

/// The callable that builds a component instead of its constructor
#[derive(Debug, Clone, PartialEq)]
pub enum Factory {
    /// A static method on a class
    Static { class: String, method: String },
    /// A method on another component
    Service { target: Reference, method: String },
}

/// How a component is constructed
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub class: Option<String>,
    pub parent: Option<String>,
    pub arguments: Vec<Value>,
    pub method_calls: Vec<MethodCall>,
    pub tags: IndexMap<String, Vec<TagAttributes>>,
    pub factory: Option<Factory>,
    pub is_abstract: bool,
    pub public: bool,
    pub lazy: bool,
}

impl Default for Definition {
    fn default() -> Self {
        Self {
            class: None,
            parent: None,
            arguments: Vec::new(),
            method_calls: Vec::new(),
            tags: IndexMap::new(),
            factory: None,
            is_abstract: false,
            public: true,
            lazy: false,
        }
    }
}

impl Definition {
    /// Creates a definition for the given class
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: Some(class.into()),
            ..Self::default()
        }
    }

    /// Creates a definition inheriting from `parent`
    pub fn child(parent: impl Into<String>) -> Self {
        Self {
            parent: Some(parent.into()),
            ..Self::default()
        }
    }

    pub fn with_arguments(mut self, arguments: Vec<Value>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_argument(mut self, argument: impl Into<Value>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    pub fn with_tag(mut self, name: impl Into<String>, attributes: TagAttributes) -> Self {
        self.add_tag(name, attributes);
        self
    }

    pub fn with_factory(mut self, factory: Factory) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn abstract_(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn class(&self) -> Option<&str> {
        self.class.as_deref().filter(|c| !c.is_empty())
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn is_child(&self) -> bool {
        self.parent.is_some()
    }

    pub fn argument(&self, index: usize) -> Option<&Value> {
        self.arguments.get(index)
    }

    /// Overwrites the argument at `index`, padding skipped slots with nulls
    pub fn replace_argument(&mut self, index: usize, value: impl Into<Value>) {
        if index >= self.arguments.len() {
            self.arguments.resize(index + 1, Value::Null);
        }
        self.arguments[index] = value.into();
    }

    /// Appends an argument after the existing ones
    pub fn add_argument(&mut self, value: impl Into<Value>) {
        self.arguments.push(value.into());
    }

    pub fn add_method_call(&mut self, method: impl Into<String>, arguments: Vec<Value>) {
        self.method_calls.push(MethodCall {
            method: method.into(),
            arguments,
        });
    }

    pub fn has_method_call(&self, method: &str) -> bool {
        self.method_calls.iter().any(|call| call.method == method)
    }

    pub fn add_tag(&mut self, name: impl Into<String>, attributes: TagAttributes) {
        self.tags.entry(name.into()).or_default().push(attributes);
    }

    /// Returns every occurrence of a tag (empty when absent)
    pub fn tag(&self, name: &str) -> &[TagAttributes] {
        self.tags.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_argument_pads_missing_slots() {
        let mut def = Definition::child("cache.adapter.redis");
        def.replace_argument(2, 300);

        assert_eq!(def.arguments, vec![Value::Null, Value::Null, Value::Int(300)]);

        def.replace_argument(0, "namespace");
        assert_eq!(def.argument(0), Some(&Value::from("namespace")));
        assert_eq!(def.arguments.len(), 3);
    }

    #[test]
    fn tags_accumulate() {
        let mut def = Definition::new("App\\Pool");
        assert!(def.tag("kernel.reset").is_empty());

        def.add_tag("kernel.reset", TagAttributes::new());
        def.add_tag("kernel.reset", TagAttributes::new());

        assert!(def.has_tag("kernel.reset"));
        assert_eq!(def.tag("kernel.reset").len(), 2);
    }

    #[test]
    fn empty_class_is_unknown() {
        let def = Definition {
            class: Some(String::new()),
            ..Definition::default()
        };
        assert_eq!(def.class(), None);
        assert!(Definition::default().public);
    }
}
