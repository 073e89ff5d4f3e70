//! Attribute schemas for resources and data sources
//!
//! A [`Schema`] is the declared shape of one resource type: which
//! attributes exist, their types, defaults, and whether the user, the
//! remote, or both supply them. It is used to validate declared
//! attributes, fill in defaults, and type-check values written back
//! into state.

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Value type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    String,
    Bool,
    /// Ordered list of strings
    StringList,
}

impl AttributeType {
    /// Whether `value` has this type
    pub fn matches(self, value: &Value) -> bool {
        match self {
            AttributeType::String => value.is_string(),
            AttributeType::Bool => value.is_boolean(),
            AttributeType::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
        }
    }

    /// Zero value used when an optional attribute is neither declared nor defaulted
    pub fn zero_value(self) -> Value {
        match self {
            AttributeType::String => Value::String(String::new()),
            AttributeType::Bool => Value::Bool(false),
            AttributeType::StringList => Value::Array(Vec::new()),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Bool => "bool",
            AttributeType::StringList => "list(string)",
        }
    }
}

/// Short description of a JSON value's shape, for error messages
pub(crate) fn shape_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// A single attribute declaration
#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: &'static str,
    pub kind: AttributeType,
    pub required: bool,
    pub computed: bool,
    /// Changing this attribute cannot be done in place
    pub force_new: bool,
    pub sensitive: bool,
    pub default: Option<Value>,
    pub description: &'static str,
}

impl Attribute {
    fn new(name: &'static str, kind: AttributeType) -> Self {
        Self {
            name,
            kind,
            required: false,
            computed: false,
            force_new: false,
            sensitive: false,
            default: None,
            description: "",
        }
    }

    pub fn required(name: &'static str, kind: AttributeType) -> Self {
        Self {
            required: true,
            ..Self::new(name, kind)
        }
    }

    pub fn optional(name: &'static str, kind: AttributeType) -> Self {
        Self::new(name, kind)
    }

    pub fn computed(name: &'static str, kind: AttributeType) -> Self {
        Self {
            computed: true,
            ..Self::new(name, kind)
        }
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn with_sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Whether users may declare a value for this attribute
    pub fn is_configurable(&self) -> bool {
        !self.computed
    }

    /// Value used when the attribute is not declared
    pub fn fallback(&self) -> Value {
        self.default
            .clone()
            .unwrap_or_else(|| self.kind.zero_value())
    }
}

/// Schema for one resource or data source type
#[derive(Debug, Clone)]
pub struct Schema {
    pub description: &'static str,
    attributes: Vec<Attribute>,
}

impl Schema {
    pub fn new(description: &'static str) -> Self {
        Self {
            description,
            attributes: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Validate declared attributes and return them with defaults applied
    ///
    /// Rejects unknown attributes, values for computed attributes, missing
    /// required attributes, and values of the wrong type. The returned map
    /// contains every configurable attribute.
    pub fn normalize(&self, declared: &Map<String, Value>) -> Result<Map<String, Value>> {
        for key in declared.keys() {
            match self.attribute(key) {
                None => return Err(Error::config(format!("Unsupported attribute '{key}'"))),
                Some(attr) if !attr.is_configurable() => {
                    return Err(Error::config(format!(
                        "Attribute '{key}' is computed and cannot be set"
                    )));
                }
                Some(_) => {}
            }
        }

        let mut normalized = Map::new();
        for attr in self.attributes.iter().filter(|a| a.is_configurable()) {
            let value = match declared.get(attr.name) {
                Some(Value::Null) | None if attr.required => {
                    return Err(Error::config(format!(
                        "Missing required attribute '{}'",
                        attr.name
                    )));
                }
                Some(Value::Null) | None => attr.fallback(),
                Some(value) => {
                    self.check(attr.name, value)?;
                    value.clone()
                }
            };
            normalized.insert(attr.name.to_string(), value);
        }

        Ok(normalized)
    }

    /// Type-check a value against its attribute declaration
    pub fn check(&self, name: &str, value: &Value) -> Result<()> {
        let attr = self
            .attribute(name)
            .ok_or_else(|| Error::config(format!("Unsupported attribute '{name}'")))?;

        if attr.kind.matches(value) {
            Ok(())
        } else {
            Err(Error::type_mismatch(name, attr.kind.name(), shape_of(value)))
        }
    }
}
