//! Per-invocation attribute bag
//!
//! [`ResourceData`] is what every lifecycle callback works on: the prior
//! state the host recorded, the declared attributes for this pass, and
//! the new state being written back. Values are kept as JSON so the bag
//! stays generic over resource types; typed access goes through the
//! `get_*` helpers, which type-check against the schema.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::schema::{Schema, shape_of};
use crate::traits::ResourceState;

/// Attribute bag for one resource instance during one callback
#[derive(Debug, Clone)]
pub struct ResourceData {
    schema: &'static Schema,
    id: Option<String>,
    prior: Map<String, Value>,
    attributes: Map<String, Value>,
}

impl ResourceData {
    /// Bag for a create: no prior state, declared attributes with defaults
    pub fn for_create(schema: &'static Schema, declared: &Map<String, Value>) -> Result<Self> {
        Ok(Self {
            schema,
            id: None,
            prior: Map::new(),
            attributes: schema.normalize(declared)?,
        })
    }

    /// Bag for a read or delete of an existing instance
    pub fn from_state(schema: &'static Schema, state: &ResourceState) -> Self {
        Self {
            schema,
            id: Some(state.id.clone()),
            prior: state.attributes.clone(),
            attributes: state.attributes.clone(),
        }
    }

    /// Bag for an update: prior state overlaid with the declared attributes
    pub fn for_update(
        schema: &'static Schema,
        state: &ResourceState,
        declared: &Map<String, Value>,
    ) -> Result<Self> {
        let mut attributes = state.attributes.clone();
        attributes.extend(schema.normalize(declared)?);

        Ok(Self {
            schema,
            id: Some(state.id.clone()),
            prior: state.attributes.clone(),
            attributes,
        })
    }

    /// Bag for importing an existing remote entity by identity key
    pub fn for_import(schema: &'static Schema, id: impl Into<String>) -> Self {
        Self {
            schema,
            id: Some(id.into()),
            prior: Map::new(),
            attributes: Map::new(),
        }
    }

    /// Bag for reading a data source
    pub fn for_data_source(schema: &'static Schema) -> Self {
        Self {
            schema,
            id: None,
            prior: Map::new(),
            attributes: Map::new(),
        }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Identity key, or an error when the instance has none yet
    pub fn require_id(&self) -> Result<&str> {
        self.id
            .as_deref()
            .ok_or_else(|| Error::invalid_input("Resource has no identity key"))
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Mark the instance as gone; the host drops it from state
    pub fn clear_id(&mut self) {
        self.id = None;
    }

    /// Current value of an attribute, falling back to its schema default
    pub fn get(&self, key: &str) -> Value {
        match self.attributes.get(key) {
            Some(value) => value.clone(),
            None => self
                .schema
                .attribute(key)
                .map(|attr| attr.fallback())
                .unwrap_or(Value::Null),
        }
    }

    /// Previously recorded value of an attribute (`None` when there is no prior state)
    pub fn get_prior(&self, key: &str) -> Option<Value> {
        self.prior.get(key).cloned()
    }

    /// `(prior, current)` for an attribute
    pub fn get_change(&self, key: &str) -> (Option<Value>, Value) {
        (self.get_prior(key), self.get(key))
    }

    pub fn has_change(&self, key: &str) -> bool {
        let (prior, current) = self.get_change(key);
        prior.as_ref() != Some(&current)
    }

    pub fn get_str(&self, key: &str) -> Result<String> {
        match self.get(key) {
            Value::String(s) => Ok(s),
            other => Err(Error::type_mismatch(key, "string", shape_of(&other))),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        match self.get(key) {
            Value::Bool(b) => Ok(b),
            other => Err(Error::type_mismatch(key, "bool", shape_of(&other))),
        }
    }

    pub fn get_list(&self, key: &str) -> Result<Vec<String>> {
        let value = self.get(key);
        serde_json::from_value(value.clone())
            .map_err(|_| Error::type_mismatch(key, "list(string)", shape_of(&value)))
    }

    /// Write a value into the new state
    ///
    /// Fails with a type error when the value's shape does not match the
    /// attribute's declared type, or when the attribute is not declared.
    pub fn set(&mut self, key: &str, value: impl Serialize) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.schema.check(key, &value)?;
        self.attributes.insert(key.to_string(), value);
        Ok(())
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Convert into persisted state; `None` when the instance has no identity key
    pub fn into_state(self, resource_type: &str) -> Option<ResourceState> {
        let id = self.id?;
        Some(ResourceState::new(resource_type, id, self.attributes))
    }
}
