//! Resource - Representing resources and their state

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Unique identifier for a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    /// Resource type (e.g., "host_port_group")
    pub resource_type: String,
    /// Resource name (identifier chosen in configuration)
    pub name: String,
}

impl ResourceId {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }
}

/// Attribute value of a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
}

impl Value {
    /// Get the string value, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get the integer value, if this is an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the boolean value, if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Desired state declared in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub attributes: HashMap<String, Value>,
}

impl Resource {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(resource_type, name),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Get a string attribute value
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

/// Current state fetched from actual infrastructure
///
/// The identifier goes through two phases: a provisional key composed
/// locally during create, and a durable identifier assigned by the remote
/// platform and discovered on read. The durable identifier wins whenever
/// both are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub id: ResourceId,
    /// Platform-assigned opaque identifier (e.g., a managed object reference value)
    pub identifier: Option<String>,
    /// Locally composed placeholder key used between create and the first read
    pub provisional_id: Option<String>,
    pub attributes: HashMap<String, Value>,
    /// Whether this state exists
    pub exists: bool,
}

impl State {
    pub fn not_found(id: ResourceId) -> Self {
        Self {
            id,
            identifier: None,
            provisional_id: None,
            attributes: HashMap::new(),
            exists: false,
        }
    }

    pub fn existing(id: ResourceId, attributes: HashMap<String, Value>) -> Self {
        Self {
            id,
            identifier: None,
            provisional_id: None,
            attributes,
            exists: true,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_provisional_id(mut self, provisional_id: impl Into<String>) -> Self {
        self.provisional_id = Some(provisional_id.into());
        self
    }

    /// The identifier to address this resource by: the durable one when
    /// known, otherwise the provisional key from create.
    pub fn effective_id(&self) -> Option<&str> {
        self.identifier
            .as_deref()
            .or(self.provisional_id.as_deref())
    }

    /// Get a string attribute value
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_state_has_no_identifier() {
        let state = State::not_found(ResourceId::new("host_port_group", "pg"));
        assert!(!state.exists);
        assert!(state.identifier.is_none());
        assert!(state.effective_id().is_none());
    }

    #[test]
    fn durable_identifier_wins_over_provisional() {
        let id = ResourceId::new("host_port_group", "pg");
        let state = State::existing(id, HashMap::new())
            .with_provisional_id("host-123:pg")
            .with_identifier("network-42");
        assert_eq!(state.effective_id(), Some("network-42"));
    }

    #[test]
    fn provisional_identifier_used_until_read() {
        let id = ResourceId::new("host_port_group", "pg");
        let state = State::existing(id, HashMap::new()).with_provisional_id("host-123:pg");
        assert_eq!(state.effective_id(), Some("host-123:pg"));
    }

    #[test]
    fn state_serialization_round_trip() {
        let mut attrs = HashMap::new();
        attrs.insert("name".to_string(), Value::String("pg".to_string()));
        attrs.insert("vlan_id".to_string(), Value::Int(100));
        attrs.insert("allow_promiscuous".to_string(), Value::Bool(false));
        attrs.insert(
            "active_nics".to_string(),
            Value::List(vec![Value::String("vmnic0".to_string())]),
        );

        let state = State::existing(ResourceId::new("host_port_group", "pg"), attrs)
            .with_identifier("network-42");

        let json = serde_json::to_string(&state).unwrap();
        let back: State = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
