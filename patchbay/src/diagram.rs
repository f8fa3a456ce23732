//! Diagram collaborator types.
//!
//! The live circuit diagram is owned by the editor, not by this crate; these
//! types describe its interface boundary only. Connection endpoints are
//! strings of the form `"<componentName>.<pinName>"` and the join key into
//! the diagram is always the component display name, never its id.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::{Position, PropertyValue};

fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A component instance in the live diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramComponent {
    #[serde(default = "generate_id")]
    pub id: String,

    /// Display name, unique within the diagram.
    pub name: String,

    #[serde(default)]
    pub kind: String,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub properties: HashMap<String, PropertyValue>,

    #[serde(default)]
    pub position: Position,
}

impl DiagramComponent {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: String::new(),
            properties: HashMap::new(),
            position: Position::default(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// A wire in the live diagram, endpoints as `"<componentName>.<pinName>"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramConnection {
    #[serde(default = "generate_id")]
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub endpoints: Vec<String>,
}

impl DiagramConnection {
    pub fn new(id: impl Into<String>, endpoints: &[&str]) -> Self {
        Self {
            id: id.into(),
            name: None,
            endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// The diagram surface this crate extracts from and inserts into.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    #[serde(default)]
    pub components: Vec<DiagramComponent>,

    #[serde(default)]
    pub connections: Vec<DiagramConnection>,
}

impl Diagram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_component(&mut self, component: DiagramComponent) {
        self.components.push(component);
    }

    pub fn add_connection(&mut self, connection: DiagramConnection) {
        self.connections.push(connection);
    }

    pub fn component_by_id(&self, id: &str) -> Option<&DiagramComponent> {
        self.components.iter().find(|c| c.id == id)
    }

    pub fn component_by_name(&self, name: &str) -> Option<&DiagramComponent> {
        self.components.iter().find(|c| c.name == name)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
