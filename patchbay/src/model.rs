//! Patch Data Model
//!
//! This module defines the core data structures for a reusable circuit patch:
//! components, internal nets, interface pins, and metadata. These types are
//! designed to be:
//! - Strictly typed: Full Rust type safety with serde support
//! - Lossless on the wire: missing optional fields are defaulted, never fatal
//! - Editor-agnostic: the join key for connectivity is the component display
//!   name, matching the diagram collaborator's endpoint format

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Current on-disk schema version for patch files.
pub const SCHEMA_VERSION: &str = "1.0";

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

fn default_patch_version() -> String {
    "0.1.0".to_string()
}

fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Normalize a display name into a stable identifier:
/// lowercased, whitespace runs collapsed to single hyphens.
pub fn normalize_id(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Position in the diagram (editor units).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// Scalar property value on a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Number(f64),
    Integer(i64),
    Boolean(bool),
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<f64> for PropertyValue {
    fn from(n: f64) -> Self {
        PropertyValue::Number(n)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        PropertyValue::Integer(n)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

/// Electrode-style pin slot names recognised in a component's property map.
/// Anything else that declares a pin slot must use a "pin"-prefixed key
/// (e.g. "pin1", "pinA").
const ELECTRODE_SLOTS: &[&str] = &[
    "anode", "cathode", "gate", "drain", "source", "base", "collector", "emitter", "vcc", "vdd",
    "vss", "gnd", "vin", "vout", "plus", "minus",
];

/// Whether a property key declares a pin slot on a component.
pub fn is_pin_slot(key: &str) -> bool {
    let lower = key.to_ascii_lowercase();
    lower.starts_with("pin") || ELECTRODE_SLOTS.contains(&lower.as_str())
}

/// An element instance inside a patch.
///
/// The display name is the join key for net endpoints and must be unique
/// within the diagram scope a patch was extracted from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Identifier, unique within the patch.
    #[serde(default = "generate_id")]
    pub id: String,

    /// Display name (e.g. "R1", "U3").
    pub name: String,

    /// Free-form type tag (e.g. "resistor", "diode").
    #[serde(default)]
    pub kind: String,

    /// Named scalar properties; pin-slot keys declare connection points.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub properties: HashMap<String, PropertyValue>,

    /// Position in the source diagram.
    #[serde(default)]
    pub position: Position,
}

impl Component {
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

    /// Declared pin slots, sorted for deterministic reporting.
    pub fn pin_slots(&self) -> Vec<&str> {
        let mut slots: Vec<&str> = self
            .properties
            .keys()
            .filter(|k| is_pin_slot(k))
            .map(|k| k.as_str())
            .collect();
        slots.sort_unstable();
        slots
    }
}

/// One connection point of a net: a component display name plus a pin name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetEndpoint {
    /// Display name of the owning component.
    pub component: String,

    /// Pin name on that component.
    pub pin: String,
}

impl NetEndpoint {
    pub fn new(component: impl Into<String>, pin: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            pin: pin.into(),
        }
    }

    /// Parse a `"<componentName>.<pinName>"` endpoint string. Strings with
    /// no separator are treated as a bare component reference.
    pub fn parse(endpoint: &str) -> Self {
        match endpoint.split_once('.') {
            Some((component, pin)) => Self::new(component, pin),
            None => Self::new(endpoint, ""),
        }
    }
}

impl fmt::Display for NetEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.pin)
    }
}

/// An internal wire of a patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Net {
    #[serde(default = "generate_id")]
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Order-irrelevant set of endpoints. For graph building the endpoints
    /// are chained pairwise (a path, not a clique).
    #[serde(default)]
    pub endpoints: Vec<NetEndpoint>,
}

impl Net {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            endpoints: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn add_endpoint(&mut self, component: impl Into<String>, pin: impl Into<String>) {
        self.endpoints.push(NetEndpoint::new(component, pin));
    }

    /// Display label: name when present, id otherwise.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.endpoints.iter().any(|e| e.component == name)
    }
}

/// Side of the patch outline an interface pin is drawn on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinSide {
    #[default]
    Left,
    Right,
    Top,
    Bottom,
}

impl fmt::Display for PinSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinSide::Left => write!(f, "left"),
            PinSide::Right => write!(f, "right"),
            PinSide::Top => write!(f, "top"),
            PinSide::Bottom => write!(f, "bottom"),
        }
    }
}

/// Semantic kind of an interface pin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinKind {
    Power,
    Ground,
    #[default]
    Signal,
    Clock,
    Reset,
    Data,
}

impl PinKind {
    /// Infer the pin kind from a net or endpoint name.
    pub fn from_net_name(name: &str) -> Self {
        let upper = name.to_uppercase();

        if upper.contains("GND") || upper.contains("VSS") || upper == "0V" {
            PinKind::Ground
        } else if upper.contains("VCC")
            || upper.contains("VDD")
            || upper.contains("3V3")
            || upper.contains("5V")
            || upper.contains("12V")
            || upper.contains("VBAT")
            || upper.contains("VIN")
            || upper.contains("VOUT")
        {
            PinKind::Power
        } else if upper.contains("CLK") || upper.contains("CLOCK") || upper.contains("OSC") {
            PinKind::Clock
        } else if upper.contains("RST") || upper.contains("RESET") || upper.contains("NRST") {
            PinKind::Reset
        } else if upper.contains("SDA")
            || upper.contains("SCL")
            || upper.contains("MOSI")
            || upper.contains("MISO")
            || upper.contains("TX")
            || upper.contains("RX")
        {
            PinKind::Data
        } else {
            PinKind::Signal
        }
    }
}

/// An external connection point re-exposed when a patch is inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfacePin {
    /// Pin name, unique within the patch (e.g. "B.2").
    pub name: String,

    #[serde(default)]
    pub side: PinSide,

    /// The internal net name or `"<component>.<pin>"` endpoint it exposes.
    pub net: String,

    #[serde(default)]
    pub kind: PinKind,
}

impl InterfacePin {
    pub fn new(name: impl Into<String>, net: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            side: PinSide::default(),
            net: net.into(),
            kind: PinKind::default(),
        }
    }

    pub fn with_side(mut self, side: PinSide) -> Self {
        self.side = side;
        self
    }

    pub fn with_kind(mut self, kind: PinKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Metadata block of a patch, refreshed on every save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchMetadata {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "default_patch_version")]
    pub version: String,

    pub created_at: DateTime<Utc>,

    pub modified_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl PatchMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description: String::new(),
            version: default_patch_version(),
            created_at: now,
            modified_at: now,
            author: None,
            tags: Vec::new(),
        }
    }
}

/// A reusable, named sub-circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    /// Stable identifier derived from the patch name.
    #[serde(default = "generate_id")]
    pub id: String,

    pub metadata: PatchMetadata,

    #[serde(default)]
    pub components: Vec<Component>,

    #[serde(default)]
    pub nets: Vec<Net>,

    #[serde(default)]
    pub interface_pins: Vec<InterfacePin>,

    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// Cached preview image (data URI), if the editor produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl Patch {
    /// Create an empty patch with now-timestamps and a normalized id.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: normalize_id(&name),
            metadata: PatchMetadata::new(name),
            components: Vec::new(),
            nets: Vec::new(),
            interface_pins: Vec::new(),
            schema_version: default_schema_version(),
            preview: None,
        }
    }

    pub fn add_component(&mut self, component: Component) {
        self.components.push(component);
    }

    pub fn add_net(&mut self, net: Net) {
        self.nets.push(net);
    }

    pub fn add_interface_pin(&mut self, pin: InterfacePin) {
        self.interface_pins.push(pin);
    }

    /// Look up a component by display name (the net-endpoint join key).
    pub fn component_by_name(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Look up a net by name or id.
    pub fn net_by_label(&self, label: &str) -> Option<&Net> {
        self.nets
            .iter()
            .find(|n| n.name.as_deref() == Some(label) || n.id == label)
    }

    /// Serialize to the on-disk JSON representation.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON, defaulting any missing optional field.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Structural validation. Pure: never fails, always returns the full
    /// issue list. Error-severity issues block persistence.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        let names: std::collections::HashSet<&str> =
            self.components.iter().map(|c| c.name.as_str()).collect();

        // Endpoint set over all nets, for pin-slot coverage checks.
        let referenced: std::collections::HashSet<(&str, &str)> = self
            .nets
            .iter()
            .flat_map(|n| n.endpoints.iter())
            .map(|e| (e.component.as_str(), e.pin.as_str()))
            .collect();

        // Pins exposed through the interface also count as connected.
        let exposed: std::collections::HashSet<NetEndpoint> = self
            .interface_pins
            .iter()
            .map(|p| NetEndpoint::parse(&p.net))
            .collect();

        for component in &self.components {
            for slot in component.pin_slots() {
                let covered = referenced.contains(&(component.name.as_str(), slot))
                    || exposed.contains(&NetEndpoint::new(&component.name, slot));
                if !covered {
                    issues.push(
                        ValidationIssue::error(
                            IssueKind::UnconnectedPin,
                            format!("pin {}.{} is not connected to any net", component.name, slot),
                        )
                        .with_component(&component.id)
                        .with_pin(slot),
                    );
                }
            }
        }

        for net in &self.nets {
            for endpoint in &net.endpoints {
                if !names.contains(endpoint.component.as_str()) {
                    issues.push(
                        ValidationIssue::error(
                            IssueKind::InvalidConnection,
                            format!(
                                "net {} references unknown component {}",
                                net.label(),
                                endpoint.component
                            ),
                        )
                        .with_net(&net.id)
                        .with_component(&endpoint.component),
                    );
                }
            }
            if net.endpoints.len() < 2 {
                issues.push(
                    ValidationIssue::warning(
                        IssueKind::FloatingNet,
                        format!(
                            "net {} has {} endpoint(s); a net needs at least 2",
                            net.label(),
                            net.endpoints.len()
                        ),
                    )
                    .with_net(&net.id),
                );
            }
        }

        for pin in &self.interface_pins {
            let endpoint = NetEndpoint::parse(&pin.net);
            let resolves =
                names.contains(endpoint.component.as_str()) || self.net_by_label(&pin.net).is_some();
            if !resolves {
                issues.push(
                    ValidationIssue::error(
                        IssueKind::MissingInterfacePin,
                        format!(
                            "interface pin {} does not resolve to a component in the patch",
                            pin.name
                        ),
                    )
                    .with_pin(&pin.name),
                );
            }
        }

        issues
    }
}

/// Severity of a validation issue. Errors block persistence; warnings do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Category of a validation issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    UnconnectedPin,
    FloatingNet,
    MissingInterfacePin,
    InvalidConnection,
}

/// A single structural validation finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub net: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
}

impl ValidationIssue {
    pub fn error(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Error,
            message: message.into(),
            component: None,
            net: None,
            pin: None,
        }
    }

    pub fn warning(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Warning,
            message: message.into(),
            component: None,
            net: None,
            pin: None,
        }
    }

    pub fn with_component(mut self, id: impl Into<String>) -> Self {
        self.component = Some(id.into());
        self
    }

    pub fn with_net(mut self, id: impl Into<String>) -> Self {
        self.net = Some(id.into());
        self
    }

    pub fn with_pin(mut self, id: impl Into<String>) -> Self {
        self.pin = Some(id.into());
        self
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Error => write!(f, "error: {}", self.message),
            Severity::Warning => write!(f, "warning: {}", self.message),
        }
    }
}

/// Whether any issue in a report blocks persistence.
pub fn has_blocking_issues(issues: &[ValidationIssue]) -> bool {
    issues.iter().any(ValidationIssue::is_blocking)
}
