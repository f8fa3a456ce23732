//! Extraction Engine
//!
//! Converts a diagram plus a selected-component set into a candidate patch.
//! Every connection in the diagram is classified into exactly one of three
//! buckets: fully inside the selection (becomes an internal net), crossing
//! the selection boundary (each selected endpoint becomes an interface pin),
//! or fully outside (ignored).

use std::collections::HashSet;
use thiserror::Error;

use crate::diagram::Diagram;
use crate::model::{Component, InterfacePin, Net, NetEndpoint, Patch, PinKind};

/// Input-contract violations on extraction. Everything past input checking
/// is reported as warnings on the result, never as an error.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("selection is empty: at least one component must be selected")]
    EmptySelection,

    #[error("duplicate component name in selection: {0}")]
    DuplicateName(String),
}

/// A candidate patch plus non-fatal findings about it.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub patch: Patch,
    pub warnings: Vec<String>,
}

/// Extract the selected components of a diagram into a named patch.
///
/// `selection` holds diagram component identifiers. Connection endpoints are
/// joined on component display names, so the selected components' names must
/// be unique within the selection.
pub fn extract_patch(
    diagram: &Diagram,
    selection: &[String],
    name: &str,
) -> Result<Extraction, ExtractError> {
    let selected_ids: HashSet<&str> = selection.iter().map(String::as_str).collect();
    let selected: Vec<_> = diagram
        .components
        .iter()
        .filter(|c| selected_ids.contains(c.id.as_str()))
        .collect();

    if selected.is_empty() {
        return Err(ExtractError::EmptySelection);
    }

    let mut selected_names: HashSet<&str> = HashSet::new();
    for component in &selected {
        if !selected_names.insert(component.name.as_str()) {
            return Err(ExtractError::DuplicateName(component.name.clone()));
        }
    }

    let mut warnings = Vec::new();
    if selected.len() == 1 {
        warnings.push(format!(
            "selection contains a single component ({}); not much of a patch",
            selected[0].name
        ));
    }

    let mut patch = Patch::new(name);
    for component in &selected {
        patch.add_component(Component {
            id: component.id.clone(),
            name: component.name.clone(),
            kind: component.kind.clone(),
            properties: component.properties.clone(),
            position: component.position,
        });
    }

    // Each connection is processed at most once, even if the diagram holds
    // duplicate connection ids.
    let mut seen: HashSet<&str> = HashSet::new();
    for connection in &diagram.connections {
        if !seen.insert(connection.id.as_str()) {
            continue;
        }

        let endpoints: Vec<NetEndpoint> = connection
            .endpoints
            .iter()
            .map(|e| NetEndpoint::parse(e))
            .collect();
        let (inside, outside): (Vec<_>, Vec<_>) = endpoints
            .into_iter()
            .partition(|e| selected_names.contains(e.component.as_str()));

        if inside.is_empty() {
            // Entirely outside the selection.
            continue;
        }

        if outside.is_empty() {
            // Fully internal: keep as a net with only the selected endpoints.
            let mut net = Net::new(connection.id.clone());
            net.name = connection.name.clone();
            net.endpoints = inside;
            patch.add_net(net);
        } else {
            // Boundary-crossing: one interface pin per selected endpoint,
            // named after its endpoint string.
            let label = connection.name.clone().unwrap_or_default();
            for endpoint in inside {
                let pin_name = endpoint.to_string();
                let kind = if label.is_empty() {
                    PinKind::from_net_name(&pin_name)
                } else {
                    PinKind::from_net_name(&label)
                };
                patch.add_interface_pin(InterfacePin::new(&pin_name, &pin_name).with_kind(kind));
            }
        }
    }

    if patch.nets.is_empty() && patch.interface_pins.is_empty() {
        warnings.push("patch has no connections".to_string());
    }

    tracing::debug!(
        patch = %patch.id,
        components = patch.components.len(),
        nets = patch.nets.len(),
        interface_pins = patch.interface_pins.len(),
        "extracted patch from diagram"
    );

    Ok(Extraction { patch, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::{DiagramComponent, DiagramConnection};

    fn abc_diagram() -> Diagram {
        let mut diagram = Diagram::new();
        for name in ["A", "B", "C"] {
            diagram.add_component(DiagramComponent::new(name, name));
        }
        diagram.add_connection(DiagramConnection::new("c1", &["A.1", "B.1"]));
        diagram.add_connection(DiagramConnection::new("c2", &["B.2", "C.1"]));
        diagram
    }

    fn sel(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_selection_is_fatal() {
        let diagram = abc_diagram();
        assert!(matches!(
            extract_patch(&diagram, &[], "p"),
            Err(ExtractError::EmptySelection)
        ));
        // Unknown ids are an effectively empty selection.
        assert!(matches!(
            extract_patch(&diagram, &sel(&["nope"]), "p"),
            Err(ExtractError::EmptySelection)
        ));
    }

    #[test]
    fn test_single_component_selection_warns() {
        let diagram = abc_diagram();
        let result = extract_patch(&diagram, &sel(&["A"]), "solo").unwrap();
        assert_eq!(result.patch.components.len(), 1);
        assert!(result.warnings.iter().any(|w| w.contains("single component")));
    }

    #[test]
    fn test_scenario_boundary_partition() {
        // A.1-B.1 internal, B.2-C.1 boundary-crossing, C excluded.
        let diagram = abc_diagram();
        let result = extract_patch(&diagram, &sel(&["A", "B"]), "ab").unwrap();
        let patch = &result.patch;

        assert_eq!(patch.id, "ab");
        assert_eq!(patch.components.len(), 2);
        assert!(patch.component_by_name("C").is_none());

        assert_eq!(patch.nets.len(), 1);
        assert_eq!(
            patch.nets[0].endpoints,
            vec![NetEndpoint::new("A", "1"), NetEndpoint::new("B", "1")]
        );

        assert_eq!(patch.interface_pins.len(), 1);
        assert_eq!(patch.interface_pins[0].name, "B.2");
        assert_eq!(patch.interface_pins[0].net, "B.2");
    }

    #[test]
    fn test_boundary_crossing_yields_pin_per_selected_endpoint() {
        let mut diagram = Diagram::new();
        for name in ["A", "B", "C", "X"] {
            diagram.add_component(DiagramComponent::new(name, name));
        }
        // Three selected endpoints cross the boundary on one connection.
        diagram.add_connection(DiagramConnection::new(
            "c1",
            &["A.1", "B.1", "C.1", "X.1"],
        ));

        let result = extract_patch(&diagram, &sel(&["A", "B", "C"]), "trio").unwrap();
        assert!(result.patch.nets.is_empty());
        assert_eq!(result.patch.interface_pins.len(), 3);
        let names: Vec<&str> = result
            .patch
            .interface_pins
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["A.1", "B.1", "C.1"]);
    }

    #[test]
    fn test_connection_classified_exactly_once() {
        // Boundary law: endpoints of selected components end up either in an
        // internal net or as interface pins, never both, never dropped.
        let diagram = abc_diagram();
        let result = extract_patch(&diagram, &sel(&["A", "B"]), "ab").unwrap();
        let patch = &result.patch;

        let net_eps: Vec<String> = patch
            .nets
            .iter()
            .flat_map(|n| n.endpoints.iter().map(|e| e.to_string()))
            .collect();
        let pin_eps: Vec<String> =
            patch.interface_pins.iter().map(|p| p.net.clone()).collect();

        let mut all: Vec<String> = net_eps.iter().chain(pin_eps.iter()).cloned().collect();
        all.sort();
        assert_eq!(all, vec!["A.1", "B.1", "B.2"]);
        for ep in net_eps {
            assert!(!pin_eps.contains(&ep));
        }
    }

    #[test]
    fn test_duplicate_connection_ids_processed_once() {
        let mut diagram = Diagram::new();
        diagram.add_component(DiagramComponent::new("A", "A"));
        diagram.add_component(DiagramComponent::new("B", "B"));
        diagram.add_connection(DiagramConnection::new("c1", &["A.1", "B.1"]));
        diagram.add_connection(DiagramConnection::new("c1", &["A.1", "B.1"]));

        let result = extract_patch(&diagram, &sel(&["A", "B"]), "dup").unwrap();
        assert_eq!(result.patch.nets.len(), 1);
    }

    #[test]
    fn test_duplicate_display_names_rejected() {
        let mut diagram = Diagram::new();
        diagram.add_component(DiagramComponent::new("id1", "R1"));
        diagram.add_component(DiagramComponent::new("id2", "R1"));

        assert!(matches!(
            extract_patch(&diagram, &sel(&["id1", "id2"]), "dup"),
            Err(ExtractError::DuplicateName(_))
        ));
    }

    #[test]
    fn test_no_connections_warning() {
        let mut diagram = Diagram::new();
        diagram.add_component(DiagramComponent::new("A", "A"));
        diagram.add_component(DiagramComponent::new("B", "B"));

        let result = extract_patch(&diagram, &sel(&["A", "B"]), "bare").unwrap();
        assert!(result
            .warnings
            .iter()
            .any(|w| w.contains("no connections")));
    }

    #[test]
    fn test_patch_id_normalized() {
        let diagram = abc_diagram();
        let result = extract_patch(&diagram, &sel(&["A"]), "My Power Stage").unwrap();
        assert_eq!(result.patch.id, "my-power-stage");
        assert_eq!(result.patch.metadata.name, "My Power Stage");
    }

    #[test]
    fn test_interface_pin_kind_from_connection_name() {
        let mut diagram = Diagram::new();
        diagram.add_component(DiagramComponent::new("U1", "U1"));
        diagram.add_component(DiagramComponent::new("J1", "J1"));
        diagram.add_connection(
            DiagramConnection::new("c1", &["U1.4", "J1.1"]).with_name("VCC"),
        );

        let result = extract_patch(&diagram, &sel(&["U1"]), "pwr").unwrap();
        assert_eq!(result.patch.interface_pins.len(), 1);
        assert_eq!(result.patch.interface_pins[0].kind, PinKind::Power);
    }
}
