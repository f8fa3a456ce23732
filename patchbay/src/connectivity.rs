//! Connectivity Engine
//!
//! Builds a pin-level graph from a patch using petgraph and reports
//! unconnected pins, under-connected nets, and electrical island counts.
//!
//! Graph shape: one node per declared pin slot of every component (plus any
//! pin a net references without a declaration), and one edge per adjacent
//! endpoint pair within each net. Endpoints are chained pairwise
//! (endpoint[i]-endpoint[i+1]), modelling a path rather than a clique; this
//! affects island counts for nets with 3+ endpoints.

use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;

use crate::model::{NetEndpoint, Patch};

/// A pin reference in the connectivity graph: component display name + pin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PinRef {
    pub component: String,
    pub pin: String,
}

impl PinRef {
    fn new(component: &str, pin: &str) -> Self {
        Self {
            component: component.to_string(),
            pin: pin.to_string(),
        }
    }
}

impl From<&NetEndpoint> for PinRef {
    fn from(endpoint: &NetEndpoint) -> Self {
        Self::new(&endpoint.component, &endpoint.pin)
    }
}

impl std::fmt::Display for PinRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.component, self.pin)
    }
}

/// Read-only connectivity analysis result.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectivityReport {
    pub component_count: usize,
    pub net_count: usize,
    pub pin_count: usize,

    /// Number of electrically disjoint islands in the pin graph.
    pub island_count: usize,

    /// Declared pin slots no net endpoint references (pin granularity).
    pub unconnected_pins: Vec<PinRef>,

    /// Components no net references at all (component granularity;
    /// deliberately coarser than `unconnected_pins`).
    pub isolated_components: Vec<String>,

    /// Nets with fewer than two endpoints.
    pub floating_nets: Vec<String>,

    /// True iff there are no isolated components and no floating nets.
    /// Island count alone does not clear this flag.
    pub fully_connected: bool,
}

impl ConnectivityReport {
    /// Render the report as human-readable text. Formatting only; the
    /// structured fields are the source of truth.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Connectivity report");
        let _ = writeln!(out, "  Components: {}", self.component_count);
        let _ = writeln!(out, "  Nets:       {}", self.net_count);
        let _ = writeln!(out, "  Pins:       {}", self.pin_count);
        let _ = writeln!(out, "  Islands:    {}", self.island_count);

        if self.unconnected_pins.is_empty() {
            let _ = writeln!(out, "  Unconnected pins: none");
        } else {
            let _ = writeln!(out, "  Unconnected pins:");
            for pin in &self.unconnected_pins {
                let _ = writeln!(out, "    - {}", pin);
            }
        }

        if !self.isolated_components.is_empty() {
            let _ = writeln!(out, "  Isolated components:");
            for name in &self.isolated_components {
                let _ = writeln!(out, "    - {}", name);
            }
        }

        if !self.floating_nets.is_empty() {
            let _ = writeln!(out, "  Floating nets:");
            for net in &self.floating_nets {
                let _ = writeln!(out, "    - {}", net);
            }
        }

        let _ = writeln!(
            out,
            "  Fully connected: {}",
            if self.fully_connected { "yes" } else { "no" }
        );
        out
    }
}

/// Components that no net references at all.
///
/// Component granularity on purpose: a component with one wired pin and five
/// open ones passes this check but not the pin-level one.
pub fn find_isolated_components(patch: &Patch) -> Vec<String> {
    let referenced: HashSet<&str> = patch
        .nets
        .iter()
        .flat_map(|n| n.endpoints.iter())
        .map(|e| e.component.as_str())
        .collect();

    patch
        .components
        .iter()
        .filter(|c| !referenced.contains(c.name.as_str()))
        .map(|c| c.name.clone())
        .collect()
}

/// Nets with fewer than two endpoints, by net id.
pub fn find_floating_nets(patch: &Patch) -> Vec<String> {
    patch
        .nets
        .iter()
        .filter(|n| n.endpoints.len() < 2)
        .map(|n| n.id.clone())
        .collect()
}

/// Build the pin graph and produce the full connectivity report.
pub fn analyze(patch: &Patch) -> ConnectivityReport {
    let mut graph: UnGraph<PinRef, ()> = UnGraph::new_undirected();
    let mut nodes: HashMap<PinRef, NodeIndex> = HashMap::new();

    let mut node_for = |graph: &mut UnGraph<PinRef, ()>, pin: PinRef| -> NodeIndex {
        *nodes
            .entry(pin.clone())
            .or_insert_with(|| graph.add_node(pin))
    };

    // Declared pin slots first, so open pins appear as isolated nodes.
    for component in &patch.components {
        for slot in component.pin_slots() {
            node_for(&mut graph, PinRef::new(&component.name, slot));
        }
    }

    // Chain each net's endpoints pairwise.
    for net in &patch.nets {
        for pair in net.endpoints.windows(2) {
            let a = node_for(&mut graph, PinRef::from(&pair[0]));
            let b = node_for(&mut graph, PinRef::from(&pair[1]));
            graph.add_edge(a, b, ());
        }
        // A single-endpoint net still contributes its pin node.
        if net.endpoints.len() == 1 {
            node_for(&mut graph, PinRef::from(&net.endpoints[0]));
        }
    }

    let island_count = connected_components(&graph);

    let referenced: HashSet<PinRef> = patch
        .nets
        .iter()
        .flat_map(|n| n.endpoints.iter())
        .map(PinRef::from)
        .collect();

    let mut unconnected_pins: Vec<PinRef> = patch
        .components
        .iter()
        .flat_map(|c| {
            c.pin_slots()
                .into_iter()
                .map(|slot| PinRef::new(&c.name, slot))
                .collect::<Vec<_>>()
        })
        .filter(|pin| !referenced.contains(pin))
        .collect();
    unconnected_pins.sort();

    let isolated_components = find_isolated_components(patch);
    let floating_nets = find_floating_nets(patch);
    let fully_connected = isolated_components.is_empty() && floating_nets.is_empty();

    tracing::debug!(
        components = patch.components.len(),
        nets = patch.nets.len(),
        islands = island_count,
        "analyzed patch connectivity"
    );

    ConnectivityReport {
        component_count: patch.components.len(),
        net_count: patch.nets.len(),
        pin_count: graph.node_count(),
        island_count,
        unconnected_pins,
        isolated_components,
        floating_nets,
        fully_connected,
    }
}
