//! Insertion Engine
//!
//! Re-instantiates a stored patch into a live diagram: fresh identifiers for
//! every component, a spatial offset so the copy never lands exactly on the
//! source, and net endpoints rewritten to the new identifiers. All additions
//! are staged and committed in one step; the target diagram is appended to,
//! never replaced.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use crate::diagram::{Diagram, DiagramComponent, DiagramConnection};
use crate::model::Patch;

/// Default spatial offset, in editor units, applied on each axis.
pub const DEFAULT_OFFSET: f64 = 80.0;

/// Per-process sequence folded into insertion stamps so that two insertions
/// within the same millisecond still get distinct identifiers.
static INSERT_SEQ: AtomicU64 = AtomicU64::new(0);

fn next_stamp() -> String {
    let seq = INSERT_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}", Utc::now().timestamp_millis(), seq)
}

/// Placement options for an insertion.
#[derive(Debug, Clone)]
pub struct InsertOptions {
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for InsertOptions {
    fn default() -> Self {
        Self {
            offset_x: DEFAULT_OFFSET,
            offset_y: DEFAULT_OFFSET,
        }
    }
}

impl InsertOptions {
    pub fn with_offset(offset: f64) -> Self {
        Self {
            offset_x: offset,
            offset_y: offset,
        }
    }
}

/// What an insertion added to the diagram.
#[derive(Debug, Clone)]
pub struct Insertion {
    pub component_ids: Vec<String>,
    pub connection_ids: Vec<String>,
}

/// Insert a patch into the diagram.
///
/// Endpoints whose component name is not in the patch are passed through
/// unchanged; they can only come from a hand-edited patch file and dropping
/// them would silently lose connectivity.
pub fn insert_patch(patch: &Patch, diagram: &mut Diagram, options: &InsertOptions) -> Insertion {
    let stamp = next_stamp();

    let mut new_components = Vec::with_capacity(patch.components.len());
    let mut name_to_id = std::collections::HashMap::new();

    for component in &patch.components {
        let fresh = format!("{}_{}", component.id, stamp);
        name_to_id.insert(component.name.as_str(), fresh.clone());
        new_components.push(DiagramComponent {
            id: fresh.clone(),
            // The display name is the diagram's join key, so the inserted
            // copy takes the fresh identifier as its name as well.
            name: fresh,
            kind: component.kind.clone(),
            properties: component.properties.clone(),
            position: component.position.offset(options.offset_x, options.offset_y),
        });
    }

    let mut new_connections = Vec::with_capacity(patch.nets.len());
    for net in &patch.nets {
        let endpoints = net
            .endpoints
            .iter()
            .map(|e| match name_to_id.get(e.component.as_str()) {
                Some(fresh) => format!("{}.{}", fresh, e.pin),
                None => e.to_string(),
            })
            .collect();
        new_connections.push(DiagramConnection {
            id: format!("{}_{}", net.id, stamp),
            name: net.name.clone(),
            endpoints,
        });
    }

    let insertion = Insertion {
        component_ids: new_components.iter().map(|c| c.id.clone()).collect(),
        connection_ids: new_connections.iter().map(|c| c.id.clone()).collect(),
    };

    // Commit point: everything staged above lands at once.
    diagram.components.extend(new_components);
    diagram.connections.extend(new_connections);

    tracing::debug!(
        patch = %patch.id,
        components = insertion.component_ids.len(),
        connections = insertion.connection_ids.len(),
        "inserted patch into diagram"
    );

    insertion
}
