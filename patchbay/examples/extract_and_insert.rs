//! Extract a patch from a small diagram, print its connectivity report, and
//! re-insert it into a fresh diagram.
//!
//! Run with: cargo run --example extract_and_insert

use patchbay::diagram::{Diagram, DiagramComponent, DiagramConnection};
use patchbay::{analyze, extract_patch, insert_patch, InsertOptions};

fn main() {
    let mut diagram = Diagram::new();
    diagram.add_component(
        DiagramComponent::new("r1", "R1")
            .with_kind("resistor")
            .with_position(0.0, 0.0),
    );
    diagram.add_component(
        DiagramComponent::new("d1", "D1")
            .with_kind("led")
            .with_position(50.0, 0.0),
    );
    diagram.add_component(DiagramComponent::new("j1", "J1").with_kind("connector"));
    diagram.add_connection(
        DiagramConnection::new("c1", &["R1.pin2", "D1.anode"]).with_name("VCC"),
    );
    diagram.add_connection(DiagramConnection::new("c2", &["D1.cathode", "J1.1"]));

    let selection = vec!["r1".to_string(), "d1".to_string()];
    let extraction = extract_patch(&diagram, &selection, "LED Driver").expect("extraction failed");
    for warning in &extraction.warnings {
        println!("warning: {}", warning);
    }

    let patch = extraction.patch;
    println!(
        "Extracted '{}': {} components, {} nets, {} interface pins",
        patch.metadata.name,
        patch.components.len(),
        patch.nets.len(),
        patch.interface_pins.len()
    );
    print!("{}", analyze(&patch).render());

    let mut target = Diagram::new();
    let insertion = insert_patch(&patch, &mut target, &InsertOptions::default());
    println!(
        "Inserted as {:?} with {} connection(s)",
        insertion.component_ids,
        insertion.connection_ids.len()
    );
}
