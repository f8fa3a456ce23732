//! Patchbay - reusable circuit patch library
//!
//! This library lets a caller carve a subset of a circuit diagram into a
//! named, reusable patch, persist it in a durable library, and later
//! re-insert it into another diagram with fresh identifiers and all
//! connectivity intact.
//!
//! # Quick Start
//!
//! ```no_run
//! use patchbay::diagram::{Diagram, DiagramComponent, DiagramConnection};
//! use patchbay::{analyze, extract_patch, PatchStore};
//!
//! let mut diagram = Diagram::new();
//! diagram.add_component(DiagramComponent::new("r1", "R1"));
//! diagram.add_component(DiagramComponent::new("d1", "D1"));
//! diagram.add_connection(DiagramConnection::new("c1", &["R1.pin2", "D1.anode"]));
//!
//! let selection = vec!["r1".to_string(), "d1".to_string()];
//! let extraction = extract_patch(&diagram, &selection, "LED Driver").unwrap();
//! println!("{}", analyze(&extraction.patch).render());
//!
//! let store = PatchStore::open("patch-library").unwrap();
//! let mut patch = extraction.patch;
//! store.save(&mut patch, None).unwrap();
//! ```
//!
//! # Features
//!
//! - **Extraction**: partitions diagram connections into internal nets and
//!   boundary-crossing interface pins
//! - **Connectivity analysis**: pin-level graph, island counting, open-pin
//!   and floating-net reports
//! - **Insertion**: collision-free re-instantiation into a live diagram
//! - **Library**: durable storage, search, soft-delete, pre-overwrite backups

pub mod connectivity;
pub mod diagram;
pub mod extract;
pub mod insert;
pub mod library;
pub mod model;

// Re-export main types
pub use connectivity::{analyze, find_floating_nets, find_isolated_components, ConnectivityReport, PinRef};
pub use extract::{extract_patch, ExtractError, Extraction};
pub use insert::{insert_patch, InsertOptions, Insertion, DEFAULT_OFFSET};
pub use library::{
    load_patch, ImportIdScheme, LibraryEntry, PatchStore, StoreConfig, StoreError,
};
pub use model::{
    has_blocking_issues, normalize_id, Component, InterfacePin, IssueKind, Net, NetEndpoint,
    Patch, PatchMetadata, PinKind, PinSide, Position, PropertyValue, Severity, ValidationIssue,
};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        analyze, extract_patch, has_blocking_issues, insert_patch, ConnectivityReport,
        ExtractError, Extraction, InsertOptions, LibraryEntry, Patch, PatchStore, Severity,
        StoreConfig, StoreError, ValidationIssue,
    };
}
