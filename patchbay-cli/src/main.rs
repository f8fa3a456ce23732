//! Patchbay CLI - circuit patch library management from the command line.

use clap::{Parser, Subcommand};
use patchbay::diagram::Diagram;
use patchbay::prelude::*;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "patchbay")]
#[command(about = "Circuit patch extraction, insertion, and library tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Patch library directory
    #[arg(short = 'd', long, global = true, default_value = "patch-library")]
    dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all patches in the library
    List {
        /// JSON output for scripting
        #[arg(long)]
        json: bool,
    },

    /// Show one patch by library id
    Show {
        /// Library entry id
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Search patches by name or tag (case-insensitive substring)
    Search {
        query: String,

        #[arg(long)]
        json: bool,
    },

    /// Validate a patch file and print its connectivity report
    Check {
        /// Path to a patch JSON file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Extract selected components of a diagram into a new library patch
    Extract {
        /// Path to a diagram JSON file
        #[arg(long)]
        diagram: PathBuf,

        /// Comma-separated component ids to extract
        #[arg(long)]
        select: String,

        /// Name for the new patch
        #[arg(long)]
        name: String,
    },

    /// Insert a stored patch into a diagram file
    Insert {
        /// Path to a diagram JSON file (rewritten in place unless --out)
        #[arg(long)]
        diagram: PathBuf,

        /// Library entry id of the patch to insert
        id: String,

        /// Write the result here instead of overwriting the input
        #[arg(long)]
        out: Option<PathBuf>,

        /// Spatial offset applied on both axes
        #[arg(long)]
        offset: Option<f64>,
    },

    /// Import an external patch file into the library
    Import {
        /// Path to a patch JSON file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Remove a patch from the index (the file is kept as a backup)
    Delete {
        /// Library entry id
        id: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let store = match PatchStore::open(&cli.dir) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let exit_code = match cli.command {
        Commands::List { json } => handle_list(&store, json),
        Commands::Show { id, json } => handle_show(&store, &id, json),
        Commands::Search { query, json } => handle_search(&store, &query, json),
        Commands::Check { file, json } => handle_check(&file, json),
        Commands::Extract {
            diagram,
            select,
            name,
        } => handle_extract(&store, &diagram, &select, &name),
        Commands::Insert {
            diagram,
            id,
            out,
            offset,
        } => handle_insert(&store, &diagram, &id, out.as_deref(), offset),
        Commands::Import { file } => handle_import(&store, &file),
        Commands::Delete { id } => handle_delete(&store, &id),
    };

    process::exit(exit_code);
}

fn print_entries(entries: &[LibraryEntry], json: bool) {
    if json {
        println!("{}", serde_json::to_string_pretty(entries).unwrap());
        return;
    }
    if entries.is_empty() {
        println!("No patches found");
        return;
    }
    for entry in entries {
        println!(
            "{:<24} {:<32} v{} [{}]",
            entry.id,
            entry.name,
            entry.metadata.version,
            entry.metadata.tags.join(", ")
        );
    }
}

fn handle_list(store: &PatchStore, json: bool) -> i32 {
    print_entries(&store.library(), json);
    0
}

fn handle_show(store: &PatchStore, id: &str, json: bool) -> i32 {
    match store.fetch(id) {
        Ok(patch) => {
            if json {
                println!("{}", patch.to_json().unwrap());
            } else {
                println!("{} ({})", patch.metadata.name, patch.id);
                if !patch.metadata.description.is_empty() {
                    println!("  {}", patch.metadata.description);
                }
                println!("  Components: {}", patch.components.len());
                println!("  Nets: {}", patch.nets.len());
                println!("  Interface pins: {}", patch.interface_pins.len());
                for pin in &patch.interface_pins {
                    println!("    - {} ({:?}, {})", pin.name, pin.kind, pin.side);
                }
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn handle_search(store: &PatchStore, query: &str, json: bool) -> i32 {
    print_entries(&store.search(query), json);
    0
}

fn handle_check(file: &Path, json: bool) -> i32 {
    let patch = match patchbay::load_patch(file) {
        Ok(patch) => patch,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let issues = patch.validate();
    let report = analyze(&patch);

    if json {
        let output = serde_json::json!({
            "patch": patch.id,
            "issues": issues,
            "connectivity": report,
        });
        println!("{}", serde_json::to_string_pretty(&output).unwrap());
    } else {
        if issues.is_empty() {
            println!("No validation issues");
        } else {
            for issue in &issues {
                println!("{}", issue);
            }
        }
        print!("{}", report.render());
    }

    if has_blocking_issues(&issues) {
        1
    } else {
        0
    }
}

fn handle_extract(store: &PatchStore, diagram_path: &Path, select: &str, name: &str) -> i32 {
    let diagram = match read_diagram(diagram_path) {
        Ok(diagram) => diagram,
        Err(code) => return code,
    };

    let selection: Vec<String> = select
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let extraction = match extract_patch(&diagram, &selection, name) {
        Ok(extraction) => extraction,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    for warning in &extraction.warnings {
        eprintln!("warning: {}", warning);
    }

    let mut patch = extraction.patch;
    match store.save(&mut patch, None) {
        Ok(path) => {
            println!("Saved patch '{}' to {}", patch.metadata.name, path.display());
            0
        }
        Err(StoreError::Validation(issues)) => {
            for issue in &issues {
                eprintln!("{}", issue);
            }
            1
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn handle_insert(
    store: &PatchStore,
    diagram_path: &Path,
    id: &str,
    out: Option<&Path>,
    offset: Option<f64>,
) -> i32 {
    let mut diagram = match read_diagram(diagram_path) {
        Ok(diagram) => diagram,
        Err(code) => return code,
    };

    let patch = match store.fetch(id) {
        Ok(patch) => patch,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let options = match offset {
        Some(offset) => InsertOptions::with_offset(offset),
        None => InsertOptions::default(),
    };
    let insertion = insert_patch(&patch, &mut diagram, &options);

    let target = out.unwrap_or(diagram_path);
    match diagram.to_json() {
        Ok(json) => {
            if let Err(e) = std::fs::write(target, json) {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    }

    println!(
        "Inserted {} components and {} connections into {}",
        insertion.component_ids.len(),
        insertion.connection_ids.len(),
        target.display()
    );
    0
}

fn handle_import(store: &PatchStore, file: &Path) -> i32 {
    match store.import_file(file) {
        Ok(entry) => {
            println!("Imported '{}' as {}", entry.name, entry.id);
            0
        }
        Err(StoreError::Validation(issues)) => {
            for issue in &issues {
                eprintln!("{}", issue);
            }
            1
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn handle_delete(store: &PatchStore, id: &str) -> i32 {
    match store.delete(id) {
        Ok(true) => {
            println!("Deleted {}", id);
            0
        }
        Ok(false) => {
            eprintln!("No patch with id {}", id);
            1
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn read_diagram(path: &Path) -> Result<Diagram, i32> {
    let json = match std::fs::read_to_string(path) {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error reading {}: {}", path.display(), e);
            return Err(1);
        }
    };
    Diagram::from_json(&json).map_err(|e| {
        eprintln!("Error parsing {}: {}", path.display(), e);
        1
    })
}
