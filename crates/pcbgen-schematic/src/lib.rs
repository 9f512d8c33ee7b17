//! Editing of KiCad `.kicad_sch` schematics.
//!
//! A [`Document`] is parsed once, edited as a tree and written back with an
//! atomic file replace. Component types come from `.kicad_sym` libraries via
//! [`SymbolLibrary`], are merged into the document's `lib_symbols`, placed
//! with [`place`], and connected with straight wires by [`draw_nets`].

mod document;
mod error;
pub mod geometry;
pub mod library;
pub mod pins;
pub mod placement;
pub mod wiring;

pub use document::{clear_file, create_file, Document};
pub use error::{Result, SchematicError};
pub use geometry::Position;
pub use library::{extract_definition, LibraryId, SymbolDefinition, SymbolLibrary};
pub use pins::{resolve_pins, PinMap, PinTable, ResolvedPin};
pub use placement::{place, place_symbol, ComponentInstance, PlacementRequest};
pub use wiring::{draw_nets, draw_nets_to_file, Connection, Net, WiringSummary};

/// Merge `symbol_name` from `library_file` into the document's `lib_symbols`.
///
/// Returns `false` when the definition was already present.
pub fn merge_into(
    document: &mut Document,
    library_file: &std::path::Path,
    symbol_name: &str,
) -> Result<bool> {
    let definition = extract_definition(library_file, symbol_name)?;
    document.merge_symbol(&definition)
}
