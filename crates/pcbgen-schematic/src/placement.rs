//! Component placement.

use std::path::Path;

use pcbgen_sexpr::Sexpr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::document::Document;
use crate::error::Result;
use crate::geometry::{normalize_rotation, transform, Position};
use crate::library::{SymbolDefinition, SymbolLibrary};
use crate::pins::{resolve_pins, PinMap};

const FONT_SIZE: f64 = 1.27;
/// Offset of the hidden footprint field below the symbol origin
const FOOTPRINT_FIELD_OFFSET: f64 = 1.778;

/// What to place and where
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRequest {
    /// Library file name under the library root, e.g. `Device.kicad_sym`
    pub library: String,
    pub symbol: String,
    /// Full designator (`R3`), bare prefix (`R`) or placeholder (`R?`)
    #[serde(default)]
    pub designator: Option<String>,
    pub position: Position,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub footprint: Option<String>,
}

/// A placed component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInstance {
    pub lib_id: String,
    pub reference: String,
    pub value: String,
    pub footprint: String,
    pub position: Position,
    pub uuid: String,
    pub pins: PinMap,
}

/// Place `definition` into the document as described by `request`.
///
/// The document is only modified once every input has been validated.
pub fn place(
    document: &mut Document,
    definition: &SymbolDefinition,
    request: &PlacementRequest,
) -> Result<ComponentInstance> {
    let root_uuid = document.root_uuid()?.to_string();
    let reference_anchor = definition.property_anchor("Reference")?;
    let value_anchor = definition.property_anchor("Value")?;

    let at = Position {
        rot: normalize_rotation(request.position.rot),
        ..request.position
    };
    let reference = resolve_designator(document, definition, request.designator.as_deref());
    let value = request
        .value
        .clone()
        .unwrap_or_else(|| definition.id().symbol.clone());
    let footprint = request.footprint.clone().unwrap_or_default();
    let pins = resolve_pins(definition, at);
    let uuid = Uuid::new_v4().to_string();
    let lib_id = definition.id().to_string();

    document.merge_symbol(definition)?;

    let mut items = vec![
        Sexpr::node("lib_id", [Sexpr::string(lib_id.clone())]),
        at.to_at(),
        Sexpr::node("unit", [Sexpr::number(1.0)]),
        flag("exclude_from_sim", false),
        flag("in_bom", true),
        flag("on_board", true),
        flag("dnp", false),
        flag("fields_autoplaced", true),
        Sexpr::node("uuid", [Sexpr::string(uuid.clone())]),
        property("Reference", &reference, transform(reference_anchor, at), false),
        property("Value", &value, transform(value_anchor, at), false),
        property(
            "Footprint",
            &footprint,
            Position::new(at.x, at.y + FOOTPRINT_FIELD_OFFSET, at.rot),
            true,
        ),
        property("Datasheet", "~", Position::new(at.x, at.y, 0.0), true),
    ];
    items.extend(pins.keys().map(|number| {
        Sexpr::node(
            "pin",
            [
                Sexpr::string(number.clone()),
                Sexpr::node("uuid", [Sexpr::string(Uuid::new_v4().to_string())]),
            ],
        )
    }));
    items.push(Sexpr::node(
        "instances",
        [Sexpr::node(
            "project",
            [
                Sexpr::string(document.project()),
                Sexpr::node(
                    "path",
                    [
                        Sexpr::string(format!("/{root_uuid}")),
                        Sexpr::node("reference", [Sexpr::string(reference.clone())]),
                        Sexpr::node("unit", [Sexpr::number(1.0)]),
                    ],
                ),
            ],
        )],
    ));

    document.insert_item(Sexpr::node("symbol", items));
    log::debug!(
        "Placed {reference} ({lib_id}) at ({}, {}) rot {}",
        at.x,
        at.y,
        at.rot
    );

    Ok(ComponentInstance {
        lib_id,
        reference,
        value,
        footprint,
        position: at,
        uuid,
        pins,
    })
}

/// Load the schematic at `path`, place one component and write it back.
pub fn place_symbol(
    path: &Path,
    library: &mut SymbolLibrary,
    request: &PlacementRequest,
) -> Result<(Document, ComponentInstance)> {
    let mut document = Document::load(path)?;
    let definition = library.definition(&request.library, &request.symbol)?;
    let instance = place(&mut document, definition, request)?;
    document.save(path)?;
    Ok((document, instance))
}

/// Pick the reference designator for a new component.
///
/// A full designator is kept unless it is already taken. A bare prefix, a
/// `?` placeholder or a clash gets the next free number for the prefix.
fn resolve_designator(
    document: &Document,
    definition: &SymbolDefinition,
    requested: Option<&str>,
) -> String {
    let requested = requested
        .map(|r| r.trim().trim_end_matches('?'))
        .filter(|r| !r.is_empty());
    let default_prefix = || {
        definition
            .property_value("Reference")
            .map(|p| p.trim_end_matches('?'))
            .filter(|p| !p.is_empty())
            .unwrap_or("U")
            .to_string()
    };

    let Some(requested) = requested else {
        return document.next_reference(&default_prefix());
    };

    let prefix = requested.trim_end_matches(|c: char| c.is_ascii_digit());
    if prefix.is_empty() {
        return document.next_reference(&default_prefix());
    }
    if prefix.len() == requested.len() {
        return document.next_reference(prefix);
    }
    if document.has_reference(requested) {
        let assigned = document.next_reference(prefix);
        log::warn!("Designator {requested} is already used, assigning {assigned}");
        return assigned;
    }
    requested.to_string()
}

fn flag(name: &str, value: bool) -> Sexpr {
    Sexpr::node(name, [Sexpr::symbol(if value { "yes" } else { "no" })])
}

fn property(key: &str, value: &str, at: Position, hidden: bool) -> Sexpr {
    let mut effects = vec![Sexpr::node(
        "font",
        [Sexpr::node(
            "size",
            [Sexpr::number(FONT_SIZE), Sexpr::number(FONT_SIZE)],
        )],
    )];
    if hidden {
        effects.push(flag("hide", true));
    }
    Sexpr::node(
        "property",
        [
            Sexpr::string(key),
            Sexpr::string(value),
            at.to_at(),
            Sexpr::node("effects", effects),
        ],
    )
}
