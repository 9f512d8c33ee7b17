//! Absolute pin positions of placed components.

use std::collections::BTreeMap;

use pcbgen_sexpr::Sexpr;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::{Result, SchematicError};
use crate::geometry::{transform, Position};
use crate::library::SymbolDefinition;

/// A pin as declared in a symbol definition, in symbol-local coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct PinDef {
    pub number: String,
    pub name: String,
    pub local: Position,
}

/// A pin mapped onto the sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPin {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub rot: f64,
}

/// Pin number to resolved pin
pub type PinMap = BTreeMap<String, ResolvedPin>;

impl SymbolDefinition {
    /// Every pin in the definition and its unit sub-symbols. Alternate body
    /// styles repeat pin numbers; the first declaration wins.
    pub fn pins(&self) -> Vec<PinDef> {
        let mut pins: Vec<PinDef> = Vec::new();
        for pin in self.sexpr().find_all("pin") {
            let Some(def) = pin_def(pin) else {
                continue;
            };
            if pins.iter().any(|p| p.number == def.number) {
                continue;
            }
            pins.push(def);
        }
        pins
    }
}

/// `(pin <type> <shape> (at x y rot) ... (name "N") (number "M"))`
fn pin_def(pin: &Sexpr) -> Option<PinDef> {
    let number = pin.child("number")?.atom_at(1)?.to_string();
    let name = pin
        .child("name")
        .and_then(|n| n.atom_at(1))
        .unwrap_or("~")
        .to_string();
    let local = Position::from_at(pin)?;
    Some(PinDef {
        number,
        name,
        local,
    })
}

/// Map every pin of `definition` onto the sheet for a symbol placed at `at`.
pub fn resolve_pins(definition: &SymbolDefinition, at: Position) -> PinMap {
    definition
        .pins()
        .into_iter()
        .map(|pin| {
            let abs = transform(pin.local, at);
            (
                pin.number,
                ResolvedPin {
                    name: pin.name,
                    x: abs.x,
                    y: abs.y,
                    rot: abs.rot,
                },
            )
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinTableEntry {
    pub lib_id: String,
    pub pins: PinMap,
}

/// Component reference to its resolved pins
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinTable {
    entries: BTreeMap<String, PinTableEntry>,
}

impl PinTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, reference: impl Into<String>, lib_id: impl Into<String>, pins: PinMap) {
        self.entries.insert(
            reference.into(),
            PinTableEntry {
                lib_id: lib_id.into(),
                pins,
            },
        );
    }

    /// Rebuild the table from the components and `lib_symbols` of a document.
    pub fn from_document(document: &Document) -> Result<Self> {
        let mut table = PinTable::new();
        for component in document.components() {
            let Some(reference) = component.property("Reference").and_then(|p| p.atom_at(2))
            else {
                continue;
            };
            let lib_id = component
                .child("lib_id")
                .and_then(|l| l.atom_at(1))
                .ok_or_else(|| {
                    SchematicError::Format(format!("component {reference} has no lib_id"))
                })?;
            let at = Position::from_at(component).ok_or_else(|| {
                SchematicError::Format(format!("component {reference} has no (at x y rot)"))
            })?;
            let definition = document.definition(lib_id).ok_or_else(|| {
                SchematicError::not_found(format!(
                    "definition {lib_id} for {reference} is not in lib_symbols"
                ))
            })?;
            let definition = SymbolDefinition::from_sexpr(definition.clone())?;
            table.insert(reference, lib_id, resolve_pins(&definition, at));
        }
        Ok(table)
    }

    pub fn get(&self, reference: &str) -> Option<&PinTableEntry> {
        self.entries.get(reference)
    }

    /// Sheet position of `pin` on component `reference`
    pub fn get_pin_position(&self, reference: &str, pin: &str) -> Result<(f64, f64)> {
        let entry = self
            .entries
            .get(reference)
            .ok_or_else(|| SchematicError::not_found(format!("component {reference} not found")))?;
        let resolved = entry.pins.get(pin).ok_or_else(|| {
            SchematicError::not_found(format!("pin {pin} not found on {reference}"))
        })?;
        Ok((resolved.x, resolved.y))
    }

    /// Pin maps reduced to `number -> name`, per component
    pub fn simplified(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        self.entries
            .iter()
            .map(|(reference, entry)| {
                let pins = entry
                    .pins
                    .iter()
                    .map(|(number, pin)| (number.clone(), pin.name.clone()))
                    .collect();
                (reference.clone(), pins)
            })
            .collect()
    }

    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(text: &str) -> SymbolDefinition {
        SymbolDefinition::from_sexpr(pcbgen_sexpr::parse(text).unwrap()).unwrap()
    }

    #[test]
    fn test_pins_from_nested_units() {
        let def = definition(
            r#"(symbol "Device:LED"
                (symbol "LED_1_1"
                    (pin passive line (at -3.81 0 0) (length 2.54) (name "K") (number "1"))
                    (pin passive line (at 3.81 0 180) (length 2.54) (name "A") (number "2")))
                (symbol "LED_1_2"
                    (pin passive line (at -5.08 0 0) (length 2.54) (name "K") (number "1"))))"#,
        );
        let pins = def.pins();
        assert_eq!(pins.len(), 2);
        assert_eq!(pins[0].local, Position::new(-3.81, 0.0, 0.0));
        assert_eq!(pins[1].name, "A");
    }

    #[test]
    fn test_resolve_pins_rotated() {
        let def = definition(
            r#"(symbol "Device:R"
                (symbol "R_1_1"
                    (pin passive line (at 0 3.81 270) (name "~") (number "1"))
                    (pin passive line (at 0 -3.81 90) (name "~") (number "2"))))"#,
        );
        let pins = resolve_pins(&def, Position::new(100.0, 50.0, 90.0));
        let p1 = &pins["1"];
        assert!((p1.x - 96.19).abs() < 1e-9);
        assert!((p1.y - 50.0).abs() < 1e-9);
        assert_eq!(p1.rot, 0.0);
        assert_eq!(pins["2"].rot, 180.0);
    }

    #[test]
    fn test_zero_pins_is_empty_map() {
        let def = definition(r#"(symbol "Mechanical:MountingHole" (symbol "MountingHole_0_1" (circle)))"#);
        assert!(resolve_pins(&def, Position::default()).is_empty());
    }

    #[test]
    fn test_get_pin_position_errors() {
        let mut table = PinTable::new();
        let mut pins = PinMap::new();
        pins.insert(
            "1".to_string(),
            ResolvedPin {
                name: "K".to_string(),
                x: 1.0,
                y: 2.0,
                rot: 0.0,
            },
        );
        table.insert("D1", "Device:LED", pins);

        assert_eq!(table.get_pin_position("D1", "1").unwrap(), (1.0, 2.0));
        assert!(matches!(
            table.get_pin_position("D1", "3"),
            Err(SchematicError::NotFound(_))
        ));
        assert!(matches!(
            table.get_pin_position("D2", "1"),
            Err(SchematicError::NotFound(_))
        ));
        assert_eq!(table.simplified()["D1"]["1"], "K");
    }
}
