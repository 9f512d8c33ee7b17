//! Net to wire synthesis.
//!
//! Each net is drawn as a star: one straight wire from the first connection
//! (the anchor) to every other connection.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::document::Document;
use crate::error::Result;
use crate::pins::PinTable;

/// A named or anonymous set of pins that must be electrically joined
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Net {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub connections: Vec<Connection>,
}

/// One net endpoint: a component reference and one of its pin numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(deserialize_with = "pin_number")]
    pub pin: String,
}

impl Connection {
    pub fn new(reference: impl Into<String>, pin: impl Into<String>) -> Self {
        Connection {
            reference: reference.into(),
            pin: pin.into(),
        }
    }
}

/// Pin numbers arrive as JSON strings or integers
fn pin_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PinId {
        Text(String),
        Integer(i64),
    }

    Ok(match PinId::deserialize(deserializer)? {
        PinId::Text(text) => text,
        PinId::Integer(n) => n.to_string(),
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WiringSummary {
    pub wires: usize,
    pub skipped_nets: usize,
}

/// Append the wires for `nets` to the document.
///
/// Every endpoint is resolved before anything is drawn, so an unknown
/// component or pin leaves the document unchanged.
pub fn draw_nets(document: &mut Document, pins: &PinTable, nets: &[Net]) -> Result<WiringSummary> {
    let mut segments = Vec::new();
    let mut summary = WiringSummary::default();

    for net in nets {
        let Some((anchor, rest)) = net.connections.split_first().filter(|(_, rest)| !rest.is_empty())
        else {
            log::debug!(
                "Skipping net {} with {} connection(s)",
                net.name.as_deref().unwrap_or("<unnamed>"),
                net.connections.len()
            );
            summary.skipped_nets += 1;
            continue;
        };

        let from = pins.get_pin_position(&anchor.reference, &anchor.pin)?;
        for connection in rest {
            let to = pins.get_pin_position(&connection.reference, &connection.pin)?;
            segments.push((from, to));
        }
    }

    for (from, to) in segments {
        document.add_wire(from, to);
        summary.wires += 1;
    }
    log::debug!(
        "Drew {} wire(s), skipped {} net(s)",
        summary.wires,
        summary.skipped_nets
    );
    Ok(summary)
}

/// Load the schematic at `path`, draw `nets` and write it back once.
pub fn draw_nets_to_file(
    path: &Path,
    pins: &PinTable,
    nets: &[Net],
) -> Result<(Document, WiringSummary)> {
    let mut document = Document::load(path)?;
    let summary = draw_nets(&mut document, pins, nets)?;
    document.save(path)?;
    Ok((document, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pins::{PinMap, ResolvedPin};
    use crate::SchematicError;

    fn table() -> PinTable {
        let mut table = PinTable::new();
        for (reference, x) in [("A", 0.0), ("B", 10.0), ("C", 20.0)] {
            let mut pins = PinMap::new();
            for (number, y) in [("1", 0.0), ("2", 5.0), ("3", 10.0)] {
                pins.insert(
                    number.to_string(),
                    ResolvedPin {
                        name: format!("P{number}"),
                        x,
                        y,
                        rot: 0.0,
                    },
                );
            }
            table.insert(reference, "Test:Part", pins);
        }
        table
    }

    fn net(connections: &[(&str, &str)]) -> Net {
        Net {
            name: None,
            connections: connections
                .iter()
                .map(|(r, p)| Connection::new(*r, *p))
                .collect(),
        }
    }

    #[test]
    fn test_star_topology() {
        let mut doc = Document::blank("root");
        let summary = draw_nets(
            &mut doc,
            &table(),
            &[net(&[("A", "1"), ("B", "2"), ("C", "3")])],
        )
        .unwrap();
        assert_eq!(summary.wires, 2);

        let starts: Vec<_> = doc
            .wires()
            .map(|w| {
                let xy = w.child("pts").unwrap().child("xy").unwrap();
                (xy.f64_at(1).unwrap(), xy.f64_at(2).unwrap())
            })
            .collect();
        assert_eq!(starts, vec![(0.0, 0.0), (0.0, 0.0)]);
    }

    #[test]
    fn test_single_connection_draws_nothing() {
        let mut doc = Document::blank("root");
        let summary = draw_nets(&mut doc, &table(), &[net(&[("A", "1")]), net(&[])]).unwrap();
        assert_eq!(summary, WiringSummary { wires: 0, skipped_nets: 2 });
        assert_eq!(doc.wires().count(), 0);
    }

    #[test]
    fn test_unknown_endpoint_leaves_document_unchanged() {
        let mut doc = Document::blank("root");
        let before = doc.clone();
        let err = draw_nets(
            &mut doc,
            &table(),
            &[net(&[("A", "1"), ("B", "1")]), net(&[("A", "2"), ("Z", "1")])],
        )
        .unwrap_err();
        assert!(matches!(err, SchematicError::NotFound(_)));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_pin_accepts_integers() {
        let net: Net = serde_json::from_str(
            r#"{"name": "VCC", "connections": [{"ref": "R1", "pin": 1}, {"ref": "D1", "pin": "2"}]}"#,
        )
        .unwrap();
        assert_eq!(net.connections[0], Connection::new("R1", "1"));
        assert_eq!(net.connections[1], Connection::new("D1", "2"));

        let anonymous: Net =
            serde_json::from_str(r#"{"connections": [{"ref": "R1", "pin": "1"}]}"#).unwrap();
        assert!(anonymous.name.is_none());
    }
}
