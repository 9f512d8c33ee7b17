//! Payloads exchanged with the language model.

use std::collections::BTreeMap;
use std::path::Path;

use pcbgen_schematic::{Net, PinMap, PlacementRequest, Position};
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// One component the model may choose from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllowedComponent {
    /// Library file, e.g. `Device.kicad_sym`
    pub lib: String,
    pub symbol: String,
    /// Designator prefix, e.g. `R`
    #[serde(rename = "ref", default)]
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Set by the pre-filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The allowlist file: components plus the canvas the model places them on
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Allowlist {
    pub allowlist: Vec<AllowedComponent>,
    #[serde(default)]
    pub canvas: serde_json::Value,
}

impl Allowlist {
    pub fn load(path: &Path) -> Result<Self, LlmError> {
        let text = std::fs::read_to_string(path).map_err(|e| LlmError::io(path, e))?;
        serde_json::from_str(&text)
            .map_err(|e| LlmError::invalid_json(path.display().to_string(), e))
    }

    pub fn len(&self) -> usize {
        self.allowlist.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowlist.is_empty()
    }
}

/// Reply of the pre-filter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterSelection {
    #[serde(default)]
    pub selected: Vec<AllowedComponent>,
}

/// Position on the canvas, in mm and degrees
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CanvasPosition {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub rot: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedSymbol {
    pub lib: String,
    pub symbol: String,
    #[serde(default)]
    pub ref_des: Option<String>,
    pub at: CanvasPosition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footprint: Option<String>,
}

impl PlannedSymbol {
    pub fn request(&self) -> PlacementRequest {
        PlacementRequest {
            library: self.lib.clone(),
            symbol: self.symbol.clone(),
            designator: self.ref_des.clone(),
            position: Position::new(self.at.x, self.at.y, self.at.rot),
            value: self.value.clone(),
            footprint: self.footprint.clone().filter(|f| !f.is_empty()),
        }
    }
}

/// Component selection reply (`llm_output1.json`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentPlan {
    pub symbols: Vec<PlannedSymbol>,
}

/// A placed symbol with its resolved pins (`llm_output1_with_pins.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinnedSymbol {
    #[serde(flatten)]
    pub symbol: PlannedSymbol,
    pub pins: PinMap,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PinnedPlan {
    pub symbols: Vec<PinnedSymbol>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct SimplifiedSymbol<'a> {
    #[serde(flatten)]
    symbol: &'a PlannedSymbol,
    pins: BTreeMap<&'a str, &'a str>,
}

#[derive(Debug, Serialize)]
struct SimplifiedPlan<'a> {
    symbols: Vec<SimplifiedSymbol<'a>>,
}

impl PinnedPlan {
    /// The plan with each pin reduced to `number -> name`, as shown to the
    /// netlist model.
    pub fn simplified(&self) -> serde_json::Value {
        let plan = SimplifiedPlan {
            symbols: self
                .symbols
                .iter()
                .map(|s| SimplifiedSymbol {
                    symbol: &s.symbol,
                    pins: s
                        .pins
                        .iter()
                        .map(|(number, pin)| (number.as_str(), pin.name.as_str()))
                        .collect(),
                })
                .collect(),
        };
        serde_json::to_value(plan).unwrap_or_default()
    }
}

/// Netlist reply (`llm_output2.json`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetPlan {
    pub nets: Vec<Net>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcbgen_schematic::ResolvedPin;

    #[test]
    fn test_plan_from_model_reply() {
        let plan: ComponentPlan = serde_json::from_str(
            r#"{"symbols": [
                {"lib": "Device.kicad_sym", "symbol": "R", "ref_des": "R1",
                 "at": {"x": 50.8, "y": 63.5, "rot": 90}, "value": "10k",
                 "footprint": "Resistor_SMD:R_0603_1608Metric"},
                {"lib": "power.kicad_sym", "symbol": "GND", "at": {"x": 10, "y": 20}, "footprint": ""}
            ]}"#,
        )
        .unwrap();

        let first = plan.symbols[0].request();
        assert_eq!(first.designator.as_deref(), Some("R1"));
        assert_eq!(first.position, Position::new(50.8, 63.5, 90.0));
        assert_eq!(first.value.as_deref(), Some("10k"));

        let second = plan.symbols[1].request();
        assert_eq!(second.designator, None);
        assert_eq!(second.footprint, None);
        assert_eq!(second.position.rot, 0.0);
    }

    #[test]
    fn test_simplified_pins() {
        let mut pins = PinMap::new();
        pins.insert(
            "1".to_string(),
            ResolvedPin {
                name: "VDD".to_string(),
                x: 150.5,
                y: 100.2,
                rot: 0.0,
            },
        );
        let plan = PinnedPlan {
            symbols: vec![PinnedSymbol {
                symbol: PlannedSymbol {
                    lib: "Device.kicad_sym".to_string(),
                    symbol: "C".to_string(),
                    ref_des: Some("C1".to_string()),
                    at: CanvasPosition::default(),
                    value: None,
                    footprint: None,
                },
                pins,
            }],
        };

        let simplified = plan.simplified();
        assert_eq!(simplified["symbols"][0]["pins"]["1"], "VDD");
        assert_eq!(simplified["symbols"][0]["ref_des"], "C1");

        let full = serde_json::to_value(&plan).unwrap();
        assert_eq!(full["symbols"][0]["pins"]["1"]["x"], 150.5);
        let back: PinnedPlan = serde_json::from_value(full).unwrap();
        assert_eq!(back, plan);
    }
}
