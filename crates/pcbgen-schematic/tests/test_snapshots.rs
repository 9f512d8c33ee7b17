use pcbgen_schematic::{
    draw_nets, place, Connection, Document, Net, PinTable, PlacementRequest, Position,
    SymbolDefinition,
};

const ROOT: &str = "0f7c5d3e-91a2-4b6e-8d31-6a0c2f4e9b10";
const UUID_PATTERN: &str = r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}";

fn resistor() -> SymbolDefinition {
    let sexpr = pcbgen_sexpr::parse(
        r#"(symbol "Device:R"
            (property "Reference" "R" (at 2.032 0 90))
            (property "Value" "R" (at 0 0 90))
            (symbol "R_1_1"
                (pin passive line (at 0 3.81 270) (length 1.27) (name "~") (number "1"))
                (pin passive line (at 0 -3.81 90) (length 1.27) (name "~") (number "2"))))"#,
    )
    .unwrap();
    SymbolDefinition::from_sexpr(sexpr).unwrap()
}

fn request(designator: &str, x: f64, y: f64, rot: f64) -> PlacementRequest {
    PlacementRequest {
        library: "Device.kicad_sym".to_string(),
        symbol: "R".to_string(),
        designator: Some(designator.to_string()),
        position: Position::new(x, y, rot),
        value: None,
        footprint: None,
    }
}

macro_rules! assert_schematic_snapshot {
    ($name:expr, $text:expr) => {
        insta::with_settings!({
            filters => vec![(UUID_PATTERN, "[UUID]")],
        }, {
            insta::assert_snapshot!($name, $text);
        });
    };
}

#[test]
fn test_blank_document_text() {
    let document = Document::blank(ROOT).with_project("demo");
    assert_schematic_snapshot!("blank_document", document.to_text());
}

#[test]
fn test_placed_and_wired_document_text() {
    let mut document = Document::blank(ROOT).with_project("demo");
    let definition = resistor();

    let mut table = PinTable::new();
    for req in [request("R1", 50.8, 63.5, 0.0), request("R", 63.5, 63.5, 90.0)] {
        let instance = place(&mut document, &definition, &req).unwrap();
        table.insert(&instance.reference, &instance.lib_id, instance.pins);
    }
    let nets = vec![Net {
        name: Some("MID".to_string()),
        connections: vec![Connection::new("R1", "2"), Connection::new("R2", "1")],
    }];
    draw_nets(&mut document, &table, &nets).unwrap();

    assert_schematic_snapshot!("placed_and_wired_document", document.to_text());
}
