
use std::fs;

use pcbgen_schematic::{
    clear_file, draw_nets_to_file, extract_definition, merge_into, place_symbol, Connection,
    Document, Net, PinTable, PlacementRequest, Position, SchematicError, SymbolLibrary,
};
use pcbgen_sexpr::scan;
use test_utils::{libraries, schematic, setup_test_env};

fn request(symbol: &str, designator: Option<&str>, x: f64, y: f64, rot: f64) -> PlacementRequest {
    PlacementRequest {
        library: "Device.kicad_sym".to_string(),
        symbol: symbol.to_string(),
        designator: designator.map(str::to_string),
        position: Position::new(x, y, rot),
        value: None,
        footprint: None,
    }
}

#[test]
fn test_extract_renames_header_only() {
    let env = setup_test_env();
    let definition = extract_definition(&libraries(&env).join("Device.kicad_sym"), "R").unwrap();

    assert_eq!(definition.id().to_string(), "Device:R");
    assert_eq!(definition.sexpr().atom_at(1), Some("Device:R"));
    let units: Vec<_> = definition
        .sexpr()
        .children("symbol")
        .filter_map(|u| u.atom_at(1))
        .collect();
    assert_eq!(units, vec!["R_0_1", "R_1_1"]);
    assert_eq!(
        definition.property_value("Description"),
        Some("Resistor (generic)")
    );
}

#[test]
fn test_extract_flattens_extends() {
    let env = setup_test_env();
    let definition =
        extract_definition(&libraries(&env).join("Device.kicad_sym"), "R_Alt").unwrap();

    assert_eq!(definition.id().to_string(), "Device:R_Alt");
    assert!(definition.sexpr().child("extends").is_none());
    assert_eq!(definition.property_value("Value"), Some("R_Alt"));
    assert_eq!(definition.pins().len(), 2);
    assert!(definition
        .sexpr()
        .children("symbol")
        .all(|u| u.atom_at(1).is_some_and(|name| name.starts_with("R_Alt_"))));
}

#[test]
fn test_extract_errors() {
    let env = setup_test_env();
    let device = libraries(&env).join("Device.kicad_sym");

    assert!(matches!(
        extract_definition(&device, "L"),
        Err(SchematicError::NotFound(_))
    ));
    assert!(matches!(
        extract_definition(&device, "R_Orphan"),
        Err(SchematicError::NotFound(_))
    ));
    assert!(matches!(
        extract_definition(&libraries(&env).join("Missing.kicad_sym"), "R"),
        Err(SchematicError::Io { .. })
    ));
}

#[test]
fn test_merge_is_idempotent() {
    let env = setup_test_env();
    let device = libraries(&env).join("Device.kicad_sym");
    let mut document = Document::load(&schematic(&env)).unwrap();

    assert!(merge_into(&mut document, &device, "C").unwrap());
    let once = document.to_text();
    assert!(!merge_into(&mut document, &device, "C").unwrap());
    assert_eq!(document.to_text(), once);
    assert!(scan::is_balanced(&once));
}

#[test]
fn test_merge_requires_lib_symbols() {
    let env = setup_test_env();
    let mut document = Document::parse("(kicad_sch (uuid \"abc\"))").unwrap();
    let err = merge_into(&mut document, &libraries(&env).join("Device.kicad_sym"), "R").unwrap_err();
    assert!(matches!(err, SchematicError::Format(_)));
}

#[test]
fn test_place_symbol_persists() {
    let env = setup_test_env();
    let path = schematic(&env);
    let mut library = SymbolLibrary::new(libraries(&env));

    let (_, first) = place_symbol(&path, &mut library, &request("R", Some("R"), 50.8, 63.5, 0.0)).unwrap();
    let (_, second) = place_symbol(&path, &mut library, &request("R", None, 76.2, 63.5, 90.0)).unwrap();
    assert_eq!(first.reference, "R1");
    assert_eq!(second.reference, "R2");
    assert_eq!(library.cached(), 1);

    let text = fs::read_to_string(&path).unwrap();
    assert!(scan::is_balanced(&text));
    assert_eq!(text.matches("(symbol \"Device:R\"").count(), 1);

    let document = Document::load(&path).unwrap();
    assert_eq!(document.references(), vec!["R1", "R2"]);
    assert_eq!(document.project(), "blank");

    let table = PinTable::from_document(&document).unwrap();
    assert_eq!(table.get("R1").unwrap().pins, first.pins);
    assert_eq!(table.get("R2").unwrap().pins, second.pins);
}

#[test]
fn test_failed_placement_leaves_file_untouched() {
    let env = setup_test_env();
    let path = schematic(&env);
    let before = fs::read_to_string(&path).unwrap();
    let mut library = SymbolLibrary::new(libraries(&env));

    let err = place_symbol(&path, &mut library, &request("R_Broken", None, 0.0, 0.0, 0.0)).unwrap_err();
    assert!(matches!(err, SchematicError::MissingProperty { .. }));
    let err = place_symbol(&path, &mut library, &request("Q", None, 0.0, 0.0, 0.0)).unwrap_err();
    assert!(matches!(err, SchematicError::NotFound(_)));

    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn test_pinless_symbol_places_cleanly() {
    let env = setup_test_env();
    let path = schematic(&env);
    let mut library = SymbolLibrary::new(libraries(&env));
    let mut hole = request("MountingHole", None, 20.0, 20.0, 0.0);
    hole.library = "Mechanical".to_string();

    let (document, instance) = place_symbol(&path, &mut library, &hole).unwrap();
    assert_eq!(instance.reference, "H1");
    assert!(instance.pins.is_empty());
    let component = document.components().next().unwrap();
    assert_eq!(component.children("pin").count(), 0);
}

#[test]
fn test_alternate_body_style_does_not_override_pins() {
    let env = setup_test_env();
    let definition = extract_definition(&libraries(&env).join("Device.kicad_sym"), "LED").unwrap();
    let pins = definition.pins();
    assert_eq!(pins.len(), 2);
    assert_eq!(pins[0].name, "K");
    assert_eq!(pins[0].local, Position::new(-3.81, 0.0, 0.0));
}

#[test]
fn test_place_and_wire() {
    let env = setup_test_env();
    let path = schematic(&env);
    let mut library = SymbolLibrary::new(libraries(&env));

    let mut table = PinTable::new();
    for req in [
        request("R", Some("R1"), 50.8, 50.8, 0.0),
        request("LED", Some("D1"), 63.5, 50.8, 0.0),
        request("C", Some("C1"), 76.2, 50.8, 0.0),
    ] {
        let (_, instance) = place_symbol(&path, &mut library, &req).unwrap();
        table.insert(&instance.reference, &instance.lib_id, instance.pins);
    }

    let nets = vec![
        Net {
            name: Some("LED_A".to_string()),
            connections: vec![Connection::new("R1", "2"), Connection::new("D1", "2")],
        },
        Net {
            name: Some("GND".to_string()),
            connections: vec![
                Connection::new("D1", "1"),
                Connection::new("C1", "2"),
                Connection::new("R1", "1"),
            ],
        },
        Net {
            name: None,
            connections: vec![Connection::new("C1", "1")],
        },
    ];
    let (document, summary) = draw_nets_to_file(&path, &table, &nets).unwrap();
    assert_eq!(summary.wires, 3);
    assert_eq!(summary.skipped_nets, 1);

    let reloaded = Document::load(&path).unwrap();
    assert_eq!(reloaded.wires().count(), 3);
    assert_eq!(reloaded, document);
    assert!(scan::is_balanced(&fs::read_to_string(&path).unwrap()));

    // R1 pin 2 sits 3.81 below the symbol origin once y is inverted
    let first = reloaded.wires().next().unwrap();
    let start = first.child("pts").unwrap().child("xy").unwrap();
    assert_eq!(start.f64_at(1), Some(50.8));
    assert_eq!(start.f64_at(2), Some(54.61));
}

#[test]
fn test_clear_file() {
    let env = setup_test_env();
    let path = schematic(&env);
    let mut library = SymbolLibrary::new(libraries(&env));
    place_symbol(&path, &mut library, &request("R", None, 10.0, 10.0, 0.0)).unwrap();

    let cleared = clear_file(&path).unwrap();
    assert_eq!(cleared.root_uuid().unwrap(), "0f7c5d3e-91a2-4b6e-8d31-6a0c2f4e9b10");
    let reloaded = Document::load(&path).unwrap();
    assert_eq!(reloaded.components().count(), 0);
    assert!(reloaded.lib_symbols().unwrap().items().len() == 1);
}

#[test]
fn test_clear_file_tolerates_damaged_body() {
    let env = setup_test_env();
    let path = env.path().join("damaged.kicad_sch");
    fs::write(
        &path,
        "(kicad_sch\n\t(uuid \"11111111-2222-3333-4444-555555555555\")\n\t(lib_symbols)\n\t(lib_symbols)\n)\n",
    )
    .unwrap();
    assert!(Document::load(&path).is_err());

    clear_file(&path).unwrap();
    let reloaded = Document::load(&path).unwrap();
    assert_eq!(
        reloaded.root_uuid().unwrap(),
        "11111111-2222-3333-4444-555555555555"
    );

    fs::write(&path, "(kicad_sch (lib_symbols))").unwrap();
    assert!(matches!(clear_file(&path), Err(SchematicError::Format(_))));
}

#[test]
fn test_trailing_text_is_rejected_before_saving() {
    let env = setup_test_env();
    let path = schematic(&env);
    let mut text = fs::read_to_string(&path).unwrap();
    text.push_str("(symbol \"stray\")\n");
    fs::write(&path, &text).unwrap();
    let mut library = SymbolLibrary::new(libraries(&env));

    let err = place_symbol(&path, &mut library, &request("R", None, 0.0, 0.0, 0.0)).unwrap_err();
    assert!(matches!(err, SchematicError::Format(_)));
    assert_eq!(fs::read_to_string(&path).unwrap(), text);
}
