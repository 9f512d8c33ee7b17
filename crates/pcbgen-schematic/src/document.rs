//! In-memory schematic document and its storage.

use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::Path;

use pcbgen_sexpr::{format_sexpr, scan, Sexpr};
use uuid::Uuid;

use crate::error::{Result, SchematicError};
use crate::library::SymbolDefinition;

pub const SCHEMATIC_VERSION: &str = "20250114";
pub const GENERATOR: &str = "eeschema";
pub const GENERATOR_VERSION: &str = "9.0";

/// Top-level sections that may appear at most once
const SINGLETON_SECTIONS: [&str; 2] = ["lib_symbols", "sheet_instances"];

/// A parsed `.kicad_sch` document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Sexpr,
    project: String,
}

impl Document {
    /// Parse schematic text.
    ///
    /// The text must hold exactly one `(kicad_sch ...)` list with exactly one
    /// top-level `(uuid ...)`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut exprs = pcbgen_sexpr::parse_all(text).map_err(|source| SchematicError::Parse {
            context: "schematic".to_string(),
            source,
        })?;
        if exprs.len() != 1 {
            return Err(SchematicError::Format(format!(
                "expected a single top-level list, found {}",
                exprs.len()
            )));
        }
        let root = exprs.remove(0);
        if !root.is_tagged("kicad_sch") {
            return Err(SchematicError::Format(
                "root list is not (kicad_sch ...)".to_string(),
            ));
        }
        for section in SINGLETON_SECTIONS {
            if root.children(section).count() > 1 {
                return Err(SchematicError::Format(format!(
                    "document has more than one ({section} ...) section"
                )));
            }
        }

        if root.children("uuid").count() != 1 {
            return Err(SchematicError::Format(
                "document must have exactly one top-level (uuid ...)".to_string(),
            ));
        }

        Ok(Document {
            root,
            project: String::new(),
        })
    }

    /// Load from disk. The project name defaults to the file stem.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| SchematicError::io(path, e))?;
        let mut document = Self::parse(&text)?;
        if let Some(stem) = path.file_stem() {
            document.project = stem.to_string_lossy().into_owned();
        }
        log::debug!("Loaded schematic {}", path.display());
        Ok(document)
    }

    /// An empty sheet with the given root identifier
    pub fn blank(root_uuid: &str) -> Self {
        let root = Sexpr::node(
            "kicad_sch",
            [
                Sexpr::node("version", [Sexpr::symbol(SCHEMATIC_VERSION)]),
                Sexpr::node("generator", [Sexpr::string(GENERATOR)]),
                Sexpr::node("generator_version", [Sexpr::string(GENERATOR_VERSION)]),
                Sexpr::node("uuid", [Sexpr::string(root_uuid)]),
                Sexpr::node("paper", [Sexpr::string("A4")]),
                Sexpr::node("lib_symbols", []),
                Sexpr::node(
                    "sheet_instances",
                    [Sexpr::node(
                        "path",
                        [
                            Sexpr::string("/"),
                            Sexpr::node("page", [Sexpr::string("1")]),
                        ],
                    )],
                ),
                Sexpr::node("embedded_fonts", [Sexpr::symbol("no")]),
            ],
        );
        Document {
            root,
            project: String::new(),
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    /// Project name written into component `instances`
    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn root(&self) -> &Sexpr {
        &self.root
    }

    /// Serialized text, newline-terminated
    pub fn to_text(&self) -> String {
        let mut text = format_sexpr(&self.root, 0);
        text.push('\n');
        text
    }

    /// Replace the file at `path` with this document.
    ///
    /// The text goes to a temporary file in the same directory which is then
    /// renamed over the target.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_atomic(path, &self.to_text())?;
        log::debug!("Saved schematic {}", path.display());
        Ok(())
    }

    /// Value of the top-level `(uuid ...)`
    pub fn root_uuid(&self) -> Result<&str> {
        self.root
            .child("uuid")
            .and_then(|u| u.atom_at(1))
            .ok_or_else(|| {
                SchematicError::Format("document has no top-level (uuid ...)".to_string())
            })
    }

    pub fn lib_symbols(&self) -> Option<&Sexpr> {
        self.root.child("lib_symbols")
    }

    /// Whether a `(symbol "<id>" ...)` definition exists anywhere in the document
    pub fn has_definition(&self, id: &str) -> bool {
        self.root
            .find_all("symbol")
            .iter()
            .any(|s| s.atom_at(1) == Some(id))
    }

    /// The embedded library definition with the given id
    pub fn definition(&self, id: &str) -> Option<&Sexpr> {
        self.lib_symbols()?
            .children("symbol")
            .find(|s| s.atom_at(1) == Some(id))
    }

    /// Add a library definition to `lib_symbols`.
    ///
    /// Returns `false` and leaves the document unchanged when a definition
    /// with the same id is already present.
    pub fn merge_symbol(&mut self, definition: &SymbolDefinition) -> Result<bool> {
        let id = definition.id().to_string();
        if self.has_definition(&id) {
            log::debug!("{id} already present in lib_symbols");
            return Ok(false);
        }

        let lib_symbols = self
            .root
            .child_mut("lib_symbols")
            .and_then(Sexpr::as_list_mut)
            .ok_or_else(|| {
                SchematicError::Format("document has no (lib_symbols ...) section".to_string())
            })?;
        lib_symbols.push(definition.sexpr().clone());
        log::debug!("Merged {id} into lib_symbols");
        Ok(true)
    }

    /// Placed component blocks, in document order
    pub fn components(&self) -> impl Iterator<Item = &Sexpr> {
        self.root.children("symbol")
    }

    /// Wire blocks, in document order
    pub fn wires(&self) -> impl Iterator<Item = &Sexpr> {
        self.root.children("wire")
    }

    /// Reference designators of every placed component
    pub fn references(&self) -> Vec<&str> {
        self.components()
            .filter_map(|c| c.property("Reference")?.atom_at(2))
            .collect()
    }

    pub fn has_reference(&self, reference: &str) -> bool {
        self.references().contains(&reference)
    }

    /// `prefix` followed by the smallest positive integer not yet used with it
    pub fn next_reference(&self, prefix: &str) -> String {
        let used: BTreeSet<u64> = self
            .references()
            .into_iter()
            .filter_map(|r| {
                let digits = r.strip_prefix(prefix)?;
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                digits.parse().ok()
            })
            .collect();

        let n = (1..).find(|n| !used.contains(n)).unwrap_or(1);
        format!("{prefix}{n}")
    }

    /// Insert a top-level item before `sheet_instances`, or at the end of the
    /// root list when there is none.
    pub fn insert_item(&mut self, item: Sexpr) {
        let Some(items) = self.root.as_list_mut() else {
            return;
        };
        match items.iter().position(|i| i.is_tagged("sheet_instances")) {
            Some(index) => items.insert(index, item),
            None => items.push(item),
        }
    }

    /// Append a straight wire between two sheet points. Returns its uuid.
    pub fn add_wire(&mut self, from: (f64, f64), to: (f64, f64)) -> String {
        let id = Uuid::new_v4().to_string();
        let xy = |(x, y): (f64, f64)| Sexpr::node("xy", [Sexpr::number(x), Sexpr::number(y)]);
        let wire = Sexpr::node(
            "wire",
            [
                Sexpr::node("pts", [xy(from), xy(to)]),
                Sexpr::node(
                    "stroke",
                    [
                        Sexpr::node("width", [Sexpr::number(0.0)]),
                        Sexpr::node("type", [Sexpr::symbol("default")]),
                    ],
                ),
                Sexpr::node("uuid", [Sexpr::string(id.clone())]),
            ],
        );
        self.insert_item(wire);
        id
    }

    /// Drop every component, wire and library definition, keeping the root uuid.
    pub fn clear(&mut self) -> Result<()> {
        let root_uuid = self.root_uuid()?.to_string();
        self.root = Document::blank(&root_uuid).root;
        Ok(())
    }
}

/// Reset the schematic at `path` to an empty sheet with the same root uuid.
///
/// Only the root identifier is read, so documents the parser rejects can
/// still be cleared.
pub fn clear_file(path: &Path) -> Result<Document> {
    let text = fs::read_to_string(path).map_err(|e| SchematicError::io(path, e))?;
    let root_uuid = scan::locate_root_identifier(&text)?;
    let mut document = Document::blank(&root_uuid);
    if let Some(stem) = path.file_stem() {
        document.project = stem.to_string_lossy().into_owned();
    }
    document.save(path)?;
    log::info!("Cleared schematic {}", path.display());
    Ok(document)
}

/// Create a new empty schematic with a fresh root uuid.
pub fn create_file(path: &Path) -> Result<Document> {
    let mut document = Document::blank(&Uuid::new_v4().to_string());
    if let Some(stem) = path.file_stem() {
        document.project = stem.to_string_lossy().into_owned();
    }
    document.save(path)?;
    log::info!("Created schematic {}", path.display());
    Ok(document)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file =
        tempfile::NamedTempFile::new_in(dir).map_err(|e| SchematicError::io(dir, e))?;
    file.write_all(contents.as_bytes())
        .map_err(|e| SchematicError::io(file.path(), e))?;
    file.persist(path)
        .map_err(|e| SchematicError::io(path, e.error))?;
    Ok(())
}
