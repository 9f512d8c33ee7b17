//! Symbol definitions pulled out of `.kicad_sym` libraries.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use pcbgen_sexpr::{scan, Sexpr};

use crate::error::{Result, SchematicError};
use crate::geometry::Position;

const SYMBOL_LIBRARY_EXT: &str = "kicad_sym";
const MAX_EXTENDS_DEPTH: usize = 8;

/// `library-stem:symbol-name`, the key of a definition inside `lib_symbols`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LibraryId {
    pub library: String,
    pub symbol: String,
}

impl LibraryId {
    pub fn new(library: impl Into<String>, symbol: impl Into<String>) -> Self {
        LibraryId {
            library: library.into(),
            symbol: symbol.into(),
        }
    }

    /// Identifier for `symbol` from the library file at `path`
    pub fn for_file(path: &Path, symbol: &str) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        LibraryId::new(stem, symbol)
    }

    pub fn parse(text: &str) -> Option<Self> {
        let (library, symbol) = text.split_once(':')?;
        Some(LibraryId::new(library, symbol))
    }
}

impl fmt::Display for LibraryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.library, self.symbol)
    }
}

/// One component type, renamed to its library id and with `extends` resolved
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolDefinition {
    id: LibraryId,
    sexpr: Sexpr,
}

impl SymbolDefinition {
    /// Wrap a `(symbol "lib:name" ...)` block taken from a document's `lib_symbols`
    pub fn from_sexpr(sexpr: Sexpr) -> Result<Self> {
        let header = sexpr
            .atom_at(1)
            .filter(|_| sexpr.is_tagged("symbol"))
            .ok_or_else(|| SchematicError::Format("expected a (symbol \"lib:name\" ...) block".into()))?;
        let id = LibraryId::parse(header).ok_or_else(|| {
            SchematicError::Format(format!("symbol identifier {header:?} is not of the form lib:name"))
        })?;
        Ok(SymbolDefinition { id, sexpr })
    }

    pub fn id(&self) -> &LibraryId {
        &self.id
    }

    pub fn sexpr(&self) -> &Sexpr {
        &self.sexpr
    }

    pub fn into_sexpr(self) -> Sexpr {
        self.sexpr
    }

    /// Value of a top-level property such as `Reference`
    pub fn property_value(&self, key: &str) -> Option<&str> {
        self.sexpr.property(key)?.atom_at(2)
    }

    /// The `(at x y rot)` anchor of a top-level property
    pub fn property_anchor(&self, key: &str) -> Result<Position> {
        self.sexpr
            .property(key)
            .and_then(Position::from_at)
            .ok_or_else(|| SchematicError::MissingProperty {
                symbol: self.id.to_string(),
                property: key.to_string(),
            })
    }
}

/// Read `symbol_name` from the library at `library_file`.
///
/// Only the matching top-level block is parsed. A symbol that extends a
/// parent is flattened against the parent from the same file, then its header
/// is rewritten to `stem:name`.
pub fn extract_definition(library_file: &Path, symbol_name: &str) -> Result<SymbolDefinition> {
    let text = fs::read_to_string(library_file)
        .map_err(|e| SchematicError::io(library_file, e))?;
    let id = LibraryId::for_file(library_file, symbol_name);
    log::debug!("Extracting {id} from {}", library_file.display());

    let mut sexpr = load_flattened(&text, library_file, symbol_name, 0)?;
    if let Some(items) = sexpr.as_list_mut() {
        items[1] = Sexpr::string(id.to_string());
    }
    Ok(SymbolDefinition { id, sexpr })
}

fn load_flattened(text: &str, library_file: &Path, name: &str, depth: usize) -> Result<Sexpr> {
    if depth > MAX_EXTENDS_DEPTH {
        return Err(SchematicError::Format(format!(
            "extends chain for {name} in {} is too deep",
            library_file.display()
        )));
    }

    let root = scan::root_start(text).ok_or_else(|| {
        SchematicError::Format(format!("{} is not a symbol library", library_file.display()))
    })?;
    let span = scan::find_child_block(text, root, "symbol", name)?.ok_or_else(|| {
        SchematicError::not_found(format!(
            "symbol {name} not found in {}",
            library_file.display()
        ))
    })?;

    let block = pcbgen_sexpr::parse(&text[span]).map_err(|source| SchematicError::Parse {
        context: format!("symbol {name} in {}", library_file.display()),
        source,
    })?;

    let parent = block.child("extends").and_then(|e| e.atom_at(1)).map(str::to_owned);
    match parent {
        Some(parent) => {
            log::debug!("{name} extends {parent}");
            let parent_block = load_flattened(text, library_file, &parent, depth + 1)?;
            Ok(flatten_extends(&parent_block, &block))
        }
        None => Ok(block),
    }
}

/// Merge a derived symbol over its parent.
///
/// Parent items keep their order; any property or attribute the child
/// redefines replaces the parent's in place. Child-only items follow. The
/// parent's unit sub-symbols are renamed from the parent's name to the
/// child's, unless the child brings its own units.
fn flatten_extends(parent: &Sexpr, child: &Sexpr) -> Sexpr {
    let parent_name = parent.atom_at(1).unwrap_or_default();
    let child_name = child.atom_at(1).unwrap_or_default().to_string();

    let child_items: Vec<&Sexpr> = child
        .items()
        .iter()
        .skip(2)
        .filter(|item| !item.is_tagged("extends"))
        .collect();
    let child_has_units = child_items.iter().any(|item| item.is_tagged("symbol"));
    let mut used = vec![false; child_items.len()];

    let mut merged = vec![Sexpr::symbol("symbol"), Sexpr::string(child_name.clone())];
    for item in parent.items().iter().skip(2) {
        if item.is_tagged("symbol") {
            if !child_has_units {
                merged.push(rename_unit(item, parent_name, &child_name));
            }
            continue;
        }

        let key = item_key(item);
        let replacement = child_items
            .iter()
            .position(|c| !c.is_tagged("symbol") && key.is_some() && item_key(c) == key);
        match replacement {
            Some(i) => {
                used[i] = true;
                merged.push(child_items[i].clone());
            }
            None => merged.push(item.clone()),
        }
    }

    let (units, rest): (Vec<_>, Vec<_>) = child_items
        .iter()
        .zip(used)
        .filter(|(_, used)| !used)
        .map(|(item, _)| *item)
        .partition(|item| item.is_tagged("symbol"));
    merged.extend(rest.into_iter().cloned());
    merged.extend(units.into_iter().cloned());

    Sexpr::List(merged)
}

/// Properties are keyed by name, everything else by tag
fn item_key(item: &Sexpr) -> Option<(&str, Option<&str>)> {
    let head = item.head()?;
    if head == "property" {
        Some((head, item.atom_at(1)))
    } else {
        Some((head, None))
    }
}

fn rename_unit(unit: &Sexpr, parent_name: &str, child_name: &str) -> Sexpr {
    let mut unit = unit.clone();
    if let Some(items) = unit.as_list_mut() {
        let renamed = items
            .get(1)
            .and_then(Sexpr::as_atom)
            .and_then(|name| name.strip_prefix(parent_name))
            .map(|suffix| format!("{child_name}{suffix}"));
        if let Some(renamed) = renamed {
            items[1] = Sexpr::string(renamed);
        }
    }
    unit
}

/// Cache of extracted definitions under a library root directory
#[derive(Debug, Default)]
pub struct SymbolLibrary {
    root: PathBuf,
    cache: HashMap<LibraryId, SymbolDefinition>,
}

impl SymbolLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        SymbolLibrary {
            root: root.into(),
            cache: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a library given by file name (`Device.kicad_sym`), bare name
    /// (`Device`) or absolute path
    pub fn library_path(&self, library: &str) -> PathBuf {
        let mut path = self.root.join(library);
        if path.extension().map_or(true, |ext| ext != SYMBOL_LIBRARY_EXT) {
            let mut name = path.clone().into_os_string();
            name.push(".");
            name.push(SYMBOL_LIBRARY_EXT);
            path = PathBuf::from(name);
        }
        path
    }

    /// Definition of `symbol` from `library`, read on first use
    pub fn definition(&mut self, library: &str, symbol: &str) -> Result<&SymbolDefinition> {
        let path = self.library_path(library);
        let id = LibraryId::for_file(&path, symbol);
        if !self.cache.contains_key(&id) {
            let definition = extract_definition(&path, symbol)?;
            self.cache.insert(id.clone(), definition);
        }
        Ok(&self.cache[&id])
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
