//! From a request to a wired schematic.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use pcbgen_llm::{
    Allowlist, ComponentSelector, NetlistGenerator, PinnedPlan, PinnedSymbol, Prompts,
    COMPONENT_PLAN_FILE, NET_PLAN_FILE,
};
use pcbgen_schematic::{
    clear_file, create_file, draw_nets_to_file, place_symbol, Net, PinTable, SymbolLibrary,
};
use serde::Serialize;

use crate::error::{Error, ErrorKind, InPhase, Phase, PhaseError};

pub const DEFAULT_SCHEMATIC: &str = "schematic.kicad_sch";
pub const PINNED_PLAN_FILE: &str = "llm_output1_with_pins.json";
pub const NETLIST_PROMPT_FILE: &str = "prompt2.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Outcome of [`Workflow::generate`]
#[derive(Debug, Clone, Serialize)]
pub struct GenerateResult {
    pub status: Status,
    pub phases_completed: u8,
    pub components: Vec<PinnedSymbol>,
    pub nets: Vec<Net>,
    /// Files written so far, by role
    pub files: BTreeMap<&'static str, PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_phase: Option<u8>,
}

impl GenerateResult {
    fn new() -> Self {
        Self {
            status: Status::Success,
            phases_completed: 0,
            components: Vec::new(),
            nets: Vec::new(),
            files: BTreeMap::new(),
            error: None,
            error_kind: None,
            failed_phase: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn schematic(&self) -> Option<&Path> {
        self.files.get("schematic").map(PathBuf::as_path)
    }

    fn complete(&mut self, phase: Phase) {
        log::info!("Finished {phase}");
        self.phases_completed = phase.number() + 1;
    }
}

/// The schematic generation pipeline, phases 0 to 6
pub struct Workflow<'a> {
    selector: &'a dyn ComponentSelector,
    netlist: &'a dyn NetlistGenerator,
    prompts: Prompts,
    library: SymbolLibrary,
    allowlist: Allowlist,
}

impl<'a> Workflow<'a> {
    pub fn new(
        selector: &'a dyn ComponentSelector,
        netlist: &'a dyn NetlistGenerator,
        library_root: impl Into<PathBuf>,
        allowlist: Allowlist,
    ) -> Self {
        Self {
            selector,
            netlist,
            prompts: Prompts::default(),
            library: SymbolLibrary::new(library_root),
            allowlist,
        }
    }

    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Generate a schematic for `request` into `target`, a `.kicad_sch`
    /// file or a directory. Failures are reported in the result.
    pub fn generate(&mut self, request: &str, target: &Path) -> GenerateResult {
        let mut result = GenerateResult::new();
        if let Err(e) = self.run(request, target, &mut result) {
            log::error!("{e}");
            result.status = Status::Error;
            result.error = Some(e.source.to_string());
            result.error_kind = Some(e.kind());
            result.failed_phase = Some(e.phase.number());
        }
        result
    }

    fn run(
        &mut self,
        request: &str,
        target: &Path,
        result: &mut GenerateResult,
    ) -> Result<(), PhaseError> {
        let schematic = prepare_schematic(target).in_phase(Phase::Filter)?;
        result.files.insert("schematic", schematic.clone());
        let out_dir = schematic
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        let phase = Phase::Filter;
        log::info!("Pre-filtering {} allowlist components", self.allowlist.len());
        let filtered = self.selector.filter(request, &self.allowlist);
        log::info!(
            "Filtered to {} of {} components",
            filtered.len(),
            self.allowlist.len()
        );
        result.complete(phase);

        let phase = Phase::Selection;
        let plan = self
            .selector
            .select(request, &filtered, &self.allowlist.canvas)
            .in_phase(phase)?;
        let path = write_json(&out_dir.join(COMPONENT_PLAN_FILE), &plan).in_phase(phase)?;
        result.files.insert("output1", path);
        result.complete(phase);

        let phase = Phase::Placement;
        let mut pinned = PinnedPlan::default();
        let mut table = PinTable::new();
        for symbol in &plan.symbols {
            let (_, instance) =
                place_symbol(&schematic, &mut self.library, &symbol.request()).in_phase(phase)?;
            table.insert(&instance.reference, &instance.lib_id, instance.pins.clone());

            let mut symbol = symbol.clone();
            symbol.ref_des = Some(instance.reference);
            pinned.symbols.push(PinnedSymbol {
                symbol,
                pins: instance.pins,
            });
        }
        log::info!(
            "Placed {} components in {}",
            pinned.symbols.len(),
            schematic.display()
        );
        result.complete(phase);

        let phase = Phase::PinMapping;
        let path = write_json(&out_dir.join(PINNED_PLAN_FILE), &pinned).in_phase(phase)?;
        result.files.insert("output1_with_pins", path);
        result.components = pinned.symbols.clone();
        result.complete(phase);

        let phase = Phase::NetlistPrompt;
        let prompt = self.prompts.netlist(&pinned.simplified());
        let path = out_dir.join(NETLIST_PROMPT_FILE);
        std::fs::write(&path, &prompt)
            .map_err(|e| Error::io(&path, e))
            .in_phase(phase)?;
        result.files.insert("prompt2", path);
        result.complete(phase);

        let phase = Phase::NetlistGeneration;
        let nets = self.netlist.generate(&prompt).in_phase(phase)?;
        let path = write_json(&out_dir.join(NET_PLAN_FILE), &nets).in_phase(phase)?;
        result.files.insert("output2", path);
        result.nets = nets.nets.clone();
        result.complete(phase);

        let phase = Phase::Wiring;
        let (_, summary) = draw_nets_to_file(&schematic, &table, &nets.nets).in_phase(phase)?;
        log::info!(
            "Drew {} wires for {} nets ({} skipped)",
            summary.wires,
            nets.nets.len(),
            summary.skipped_nets
        );
        result.complete(phase);

        Ok(())
    }
}

/// The schematic a run writes to, cleared.
///
/// A directory selects its first `.kicad_sch` file by name, or a new
/// `schematic.kicad_sch` inside it.
pub fn prepare_schematic(target: &Path) -> Result<PathBuf, Error> {
    let path = if target.is_dir() {
        find_schematic(target)?.unwrap_or_else(|| target.join(DEFAULT_SCHEMATIC))
    } else {
        target.to_path_buf()
    };

    if path.exists() {
        clear_file(&path)?;
    } else {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        create_file(&path)?;
    }
    Ok(path)
}

fn find_schematic(dir: &Path) -> Result<Option<PathBuf>, Error> {
    let entries = std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut schematics = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "kicad_sch") {
            schematics.push(path);
        }
    }
    schematics.sort();
    Ok(schematics.into_iter().next())
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<PathBuf, Error> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| Error::io(path, std::io::Error::other(e)))?;
    std::fs::write(path, json).map_err(|e| Error::io(path, e))?;
    log::debug!("Saved {}", path.display());
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_schematic_picks_first_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let b = dir.path().join("b.kicad_sch");
        let a = dir.path().join("a.kicad_sch");
        create_file(&b).unwrap();
        create_file(&a).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        assert_eq!(prepare_schematic(dir.path()).unwrap(), a);
    }

    #[test]
    fn test_prepare_schematic_creates_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = prepare_schematic(dir.path()).unwrap();
        assert_eq!(path, dir.path().join(DEFAULT_SCHEMATIC));
        assert!(path.is_file());

        let nested = dir.path().join("out/board.kicad_sch");
        assert_eq!(prepare_schematic(&nested).unwrap(), nested);
        assert!(nested.is_file());
    }

    #[test]
    fn test_result_serialization() {
        let mut result = GenerateResult::new();
        result.files.insert("schematic", PathBuf::from("a.kicad_sch"));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "success");
        assert!(json.get("error").is_none());

        result.status = Status::Error;
        result.error_kind = Some(ErrorKind::Upstream);
        result.failed_phase = Some(1);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error_kind"], "upstream");
        assert_eq!(json["failed_phase"], 1);
    }
}
