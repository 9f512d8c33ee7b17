//! `pcbgen.toml` configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use pcbgen_kicad::{find_symbol_dir, Freerouting, KicadPython};
use pcbgen_layout::LayoutOptions;
use pcbgen_llm::LlmConfig;
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub const CONFIG_FILE: &str = "pcbgen.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the KiCad `.kicad_sym` libraries
    pub library_root: Option<PathBuf>,
    /// Distance between the footprints and the board edge, mm
    pub spacing_margin_mm: f64,
    /// Minimum clearance between footprints, mm
    pub min_spacing_mm: f64,
    pub max_relaxation_iterations: usize,
    pub autoroute_timeout_seconds: u64,
    /// Component allowlist JSON
    pub allowlist: PathBuf,
    pub llm: LlmConfig,
    pub kicad: KicadConfig,
    pub autorouter: AutorouterConfig,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    base_dir: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KicadConfig {
    /// KiCad's Python interpreter; discovered when unset
    pub python: Option<PathBuf>,
    /// Directories added to `PYTHONPATH`; discovered when empty
    pub site_packages: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutorouterConfig {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for AutorouterConfig {
    fn default() -> Self {
        Self {
            command: "freerouting".to_string(),
            args: Vec::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let layout = LayoutOptions::default();
        Self {
            library_root: None,
            spacing_margin_mm: layout.margin,
            min_spacing_mm: layout.min_spacing,
            max_relaxation_iterations: layout.max_iterations,
            autoroute_timeout_seconds: 300,
            allowlist: PathBuf::from("allow_list.json"),
            llm: LlmConfig::default(),
            kicad: KicadConfig::default(),
            autorouter: AutorouterConfig::default(),
            base_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    pub fn from_toml(text: &str, base_dir: &Path) -> Result<Self, toml::de::Error> {
        let mut config: Config = toml::from_str(text)?;
        config.base_dir = base_dir.to_path_buf();
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let base_dir = path.parent().unwrap_or(Path::new("."));
        let config = Self::from_toml(&text, base_dir).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load the nearest `pcbgen.toml` at or above `start`, or the defaults
    /// when there is none.
    pub fn discover(start: &Path) -> Result<Self, Error> {
        let mut current = if start.is_dir() {
            Some(start.to_path_buf())
        } else {
            start.parent().map(Path::to_path_buf)
        };

        while let Some(dir) = current {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                return Self::load(&candidate);
            }
            current = dir.parent().map(Path::to_path_buf);
        }

        log::debug!("No {CONFIG_FILE} found, using defaults");
        Ok(Self::default())
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// The configured library root, or the KiCad installation's symbols.
    pub fn library_root(&self) -> Result<PathBuf, Error> {
        if let Some(root) = &self.library_root {
            return Ok(self.resolve(root));
        }
        find_symbol_dir().ok_or_else(|| Error::Config {
            path: self.base_dir.join(CONFIG_FILE),
            message: "library_root is not set and no KiCad symbol directory was found".to_string(),
        })
    }

    pub fn allowlist_path(&self) -> PathBuf {
        self.resolve(&self.allowlist)
    }

    /// LLM settings with prompt overrides resolved against the config file
    pub fn llm(&self) -> LlmConfig {
        let mut llm = self.llm.clone();
        for prompt in [
            &mut llm.filter_prompt,
            &mut llm.selection_prompt,
            &mut llm.netlist_prompt,
        ] {
            if let Some(path) = prompt.as_mut() {
                *path = self.resolve(path);
            }
        }
        llm
    }

    pub fn layout_options(&self) -> LayoutOptions {
        LayoutOptions {
            min_spacing: self.min_spacing_mm,
            max_iterations: self.max_relaxation_iterations,
            margin: self.spacing_margin_mm,
        }
    }

    pub fn kicad_python(&self) -> KicadPython {
        let default = KicadPython::default();
        let interpreter = match &self.kicad.python {
            Some(python) => self.resolve(python),
            None => default.interpreter().to_path_buf(),
        };
        let site_packages = if self.kicad.site_packages.is_empty() {
            default.site_packages().to_vec()
        } else {
            self.kicad.site_packages.iter().map(|p| self.resolve(p)).collect()
        };
        KicadPython::new(interpreter, site_packages)
    }

    pub fn autorouter(&self) -> Freerouting {
        Freerouting::new(
            self.autorouter.command.clone(),
            self.autorouter.args.clone(),
            Duration::from_secs(self.autoroute_timeout_seconds),
            self.kicad_python(),
        )
    }
}
