//! Schematic generation workflow and board pipeline.
//!
//! [`Workflow`] runs the generation phases against a schematic file:
//! component filtering and selection, placement, pin mapping, netlist
//! prompt and generation, then wiring. [`process_board`] runs the board
//! phases on a [`pcbgen_layout::Board`].

mod board;
mod config;
mod error;
mod workflow;

pub use board::{process_board, BoardResult};
pub use config::{AutorouterConfig, Config, KicadConfig, CONFIG_FILE};
pub use error::{Error, ErrorKind, Phase, PhaseError};
pub use workflow::{
    prepare_schematic, GenerateResult, Status, Workflow, DEFAULT_SCHEMATIC, NETLIST_PROMPT_FILE,
    PINNED_PLAN_FILE,
};
