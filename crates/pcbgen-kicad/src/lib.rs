//! Adapters for KiCad's `pcbnew` Python runtime and the Freerouting autorouter.
//!
//! Every interaction with KiCad goes through short Python scripts run by
//! [`KicadPython`]; data crosses the process boundary as JSON files.

mod board;
mod error;
mod freerouting;
pub mod paths;
mod python;

pub use board::PcbnewBoard;
pub use error::ToolError;
pub use freerouting::Freerouting;
pub use paths::find_symbol_dir;
pub use python::KicadPython;
