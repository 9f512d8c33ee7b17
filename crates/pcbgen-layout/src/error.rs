#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("board has no footprints")]
    EmptySet,

    #[error("footprint {0} is not on the board")]
    UnknownFootprint(String),

    #[error("board runtime failed: {0:#}")]
    Runtime(#[from] anyhow::Error),
}
