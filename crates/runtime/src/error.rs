//! Runtime errors

use thiserror::Error;

use crate::grid::GridCoord;
use crate::types::{AttributeSetId, VariableId};

/// Runtime result type
pub type Result<T> = std::result::Result<T, Error>;

/// Runtime errors
///
/// Configuration errors surface synchronously from the setup call that
/// caused them and leave existing state intact. `CycleDetected` surfaces at
/// graph finalization. `Compute` surfaces from `tick` and aborts that tick
/// without touching any completed generation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("variable already registered: {0}")]
    DuplicateVariable(VariableId),

    #[error("variable {variable} depends on unregistered variable {dependency}")]
    UnknownDependency {
        variable: VariableId,
        dependency: VariableId,
    },

    #[error("variable not found: {0}")]
    VariableNotFound(VariableId),

    #[error("particle count must be positive")]
    EmptyPopulation,

    #[error("variable {variable} declares {channels} channels, must be 1..=4")]
    InvalidChannelCount {
        variable: VariableId,
        channels: usize,
    },

    #[error("initial state for {variable} has {actual} floats, expected {expected}")]
    ChannelMismatch {
        variable: VariableId,
        expected: usize,
        actual: usize,
    },

    #[error("attribute set {set} has {actual} floats, expected {expected}")]
    AttributeLengthMismatch {
        set: AttributeSetId,
        expected: usize,
        actual: usize,
    },

    #[error("attribute set not found: {0}")]
    UnknownAttributeSet(AttributeSetId),

    #[error("morph duration must be positive, got {0}")]
    InvalidDuration(f64),

    #[error("dependency cycle between variables: {variables:?}")]
    CycleDetected { variables: Vec<VariableId> },

    #[error("compute failed for {variable}: {message}")]
    Compute {
        variable: VariableId,
        /// Grid coordinate of the offending cell, when known.
        coord: Option<GridCoord>,
        message: String,
    },
}
