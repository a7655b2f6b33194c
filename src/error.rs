//! Error types shared by the mesh, the simulation driver and the generators.

use thiserror::Error;

use crate::mesh::Axial;

#[derive(Error, Debug)]
pub enum SimError {
    // Configuration errors: raised while building the mesh, never recovered.
    #[error("{first} ({first_len}) and {second} ({second_len}) edges are different sizes")]
    EdgeMismatch {
        first: &'static str,
        first_len: usize,
        second: &'static str,
        second_len: usize,
    },

    #[error("Invalid mesh geometry: {0}")]
    InvalidGeometry(String),

    #[error("Could not read configuration: {0}")]
    Config(String),

    // Invariant violations: raised mid-pass and halt the pipeline.
    #[error("Cannot backtrack from {from} towards source {source_cell}")]
    BacktrackFailed { from: Axial, source_cell: Axial },

    /// Raised when the spill height cannot be ordered against the basin
    /// level, e.g. a NaN elevation in the heightmap.
    #[error("Spill point {spill} cannot be ordered against basin at {origin} (height {height})")]
    ImpossibleSpill {
        origin: Axial,
        spill: Axial,
        height: f64,
    },

    // Driver misuse.
    #[error("Cannot add an until when there isn't a starting repeat")]
    UntilWithoutStage,

    #[error("Cannot complete a simulation setup without at least one stage")]
    EmptyPipeline,

    #[error("Cannot run a simulation before its stages are completed")]
    PipelineNotComplete,

    #[error("Cannot continue past the end of the defined simulation stages")]
    PipelineExhausted,

    #[error("Simulation halted after stage '{0}' failed")]
    PipelineHalted(String),
}

impl From<std::io::Error> for SimError {
    fn from(err: std::io::Error) -> Self {
        SimError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for SimError {
    fn from(err: serde_json::Error) -> Self {
        SimError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
