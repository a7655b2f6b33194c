//! Prevailing wind and humidity over the hex mesh
//!
//! Wind enters across the map boundary and is relayed cell to cell, slowed
//! by uphill slopes and bent around obstructions. Humidity then rides that
//! wind: each cell draws moisture from the cells whose wind reaches it.

pub mod humidity;
pub mod measure;
pub mod wind;

use std::collections::BTreeSet;

use crate::mesh::CellId;

pub use humidity::{calculate_humidity, HumidityState};
pub use measure::{combine_wind, neighbor_strengths, split_bearing, DirectionalIo, WindMeasure, WindSource};
pub use wind::{calculate_wind_effect, MAX_WIND_ITERATIONS};

/// Per-cell wind record
#[derive(Debug, Clone, Default)]
pub struct WindState {
    /// Contributions gathered during the current iteration
    pub input: DirectionalIo,
    /// Resolved wind leaving the cell; pressure adjustments stay separate
    pub output: Vec<WindMeasure>,
    /// Cells whose wind reaches this one
    pub sources: BTreeSet<CellId>,
}

impl WindState {
    /// Vector sum of everything leaving the cell
    pub fn net_output(&self) -> WindMeasure {
        combine_wind(&self.output)
    }
}

#[derive(Debug, Clone, Default)]
pub struct WeatherState {
    pub wind: WindState,
}
