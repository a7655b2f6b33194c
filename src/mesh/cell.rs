//! Hex cells, their neighbor table and the per-generator state records.

use crate::biomes::BiomeRecord;
use crate::rivers::RiverState;
use crate::weather::humidity::HumidityState;
use crate::weather::WeatherState;

use super::coords::{Axial, Bearing, PixelPoint};

/// Index of a cell inside the mesh arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(pub usize);

impl CellId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellType {
    #[default]
    Land,
    Ocean,
}

/// One entry of a cell's neighbor table
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub cell: CellId,
    pub bearing: Bearing,
    /// The two hexagon corners shared with the neighbor
    pub edge: [PixelPoint; 2],
    /// Rise over run (km/km) from this cell toward the neighbor
    pub slope: f64,
}

/// Standing water; the scratch fields belong to the sediment erosion pass
/// that runs outside this crate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaterState {
    pub state: f64,
    pub sim: WaterSim,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaterSim {
    pub water_in: f64,
    pub water_out: f64,
}

#[derive(Debug, Clone)]
pub struct HexCell {
    pub id: CellId,
    pub axial: Axial,
    pub site: PixelPoint,
    pub is_map_edge: bool,
    /// Elevation in meters (negative below sea level)
    pub height: f64,
    pub kind: CellType,
    pub points: [PixelPoint; 6],
    neighbors: [Option<Neighbor>; 6],
    pub water: WaterState,
    pub weather: WeatherState,
    pub humidity: HumidityState,
    pub river: RiverState,
    pub biome: Option<BiomeRecord>,
}

impl HexCell {
    pub(crate) fn new(
        id: CellId,
        axial: Axial,
        site: PixelPoint,
        is_map_edge: bool,
        points: [PixelPoint; 6],
    ) -> Self {
        Self {
            id,
            axial,
            site,
            is_map_edge,
            height: 0.0,
            kind: CellType::Land,
            points,
            neighbors: Default::default(),
            water: WaterState::default(),
            weather: WeatherState::default(),
            humidity: HumidityState::default(),
            river: RiverState::default(),
            biome: None,
        }
    }

    pub fn is_ocean(&self) -> bool {
        self.kind == CellType::Ocean
    }

    pub fn is_land(&self) -> bool {
        self.kind == CellType::Land
    }

    /// Height used for slopes: the ocean surface counts as sea level.
    pub fn usable_height(&self) -> f64 {
        if self.is_ocean() {
            0.0
        } else {
            self.height
        }
    }

    pub fn has_neighbor(&self, bearing: Bearing) -> bool {
        self.neighbors[bearing.index()].is_some()
    }

    pub fn neighbor(&self, bearing: Bearing) -> Option<&Neighbor> {
        self.neighbors[bearing.index()].as_ref()
    }

    /// Present neighbors in bearing order (0°, 60°, ... 300°)
    pub fn neighbors(&self) -> impl Iterator<Item = &Neighbor> {
        self.neighbors.iter().flatten()
    }

    pub fn neighbor_count(&self) -> usize {
        self.neighbors().count()
    }

    pub(crate) fn set_neighbor(&mut self, neighbor: Neighbor) {
        let index = neighbor.bearing.index();
        self.neighbors[index] = Some(neighbor);
    }

    pub(crate) fn set_slope(&mut self, bearing: Bearing, slope: f64) {
        if let Some(n) = self.neighbors[bearing.index()].as_mut() {
            n.slope = slope;
        }
    }
}

/// Rise over run from `source` toward `target`, both in kilometers.
pub fn calculate_slope(source: &HexCell, target: &HexCell, px_to_km: f64) -> f64 {
    let run = source.site.distance(&target.site) * px_to_km;
    if run == 0.0 {
        return 0.0;
    }
    let rise = (target.usable_height() - source.usable_height()) / 1000.0;
    rise / run
}

pub fn inverse_slope(slope: f64) -> f64 {
    -slope
}
