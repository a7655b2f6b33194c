//! Generator configuration and tunable model constants
//!
//! Every stage reads its rates from here. Values default to the ones the
//! terrain scenes were tuned with; a JSON file can override any subset.

use std::path::Path;

use serde::Deserialize;

use crate::error::Result;
use crate::weather::WindMeasure;

// =============================================================================
// MESH
// =============================================================================

/// Hexagon and world dimensions, in pixels
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct MeshParams {
    /// Width of a single pointy-top hexagon
    pub hex_width: f64,
    /// Height of a single pointy-top hexagon (tip to tip)
    pub hex_height: f64,
    pub world_width: f64,
    pub world_height: f64,
    /// Kilometers represented by one pixel
    pub px_to_km: f64,
}

impl Default for MeshParams {
    fn default() -> Self {
        Self {
            hex_width: 7.0 * 1.2,
            hex_height: 8.0 * 1.2,
            world_width: 900.0,
            world_height: 900.0,
            px_to_km: 1.0,
        }
    }
}

// =============================================================================
// WEATHER
// =============================================================================

/// Prevailing wind applied along the map boundary
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindParams {
    /// Direction the wind blows toward, in degrees (0 = east, 90 = south)
    pub bearing: f64,
    pub strength: f64,
}

impl Default for WindParams {
    fn default() -> Self {
        Self {
            bearing: 60.0,
            strength: 10.0,
        }
    }
}

impl WindParams {
    pub fn initial_wind(&self) -> WindMeasure {
        WindMeasure::boundary(self.bearing, self.strength)
    }
}

/// Rates feeding the humidity balance
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct HumidityParams {
    /// Humidity gained by cells holding standing water
    pub evaporation_rate: f64,
    /// Humidity gained by land cells
    pub transpiration_rate: f64,
    /// Base humidity lost to precipitation on flat ground
    pub precipitation_rate: f64,
    /// Extra precipitation per unit of uphill slope
    pub slope_multiplier: f64,
}

impl Default for HumidityParams {
    fn default() -> Self {
        Self {
            evaporation_rate: 0.3,
            transpiration_rate: 0.05,
            precipitation_rate: 0.1,
            slope_multiplier: 5.0,
        }
    }
}

// =============================================================================
// HYDROLOGY / BIOMES
// =============================================================================

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RiverParams {
    /// Meters of elevation gained per unit of pooled water
    pub water_to_height_ratio: f64,
}

impl Default for RiverParams {
    fn default() -> Self {
        Self {
            water_to_height_ratio: 5.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct BiomeParams {
    /// Temperature at sea level (Celsius)
    pub sea_level_temp: f64,
}

impl Default for BiomeParams {
    fn default() -> Self {
        Self {
            sea_level_temp: 24.0,
        }
    }
}

/// Ceilings for the repeating driver stages
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConvergenceParams {
    /// Maximum humidity passes before moving on
    pub humidity_passes: u32,
    /// Maximum river passes before moving on
    pub river_passes: u32,
    /// Log every Nth attempt of a repeating stage at info level
    pub log_throttle: Option<u32>,
}

impl Default for ConvergenceParams {
    fn default() -> Self {
        Self {
            humidity_passes: 50,
            river_passes: 40,
            log_throttle: Some(10),
        }
    }
}

// =============================================================================
// COMBINED CONFIGURATION
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub mesh: MeshParams,
    pub wind: WindParams,
    pub humidity: HumidityParams,
    pub rivers: RiverParams,
    pub biomes: BiomeParams,
    pub convergence: ConvergenceParams,
}

impl GeneratorConfig {
    /// Parse a configuration from JSON; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = GeneratorConfig::from_json_str(
            r#"{ "wind": { "bearing": 220.0 }, "rivers": { "water_to_height_ratio": 1.0 } }"#,
        )
        .unwrap();

        assert_eq!(config.wind.bearing, 220.0);
        assert_eq!(config.wind.strength, WindParams::default().strength);
        assert_eq!(config.rivers.water_to_height_ratio, 1.0);
        assert_eq!(config.mesh, MeshParams::default());
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = GeneratorConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, crate::error::SimError::Config(_)), "got {:?}", err);
    }
}
