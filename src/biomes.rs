//! Holdridge-style life zone assignment
//!
//! Temperature falls with elevation from a sea-level baseline. Aridity comes
//! from an annual precipitation estimate derived from the water each cell
//! received in the last river pass. Together they index a fixed table of
//! life zones, with explicit fallbacks for frozen and very dry corners.

use serde::Serialize;

use crate::mesh::{round_to, HexMesh};

/// Lapse rate, degrees Celsius per kilometer of elevation
pub const TEMP_DECREASE_PER_KM: f64 = 6.5;

/// Scales one unit of water in to millimeters of annual precipitation
const PRECIPITATION_SCALE: f64 = 16000.0;

/// Aridity bands, wettest first
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Aridity {
    SuperHumid,
    PerHumid,
    Humid,
    SubHumid,
    SemiArid,
    Arid,
    PerArid,
    SuperArid,
}

impl Aridity {
    /// Band for an estimated annual precipitation (mm)
    pub fn from_precipitation(precipitation: f64) -> Self {
        if precipitation > 8000.0 {
            Aridity::SuperHumid
        } else if precipitation > 4000.0 {
            Aridity::PerHumid
        } else if precipitation > 2000.0 {
            Aridity::Humid
        } else if precipitation > 1000.0 {
            Aridity::SubHumid
        } else if precipitation > 500.0 {
            Aridity::SemiArid
        } else if precipitation > 250.0 {
            Aridity::Arid
        } else if precipitation > 125.0 {
            Aridity::PerArid
        } else {
            Aridity::SuperArid
        }
    }

    /// Band for a potential evapotranspiration ratio
    pub fn from_pet_ratio(ratio: f64) -> Self {
        if ratio <= 0.25 {
            Aridity::SuperHumid
        } else if ratio <= 0.5 {
            Aridity::PerHumid
        } else if ratio <= 1.0 {
            Aridity::Humid
        } else if ratio <= 2.0 {
            Aridity::SubHumid
        } else if ratio <= 4.0 {
            Aridity::SemiArid
        } else if ratio <= 8.0 {
            Aridity::Arid
        } else if ratio <= 16.0 {
            Aridity::PerArid
        } else {
            Aridity::SuperArid
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum BiomeClassification {
    /// Valid but unlisted combination (mild and sub-humid below 1.5°C)
    Unknown,
    PolarIce,
    MiscAridDesert,

    PolarDesert,
    SubpolarDryTundra,
    SubpolarMoistTundra,
    SubpolarWetTundra,
    SubpolarRainTundra,

    BorealDesert,
    BorealDryScrub,
    BorealMoistForest,
    BorealWetForest,
    BorealRainForest,

    CoolTemperateDesert,
    CoolTemperateDesertScrub,
    CoolTemperateSteppe,
    CoolTemperateMoistForest,
    CoolTemperateWetForest,
    CoolTemperateRainForest,

    WarmTemperateDesert,
    WarmTemperateDesertScrub,
    WarmTemperateThornScrub,
    WarmTemperateDryForest,
    WarmTemperateMoistForest,
    WarmTemperateWetForest,
    WarmTemperateRainForest,

    SubtropicalDesert,
    SubtropicalDesertScrub,
    SubtropicalThornWoodland,
    SubtropicalDryForest,
    SubtropicalMoistForest,
    SubtropicalWetForest,
    SubtropicalRainForest,

    TropicalDesert,
    TropicalDesertScrub,
    TropicalThornWoodland,
    TropicalVeryDryForest,
    TropicalDryForest,
    TropicalMoistForest,
    TropicalWetForest,
    TropicalRainForest,
}

impl BiomeClassification {
    /// Life zone for a temperature (°C) and aridity band
    pub fn classify(temperature: f64, aridity: Aridity) -> Self {
        use BiomeClassification::*;

        // Row entries for >= 24, 18, 12, 6, 3 and 1.5 degrees; None falls
        // through to the frozen / arid fallbacks.
        let row: [Option<BiomeClassification>; 6] = match aridity {
            Aridity::SuperHumid => [
                Some(TropicalRainForest),
                Some(SubtropicalRainForest),
                Some(WarmTemperateRainForest),
                Some(CoolTemperateRainForest),
                Some(BorealRainForest),
                Some(SubpolarRainTundra),
            ],
            Aridity::PerHumid => [
                Some(TropicalWetForest),
                Some(SubtropicalWetForest),
                Some(WarmTemperateWetForest),
                Some(CoolTemperateWetForest),
                Some(BorealWetForest),
                Some(SubpolarWetTundra),
            ],
            Aridity::Humid => [
                Some(TropicalMoistForest),
                Some(SubtropicalMoistForest),
                Some(WarmTemperateMoistForest),
                Some(CoolTemperateMoistForest),
                Some(BorealMoistForest),
                Some(SubpolarMoistTundra),
            ],
            Aridity::SubHumid => [
                Some(TropicalDryForest),
                Some(SubtropicalDryForest),
                Some(WarmTemperateDryForest),
                Some(CoolTemperateSteppe),
                Some(BorealDryScrub),
                Some(SubpolarDryTundra),
            ],
            Aridity::SemiArid => [
                Some(TropicalVeryDryForest),
                Some(SubtropicalThornWoodland),
                Some(WarmTemperateThornScrub),
                Some(CoolTemperateDesertScrub),
                Some(BorealDesert),
                None,
            ],
            Aridity::Arid => [
                Some(TropicalThornWoodland),
                Some(SubtropicalDesertScrub),
                Some(WarmTemperateDesertScrub),
                Some(CoolTemperateDesert),
                None,
                None,
            ],
            Aridity::PerArid => [
                Some(TropicalDesertScrub),
                Some(SubtropicalDesert),
                Some(WarmTemperateDesert),
                None,
                None,
                None,
            ],
            Aridity::SuperArid => [Some(TropicalDesert), Some(SubtropicalDesert), None, None, None, None],
        };

        const BANDS: [f64; 6] = [24.0, 18.0, 12.0, 6.0, 3.0, 1.5];
        match BANDS.iter().position(|&floor| temperature >= floor) {
            Some(band) => row[band].unwrap_or_else(|| Self::fallback(temperature, aridity)),
            // Wetter bands bottom out as polar desert
            None if aridity <= Aridity::Humid => PolarDesert,
            None => Self::fallback(temperature, aridity),
        }
    }

    fn fallback(temperature: f64, aridity: Aridity) -> Self {
        if temperature <= 0.0 {
            BiomeClassification::PolarIce
        } else if aridity >= Aridity::SemiArid {
            BiomeClassification::MiscAridDesert
        } else {
            BiomeClassification::Unknown
        }
    }

    pub fn color(&self) -> (u8, u8, u8) {
        use BiomeClassification::*;
        let hex: u32 = match self {
            Unknown => 0x000000,
            PolarIce => 0xFFFFFF,
            MiscAridDesert => 0xFFFFA0,
            PolarDesert => 0xC0C0C0,
            SubpolarMoistTundra => 0x608080,
            SubpolarWetTundra => 0x408080,
            SubpolarRainTundra => 0x2080C0,
            SubpolarDryTundra => 0x808080,
            BorealDesert => 0xA0A080,
            BorealDryScrub => 0x80A080,
            BorealMoistForest => 0x60A080,
            BorealWetForest => 0x40A090,
            BorealRainForest => 0x20A0C0,
            CoolTemperateMoistForest => 0x60C080,
            CoolTemperateWetForest => 0x40C090,
            CoolTemperateRainForest => 0x20C0C0,
            CoolTemperateSteppe => 0x80C080,
            CoolTemperateDesert => 0xC0C080,
            CoolTemperateDesertScrub => 0xA0C080,
            WarmTemperateMoistForest => 0x60E080,
            WarmTemperateWetForest => 0x40E090,
            WarmTemperateRainForest => 0x20E0C0,
            WarmTemperateThornScrub => 0xA0E080,
            WarmTemperateDryForest => 0x80E080,
            WarmTemperateDesert => 0xE0E080,
            WarmTemperateDesertScrub => 0xC0E080,
            SubtropicalDesert => 0xF0F080,
            SubtropicalDesertScrub => 0xD0F080,
            TropicalDesert => 0xFFFF80,
            TropicalDesertScrub => 0xE0FF80,
            SubtropicalThornWoodland => 0xB0F080,
            TropicalThornWoodland => 0xC0FF80,
            TropicalVeryDryForest => 0xA0FF80,
            TropicalDryForest => 0x80FF80,
            SubtropicalDryForest => 0x80FF80,
            SubtropicalMoistForest => 0x60FF80,
            SubtropicalWetForest => 0x40F090,
            SubtropicalRainForest => 0x20F0B0,
            TropicalMoistForest => 0x60FF80,
            TropicalWetForest => 0x40FF90,
            TropicalRainForest => 0x20FFA0,
        };
        ((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
    }

    pub fn display_name(&self) -> &'static str {
        use BiomeClassification::*;
        match self {
            Unknown => "Unknown",
            PolarIce => "Polar Ice",
            MiscAridDesert => "Arid Desert",
            PolarDesert => "Polar Desert",
            SubpolarDryTundra => "Subpolar Dry Tundra",
            SubpolarMoistTundra => "Subpolar Moist Tundra",
            SubpolarWetTundra => "Subpolar Wet Tundra",
            SubpolarRainTundra => "Subpolar Rain Tundra",
            BorealDesert => "Boreal Desert",
            BorealDryScrub => "Boreal Dry Scrub",
            BorealMoistForest => "Boreal Moist Forest",
            BorealWetForest => "Boreal Wet Forest",
            BorealRainForest => "Boreal Rain Forest",
            CoolTemperateDesert => "Cool Temperate Desert",
            CoolTemperateDesertScrub => "Cool Temperate Desert Scrub",
            CoolTemperateSteppe => "Cool Temperate Steppe",
            CoolTemperateMoistForest => "Cool Temperate Moist Forest",
            CoolTemperateWetForest => "Cool Temperate Wet Forest",
            CoolTemperateRainForest => "Cool Temperate Rain Forest",
            WarmTemperateDesert => "Warm Temperate Desert",
            WarmTemperateDesertScrub => "Warm Temperate Desert Scrub",
            WarmTemperateThornScrub => "Warm Temperate Thorn Scrub",
            WarmTemperateDryForest => "Warm Temperate Dry Forest",
            WarmTemperateMoistForest => "Warm Temperate Moist Forest",
            WarmTemperateWetForest => "Warm Temperate Wet Forest",
            WarmTemperateRainForest => "Warm Temperate Rain Forest",
            SubtropicalDesert => "Subtropical Desert",
            SubtropicalDesertScrub => "Subtropical Desert Scrub",
            SubtropicalThornWoodland => "Subtropical Thorn Woodland",
            SubtropicalDryForest => "Subtropical Dry Forest",
            SubtropicalMoistForest => "Subtropical Moist Forest",
            SubtropicalWetForest => "Subtropical Wet Forest",
            SubtropicalRainForest => "Subtropical Rain Forest",
            TropicalDesert => "Tropical Desert",
            TropicalDesertScrub => "Tropical Desert Scrub",
            TropicalThornWoodland => "Tropical Thorn Woodland",
            TropicalVeryDryForest => "Tropical Very Dry Forest",
            TropicalDryForest => "Tropical Dry Forest",
            TropicalMoistForest => "Tropical Moist Forest",
            TropicalWetForest => "Tropical Wet Forest",
            TropicalRainForest => "Tropical Rain Forest",
        }
    }
}

impl std::fmt::Display for BiomeClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Climate summary stored on each cell
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BiomeRecord {
    /// Mean annual temperature, °C
    pub temperature: f64,
    pub humidity: f64,
    /// Estimated annual precipitation, mm
    pub precipitation: f64,
    pub aridity: Aridity,
    pub classification: BiomeClassification,
}

/// Temperature at `height` meters given the sea-level baseline
pub fn temperature_at(sea_level_temp: f64, height: f64) -> f64 {
    sea_level_temp - round_to(height / 1000.0 * TEMP_DECREASE_PER_KM, 2)
}

/// Assign a biome record to every cell
pub fn assign_biomes(mesh: &mut HexMesh, sea_level_temp: f64) {
    mesh.apply(|cell| {
        let temperature = temperature_at(sea_level_temp, cell.height);
        let precipitation = cell.river.sim.water_in * PRECIPITATION_SCALE;
        let aridity = Aridity::from_precipitation(precipitation);
        cell.biome = Some(BiomeRecord {
            temperature,
            humidity: cell.humidity.state,
            precipitation,
            aridity,
            classification: BiomeClassification::classify(temperature, aridity),
        });
    });
    tracing::debug!("Assigned biomes to {} cells", mesh.len());
}
