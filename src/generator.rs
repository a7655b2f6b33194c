//! Climate pipeline assembly
//!
//! Wires the generators into a [`SimulationDriver`] over a [`World`]:
//! identify ocean, settle the wind, repeat humidity and river passes until
//! they stop changing, then assign biomes.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::biomes::assign_biomes;
use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::mesh::HexMesh;
use crate::rivers::calculate_rivers;
use crate::simulation::SimulationDriver;
use crate::weather::{calculate_humidity, calculate_wind_effect};

/// Terrain below this elevation becomes ocean
pub const SEA_LEVEL: f64 = 0.0;

/// Mutable state the pipeline stages operate on
pub struct World {
    pub mesh: HexMesh,
    pub config: GeneratorConfig,
}

impl World {
    pub fn new(mesh: HexMesh, config: GeneratorConfig) -> Self {
        Self { mesh, config }
    }

    pub fn summary(&self) -> WorldSummary {
        WorldSummary::from_mesh(&self.mesh)
    }
}

/// Stages output the number of cells they touched or changed
pub type ClimateDriver = SimulationDriver<World, usize>;

/// Build the full climate pipeline, ready to tick
pub fn build_pipeline(config: &GeneratorConfig) -> Result<ClimateDriver> {
    let humidity_passes = config.convergence.humidity_passes;
    let river_passes = config.convergence.river_passes;
    let throttle = config.convergence.log_throttle;

    let mut driver = ClimateDriver::new();
    driver
        .queue("identify ocean", |world: &mut World| {
            let oceans = world.mesh.assign_ocean_below(SEA_LEVEL);
            world.mesh.recalculate_slopes();
            Ok(oceans)
        })
        .queue("wind", |world: &mut World| {
            let initial = world.config.wind.initial_wind();
            Ok(calculate_wind_effect(&mut world.mesh, initial))
        })
        .repeat(
            "humidity",
            |world: &mut World| {
                let p = &world.config.humidity;
                Ok(calculate_humidity(
                    &mut world.mesh,
                    p.evaporation_rate,
                    p.transpiration_rate,
                    p.precipitation_rate,
                    p.slope_multiplier,
                ))
            },
            throttle,
        )
        .until(move |attempt, changed, _| *changed == 0 || attempt >= humidity_passes)?
        .repeat(
            "rivers",
            |world: &mut World| calculate_rivers(&mut world.mesh, world.config.rivers.water_to_height_ratio),
            throttle,
        )
        .until(move |attempt, changed, _| *changed == 0 || attempt >= river_passes)?
        .queue("biomes", |world: &mut World| {
            assign_biomes(&mut world.mesh, world.config.biomes.sea_level_temp);
            Ok(world.mesh.len())
        })
        .complete()?;
    Ok(driver)
}

/// Tick the driver until it has nothing left to run
pub fn run_to_completion(driver: &mut ClimateDriver, world: &mut World) -> Result<u32> {
    let mut ticks = 0;
    while driver.can_advance() {
        driver.tick(world)?;
        ticks += 1;
    }
    Ok(ticks)
}

/// Counts describing a finished world
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WorldSummary {
    pub cells: usize,
    pub land: usize,
    pub ocean: usize,
    pub pools: usize,
    pub rivers: usize,
    pub largest_river: f64,
    pub mean_humidity: f64,
    /// Cell count per biome display name
    pub biomes: BTreeMap<String, usize>,
}

impl WorldSummary {
    pub fn from_mesh(mesh: &HexMesh) -> Self {
        let mut summary = mesh.reduce(WorldSummary::default(), |mut s, cell| {
            s.cells += 1;
            if cell.is_ocean() {
                s.ocean += 1;
            } else {
                s.land += 1;
            }
            if cell.river.pool.is_some() {
                s.pools += 1;
            }
            if let Some(river) = &cell.river.river {
                s.rivers += 1;
                s.largest_river = s.largest_river.max(river.amount);
            }
            s.mean_humidity += cell.humidity.state;
            if let Some(biome) = &cell.biome {
                *s.biomes.entry(biome.classification.display_name().to_string()).or_insert(0) += 1;
            }
            s
        });
        if summary.cells > 0 {
            summary.mean_humidity /= summary.cells as f64;
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;
    use crate::mesh::CellType;

    #[test]
    fn test_pipeline_stage_order() {
        let config = GeneratorConfig::default();
        let mesh = HexMesh::new(7.0, 8.0, 63.0, 56.0, 1.0).unwrap();
        let mut world = World::new(mesh, config.clone());
        world.mesh.apply(|c| c.height = if c.is_map_edge { -100.0 } else { 50.0 });

        let mut driver = build_pipeline(&config).unwrap();
        let mut names = Vec::new();
        while driver.can_advance() {
            let event = driver.tick(&mut world).unwrap();
            if names.last() != Some(&event.name) {
                names.push(event.name);
            }
        }

        assert_eq!(names, ["identify ocean", "wind", "humidity", "rivers", "biomes", "complete"]);
        assert!(world.mesh.iter().all(|c| c.biome.is_some()));
        assert!(world.mesh.iter().filter(|c| c.is_map_edge).all(|c| c.kind == CellType::Ocean));
    }

    #[test]
    fn test_summary_counts() {
        let mut mesh = HexMesh::new(7.0, 8.0, 21.0, 24.0, 1.0).unwrap();
        mesh.apply(|c| {
            if c.axial.r == 0 {
                c.kind = CellType::Ocean;
            }
            c.humidity.state = 0.5;
        });
        let summary = WorldSummary::from_mesh(&mesh);
        assert_eq!(summary.cells, 20);
        assert_eq!(summary.ocean, 4);
        assert_eq!(summary.land, 16);
        assert_eq!(summary.mean_humidity, 0.5);
        assert!(summary.biomes.is_empty());
    }

    #[test]
    fn test_river_error_halts_pipeline() {
        let mut config = GeneratorConfig::default();
        // Every land cell ends a humidity pass wet enough to route
        config.humidity.transpiration_rate = 0.5;
        let mut mesh = HexMesh::new(7.0, 8.0, 63.0, 56.0, 1.0).unwrap();
        mesh.apply(|c| c.height = if c.is_map_edge { -100.0 } else { 50.0 });
        mesh.get_mut(4, 4).unwrap().height = f64::NAN;
        let mut world = World::new(mesh, config.clone());

        let mut driver = build_pipeline(&config).unwrap();
        let err = run_to_completion(&mut driver, &mut world).unwrap_err();

        assert!(matches!(err, SimError::ImpossibleSpill { .. }), "got {:?}", err);
        assert!(driver.is_halted());
        assert!(!driver.can_advance());
        assert!(
            matches!(driver.tick(&mut world), Err(SimError::PipelineHalted(name)) if name == "rivers"),
            "expected the rivers stage to be reported"
        );
        assert!(world.mesh.iter().all(|c| c.biome.is_none()), "biomes ran after a failure");
    }
}
