use hex_climate::config::GeneratorConfig;
use hex_climate::generator::{build_pipeline, run_to_completion, World, WorldSummary};
use hex_climate::island::{generate_island, IslandParams};
use hex_climate::mesh::{CellType, HexMesh};
use hex_climate::simulation::COMPLETE_STAGE;

fn small_config() -> GeneratorConfig {
    GeneratorConfig::from_json_str(
        r#"{
            "mesh": { "hex_width": 7.0, "hex_height": 8.0, "world_width": 140.0, "world_height": 140.0 },
            "wind": { "bearing": 60.0, "strength": 10.0 }
        }"#,
    )
    .unwrap()
}

fn generate(seed: u64, config: GeneratorConfig) -> (World, u32) {
    let mut mesh = HexMesh::from_params(&config.mesh).unwrap();
    generate_island(&mut mesh, seed, &IslandParams::default());
    let mut driver = build_pipeline(&config).unwrap();
    let mut world = World::new(mesh, config);
    let ticks = run_to_completion(&mut driver, &mut world).unwrap();
    assert!(!driver.is_halted());
    assert!(!driver.can_advance());
    (world, ticks)
}

#[test]
fn test_island_pipeline_assigns_every_biome() {
    let (world, ticks) = generate(42, small_config());
    let mesh = &world.mesh;

    assert!(ticks >= 6, "expected at least one tick per stage, got {}", ticks);
    assert!(mesh.iter().all(|c| c.biome.is_some()), "a cell was left without a biome");
    for cell in mesh.iter().filter(|c| c.is_map_edge) {
        assert_eq!(cell.kind, CellType::Ocean, "edge cell {} is not ocean", cell.axial);
    }
    for cell in mesh.iter() {
        assert!(cell.humidity.state >= 0.0, "negative humidity at {}", cell.axial);
    }

    let summary = world.summary();
    assert!(summary.land > 0 && summary.ocean > 0, "{:?}", summary);
    assert_eq!(summary.biomes.values().sum::<usize>(), summary.cells);
}

#[test]
fn test_rivers_point_at_neighbors() {
    let (world, _) = generate(7, small_config());
    let mesh = &world.mesh;

    for cell in mesh.iter() {
        let Some(river) = &cell.river.river else {
            continue;
        };
        assert!(cell.is_land(), "ocean cell {} carries a river", cell.axial);
        assert!(river.amount > 0.0, "empty river at {}", cell.axial);
        let neighbor = cell.neighbor(river.bearing).map(|n| n.cell);
        assert_eq!(neighbor, Some(river.target), "river at {} skips a cell", cell.axial);
    }
}

#[test]
fn test_same_seed_same_world() {
    let (a, _) = generate(1234, small_config());
    let (b, _) = generate(1234, small_config());
    assert_eq!(a.summary(), b.summary());
}

#[test]
fn test_pipeline_reports_complete_last() {
    let config = small_config();
    let mut mesh = HexMesh::from_params(&config.mesh).unwrap();
    generate_island(&mut mesh, 3, &IslandParams::default());
    let mut driver = build_pipeline(&config).unwrap();
    let mut world = World::new(mesh, config);

    let mut last = None;
    while driver.can_advance() {
        last = Some(driver.tick(&mut world).unwrap());
    }
    let last = last.unwrap();
    assert_eq!(last.name, COMPLETE_STAGE);
    assert_eq!(last.output, 0);
    assert_ne!(WorldSummary::from_mesh(&world.mesh), WorldSummary::default());
}
