//! Wind propagation across the hex mesh
//!
//! Follows three rules of thumb for prevailing wind:
//!  1. Wind slows down going uphill
//!  2. Wind speeds up going downhill
//!  3. Wind turns when it meets an obstruction
//!
//! Each iteration seeds the boundary, relays every reached cell's previous
//! output to its neighbors, evens out lateral pressure differences and then
//! resolves new outputs. The loop stops once no output changes.

use crate::mesh::{
    inverse_slope, next_highest_even_edge, next_lowest_even_edge, normalize_degrees, Bearing, CellId, HexCell,
    HexMesh,
};

use super::measure::{combine_wind, neighbor_strengths, split_bearing, WindMeasure};

/// Iteration ceiling; hitting it is not an error
pub const MAX_WIND_ITERATIONS: usize = 200;

/// Slope (km/km) at which attenuation reaches its base factor
const SLOPE_REFERENCE: f64 = 0.25;
const ATTENUATION_FACTOR: f64 = 0.1;
/// Attenuation above which wind starts turning away from the slope
const DEFLECTION_THRESHOLD: f64 = 0.01;
/// Attenuation giving the full deflection
const DEFLECTION_SATURATION: f64 = 0.4;
const MAX_DEFLECTION: f64 = 30.0;

/// Lateral input below this fraction of a cell's own triggers smoothing
const PRESSURE_RATIO: f64 = 0.8;
const PRESSURE_SHARE: f64 = 1.0 / 3.0;
const PRESSURE_TURN: f64 = 30.0;

/// Run the wind model to convergence. Returns the number of iterations.
///
/// Clears any previous wind state, then rebuilds every cell's output and
/// the upwind source sets that humidity reads.
pub fn calculate_wind_effect(mesh: &mut HexMesh, initial: WindMeasure) -> usize {
    mesh.apply(|cell| {
        cell.weather.wind.input.clear();
        cell.weather.wind.output.clear();
        cell.weather.wind.sources.clear();
    });

    let seeds = boundary_seeds(mesh, &initial);
    let mut queued = vec![false; mesh.len()];
    let mut queue: Vec<CellId> = Vec::new();
    for (id, _) in &seeds {
        if !queued[id.index()] {
            queued[id.index()] = true;
            queue.push(*id);
        }
    }

    let mut previous: Vec<Vec<(i64, i64)>> = vec![Vec::new(); mesh.len()];
    let mut iterations = 0;
    let still_changing = loop {
        iterations += 1;

        for (id, measure) in &seeds {
            mesh.cell_mut(*id).weather.wind.input.add(*measure);
        }
        propagate(mesh, &mut queue, &mut queued);
        smooth_pressure(mesh);
        resolve_outputs(mesh);

        let mut changed = 0;
        for (cell, before) in mesh.cells().iter().zip(previous.iter_mut()) {
            let now: Vec<(i64, i64)> = cell.weather.wind.output.iter().map(WindMeasure::rounded).collect();
            if now != *before {
                changed += 1;
                *before = now;
            }
        }

        tracing::trace!("Wind iteration {}: {} cells changed", iterations, changed);
        if changed == 0 || iterations >= MAX_WIND_ITERATIONS {
            break changed;
        }
    };

    link_sources(mesh);
    if still_changing > 0 {
        // Pressure smoothing beside steep slopes keeps trading strength
        // between flanks, so rough terrain normally exits here
        tracing::debug!(
            "Wind stopped at the {} iteration ceiling with {} cells still changing",
            iterations,
            still_changing
        );
    } else {
        tracing::debug!(
            "Wind settled in {} iterations from bearing {:.0} at strength {:.1}",
            iterations,
            initial.bearing,
            initial.strength
        );
    }
    iterations
}

// =============================================================================
// BOUNDARY SEEDING
// =============================================================================

/// Boundary contributions applied every iteration.
///
/// Sides are visited windward first. A cell receives the share of each hex
/// edge the wind crosses where no upwind neighbor exists to deliver it, so
/// corner cells listed on two sides are only seeded once.
fn boundary_seeds(mesh: &HexMesh, initial: &WindMeasure) -> Vec<(CellId, WindMeasure)> {
    let mut sides = split_bearing(initial.bearing + 180.0, 90.0);
    sides.sort_by(|a, b| b.1.total_cmp(&a.1));
    for side in [0.0, 90.0, 180.0, 270.0] {
        if !sides.iter().any(|(degrees, _)| *degrees == side) {
            sides.push((side, 0.0));
        }
    }

    let edge_shares = split_bearing(initial.bearing, 60.0);
    let mut seen = vec![false; mesh.len()];
    let mut seeds = Vec::new();
    for (side, _) in sides {
        let list = match side as i32 {
            0 => &mesh.edges.east,
            90 => &mesh.edges.south,
            180 => &mesh.edges.west,
            _ => &mesh.edges.north,
        };
        for &id in list {
            if seen[id.index()] {
                continue;
            }
            seen[id.index()] = true;
            let cell = mesh.cell(id);
            for (edge, share) in &edge_shares {
                let upwind = Bearing::nearest(*edge).opposite();
                if !cell.has_neighbor(upwind) {
                    seeds.push((id, WindMeasure::boundary(initial.bearing, initial.strength * share)));
                }
            }
        }
    }
    seeds
}

// =============================================================================
// PROPAGATION
// =============================================================================

/// Relay each queued cell's previous output across the edges it crosses,
/// queueing neighbors as they are first reached.
fn propagate(mesh: &mut HexMesh, queue: &mut Vec<CellId>, queued: &mut [bool]) {
    let mut deliveries = Vec::new();
    for &id in queue.iter() {
        let cell = mesh.cell(id);
        if cell.weather.wind.output.is_empty() {
            continue;
        }
        let net = cell.weather.wind.net_output();
        if net.strength <= 0.0 {
            continue;
        }
        for (index, strength) in neighbor_strengths(&net).into_iter().enumerate() {
            if strength <= 0.0 {
                continue;
            }
            if let Some(n) = cell.neighbor(Bearing::from_index(index)) {
                deliveries.push((n.cell, WindMeasure::neighbor(net.bearing, strength)));
            }
        }
    }

    for (target, measure) in deliveries {
        mesh.cell_mut(target).weather.wind.input.add(measure);
        if !queued[target.index()] {
            queued[target.index()] = true;
            queue.push(target);
        }
    }
}

/// Bleed strength from cells whose flanks carry markedly less wind, turning
/// the wind toward the weaker side.
fn smooth_pressure(mesh: &mut HexMesh) {
    let magnitudes: Vec<Option<f64>> = mesh
        .iter()
        .map(|cell| {
            let input = &cell.weather.wind.input;
            (!input.is_empty()).then(|| input.magnitude())
        })
        .collect();

    let mut adjustments = Vec::new();
    for cell in mesh.iter() {
        let Some(own) = magnitudes[cell.id.index()] else {
            continue;
        };
        if own <= 0.0 {
            continue;
        }
        let bearing = cell.weather.wind.input.total().bearing;
        let flanks = [
            (Bearing::nearest(bearing - 90.0), -PRESSURE_TURN),
            (Bearing::nearest(bearing + 90.0), PRESSURE_TURN),
        ];
        for (flank, turn) in flanks {
            let Some(lateral) = cell.neighbor(flank).and_then(|n| magnitudes[n.cell.index()]) else {
                continue;
            };
            if lateral < PRESSURE_RATIO * own {
                let amount = (own - lateral) * PRESSURE_SHARE;
                adjustments.push((cell.id, WindMeasure::pressure(bearing + 180.0, amount)));
                adjustments.push((cell.id, WindMeasure::pressure(bearing + turn, amount)));
            }
        }
    }

    for (id, measure) in adjustments {
        mesh.cell_mut(id).weather.wind.input.add(measure);
    }
}

// =============================================================================
// OUTPUT
// =============================================================================

fn resolve_outputs(mesh: &mut HexMesh) {
    let outputs: Vec<Vec<WindMeasure>> = mesh.iter().map(|cell| cell_output(mesh, cell)).collect();
    for (cell, output) in mesh.cells_mut().iter_mut().zip(outputs) {
        cell.weather.wind.output = output;
        cell.weather.wind.input.clear();
    }
}

/// Resolve one cell's input buckets into its outgoing wind
fn cell_output(mesh: &HexMesh, cell: &HexCell) -> Vec<WindMeasure> {
    if cell.weather.wind.input.is_empty() {
        return Vec::new();
    }

    let mut adjustments = Vec::new();
    let mut adjusted = Vec::new();
    for measure in cell.weather.wind.input.measures() {
        if measure.source.is_adjustment() {
            adjustments.push(*measure);
        } else {
            adjusted.push(slope_adjusted(mesh, cell, measure));
        }
    }

    let mut output = Vec::with_capacity(adjustments.len() + 1);
    if !adjusted.is_empty() {
        output.push(combine_wind(&adjusted));
    }
    output.extend(adjustments);
    output
}

/// Apply uphill drag or downhill boost from the upwind neighbor, turning
/// the wind toward a lower flank when it runs into rising ground.
fn slope_adjusted(mesh: &HexMesh, cell: &HexCell, measure: &WindMeasure) -> WindMeasure {
    let upwind = Bearing::nearest(measure.bearing + 180.0);
    let Some(neighbor) = cell.neighbor(upwind) else {
        return *measure;
    };

    // Slope is stored looking upwind; flip it to the direction of travel
    let rise_over_run = inverse_slope(neighbor.slope);
    let attenuation = (ATTENUATION_FACTOR * rise_over_run / SLOPE_REFERENCE).min(1.0);
    let strength = (measure.strength * (1.0 - attenuation)).max(0.0);

    let mut bearing = measure.bearing;
    if attenuation > DEFLECTION_THRESHOLD {
        let deflection = (MAX_DEFLECTION * attenuation / DEFLECTION_SATURATION).min(MAX_DEFLECTION);
        let lower = flank_height(mesh, cell, next_lowest_even_edge(measure.bearing));
        let higher = flank_height(mesh, cell, next_highest_even_edge(measure.bearing));
        let own = cell.usable_height();
        match (lower, higher) {
            (Some(l), Some(h)) if l < own && l < h => bearing -= deflection,
            (Some(l), None) if l < own => bearing -= deflection,
            (Some(l), Some(h)) if h < own && h < l => bearing += deflection,
            (None, Some(h)) if h < own => bearing += deflection,
            _ => {}
        }
    }

    WindMeasure::new(normalize_degrees(bearing), strength, measure.source)
}

fn flank_height(mesh: &HexMesh, cell: &HexCell, degrees: f64) -> Option<f64> {
    let bearing = Bearing::from_degrees(degrees)?;
    mesh.neighbor(cell.id, bearing).map(HexCell::usable_height)
}

/// Record, on every cell reached by a neighbor's wind, where it came from
fn link_sources(mesh: &mut HexMesh) {
    let mut links = Vec::new();
    for cell in mesh.iter() {
        if cell.weather.wind.output.is_empty() {
            continue;
        }
        let net = cell.weather.wind.net_output();
        for (index, strength) in neighbor_strengths(&net).into_iter().enumerate() {
            if strength <= 0.0 {
                continue;
            }
            if let Some(n) = cell.neighbor(Bearing::from_index(index)) {
                links.push((n.cell, cell.id));
            }
        }
    }
    for (target, source) in links {
        mesh.cell_mut(target).weather.wind.sources.insert(source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::CellType;
    use crate::weather::WindSource;

    fn ocean_mesh() -> HexMesh {
        let mut mesh = HexMesh::new(7.0, 8.0, 63.0, 56.0, 1.0).unwrap();
        mesh.apply(|cell| {
            cell.kind = CellType::Ocean;
            cell.water.state = 1.0;
        });
        mesh.recalculate_slopes();
        mesh
    }

    #[test]
    fn test_flat_ocean_keeps_uniform_wind() {
        for bearing in [0.0, 60.0, 90.0, 120.0, 180.0, 220.0, 240.0] {
            let mut mesh = ocean_mesh();
            let iterations = calculate_wind_effect(&mut mesh, WindMeasure::boundary(bearing, 8.2));
            assert!(iterations < MAX_WIND_ITERATIONS, "bearing {} did not settle", bearing);

            for cell in mesh.iter().filter(|c| !c.is_map_edge) {
                let output = &cell.weather.wind.output;
                assert_eq!(output.len(), 1, "cell {} at bearing {}: {:?}", cell.axial, bearing, output);
                assert!(
                    (output[0].bearing - bearing).abs() < 1e-6,
                    "cell {} bearing {} != {}",
                    cell.axial,
                    output[0].bearing,
                    bearing
                );
                assert!(
                    (output[0].strength - 8.2).abs() < 1e-6,
                    "cell {} strength {} at bearing {}",
                    cell.axial,
                    output[0].strength,
                    bearing
                );
            }
        }
    }

    #[test]
    fn test_uphill_slows_wind() {
        let mut mesh = ocean_mesh();
        let ridge = mesh.get(4, 3).unwrap().id;
        {
            let cell = mesh.cell_mut(ridge);
            cell.kind = CellType::Land;
            cell.height = 500.0;
        }
        mesh.recalculate_slopes();
        calculate_wind_effect(&mut mesh, WindMeasure::boundary(0.0, 10.0));

        let strength = mesh.cell(ridge).weather.wind.net_output().strength;
        assert!(strength < 10.0, "ridge kept strength {}", strength);
    }

    #[test]
    fn test_downhill_speeds_wind() {
        let mut mesh = ocean_mesh();
        // A plateau running in from the west edge, dropping to sea level
        for q in -2..4 {
            let cell = mesh.get_mut(q, 4).unwrap();
            cell.kind = CellType::Land;
            cell.height = 400.0;
        }
        mesh.recalculate_slopes();
        calculate_wind_effect(&mut mesh, WindMeasure::boundary(0.0, 10.0));

        let below = mesh.get(4, 4).unwrap();
        let boosted = below.weather.wind.output.iter().any(|m| m.strength > 10.0);
        assert!(boosted, "no downhill boost: {:?}", below.weather.wind.output);
    }

    #[test]
    fn test_sources_point_upwind() {
        let mut mesh = ocean_mesh();
        calculate_wind_effect(&mut mesh, WindMeasure::boundary(0.0, 10.0));

        let cell = mesh.get(3, 2).unwrap();
        let west = mesh.get(2, 2).unwrap().id;
        assert!(cell.weather.wind.sources.contains(&west), "sources {:?}", cell.weather.wind.sources);
        assert_eq!(cell.weather.wind.sources.len(), 1);
    }

    fn ridge_with_flank(flank: Bearing) -> (HexMesh, CellId) {
        let mut mesh = ocean_mesh();
        let ridge = mesh.get(4, 3).unwrap().id;
        {
            let cell = mesh.cell_mut(ridge);
            cell.kind = CellType::Land;
            cell.height = 500.0;
        }
        let side = mesh.neighbor(ridge, flank).unwrap().id;
        {
            let cell = mesh.cell_mut(side);
            cell.kind = CellType::Land;
            cell.height = 800.0;
        }
        mesh.recalculate_slopes();
        (mesh, ridge)
    }

    /// 500m over one 7km hex
    fn expected_deflection() -> f64 {
        let attenuation = ATTENUATION_FACTOR * (0.5 / 7.0) / SLOPE_REFERENCE;
        MAX_DEFLECTION * attenuation / DEFLECTION_SATURATION
    }

    #[test]
    fn test_ridge_turns_wind_toward_lower_flank() {
        // South-east flank high, so the wind bends north-east
        let (mesh, ridge) = ridge_with_flank(Bearing::SouthEast);
        let turned = slope_adjusted(&mesh, mesh.cell(ridge), &WindMeasure::neighbor(0.0, 10.0));
        let expected = 360.0 - expected_deflection();
        assert!((turned.bearing - expected).abs() < 1e-9, "bearing {} != {}", turned.bearing, expected);
        assert!(turned.strength < 10.0, "strength {}", turned.strength);

        // And the other way round
        let (mesh, ridge) = ridge_with_flank(Bearing::NorthEast);
        let turned = slope_adjusted(&mesh, mesh.cell(ridge), &WindMeasure::neighbor(0.0, 10.0));
        assert!(
            (turned.bearing - expected_deflection()).abs() < 1e-9,
            "bearing {} != {}",
            turned.bearing,
            expected_deflection()
        );
    }

    #[test]
    fn test_settled_ridge_output_is_deflected() {
        let (mut mesh, ridge) = ridge_with_flank(Bearing::SouthEast);
        calculate_wind_effect(&mut mesh, WindMeasure::boundary(0.0, 10.0));

        let output = &mesh.cell(ridge).weather.wind.output;
        assert!(!output.is_empty(), "ridge never reached");
        let main = output[0];
        assert!(!main.source.is_adjustment(), "first output is {:?}", main);
        assert!(main.bearing > 350.0 && main.bearing < 360.0, "bearing {}", main.bearing);
    }

    #[test]
    fn test_pressure_flows_toward_weak_flank() {
        let mut mesh = ocean_mesh();
        let weak = mesh.get(4, 3).unwrap().id;
        for id in mesh.ids().collect::<Vec<_>>() {
            let strength = if id == weak { 2.0 } else { 10.0 };
            mesh.cell_mut(id).weather.wind.input.add(WindMeasure::neighbor(0.0, strength));
        }
        smooth_pressure(&mut mesh);

        let pressure_of = |q: i32, r: i32| -> Vec<(i64, i64)> {
            let mut found: Vec<(i64, i64)> = mesh
                .get(q, r)
                .unwrap()
                .weather
                .wind
                .input
                .raw()
                .filter(|m| m.source == WindSource::Pressure)
                .map(WindMeasure::rounded)
                .collect();
            found.sort();
            found
        };
        let share = (8.0f64 / 3.0 * 100.0).round() as i64;
        // (3, 4) has the weak cell on its north-east flank, (5, 2) on its south-west
        assert_eq!(pressure_of(3, 4), vec![(18000, share), (33000, share)]);
        assert_eq!(pressure_of(5, 2), vec![(3000, share), (18000, share)]);

        let touched = mesh
            .iter()
            .filter(|c| c.weather.wind.input.raw().any(|m| m.source == WindSource::Pressure))
            .count();
        assert_eq!(touched, 2);
    }

    #[test]
    fn test_pressure_bypasses_slope() {
        let (mut mesh, ridge) = ridge_with_flank(Bearing::SouthEast);
        {
            let input = &mut mesh.cell_mut(ridge).weather.wind.input;
            input.add(WindMeasure::neighbor(0.0, 10.0));
            input.add(WindMeasure::pressure(180.0, 3.0));
        }

        let output = cell_output(&mesh, mesh.cell(ridge));
        assert_eq!(output.len(), 2, "{:?}", output);
        assert!(output[0].strength < 10.0, "uphill wind kept {}", output[0].strength);
        assert_eq!(output[1], WindMeasure::pressure(180.0, 3.0));
    }

    #[test]
    fn test_tall_ridge_leaves_separate_pressure_outputs() {
        let mut mesh = ocean_mesh();
        let ridge = mesh.get(4, 3).unwrap().id;
        {
            let cell = mesh.cell_mut(ridge);
            cell.kind = CellType::Land;
            cell.height = 10_000.0;
        }
        mesh.recalculate_slopes();
        let iterations = calculate_wind_effect(&mut mesh, WindMeasure::boundary(0.0, 10.0));
        assert!(iterations <= MAX_WIND_ITERATIONS, "ran {} iterations", iterations);

        let with_pressure: Vec<&HexCell> = mesh
            .iter()
            .filter(|c| c.weather.wind.output.iter().any(|m| m.source == WindSource::Pressure))
            .collect();
        assert!(!with_pressure.is_empty(), "no pressure smoothing around the ridge");
        for cell in with_pressure {
            let output = &cell.weather.wind.output;
            assert!(output.len() >= 2, "cell {} output {:?}", cell.axial, output);
            assert_ne!(output[0].source, WindSource::Pressure, "cell {} lost its main wind", cell.axial);
        }
    }

    #[test]
    fn test_ceiling_is_a_normal_exit() {
        let mut mesh = ocean_mesh();
        // A jagged field of peaks keeps pressure smoothing busy
        mesh.apply(|cell| {
            if !cell.is_map_edge && (cell.axial.q + 2 * cell.axial.r).rem_euclid(3) == 0 {
                cell.kind = CellType::Land;
                cell.height = 3000.0 + 700.0 * cell.axial.r as f64;
            }
        });
        mesh.recalculate_slopes();
        let iterations = calculate_wind_effect(&mut mesh, WindMeasure::boundary(30.0, 10.0));

        assert!(iterations <= MAX_WIND_ITERATIONS, "ran {} iterations", iterations);
        for cell in mesh.iter() {
            for m in &cell.weather.wind.output {
                assert!(m.strength.is_finite() && m.strength >= 0.0, "cell {} output {:?}", cell.axial, m);
            }
        }
        // Sources are linked however the loop ended
        assert!(mesh.iter().any(|c| !c.weather.wind.sources.is_empty()));
    }
}
