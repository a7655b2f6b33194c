//! Humidity balance carried by the prevailing wind
//!
//! One call is one pass; the driver repeats it until few cells change.

use crate::mesh::HexMesh;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HumidityState {
    /// Moisture held by the cell, 0.0 to 1.0
    pub state: f64,
    pub sim: HumiditySim,
}

/// Per-pass scratch values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HumiditySim {
    pub humidity_in: f64,
    pub humidity_out: f64,
}

/// Run one humidity pass. Returns the number of cells whose rounded state
/// changed.
///
/// Gains come from evaporation over standing water, transpiration over
/// land and an even share of each upwind source's humidity. Losses are a
/// base precipitation plus extra rain for every uphill edge.
pub fn calculate_humidity(
    mesh: &mut HexMesh,
    evaporation_rate: f64,
    transpiration_rate: f64,
    precipitation_rate: f64,
    slope_multiplier: f64,
) -> usize {
    // Gains are computed from last pass's states before any are replaced
    let passes: Vec<(f64, f64)> = mesh
        .iter()
        .map(|cell| {
            let mut gained = 0.0;
            if cell.water.state > 0.0 {
                gained += evaporation_rate;
            }
            if cell.is_land() {
                gained += transpiration_rate;
            }
            let sources = &cell.weather.wind.sources;
            for source in sources {
                gained += mesh.cell(*source).humidity.state / sources.len() as f64;
            }

            let mut loss = precipitation_rate;
            for n in cell.neighbors() {
                if n.slope > 0.0 {
                    loss += precipitation_rate * slope_multiplier * n.slope;
                }
            }

            let humidity_in = gained.min(1.0);
            let humidity_out = loss.min(1.0).min(humidity_in);
            (humidity_in, humidity_out)
        })
        .collect();

    let mut changed = 0;
    for (cell, (humidity_in, humidity_out)) in mesh.cells_mut().iter_mut().zip(passes) {
        let sim = &mut cell.humidity.sim;
        sim.humidity_in = humidity_in;
        sim.humidity_out = humidity_out;

        let state = humidity_in - humidity_out;
        if rounded(state) != rounded(cell.humidity.state) {
            changed += 1;
        }
        cell.humidity.state = state;
    }

    tracing::trace!("Humidity pass: {} cells changed", changed);
    changed
}

fn rounded(value: f64) -> i64 {
    (value * 1000.0).round() as i64
}
