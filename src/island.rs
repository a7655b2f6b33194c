//! Seeded synthetic island heightmap
//!
//! A radial falloff shaped by fractal Perlin noise, so the map edges always
//! sit under water and the interior carries hills, valleys and the odd
//! enclosed basin for the hydrology to work on.

use noise::{NoiseFn, Perlin};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::mesh::HexMesh;

#[derive(Clone, Debug)]
pub struct IslandParams {
    /// Elevation of the tallest interior terrain, meters
    pub peak_height: f64,
    /// Depth the falloff reaches at the map corners, meters
    pub ocean_depth: f64,
    /// Fraction of the half-extent covered by land before the falloff
    pub radius: f64,
    /// Noise features per world width
    pub frequency: f64,
    pub octaves: usize,
    /// Weight of the noise relative to the radial shape
    pub roughness: f64,
}

impl Default for IslandParams {
    fn default() -> Self {
        Self {
            peak_height: 2400.0,
            ocean_depth: 1500.0,
            radius: 0.7,
            frequency: 4.0,
            octaves: 4,
            roughness: 0.45,
        }
    }
}

/// Fractal Brownian motion over Perlin noise, roughly in [-1, 1]
fn fbm(perlin: &Perlin, x: f64, y: f64, octaves: usize) -> f64 {
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut max_value = 0.0;
    for _ in 0..octaves {
        total += perlin.get([x * frequency, y * frequency]) * amplitude;
        max_value += amplitude;
        amplitude *= 0.5;
        frequency *= 2.0;
    }
    total / max_value
}

/// Write island elevations into every cell. Map edge cells are always
/// pushed below sea level. Returns the `(min, max)` height written.
pub fn generate_island(mesh: &mut HexMesh, seed: u64, params: &IslandParams) -> (f64, f64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let perlin = Perlin::new(rng.gen());

    let (width, height) = mesh.iter().fold((0.0f64, 0.0f64), |(w, h), cell| {
        (w.max(cell.site.x), h.max(cell.site.y))
    });
    let half_w = (width / 2.0).max(1.0);
    let half_h = (height / 2.0).max(1.0);
    // Nudge the centre so different seeds give different outlines
    let cx = half_w + rng.gen_range(-0.1..0.1) * half_w;
    let cy = half_h + rng.gen_range(-0.1..0.1) * half_h;
    let offset = (rng.gen_range(0.0..1000.0), rng.gen_range(0.0..1000.0));

    let mut min = f64::MAX;
    let mut max = f64::MIN;
    mesh.apply(|cell| {
        let dx = (cell.site.x - cx) / half_w;
        let dy = (cell.site.y - cy) / half_h;
        let distance = (dx * dx + dy * dy).sqrt();
        let shape = 1.0 - distance / params.radius;

        let nx = cell.site.x / (half_w * 2.0) * params.frequency + offset.0;
        let ny = cell.site.y / (half_h * 2.0) * params.frequency + offset.1;
        let detail = fbm(&perlin, nx, ny, params.octaves);

        let mut elevation = shape + detail * params.roughness;
        if cell.is_map_edge {
            elevation = elevation.min(-0.1);
        }
        let h = if elevation >= 0.0 {
            elevation * params.peak_height
        } else {
            elevation * params.ocean_depth
        };

        cell.height = h;
        min = min.min(h);
        max = max.max(h);
    });

    tracing::debug!("Island heights {:.0}m to {:.0}m (seed {})", min, max, seed);
    (min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mesh() -> HexMesh {
        HexMesh::new(7.0, 8.0, 140.0, 140.0, 1.0).unwrap()
    }

    #[test]
    fn test_same_seed_same_island() {
        let mut a = mesh();
        let mut b = mesh();
        generate_island(&mut a, 42, &IslandParams::default());
        generate_island(&mut b, 42, &IslandParams::default());
        assert!(a.iter().zip(b.iter()).all(|(x, y)| x.height == y.height));
    }

    #[test]
    fn test_edges_are_submerged_and_centre_is_land() {
        let mut mesh = mesh();
        let (min, max) = generate_island(&mut mesh, 7, &IslandParams::default());

        assert!(min < 0.0 && max > 0.0, "range {}..{}", min, max);
        for cell in mesh.iter().filter(|c| c.is_map_edge) {
            assert!(cell.height < 0.0, "edge cell {} at {}", cell.axial, cell.height);
        }
        let land = mesh.iter().filter(|c| c.height >= 0.0).count();
        assert!(land > mesh.len() / 20, "only {} of {} cells above sea level", land, mesh.len());
    }
}
