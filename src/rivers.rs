//! River and lake routing
//!
//! Humidity falling on each land cell is walked downhill. Water that reaches
//! a local minimum floods the surrounding basin until it finds a spill
//! point: a lower or ocean spill drains it along a river, a higher one
//! raises the basin's pool level. Pools persist between calls, so deep
//! basins fill over several driver ticks.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{Result, SimError};
use crate::mesh::{Bearing, CellId, HexCell, HexMesh};

/// Routing steps per cell before its remaining water is dropped
pub const MAX_ROUTE_ATTEMPTS: usize = 20;

/// Effective heights closer than this count as level
const LEVEL_EPSILON: f64 = 1e-6;

/// Outgoing river across one hex edge
#[derive(Debug, Clone, PartialEq)]
pub struct RiverEdge {
    pub target: CellId,
    pub bearing: Bearing,
    /// Water carried, summed over every source that drains through here
    pub amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiverState {
    /// Standing water depth; raising it lifts the effective height
    pub pool: Option<f64>,
    pub river: Option<RiverEdge>,
    pub sim: RiverSim,
}

/// Per-call scratch and the snapshot used for change detection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiverSim {
    pub water_in: f64,
    pub prev_pool: Option<f64>,
    pub prev_river: Option<RiverEdge>,
}

/// Elevation plus pooled water converted to meters
pub fn effective_height(cell: &HexCell, water_to_height_ratio: f64) -> f64 {
    cell.height + cell.river.pool.unwrap_or(0.0) * water_to_height_ratio
}

/// Route one round of humidity into rivers and pools.
///
/// Returns the number of land cells whose pool or river changed, which the
/// driver uses to decide whether another round is needed.
pub fn calculate_rivers(mesh: &mut HexMesh, water_to_height_ratio: f64) -> Result<usize> {
    mesh.apply(|cell| {
        if cell.is_ocean() {
            cell.river.sim.water_in = 0.0;
            cell.river.river = None;
            return;
        }
        cell.river.sim.water_in = cell.humidity.state;
        cell.river.sim.prev_pool = cell.river.pool;
        cell.river.sim.prev_river = cell.river.river.take();
    });

    let sources: Vec<(CellId, f64)> = mesh
        .iter()
        .filter(|c| c.is_land() && c.river.sim.water_in > 0.0)
        .map(|c| (c.id, c.river.sim.water_in))
        .collect();

    let mut router = Router {
        mesh: &mut *mesh,
        ratio: water_to_height_ratio,
    };
    for (id, water) in sources {
        router.route(id, water)?;
    }

    let changed = mesh.reduce(0, |count, cell| {
        if cell.is_land() && river_changed(&cell.river) {
            count + 1
        } else {
            count
        }
    });
    tracing::trace!("River pass: {} cells changed", changed);
    Ok(changed)
}

fn river_changed(state: &RiverState) -> bool {
    let pool_changed = match (state.pool, state.sim.prev_pool) {
        (Some(now), Some(before)) => rounded(now) != rounded(before),
        (None, None) => false,
        _ => true,
    };
    let river_changed = match (&state.river, &state.sim.prev_river) {
        (Some(now), Some(before)) => rounded(now.amount) != rounded(before.amount) || now.bearing != before.bearing,
        (None, None) => false,
        _ => true,
    };
    pool_changed || river_changed
}

fn rounded(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

// =============================================================================
// ROUTING
// =============================================================================

struct Router<'a> {
    mesh: &'a mut HexMesh,
    ratio: f64,
}

/// Result of flooding outward from a local minimum
struct Basin {
    cells: Vec<CellId>,
    /// Cell each discovered cell was reached from, and across which edge
    parents: HashMap<CellId, (CellId, Bearing)>,
    spill: Option<CellId>,
}

impl Router<'_> {
    fn height(&self, id: CellId) -> f64 {
        effective_height(self.mesh.cell(id), self.ratio)
    }

    fn route(&mut self, origin: CellId, water: f64) -> Result<()> {
        let mut cursor = origin;
        let mut remaining = water;
        let mut attempts = 0;

        while remaining > 0.0 && attempts < MAX_ROUTE_ATTEMPTS {
            attempts += 1;

            if self.mesh.cell(cursor).is_ocean() {
                break;
            }

            // Already draining: swell the river and follow it
            if let Some(river) = self.mesh.cell_mut(cursor).river.river.as_mut() {
                river.amount += remaining;
                cursor = river.target;
                continue;
            }

            if let Some((lowest, bearing)) = self.lowest_neighbor(cursor) {
                if self.mesh.cell(lowest).is_ocean() || self.height(lowest) < self.height(cursor) {
                    self.mesh.cell_mut(cursor).river.river = Some(RiverEdge {
                        target: lowest,
                        bearing,
                        amount: remaining,
                    });
                    cursor = lowest;
                    continue;
                }
            }

            let basin = self.flood(cursor);
            let Some(spill) = basin.spill else {
                break;
            };
            let level = self.height(cursor);
            let spill_height = self.height(spill);

            if self.mesh.cell(spill).is_ocean() || spill_height < level - LEVEL_EPSILON {
                self.drain(&basin, cursor, spill, remaining)?;
                if self.mesh.cell(spill).is_ocean() {
                    remaining = 0.0;
                }
                cursor = spill;
            } else if spill_height > level + LEVEL_EPSILON {
                let absorbed = self.raise(&basin.cells, spill_height);
                remaining = (remaining - absorbed).max(0.0);
            } else {
                return Err(SimError::ImpossibleSpill {
                    origin: self.mesh.cell(cursor).axial,
                    spill: self.mesh.cell(spill).axial,
                    height: spill_height,
                });
            }
        }

        Ok(())
    }

    /// Best downhill candidate: ocean first, then dry land, then pools,
    /// each by effective height. Neighbors already draining into `id` are
    /// skipped so two cells never feed each other.
    fn lowest_neighbor(&self, id: CellId) -> Option<(CellId, Bearing)> {
        let cell = self.mesh.cell(id);
        let mut best: Option<((u8, f64), CellId, Bearing)> = None;
        for n in cell.neighbors() {
            let other = self.mesh.cell(n.cell);
            if other.river.river.as_ref().is_some_and(|r| r.target == id) {
                continue;
            }
            let rank = if other.is_ocean() {
                0
            } else if other.river.pool.is_none() {
                1
            } else {
                2
            };
            let key = (rank, effective_height(other, self.ratio));
            let better = match &best {
                None => true,
                Some((best_key, _, _)) => key.0 < best_key.0 || (key.0 == best_key.0 && key.1 < best_key.1),
            };
            if better {
                best = Some((key, n.cell, n.bearing));
            }
        }
        best.map(|(_, cell, bearing)| (cell, bearing))
    }

    /// Breadth-first fill over cells level with `origin` or already pooled,
    /// tracking the best spill among the cells that break the fill.
    fn flood(&self, origin: CellId) -> Basin {
        let level = self.height(origin);
        let mut cells = vec![origin];
        let mut in_basin = HashSet::from([origin]);
        let mut parents = HashMap::new();
        let mut spill: Option<CellId> = None;
        let mut queue = VecDeque::from([origin]);

        while let Some(current) = queue.pop_front() {
            for n in self.mesh.cell(current).neighbors() {
                if in_basin.contains(&n.cell) {
                    continue;
                }
                let other = self.mesh.cell(n.cell);
                parents.entry(n.cell).or_insert((current, n.bearing));

                let other_height = effective_height(other, self.ratio);
                let joins = other.is_land()
                    && (other.river.pool.is_some() || (other_height - level).abs() < LEVEL_EPSILON);
                if joins {
                    in_basin.insert(n.cell);
                    cells.push(n.cell);
                    queue.push_back(n.cell);
                    continue;
                }

                let replace = match spill {
                    None => true,
                    Some(s) if self.mesh.cell(s).is_ocean() => false,
                    Some(_) if other.is_ocean() => true,
                    Some(s) => other_height < self.height(s),
                };
                if replace {
                    spill = Some(n.cell);
                }
            }
        }

        Basin { cells, parents, spill }
    }

    /// Stamp a river along the basin path from `origin` out to `spill`
    fn drain(&mut self, basin: &Basin, origin: CellId, spill: CellId, water: f64) -> Result<()> {
        let mut hops = Vec::new();
        let mut at = spill;
        for _ in 0..=basin.parents.len() {
            if at == origin {
                break;
            }
            let Some(&(from, bearing)) = basin.parents.get(&at) else {
                break;
            };
            hops.push((from, bearing, at));
            at = from;
        }
        if at != origin {
            return Err(SimError::BacktrackFailed {
                from: self.mesh.cell(spill).axial,
                source_cell: self.mesh.cell(origin).axial,
            });
        }

        for (from, bearing, to) in hops {
            let river = &mut self.mesh.cell_mut(from).river.river;
            if let Some(existing) = river.as_mut().filter(|r| r.bearing == bearing) {
                existing.amount += water;
            } else {
                *river = Some(RiverEdge {
                    target: to,
                    bearing,
                    amount: water,
                });
            }
        }
        Ok(())
    }

    /// Lift every basin pool to `level`. Returns the pool depth added.
    fn raise(&mut self, cells: &[CellId], level: f64) -> f64 {
        let mut absorbed = 0.0;
        for &id in cells {
            let cell = self.mesh.cell_mut(id);
            let target = (level - cell.height) / self.ratio;
            let current = cell.river.pool.unwrap_or(0.0);
            if target > current {
                absorbed += target - current;
                cell.river.pool = Some(target);
            }
        }
        absorbed
    }
}
