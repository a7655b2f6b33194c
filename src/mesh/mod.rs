//! Fixed hexagonal mesh
//!
//! Cells live in a flat arena allocated once at construction. Neighbor
//! tables hold arena indices, and an axial lookup grid maps `(q, r)` to an
//! index so every lookup (by address, by pixel, by bearing) is O(1).

pub mod cell;
pub mod coords;

pub use cell::{calculate_slope, inverse_slope, CellId, CellType, HexCell, Neighbor, WaterState};
pub use coords::{
    next_highest_even_edge, next_lowest_even_edge, normalize_degrees, round_to, Axial, Bearing,
    HexLayout, PixelPoint,
};

use crate::config::MeshParams;
use crate::error::{Result, SimError};

/// Boundary cells per map side, in construction order
#[derive(Debug, Clone, Default)]
pub struct EdgeLists {
    pub north: Vec<CellId>,
    pub east: Vec<CellId>,
    pub south: Vec<CellId>,
    pub west: Vec<CellId>,
}

pub struct HexMesh {
    layout: HexLayout,
    px_to_km: f64,
    cells: Vec<HexCell>,
    /// Row-major `(r, q + column_offset)` lookup into `cells`
    axial_lookup: Vec<Option<CellId>>,
    row_count: i32,
    row_width: i32,
    lookup_columns: i32,
    pub edges: EdgeLists,
}

impl HexMesh {
    /// Build the mesh covering a `width` × `height` pixel world.
    ///
    /// Each row holds enough hexes to overflow the right edge even on
    /// offset rows, and rows overflow the bottom so there is no serrated
    /// gap. Fails if the resulting opposing edge lists differ in length.
    pub fn new(hex_width: f64, hex_height: f64, width: f64, height: f64, px_to_km: f64) -> Result<Self> {
        let dims = [
            ("hex width", hex_width),
            ("hex height", hex_height),
            ("world width", width),
            ("world height", height),
            ("px to km", px_to_km),
        ];
        for (name, value) in dims {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimError::InvalidGeometry(format!("{} must be positive, got {}", name, value)));
            }
        }

        let layout = HexLayout::new(hex_width, hex_height);
        let row_width = ((width + layout.half_width()) / hex_width).ceil() as i32;
        let row_count = 1 + (height / layout.row_spacing()).floor() as i32;
        // The last row only counts as the south edge when it reaches past the world
        let overflow = row_count as f64 * hex_height - layout.row_spacing() - height;
        let bottom_edge_row = if overflow > layout.row_spacing() {
            row_count - 1
        } else {
            row_count
        };

        let lookup_columns = row_count / 2 + row_width;
        let mut mesh = Self {
            layout,
            px_to_km,
            cells: Vec::with_capacity((row_count * row_width) as usize),
            axial_lookup: vec![None; (row_count * lookup_columns) as usize],
            row_count,
            row_width,
            lookup_columns,
            edges: EdgeLists::default(),
        };

        for r in 0..row_count {
            for column in 0..row_width {
                let axial = Axial::new(column - r.div_euclid(2), r);
                let site = layout.axial_to_pixel(axial);
                let is_west = column == 0;
                let is_east = column == row_width - 1;
                let is_north = r == 0;
                let is_south = r == bottom_edge_row;

                let id = CellId(mesh.cells.len());
                let cell = HexCell::new(
                    id,
                    axial,
                    site,
                    is_west || is_east || is_north || is_south,
                    layout.hexagon_points(site),
                );
                mesh.cells.push(cell);
                if let Some(slot) = mesh.lookup_index(axial) {
                    mesh.axial_lookup[slot] = Some(id);
                }

                if is_west {
                    mesh.edges.west.push(id);
                }
                if is_east {
                    mesh.edges.east.push(id);
                }
                if is_north {
                    mesh.edges.north.push(id);
                }
                if is_south {
                    mesh.edges.south.push(id);
                }
            }
        }

        mesh.link_neighbors();

        if mesh.edges.west.len() != mesh.edges.east.len() {
            return Err(SimError::EdgeMismatch {
                first: "East",
                first_len: mesh.edges.east.len(),
                second: "West",
                second_len: mesh.edges.west.len(),
            });
        }
        if mesh.edges.north.len() != mesh.edges.south.len() {
            return Err(SimError::EdgeMismatch {
                first: "North",
                first_len: mesh.edges.north.len(),
                second: "South",
                second_len: mesh.edges.south.len(),
            });
        }

        tracing::debug!(
            "Built hex mesh: {} cells ({} rows x {} columns)",
            mesh.cells.len(),
            row_count,
            row_width
        );
        Ok(mesh)
    }

    pub fn from_params(params: &MeshParams) -> Result<Self> {
        Self::new(
            params.hex_width,
            params.hex_height,
            params.world_width,
            params.world_height,
            params.px_to_km,
        )
    }

    fn link_neighbors(&mut self) {
        for index in 0..self.cells.len() {
            for bearing in Bearing::ALL {
                let cell = &self.cells[index];
                let Some(other) = self.id_at(cell.axial.step(bearing)) else {
                    continue;
                };
                let corner = (bearing.index() + 1) % 6;
                let edge = [cell.points[corner], cell.points[(corner + 1) % 6]];
                let slope = calculate_slope(cell, &self.cells[other.index()], self.px_to_km);
                self.cells[index].set_neighbor(Neighbor {
                    cell: other,
                    bearing,
                    edge,
                    slope,
                });
            }
        }
    }

    fn lookup_index(&self, axial: Axial) -> Option<usize> {
        if axial.r < 0 || axial.r >= self.row_count {
            return None;
        }
        let column = axial.q + self.row_count / 2;
        if column < 0 || column >= self.lookup_columns {
            return None;
        }
        Some((axial.r * self.lookup_columns + column) as usize)
    }

    // =========================================================================
    // LOOKUPS
    // =========================================================================

    pub fn layout(&self) -> &HexLayout {
        &self.layout
    }

    pub fn px_to_km(&self) -> f64 {
        self.px_to_km
    }

    pub fn row_count(&self) -> i32 {
        self.row_count
    }

    pub fn row_width(&self) -> i32 {
        self.row_width
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[HexCell] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [HexCell] {
        &mut self.cells
    }

    pub fn cell(&self, id: CellId) -> &HexCell {
        &self.cells[id.index()]
    }

    pub fn cell_mut(&mut self, id: CellId) -> &mut HexCell {
        &mut self.cells[id.index()]
    }

    pub fn id_at(&self, axial: Axial) -> Option<CellId> {
        self.lookup_index(axial).and_then(|slot| self.axial_lookup[slot])
    }

    pub fn get(&self, q: i32, r: i32) -> Option<&HexCell> {
        self.id_at(Axial::new(q, r)).map(|id| self.cell(id))
    }

    pub fn get_mut(&mut self, q: i32, r: i32) -> Option<&mut HexCell> {
        let id = self.id_at(Axial::new(q, r))?;
        Some(self.cell_mut(id))
    }

    /// Cell across the edge at `bearing`, if the mesh has one
    pub fn neighbor(&self, id: CellId, bearing: Bearing) -> Option<&HexCell> {
        self.cell(id).neighbor(bearing).map(|n| self.cell(n.cell))
    }

    /// Cell whose footprint contains the pixel, converted directly.
    pub fn find_closest(&self, x: f64, y: f64) -> Option<&HexCell> {
        let axial = self.layout.pixel_to_axial(PixelPoint::new(x, y));
        self.get(axial.q, axial.r)
    }

    // =========================================================================
    // TRAVERSAL
    // =========================================================================

    /// Visit every cell once, in construction order.
    pub fn apply<F: FnMut(&mut HexCell)>(&mut self, mut f: F) {
        for cell in self.cells.iter_mut() {
            f(cell);
        }
    }

    pub fn reduce<T, F: FnMut(T, &HexCell) -> T>(&self, init: T, f: F) -> T {
        self.cells.iter().fold(init, f)
    }

    pub fn iter(&self) -> impl Iterator<Item = &HexCell> {
        self.cells.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = CellId> {
        (0..self.cells.len()).map(CellId)
    }

    // =========================================================================
    // HOST HELPERS
    // =========================================================================

    /// Refresh every cached neighbor slope from current elevations.
    ///
    /// Slopes are computed at construction when all cells sit at 0, so the
    /// host calls this once after writing elevations.
    pub fn recalculate_slopes(&mut self) {
        for index in 0..self.cells.len() {
            let slopes: Vec<(Bearing, f64)> = self.cells[index]
                .neighbors()
                .map(|n| {
                    let slope = calculate_slope(&self.cells[index], &self.cells[n.cell.index()], self.px_to_km);
                    (n.bearing, slope)
                })
                .collect();
            for (bearing, slope) in slopes {
                self.cells[index].set_slope(bearing, slope);
            }
        }
    }

    /// Mark cells below `sea_level` as ocean with standing water and
    /// everything else as dry land. Returns the ocean cell count.
    pub fn assign_ocean_below(&mut self, sea_level: f64) -> usize {
        let mut oceans = 0;
        self.apply(|cell| {
            if cell.height < sea_level {
                cell.kind = CellType::Ocean;
                cell.water.state = 1.0;
                oceans += 1;
            } else {
                cell.kind = CellType::Land;
                cell.water.state = 0.0;
            }
        });
        oceans
    }
}
