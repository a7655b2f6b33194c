//! Axial hex addressing, bearings and pixel conversion for the odd-r layout.
//!
//! Rows are offset so odd rows sit half a hexagon to the right:
//!
//! ```text
//!  [ ][ ][ ][ ]
//!   [ ][ ][ ][ ]
//!  [ ][ ][ ][ ]
//! ```
//!
//! `r` maps straight to a display row, and `q` shifts one column left every
//! two rows (`q = column - floor(r / 2)`).

use std::fmt;

/// Integer hex address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Axial {
    pub q: i32,
    pub r: i32,
}

impl Axial {
    pub fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Address of the adjacent hex across the edge at `bearing`
    pub fn step(&self, bearing: Bearing) -> Axial {
        let (dq, dr) = bearing.axial_offset();
        Axial::new(self.q + dq, self.r + dr)
    }
}

impl fmt::Display for Axial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(q{}, r{})", self.q, self.r)
    }
}

/// Pixel-space position (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &PixelPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

// =============================================================================
// BEARINGS
// =============================================================================

/// One of the six hexagon edge directions, measured clockwise from east.
///
/// Because pixel y grows downward, 60° points south-east on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bearing {
    East,
    SouthEast,
    SouthWest,
    West,
    NorthWest,
    NorthEast,
}

impl Bearing {
    /// All bearings in table order (0°, 60°, ... 300°)
    pub const ALL: [Bearing; 6] = [
        Bearing::East,
        Bearing::SouthEast,
        Bearing::SouthWest,
        Bearing::West,
        Bearing::NorthWest,
        Bearing::NorthEast,
    ];

    pub fn index(self) -> usize {
        match self {
            Bearing::East => 0,
            Bearing::SouthEast => 1,
            Bearing::SouthWest => 2,
            Bearing::West => 3,
            Bearing::NorthWest => 4,
            Bearing::NorthEast => 5,
        }
    }

    pub fn from_index(index: usize) -> Bearing {
        Self::ALL[index % 6]
    }

    pub fn degrees(self) -> f64 {
        self.index() as f64 * 60.0
    }

    /// Exact edge for a bearing that is a multiple of 60°, if any
    pub fn from_degrees(degrees: f64) -> Option<Bearing> {
        let normalized = normalize_degrees(degrees);
        let index = (normalized / 60.0).round();
        if (index * 60.0 - normalized).abs() < 1e-9 {
            Some(Self::from_index(index as usize))
        } else {
            None
        }
    }

    /// Edge closest to an arbitrary bearing
    pub fn nearest(degrees: f64) -> Bearing {
        let index = (normalize_degrees(degrees) / 60.0).round() as usize;
        Self::from_index(index)
    }

    pub fn opposite(self) -> Bearing {
        Self::from_index(self.index() + 3)
    }

    /// Next edge counter-clockwise (-60°)
    pub fn lower(self) -> Bearing {
        Self::from_index(self.index() + 5)
    }

    /// Next edge clockwise (+60°)
    pub fn higher(self) -> Bearing {
        Self::from_index(self.index() + 1)
    }

    fn axial_offset(self) -> (i32, i32) {
        match self {
            Bearing::East => (1, 0),
            Bearing::SouthEast => (0, 1),
            Bearing::SouthWest => (-1, 1),
            Bearing::West => (-1, 0),
            Bearing::NorthWest => (0, -1),
            Bearing::NorthEast => (1, -1),
        }
    }
}

impl fmt::Display for Bearing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.index() * 60)
    }
}

/// Wrap any angle into [0, 360)
pub fn normalize_degrees(degrees: f64) -> f64 {
    let d = degrees.rem_euclid(360.0);
    if d >= 360.0 {
        0.0
    } else {
        d
    }
}

/// Next edge bearing strictly above `degrees` (0 → 60, 59 → 60, 300 → 0)
pub fn next_highest_even_edge(degrees: f64) -> f64 {
    (((degrees + 1.0) / 60.0).ceil() * 60.0).rem_euclid(360.0)
}

/// Next edge bearing strictly below `degrees`, except on the edge 0° itself
/// (300 → 240, 241 → 240, 1 → 0)
pub fn next_lowest_even_edge(degrees: f64) -> f64 {
    (((degrees + 359.0) / 60.0).floor() * 60.0).rem_euclid(360.0)
}

pub fn round_to(value: f64, precision: i32) -> f64 {
    let raise = 10f64.powi(precision);
    (value * raise).round() / raise
}

/// Rounds halves toward positive infinity, so hit-testing splits shared
/// borders consistently on both sides of zero.
fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

/// Snap fractional axial `(q, r)` to the nearest hex. The component with
/// the largest rounding error is rebuilt from the other two.
fn cube_round(q: f64, r: f64) -> Axial {
    let s = -q - r;
    let mut rq = round_half_up(q);
    let mut rr = round_half_up(r);
    let rs = round_half_up(s);

    let dq = (rq as f64 - q).abs();
    let dr = (rr as f64 - r).abs();
    let ds = (rs as f64 - s).abs();
    if dq > dr && dq > ds {
        rq = -rr - rs;
    } else if dr > ds {
        rr = -rq - rs;
    }
    Axial::new(rq, rr)
}

// =============================================================================
// PIXEL LAYOUT
// =============================================================================

/// Closed-form conversion between axial addresses and pixel sites
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HexLayout {
    pub hex_width: f64,
    pub hex_height: f64,
}

impl HexLayout {
    pub fn new(hex_width: f64, hex_height: f64) -> Self {
        Self {
            hex_width,
            hex_height,
        }
    }

    pub fn half_width(&self) -> f64 {
        self.hex_width / 2.0
    }

    pub fn quarter_height(&self) -> f64 {
        self.hex_height / 4.0
    }

    /// Vertical distance between row centers
    pub fn row_spacing(&self) -> f64 {
        self.hex_height * 0.75
    }

    fn row_offset(&self, r: i32) -> f64 {
        if r.rem_euclid(2) == 0 {
            0.0
        } else {
            self.half_width()
        }
    }

    pub fn q_to_x(&self, q: i32, r: i32) -> f64 {
        (q + r.div_euclid(2)) as f64 * self.hex_width + self.row_offset(r)
    }

    pub fn x_to_q(&self, x: f64, r: i32) -> i32 {
        round_half_up((x - self.row_offset(r)) / self.hex_width - r.div_euclid(2) as f64)
    }

    pub fn r_to_y(&self, r: i32) -> f64 {
        self.quarter_height() + r as f64 * self.row_spacing()
    }

    pub fn y_to_r(&self, y: f64) -> i32 {
        round_half_up((y - self.quarter_height()) / self.row_spacing())
    }

    pub fn axial_to_pixel(&self, axial: Axial) -> PixelPoint {
        PixelPoint::new(self.q_to_x(axial.q, axial.r), self.r_to_y(axial.r))
    }

    /// Hexagon containing `point`. Works on fractional axial coordinates
    /// and rounds in cube space, so the tips resolve to their own cell.
    pub fn pixel_to_axial(&self, point: PixelPoint) -> Axial {
        let r = (point.y - self.quarter_height()) / self.row_spacing();
        let q = point.x / self.hex_width - r / 2.0;
        cube_round(q, r)
    }

    /// Hexagon corners, clockwise from the top point
    pub fn hexagon_points(&self, site: PixelPoint) -> [PixelPoint; 6] {
        let hw = self.half_width();
        let qh = self.quarter_height();
        let hh = self.hex_height / 2.0;
        [
            PixelPoint::new(site.x, site.y - hh),
            PixelPoint::new(site.x + hw, site.y - qh),
            PixelPoint::new(site.x + hw, site.y + qh),
            PixelPoint::new(site.x, site.y + hh),
            PixelPoint::new(site.x - hw, site.y + qh),
            PixelPoint::new(site.x - hw, site.y - qh),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX_WIDTH: f64 = 7.0;
    const HEX_HEIGHT: f64 = 8.0;

    fn layout() -> HexLayout {
        HexLayout::new(HEX_WIDTH, HEX_HEIGHT)
    }

    #[test]
    fn test_rows_shift_by_three_quarter_height() {
        let l = layout();
        assert_eq!(l.r_to_y(0), HEX_HEIGHT / 4.0);
        assert_eq!(l.r_to_y(1), HEX_HEIGHT / 4.0 + HEX_HEIGHT * 0.75);
        assert_eq!(l.r_to_y(5), HEX_HEIGHT / 4.0 + 5.0 * HEX_HEIGHT * 0.75);
        assert_eq!(l.y_to_r(HEX_HEIGHT / 4.0), 0);
        assert_eq!(l.y_to_r(HEX_HEIGHT / 4.0 + 5.0 * HEX_HEIGHT * 0.75), 5);
    }

    #[test]
    fn test_columns_shift_on_odd_rows() {
        let l = layout();
        assert_eq!(l.q_to_x(0, 0), 0.0);
        assert_eq!(l.q_to_x(5, 0), 5.0 * HEX_WIDTH);
        assert_eq!(l.q_to_x(0, 1), HEX_WIDTH / 2.0);
        assert_eq!(l.q_to_x(0, 2), HEX_WIDTH);
        assert_eq!(l.q_to_x(-1, 2), 0.0);
        assert_eq!(l.q_to_x(-1, 3), HEX_WIDTH / 2.0);

        assert_eq!(l.x_to_q(0.0, 0), 0);
        assert_eq!(l.x_to_q(HEX_WIDTH / 2.0, 1), 0);
        assert_eq!(l.x_to_q(0.0, 2), -1);
        assert_eq!(l.x_to_q(HEX_WIDTH / 2.0, 3), -1);
        assert_eq!(l.x_to_q(3.0 * HEX_WIDTH, 2), 2);
        assert_eq!(l.x_to_q(3.5 * HEX_WIDTH, 3), 2);
    }

    #[test]
    fn test_pixel_tips_stay_in_cell() {
        let l = layout();
        let axial = Axial::new(1, 2);
        let site = l.axial_to_pixel(axial);
        for dy in [-3.9, -3.5, -3.0, 3.0, 3.5, 3.9] {
            let hit = l.pixel_to_axial(PixelPoint::new(site.x, site.y + dy));
            assert_eq!(hit, axial, "offset {} from the site", dy);
        }
        // Just past the top tip belongs to the row above
        let above = l.pixel_to_axial(PixelPoint::new(site.x, site.y - 4.1));
        assert_eq!(above.r, 1, "got {}", above);
        // Beside the upper-left edge, outside the hexagon
        let corner = l.pixel_to_axial(PixelPoint::new(site.x - 3.0, site.y - 3.0));
        assert_eq!(corner, axial.step(Bearing::NorthWest));
    }

    #[test]
    fn test_even_edge_helpers() {
        assert_eq!(next_highest_even_edge(0.0), 60.0);
        assert_eq!(next_highest_even_edge(1.0), 60.0);
        assert_eq!(next_highest_even_edge(59.0), 60.0);
        assert_eq!(next_highest_even_edge(300.0), 0.0);

        assert_eq!(next_lowest_even_edge(300.0), 240.0);
        assert_eq!(next_lowest_even_edge(299.0), 240.0);
        assert_eq!(next_lowest_even_edge(241.0), 240.0);
        assert_eq!(next_lowest_even_edge(1.0), 0.0);
    }

    #[test]
    fn test_bearing_lookup() {
        assert_eq!(Bearing::from_degrees(120.0), Some(Bearing::SouthWest));
        assert_eq!(Bearing::from_degrees(-60.0), Some(Bearing::NorthEast));
        assert_eq!(Bearing::from_degrees(90.0), None);
        assert_eq!(Bearing::nearest(350.0), Bearing::East);
        assert_eq!(Bearing::East.opposite(), Bearing::West);
        assert_eq!(Bearing::East.lower(), Bearing::NorthEast);
        assert_eq!(Bearing::NorthEast.higher(), Bearing::East);
    }

    #[test]
    fn test_opposite_steps_cancel() {
        let origin = Axial::new(3, -2);
        for bearing in Bearing::ALL {
            assert_eq!(origin.step(bearing).step(bearing.opposite()), origin, "bearing {}", bearing);
        }
    }
}
