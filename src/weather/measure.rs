//! Wind measures, directional accumulation and bearing splits.

use std::collections::BTreeMap;

use crate::mesh::{normalize_degrees, Bearing};

/// Where a wind contribution came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WindSource {
    /// Prevailing wind entering across the map boundary
    Boundary,
    /// Share of an adjacent cell's output
    Neighbor,
    /// Pressure equalization; bypasses slope effects
    Pressure,
    /// Vector sum of several contributions
    Combined,
}

impl WindSource {
    pub fn is_adjustment(self) -> bool {
        self == WindSource::Pressure
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindMeasure {
    /// Direction the wind blows toward, degrees in [0, 360)
    pub bearing: f64,
    pub strength: f64,
    pub source: WindSource,
}

impl WindMeasure {
    pub fn new(bearing: f64, strength: f64, source: WindSource) -> Self {
        Self {
            bearing: normalize_degrees(bearing),
            strength,
            source,
        }
    }

    pub fn boundary(bearing: f64, strength: f64) -> Self {
        Self::new(bearing, strength, WindSource::Boundary)
    }

    pub fn neighbor(bearing: f64, strength: f64) -> Self {
        Self::new(bearing, strength, WindSource::Neighbor)
    }

    pub fn pressure(bearing: f64, strength: f64) -> Self {
        Self::new(bearing, strength, WindSource::Pressure)
    }

    pub fn to_vector(&self) -> (f64, f64) {
        let radians = self.bearing.to_radians();
        (self.strength * radians.cos(), self.strength * radians.sin())
    }

    /// Bearing and strength rounded for change detection
    pub fn rounded(&self) -> (i64, i64) {
        (
            (self.bearing * 100.0).round() as i64,
            (self.strength * 100.0).round() as i64,
        )
    }
}

/// Vector-sum measures into a single combined measure.
///
/// Measures that all share one bearing are summed directly so a uniform
/// wind keeps its exact bearing.
pub fn combine_wind(wind: &[WindMeasure]) -> WindMeasure {
    let Some(first) = wind.first() else {
        return WindMeasure::new(0.0, 0.0, WindSource::Combined);
    };
    if wind.iter().all(|w| w.bearing == first.bearing) {
        let strength = wind.iter().map(|w| w.strength).sum();
        return WindMeasure::new(first.bearing, strength, WindSource::Combined);
    }

    let (x, y) = wind.iter().fold((0.0, 0.0), |(x, y), w| {
        let (wx, wy) = w.to_vector();
        (x + wx, y + wy)
    });
    WindMeasure::new(y.atan2(x).to_degrees(), x.hypot(y), WindSource::Combined)
}

/// Split a bearing between the two bracketing sector boundaries.
///
/// Returns `(boundary_degrees, share)` pairs; an exact match yields a
/// single pair with share 1.0. Used with 60° sectors for hex edges and
/// 90° sectors for compass sides.
pub fn split_bearing(degrees: f64, sector: f64) -> Vec<(f64, f64)> {
    let degrees = normalize_degrees(degrees);
    let lower = (degrees / sector).floor() * sector;
    let offset = degrees - lower;
    if offset.abs() < 1e-9 {
        return vec![(normalize_degrees(lower), 1.0)];
    }
    let upper_share = offset / sector;
    vec![
        (normalize_degrees(lower), 1.0 - upper_share),
        (normalize_degrees(lower + sector), upper_share),
    ]
}

/// Share of a wind measure crossing each hex edge, indexed by bearing
pub fn neighbor_strengths(measure: &WindMeasure) -> [f64; 6] {
    let mut shares = [0.0; 6];
    for (degrees, share) in split_bearing(measure.bearing, 60.0) {
        shares[Bearing::nearest(degrees).index()] += share * measure.strength;
    }
    shares
}

// =============================================================================
// DIRECTIONAL IO
// =============================================================================

/// Bucket key: adjustments never merge with ordinary contributions
type BucketKey = (bool, i64);

#[derive(Debug, Clone, PartialEq)]
struct Bucket {
    total: WindMeasure,
    raw: Vec<WindMeasure>,
}

/// Per-bearing wind accumulator.
///
/// Contributions landing on the same whole-degree bearing sum their
/// strengths; the raw contributions are kept for equality checks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectionalIo {
    buckets: BTreeMap<BucketKey, Bucket>,
}

impl DirectionalIo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, measure: WindMeasure) {
        let key = (measure.source.is_adjustment(), measure.bearing.round() as i64 % 360);
        self.buckets
            .entry(key)
            .and_modify(|bucket| {
                bucket.total.strength += measure.strength;
                bucket.raw.push(measure);
            })
            .or_insert_with(|| Bucket {
                total: measure,
                raw: vec![measure],
            });
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    /// Summed measure per bucket, in bearing order
    pub fn measures(&self) -> impl Iterator<Item = &WindMeasure> {
        self.buckets.values().map(|b| &b.total)
    }

    /// Every contribution as it was added
    pub fn raw(&self) -> impl Iterator<Item = &WindMeasure> {
        self.buckets.values().flat_map(|b| b.raw.iter())
    }

    /// Vector sum of every bucket
    pub fn total(&self) -> WindMeasure {
        let measures: Vec<WindMeasure> = self.measures().copied().collect();
        combine_wind(&measures)
    }

    pub fn magnitude(&self) -> f64 {
        self.total().strength
    }

    /// Strength-weighted mean bearing, measured around the first bucket so
    /// bearings either side of 0° average correctly.
    pub fn averaged_degrees(&self) -> f64 {
        let mut measures = self.measures();
        let Some(reference) = measures.next() else {
            return 0.0;
        };
        let mut weighted = 0.0;
        let mut weight = reference.strength;
        for m in measures {
            let offset = (m.bearing - reference.bearing + 180.0).rem_euclid(360.0) - 180.0;
            weighted += offset * m.strength;
            weight += m.strength;
        }
        if weight == 0.0 {
            return reference.bearing;
        }
        normalize_degrees(reference.bearing + weighted / weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rounded_shares(measure: WindMeasure) -> [f64; 6] {
        neighbor_strengths(&measure).map(|s| (s * 100.0).round() / 100.0)
    }

    fn expected(pairs: &[(usize, f64)]) -> [f64; 6] {
        let mut res = [0.0; 6];
        for &(index, strength) in pairs {
            res[index] = (strength * 100.0).round() / 100.0;
        }
        res
    }

    #[test]
    fn test_single_edge_gets_full_strength() {
        for index in 0..6 {
            let m = WindMeasure::neighbor(index as f64 * 60.0, 8.2);
            assert_eq!(rounded_shares(m), expected(&[(index, 8.2)]), "bearing {}", index * 60);
        }
    }

    #[test]
    fn test_midway_bearing_splits_evenly() {
        assert_eq!(rounded_shares(WindMeasure::neighbor(30.0, 8.2)), expected(&[(0, 4.1), (1, 4.1)]));
        assert_eq!(rounded_shares(WindMeasure::neighbor(90.0, 8.2)), expected(&[(1, 4.1), (2, 4.1)]));
        assert_eq!(rounded_shares(WindMeasure::neighbor(330.0, 8.2)), expected(&[(5, 4.1), (0, 4.1)]));
    }

    #[test]
    fn test_uneven_bearing_splits_linearly() {
        assert_eq!(
            rounded_shares(WindMeasure::neighbor(45.0, 8.2)),
            expected(&[(0, 15.0 / 60.0 * 8.2), (1, 45.0 / 60.0 * 8.2)])
        );
        assert_eq!(
            rounded_shares(WindMeasure::neighbor(22.0, 8.2)),
            expected(&[(0, 38.0 / 60.0 * 8.2), (1, 22.0 / 60.0 * 8.2)])
        );
        assert_eq!(
            rounded_shares(WindMeasure::neighbor(123.0, 8.2)),
            expected(&[(2, 57.0 / 60.0 * 8.2), (3, 3.0 / 60.0 * 8.2)])
        );
    }

    #[test]
    fn test_compass_split() {
        let shares = split_bearing(300.0, 90.0);
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].0, 270.0);
        assert!((shares[0].1 - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(shares[1].0, 0.0);
        assert_eq!(split_bearing(270.0, 90.0), vec![(270.0, 1.0)]);
    }

    #[test]
    fn test_combine_wind_vector_sum() {
        let result = combine_wind(&[WindMeasure::neighbor(0.0, 10.0), WindMeasure::neighbor(10.0, 10.0)]);
        assert!((result.bearing - 5.0).abs() < 0.01, "bearing {}", result.bearing);
        assert!(result.strength < 20.0);
        assert!((result.strength - 20.0).abs() < 0.5);
    }

    #[test]
    fn test_combine_single_bearing_is_exact() {
        let result = combine_wind(&[WindMeasure::neighbor(320.0, 8.2)]);
        assert_eq!(result.bearing, 320.0);
        assert_eq!(result.strength, 8.2);
    }

    #[test]
    fn test_averaged_degrees() {
        let cases = [
            ((30.0, 10.0), (50.0, 10.0), 40.0),
            ((30.0, 30.0), (50.0, 10.0), 35.0),
            ((350.0, 10.0), (10.0, 10.0), 0.0),
            ((190.0, 10.0), (170.0, 10.0), 180.0),
        ];
        for ((b1, s1), (b2, s2), want) in cases {
            let mut io = DirectionalIo::new();
            io.add(WindMeasure::neighbor(b1, s1));
            io.add(WindMeasure::neighbor(b2, s2));
            let avg = io.averaged_degrees();
            assert!((avg - want).abs() < 1e-9, "{} & {} averaged to {}", b1, b2, avg);
        }
    }

    #[test]
    fn test_buckets_merge_same_bearing() {
        let mut io = DirectionalIo::new();
        io.add(WindMeasure::neighbor(90.0, 4.1));
        io.add(WindMeasure::neighbor(90.0, 4.1));
        io.add(WindMeasure::pressure(90.0, 1.0));

        let buckets: Vec<&WindMeasure> = io.measures().collect();
        assert_eq!(buckets.len(), 2, "adjustments keep their own bucket");
        assert!((buckets[0].strength - 8.2).abs() < 1e-12);
        assert_eq!(io.raw().count(), 3);
    }
}
