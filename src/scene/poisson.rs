//! Poisson-disk sampling (Bridson's active-list algorithm).
//!
//! Points already placed by earlier stages are inserted as blockers: new
//! samples keep the minimum separation from them too, but blockers never
//! become active points themselves.

use rand::Rng;
use std::collections::HashMap;

use crate::geometry::{is_excluded, random_angle, Point, Rect};

/// Background acceleration grid with cell size r / sqrt(2). Cells are
/// buckets because blockers are not guaranteed to be separated. Only
/// occupied cells are stored, so memory follows the sample count rather
/// than the bounds area.
struct SampleGrid {
    origin: Point,
    cell: f32,
    buckets: HashMap<(i64, i64), Vec<Point>>,
}

impl SampleGrid {
    fn new(bounds: &Rect, min_dist: f32) -> Self {
        Self {
            origin: Point::new(bounds.x, bounds.y),
            cell: min_dist / std::f32::consts::SQRT_2,
            buckets: HashMap::new(),
        }
    }

    fn cell_of(&self, p: Point) -> (i64, i64) {
        let cx = ((p.x - self.origin.x) / self.cell).floor() as i64;
        let cy = ((p.y - self.origin.y) / self.cell).floor() as i64;
        (cx, cy)
    }

    fn insert(&mut self, p: Point) {
        let key = self.cell_of(p);
        self.buckets.entry(key).or_default().push(p);
    }

    /// True when no stored point lies closer than `min_dist`
    fn is_far_enough(&self, p: Point, min_dist: f32) -> bool {
        let (cx, cy) = self.cell_of(p);
        let reach = (min_dist / self.cell).ceil() as i64;
        let min_sq = min_dist * min_dist;
        for y in cy - reach..=cy + reach {
            for x in cx - reach..=cx + reach {
                let Some(bucket) = self.buckets.get(&(x, y)) else {
                    continue;
                };
                if bucket.iter().any(|q| q.distance_squared(p) < min_sq) {
                    return false;
                }
            }
        }
        true
    }
}

/// Sampling parameters
#[derive(Debug, Clone, Copy)]
pub struct PoissonParams {
    pub min_dist: f32,
    /// Candidates per active point before it retires
    pub candidates: u32,
    /// Attempts to find the first seed point
    pub seed_attempts: u32,
}

/// Draw up to `max_points` samples inside `bounds`, outside every exclusion
/// region, at least `min_dist` from each other and from every blocker.
/// May return fewer points when the domain saturates.
pub fn sample<R: Rng + ?Sized>(
    bounds: &Rect,
    exclusions: &[Rect],
    blockers: &[Point],
    params: PoissonParams,
    max_points: usize,
    rng: &mut R,
) -> Vec<Point> {
    if bounds.is_empty() || max_points == 0 || params.min_dist <= 0.0 {
        return Vec::new();
    }

    let mut grid = SampleGrid::new(bounds, params.min_dist);
    for b in blockers.iter().filter(|b| bounds.contains(**b)) {
        grid.insert(*b);
    }

    let valid = |grid: &SampleGrid, p: Point| {
        bounds.contains(p) && !is_excluded(p, exclusions) && grid.is_far_enough(p, params.min_dist)
    };

    let mut samples = Vec::with_capacity(max_points);
    let mut active: Vec<Point> = Vec::new();

    for _ in 0..params.seed_attempts {
        let p = bounds.random_point(rng);
        if valid(&grid, p) {
            grid.insert(p);
            samples.push(p);
            active.push(p);
            break;
        }
    }

    while !active.is_empty() && samples.len() < max_points {
        let idx = rng.gen_range(0..active.len());
        let center = active[idx];
        let mut found = None;
        for _ in 0..params.candidates {
            let radius = params.min_dist * (1.0 + rng.gen::<f32>());
            let candidate = center.polar_offset(random_angle(rng), radius);
            if valid(&grid, candidate) {
                found = Some(candidate);
                break;
            }
        }
        match found {
            Some(p) => {
                grid.insert(p);
                samples.push(p);
                active.push(p);
            }
            None => {
                active.swap_remove(idx);
            }
        }
    }

    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::{RngStream, SessionSeed};

    fn params() -> PoissonParams {
        PoissonParams {
            min_dist: 32.0,
            candidates: 30,
            seed_attempts: 100,
        }
    }

    #[test]
    fn test_minimum_separation() {
        let mut rng = SessionSeed::new(1).rng(RngStream::Composer);
        let bounds = Rect::new(0.0, 0.0, 640.0, 480.0);
        let points = sample(&bounds, &[], &[], params(), 200, &mut rng);
        assert!(points.len() > 50, "Expected a dense fill, got {}", points.len());
        for (i, a) in points.iter().enumerate() {
            assert!(bounds.contains(*a));
            for b in &points[i + 1..] {
                assert!(a.distance(*b) >= 32.0 - 1e-3);
            }
        }
    }

    #[test]
    fn test_respects_blockers_and_exclusions() {
        let mut rng = SessionSeed::new(2).rng(RngStream::Composer);
        let bounds = Rect::new(0.0, 0.0, 400.0, 400.0);
        let exclusion = Rect::new(100.0, 100.0, 200.0, 200.0);
        let blockers = vec![Point::new(50.0, 50.0), Point::new(350.0, 350.0)];
        let points = sample(&bounds, &[exclusion], &blockers, params(), 500, &mut rng);
        for p in &points {
            assert!(!exclusion.contains(*p));
            for b in &blockers {
                assert!(p.distance(*b) >= 32.0 - 1e-3);
            }
        }
    }

    #[test]
    fn test_saturation_returns_fewer() {
        let mut rng = SessionSeed::new(3).rng(RngStream::Composer);
        let bounds = Rect::new(0.0, 0.0, 64.0, 64.0);
        let points = sample(&bounds, &[], &[], params(), 1000, &mut rng);
        assert!(!points.is_empty());
        assert!(points.len() < 20);
    }

    #[test]
    fn test_empty_inputs() {
        let mut rng = SessionSeed::new(4).rng(RngStream::Composer);
        assert!(sample(&Rect::default(), &[], &[], params(), 10, &mut rng).is_empty());
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!(sample(&bounds, &[], &[], params(), 0, &mut rng).is_empty());
    }

    #[test]
    fn test_huge_bounds_stay_sparse() {
        let mut rng = SessionSeed::new(6).rng(RngStream::Composer);
        let bounds = Rect::new(0.0, 0.0, 1.0e9, 1.0e9);
        let blockers = vec![Point::new(5.0e8, 5.0e8)];
        let points = sample(&bounds, &[], &blockers, params(), 60, &mut rng);
        assert_eq!(points.len(), 60);
        for (i, a) in points.iter().enumerate() {
            assert!(bounds.contains(*a));
            for b in &points[i + 1..] {
                assert!(a.distance(*b) >= 32.0 - 1e-3);
            }
        }
    }

    #[test]
    fn test_fully_excluded_domain() {
        let mut rng = SessionSeed::new(5).rng(RngStream::Composer);
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        let points = sample(&bounds, &[bounds], &[], params(), 10, &mut rng);
        assert!(points.is_empty());
    }
}
