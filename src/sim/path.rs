//! Integer polyline geometry
//!
//! Paths are what the player draws: ordered integer points, simplified at
//! activation time and encoded as successive deltas for level storage.

use std::fmt;
use std::str::FromStr;

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Axis-aligned integer rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub min: IVec2,
    pub max: IVec2,
}

impl Rect {
    pub fn new(min: IVec2, max: IVec2) -> Self {
        Self { min, max }
    }

    /// Rect spanning two arbitrary corners
    pub fn order(a: IVec2, b: IVec2) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn width(&self) -> i32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> i32 {
        self.max.y - self.min.y
    }

    pub fn centroid(&self) -> IVec2 {
        (self.min + self.max) / 2
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x as f32
            && p.x <= self.max.x as f32
            && p.y >= self.min.y as f32
            && p.y <= self.max.y as f32
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        other.min.x <= self.max.x
            && other.min.y <= self.max.y
            && other.max.x >= self.min.x
            && other.max.y >= self.min.y
    }

    /// Overlap test against a float AABB (physics body bounds)
    pub fn intersects_aabb(&self, min: Vec2, max: Vec2) -> bool {
        min.x <= self.max.x as f32
            && min.y <= self.max.y as f32
            && max.x >= self.min.x as f32
            && max.y >= self.min.y as f32
    }

    pub fn expand(&mut self, p: IVec2) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn grow(&mut self, by: i32) {
        self.min -= IVec2::splat(by);
        self.max += IVec2::splat(by);
    }
}

/// An ordered sequence of 2D integer points
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Path {
    points: Vec<IVec2>,
}

impl Path {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Seed a new draft path with its first point
    pub fn from_point(p: IVec2) -> Self {
        Self { points: vec![p] }
    }

    pub fn from_points(points: Vec<IVec2>) -> Self {
        Self { points }
    }

    pub fn push(&mut self, p: IVec2) {
        self.points.push(p);
    }

    pub fn points(&self) -> &[IVec2] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<IVec2> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<IVec2> {
        self.points.last().copied()
    }

    /// Number of points distinct from the first; a simulatable path needs
    /// at least 2 distinct points in total
    pub fn has_extent(&self) -> bool {
        self.points
            .first()
            .map(|&f| self.points.iter().any(|&p| p != f))
            .unwrap_or(false)
    }

    /// Total polyline length
    pub fn length(&self) -> f32 {
        self.points
            .windows(2)
            .map(|w| (w[1] - w[0]).as_vec2().length())
            .sum()
    }

    /// Tight bounding box over all points
    pub fn bbox(&self) -> Rect {
        let mut iter = self.points.iter();
        let first = match iter.next() {
            Some(&p) => p,
            None => return Rect::default(),
        };
        let mut rect = Rect::new(first, first);
        for &p in iter {
            rect.expand(p);
        }
        rect
    }

    pub fn translate(&mut self, d: IVec2) {
        for p in &mut self.points {
            *p += d;
        }
    }

    pub fn scale(&mut self, factor: f32) {
        for p in &mut self.points {
            *p = (p.as_vec2() * factor).round().as_ivec2();
        }
    }

    /// Rotate about the origin
    pub fn rotate(&mut self, radians: f32) {
        let (sin, cos) = radians.sin_cos();
        for p in &mut self.points {
            let v = p.as_vec2();
            *p = Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
                .round()
                .as_ivec2();
        }
    }

    /// Douglas-Peucker reduction. Endpoints are always retained; interior
    /// points are dropped while their perpendicular deviation from the chord
    /// between retained neighbours stays below `tolerance`.
    pub fn simplify(&mut self, tolerance: f32) {
        let n = self.points.len();
        if n < 3 {
            return;
        }
        let mut keep = vec![false; n];
        keep[0] = true;
        keep[n - 1] = true;

        let mut spans = vec![(0usize, n - 1)];
        while let Some((a, b)) = spans.pop() {
            if b <= a + 1 {
                continue;
            }
            let mut far_idx = a;
            let mut far_dist = 0.0f32;
            for i in a + 1..b {
                let d = segment_distance(
                    self.points[i].as_vec2(),
                    self.points[a].as_vec2(),
                    self.points[b].as_vec2(),
                );
                if d > far_dist {
                    far_dist = d;
                    far_idx = i;
                }
            }
            if far_dist > tolerance {
                keep[far_idx] = true;
                spans.push((a, far_idx));
                spans.push((far_idx, b));
            }
        }

        let mut i = 0;
        self.points.retain(|_| {
            let k = keep[i];
            i += 1;
            k
        });
        self.dedup();
    }

    /// Drop consecutive duplicate points
    pub fn dedup(&mut self) {
        self.points.dedup();
    }

    /// Re-encode points as successive deltas (first point stays absolute).
    /// Lossless inverse of [`Path::make_absolute`].
    pub fn make_relative(&mut self) {
        for i in (1..self.points.len()).rev() {
            let prev = self.points[i - 1];
            self.points[i] -= prev;
        }
    }

    /// Decode successive deltas back into absolute points
    pub fn make_absolute(&mut self) {
        for i in 1..self.points.len() {
            let prev = self.points[i - 1];
            self.points[i] += prev;
        }
    }

    /// Compact storage form: relative-encoded point list
    pub fn to_relative_string(&self) -> String {
        let mut copy = self.clone();
        copy.make_relative();
        copy.to_string()
    }

    /// Parse the compact storage form produced by [`Path::to_relative_string`]
    pub fn from_relative_str(s: &str) -> Result<Self, Error> {
        let mut path: Path = s.parse()?;
        path.make_absolute();
        Ok(path)
    }

    /// Nearest point on any edge to `p`, with its distance. Single-point
    /// paths degenerate to the vertex itself.
    pub fn closest_point(&self, p: Vec2) -> Option<(Vec2, f32)> {
        if self.points.is_empty() {
            return None;
        }
        if self.points.len() == 1 {
            let v = self.points[0].as_vec2();
            return Some((v, (p - v).length()));
        }
        let mut best: Option<(Vec2, f32)> = None;
        for w in self.points.windows(2) {
            let (q, d) = project_on_segment(p, w[0].as_vec2(), w[1].as_vec2());
            if best.map(|(_, bd)| d < bd).unwrap_or(true) {
                best = Some((q, d));
            }
        }
        best
    }

    /// Smallest distance from `p` to any vertex (broad-phase joint test)
    pub fn vertex_distance(&self, p: Vec2) -> Option<f32> {
        self.points
            .iter()
            .map(|&v| (p - v.as_vec2()).length())
            .min_by(|a, b| a.total_cmp(b))
    }
}

/// Closest point on segment `ab` to `p` and the distance to it
pub fn project_on_segment(p: Vec2, a: Vec2, b: Vec2) -> (Vec2, f32) {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 1e-6 {
        return (a, (p - a).length());
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    let q = a + ab * t;
    (q, (p - q).length())
}

/// Distance from `p` to segment `ab`
pub fn segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    project_on_segment(p, a, b).1
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, p) in self.points.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{},{}", p.x, p.y)?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut points = Vec::new();
        for pair in s.split_whitespace() {
            let (x, y) = pair
                .split_once(',')
                .ok_or_else(|| Error::Load(format!("bad path point {:?}", pair)))?;
            let x = x
                .parse::<i32>()
                .map_err(|_| Error::Load(format!("bad path coordinate {:?}", x)))?;
            let y = y
                .parse::<i32>()
                .map_err(|_| Error::Load(format!("bad path coordinate {:?}", y)))?;
            points.push(IVec2::new(x, y));
        }
        Ok(Path { points })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn path(points: &[(i32, i32)]) -> Path {
        Path::from_points(points.iter().map(|&(x, y)| IVec2::new(x, y)).collect())
    }

    #[test]
    fn test_simplify_collinear() {
        let mut p = path(&[(0, 0), (10, 0), (20, 0), (30, 0)]);
        p.simplify(1.0);
        assert_eq!(p.points(), &[IVec2::new(0, 0), IVec2::new(30, 0)]);
    }

    #[test]
    fn test_simplify_keeps_corner() {
        let mut p = path(&[(0, 0), (10, 0), (20, 0), (20, 10), (20, 20)]);
        p.simplify(1.0);
        assert_eq!(
            p.points(),
            &[IVec2::new(0, 0), IVec2::new(20, 0), IVec2::new(20, 20)]
        );
    }

    #[test]
    fn test_simplify_below_tolerance_noise() {
        // 1px wobble on a straight line vanishes at tolerance 2
        let mut p = path(&[(0, 0), (10, 1), (20, 0), (30, 1), (40, 0)]);
        p.simplify(2.0);
        assert_eq!(p.points(), &[IVec2::new(0, 0), IVec2::new(40, 0)]);
    }

    #[test]
    fn test_bbox() {
        let p = path(&[(3, 7), (-2, 9), (5, 1)]);
        let r = p.bbox();
        assert_eq!(r.min, IVec2::new(-2, 1));
        assert_eq!(r.max, IVec2::new(5, 9));
    }

    #[test]
    fn test_transforms_compose() {
        let mut p = path(&[(10, 0)]);
        p.scale(2.0);
        p.rotate(std::f32::consts::FRAC_PI_2);
        p.translate(IVec2::new(5, 5));
        assert_eq!(p.points(), &[IVec2::new(5, 25)]);
    }

    #[test]
    fn test_relative_roundtrip() {
        let original = path(&[(282, 39), (280, 38), (285, 41)]);
        let encoded = original.to_relative_string();
        assert_eq!(encoded, "282,39 -2,-1 5,3");
        let decoded = Path::from_relative_str(&encoded).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("1,2 nope".parse::<Path>().is_err());
        assert!("1;2".parse::<Path>().is_err());
    }

    #[test]
    fn test_closest_point_on_edge() {
        let p = path(&[(0, 0), (100, 0)]);
        let (q, d) = p.closest_point(Vec2::new(50.0, 10.0)).unwrap();
        assert!((q - Vec2::new(50.0, 0.0)).length() < 1e-4);
        assert!((d - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_has_extent() {
        assert!(!path(&[]).has_extent());
        assert!(!path(&[(5, 5)]).has_extent());
        assert!(!path(&[(5, 5), (5, 5)]).has_extent());
        assert!(path(&[(5, 5), (6, 5)]).has_extent());
    }

    proptest! {
        #[test]
        fn prop_relative_encoding_is_lossless(
            pts in prop::collection::vec((-2000i32..2000, -2000i32..2000), 1..64)
        ) {
            let original = Path::from_points(
                pts.iter().map(|&(x, y)| IVec2::new(x, y)).collect(),
            );
            let decoded = Path::from_relative_str(&original.to_relative_string()).unwrap();
            prop_assert_eq!(decoded, original);
        }

        #[test]
        fn prop_simplify_preserves_endpoints(
            pts in prop::collection::vec((-500i32..500, -500i32..500), 2..32),
            tol in 0.5f32..8.0
        ) {
            let mut p = Path::from_points(
                pts.iter().map(|&(x, y)| IVec2::new(x, y)).collect(),
            );
            let first = p.first().unwrap();
            let last = p.last().unwrap();
            p.simplify(tol);
            prop_assert_eq!(p.first().unwrap(), first);
            prop_assert_eq!(p.last().unwrap(), last);
        }
    }
}
