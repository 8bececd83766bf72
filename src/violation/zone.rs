//! Region-of-interest polygons and directed crossing lines.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::tracker::Rect;

pub type Point = (f32, f32);

/// Closed polygon, fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Point>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point>) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(Error::InvalidZone(format!(
                "polygon needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }
        Ok(Self { vertices })
    }

    /// Build from integer `[x, y]` pairs as stored in zone files.
    pub fn from_points(points: &[[i32; 2]]) -> Result<Self> {
        Self::new(points.iter().map(|p| (p[0] as f32, p[1] as f32)).collect())
    }

    /// Centered rectangle covering the middle half of a frame.
    pub fn default_quadrant(width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self {
            vertices: vec![
                (w / 4.0, h / 4.0),
                (w * 3.0 / 4.0, h / 4.0),
                (w * 3.0 / 4.0, h * 3.0 / 4.0),
                (w / 4.0, h * 3.0 / 4.0),
            ],
        }
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    /// Even-odd containment test; points on an edge count as inside.
    pub fn contains(&self, point: Point) -> bool {
        let (px, py) = point;
        let n = self.vertices.len();
        let mut inside = false;

        let mut j = n - 1;
        for i in 0..n {
            let (xi, yi) = self.vertices[i];
            let (xj, yj) = self.vertices[j];

            if on_segment((xj, yj), (xi, yi), point) {
                return true;
            }

            if (yi > py) != (yj > py) {
                let x_at = xi + (py - yi) * (xj - xi) / (yj - yi);
                if px < x_at {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Whether the box center lies in the polygon.
    pub fn contains_rect(&self, rect: &Rect) -> bool {
        self.contains(rect.center())
    }
}

fn cross(o: Point, a: Point, b: Point) -> f32 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    const EPS: f32 = 1e-4;
    cross(a, b, p).abs() <= EPS
        && p.0 >= a.0.min(b.0) - EPS
        && p.0 <= a.0.max(b.0) + EPS
        && p.1 >= a.1.min(b.1) - EPS
        && p.1 <= a.1.max(b.1) + EPS
}

/// Directed segment from `start` to `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub start: Point,
    pub end: Point,
}

impl LineSegment {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// True when `p` lies strictly left of the direction of travel
    /// (positive cross product).
    pub fn side(&self, p: Point) -> bool {
        cross(self.start, self.end, p) > 0.0
    }

    /// Whether `p` projects onto the segment rather than its extension.
    pub fn within_span(&self, p: Point) -> bool {
        let d = (self.end.0 - self.start.0, self.end.1 - self.start.1);
        let v = (p.0 - self.start.0, p.1 - self.start.1);
        let dot = d.0 * v.0 + d.1 * v.1;
        let len2 = d.0 * d.0 + d.1 * d.1;
        len2 > 0.0 && (0.0..=len2).contains(&dot)
    }
}

/// Direction of a detected crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    /// From the right-hand side to the left-hand side of the segment.
    In,
    Out,
}

/// A segment plus the last observed side of each track.
///
/// A box is placed on a side only when both its center-left and center-right
/// anchors project onto the segment and agree; a change of side between two
/// such observations is a crossing.
#[derive(Debug, Clone)]
pub struct LineZone {
    segment: LineSegment,
    last_side: HashMap<u64, bool>,
}

impl LineZone {
    pub fn new(segment: LineSegment) -> Self {
        Self {
            segment,
            last_side: HashMap::new(),
        }
    }

    pub fn segment(&self) -> &LineSegment {
        &self.segment
    }

    pub fn trigger(&mut self, track_id: u64, rect: &Rect) -> Option<Crossing> {
        let anchors = [rect.center_left(), rect.center_right()];
        if !anchors.iter().all(|&a| self.segment.within_span(a)) {
            return None;
        }

        let sides = anchors.map(|a| self.segment.side(a));
        if sides[0] != sides[1] {
            return None;
        }
        let side = sides[0];

        match self.last_side.insert(track_id, side) {
            Some(previous) if previous != side => Some(if side {
                Crossing::In
            } else {
                Crossing::Out
            }),
            _ => None,
        }
    }

    /// Forget a track that will never be evaluated again.
    pub fn forget(&mut self, track_id: u64) {
        self.last_side.remove(&track_id);
    }
}

/// Named line categories understood by the red-light rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineCategory {
    #[serde(rename = "violation_lines")]
    Violation,
    #[serde(rename = "special_violation_lines")]
    SpecialViolation,
    #[serde(rename = "left_exception_lines")]
    LeftException,
    #[serde(rename = "right_exception_lines")]
    RightException,
    #[serde(rename = "other_exception_lines")]
    OtherException,
}

impl LineCategory {
    pub const ALL: [LineCategory; 5] = [
        LineCategory::Violation,
        LineCategory::SpecialViolation,
        LineCategory::LeftException,
        LineCategory::RightException,
        LineCategory::OtherException,
    ];

    pub fn key(self) -> &'static str {
        match self {
            LineCategory::Violation => "violation_lines",
            LineCategory::SpecialViolation => "special_violation_lines",
            LineCategory::LeftException => "left_exception_lines",
            LineCategory::RightException => "right_exception_lines",
            LineCategory::OtherException => "other_exception_lines",
        }
    }
}

/// Zero or more line zones tested together.
#[derive(Debug, Clone, Default)]
pub struct LineSet {
    zones: Vec<LineZone>,
}

impl LineSet {
    pub fn push(&mut self, segment: LineSegment) {
        self.zones.push(LineZone::new(segment));
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// True if the box crossed any segment this frame. Every segment sees
    /// the box, so each keeps its own side memory current.
    pub fn trigger(&mut self, track_id: u64, rect: &Rect) -> bool {
        self.zones
            .iter_mut()
            .fold(false, |crossed, zone| zone.trigger(track_id, rect).is_some() || crossed)
    }

    pub fn forget(&mut self, track_id: u64) {
        for zone in &mut self.zones {
            zone.forget(track_id);
        }
    }
}

/// Pair up a flat `[x, y]` list into segments.
///
/// Odd-length lists are a configuration error.
pub fn segments_from_points(points: &[[i32; 2]]) -> Result<Vec<LineSegment>> {
    if points.len() % 2 != 0 {
        return Err(Error::InvalidZone(format!(
            "line points must come in pairs, got {}",
            points.len()
        )));
    }
    Ok(points
        .chunks_exact(2)
        .map(|pair| {
            LineSegment::new(
                (pair[0][0] as f32, pair[0][1] as f32),
                (pair[1][0] as f32, pair[1][1] as f32),
            )
        })
        .collect())
}
