use serde::{Deserialize, Serialize};

/// A point in diagram space. Y grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub(crate) fn approx_eq(self, other: Point) -> bool {
        (self.x - other.x).abs() <= 1e-4 && (self.y - other.y).abs() <= 1e-4
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathKind {
    Line,
    Polyline,
    Bezier,
    Arc,
}

/// A computed connector path.
///
/// `points` always starts at the source attachment and ends at the target
/// attachment. Bezier paths carry exactly two control points; arc paths carry
/// the arc center and radius. `corner_radius` is a rendering hint copied from
/// the routing options and never used by the geometry here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    #[serde(rename = "type")]
    pub kind: PathKind,
    pub points: Vec<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_points: Option<[Point; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f32>,
}

impl Path {
    pub fn line(from: Point, to: Point) -> Self {
        Self::with_points(PathKind::Line, vec![from, to])
    }

    pub fn polyline(points: Vec<Point>) -> Self {
        Self::with_points(PathKind::Polyline, points)
    }

    pub fn bezier(from: Point, to: Point, controls: [Point; 2]) -> Self {
        Self {
            control_points: Some(controls),
            ..Self::with_points(PathKind::Bezier, vec![from, to])
        }
    }

    pub fn arc(from: Point, to: Point, center: Point, radius: f32) -> Self {
        Self {
            center: Some(center),
            radius: Some(radius.max(0.0)),
            ..Self::with_points(PathKind::Arc, vec![from, to])
        }
    }

    pub fn with_corner_radius(mut self, corner_radius: Option<f32>) -> Self {
        self.corner_radius = corner_radius.map(|r| r.max(0.0));
        self
    }

    fn with_points(kind: PathKind, points: Vec<Point>) -> Self {
        Self {
            kind,
            points,
            control_points: None,
            center: None,
            radius: None,
            corner_radius: None,
        }
    }

    pub fn start(&self) -> Option<Point> {
        self.points.first().copied()
    }

    pub fn end(&self) -> Option<Point> {
        self.points.last().copied()
    }
}

/// Border attachment points chosen for one connection by port assignment.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Ports {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Point>,
}

impl Ports {
    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

/// Ports for every connection of a layout, indexed like `Layout::connections`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortAssignments {
    ports: Vec<Ports>,
}

impl PortAssignments {
    pub fn with_len(len: usize) -> Self {
        Self {
            ports: vec![Ports::default(); len],
        }
    }

    pub fn get(&self, connection_idx: usize) -> Ports {
        self.ports.get(connection_idx).copied().unwrap_or_default()
    }

    pub(crate) fn set(&mut self, connection_idx: usize, is_from: bool, point: Point) {
        if connection_idx >= self.ports.len() {
            self.ports.resize(connection_idx + 1, Ports::default());
        }
        let slot = &mut self.ports[connection_idx];
        if is_from {
            slot.from = Some(point);
        } else {
            slot.to = Some(point);
        }
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

/// Axis-aligned box, optionally tagged with the element it stands for.
#[derive(Debug, Clone, PartialEq)]
pub struct Rect {
    pub owner: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(owner: impl Into<String>, x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            owner: owner.into(),
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn inflate(&self, margin: f32) -> Rect {
        Rect::new(
            self.owner.clone(),
            self.x - margin,
            self.y - margin,
            self.width + margin * 2.0,
            self.height + margin * 2.0,
        )
    }

    /// True when `p` lies in the open interior (boundary excluded).
    pub fn contains_strict(&self, p: Point) -> bool {
        p.x > self.x && p.x < self.right() && p.y > self.y && p.y < self.bottom()
    }
}

pub fn path_length(points: &[Point]) -> f32 {
    points.windows(2).map(|seg| seg[0].distance(seg[1])).sum()
}

pub fn path_bend_count(points: &[Point]) -> usize {
    if points.len() < 3 {
        return 0;
    }
    let mut bends = 0usize;
    for idx in 1..points.len() - 1 {
        let p0 = points[idx - 1];
        let p1 = points[idx];
        let p2 = points[idx + 1];
        let dx1 = p1.x - p0.x;
        let dy1 = p1.y - p0.y;
        let dx2 = p2.x - p1.x;
        let dy2 = p2.y - p1.y;
        if (dx1.abs() <= 1e-4 && dy1.abs() <= 1e-4) || (dx2.abs() <= 1e-4 && dy2.abs() <= 1e-4) {
            continue;
        }
        let cross = dx1 * dy2 - dy1 * dx2;
        if cross.abs() > 1e-4 {
            bends += 1;
        }
    }
    bends
}
