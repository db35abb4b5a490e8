use crate::config::RouterConfig;
use crate::ir::{Connection, Element, ElementSizing, Layout, RoutingSpec, element_rect};

use super::geometry::{MIN_CHORD, chord_normal, connection_point};
use super::types::{Path, Point, Ports};

/// Everything a strategy may look at while computing one connection.
pub struct RouteContext<'a> {
    pub from: &'a Element,
    pub to: &'a Element,
    pub connection: &'a Connection,
    pub spec: &'a RoutingSpec,
    pub layout: &'a Layout,
    pub sizing: &'a dyn ElementSizing,
    pub ports: Ports,
    pub config: &'a RouterConfig,
}

impl RouteContext<'_> {
    pub fn is_self_loop(&self) -> bool {
        self.from.id == self.to.id
    }

    /// Source and target attachment points.
    ///
    /// Assigned ports win; otherwise each end attaches through the
    /// connection-point rule, aimed at the opposite element's center.
    pub fn endpoints(&self) -> (Point, Point) {
        let from_center = self.center_of(self.from);
        let to_center = self.center_of(self.to);
        let start = self.ports.from.unwrap_or_else(|| self.attach(self.from, to_center));
        let end = self.ports.to.unwrap_or_else(|| self.attach(self.to, from_center));
        (start, end)
    }

    pub(super) fn center_of(&self, element: &Element) -> Point {
        element_rect(element, self.sizing)
            .map(|rect| rect.center())
            .or(element.position)
            .unwrap_or_default()
    }

    fn attach(&self, element: &Element, far: Point) -> Point {
        connection_point(
            self.layout,
            element,
            far,
            self.sizing,
            self.config.orthogonal.border_extension,
        )
        .unwrap_or_else(|| self.center_of(element))
    }
}

/// A named way of turning a connection into a path.
pub trait RoutingStrategy {
    fn calculate_path(&self, ctx: &RouteContext<'_>) -> Path;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StraightStrategy;

impl RoutingStrategy for StraightStrategy {
    fn calculate_path(&self, ctx: &RouteContext<'_>) -> Path {
        let (start, end) = ctx.endpoints();
        Path::line(start, end)
    }
}

/// Fixed waypoints between the two attachments. The waypoints do not follow
/// the elements when they move.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualStrategy;

impl RoutingStrategy for ManualStrategy {
    fn calculate_path(&self, ctx: &RouteContext<'_>) -> Path {
        let (start, end) = ctx.endpoints();
        let mut points = Vec::with_capacity(ctx.spec.waypoints.len() + 2);
        points.push(start);
        points.extend(ctx.spec.waypoints.iter().copied());
        points.push(end);
        Path::polyline(points).with_corner_radius(ctx.spec.corner_radius)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BezierStrategy;

impl RoutingStrategy for BezierStrategy {
    fn calculate_path(&self, ctx: &RouteContext<'_>) -> Path {
        let (start, end) = ctx.endpoints();
        let curvature = ctx
            .spec
            .curvature
            .filter(|c| c.is_finite())
            .unwrap_or(ctx.config.curves.default_curvature)
            .clamp(0.0, 1.0);
        Path::bezier(start, end, bezier_controls(start, end, curvature))
    }
}

/// Controls at one and two thirds of the chord, pushed along its normal by
/// `chord * curvature / 2`.
pub(super) fn bezier_controls(start: Point, end: Point, curvature: f32) -> [Point; 2] {
    let Some((nx, ny)) = chord_normal(start, end) else {
        let mid = start.midpoint(end);
        return [mid, mid];
    };
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let offset = start.distance(end) * curvature * 0.5;
    let at = |t: f32| Point::new(start.x + dx * t + nx * offset, start.y + dy * t + ny * offset);
    [at(1.0 / 3.0), at(2.0 / 3.0)]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopSide {
    Top,
    Bottom,
    Left,
    Right,
}

impl LoopSide {
    fn parse(side: Option<&str>) -> Self {
        match side.map(str::to_ascii_lowercase).as_deref() {
            Some("bottom") => LoopSide::Bottom,
            Some("left") => LoopSide::Left,
            Some("right") => LoopSide::Right,
            _ => LoopSide::Top,
        }
    }

    fn outward(self) -> (f32, f32) {
        match self {
            LoopSide::Top => (0.0, -1.0),
            LoopSide::Bottom => (0.0, 1.0),
            LoopSide::Left => (-1.0, 0.0),
            LoopSide::Right => (1.0, 0.0),
        }
    }

    fn tangent(self) -> (f32, f32) {
        match self {
            LoopSide::Top | LoopSide::Bottom => (1.0, 0.0),
            LoopSide::Left | LoopSide::Right => (0.0, 1.0),
        }
    }
}

/// Where a self-loop leaves and re-enters its element, and which way is out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct LoopAnchors {
    pub(super) start: Point,
    pub(super) end: Point,
    /// Midpoint of the chosen side.
    pub(super) mid: Point,
    pub(super) outward: (f32, f32),
}

impl LoopAnchors {
    pub(super) fn offset(&self, point: Point, distance: f32) -> Point {
        Point::new(
            point.x + self.outward.0 * distance,
            point.y + self.outward.1 * distance,
        )
    }
}

/// Anchors on the side named by `routing.side` (top by default), spread
/// symmetrically about the side midpoint.
pub(super) fn loop_anchors(ctx: &RouteContext<'_>) -> LoopAnchors {
    let side = LoopSide::parse(ctx.spec.side.as_deref());
    let center = ctx.center_of(ctx.from);
    let (half_w, half_h) = element_rect(ctx.from, ctx.sizing)
        .map(|rect| (rect.width / 2.0, rect.height / 2.0))
        .unwrap_or_default();
    let mid = match side {
        LoopSide::Top => Point::new(center.x, center.y - half_h),
        LoopSide::Bottom => Point::new(center.x, center.y + half_h),
        LoopSide::Left => Point::new(center.x - half_w, center.y),
        LoopSide::Right => Point::new(center.x + half_w, center.y),
    };
    let span = ctx.config.curves.self_loop_half_span.max(0.0);
    let (tx, ty) = side.tangent();
    LoopAnchors {
        start: Point::new(mid.x - tx * span, mid.y - ty * span),
        end: Point::new(mid.x + tx * span, mid.y + ty * span),
        mid,
        outward: side.outward(),
    }
}

/// `routing.radius` when usable, otherwise the configured default.
pub(super) fn loop_radius(ctx: &RouteContext<'_>) -> f32 {
    ctx.spec
        .radius
        .filter(|r| r.is_finite())
        .unwrap_or(ctx.config.curves.default_radius)
        .max(0.0)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ArcStrategy;

impl RoutingStrategy for ArcStrategy {
    fn calculate_path(&self, ctx: &RouteContext<'_>) -> Path {
        let radius = loop_radius(ctx);
        if ctx.is_self_loop() {
            let anchors = loop_anchors(ctx);
            let center = anchors.offset(anchors.mid, radius);
            return Path::arc(anchors.start, anchors.end, center, radius);
        }
        let (start, end) = ctx.endpoints();
        let mid = start.midpoint(end);
        let center = match chord_normal(start, end) {
            Some((nx, ny)) if start.distance(end) >= MIN_CHORD => {
                Point::new(mid.x + nx * radius, mid.y + ny * radius)
            }
            _ => mid,
        };
        Path::arc(start, end, center, radius)
    }
}
