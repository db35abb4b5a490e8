use std::collections::BTreeMap;

use log::{debug, trace};

use crate::ir::{Element, ElementSizing, Layout, element_rect};

use super::error::GraphError;
use super::geometry::{border_crossing, concat_legs};
use super::strategies::{RouteContext, RoutingStrategy, loop_anchors, loop_radius};
use super::types::{Path, Point, Rect};
use super::visibility::{SearchParams, VisibilityGraph};

/// Obstacle-aware routing needs more elements than the two endpoints.
const MIN_ELEMENTS_FOR_GRAPH: usize = 3;
/// Below this delta on either axis the naive route is a single segment.
const DIRECT_SEGMENT_THRESHOLD: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preference {
    Horizontal,
    Vertical,
    Auto,
}

impl Preference {
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("horizontal") => Preference::Horizontal,
            Some("vertical") => Preference::Vertical,
            _ => Preference::Auto,
        }
    }
}

/// Horizontal/vertical polyline routing around the other elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrthogonalStrategy;

impl RoutingStrategy for OrthogonalStrategy {
    fn calculate_path(&self, ctx: &RouteContext<'_>) -> Path {
        if ctx.is_self_loop() {
            return Path::polyline(self_loop_route(ctx))
                .with_corner_radius(ctx.spec.corner_radius);
        }
        let (start, end) = ctx.endpoints();
        let preference = Preference::parse(ctx.spec.preference.as_deref());

        let mut stops = Vec::with_capacity(4);
        stops.push(start);
        stops.extend(pierce_points(ctx, start, end));
        stops.push(end);

        let legs = stops
            .windows(2)
            .map(|pair| route_leg(ctx, pair[0], pair[1], preference))
            .collect();
        let mut points = concat_legs(legs);
        if points.len() < 2 {
            points.push(end);
        }
        Path::polyline(points).with_corner_radius(ctx.spec.corner_radius)
    }
}

/// A rectangular loop off one side of the element: out from the start
/// anchor, across, and back in at the end anchor.
fn self_loop_route(ctx: &RouteContext<'_>) -> Vec<Point> {
    let anchors = loop_anchors(ctx);
    let reach = loop_radius(ctx);
    vec![
        anchors.start,
        anchors.offset(anchors.start, reach),
        anchors.offset(anchors.end, reach),
        anchors.end,
    ]
}

/// Where the route has to cross container borders: none when both ends
/// share a container (or neither has one), one when only one end is nested,
/// two when the ends sit in different containers.
pub(super) fn pierce_points(ctx: &RouteContext<'_>, start: Point, end: Point) -> Vec<Point> {
    let enclosing = |element: &Element, other: &Element| {
        ctx.layout
            .container_of(&element.id)
            .filter(|container| container.id != other.id)
    };
    let from_container = enclosing(ctx.from, ctx.to);
    let to_container = enclosing(ctx.to, ctx.from);
    let extension = ctx.config.orthogonal.border_extension;
    let pierce = |container: &Element, far: Point| {
        element_rect(container, ctx.sizing).map(|rect| border_crossing(&rect, far, extension))
    };

    match (from_container, to_container) {
        (Some(a), Some(b)) if a.id == b.id => Vec::new(),
        (Some(a), Some(b)) => pierce(a, end).into_iter().chain(pierce(b, start)).collect(),
        (Some(a), None) => pierce(a, end).into_iter().collect(),
        (None, Some(b)) => pierce(b, start).into_iter().collect(),
        (None, None) => Vec::new(),
    }
}

fn route_leg(
    ctx: &RouteContext<'_>,
    start: Point,
    end: Point,
    preference: Preference,
) -> Vec<Point> {
    if ctx.layout.positioned_count() < MIN_ELEMENTS_FOR_GRAPH {
        return naive_route(start, end, preference);
    }
    match graph_route(ctx, start, end) {
        Ok(points) => points,
        Err(err) => {
            debug!(
                from = ctx.from.id.as_str(),
                to = ctx.to.id.as_str(),
                reason:% = err;
                "obstacle-aware routing failed, using midpoint route"
            );
            naive_route(start, end, preference)
        }
    }
}

fn graph_route(
    ctx: &RouteContext<'_>,
    start: Point,
    end: Point,
) -> Result<Vec<Point>, GraphError> {
    let settings = &ctx.config.orthogonal;
    let obstacles = build_obstacles(ctx, settings.obstacle_margin);
    let channels = channel_lines(ctx.layout, ctx.sizing);
    let bounds = routing_bounds(ctx.layout, &obstacles, start, end, settings.obstacle_margin);
    let params = SearchParams {
        bend_penalty: settings.bend_penalty,
        proximity_weight: settings.proximity_weight,
        proximity_range: settings.proximity_range,
        max_nodes: settings.max_grid_nodes,
    };
    let graph = VisibilityGraph::build(&obstacles, start, end, &channels, &bounds, &params)?;
    trace!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        obstacles = obstacles.len(),
        channels = channels.len();
        "visibility graph built"
    );
    Ok(graph.find_path(settings.bend_penalty)?.points)
}

/// Inflated boxes of every positioned element except the two endpoints and
/// the containers they sit in.
pub(super) fn build_obstacles(ctx: &RouteContext<'_>, margin: f32) -> Vec<Rect> {
    let mut skip: Vec<&str> = vec![ctx.from.id.as_str(), ctx.to.id.as_str()];
    for element in [ctx.from, ctx.to] {
        let mut current = element.id.as_str();
        while let Some(container) = ctx.layout.container_of(current) {
            if skip.contains(&container.id.as_str()) {
                break;
            }
            skip.push(container.id.as_str());
            current = container.id.as_str();
        }
    }

    ctx.layout
        .elements
        .iter()
        .filter(|element| !skip.contains(&element.id.as_str()))
        .filter_map(|element| element_rect(element, ctx.sizing))
        .map(|rect| rect.inflate(margin.max(0.0)))
        .collect()
}

/// Horizontal lanes halfway between vertically separated level bands.
pub(super) fn channel_lines(layout: &Layout, sizing: &dyn ElementSizing) -> Vec<f32> {
    let Some(levels) = layout.levels.as_ref() else {
        return Vec::new();
    };
    let mut bands: BTreeMap<i32, (f32, f32)> = BTreeMap::new();
    for (id, level) in levels {
        let Some(rect) = layout.element_bounds(id, sizing) else {
            continue;
        };
        bands
            .entry(*level)
            .and_modify(|(top, bottom)| {
                *top = top.min(rect.y);
                *bottom = bottom.max(rect.bottom());
            })
            .or_insert((rect.y, rect.bottom()));
    }

    let mut bands: Vec<(f32, f32)> = bands.into_values().collect();
    bands.sort_by(|a, b| a.0.total_cmp(&b.0));
    bands
        .windows(2)
        .filter(|pair| pair[1].0 - pair[0].1 > 0.0)
        .map(|pair| (pair[0].1 + pair[1].0) / 2.0)
        .collect()
}

/// The canvas when the layout has one, otherwise the envelope of the
/// obstacles and both endpoints grown by `margin`.
pub(super) fn routing_bounds(
    layout: &Layout,
    obstacles: &[Rect],
    start: Point,
    end: Point,
    margin: f32,
) -> Rect {
    if let Some(canvas) = layout.canvas {
        return Rect::new("canvas", 0.0, 0.0, canvas.width, canvas.height);
    }
    let mut min_x = start.x.min(end.x);
    let mut min_y = start.y.min(end.y);
    let mut max_x = start.x.max(end.x);
    let mut max_y = start.y.max(end.y);
    for obs in obstacles {
        min_x = min_x.min(obs.x);
        min_y = min_y.min(obs.y);
        max_x = max_x.max(obs.right());
        max_y = max_y.max(obs.bottom());
    }
    Rect::new("canvas", min_x, min_y, max_x - min_x, max_y - min_y).inflate(margin.max(0.0))
}

/// One-bend route through the chord midpoint, or a direct segment when the
/// endpoints are already (nearly) aligned.
pub fn naive_route(start: Point, end: Point, preference: Preference) -> Vec<Point> {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    if dx.abs() < DIRECT_SEGMENT_THRESHOLD || dy.abs() < DIRECT_SEGMENT_THRESHOLD {
        return vec![start, end];
    }
    let horizontal_first = match preference {
        Preference::Horizontal => true,
        Preference::Vertical => false,
        Preference::Auto => dx.abs() >= dy.abs(),
    };
    if horizontal_first {
        let mid_x = (start.x + end.x) / 2.0;
        vec![start, Point::new(mid_x, start.y), Point::new(mid_x, end.y), end]
    } else {
        let mid_y = (start.y + end.y) / 2.0;
        vec![start, Point::new(start.x, mid_y), Point::new(end.x, mid_y), end]
    }
}
