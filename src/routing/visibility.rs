use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::error::GraphError;
use super::geometry::simplify_collinear;
use super::types::{Point, Rect};

// A* cost scaling
/// Integer cost multiplier so the search can order states with u64 costs.
const ASTAR_COST_SCALE: f32 = 1000.0;
/// Coordinates closer than this collapse into one grid line.
const COORD_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy)]
struct GraphEdge {
    to: usize,
    weight: f32,
    axis: Axis,
}

/// Tunables for edge weights and the search.
#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    pub bend_penalty: f32,
    pub proximity_weight: f32,
    pub proximity_range: f32,
    pub max_nodes: usize,
}

/// A found route and its total cost (length plus penalties).
#[derive(Debug, Clone, PartialEq)]
pub struct GraphRoute {
    pub points: Vec<Point>,
    pub cost: f32,
}

/// Orthogonal visibility graph over inflated obstacle boxes.
///
/// Nodes sit on the Cartesian product of every obstacle edge coordinate,
/// the bounding corners, both query endpoints and the channel lines. A node
/// strictly inside an obstacle is dropped, except for the two endpoints.
/// Edges join neighbouring nodes along a grid line when the stretch between
/// them stays out of every obstacle interior.
#[derive(Debug, Clone)]
pub struct VisibilityGraph {
    nodes: Vec<Point>,
    adjacency: Vec<Vec<GraphEdge>>,
    start: Option<usize>,
    end: Option<usize>,
}

impl VisibilityGraph {
    pub fn build(
        obstacles: &[Rect],
        start: Point,
        end: Point,
        channels: &[f32],
        bounds: &Rect,
        params: &SearchParams,
    ) -> Result<Self, GraphError> {
        if !(start.x.is_finite() && start.y.is_finite() && end.x.is_finite() && end.y.is_finite()) {
            return Err(GraphError::EndpointMissing);
        }

        let mut xs = vec![bounds.x, bounds.right(), start.x, end.x];
        let mut ys = vec![bounds.y, bounds.bottom(), start.y, end.y];
        for obs in obstacles {
            xs.push(obs.x);
            xs.push(obs.right());
            ys.push(obs.y);
            ys.push(obs.bottom());
        }
        ys.extend(channels.iter().copied().filter(|y| y.is_finite()));
        let xs = sorted_coords(xs);
        let ys = sorted_coords(ys);

        let nx = xs.len();
        let ny = ys.len();
        let total = nx.saturating_mul(ny);
        if total > params.max_nodes {
            return Err(GraphError::TooManyNodes {
                nodes: total,
                limit: params.max_nodes,
            });
        }

        let start_cell = (coord_index(&xs, start.x), coord_index(&ys, start.y));
        let end_cell = (coord_index(&xs, end.x), coord_index(&ys, end.y));
        let (Some(sx), Some(sy)) = start_cell else {
            return Err(GraphError::EndpointMissing);
        };
        let (Some(ex), Some(ey)) = end_cell else {
            return Err(GraphError::EndpointMissing);
        };

        let cell = |ix: usize, iy: usize| iy * nx + ix;
        let mut nodes = Vec::with_capacity(total);
        let mut valid = Vec::with_capacity(total);
        for &y in &ys {
            for &x in &xs {
                let point = Point::new(x, y);
                nodes.push(point);
                valid.push(!obstacles.iter().any(|obs| obs.contains_strict(point)));
            }
        }
        let start_idx = cell(sx, sy);
        let end_idx = cell(ex, ey);
        nodes[start_idx] = start;
        nodes[end_idx] = end;
        valid[start_idx] = true;
        valid[end_idx] = true;

        let mut adjacency: Vec<Vec<GraphEdge>> = vec![Vec::new(); total];
        let link = |a: usize, b: usize, axis: Axis, adjacency: &mut Vec<Vec<GraphEdge>>| {
            let pa = nodes[a];
            let pb = nodes[b];
            let mid = pa.midpoint(pb);
            if obstacles.iter().any(|obs| obs.contains_strict(mid)) {
                return;
            }
            let weight = edge_weight(pa, pb, axis, obstacles, params);
            adjacency[a].push(GraphEdge { to: b, weight, axis });
            adjacency[b].push(GraphEdge { to: a, weight, axis });
        };
        for iy in 0..ny {
            for ix in 0..nx {
                let here = cell(ix, iy);
                if !valid[here] {
                    continue;
                }
                if ix + 1 < nx && valid[cell(ix + 1, iy)] {
                    link(here, cell(ix + 1, iy), Axis::Horizontal, &mut adjacency);
                }
                if iy + 1 < ny && valid[cell(ix, iy + 1)] {
                    link(here, cell(ix, iy + 1), Axis::Vertical, &mut adjacency);
                }
            }
        }

        Ok(Self {
            nodes,
            adjacency,
            start: Some(start_idx),
            end: Some(end_idx),
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }

    /// A* from start to end over (node, incoming axis) states.
    pub fn find_path(&self, bend_penalty: f32) -> Result<GraphRoute, GraphError> {
        let (Some(start), Some(end)) = (self.start, self.end) else {
            return Err(GraphError::EndpointMissing);
        };
        if start == end {
            return Ok(GraphRoute {
                points: vec![self.nodes[start]],
                cost: 0.0,
            });
        }

        let goal = self.nodes[end];
        let heuristic = |node: usize| {
            let p = self.nodes[node];
            scale_cost((p.x - goal.x).abs() + (p.y - goal.y).abs())
        };
        let bend = scale_cost(bend_penalty.max(0.0));

        let states = self.nodes.len() * DIR_COUNT;
        let mut best_cost = vec![u64::MAX; states];
        let mut prev: Vec<Option<usize>> = vec![None; states];
        let mut heap = BinaryHeap::new();
        let mut seq = 0u64;

        let start_state = start * DIR_COUNT + DIR_START;
        best_cost[start_state] = 0;
        heap.push(SearchEntry {
            est: heuristic(start),
            seq,
            cost: 0,
            state: start_state,
        });

        let mut found: Option<usize> = None;
        while let Some(SearchEntry { cost, state, .. }) = heap.pop() {
            if cost != best_cost[state] {
                continue;
            }
            let node = state / DIR_COUNT;
            let dir = state % DIR_COUNT;
            if node == end {
                found = Some(state);
                break;
            }
            for edge in &self.adjacency[node] {
                let next_dir = axis_dir(edge.axis);
                let mut next_cost = cost.saturating_add(scale_cost(edge.weight));
                if dir != DIR_START && dir != next_dir {
                    next_cost = next_cost.saturating_add(bend);
                }
                let next_state = edge.to * DIR_COUNT + next_dir;
                if next_cost >= best_cost[next_state] {
                    continue;
                }
                best_cost[next_state] = next_cost;
                prev[next_state] = Some(state);
                seq += 1;
                heap.push(SearchEntry {
                    est: next_cost.saturating_add(heuristic(edge.to)),
                    seq,
                    cost: next_cost,
                    state: next_state,
                });
            }
        }

        let end_state = found.ok_or(GraphError::NoPath)?;
        let mut points = Vec::new();
        let mut cursor = Some(end_state);
        while let Some(state) = cursor {
            points.push(self.nodes[state / DIR_COUNT]);
            cursor = prev[state];
        }
        points.reverse();
        Ok(GraphRoute {
            points: simplify_collinear(&points),
            cost: best_cost[end_state] as f32 / ASTAR_COST_SCALE,
        })
    }
}

const DIR_START: usize = 0;
const DIR_HORIZONTAL: usize = 1;
const DIR_VERTICAL: usize = 2;
const DIR_COUNT: usize = 3;

fn axis_dir(axis: Axis) -> usize {
    match axis {
        Axis::Horizontal => DIR_HORIZONTAL,
        Axis::Vertical => DIR_VERTICAL,
    }
}

fn scale_cost(value: f32) -> u64 {
    (value.max(0.0) * ASTAR_COST_SCALE).round() as u64
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct SearchEntry {
    est: u64,
    seq: u64,
    cost: u64,
    state: usize,
}

impl Ord for SearchEntry {
    // BinaryHeap is a max-heap: lowest estimate first, then earliest discovery.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .est
            .cmp(&self.est)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for SearchEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn sorted_coords(mut values: Vec<f32>) -> Vec<f32> {
    values.retain(|v| v.is_finite());
    values.sort_by(|a, b| a.total_cmp(b));
    values.dedup_by(|a, b| (*a - *b).abs() <= COORD_EPSILON);
    values
}

fn coord_index(coords: &[f32], value: f32) -> Option<usize> {
    coords
        .iter()
        .position(|c| (c - value).abs() <= COORD_EPSILON)
}

/// Length plus a penalty that grows as the edge hugs an obstacle running
/// alongside it. Beyond `proximity_range` the penalty is zero.
fn edge_weight(a: Point, b: Point, axis: Axis, obstacles: &[Rect], params: &SearchParams) -> f32 {
    let length = a.distance(b);
    if params.proximity_range <= 0.0 || params.proximity_weight <= 0.0 {
        return length;
    }
    let mut nearest = f32::INFINITY;
    for obs in obstacles {
        let gap = match axis {
            Axis::Horizontal => {
                let (lo, hi) = (a.x.min(b.x), a.x.max(b.x));
                if obs.x >= hi || obs.right() <= lo {
                    continue;
                }
                axis_gap(a.y, obs.y, obs.bottom())
            }
            Axis::Vertical => {
                let (lo, hi) = (a.y.min(b.y), a.y.max(b.y));
                if obs.y >= hi || obs.bottom() <= lo {
                    continue;
                }
                axis_gap(a.x, obs.x, obs.right())
            }
        };
        nearest = nearest.min(gap);
    }
    if nearest >= params.proximity_range {
        return length;
    }
    length + length * params.proximity_weight * (1.0 - nearest / params.proximity_range)
}

fn axis_gap(value: f32, lo: f32, hi: f32) -> f32 {
    if value <= lo {
        lo - value
    } else if value >= hi {
        value - hi
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::geometry::segment_crosses_interior;
    use float_cmp::approx_eq;

    fn params() -> SearchParams {
        SearchParams {
            bend_penalty: 40.0,
            proximity_weight: 0.8,
            proximity_range: 50.0,
            max_nodes: 100_000,
        }
    }

    fn canvas() -> Rect {
        Rect::new("canvas", 0.0, 0.0, 600.0, 600.0)
    }

    #[test]
    fn open_grid_yields_single_bend() {
        let start = Point::new(100.0, 100.0);
        let end = Point::new(300.0, 250.0);
        let graph = VisibilityGraph::build(&[], start, end, &[], &canvas(), &params()).unwrap();
        let route = graph.find_path(40.0).unwrap();
        assert_eq!(route.points.len(), 3, "{:?}", route.points);
        assert_eq!(route.points[0], start);
        assert_eq!(route.points[2], end);
        let corner = route.points[1];
        assert!(
            corner == Point::new(300.0, 100.0) || corner == Point::new(100.0, 250.0),
            "unexpected corner {corner:?}"
        );
        assert!(route.cost <= 200.0 + 150.0 + 40.0 + 0.01);
    }

    #[test]
    fn aligned_endpoints_need_no_bend() {
        let start = Point::new(50.0, 300.0);
        let end = Point::new(450.0, 300.0);
        let graph = VisibilityGraph::build(&[], start, end, &[], &canvas(), &params()).unwrap();
        let route = graph.find_path(40.0).unwrap();
        assert_eq!(route.points, vec![start, end]);
        assert!(approx_eq!(f32, route.cost, 400.0, epsilon = 0.01));
    }

    #[test]
    fn obstacle_on_direct_path_is_avoided() {
        let start = Point::new(50.0, 300.0);
        let end = Point::new(550.0, 300.0);
        let wall = Rect::new("wall", 250.0, 200.0, 100.0, 200.0);
        let obstacles = std::slice::from_ref(&wall);
        let graph =
            VisibilityGraph::build(obstacles, start, end, &[], &canvas(), &params()).unwrap();
        let route = graph.find_path(40.0).unwrap();
        assert_eq!(route.points.first(), Some(&start));
        assert_eq!(route.points.last(), Some(&end));
        for seg in route.points.windows(2) {
            assert!(!segment_crosses_interior(seg[0], seg[1], &wall), "{:?}", route.points);
            assert!(seg[0].x == seg[1].x || seg[0].y == seg[1].y, "non-orthogonal segment");
        }
        assert!(route.points.len() >= 4);
    }

    #[test]
    fn enclosed_goal_reports_no_path() {
        let start = Point::new(50.0, 50.0);
        let end = Point::new(300.0, 300.0);
        let ring = [
            Rect::new("n", 200.0, 200.0, 200.0, 50.0),
            Rect::new("s", 200.0, 350.0, 200.0, 50.0),
            Rect::new("w", 200.0, 200.0, 50.0, 200.0),
            Rect::new("e", 350.0, 200.0, 50.0, 200.0),
        ];
        let graph = VisibilityGraph::build(&ring, start, end, &[], &canvas(), &params()).unwrap();
        assert_eq!(graph.find_path(40.0), Err(GraphError::NoPath));
    }

    #[test]
    fn node_cap_is_enforced() {
        let mut limited = params();
        limited.max_nodes = 4;
        let result = VisibilityGraph::build(
            &[],
            Point::new(10.0, 10.0),
            Point::new(20.0, 20.0),
            &[],
            &canvas(),
            &limited,
        );
        assert!(matches!(result, Err(GraphError::TooManyNodes { .. })));
    }

    #[test]
    fn non_finite_endpoint_is_rejected() {
        let result = VisibilityGraph::build(
            &[],
            Point::new(f32::NAN, 10.0),
            Point::new(20.0, 20.0),
            &[],
            &canvas(),
            &params(),
        );
        assert!(matches!(result, Err(GraphError::EndpointMissing)));
    }

    #[test]
    fn proximity_penalty_fades_with_distance() {
        let obs = [Rect::new("o", 0.0, 100.0, 200.0, 50.0)];
        let hugging = edge_weight(
            Point::new(0.0, 100.0),
            Point::new(100.0, 100.0),
            Axis::Horizontal,
            &obs,
            &params(),
        );
        let halfway = edge_weight(
            Point::new(0.0, 75.0),
            Point::new(100.0, 75.0),
            Axis::Horizontal,
            &obs,
            &params(),
        );
        let clear = edge_weight(
            Point::new(0.0, 40.0),
            Point::new(100.0, 40.0),
            Axis::Horizontal,
            &obs,
            &params(),
        );
        assert!(approx_eq!(f32, hugging, 180.0, epsilon = 1e-3));
        assert!(approx_eq!(f32, halfway, 140.0, epsilon = 1e-3));
        assert!(approx_eq!(f32, clear, 100.0, epsilon = 1e-3));
    }

    #[test]
    fn channel_line_attracts_route() {
        // A lane between two obstacle bands: hugging the upper band costs more
        // than stepping down to the lane center and back.
        let obstacles = [
            Rect::new("top", 150.0, 0.0, 300.0, 250.0),
            Rect::new("bottom", 150.0, 350.0, 300.0, 250.0),
        ];
        let start = Point::new(50.0, 265.0);
        let end = Point::new(550.0, 265.0);

        let without = VisibilityGraph::build(&obstacles, start, end, &[], &canvas(), &params())
            .unwrap()
            .find_path(40.0)
            .unwrap();
        assert_eq!(without.points, vec![start, end]);

        let with = VisibilityGraph::build(&obstacles, start, end, &[300.0], &canvas(), &params())
            .unwrap()
            .find_path(40.0)
            .unwrap();
        assert_eq!(
            with.points,
            vec![start, Point::new(50.0, 300.0), Point::new(550.0, 300.0), end]
        );
        assert!(with.cost < without.cost);
    }
}
