mod error;
mod geometry;
mod orthogonal;
mod ports;
mod separation;
mod strategies;
mod types;
mod visibility;

use std::collections::HashMap;

use log::{debug, info};

use crate::config::RouterConfig;
use crate::ir::{Connection, ElementSizing, Layout, RoutingSpec, ScaledSizing};

pub use error::GraphError;
pub use geometry::segment_crosses_interior;
pub use orthogonal::{OrthogonalStrategy, Preference, naive_route};
pub use ports::assign_ports;
pub use separation::separate_parallel_segments;
pub use strategies::{
    ArcStrategy, BezierStrategy, ManualStrategy, RouteContext, RoutingStrategy, StraightStrategy,
};
pub use types::{Path, PathKind, Point, PortAssignments, Ports, Rect, path_bend_count, path_length};
pub use visibility::{GraphRoute, SearchParams, VisibilityGraph};

/// Strategy used when a connection names none, or names one nobody registered.
pub const DEFAULT_STRATEGY: &str = "straight";
/// Self-loops cannot be drawn as a straight line; they are promoted to this.
pub const SELF_LOOP_STRATEGY: &str = "arc";

/// Outcome counts of one routing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteReport {
    pub routed: usize,
    pub skipped: usize,
    pub separated: usize,
}

/// Routes every connection of a layout through a registry of named strategies.
pub struct RouterManager {
    config: RouterConfig,
    strategies: HashMap<String, Box<dyn RoutingStrategy>>,
    sizing: Box<dyn ElementSizing>,
}

impl RouterManager {
    pub fn new(config: RouterConfig) -> Self {
        let sizing = ScaledSizing::from_config(&config.sizing);
        let mut manager = Self {
            config,
            strategies: HashMap::new(),
            sizing: Box::new(sizing),
        };
        manager.register("straight", StraightStrategy);
        manager.register("manual", ManualStrategy);
        manager.register("orthogonal", OrthogonalStrategy);
        manager.register("bezier", BezierStrategy);
        manager.register("arc", ArcStrategy);
        manager
    }

    /// Add or replace a strategy. Names are case-insensitive.
    pub fn register(&mut self, name: impl Into<String>, strategy: impl RoutingStrategy + 'static) {
        let name = name.into().to_ascii_lowercase();
        if self.strategies.insert(name.clone(), Box::new(strategy)).is_some() {
            debug!(strategy = name.as_str(); "replaced routing strategy");
        }
    }

    pub fn with_sizing(mut self, sizing: impl ElementSizing + 'static) -> Self {
        self.sizing = Box::new(sizing);
        self
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn has_strategy(&self, name: &str) -> bool {
        self.strategies.contains_key(&name.to_ascii_lowercase())
    }

    /// Recompute ports and paths for every connection, then fan out
    /// overlapping segments. Previous ports and paths are overwritten;
    /// connections with a missing or unplaced endpoint end up without either.
    pub fn route(&self, layout: &mut Layout) -> RouteReport {
        let sizing = self.sizing.as_ref();
        let ports = assign_ports(layout, sizing);

        let mut report = RouteReport::default();
        let mut paths = Vec::with_capacity(layout.connections.len());
        for (idx, conn) in layout.connections.iter().enumerate() {
            let path = self.route_connection(layout, conn, ports.get(idx));
            if path.is_some() {
                report.routed += 1;
            } else {
                report.skipped += 1;
            }
            paths.push(path);
        }

        for (idx, (conn, path)) in layout.connections.iter_mut().zip(paths).enumerate() {
            let assigned = ports.get(idx);
            conn.ports = (path.is_some() && !assigned.is_empty()).then_some(assigned);
            conn.path = path;
        }

        report.separated =
            separate_parallel_segments(&mut layout.connections, &self.config.separation);
        info!(
            connections = layout.connections.len(),
            routed = report.routed,
            skipped = report.skipped,
            separated = report.separated;
            "routed layout"
        );
        report
    }

    fn route_connection(&self, layout: &Layout, conn: &Connection, ports: Ports) -> Option<Path> {
        let placed = |id: &str| layout.element(id).filter(|el| el.position.is_some());
        let (Some(from), Some(to)) = (placed(&conn.from), placed(&conn.to)) else {
            debug!(
                from = conn.from.as_str(),
                to = conn.to.as_str();
                "skipping connection with unplaced endpoint"
            );
            return None;
        };

        let spec = self.resolve_spec(conn);
        let ctx = RouteContext {
            from,
            to,
            connection: conn,
            spec: &spec,
            layout,
            sizing: self.sizing.as_ref(),
            ports,
            config: &self.config,
        };
        Some(self.strategy_for(&spec.kind).calculate_path(&ctx))
    }

    fn resolve_spec(&self, conn: &Connection) -> RoutingSpec {
        let mut spec = conn
            .routing
            .clone()
            .unwrap_or_else(|| RoutingSpec::new(DEFAULT_STRATEGY));
        spec.kind = spec.kind.trim().to_ascii_lowercase();
        if spec.kind.is_empty() {
            spec.kind = DEFAULT_STRATEGY.to_string();
        } else if !self.has_strategy(&spec.kind) {
            debug!(strategy = spec.kind.as_str(); "unknown routing type, falling back to straight");
            spec.kind = DEFAULT_STRATEGY.to_string();
        }
        // Promotion follows the fallback so unknown types on a self-loop still loop.
        if conn.is_self_loop() && spec.kind == DEFAULT_STRATEGY {
            spec.kind = SELF_LOOP_STRATEGY.to_string();
        }
        spec
    }

    fn strategy_for(&self, kind: &str) -> &dyn RoutingStrategy {
        match self.strategies.get(kind) {
            Some(strategy) => strategy.as_ref(),
            None => &StraightStrategy,
        }
    }
}

impl Default for RouterManager {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

/// Route a layout once with a fresh manager.
pub fn route_layout(layout: &mut Layout, config: &RouterConfig) -> RouteReport {
    RouterManager::new(config.clone()).route(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Element;

    fn pair(routing: Option<RoutingSpec>) -> Layout {
        let mut conn = Connection::new("a", "b");
        conn.routing = routing;
        Layout::new(
            vec![
                Element::new("a").at(0.0, 0.0).sized(80.0, 40.0),
                Element::new("b").at(300.0, 0.0).sized(80.0, 40.0),
            ],
            vec![conn],
        )
    }

    fn path_of(layout: &Layout, idx: usize) -> &Path {
        layout.connections[idx].path.as_ref().unwrap()
    }

    #[test]
    fn straight_pair_attaches_at_facing_ports() {
        let mut layout = pair(None);
        let report = RouterManager::default().route(&mut layout);
        assert_eq!(report, RouteReport { routed: 1, skipped: 0, separated: 0 });
        let path = path_of(&layout, 0);
        assert_eq!(path.kind, PathKind::Line);
        assert_eq!(path.points.len(), 2);
        // Top-left positions with ports assigned first give border-to-border
        // attachment, not (40,20)-(260,20); see "Geometry convention" in DESIGN.md.
        assert!(path.points[0].approx_eq(Point::new(80.0, 20.0)));
        assert!(path.points[1].approx_eq(Point::new(300.0, 20.0)));
        let ports = layout.connections[0].ports.unwrap();
        assert_eq!(ports.from, path.start());
    }

    #[test]
    fn aligned_orthogonal_pair_is_a_single_segment() {
        let mut layout = pair(Some(RoutingSpec::new("orthogonal")));
        RouterManager::default().route(&mut layout);
        let path = path_of(&layout, 0);
        assert_eq!(path.kind, PathKind::Polyline);
        assert_eq!(path.points.len(), 2);
    }

    #[test]
    fn self_loop_defaults_to_arc() {
        let mut layout = Layout::new(
            vec![Element::new("n").at(60.0, 80.0).sized(80.0, 40.0)],
            vec![Connection::new("n", "n")],
        );
        RouterManager::default().route(&mut layout);
        let path = path_of(&layout, 0);
        assert_eq!(path.kind, PathKind::Arc);
        assert_eq!(path.points, vec![Point::new(80.0, 80.0), Point::new(120.0, 80.0)]);
        assert_eq!(path.center, Some(Point::new(100.0, 30.0)));
        assert!(layout.connections[0].ports.is_none());
    }

    #[test]
    fn unknown_type_falls_back_to_straight() {
        let mut layout = pair(Some(RoutingSpec::new("spline")));
        RouterManager::default().route(&mut layout);
        assert_eq!(path_of(&layout, 0).kind, PathKind::Line);
    }

    #[test]
    fn unknown_type_on_self_loop_still_loops() {
        let mut conn = Connection::new("n", "n");
        conn.routing = Some(RoutingSpec::new("zigzag"));
        let mut layout = Layout::new(
            vec![
                Element::new("n").at(60.0, 80.0).sized(80.0, 40.0),
                Element::new("m").at(300.0, 80.0).sized(80.0, 40.0),
            ],
            vec![conn],
        );
        RouterManager::default().route(&mut layout);
        let path = path_of(&layout, 0);
        assert_eq!(path.kind, PathKind::Arc);
        assert_ne!(path.start(), path.end());
        assert_eq!(path.center, Some(Point::new(100.0, 30.0)));
    }

    #[test]
    fn unplaced_endpoints_are_skipped_and_cleared() {
        let mut layout = Layout::new(
            vec![Element::new("a").at(0.0, 0.0), Element::new("b")],
            vec![Connection::new("a", "b"), Connection::new("a", "ghost")],
        );
        layout.connections[0].path = Some(Path::line(Point::new(1.0, 1.0), Point::new(2.0, 2.0)));
        let report = RouterManager::default().route(&mut layout);
        assert_eq!(report.routed, 0);
        assert_eq!(report.skipped, 2);
        assert!(layout.connections.iter().all(|c| c.path.is_none() && c.ports.is_none()));
    }

    struct Fixed;

    impl RoutingStrategy for Fixed {
        fn calculate_path(&self, _ctx: &RouteContext<'_>) -> Path {
            Path::line(Point::new(0.0, 0.0), Point::new(1.0, 1.0))
        }
    }

    #[test]
    fn latest_registration_wins() {
        let mut manager = RouterManager::default();
        manager.register("Straight", Fixed);
        assert!(manager.has_strategy("straight"));
        let mut layout = pair(None);
        manager.route(&mut layout);
        assert_eq!(path_of(&layout, 0).points[1], Point::new(1.0, 1.0));

        manager.register("wavy", Fixed);
        let mut wavy = pair(Some(RoutingSpec::new("wavy")));
        manager.route(&mut wavy);
        assert_eq!(path_of(&wavy, 0).points[0], Point::new(0.0, 0.0));
    }

    #[test]
    fn custom_sizing_changes_attachments() {
        struct Square;
        impl ElementSizing for Square {
            fn resolve_size(&self, _element: &Element) -> (f32, f32) {
                (20.0, 20.0)
            }
        }
        let mut layout = pair(None);
        RouterManager::default().with_sizing(Square).route(&mut layout);
        let path = path_of(&layout, 0);
        assert!(path.points[0].approx_eq(Point::new(20.0, 10.0)));
        assert!(path.points[1].approx_eq(Point::new(300.0, 10.0)));
    }

    #[test]
    fn rerouting_overwrites_previous_results() {
        let mut layout = pair(Some(RoutingSpec::new("bezier")));
        let manager = RouterManager::default();
        manager.route(&mut layout);
        let first = layout.connections.clone();
        manager.route(&mut layout);
        assert_eq!(layout.connections, first);
    }

    #[test]
    fn legacy_waypoints_route_as_manual() {
        let mut layout = Layout::from_json(
            r#"{
                "elements": [
                    {"id": "a", "position": {"x": 0, "y": 0},
                     "size": {"width": 80, "height": 40}},
                    {"id": "b", "position": {"x": 300, "y": 200},
                     "size": {"width": 80, "height": 40}}
                ],
                "connections": [{"from": "a", "to": "b", "waypoints": [[40, 220]]}]
            }"#,
        )
        .unwrap();
        route_layout(&mut layout, &RouterConfig::default());
        let path = path_of(&layout, 0);
        assert_eq!(path.kind, PathKind::Polyline);
        assert_eq!(path.points.len(), 3);
        assert_eq!(path.points[1], Point::new(40.0, 220.0));
    }
}
