use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SizingConfig;
use crate::routing::{Path, Point, Ports, Rect};

#[derive(Debug, Error)]
pub enum IrError {
    /// Neither parser accepted the document.
    #[error("invalid layout document: {json}; as JSON5: {json5}")]
    Parse { json: String, json5: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementSize {
    Explicit { width: f32, height: f32 },
    Proportional { width_ratio: f32, height_ratio: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ChildRecord")]
pub struct ChildRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl ChildRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            scope: None,
        }
    }

    pub fn border(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            scope: Some("border".to_string()),
        }
    }

    pub fn is_border(&self) -> bool {
        self.scope.as_deref() == Some("border")
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChildRecord {
    Id(String),
    Full {
        id: String,
        #[serde(default)]
        scope: Option<String>,
    },
}

impl From<ChildRecord> for ChildRef {
    fn from(record: ChildRecord) -> Self {
        match record {
            ChildRecord::Id(id) => ChildRef::new(id),
            ChildRecord::Full { id, scope } => ChildRef { id, scope },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: String,
    /// Top-left corner; `None` keeps the element out of routing.
    #[serde(default)]
    pub position: Option<Point>,
    #[serde(default)]
    pub size: Option<ElementSize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ChildRef>,
}

impl Element {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            position: None,
            size: None,
            children: Vec::new(),
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.position = Some(Point::new(x, y));
        self
    }

    pub fn sized(mut self, width: f32, height: f32) -> Self {
        self.size = Some(ElementSize::Explicit { width, height });
        self
    }

    pub fn proportional(mut self, width_ratio: f32, height_ratio: f32) -> Self {
        self.size = Some(ElementSize::Proportional {
            width_ratio,
            height_ratio,
        });
        self
    }

    pub fn with_child(mut self, child: ChildRef) -> Self {
        self.children.push(child);
        self
    }

    pub fn is_container(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Resolves an element's rendered size. Layout stages that size elements
/// relative to each other supply their own implementation.
pub trait ElementSizing {
    fn resolve_size(&self, element: &Element) -> (f32, f32);
}

/// Explicit sizes pass through; proportional multipliers scale a unit box.
#[derive(Debug, Clone)]
pub struct ScaledSizing {
    pub default_size: (f32, f32),
    pub unit: (f32, f32),
}

impl ScaledSizing {
    pub fn from_config(config: &SizingConfig) -> Self {
        Self {
            default_size: (config.default_width, config.default_height),
            unit: (config.unit_width, config.unit_height),
        }
    }
}

impl Default for ScaledSizing {
    fn default() -> Self {
        Self::from_config(&SizingConfig::default())
    }
}

impl ElementSizing for ScaledSizing {
    fn resolve_size(&self, element: &Element) -> (f32, f32) {
        match element.size {
            Some(ElementSize::Explicit { width, height }) => (width.max(0.0), height.max(0.0)),
            Some(ElementSize::Proportional {
                width_ratio,
                height_ratio,
            }) => (
                (self.unit.0 * width_ratio).max(0.0),
                (self.unit.1 * height_ratio).max(0.0),
            ),
            None => self.default_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WaypointRecord {
    Object { x: f32, y: f32 },
    Pair([f32; 2]),
}

impl From<WaypointRecord> for Point {
    fn from(record: WaypointRecord) -> Self {
        match record {
            WaypointRecord::Object { x, y } => Point::new(x, y),
            WaypointRecord::Pair([x, y]) => Point::new(x, y),
        }
    }
}

/// Canonical per-connection routing configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoutingSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curvature: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub waypoints: Vec<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f32>,
}

impl RoutingSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn manual(waypoints: Vec<Point>) -> Self {
        Self {
            waypoints,
            ..Self::new("manual")
        }
    }
}

#[derive(Debug, Deserialize)]
struct RoutingSpecRecord {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    radius: Option<f32>,
    #[serde(default)]
    side: Option<String>,
    #[serde(default)]
    curvature: Option<f32>,
    #[serde(default)]
    waypoints: Vec<WaypointRecord>,
    #[serde(default)]
    preference: Option<String>,
    #[serde(default, alias = "cornerRadius")]
    corner_radius: Option<f32>,
}

/// A connection as it appears on the wire, legacy fields included.
#[derive(Debug, Deserialize)]
pub struct ConnectionRecord {
    from: String,
    to: String,
    #[serde(default)]
    routing: Option<RoutingSpecRecord>,
    #[serde(default, alias = "routingType")]
    routing_type: Option<String>,
    #[serde(default)]
    waypoints: Option<Vec<WaypointRecord>>,
}

impl From<ConnectionRecord> for Connection {
    fn from(record: ConnectionRecord) -> Self {
        let routing = if let Some(spec) = record.routing {
            Some(RoutingSpec {
                kind: spec.kind.unwrap_or_default(),
                radius: spec.radius.map(|r| r.max(0.0)),
                side: spec.side,
                curvature: spec.curvature,
                waypoints: spec.waypoints.into_iter().map(Point::from).collect(),
                preference: spec.preference,
                corner_radius: spec.corner_radius.map(|r| r.max(0.0)),
            })
        } else if let Some(kind) = record.routing_type {
            Some(RoutingSpec::new(kind))
        } else {
            record
                .waypoints
                .map(|wps| RoutingSpec::manual(wps.into_iter().map(Point::from).collect()))
        };
        Connection {
            from: record.from,
            to: record.to,
            routing,
            ports: None,
            path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ConnectionRecord")]
pub struct Connection {
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing: Option<RoutingSpec>,
    /// Derived: attachment points from the last port assignment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ports: Option<Ports>,
    /// Output: the path computed by the last routing run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Path>,
}

impl Connection {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            routing: None,
            ports: None,
            path: None,
        }
    }

    pub fn with_routing(mut self, routing: RoutingSpec) -> Self {
        self.routing = Some(routing);
        self
    }

    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Canvas {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Layout {
    pub elements: Vec<Element>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub levels: Option<BTreeMap<String, i32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas: Option<Canvas>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Layout {
    pub fn new(elements: Vec<Element>, connections: Vec<Connection>) -> Self {
        let mut layout = Self {
            elements,
            connections,
            levels: None,
            canvas: None,
            index: HashMap::new(),
        };
        layout.reindex();
        layout
    }

    pub fn with_levels(mut self, levels: BTreeMap<String, i32>) -> Self {
        self.levels = Some(levels);
        self
    }

    pub fn with_canvas(mut self, width: f32, height: f32) -> Self {
        self.canvas = Some(Canvas { width, height });
        self
    }

    /// Parse a layout document; strict JSON first, JSON5 as a fallback.
    pub fn from_json(input: &str) -> Result<Self, IrError> {
        let mut layout: Layout = match serde_json::from_str(input) {
            Ok(layout) => layout,
            Err(json_err) => json5::from_str(input).map_err(|json5_err| IrError::Parse {
                json: json_err.to_string(),
                json5: json5_err.to_string(),
            })?,
        };
        layout.reindex();
        Ok(layout)
    }

    /// Rebuild the id lookup after `elements` changed. The first element
    /// with a given id wins.
    pub fn reindex(&mut self) {
        self.index.clear();
        for (idx, element) in self.elements.iter().enumerate() {
            self.index.entry(element.id.clone()).or_insert(idx);
        }
    }

    pub fn element(&self, id: &str) -> Option<&Element> {
        // The index may be stale if `elements` was edited directly.
        if let Some(element) = self
            .index
            .get(id)
            .and_then(|&idx| self.elements.get(idx))
            .filter(|el| el.id == id)
        {
            return Some(element);
        }
        self.elements.iter().find(|el| el.id == id)
    }

    /// Bounds of a positioned element, `None` when missing or unplaced.
    pub fn element_bounds(&self, id: &str, sizing: &dyn ElementSizing) -> Option<Rect> {
        let element = self.element(id)?;
        element_rect(element, sizing)
    }

    /// The first element that lists `id` among its children.
    pub fn container_of(&self, id: &str) -> Option<&Element> {
        self.elements
            .iter()
            .find(|el| el.id != id && el.children.iter().any(|child| child.id == id))
    }

    pub fn positioned_count(&self) -> usize {
        self.elements.iter().filter(|el| el.position.is_some()).count()
    }
}

pub fn element_rect(element: &Element, sizing: &dyn ElementSizing) -> Option<Rect> {
    let position = element.position?;
    let (width, height) = sizing.resolve_size(element);
    Some(Rect::new(element.id.clone(), position.x, position.y, width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_routing_wins_over_legacy_fields() {
        let conn: Connection = serde_json::from_str(
            r#"{"from":"a","to":"b","routing":{"type":"bezier","curvature":0.2},
                "routingType":"orthogonal","waypoints":[[1,2]]}"#,
        )
        .unwrap();
        let routing = conn.routing.unwrap();
        assert_eq!(routing.kind, "bezier");
        assert_eq!(routing.curvature, Some(0.2));
    }

    #[test]
    fn legacy_routing_type_wraps_as_spec() {
        let conn: Connection = serde_json::from_str(
            r#"{"from":"a","to":"b","routing_type":"orthogonal","waypoints":[[1,2]]}"#,
        )
        .unwrap();
        assert_eq!(conn.routing, Some(RoutingSpec::new("orthogonal")));
    }

    #[test]
    fn legacy_waypoints_become_manual_routing() {
        let conn: Connection = serde_json::from_str(
            r#"{"from":"a","to":"b","waypoints":[{"x":5,"y":6},[7,8]]}"#,
        )
        .unwrap();
        let routing = conn.routing.unwrap();
        assert_eq!(routing.kind, "manual");
        assert_eq!(routing.waypoints, vec![Point::new(5.0, 6.0), Point::new(7.0, 8.0)]);
    }

    #[test]
    fn connection_without_routing_stays_unset() {
        let conn: Connection = serde_json::from_str(r#"{"from":"a","to":"a"}"#).unwrap();
        assert!(conn.routing.is_none());
        assert!(conn.is_self_loop());
    }

    #[test]
    fn children_accept_string_shorthand() {
        let element: Element = serde_json::from_str(
            r#"{"id":"c","position":{"x":0,"y":0},"children":["a",{"id":"p","scope":"border"}]}"#,
        )
        .unwrap();
        assert_eq!(element.children.len(), 2);
        assert!(!element.children[0].is_border());
        assert!(element.children[1].is_border());
        assert!(element.is_container());
    }

    #[test]
    fn sizing_resolves_explicit_proportional_and_default() {
        let sizing = ScaledSizing::default();
        let explicit = Element::new("a").sized(80.0, 40.0);
        let scaled = Element::new("b").proportional(2.0, 0.5);
        let bare = Element::new("c");
        assert_eq!(sizing.resolve_size(&explicit), (80.0, 40.0));
        assert_eq!(sizing.resolve_size(&scaled), (200.0, 25.0));
        assert_eq!(sizing.resolve_size(&bare), (120.0, 60.0));
    }

    #[test]
    fn layout_lookup_and_containers() {
        let layout = Layout::new(
            vec![
                Element::new("group")
                    .at(0.0, 0.0)
                    .sized(300.0, 200.0)
                    .with_child(ChildRef::new("a")),
                Element::new("a").at(20.0, 20.0).sized(50.0, 50.0),
                Element::new("floating"),
            ],
            Vec::new(),
        );
        assert_eq!(layout.container_of("a").map(|el| el.id.as_str()), Some("group"));
        assert!(layout.container_of("group").is_none());
        assert_eq!(layout.positioned_count(), 2);
        let sizing = ScaledSizing::default();
        assert!(layout.element_bounds("floating", &sizing).is_none());
        assert!(layout.element_bounds("missing", &sizing).is_none());
        let bounds = layout.element_bounds("a", &sizing).unwrap();
        assert_eq!(bounds.center(), Point::new(45.0, 45.0));
    }

    #[test]
    fn parses_json5_documents() {
        let layout = Layout::from_json(
            "{ elements: [{ id: 'a', position: { x: 1, y: 2 }, size: { width: 3, height: 4 } }], }",
        )
        .unwrap();
        assert!(layout.element("a").is_some());
        assert!(Layout::from_json("{").is_err());
    }

    #[test]
    fn parse_errors_carry_both_parser_messages() {
        let err = Layout::from_json("{ elements: [ }").unwrap_err();
        let IrError::Parse { json, json5 } = &err;
        assert!(!json.is_empty());
        assert!(!json5.is_empty());
        let message = err.to_string();
        assert!(message.starts_with("invalid layout document: "), "{message}");
        assert!(message.contains(&format!("; as JSON5: {json5}")), "{message}");
    }
}
