use crate::ir::{Element, ElementSizing, Layout, element_rect};

use super::types::{Point, Rect};

/// Below this chord length, curve constructions collapse to the midpoint.
pub(super) const MIN_CHORD: f32 = 1.0;

pub(super) fn angle_degrees(from: Point, to: Point) -> f32 {
    // Screen Y grows downward; flip it so 90° points up.
    let deg = (-(to.y - from.y)).atan2(to.x - from.x).to_degrees();
    deg.rem_euclid(360.0)
}

pub(super) fn direction_from_degrees(deg: f32) -> (f32, f32) {
    let rad = deg.to_radians();
    (rad.cos(), -rad.sin())
}

/// Unit normal of the chord `a -> b`, or `None` for a degenerate chord.
pub(super) fn chord_normal(a: Point, b: Point) -> Option<(f32, f32)> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len < MIN_CHORD {
        return None;
    }
    Some((-dy / len, dx / len))
}

/// First edge of `rect` hit by the ray `origin + t * dir` with `t > 0`.
pub(super) fn ray_rect_intersection(origin: Point, dir: (f32, f32), rect: &Rect) -> Option<Point> {
    let corners = [
        Point::new(rect.x, rect.y),
        Point::new(rect.right(), rect.y),
        Point::new(rect.right(), rect.bottom()),
        Point::new(rect.x, rect.bottom()),
    ];
    let (rx, ry) = dir;
    let mut best_t: Option<f32> = None;
    for i in 0..corners.len() {
        let p1 = corners[i];
        let p2 = corners[(i + 1) % corners.len()];
        let sx = p2.x - p1.x;
        let sy = p2.y - p1.y;
        let qx = p1.x - origin.x;
        let qy = p1.y - origin.y;
        let denom = rx * sy - ry * sx;
        if denom.abs() < 1e-6 {
            continue;
        }
        let t = (qx * sy - qy * sx) / denom;
        let u = (qx * ry - qy * rx) / denom;
        if t > 1e-6 && (-1e-6..=1.0 + 1e-6).contains(&u) {
            match best_t {
                Some(best) if t >= best => {}
                _ => best_t = Some(t),
            }
        }
    }
    best_t.map(|t| Point::new(origin.x + rx * t, origin.y + ry * t))
}

/// Where a ray from the rect's center at `deg` leaves the rect; the center
/// itself when nothing is hit.
pub(super) fn border_point_at_angle(rect: &Rect, deg: f32) -> Point {
    let center = rect.center();
    ray_rect_intersection(center, direction_from_degrees(deg), rect).unwrap_or(center)
}

/// Crossing of the line from the rect's center toward `toward` with the
/// rect border, pushed `extension` further out along the same line.
pub(super) fn border_crossing(rect: &Rect, toward: Point, extension: f32) -> Point {
    let center = rect.center();
    let dx = toward.x - center.x;
    let dy = toward.y - center.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-6 {
        return center;
    }
    let dir = (dx / len, dy / len);
    let hit = ray_rect_intersection(center, dir, rect).unwrap_or(center);
    Point::new(hit.x + dir.0 * extension, hit.y + dir.1 * extension)
}

/// Attachment point of `element` for a connection heading toward `far`.
///
/// Plain elements attach at their center. Containers dock at the
/// border-scoped child nearest to `far`, or else at their border crossing.
pub(super) fn connection_point(
    layout: &Layout,
    element: &Element,
    far: Point,
    sizing: &dyn ElementSizing,
    extension: f32,
) -> Option<Point> {
    let rect = element_rect(element, sizing)?;
    if !element.is_container() {
        return Some(rect.center());
    }

    let docking = element
        .children
        .iter()
        .filter(|child| child.is_border())
        .filter_map(|child| layout.element_bounds(&child.id, sizing))
        .map(|bounds| bounds.center())
        .min_by(|a, b| a.distance(far).total_cmp(&b.distance(far)));
    if let Some(point) = docking {
        return Some(point);
    }
    Some(border_crossing(&rect, far, extension))
}

/// True when the open segment `a -> b` passes through the open interior of `rect`.
pub fn segment_crosses_interior(a: Point, b: Point, rect: &Rect) -> bool {
    // Liang-Barsky clip against the box, then test the clipped midpoint.
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let mut t0 = 0.0f32;
    let mut t1 = 1.0f32;
    let checks = [
        (-dx, a.x - rect.x),
        (dx, rect.right() - a.x),
        (-dy, a.y - rect.y),
        (dy, rect.bottom() - a.y),
    ];
    for (p, q) in checks {
        if p.abs() < 1e-9 {
            if q <= 0.0 {
                return false;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return false;
        }
    }
    if t1 - t0 < 1e-6 {
        return false;
    }
    let tm = (t0 + t1) / 2.0;
    rect.contains_strict(Point::new(a.x + dx * tm, a.y + dy * tm))
}

/// Drop repeated points and interior points collinear with both neighbours.
pub(super) fn simplify_collinear(points: &[Point]) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for &point in points {
        if out.last().is_some_and(|last| last.approx_eq(point)) {
            continue;
        }
        if out.len() >= 2 {
            let prev = out[out.len() - 2];
            let curr = out[out.len() - 1];
            let cross =
                (curr.x - prev.x) * (point.y - curr.y) - (curr.y - prev.y) * (point.x - curr.x);
            if cross.abs() <= 1e-3 {
                out.pop();
            }
        }
        out.push(point);
    }
    out
}

/// Join route legs, dropping the duplicated joint between consecutive legs.
pub(super) fn concat_legs(legs: Vec<Vec<Point>>) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::new();
    for leg in legs {
        for point in leg {
            if out.last().is_some_and(|last| last.approx_eq(point)) {
                continue;
            }
            out.push(point);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ChildRef, ScaledSizing};
    use float_cmp::approx_eq;

    #[test]
    fn angles_follow_screen_convention() {
        let origin = Point::new(0.0, 0.0);
        assert!(approx_eq!(f32, angle_degrees(origin, Point::new(10.0, 0.0)), 0.0));
        assert!(approx_eq!(f32, angle_degrees(origin, Point::new(0.0, -10.0)), 90.0));
        assert!(approx_eq!(f32, angle_degrees(origin, Point::new(-10.0, 0.0)), 180.0));
        assert!(approx_eq!(f32, angle_degrees(origin, Point::new(0.0, 10.0)), 270.0));
    }

    #[test]
    fn border_point_hits_each_side() {
        let rect = Rect::new("a", 0.0, 0.0, 80.0, 40.0);
        let right = border_point_at_angle(&rect, 0.0);
        assert!(approx_eq!(f32, right.x, 80.0, epsilon = 1e-3));
        assert!(approx_eq!(f32, right.y, 20.0, epsilon = 1e-3));
        let top = border_point_at_angle(&rect, 90.0);
        assert!(approx_eq!(f32, top.x, 40.0, epsilon = 1e-3));
        assert!(approx_eq!(f32, top.y, 0.0, epsilon = 1e-3));
    }

    #[test]
    fn border_crossing_extends_outward() {
        let rect = Rect::new("c", 0.0, 0.0, 100.0, 100.0);
        let point = border_crossing(&rect, Point::new(300.0, 50.0), 15.0);
        assert!(approx_eq!(f32, point.x, 115.0, epsilon = 1e-3));
        assert!(approx_eq!(f32, point.y, 50.0, epsilon = 1e-3));
        let degenerate = border_crossing(&rect, Point::new(50.0, 50.0), 15.0);
        assert_eq!(degenerate, Point::new(50.0, 50.0));
    }

    #[test]
    fn container_docks_at_nearest_border_child() {
        let layout = Layout::new(
            vec![
                crate::ir::Element::new("box")
                    .at(0.0, 0.0)
                    .sized(200.0, 100.0)
                    .with_child(ChildRef::border("west"))
                    .with_child(ChildRef::border("east")),
                crate::ir::Element::new("west").at(-5.0, 45.0).sized(10.0, 10.0),
                crate::ir::Element::new("east").at(195.0, 45.0).sized(10.0, 10.0),
            ],
            Vec::new(),
        );
        let sizing = ScaledSizing::default();
        let container = layout.element("box").unwrap();
        let point = connection_point(&layout, container, Point::new(500.0, 50.0), &sizing, 15.0);
        assert_eq!(point, Some(Point::new(200.0, 50.0)));
    }

    #[test]
    fn segment_interior_test_ignores_boundary_contact() {
        let rect = Rect::new("o", 0.0, 0.0, 10.0, 10.0);
        assert!(segment_crosses_interior(Point::new(-5.0, 5.0), Point::new(15.0, 5.0), &rect));
        assert!(!segment_crosses_interior(Point::new(-5.0, 0.0), Point::new(15.0, 0.0), &rect));
        assert!(!segment_crosses_interior(Point::new(-5.0, 20.0), Point::new(15.0, 20.0), &rect));
        assert!(segment_crosses_interior(Point::new(-5.0, -5.0), Point::new(15.0, 15.0), &rect));
    }

    #[test]
    fn simplify_drops_collinear_and_duplicate_points() {
        let points = [
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
        ];
        assert_eq!(
            simplify_collinear(&points),
            vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(10.0, 10.0)]
        );
    }
}
