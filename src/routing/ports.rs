use std::collections::BTreeMap;

use log::{debug, trace};

use crate::ir::{ElementSizing, Layout};

use super::geometry::{angle_degrees, border_point_at_angle};
use super::types::PortAssignments;

// Sector layout
/// Number of angular sectors around an element border.
const SECTOR_COUNT: usize = 12;
/// Angular width of one sector in degrees.
const SECTOR_WIDTH: f32 = 360.0 / SECTOR_COUNT as f32;

#[derive(Debug, Clone)]
struct PortCandidate {
    connection_idx: usize,
    is_from: bool,
    angle: f32,
}

pub(super) fn sector_index(angle: f32) -> usize {
    let shifted = (angle + SECTOR_WIDTH / 2.0).rem_euclid(360.0);
    ((shifted / SECTOR_WIDTH) as usize).min(SECTOR_COUNT - 1)
}

pub(super) fn sector_start(sector: usize) -> f32 {
    sector as f32 * SECTOR_WIDTH - SECTOR_WIDTH / 2.0
}

/// Distribute attachment points around every element border.
///
/// Each connection end is binned into one of twelve 30° sectors by the
/// direction toward the opposite element; the `n` ends sharing a sector get
/// evenly spaced slots across it, in ascending angle order. Self-loops and
/// connections with an unplaced or unknown endpoint get no ports.
pub fn assign_ports(layout: &Layout, sizing: &dyn ElementSizing) -> PortAssignments {
    let mut assignments = PortAssignments::with_len(layout.connections.len());
    let mut groups: BTreeMap<(String, usize), Vec<PortCandidate>> = BTreeMap::new();

    for (idx, conn) in layout.connections.iter().enumerate() {
        if conn.is_self_loop() {
            continue;
        }
        let (Some(from), Some(to)) = (
            layout.element_bounds(&conn.from, sizing),
            layout.element_bounds(&conn.to, sizing),
        ) else {
            debug!(
                from = conn.from.as_str(),
                to = conn.to.as_str();
                "skipping ports for unplaced connection"
            );
            continue;
        };
        let from_center = from.center();
        let to_center = to.center();
        let from_angle = angle_degrees(from_center, to_center);
        let to_angle = angle_degrees(to_center, from_center);
        groups
            .entry((conn.from.clone(), sector_index(from_angle)))
            .or_default()
            .push(PortCandidate {
                connection_idx: idx,
                is_from: true,
                angle: from_angle,
            });
        groups
            .entry((conn.to.clone(), sector_index(to_angle)))
            .or_default()
            .push(PortCandidate {
                connection_idx: idx,
                is_from: false,
                angle: to_angle,
            });
    }

    for ((element_id, sector), mut candidates) in groups {
        let Some(rect) = layout.element_bounds(&element_id, sizing) else {
            continue;
        };
        let start = sector_start(sector);
        // Sector 0 wraps around 0°, so order by offset from the sector start.
        candidates.sort_by(|a, b| {
            let rel_a = (a.angle - start).rem_euclid(360.0);
            let rel_b = (b.angle - start).rem_euclid(360.0);
            rel_a
                .total_cmp(&rel_b)
                .then_with(|| a.connection_idx.cmp(&b.connection_idx))
                .then_with(|| b.is_from.cmp(&a.is_from))
        });
        let n = candidates.len();
        for (slot, candidate) in candidates.iter().enumerate() {
            let slot_angle = start + SECTOR_WIDTH * (slot + 1) as f32 / (n + 1) as f32;
            let point = border_point_at_angle(&rect, slot_angle);
            assignments.set(candidate.connection_idx, candidate.is_from, point);
        }
        trace!(element = element_id.as_str(), sector = sector, ports = n; "assigned sector ports");
    }

    assignments
}
