use std::collections::BTreeMap;

use log::trace;

use crate::config::SeparationConfig;
use crate::ir::Connection;

use super::types::PathKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy)]
struct SegmentRef {
    connection_idx: usize,
    /// Index of the segment's first point.
    point_idx: usize,
    range_start: f32,
    range_end: f32,
}

/// Fan out polyline segments that run on top of each other.
///
/// Axis-aligned segments are bucketed by orientation and by their fixed
/// coordinate snapped to the tolerance grid. Inside a bucket, segments whose
/// ranges overlap form a cluster; a cluster of `n` members shifts member `i`
/// (by range start) by `(i - (n - 1) / 2) * spacing` across its axis.
/// Returns the number of segments moved.
pub fn separate_parallel_segments(
    connections: &mut [Connection],
    config: &SeparationConfig,
) -> usize {
    let tolerance = config.tolerance.max(1e-3);
    let spacing = config.spacing.max(0.0);

    let mut buckets: BTreeMap<(Orientation, i64), Vec<SegmentRef>> = BTreeMap::new();
    for (connection_idx, conn) in connections.iter().enumerate() {
        let Some(path) = conn.path.as_ref() else {
            continue;
        };
        if path.kind != PathKind::Polyline {
            continue;
        }
        for (point_idx, seg) in path.points.windows(2).enumerate() {
            let (a, b) = (seg[0], seg[1]);
            let dx = (b.x - a.x).abs();
            let dy = (b.y - a.y).abs();
            let (orientation, fixed, lo, hi) = if dx < tolerance && dy >= tolerance {
                (Orientation::Vertical, a.x, a.y.min(b.y), a.y.max(b.y))
            } else if dy < tolerance && dx >= tolerance {
                (Orientation::Horizontal, a.y, a.x.min(b.x), a.x.max(b.x))
            } else {
                continue;
            };
            let key = (orientation, (fixed / tolerance).round() as i64);
            buckets.entry(key).or_default().push(SegmentRef {
                connection_idx,
                point_idx,
                range_start: lo,
                range_end: hi,
            });
        }
    }

    let mut shifts: Vec<(Orientation, SegmentRef, f32)> = Vec::new();
    for ((orientation, _), mut segments) in buckets {
        segments.sort_by(|a, b| a.range_start.total_cmp(&b.range_start));
        for cluster in overlap_clusters(&segments) {
            let n = cluster.len();
            if n < 2 {
                continue;
            }
            let center = (n - 1) as f32 / 2.0;
            for (i, segment) in cluster.iter().enumerate() {
                shifts.push((orientation, *segment, (i as f32 - center) * spacing));
            }
        }
    }

    for (orientation, segment, offset) in &shifts {
        let Some(path) = connections[segment.connection_idx].path.as_mut() else {
            continue;
        };
        for idx in [segment.point_idx, segment.point_idx + 1] {
            let Some(point) = path.points.get_mut(idx) else {
                continue;
            };
            match orientation {
                Orientation::Vertical => point.x += offset,
                Orientation::Horizontal => point.y += offset,
            }
        }
    }

    if !shifts.is_empty() {
        trace!(segments = shifts.len(); "separated parallel segments");
    }
    shifts.len()
}

/// Greedy sweep over segments sorted by range start.
fn overlap_clusters(segments: &[SegmentRef]) -> Vec<&[SegmentRef]> {
    let mut clusters = Vec::new();
    let mut begin = 0usize;
    let mut max_end = f32::NEG_INFINITY;
    for (idx, segment) in segments.iter().enumerate() {
        if idx > begin && segment.range_start >= max_end {
            clusters.push(&segments[begin..idx]);
            begin = idx;
            max_end = f32::NEG_INFINITY;
        }
        max_end = max_end.max(segment.range_end);
    }
    if begin < segments.len() {
        clusters.push(&segments[begin..]);
    }
    clusters
}
