use crate::ir::Layout;
use crate::routing::{RouteReport, path_bend_count, path_length};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct RoutingDump {
    pub routed: usize,
    pub skipped: usize,
    pub separated: usize,
    pub total_length: f32,
    pub total_bends: usize,
    pub connections: Vec<ConnectionDump>,
}

#[derive(Debug, Serialize)]
pub struct ConnectionDump {
    pub from: String,
    pub to: String,
    /// `None` when the connection was skipped.
    pub kind: Option<String>,
    pub points: Vec<[f32; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_points: Option<[[f32; 2]; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arc: Option<ArcDump>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_port: Option<[f32; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_port: Option<[f32; 2]>,
    pub length: f32,
    pub bends: usize,
}

#[derive(Debug, Serialize)]
pub struct ArcDump {
    pub center: [f32; 2],
    pub radius: f32,
}

impl RoutingDump {
    pub fn from_layout(layout: &Layout, report: &RouteReport) -> Self {
        let connections: Vec<ConnectionDump> = layout
            .connections
            .iter()
            .map(|conn| {
                let path = conn.path.as_ref();
                let points: Vec<[f32; 2]> = path
                    .map(|p| p.points.iter().map(|pt| [pt.x, pt.y]).collect())
                    .unwrap_or_default();
                let ports = conn.ports.unwrap_or_default();
                ConnectionDump {
                    from: conn.from.clone(),
                    to: conn.to.clone(),
                    kind: path.map(|p| format!("{:?}", p.kind).to_lowercase()),
                    control_points: path
                        .and_then(|p| p.control_points)
                        .map(|[a, b]| [[a.x, a.y], [b.x, b.y]]),
                    arc: path.and_then(|p| match (p.center, p.radius) {
                        (Some(center), Some(radius)) => Some(ArcDump {
                            center: [center.x, center.y],
                            radius,
                        }),
                        _ => None,
                    }),
                    corner_radius: path.and_then(|p| p.corner_radius),
                    from_port: ports.from.map(|pt| [pt.x, pt.y]),
                    to_port: ports.to.map(|pt| [pt.x, pt.y]),
                    length: path.map(|p| path_length(&p.points)).unwrap_or(0.0),
                    bends: path.map(|p| path_bend_count(&p.points)).unwrap_or(0),
                    points,
                }
            })
            .collect();

        RoutingDump {
            routed: report.routed,
            skipped: report.skipped,
            separated: report.separated,
            total_length: connections.iter().map(|c| c.length).sum(),
            total_bends: connections.iter().map(|c| c.bends).sum(),
            connections,
        }
    }
}

/// Write the dump as JSON to `path`, or to stdout when `path` is `None`.
pub fn write_routing_dump(
    path: Option<&Path>,
    layout: &Layout,
    report: &RouteReport,
    pretty: bool,
) -> anyhow::Result<()> {
    let dump = RoutingDump::from_layout(layout, report);
    let mut writer: BufWriter<Box<dyn Write>> = match path {
        Some(path) => BufWriter::new(Box::new(File::create(path)?)),
        None => BufWriter::new(Box::new(std::io::stdout().lock())),
    };
    if pretty {
        serde_json::to_writer_pretty(&mut writer, &dump)?;
    } else {
        serde_json::to_writer(&mut writer, &dump)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
