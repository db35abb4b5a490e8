use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrthogonalConfig {
    /// Margin added around every element before it becomes an obstacle.
    /// Kept larger than the separation spacing so fanned-out segments stay clear.
    pub obstacle_margin: f32,
    /// Extra cost charged whenever a path changes axis.
    pub bend_penalty: f32,
    /// Scale of the penalty for edges running close to an obstacle.
    pub proximity_weight: f32,
    /// Distance at which the proximity penalty vanishes.
    pub proximity_range: f32,
    /// How far container crossings are pushed outside the border.
    pub border_extension: f32,
    /// Upper bound on visibility-graph nodes before falling back to midpoint routing.
    pub max_grid_nodes: usize,
}

impl Default for OrthogonalConfig {
    fn default() -> Self {
        Self {
            obstacle_margin: 25.0,
            bend_penalty: 40.0,
            proximity_weight: 0.8,
            proximity_range: 50.0,
            border_extension: 15.0,
            max_grid_nodes: 100_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeparationConfig {
    pub spacing: f32,
    /// Axis tolerance for classifying segments; also the bucket size.
    pub tolerance: f32,
}

impl Default for SeparationConfig {
    fn default() -> Self {
        Self {
            spacing: 10.0,
            tolerance: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveConfig {
    pub default_curvature: f32,
    pub default_radius: f32,
    pub self_loop_half_span: f32,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            default_curvature: 0.5,
            default_radius: 50.0,
            self_loop_half_span: 20.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingConfig {
    pub default_width: f32,
    pub default_height: f32,
    pub unit_width: f32,
    pub unit_height: f32,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            default_width: 120.0,
            default_height: 60.0,
            unit_width: 100.0,
            unit_height: 50.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouterConfig {
    pub orthogonal: OrthogonalConfig,
    pub separation: SeparationConfig,
    pub curves: CurveConfig,
    pub sizing: SizingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrthogonalConfigFile {
    obstacle_margin: Option<f32>,
    bend_penalty: Option<f32>,
    proximity_weight: Option<f32>,
    proximity_range: Option<f32>,
    border_extension: Option<f32>,
    max_grid_nodes: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeparationConfigFile {
    spacing: Option<f32>,
    tolerance: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurveConfigFile {
    default_curvature: Option<f32>,
    default_radius: Option<f32>,
    self_loop_half_span: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SizingConfigFile {
    default_width: Option<f32>,
    default_height: Option<f32>,
    unit_width: Option<f32>,
    unit_height: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    orthogonal: Option<OrthogonalConfigFile>,
    separation: Option<SeparationConfigFile>,
    curves: Option<CurveConfigFile>,
    sizing: Option<SizingConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<RouterConfig> {
    let Some(path) = path else {
        return Ok(RouterConfig::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Overlay a JSON (or JSON5) config document onto the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<RouterConfig> {
    let parsed: ConfigFile = match serde_json::from_str(contents) {
        Ok(parsed) => parsed,
        Err(json_err) => json5::from_str(contents).map_err(|json5_err| {
            anyhow::anyhow!("invalid router config: {json_err}; as JSON5: {json5_err}")
        })?,
    };
    let mut config = RouterConfig::default();

    if let Some(file) = parsed.orthogonal {
        let target = &mut config.orthogonal;
        if let Some(v) = file.obstacle_margin {
            target.obstacle_margin = v.max(0.0);
        }
        if let Some(v) = file.bend_penalty {
            target.bend_penalty = v.max(0.0);
        }
        if let Some(v) = file.proximity_weight {
            target.proximity_weight = v.max(0.0);
        }
        if let Some(v) = file.proximity_range {
            target.proximity_range = v.max(0.0);
        }
        if let Some(v) = file.border_extension {
            target.border_extension = v.max(0.0);
        }
        if let Some(v) = file.max_grid_nodes {
            target.max_grid_nodes = v;
        }
    }

    if let Some(file) = parsed.separation {
        if let Some(v) = file.spacing {
            config.separation.spacing = v.max(0.0);
        }
        if let Some(v) = file.tolerance {
            config.separation.tolerance = v.max(0.0);
        }
    }

    if let Some(file) = parsed.curves {
        if let Some(v) = file.default_curvature {
            config.curves.default_curvature = v.clamp(0.0, 1.0);
        }
        if let Some(v) = file.default_radius {
            config.curves.default_radius = v.max(0.0);
        }
        if let Some(v) = file.self_loop_half_span {
            config.curves.self_loop_half_span = v.max(0.0);
        }
    }

    if let Some(file) = parsed.sizing {
        if let Some(v) = file.default_width {
            config.sizing.default_width = v.max(0.0);
        }
        if let Some(v) = file.default_height {
            config.sizing.default_height = v.max(0.0);
        }
        if let Some(v) = file.unit_width {
            config.sizing.unit_width = v.max(0.0);
        }
        if let Some(v) = file.unit_height {
            config.sizing.unit_height = v.max(0.0);
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_margin_above_separation_spacing() {
        let config = RouterConfig::default();
        assert_eq!(config.orthogonal.obstacle_margin, 25.0);
        assert_eq!(config.orthogonal.bend_penalty, 40.0);
        assert!(config.orthogonal.obstacle_margin > config.separation.spacing);
    }

    #[test]
    fn overlays_partial_json_file() {
        let config =
            parse_config(r#"{"orthogonal": {"bendPenalty": 10}, "separation": {"spacing": 6}}"#)
                .unwrap();
        assert_eq!(config.orthogonal.bend_penalty, 10.0);
        assert_eq!(config.orthogonal.obstacle_margin, 25.0);
        assert_eq!(config.separation.spacing, 6.0);
    }

    #[test]
    fn accepts_json5_and_clamps_values() {
        let config =
            parse_config("{ curves: { defaultCurvature: 3.5, defaultRadius: -4 }, }").unwrap();
        assert_eq!(config.curves.default_curvature, 1.0);
        assert_eq!(config.curves.default_radius, 0.0);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_config("not a config").is_err());
    }

    #[test]
    fn invalid_config_reports_both_parsers() {
        let message = parse_config("{orthogonal: {bendPenalty: }}")
            .unwrap_err()
            .to_string();
        assert!(message.starts_with("invalid router config: "), "{message}");
        assert!(message.contains("; as JSON5: "), "{message}");
    }

    #[test]
    fn missing_path_uses_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.curves.default_radius, 50.0);
    }
}
