use crate::error::DraftError;
use crate::rules::RuleSet;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;

pub const DEFAULT_POLICY_VERSION: &str = "draft-bpmn-policy-v1";
pub const DEFAULT_PROVIDER: &str = "gemini";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

const MAX_NODES_RANGE: RangeInclusive<usize> = 4..=40;
const MAX_FLOWS_RANGE: RangeInclusive<usize> = 3..=80;
const MAX_RESPONSE_BYTES_RANGE: RangeInclusive<usize> = 2000..=100_000;
/// Half the smallest footprint (36px events). A wider tolerance lets the
/// straight routes leave the target outline.
const ROUTE_TOLERANCE_RANGE: RangeInclusive<f32> = 0.0..=18.0;

/// Caller-negotiated bounds on a single candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftLimits {
    pub max_nodes: usize,
    pub max_flows: usize,
    pub max_response_bytes: usize,
}

impl Default for DraftLimits {
    fn default() -> Self {
        Self {
            max_nodes: 24,
            max_flows: 40,
            max_response_bytes: 30_000,
        }
    }
}

impl DraftLimits {
    pub fn validate(&self) -> Result<(), DraftError> {
        check_range("maxNodes", self.max_nodes, MAX_NODES_RANGE)?;
        check_range("maxFlows", self.max_flows, MAX_FLOWS_RANGE)?;
        check_range(
            "maxResponseBytes",
            self.max_response_bytes,
            MAX_RESPONSE_BYTES_RANGE,
        )
    }
}

fn check_range(name: &str, value: usize, range: RangeInclusive<usize>) -> Result<(), DraftError> {
    if range.contains(&value) {
        return Ok(());
    }
    Err(DraftError::InvalidLimits(format!(
        "{name} must be between {} and {} (got {value})",
        range.start(),
        range.end()
    )))
}

/// Grid geometry for the serpentine layout. Footprints per node kind are fixed
/// and live in the layout module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub origin_x: f32,
    pub origin_y: f32,
    pub pool_header_width: f32,
    pub lane_padding_x: f32,
    pub column_pitch: f32,
    pub slot_width: f32,
    pub row_height: f32,
    pub route_tolerance: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            origin_x: 100.0,
            origin_y: 60.0,
            pool_header_width: 30.0,
            lane_padding_x: 40.0,
            column_pitch: 230.0,
            slot_width: 190.0,
            row_height: 140.0,
            route_tolerance: 4.0,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<(), DraftError> {
        if ROUTE_TOLERANCE_RANGE.contains(&self.route_tolerance) {
            return Ok(());
        }
        Err(DraftError::InvalidLayout(format!(
            "routeTolerance must be between {} and {} (got {})",
            ROUTE_TOLERANCE_RANGE.start(),
            ROUTE_TOLERANCE_RANGE.end(),
            self.route_tolerance
        )))
    }
}

#[derive(Debug, Clone)]
pub struct CompilerConfig {
    pub limits: DraftLimits,
    pub layout: LayoutConfig,
    pub theme: Theme,
    pub rules: RuleSet,
    pub policy_version: String,
    pub provider: String,
    pub model: String,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            limits: DraftLimits::default(),
            layout: LayoutConfig::default(),
            theme: Theme::lanes(),
            rules: RuleSet::default(),
            policy_version: DEFAULT_POLICY_VERSION.to_string(),
            provider: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    limits: Option<LimitsFile>,
    layout: Option<LayoutFile>,
    theme: Option<String>,
    rules: Option<RuleSet>,
    policy_version: Option<String>,
    provider: Option<String>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LimitsFile {
    max_nodes: Option<usize>,
    max_flows: Option<usize>,
    max_response_bytes: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutFile {
    origin_x: Option<f32>,
    origin_y: Option<f32>,
    pool_header_width: Option<f32>,
    lane_padding_x: Option<f32>,
    column_pitch: Option<f32>,
    slot_width: Option<f32>,
    row_height: Option<f32>,
    route_tolerance: Option<f32>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<CompilerConfig> {
    let Some(path) = path else {
        return Ok(CompilerConfig::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<CompilerConfig> {
    let mut config = CompilerConfig::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        config.theme = Theme::by_name(theme_name)
            .ok_or_else(|| anyhow::anyhow!("unknown theme '{theme_name}'"))?;
    }

    if let Some(limits) = parsed.limits {
        if let Some(v) = limits.max_nodes {
            config.limits.max_nodes = v;
        }
        if let Some(v) = limits.max_flows {
            config.limits.max_flows = v;
        }
        if let Some(v) = limits.max_response_bytes {
            config.limits.max_response_bytes = v;
        }
    }

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.origin_x {
            config.layout.origin_x = v;
        }
        if let Some(v) = layout.origin_y {
            config.layout.origin_y = v;
        }
        if let Some(v) = layout.pool_header_width {
            config.layout.pool_header_width = v;
        }
        if let Some(v) = layout.lane_padding_x {
            config.layout.lane_padding_x = v;
        }
        if let Some(v) = layout.column_pitch {
            config.layout.column_pitch = v;
        }
        if let Some(v) = layout.slot_width {
            config.layout.slot_width = v;
        }
        if let Some(v) = layout.row_height {
            config.layout.row_height = v;
        }
        if let Some(v) = layout.route_tolerance {
            config.layout.route_tolerance = v;
        }
    }

    if let Some(rules) = parsed.rules {
        config.rules = rules;
    }
    if let Some(v) = parsed.policy_version {
        config.policy_version = v.trim().to_string();
    }
    if let Some(v) = parsed.provider {
        config.provider = v;
    }
    if let Some(v) = parsed.model {
        config.model = v;
    }

    config.limits.validate()?;
    config.layout.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits_are_valid() {
        assert!(DraftLimits::default().validate().is_ok());
    }

    #[test]
    fn limits_outside_bounds_are_rejected() {
        let limits = DraftLimits {
            max_nodes: 41,
            ..Default::default()
        };
        let err = limits.validate().unwrap_err();
        assert!(err.to_string().contains("maxNodes"));

        let limits = DraftLimits {
            max_flows: 2,
            ..Default::default()
        };
        assert!(limits.validate().is_err());
    }

    #[test]
    fn config_file_overrides_defaults() {
        let config = parse_config(
            r#"{
                "limits": { "maxNodes": 30 },
                "layout": { "rowHeight": 160 },
                "theme": "plain",
                "model": "gemini-2.0-flash"
            }"#,
        )
        .unwrap();
        assert_eq!(config.limits.max_nodes, 30);
        assert_eq!(config.limits.max_flows, 40);
        assert_eq!(config.layout.row_height, 160.0);
        assert_eq!(config.model, "gemini-2.0-flash");
        assert!(config.theme.lane_colors.is_none());
    }

    #[test]
    fn route_tolerance_is_bounded_by_the_smallest_footprint() {
        assert!(LayoutConfig::default().validate().is_ok());
        for tolerance in [0.0, 18.0] {
            let layout = LayoutConfig {
                route_tolerance: tolerance,
                ..Default::default()
            };
            assert!(layout.validate().is_ok());
        }
        for tolerance in [-1.0, 18.5, f32::NAN] {
            let layout = LayoutConfig {
                route_tolerance: tolerance,
                ..Default::default()
            };
            let err = layout.validate().unwrap_err();
            assert!(matches!(err, DraftError::InvalidLayout(_)));
            assert!(err.to_string().contains("routeTolerance"));
        }
        assert!(parse_config(r#"{ "layout": { "routeTolerance": 40 } }"#).is_err());
    }

    #[test]
    fn config_file_with_bad_limits_fails() {
        assert!(parse_config(r#"{ "limits": { "maxNodes": 100 } }"#).is_err());
        assert!(parse_config(r#"{ "theme": "neon" }"#).is_err());
    }
}
