use crate::ir::Lane;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneColor {
    pub fill: String,
    pub stroke: String,
}

/// Visual hints emitted through the non-normative BPMN color extension.
/// `lane_colors: None` keeps the document free of color attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub lane_colors: Option<[LaneColor; 4]>,
    pub loop_fill: Option<String>,
}

impl Theme {
    pub fn plain() -> Self {
        Self {
            lane_colors: None,
            loop_fill: None,
        }
    }

    pub fn lanes() -> Self {
        Self {
            lane_colors: Some([
                lane_color("#F4F8FF", "#7A8AA6"),
                lane_color("#F1FBF4", "#5E9C72"),
                lane_color("#FFF9EC", "#B8913A"),
                lane_color("#FDF1F1", "#B55D5D"),
            ]),
            loop_fill: Some("#EEF2F8".to_string()),
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "plain" | "none" => Some(Self::plain()),
            "lanes" | "default" => Some(Self::lanes()),
            _ => None,
        }
    }

    pub fn lane_color(&self, lane: Lane) -> Option<&LaneColor> {
        self.lane_colors.as_ref().map(|colors| &colors[lane.index()])
    }

    pub fn uses_color(&self) -> bool {
        self.lane_colors.is_some() || self.loop_fill.is_some()
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::lanes()
    }
}

fn lane_color(fill: &str, stroke: &str) -> LaneColor {
    LaneColor {
        fill: fill.to_string(),
        stroke: stroke.to_string(),
    }
}
