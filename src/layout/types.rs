use std::collections::BTreeMap;

use serde::Serialize;

use crate::ir::{Lane, NodeKind};

/// Fixed footprint and BPMN identity of a node kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeShape {
    pub width: f32,
    pub height: f32,
    pub tag_name: &'static str,
    pub id_prefix: &'static str,
}

impl NodeShape {
    pub fn for_kind(kind: NodeKind) -> Self {
        let (width, height, tag_name, id_prefix) = match kind {
            NodeKind::Start => (36.0, 36.0, "bpmn:startEvent", "StartEvent"),
            NodeKind::End => (36.0, 36.0, "bpmn:endEvent", "EndEvent"),
            NodeKind::GatewayExclusive => (50.0, 50.0, "bpmn:exclusiveGateway", "Gateway"),
            NodeKind::Task => (120.0, 80.0, "bpmn:task", "Task"),
            NodeKind::UserTask => (130.0, 88.0, "bpmn:userTask", "UserTask"),
            NodeKind::ServiceTask => (130.0, 88.0, "bpmn:serviceTask", "ServiceTask"),
            NodeKind::BusinessRuleTask => {
                (130.0, 88.0, "bpmn:businessRuleTask", "BusinessRuleTask")
            }
            NodeKind::SubProcess => (190.0, 110.0, "bpmn:subProcess", "SubProcess"),
        };
        Self {
            width,
            height,
            tag_name,
            id_prefix,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// True when `point` lies on one of the four sides (within `eps`).
    pub fn touches(&self, point: (f32, f32), eps: f32) -> bool {
        let (px, py) = point;
        let inside_x = px >= self.x - eps && px <= self.right() + eps;
        let inside_y = py >= self.y - eps && py <= self.bottom() + eps;
        if !inside_x || !inside_y {
            return false;
        }
        (px - self.x).abs() <= eps
            || (px - self.right()).abs() <= eps
            || (py - self.y).abs() <= eps
            || (py - self.bottom()).abs() <= eps
    }

    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Placement of one node, keyed by its source id in [`GraphLayout::nodes`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutInfo {
    pub rendered_id: String,
    pub tag_name: &'static str,
    pub lane: Option<Lane>,
    pub order: usize,
    pub row: usize,
    pub column: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LayoutInfo {
    pub fn bounds(&self) -> Bounds {
        Bounds {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeLayout {
    pub flow_id: String,
    pub rendered_id: String,
    pub source: String,
    pub target: String,
    pub points: Vec<(f32, f32)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneLayout {
    pub lane: Lane,
    pub element_id: &'static str,
    pub bounds: Bounds,
    /// Rendered ids of member nodes, in traversal order.
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphLayout {
    /// Source ids in traversal order.
    pub order: Vec<String>,
    pub rows: usize,
    pub columns: usize,
    pub nodes: BTreeMap<String, LayoutInfo>,
    pub edges: Vec<EdgeLayout>,
    /// Empty for nested graphs, which are laid out in a single band.
    pub lanes: Vec<LaneLayout>,
    pub pool: Option<Bounds>,
    pub width: f32,
    pub height: f32,
    /// Child layouts of folded sub-processes, keyed by the parent's source id.
    pub nested: BTreeMap<String, GraphLayout>,
}

impl GraphLayout {
    pub fn node(&self, id: &str) -> Option<&LayoutInfo> {
        self.nodes.get(id)
    }

    pub fn edge(&self, flow_id: &str) -> Option<&EdgeLayout> {
        self.edges.iter().find(|edge| edge.flow_id == flow_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touches_only_the_outline() {
        let b = Bounds {
            x: 10.0,
            y: 10.0,
            width: 100.0,
            height: 50.0,
        };
        assert!(b.touches((10.0, 30.0), 0.5));
        assert!(b.touches((60.0, 60.0), 0.5));
        assert!(!b.touches((60.0, 30.0), 0.5));
        assert!(!b.touches((200.0, 10.0), 0.5));
    }

    #[test]
    fn task_variants_share_a_footprint() {
        let user = NodeShape::for_kind(NodeKind::UserTask);
        let service = NodeShape::for_kind(NodeKind::ServiceTask);
        assert_eq!((user.width, user.height), (service.width, service.height));
        assert_eq!(NodeShape::for_kind(NodeKind::Start).tag_name, "bpmn:startEvent");
    }
}
