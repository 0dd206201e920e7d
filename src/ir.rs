use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Node kinds a candidate draft may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftNodeKind {
    Start,
    Task,
    GatewayExclusive,
    End,
}

impl DraftNodeKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "start" => Some(Self::Start),
            "task" => Some(Self::Task),
            "gateway_exclusive" | "gatewayExclusive" => Some(Self::GatewayExclusive),
            "end" => Some(Self::End),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: DraftNodeKind,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftFlow {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Normalized candidate: ids are slug-safe and unique, references resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftGraph {
    pub process_name: String,
    pub nodes: Vec<DraftNode>,
    pub flows: Vec<DraftFlow>,
}

/// Every kind the compiler can emit. Adding a variant forces the classifier,
/// layout and renderer matches to be revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Start,
    End,
    GatewayExclusive,
    Task,
    UserTask,
    ServiceTask,
    BusinessRuleTask,
    SubProcess,
}

impl NodeKind {
    pub fn is_task(self) -> bool {
        match self {
            NodeKind::Task | NodeKind::UserTask | NodeKind::ServiceTask | NodeKind::BusinessRuleTask => {
                true
            }
            NodeKind::Start | NodeKind::End | NodeKind::GatewayExclusive | NodeKind::SubProcess => {
                false
            }
        }
    }

    /// Start, end and gateways: they borrow their lane from neighbours.
    pub fn is_control(self) -> bool {
        matches!(self, NodeKind::Start | NodeKind::End | NodeKind::GatewayExclusive)
    }
}

impl From<DraftNodeKind> for NodeKind {
    fn from(kind: DraftNodeKind) -> Self {
        match kind {
            DraftNodeKind::Start => NodeKind::Start,
            DraftNodeKind::Task => NodeKind::Task,
            DraftNodeKind::GatewayExclusive => NodeKind::GatewayExclusive,
            DraftNodeKind::End => NodeKind::End,
        }
    }
}

/// Organizational swim lanes, in top-to-bottom stacking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Lane {
    Operational,
    Automation,
    Management,
    Executive,
}

impl Lane {
    pub const ALL: [Lane; 4] = [
        Lane::Operational,
        Lane::Automation,
        Lane::Management,
        Lane::Executive,
    ];

    pub fn index(self) -> usize {
        match self {
            Lane::Operational => 0,
            Lane::Automation => 1,
            Lane::Management => 2,
            Lane::Executive => 3,
        }
    }

    pub fn element_id(self) -> &'static str {
        match self {
            Lane::Operational => "Lane_Operational",
            Lane::Automation => "Lane_Automation",
            Lane::Management => "Lane_Management",
            Lane::Executive => "Lane_Executive",
        }
    }

    /// Most frequent lane in `lanes`; ties go to the lane seen first.
    pub fn most_frequent(lanes: impl IntoIterator<Item = Lane>) -> Option<Lane> {
        let mut counts: Vec<(Lane, usize)> = Vec::new();
        for lane in lanes {
            match counts.iter_mut().find(|(seen, _)| *seen == lane) {
                Some((_, count)) => *count += 1,
                None => counts.push((lane, 1)),
            }
        }
        let mut best: Option<(Lane, usize)> = None;
        for (lane, count) in counts {
            if best.map(|(_, top)| count > top).unwrap_or(true) {
                best = Some((lane, count));
            }
        }
        best.map(|(lane, _)| lane)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Lane::Operational => "Operacional",
            Lane::Automation => "Automação",
            Lane::Management => "Gestão",
            Lane::Executive => "Executivo",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderNode {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub lane: Option<Lane>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Box<RenderGraph>>,
    pub loop_marker: bool,
}

impl RenderNode {
    pub fn new(id: impl Into<String>, kind: NodeKind, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            label: label.into(),
            lane: None,
            children: None,
            loop_marker: false,
        }
    }

    pub fn with_lane(mut self, lane: Lane) -> Self {
        self.lane = Some(lane);
        self
    }
}

/// Classified graph fed to layout. Folded sub-processes nest another
/// `RenderGraph` in `RenderNode::children`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderGraph {
    pub process_name: String,
    pub nodes: Vec<RenderNode>,
    pub flows: Vec<DraftFlow>,
}

impl RenderGraph {
    pub fn node(&self, id: &str) -> Option<&RenderNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn start_node(&self) -> Option<&RenderNode> {
        self.nodes.iter().find(|node| node.kind == NodeKind::Start)
    }

    pub fn flow_ids(&self) -> HashSet<String> {
        self.flows.iter().map(|flow| flow.id.clone()).collect()
    }

    pub fn node_ids(&self) -> HashSet<String> {
        self.nodes.iter().map(|node| node.id.clone()).collect()
    }
}

/// Longest id the normalizer emits, suffixes included.
pub const MAX_ID_LEN: usize = 40;

/// Lowercases and maps everything outside `[a-z0-9_-]` to `_`, trims leading
/// and trailing underscores and caps the result at [`MAX_ID_LEN`] chars. Falls back to
/// `fallback` when nothing survives.
pub fn slugify(value: &str, fallback: &str) -> String {
    let mapped: String = value
        .to_lowercase()
        .chars()
        .map(|ch| {
            if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' || ch == '-' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cap_id(mapped.trim_matches('_'), MAX_ID_LEN);
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed
    }
}

// Truncation can expose a trailing `_`; trim again so the result stays a fixed point.
fn cap_id(value: &str, max: usize) -> String {
    let capped: String = value.chars().take(max).collect();
    capped.trim_end_matches('_').to_string()
}

/// Claims `candidate` in `used`, appending `_1`, `_2`, ... on collision.
/// The stem is shortened so the suffixed id still fits in [`MAX_ID_LEN`].
pub fn ensure_unique_id(candidate: &str, used: &mut HashSet<String>) -> String {
    let base = cap_id(candidate, MAX_ID_LEN);
    let mut next = base.clone();
    let mut suffix = 1usize;
    while used.contains(&next) {
        let tail = format!("_{suffix}");
        let stem = cap_id(&base, MAX_ID_LEN.saturating_sub(tail.len()));
        next = format!("{stem}{tail}");
        suffix += 1;
    }
    used.insert(next.clone());
    next
}
