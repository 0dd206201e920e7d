use crate::config::DraftLimits;
use crate::error::{SchemaError, SchemaErrorKind};
use crate::ir::{DraftFlow, DraftGraph, DraftNode, DraftNodeKind, ensure_unique_id, slugify};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const PROCESS_NAME_MAX: usize = 120;
const NODE_LABEL_MAX: usize = 120;
const FLOW_LABEL_MAX: usize = 80;
const MIN_NODES: usize = 3;
const MIN_FLOWS: usize = 2;

/// Validates an untrusted candidate and normalizes it into a [`DraftGraph`].
pub fn validate_draft(payload: &Value, limits: &DraftLimits) -> Result<DraftGraph, SchemaError> {
    let root = require_object(payload, "payload")?;
    let process_name = normalize_text(
        require_string(root.get("processName"), "processName")?,
        PROCESS_NAME_MAX,
    );

    let raw_nodes = require_array(root.get("nodes"), "nodes")?;
    let raw_flows = require_array(root.get("flows"), "flows")?;
    check_count("nodes", raw_nodes.len(), MIN_NODES, limits.max_nodes)?;
    check_count("flows", raw_flows.len(), MIN_FLOWS, limits.max_flows)?;

    let nodes = build_nodes(raw_nodes)?;
    let node_ids: HashSet<&str> = nodes.iter().map(|node| node.id.as_str()).collect();
    let flows = build_flows(raw_flows, &node_ids)?;

    check_invariants(&nodes, &flows)?;

    Ok(DraftGraph {
        process_name,
        nodes,
        flows,
    })
}

fn build_nodes(raw_nodes: &[Value]) -> Result<Vec<DraftNode>, SchemaError> {
    let mut nodes = Vec::with_capacity(raw_nodes.len());
    let mut used = HashSet::new();

    for (index, item) in raw_nodes.iter().enumerate() {
        let path = format!("nodes[{index}]");
        let object = require_object(item, &path)?;

        let type_path = format!("{path}.type");
        let token = require_string(object.get("type"), &type_path)?;
        let kind = DraftNodeKind::from_token(token).ok_or_else(|| {
            SchemaError::new(
                type_path.clone(),
                SchemaErrorKind::UnsupportedNodeType(token.to_string()),
            )
        })?;

        let raw_id = require_string(object.get("id"), &format!("{path}.id"))?;
        let id = ensure_unique_id(&slugify(raw_id, &format!("node_{}", index + 1)), &mut used);
        let label = normalize_text(
            require_string(object.get("label"), &format!("{path}.label"))?,
            NODE_LABEL_MAX,
        );

        nodes.push(DraftNode { id, kind, label });
    }

    Ok(nodes)
}

fn build_flows(raw_flows: &[Value], node_ids: &HashSet<&str>) -> Result<Vec<DraftFlow>, SchemaError> {
    let mut flows = Vec::with_capacity(raw_flows.len());
    let mut used = HashSet::new();

    for (index, item) in raw_flows.iter().enumerate() {
        let path = format!("flows[{index}]");
        let object = require_object(item, &path)?;

        let raw_id = require_string(object.get("id"), &format!("{path}.id"))?;
        let id = ensure_unique_id(&slugify(raw_id, &format!("flow_{}", index + 1)), &mut used);

        let source = resolve_endpoint(object, &path, "source", &id, node_ids)?;
        let target = resolve_endpoint(object, &path, "target", &id, node_ids)?;
        if source == target {
            return Err(SchemaError::new(path, SchemaErrorKind::SelfLoop(id)));
        }

        // A non-string or blank label is treated as absent.
        let label = object
            .get("label")
            .and_then(Value::as_str)
            .filter(|value| !value.trim().is_empty())
            .map(|value| normalize_text(value, FLOW_LABEL_MAX));

        flows.push(DraftFlow {
            id,
            source,
            target,
            label,
        });
    }

    Ok(flows)
}

fn resolve_endpoint(
    object: &Map<String, Value>,
    path: &str,
    field: &str,
    flow_id: &str,
    node_ids: &HashSet<&str>,
) -> Result<String, SchemaError> {
    let field_path = format!("{path}.{field}");
    let reference = slugify(require_string(object.get(field), &field_path)?, "");
    if !node_ids.contains(reference.as_str()) {
        return Err(SchemaError::new(
            field_path,
            SchemaErrorKind::UnknownNode {
                flow_id: flow_id.to_string(),
                reference,
            },
        ));
    }
    Ok(reference)
}

fn check_invariants(nodes: &[DraftNode], flows: &[DraftFlow]) -> Result<(), SchemaError> {
    let starts: Vec<&DraftNode> = nodes
        .iter()
        .filter(|node| node.kind == DraftNodeKind::Start)
        .collect();
    if starts.len() != 1 {
        return Err(SchemaError::new("nodes", SchemaErrorKind::StartCount(starts.len())));
    }

    let ends: Vec<&DraftNode> = nodes
        .iter()
        .filter(|node| node.kind == DraftNodeKind::End)
        .collect();
    if ends.is_empty() {
        return Err(SchemaError::new("nodes", SchemaErrorKind::MissingEnd));
    }

    let mut outgoing: HashMap<&str, usize> = HashMap::new();
    let mut incoming: HashMap<&str, usize> = HashMap::new();
    for flow in flows {
        *outgoing.entry(flow.source.as_str()).or_default() += 1;
        *incoming.entry(flow.target.as_str()).or_default() += 1;
    }

    let start = starts[0];
    if outgoing.get(start.id.as_str()).copied().unwrap_or(0) == 0 {
        return Err(SchemaError::new(
            "flows",
            SchemaErrorKind::StartWithoutOutgoing(start.id.clone()),
        ));
    }

    let end_reached = ends
        .iter()
        .any(|node| incoming.get(node.id.as_str()).copied().unwrap_or(0) > 0);
    if !end_reached {
        return Err(SchemaError::new("flows", SchemaErrorKind::EndWithoutIncoming));
    }

    Ok(())
}

fn check_count(path: &str, actual: usize, min: usize, max: usize) -> Result<(), SchemaError> {
    if actual < min {
        return Err(SchemaError::new(path, SchemaErrorKind::TooFew { min, actual }));
    }
    if actual > max {
        return Err(SchemaError::new(path, SchemaErrorKind::TooMany { max, actual }));
    }
    Ok(())
}

fn require_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, SchemaError> {
    value
        .as_object()
        .ok_or_else(|| SchemaError::new(path, SchemaErrorKind::NotObject))
}

fn require_array<'a>(value: Option<&'a Value>, path: &str) -> Result<&'a Vec<Value>, SchemaError> {
    value
        .and_then(Value::as_array)
        .ok_or_else(|| SchemaError::new(path, SchemaErrorKind::NotArray))
}

fn require_string<'a>(value: Option<&'a Value>, path: &str) -> Result<&'a str, SchemaError> {
    let text = value
        .and_then(Value::as_str)
        .ok_or_else(|| SchemaError::new(path, SchemaErrorKind::NotString))?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(SchemaError::new(path, SchemaErrorKind::Empty));
    }
    Ok(trimmed)
}

/// Trims, collapses whitespace runs to one space and caps at `max_chars`.
pub fn normalize_text(value: &str, max_chars: usize) -> String {
    let collapsed = WHITESPACE_RE.replace_all(value.trim(), " ");
    collapsed.chars().take(max_chars).collect()
}
