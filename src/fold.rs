use crate::ir::{DraftFlow, Lane, NodeKind, RenderGraph, RenderNode, ensure_unique_id};
use crate::rules::{LoopLabels, LoopRoles, RuleSet, matches_any, normalize_words};
use std::collections::HashSet;

const SUBPROCESS_BASE_ID: &str = "pdca_cycle";

/// Node indices of a detected Plan/Do/Check/Act cluster, in role order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopCluster {
    pub plan: usize,
    pub execute: usize,
    pub check: usize,
    pub act: usize,
}

impl LoopCluster {
    pub fn indices(&self) -> [usize; 4] {
        [self.plan, self.execute, self.check, self.act]
    }
}

/// Finds one task per role. Roles are resolved in order and each takes the
/// first unclaimed task whose label matches one of its keywords.
pub fn find_loop_cluster(graph: &RenderGraph, roles: &LoopRoles) -> Option<LoopCluster> {
    let words: Vec<Vec<String>> = graph
        .nodes
        .iter()
        .map(|node| normalize_words(&node.label))
        .collect();
    let mut claimed: Vec<usize> = Vec::with_capacity(4);

    for keywords in [&roles.plan, &roles.execute, &roles.check, &roles.act] {
        let found = graph.nodes.iter().enumerate().position(|(idx, node)| {
            node.kind.is_task() && !claimed.contains(&idx) && matches_any(&words[idx], keywords)
        })?;
        claimed.push(found);
    }

    Some(LoopCluster {
        plan: claimed[0],
        execute: claimed[1],
        check: claimed[2],
        act: claimed[3],
    })
}

/// Collapses a Plan/Do/Check/Act cluster into one looping sub-process.
///
/// The rewrite only happens when the cluster has at least one inbound and one
/// outbound edge crossing its boundary; otherwise the graph is returned as is.
pub fn fold_loops(graph: RenderGraph, rules: &RuleSet) -> RenderGraph {
    let Some(cluster) = find_loop_cluster(&graph, &rules.loop_roles) else {
        return graph;
    };

    let members: HashSet<&str> = cluster
        .indices()
        .iter()
        .map(|&idx| graph.nodes[idx].id.as_str())
        .collect();
    let inbound = graph
        .flows
        .iter()
        .filter(|flow| members.contains(flow.target.as_str()) && !members.contains(flow.source.as_str()))
        .count();
    let outbound_targets: Vec<&str> = {
        let mut seen = Vec::new();
        for flow in &graph.flows {
            if members.contains(flow.source.as_str())
                && !members.contains(flow.target.as_str())
                && !seen.contains(&flow.target.as_str())
            {
                seen.push(flow.target.as_str());
            }
        }
        seen
    };

    if inbound == 0 || outbound_targets.is_empty() {
        tracing::warn!(
            inbound,
            outbound = outbound_targets.len(),
            "loop cluster found but not folded: it needs both an entry and an exit edge"
        );
        return graph;
    }

    let standardize_target = {
        let matching: Vec<&str> = outbound_targets
            .iter()
            .copied()
            .filter(|id| {
                graph
                    .node(id)
                    .map(|node| matches_any(&normalize_words(&node.label), &rules.standardize_keywords))
                    .unwrap_or(false)
            })
            .collect();
        if matching.len() == 1 {
            Some(matching[0].to_string())
        } else {
            None
        }
    };

    let member_ids: HashSet<String> = members.iter().map(|id| id.to_string()).collect();
    let mut used_node_ids = graph.node_ids();
    let subprocess_id = ensure_unique_id(SUBPROCESS_BASE_ID, &mut used_node_ids);
    let mut used_flow_ids = graph.flow_ids();

    let roles = cluster.indices().map(|idx| graph.nodes[idx].clone());
    let lane = dominant_lane(&roles);
    let children = build_cycle_graph(
        &subprocess_id,
        &roles,
        &rules.loop_labels,
        &mut used_node_ids,
        &mut used_flow_ids,
    );

    let mut subprocess = RenderNode::new(
        subprocess_id.clone(),
        NodeKind::SubProcess,
        rules.loop_labels.subprocess.clone(),
    );
    subprocess.lane = lane;
    subprocess.children = Some(Box::new(children));
    subprocess.loop_marker = true;

    let first_member = cluster.indices().into_iter().min().unwrap_or(cluster.plan);
    let mut nodes = Vec::with_capacity(graph.nodes.len() - 3);
    let mut pending = Some(subprocess);
    for (idx, node) in graph.nodes.iter().enumerate() {
        if idx == first_member {
            if let Some(subprocess) = pending.take() {
                nodes.push(subprocess);
            }
        } else if !member_ids.contains(&node.id) {
            nodes.push(node.clone());
        }
    }

    let mut flows = Vec::with_capacity(graph.flows.len());
    let mut exit_emitted = false;
    for flow in &graph.flows {
        let from_inside = member_ids.contains(&flow.source);
        let to_inside = member_ids.contains(&flow.target);
        match (from_inside, to_inside) {
            (true, true) => {}
            (false, true) => flows.push(DraftFlow {
                id: ensure_unique_id(&format!("{}_loop", flow.id), &mut used_flow_ids),
                source: flow.source.clone(),
                target: subprocess_id.clone(),
                label: flow.label.clone(),
            }),
            (true, false) => {
                if standardize_target.as_deref() == Some(flow.target.as_str()) {
                    if !exit_emitted {
                        exit_emitted = true;
                        flows.push(DraftFlow {
                            id: ensure_unique_id(&format!("{subprocess_id}_out"), &mut used_flow_ids),
                            source: subprocess_id.clone(),
                            target: flow.target.clone(),
                            label: Some(rules.loop_labels.exit.clone()),
                        });
                    }
                } else {
                    flows.push(DraftFlow {
                        source: subprocess_id.clone(),
                        ..flow.clone()
                    });
                }
            }
            (false, false) => flows.push(flow.clone()),
        }
    }

    tracing::debug!(
        subprocess = %subprocess_id,
        inbound,
        outbound = outbound_targets.len(),
        collapsed_exit = exit_emitted,
        "folded loop cluster"
    );

    RenderGraph {
        process_name: graph.process_name,
        nodes,
        flows,
    }
}

/// Most frequent lane among the role nodes; ties go to the earlier role.
fn dominant_lane(roles: &[RenderNode; 4]) -> Option<Lane> {
    Lane::most_frequent(roles.iter().filter_map(|node| node.lane))
}

/// start → plan → execute → check → gateway, gateway → act → plan when the
/// goal is missed, gateway → end when it is met.
fn build_cycle_graph(
    subprocess_id: &str,
    roles: &[RenderNode; 4],
    labels: &LoopLabels,
    used_node_ids: &mut HashSet<String>,
    used_flow_ids: &mut HashSet<String>,
) -> RenderGraph {
    let [plan, execute, check, act] = roles;
    let start = RenderNode::new(
        ensure_unique_id(&format!("{subprocess_id}_start"), used_node_ids),
        NodeKind::Start,
        labels.start.clone(),
    );
    let gateway = RenderNode::new(
        ensure_unique_id(&format!("{subprocess_id}_gateway"), used_node_ids),
        NodeKind::GatewayExclusive,
        labels.gateway.clone(),
    );
    let end = RenderNode::new(
        ensure_unique_id(&format!("{subprocess_id}_end"), used_node_ids),
        NodeKind::End,
        labels.end.clone(),
    );

    let edges: [(&str, &str, Option<&str>); 7] = [
        (start.id.as_str(), plan.id.as_str(), None),
        (plan.id.as_str(), execute.id.as_str(), None),
        (execute.id.as_str(), check.id.as_str(), None),
        (check.id.as_str(), gateway.id.as_str(), None),
        (gateway.id.as_str(), act.id.as_str(), Some(labels.goal_not_met.as_str())),
        (act.id.as_str(), plan.id.as_str(), None),
        (gateway.id.as_str(), end.id.as_str(), Some(labels.goal_met.as_str())),
    ];
    let flows = edges
        .into_iter()
        .enumerate()
        .map(|(idx, (source, target, label))| DraftFlow {
            id: ensure_unique_id(&format!("{subprocess_id}_flow_{}", idx + 1), used_flow_ids),
            source: source.to_string(),
            target: target.to_string(),
            label: label.map(str::to_string),
        })
        .collect();

    RenderGraph {
        process_name: labels.subprocess.clone(),
        nodes: vec![
            start,
            plan.clone(),
            execute.clone(),
            check.clone(),
            gateway,
            act.clone(),
            end,
        ],
        flows,
    }
}
