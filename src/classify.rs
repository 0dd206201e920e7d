use crate::ir::{DraftGraph, NodeKind, RenderGraph, RenderNode};
use crate::rules::RuleSet;

/// Re-types generic tasks and assigns their lanes. Start, end and gateway
/// nodes keep their kind and stay laneless; layout back-fills them.
pub fn classify(draft: &DraftGraph, rules: &RuleSet) -> RenderGraph {
    let nodes = draft
        .nodes
        .iter()
        .map(|node| {
            let kind = NodeKind::from(node.kind);
            match kind {
                NodeKind::Task => {
                    let (kind, lane) = rules.classify_label(&node.label);
                    RenderNode::new(node.id.clone(), kind, node.label.clone()).with_lane(lane)
                }
                NodeKind::Start
                | NodeKind::End
                | NodeKind::GatewayExclusive
                | NodeKind::UserTask
                | NodeKind::ServiceTask
                | NodeKind::BusinessRuleTask
                | NodeKind::SubProcess => RenderNode::new(node.id.clone(), kind, node.label.clone()),
            }
        })
        .collect::<Vec<_>>();

    let graph = RenderGraph {
        process_name: draft.process_name.clone(),
        nodes,
        flows: draft.flows.clone(),
    };
    tracing::debug!(
        nodes = graph.nodes.len(),
        flows = graph.flows.len(),
        "classified draft"
    );
    graph
}
