use std::collections::HashMap;

use crate::ir::{Lane, RenderGraph};

/// Lane of every node. Classified nodes keep their own; the rest take the
/// most frequent lane among their direct neighbours (ties by flow order),
/// falling back to the operational lane.
pub fn resolve_lanes(graph: &RenderGraph) -> HashMap<String, Lane> {
    let declared: HashMap<&str, Lane> = graph
        .nodes
        .iter()
        .filter_map(|node| node.lane.map(|lane| (node.id.as_str(), lane)))
        .collect();

    graph
        .nodes
        .iter()
        .map(|node| {
            let lane = node.lane.unwrap_or_else(|| {
                let neighbours = graph.flows.iter().filter_map(|flow| {
                    if flow.source == node.id {
                        declared.get(flow.target.as_str()).copied()
                    } else if flow.target == node.id {
                        declared.get(flow.source.as_str()).copied()
                    } else {
                        None
                    }
                });
                Lane::most_frequent(neighbours).unwrap_or(Lane::Operational)
            });
            (node.id.clone(), lane)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{DraftFlow, NodeKind, RenderNode};

    fn flow(id: &str, source: &str, target: &str) -> DraftFlow {
        DraftFlow {
            id: id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            label: None,
        }
    }

    #[test]
    fn control_nodes_borrow_neighbour_lanes() {
        let graph = RenderGraph {
            process_name: "p".to_string(),
            nodes: vec![
                RenderNode::new("start", NodeKind::Start, "Início"),
                RenderNode::new("a", NodeKind::UserTask, "A").with_lane(Lane::Management),
                RenderNode::new("g", NodeKind::GatewayExclusive, "?"),
                RenderNode::new("b", NodeKind::ServiceTask, "B").with_lane(Lane::Automation),
                RenderNode::new("c", NodeKind::ServiceTask, "C").with_lane(Lane::Automation),
                RenderNode::new("end", NodeKind::End, "Fim"),
                RenderNode::new("orphan", NodeKind::End, "Fim"),
            ],
            flows: vec![
                flow("f1", "start", "a"),
                flow("f2", "a", "g"),
                flow("f3", "g", "b"),
                flow("f4", "g", "c"),
                flow("f5", "b", "end"),
            ],
        };
        let lanes = resolve_lanes(&graph);
        assert_eq!(lanes["start"], Lane::Management);
        assert_eq!(lanes["g"], Lane::Automation);
        assert_eq!(lanes["end"], Lane::Automation);
        assert_eq!(lanes["orphan"], Lane::Operational);
        assert_eq!(lanes["a"], Lane::Management);
    }
}
