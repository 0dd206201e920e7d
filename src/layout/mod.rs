mod lanes;
pub mod routing;
mod types;

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::LayoutConfig;
use crate::ir::{DraftFlow, Lane, RenderGraph};

pub use lanes::resolve_lanes;
pub use types::{Bounds, EdgeLayout, GraphLayout, LaneLayout, LayoutInfo, NodeShape};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Banding {
    /// Top-level graph: one band per lane inside a participant pool.
    Lanes,
    /// Sub-process contents: a single band, no pool.
    Single,
}

/// Serpentine grid layout. Total over any graph the validator accepts; nodes
/// the traversal cannot reach are appended in id order.
pub fn compute_layout(graph: &RenderGraph, config: &LayoutConfig) -> GraphLayout {
    layout_graph(graph, config, Banding::Lanes, "")
}

fn layout_graph(
    graph: &RenderGraph,
    config: &LayoutConfig,
    banding: Banding,
    id_prefix: &str,
) -> GraphLayout {
    let order = traversal_order(graph);
    let rows = row_count(order.len());
    let columns = if order.is_empty() {
        0
    } else {
        order.len().div_ceil(rows)
    };
    let lane_of = match banding {
        Banding::Lanes => resolve_lanes(graph),
        Banding::Single => HashMap::new(),
    };

    let band_height = rows.max(1) as f32 * config.row_height;
    let content_x = match banding {
        Banding::Lanes => config.origin_x + config.pool_header_width,
        Banding::Single => config.origin_x,
    };
    let content_width = 2.0 * config.lane_padding_x
        + columns.saturating_sub(1) as f32 * config.column_pitch
        + config.slot_width;

    let mut nodes = BTreeMap::new();
    for (index, id) in order.iter().enumerate() {
        let Some(node) = graph.node(id) else {
            continue;
        };
        let shape = NodeShape::for_kind(node.kind);
        let row = index / columns;
        let offset = index % columns;
        let column = if row % 2 == 1 {
            columns - 1 - offset
        } else {
            offset
        };
        let lane = lane_of.get(id.as_str()).copied();
        let band_top = config.origin_y + lane.map(|l| l.index() as f32).unwrap_or(0.0) * band_height;

        let slot_x = content_x + config.lane_padding_x + column as f32 * config.column_pitch;
        let x = slot_x + (config.slot_width - shape.width) / 2.0;
        let y = band_top + row as f32 * config.row_height + (config.row_height - shape.height) / 2.0;

        nodes.insert(
            id.clone(),
            LayoutInfo {
                rendered_id: format!("{id_prefix}{}_{}", shape.id_prefix, index + 1),
                tag_name: shape.tag_name,
                lane,
                order: index,
                row,
                column,
                x,
                y,
                width: shape.width,
                height: shape.height,
            },
        );
    }

    let edges = graph
        .flows
        .iter()
        .enumerate()
        .filter_map(|(index, flow)| {
            let source = nodes.get(&flow.source)?;
            let target = nodes.get(&flow.target)?;
            Some(EdgeLayout {
                flow_id: flow.id.clone(),
                rendered_id: format!("{id_prefix}Flow_{}", index + 1),
                source: flow.source.clone(),
                target: flow.target.clone(),
                points: routing::route(&source.bounds(), &target.bounds(), config.route_tolerance),
            })
        })
        .collect();

    let (lanes, pool, width, height) = match banding {
        Banding::Lanes => {
            let lanes = Lane::ALL
                .iter()
                .map(|&lane| LaneLayout {
                    lane,
                    element_id: lane.element_id(),
                    bounds: Bounds {
                        x: content_x,
                        y: config.origin_y + lane.index() as f32 * band_height,
                        width: content_width,
                        height: band_height,
                    },
                    members: order
                        .iter()
                        .filter(|id| lane_of.get(id.as_str()) == Some(&lane))
                        .filter_map(|id| nodes.get(id).map(|info: &LayoutInfo| info.rendered_id.clone()))
                        .collect(),
                })
                .collect::<Vec<_>>();
            let pool = Bounds {
                x: config.origin_x,
                y: config.origin_y,
                width: config.pool_header_width + content_width,
                height: Lane::ALL.len() as f32 * band_height,
            };
            (lanes, Some(pool), pool.width, pool.height)
        }
        Banding::Single => (Vec::new(), None, content_width, band_height),
    };

    let mut nested = BTreeMap::new();
    for node in &graph.nodes {
        let (Some(children), Some(info)) = (node.children.as_deref(), nodes.get(&node.id)) else {
            continue;
        };
        let prefix = format!("{}_", info.rendered_id);
        nested.insert(
            node.id.clone(),
            layout_graph(children, config, Banding::Single, &prefix),
        );
    }

    tracing::debug!(
        nodes = nodes.len(),
        rows,
        columns,
        nested = nested.len(),
        "computed layout"
    );

    GraphLayout {
        order,
        rows,
        columns,
        nodes,
        edges,
        lanes,
        pool,
        width,
        height,
        nested,
    }
}

/// 1 row up to 5 nodes, 2 up to 10, 3 beyond.
pub fn row_count(nodes: usize) -> usize {
    match nodes {
        0..=5 => 1,
        6..=10 => 2,
        _ => 3,
    }
}

/// Depth-first preorder from the start node, following outgoing flows in id
/// order, then every unreached node in id order.
pub fn traversal_order(graph: &RenderGraph) -> Vec<String> {
    let known: HashSet<&str> = graph.nodes.iter().map(|node| node.id.as_str()).collect();
    let mut outgoing: HashMap<&str, Vec<&DraftFlow>> = HashMap::new();
    for flow in &graph.flows {
        outgoing.entry(flow.source.as_str()).or_default().push(flow);
    }
    for flows in outgoing.values_mut() {
        flows.sort_by(|a, b| a.id.cmp(&b.id));
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut order = Vec::with_capacity(graph.nodes.len());
    if let Some(start) = graph.start_node() {
        let mut stack = vec![start.id.as_str()];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            order.push(id.to_string());
            if let Some(flows) = outgoing.get(id) {
                for flow in flows.iter().rev() {
                    let target = flow.target.as_str();
                    if known.contains(target) && !visited.contains(target) {
                        stack.push(target);
                    }
                }
            }
        }
    }

    let mut rest: Vec<&str> = graph
        .nodes
        .iter()
        .map(|node| node.id.as_str())
        .filter(|id| !visited.contains(id))
        .collect();
    rest.sort_unstable();
    rest.dedup();
    order.extend(rest.into_iter().map(str::to_string));
    order
}
