use crate::ir::RenderGraph;
use crate::layout::{Bounds, GraphLayout};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub process_name: String,
    pub rows: usize,
    pub columns: usize,
    pub width: f32,
    pub height: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<Bounds>,
    pub lanes: Vec<LaneDump>,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: String,
    pub rendered_id: String,
    pub kind: String,
    pub label: String,
    pub lane: Option<String>,
    pub row: usize,
    pub column: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nested: Option<Box<LayoutDump>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDump {
    pub id: String,
    pub rendered_id: String,
    pub from: String,
    pub to: String,
    pub label: Option<String>,
    pub points: Vec<[f32; 2]>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaneDump {
    pub id: String,
    pub name: String,
    pub bounds: Bounds,
    pub members: Vec<String>,
}

impl LayoutDump {
    /// Nodes are listed in traversal order; folded sub-processes carry their
    /// child layout inline.
    pub fn from_layout(layout: &GraphLayout, graph: &RenderGraph) -> Self {
        let nodes = layout
            .order
            .iter()
            .filter_map(|id| {
                let info = layout.node(id)?;
                let node = graph.node(id)?;
                let nested = match (node.children.as_deref(), layout.nested.get(id)) {
                    (Some(children), Some(child_layout)) => {
                        Some(Box::new(LayoutDump::from_layout(child_layout, children)))
                    }
                    _ => None,
                };
                Some(NodeDump {
                    id: id.clone(),
                    rendered_id: info.rendered_id.clone(),
                    kind: format!("{:?}", node.kind),
                    label: node.label.clone(),
                    lane: info.lane.map(|lane| format!("{lane:?}")),
                    row: info.row,
                    column: info.column,
                    x: info.x,
                    y: info.y,
                    width: info.width,
                    height: info.height,
                    nested,
                })
            })
            .collect();

        let edges = graph
            .flows
            .iter()
            .filter_map(|flow| {
                let edge = layout.edge(&flow.id)?;
                Some(EdgeDump {
                    id: flow.id.clone(),
                    rendered_id: edge.rendered_id.clone(),
                    from: flow.source.clone(),
                    to: flow.target.clone(),
                    label: flow.label.clone(),
                    points: edge.points.iter().map(|(x, y)| [*x, *y]).collect(),
                })
            })
            .collect();

        let lanes = layout
            .lanes
            .iter()
            .map(|lane| LaneDump {
                id: lane.element_id.to_string(),
                name: lane.lane.display_name().to_string(),
                bounds: lane.bounds,
                members: lane.members.clone(),
            })
            .collect();

        LayoutDump {
            process_name: graph.process_name.clone(),
            rows: layout.rows,
            columns: layout.columns,
            width: layout.width,
            height: layout.height,
            pool: layout.pool,
            lanes,
            nodes,
            edges,
        }
    }
}

/// Pretty JSON dump to `path`, or stdout when `path` is `None`.
pub fn write_layout_dump(
    path: Option<&Path>,
    layout: &GraphLayout,
    graph: &RenderGraph,
) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(layout, graph);
    match path {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = stdout.lock();
            serde_json::to_writer_pretty(&mut writer, &dump)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}
