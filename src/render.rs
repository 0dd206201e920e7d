use std::collections::{HashMap, HashSet};

use crate::error::DraftError;
use crate::ir::{NodeKind, RenderGraph};
use crate::layout::{GraphLayout, LayoutInfo};
use crate::theme::Theme;

const BPMN_NS: &str = "http://www.omg.org/spec/BPMN/20100524/MODEL";
const BPMNDI_NS: &str = "http://www.omg.org/spec/BPMN/20100524/DI";
const DC_NS: &str = "http://www.omg.org/spec/DD/20100524/DC";
const DI_NS: &str = "http://www.omg.org/spec/DD/20100524/DI";
const COLOR_NS: &str = "http://www.omg.org/spec/BPMN/non-normative/color/1.0";

const DEFINITIONS_ID: &str = "Definitions_1";
const COLLABORATION_ID: &str = "Collaboration_1";
const PARTICIPANT_ID: &str = "Participant_1";
const PROCESS_ID: &str = "Process_1";
const LANE_SET_ID: &str = "LaneSet_1";

/// Exporter attributes stamped on `bpmn:definitions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMeta {
    pub exporter: String,
    pub exporter_version: String,
}

impl Default for DocumentMeta {
    fn default() -> Self {
        Self {
            exporter: env!("CARGO_PKG_NAME").to_string(),
            exporter_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Serializes a laid-out graph as a BPMN 2.0 document with diagram
/// interchange. Fails closed when a node or flow has no placement, or when
/// the layout places something the graph does not contain.
pub fn render_bpmn(
    graph: &RenderGraph,
    layout: &GraphLayout,
    theme: &Theme,
    meta: &DocumentMeta,
) -> Result<String, DraftError> {
    let pool = layout
        .pool
        .ok_or_else(|| DraftError::Internal("top-level layout has no pool".to_string()))?;
    check_no_stray_placements(graph, layout)?;
    let process_name = escape_xml(&graph.process_name);
    let mut xml = String::new();

    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let color_ns = if theme.uses_color() {
        format!(" xmlns:color=\"{COLOR_NS}\"")
    } else {
        String::new()
    };
    xml.push_str(&format!(
        "<bpmn:definitions xmlns:bpmn=\"{BPMN_NS}\" xmlns:bpmndi=\"{BPMNDI_NS}\" xmlns:dc=\"{DC_NS}\" xmlns:di=\"{DI_NS}\"{color_ns} id=\"{DEFINITIONS_ID}\" targetNamespace=\"http://bpmn.io/schema/bpmn\" exporter=\"{}\" exporterVersion=\"{}\">\n",
        escape_xml(&meta.exporter),
        escape_xml(&meta.exporter_version)
    ));

    xml.push_str(&format!("  <bpmn:collaboration id=\"{COLLABORATION_ID}\">\n"));
    xml.push_str(&format!(
        "    <bpmn:participant id=\"{PARTICIPANT_ID}\" name=\"{process_name}\" processRef=\"{PROCESS_ID}\" />\n"
    ));
    xml.push_str("  </bpmn:collaboration>\n");

    xml.push_str(&format!(
        "  <bpmn:process id=\"{PROCESS_ID}\" name=\"{process_name}\" isExecutable=\"false\">\n"
    ));
    xml.push_str(&format!("    <bpmn:laneSet id=\"{LANE_SET_ID}\">\n"));
    for lane in &layout.lanes {
        xml.push_str(&format!(
            "      <bpmn:lane id=\"{}\" name=\"{}\">\n",
            lane.element_id,
            escape_xml(lane.lane.display_name())
        ));
        for member in &lane.members {
            xml.push_str(&format!(
                "        <bpmn:flowNodeRef>{member}</bpmn:flowNodeRef>\n"
            ));
        }
        xml.push_str("      </bpmn:lane>\n");
    }
    xml.push_str("    </bpmn:laneSet>\n");
    write_flow_elements(&mut xml, graph, layout, 2)?;
    xml.push_str("  </bpmn:process>\n");

    xml.push_str("  <bpmndi:BPMNDiagram id=\"BPMNDiagram_1\">\n");
    xml.push_str(&format!(
        "    <bpmndi:BPMNPlane id=\"BPMNPlane_1\" bpmnElement=\"{COLLABORATION_ID}\">\n"
    ));
    xml.push_str(&format!(
        "      <bpmndi:BPMNShape id=\"{PARTICIPANT_ID}_di\" bpmnElement=\"{PARTICIPANT_ID}\" isHorizontal=\"true\">\n"
    ));
    push_bounds(&mut xml, pool.x, pool.y, pool.width, pool.height);
    xml.push_str("      </bpmndi:BPMNShape>\n");
    for lane in &layout.lanes {
        let colors = theme
            .lane_color(lane.lane)
            .map(|c| color_attrs(&c.fill, &c.stroke))
            .unwrap_or_default();
        xml.push_str(&format!(
            "      <bpmndi:BPMNShape id=\"{id}_di\" bpmnElement=\"{id}\" isHorizontal=\"true\"{colors}>\n",
            id = lane.element_id
        ));
        push_bounds(
            &mut xml,
            lane.bounds.x,
            lane.bounds.y,
            lane.bounds.width,
            lane.bounds.height,
        );
        xml.push_str("      </bpmndi:BPMNShape>\n");
    }
    write_plane_contents(&mut xml, graph, layout, theme)?;
    xml.push_str("    </bpmndi:BPMNPlane>\n");
    xml.push_str("  </bpmndi:BPMNDiagram>\n");

    write_drilldown_diagrams(&mut xml, graph, layout, theme)?;
    xml.push_str("</bpmn:definitions>\n");

    tracing::debug!(bytes = xml.len(), "rendered bpmn document");
    Ok(xml)
}

/// Every placement, edge and nested layout must belong to an element of `graph`.
fn check_no_stray_placements(graph: &RenderGraph, layout: &GraphLayout) -> Result<(), DraftError> {
    let node_ids: HashSet<&str> = graph.nodes.iter().map(|node| node.id.as_str()).collect();
    let flow_ids: HashSet<&str> = graph.flows.iter().map(|flow| flow.id.as_str()).collect();

    if let Some(stray) = layout.nodes.keys().find(|id| !node_ids.contains(id.as_str())) {
        return Err(DraftError::Internal(format!(
            "layout places node {stray} that is not in the graph"
        )));
    }
    if let Some(stray) = layout
        .edges
        .iter()
        .find(|edge| !flow_ids.contains(edge.flow_id.as_str()))
    {
        return Err(DraftError::Internal(format!(
            "layout routes flow {} that is not in the graph",
            stray.flow_id
        )));
    }
    for (parent, nested) in &layout.nested {
        let children = graph
            .nodes
            .iter()
            .find(|node| &node.id == parent)
            .and_then(|node| node.children.as_deref())
            .ok_or_else(|| {
                DraftError::Internal(format!("nested layout {parent} has no sub-process"))
            })?;
        check_no_stray_placements(children, nested)?;
    }
    Ok(())
}

fn placement<'a>(layout: &'a GraphLayout, node_id: &str) -> Result<&'a LayoutInfo, DraftError> {
    layout
        .node(node_id)
        .ok_or_else(|| DraftError::Internal(format!("node {node_id} missing from layout")))
}

fn edge_id<'a>(layout: &'a GraphLayout, flow_id: &str) -> Result<&'a str, DraftError> {
    layout
        .edge(flow_id)
        .map(|edge| edge.rendered_id.as_str())
        .ok_or_else(|| DraftError::Internal(format!("flow {flow_id} missing from layout")))
}

fn write_flow_elements(
    xml: &mut String,
    graph: &RenderGraph,
    layout: &GraphLayout,
    depth: usize,
) -> Result<(), DraftError> {
    let indent = "  ".repeat(depth);
    let mut incoming: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut outgoing: HashMap<&str, Vec<&str>> = HashMap::new();
    for flow in &graph.flows {
        let rendered = edge_id(layout, &flow.id)?;
        outgoing.entry(flow.source.as_str()).or_default().push(rendered);
        incoming.entry(flow.target.as_str()).or_default().push(rendered);
    }

    for node in &graph.nodes {
        let info = placement(layout, &node.id)?;
        xml.push_str(&format!(
            "{indent}<{tag} id=\"{id}\" name=\"{name}\">\n",
            tag = info.tag_name,
            id = info.rendered_id,
            name = escape_xml(&node.label)
        ));
        for flow in incoming.get(node.id.as_str()).into_iter().flatten() {
            xml.push_str(&format!("{indent}  <bpmn:incoming>{flow}</bpmn:incoming>\n"));
        }
        for flow in outgoing.get(node.id.as_str()).into_iter().flatten() {
            xml.push_str(&format!("{indent}  <bpmn:outgoing>{flow}</bpmn:outgoing>\n"));
        }
        if node.loop_marker {
            xml.push_str(&format!("{indent}  <bpmn:standardLoopCharacteristics />\n"));
        }
        if let Some(children) = node.children.as_deref() {
            let nested = layout.nested.get(&node.id).ok_or_else(|| {
                DraftError::Internal(format!("sub-process {} has no nested layout", node.id))
            })?;
            write_flow_elements(xml, children, nested, depth + 1)?;
        }
        xml.push_str(&format!("{indent}</{}>\n", info.tag_name));
    }

    for flow in &graph.flows {
        let source = placement(layout, &flow.source)?;
        let target = placement(layout, &flow.target)?;
        let name = flow
            .label
            .as_deref()
            .map(|label| format!(" name=\"{}\"", escape_xml(label)))
            .unwrap_or_default();
        xml.push_str(&format!(
            "{indent}<bpmn:sequenceFlow id=\"{}\" sourceRef=\"{}\" targetRef=\"{}\"{name} />\n",
            edge_id(layout, &flow.id)?,
            source.rendered_id,
            target.rendered_id
        ));
    }
    Ok(())
}

fn write_plane_contents(
    xml: &mut String,
    graph: &RenderGraph,
    layout: &GraphLayout,
    theme: &Theme,
) -> Result<(), DraftError> {
    for node in &graph.nodes {
        let info = placement(layout, &node.id)?;
        let expanded = match node.kind {
            NodeKind::SubProcess => " isExpanded=\"false\"",
            NodeKind::Start
            | NodeKind::End
            | NodeKind::GatewayExclusive
            | NodeKind::Task
            | NodeKind::UserTask
            | NodeKind::ServiceTask
            | NodeKind::BusinessRuleTask => "",
        };
        let colors = match (node.loop_marker, theme.loop_fill.as_deref()) {
            (true, Some(fill)) => {
                let stroke = info
                    .lane
                    .and_then(|lane| theme.lane_color(lane))
                    .map(|c| c.stroke.as_str())
                    .unwrap_or(fill);
                color_attrs(fill, stroke)
            }
            _ => String::new(),
        };
        xml.push_str(&format!(
            "      <bpmndi:BPMNShape id=\"{id}_di\" bpmnElement=\"{id}\"{expanded}{colors}>\n",
            id = info.rendered_id
        ));
        push_bounds(xml, info.x, info.y, info.width, info.height);
        xml.push_str("      </bpmndi:BPMNShape>\n");
    }

    for flow in &graph.flows {
        let edge = layout
            .edge(&flow.id)
            .ok_or_else(|| DraftError::Internal(format!("flow {} missing from layout", flow.id)))?;
        if edge.points.len() < 2 {
            return Err(DraftError::Internal(format!(
                "flow {} has fewer than two waypoints",
                flow.id
            )));
        }
        xml.push_str(&format!(
            "      <bpmndi:BPMNEdge id=\"{id}_di\" bpmnElement=\"{id}\">\n",
            id = edge.rendered_id
        ));
        for &(x, y) in &edge.points {
            xml.push_str(&format!(
                "        <di:waypoint x=\"{}\" y=\"{}\" />\n",
                fmt_num(x),
                fmt_num(y)
            ));
        }
        xml.push_str("      </bpmndi:BPMNEdge>\n");
    }
    Ok(())
}

/// One extra diagram per folded sub-process, so editors can drill into it.
fn write_drilldown_diagrams(
    xml: &mut String,
    graph: &RenderGraph,
    layout: &GraphLayout,
    theme: &Theme,
) -> Result<(), DraftError> {
    for node in &graph.nodes {
        let Some(children) = node.children.as_deref() else {
            continue;
        };
        let info = placement(layout, &node.id)?;
        let nested = layout.nested.get(&node.id).ok_or_else(|| {
            DraftError::Internal(format!("sub-process {} has no nested layout", node.id))
        })?;
        let element = &info.rendered_id;
        xml.push_str(&format!("  <bpmndi:BPMNDiagram id=\"BPMNDiagram_{element}\">\n"));
        xml.push_str(&format!(
            "    <bpmndi:BPMNPlane id=\"BPMNPlane_{element}\" bpmnElement=\"{element}\">\n"
        ));
        write_plane_contents(xml, children, nested, theme)?;
        xml.push_str("    </bpmndi:BPMNPlane>\n");
        xml.push_str("  </bpmndi:BPMNDiagram>\n");
        write_drilldown_diagrams(xml, children, nested, theme)?;
    }
    Ok(())
}

fn push_bounds(xml: &mut String, x: f32, y: f32, width: f32, height: f32) {
    xml.push_str(&format!(
        "        <dc:Bounds x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" />\n",
        fmt_num(x),
        fmt_num(y),
        fmt_num(width),
        fmt_num(height)
    ));
}

fn color_attrs(fill: &str, stroke: &str) -> String {
    format!(
        " color:background-color=\"{}\" color:border-color=\"{}\"",
        escape_xml(fill),
        escape_xml(stroke)
    )
}

/// Integral values print without a fraction; others keep at most 2 decimals.
fn fmt_num(value: f32) -> String {
    if value.fract() == 0.0 {
        return format!("{}", value as i64);
    }
    let text = format!("{value:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::ir::{DraftFlow, Lane, RenderNode};
    use crate::layout::compute_layout;

    fn flow(id: &str, source: &str, target: &str, label: Option<&str>) -> DraftFlow {
        DraftFlow {
            id: id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            label: label.map(str::to_string),
        }
    }

    fn sample() -> RenderGraph {
        RenderGraph {
            process_name: "Compras & <Pagamentos>".to_string(),
            nodes: vec![
                RenderNode::new("start", NodeKind::Start, "Início"),
                RenderNode::new("review", NodeKind::UserTask, "Revisar \"pedido\"")
                    .with_lane(Lane::Management),
                RenderNode::new("end", NodeKind::End, "Fim"),
            ],
            flows: vec![
                flow("f1", "start", "review", None),
                flow("f2", "review", "end", Some("ok")),
            ],
        }
    }

    #[test]
    fn renders_collaboration_lanes_and_di() {
        let graph = sample();
        let layout = compute_layout(&graph, &LayoutConfig::default());
        let xml = render_bpmn(&graph, &layout, &Theme::lanes(), &DocumentMeta::default()).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("processRef=\"Process_1\""));
        assert!(xml.contains("name=\"Compras &amp; &lt;Pagamentos&gt;\""));
        assert!(xml.contains("name=\"Revisar &quot;pedido&quot;\""));
        assert_eq!(xml.matches("<bpmn:lane ").count(), 4);
        assert!(xml.contains("<bpmn:flowNodeRef>UserTask_2</bpmn:flowNodeRef>"));
        assert_eq!(xml.matches("<bpmn:startEvent ").count(), 1);
        assert_eq!(xml.matches("<bpmn:endEvent ").count(), 1);
        assert!(xml.contains(
            "<bpmn:sequenceFlow id=\"Flow_2\" sourceRef=\"UserTask_2\" targetRef=\"EndEvent_3\" name=\"ok\" />"
        ));
        assert!(xml.contains("bpmnElement=\"Collaboration_1\""));
        assert!(xml.contains("xmlns:color="));
        // pool + 4 lanes + 3 nodes
        assert_eq!(xml.matches("<bpmndi:BPMNShape ").count(), 8);
        assert_eq!(xml.matches("<bpmndi:BPMNEdge ").count(), 2);
    }

    #[test]
    fn plain_theme_emits_no_color_attributes() {
        let graph = sample();
        let layout = compute_layout(&graph, &LayoutConfig::default());
        let xml = render_bpmn(&graph, &layout, &Theme::plain(), &DocumentMeta::default()).unwrap();
        assert!(!xml.contains("color:"));
    }

    #[test]
    fn missing_placement_is_an_internal_error() {
        let graph = sample();
        let mut layout = compute_layout(&graph, &LayoutConfig::default());
        layout.nodes.remove("review");
        let err = render_bpmn(&graph, &layout, &Theme::plain(), &DocumentMeta::default())
            .unwrap_err();
        assert!(matches!(err, DraftError::Internal(_)));
        assert!(!err.is_user_error());
    }

    #[test]
    fn stray_layout_entries_are_internal_errors() {
        let graph = sample();
        let layout = compute_layout(&graph, &LayoutConfig::default());

        let mut extra_node = layout.clone();
        let ghost = extra_node.nodes["review"].clone();
        extra_node.nodes.insert("ghost".to_string(), ghost);
        let err = render_bpmn(&graph, &extra_node, &Theme::plain(), &DocumentMeta::default())
            .unwrap_err();
        assert!(matches!(&err, DraftError::Internal(msg) if msg.contains("ghost")));

        let mut extra_edge = layout.clone();
        let mut edge = extra_edge.edges[0].clone();
        edge.flow_id = "f9".to_string();
        extra_edge.edges.push(edge);
        let err = render_bpmn(&graph, &extra_edge, &Theme::plain(), &DocumentMeta::default())
            .unwrap_err();
        assert!(matches!(&err, DraftError::Internal(msg) if msg.contains("f9")));

        let mut extra_nested = layout.clone();
        extra_nested.nested.insert("review".to_string(), layout.clone());
        let err = render_bpmn(&graph, &extra_nested, &Theme::plain(), &DocumentMeta::default())
            .unwrap_err();
        assert!(matches!(err, DraftError::Internal(_)));
    }

    #[test]
    fn coordinates_drop_needless_fractions() {
        assert_eq!(fmt_num(140.0), "140");
        assert_eq!(fmt_num(-3.0), "-3");
        assert_eq!(fmt_num(12.5), "12.5");
        assert_eq!(fmt_num(1.0 / 3.0), "0.33");
    }

    #[test]
    fn escapes_all_reserved_characters() {
        assert_eq!(escape_xml("a&b<c>\"d'"), "a&amp;b&lt;c&gt;&quot;d&apos;");
    }
}
