use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::classify::classify;
use crate::config::CompilerConfig;
use crate::error::DraftError;
use crate::fold::fold_loops;
use crate::ir::{DraftGraph, RenderGraph};
use crate::layout::{GraphLayout, compute_layout};
use crate::parser::read_candidate;
use crate::render::{DocumentMeta, render_bpmn};
use crate::schema::validate_draft;

/// Every intermediate product of one compilation.
#[derive(Debug, Clone)]
pub struct CompiledDraft {
    pub draft: DraftGraph,
    pub graph: RenderGraph,
    pub layout: GraphLayout,
    pub bpmn_xml: String,
}

/// Response envelope returned to callers of the draft endpoint.
///
/// `created_at` is whatever timestamp the caller supplies; compilation itself
/// never reads the clock, so equal inputs give equal envelopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub policy_version: String,
    pub provider: String,
    pub model: String,
    pub draft: DraftGraph,
    pub bpmn_xml: String,
    pub node_count: usize,
    pub flow_count: usize,
    pub bpmn_xml_bytes: usize,
}

impl CompiledDraft {
    pub fn result(&self, config: &CompilerConfig) -> DraftResult {
        DraftResult {
            created_at: None,
            policy_version: config.policy_version.clone(),
            provider: config.provider.clone(),
            model: config.model.clone(),
            draft: self.draft.clone(),
            bpmn_xml: self.bpmn_xml.clone(),
            node_count: self.draft.nodes.len(),
            flow_count: self.draft.flows.len(),
            bpmn_xml_bytes: self.bpmn_xml.len(),
        }
    }

    /// [`CompiledDraft::result`] stamped with a caller-supplied `createdAt`.
    pub fn result_at(&self, config: &CompilerConfig, created_at: impl Into<String>) -> DraftResult {
        DraftResult {
            created_at: Some(created_at.into()),
            ..self.result(config)
        }
    }
}

/// Raw provider text to BPMN XML. Limits are checked before the candidate
/// is read.
pub fn compile_draft(raw: &str, config: &CompilerConfig) -> Result<CompiledDraft, DraftError> {
    config.limits.validate()?;
    config.layout.validate()?;
    let value = read_candidate(raw, &config.limits)?;
    compile_checked(&value, config)
}

/// Same as [`compile_draft`] for an already parsed candidate.
pub fn compile_value(value: &Value, config: &CompilerConfig) -> Result<CompiledDraft, DraftError> {
    config.limits.validate()?;
    config.layout.validate()?;
    compile_checked(value, config)
}

fn compile_checked(value: &Value, config: &CompilerConfig) -> Result<CompiledDraft, DraftError> {
    let draft = validate_draft(value, &config.limits)?;
    let graph = fold_loops(classify(&draft, &config.rules), &config.rules);
    let layout = compute_layout(&graph, &config.layout);
    let bpmn_xml = render_bpmn(&graph, &layout, &config.theme, &DocumentMeta::default())?;
    tracing::debug!(
        process = %draft.process_name,
        nodes = draft.nodes.len(),
        flows = draft.flows.len(),
        bytes = bpmn_xml.len(),
        "compiled draft"
    );
    Ok(CompiledDraft {
        draft,
        graph,
        layout,
        bpmn_xml,
    })
}
