use bpmn_drafter::theme::Theme;
use bpmn_drafter::{CompilerConfig, compile_draft};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DraftOptions {
    max_nodes: Option<usize>,
    max_flows: Option<usize>,
    max_response_bytes: Option<usize>,
    theme: Option<String>,
    policy_version: Option<String>,
    /// Copied into the envelope as `createdAt`.
    created_at: Option<String>,
    /// `true` returns the full result envelope as JSON instead of bare XML.
    result_envelope: Option<bool>,
}

fn build_config(options: &DraftOptions) -> Result<CompilerConfig, String> {
    let mut config = CompilerConfig::default();
    if let Some(v) = options.max_nodes {
        config.limits.max_nodes = v;
    }
    if let Some(v) = options.max_flows {
        config.limits.max_flows = v;
    }
    if let Some(v) = options.max_response_bytes {
        config.limits.max_response_bytes = v;
    }
    if let Some(name) = options.theme.as_deref() {
        config.theme = Theme::by_name(name).ok_or_else(|| format!("unknown theme '{name}'"))?;
    }
    if let Some(v) = options.policy_version.as_deref() {
        config.policy_version = v.trim().to_string();
    }
    Ok(config)
}

fn compile(candidate: &str, options: DraftOptions) -> Result<String, String> {
    let config = build_config(&options)?;
    let compiled = compile_draft(candidate, &config).map_err(|error| error.to_string())?;
    if options.result_envelope.unwrap_or(false) {
        let result = match options.created_at {
            Some(stamp) => compiled.result_at(&config, stamp),
            None => compiled.result(&config),
        };
        serde_json::to_string(&result).map_err(|error| error.to_string())
    } else {
        Ok(compiled.bpmn_xml)
    }
}

#[wasm_bindgen]
pub fn compile_bpmn_draft(candidate: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<DraftOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        DraftOptions::default()
    };

    compile(candidate, options).map_err(|error| JsValue::from_str(&error))
}

#[cfg(test)]
mod tests {
    use crate::{DraftOptions, compile};

    const CANDIDATE: &str = r#"```json
{
  "processName": "Triagem",
  "nodes": [
    {"id": "start", "type": "start", "label": "Chamado aberto"},
    {"id": "route", "type": "task", "label": "Sistema classifica chamado"},
    {"id": "end", "type": "end", "label": "Chamado roteado"}
  ],
  "flows": [
    {"id": "f1", "source": "start", "target": "route"},
    {"id": "f2", "source": "route", "target": "end"}
  ]
}
```"#;

    #[test]
    fn compiles_fenced_candidate_to_xml() {
        let xml = compile(CANDIDATE, DraftOptions::default()).expect("candidate should compile");
        assert!(xml.contains("<bpmn:serviceTask"));
        assert!(xml.contains("Lane_Automation"));
    }

    #[test]
    fn envelope_and_bad_limits() {
        let options = DraftOptions {
            result_envelope: Some(true),
            created_at: Some("2024-05-01T12:00:00Z".to_string()),
            ..Default::default()
        };
        let json = compile(CANDIDATE, options).expect("candidate should compile");
        assert!(json.contains("\"nodeCount\":3"));
        assert!(json.contains("\"createdAt\":\"2024-05-01T12:00:00Z\""));

        let options = DraftOptions {
            max_nodes: Some(2),
            ..Default::default()
        };
        let err = compile(CANDIDATE, options).unwrap_err();
        assert!(err.contains("maxNodes"));
    }
}
