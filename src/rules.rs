//! Keyword tables driving classification and loop detection.
//!
//! Labels and keywords are compared after [`normalize_words`]: lower-cased,
//! diacritics folded to ASCII and split into `[a-z0-9]+` words. A keyword word
//! of five or more characters is a stem and matches any label word starting
//! with it; shorter keyword words (`ia`, `api`, `ceo`) must match exactly.
//! Multi-word keywords match a consecutive run of label words.

use crate::ir::{Lane, NodeKind};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9]+").unwrap());

const STEM_MIN_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRule {
    pub name: String,
    pub keywords: Vec<String>,
    pub kind: NodeKind,
    pub lane: Lane,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopRoles {
    pub plan: Vec<String>,
    pub execute: Vec<String>,
    pub check: Vec<String>,
    pub act: Vec<String>,
}

impl Default for LoopRoles {
    fn default() -> Self {
        Self {
            plan: words(&["planej", "plano", "plan"]),
            execute: words(&["execut", "fazer", "realiz", "implement", "implant"]),
            check: words(&["verific", "checar", "check", "avalia", "medir", "monitor", "confer"]),
            act: words(&[
                "agir", "act", "corrig", "correc", "corret", "ajust", "adjust", "atuar",
            ]),
        }
    }
}

/// Names given to the synthesized elements of a folded loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoopLabels {
    pub subprocess: String,
    pub start: String,
    pub end: String,
    pub gateway: String,
    pub goal_met: String,
    pub goal_not_met: String,
    pub exit: String,
}

impl Default for LoopLabels {
    fn default() -> Self {
        Self {
            subprocess: "Ciclo PDCA".to_string(),
            start: "Início do ciclo".to_string(),
            end: "Ciclo concluído".to_string(),
            gateway: "Meta atingida?".to_string(),
            goal_met: "Sim".to_string(),
            goal_not_met: "Não".to_string(),
            exit: "Sim".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuleSet {
    /// Checked in order; the first rule with a matching keyword wins.
    pub classification: Vec<ClassificationRule>,
    pub default_kind: NodeKind,
    pub default_lane: Lane,
    pub loop_roles: LoopRoles,
    pub standardize_keywords: Vec<String>,
    pub loop_labels: LoopLabels,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self {
            classification: vec![
                ClassificationRule {
                    name: "executive-escalation".to_string(),
                    keywords: words(&[
                        "diretor", "president", "ceo", "conselho", "executiv", "escalon",
                        "escalar", "board",
                    ]),
                    kind: NodeKind::UserTask,
                    lane: Lane::Executive,
                },
                ClassificationRule {
                    name: "business-rule".to_string(),
                    keywords: words(&[
                        "regra", "politica", "compliance", "conformidade", "norma", "regulament",
                        "regulat", "elegibil", "lgpd",
                    ]),
                    kind: NodeKind::BusinessRuleTask,
                    lane: Lane::Automation,
                },
                ClassificationRule {
                    name: "automation".to_string(),
                    keywords: words(&[
                        "sistema", "automa", "integra", "api", "ia", "ai", "robo", "bot", "rpa",
                        "notifica", "email", "sincroniz", "erp", "crm", "webhook",
                    ]),
                    kind: NodeKind::ServiceTask,
                    lane: Lane::Automation,
                },
                ClassificationRule {
                    name: "management".to_string(),
                    keywords: words(&[
                        "aprova", "gerente", "gestor", "gestao", "supervis", "coorden", "autoriz",
                        "homolog", "revis", "valida",
                    ]),
                    kind: NodeKind::UserTask,
                    lane: Lane::Management,
                },
            ],
            default_kind: NodeKind::UserTask,
            default_lane: Lane::Operational,
            loop_roles: LoopRoles::default(),
            standardize_keywords: words(&["padroniz", "padrao", "comunic", "divulg", "standard"]),
            loop_labels: LoopLabels::default(),
        }
    }
}

impl RuleSet {
    /// Kind and lane for a generic task label.
    pub fn classify_label(&self, label: &str) -> (NodeKind, Lane) {
        let label_words = normalize_words(label);
        self.classification
            .iter()
            .find(|rule| matches_any(&label_words, &rule.keywords))
            .map(|rule| (rule.kind, rule.lane))
            .unwrap_or((self.default_kind, self.default_lane))
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|value| value.to_string()).collect()
}

/// Folds the Latin-1 diacritics found in Portuguese business vocabulary.
pub fn fold_diacritics(input: &str) -> String {
    input
        .chars()
        .map(|ch| match ch {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

pub fn normalize_words(label: &str) -> Vec<String> {
    let folded = fold_diacritics(&label.to_lowercase());
    WORD_RE
        .find_iter(&folded)
        .map(|m| m.as_str().to_string())
        .collect()
}

fn word_matches(word: &str, keyword: &str) -> bool {
    if keyword.len() >= STEM_MIN_LEN {
        word.starts_with(keyword)
    } else {
        word == keyword
    }
}

pub fn matches_keyword(label_words: &[String], keyword: &str) -> bool {
    let keyword_words = normalize_words(keyword);
    if keyword_words.is_empty() || keyword_words.len() > label_words.len() {
        return false;
    }
    label_words.windows(keyword_words.len()).any(|window| {
        window
            .iter()
            .zip(&keyword_words)
            .all(|(word, keyword)| word_matches(word, keyword))
    })
}

pub fn matches_any(label_words: &[String], keywords: &[String]) -> bool {
    keywords
        .iter()
        .any(|keyword| matches_keyword(label_words, keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_accents_and_case() {
        assert_eq!(
            normalize_words("Aprovação da GERÊNCIA, já!"),
            vec!["aprovacao", "da", "gerencia", "ja"]
        );
    }

    #[test]
    fn short_keywords_match_whole_words_only() {
        let label = normalize_words("Triagem via IA");
        assert!(matches_keyword(&label, "ia"));
        let label = normalize_words("Iniciar atendimento");
        assert!(!matches_keyword(&label, "ia"));
    }

    #[test]
    fn stems_match_word_prefixes() {
        let label = normalize_words("Aprovar orçamento");
        assert!(matches_keyword(&label, "aprova"));
        assert!(!matches_keyword(&label, "reprova"));
    }

    #[test]
    fn multi_word_keywords_match_consecutive_words() {
        let label = normalize_words("Registrar ação corretiva imediata");
        assert!(matches_keyword(&label, "ação corretiva"));
        assert!(!matches_keyword(&label, "corretiva ação"));
    }

    #[test]
    fn classification_respects_priority() {
        let rules = RuleSet::default();
        // executive keywords beat management ones
        assert_eq!(
            rules.classify_label("Escalonar aprovação para diretoria"),
            (NodeKind::UserTask, Lane::Executive)
        );
        assert_eq!(
            rules.classify_label("Validar regra de crédito"),
            (NodeKind::BusinessRuleTask, Lane::Automation)
        );
        assert_eq!(
            rules.classify_label("Enviar notificação por e-mail"),
            (NodeKind::ServiceTask, Lane::Automation)
        );
        assert_eq!(
            rules.classify_label("Gerente aprova pedido"),
            (NodeKind::UserTask, Lane::Management)
        );
        assert_eq!(
            rules.classify_label("Separar mercadoria"),
            (NodeKind::UserTask, Lane::Operational)
        );
    }

    #[test]
    fn rule_set_deserializes_partially() {
        let rules: RuleSet = serde_json::from_str(
            r#"{ "standardizeKeywords": ["publicar"], "defaultLane": "management" }"#,
        )
        .unwrap();
        assert_eq!(rules.standardize_keywords, vec!["publicar"]);
        assert_eq!(rules.default_lane, Lane::Management);
        assert_eq!(rules.classification.len(), 4);
    }
}
