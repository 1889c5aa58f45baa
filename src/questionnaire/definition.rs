use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::questionnaire::error::QuestionnaireError;

/// Language a questionnaire (and every message produced while taking it)
/// is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locale {
    Ru,
    En,
}

/// How a completed attempt is turned into a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringPolicy {
    /// Sum of all recorded weights, reported per block and in total.
    Sum,
    /// Rule-based sensory profile report.
    SensoryProfile,
}

/// The enumerated set of questionnaires the bot offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QuestionnaireKind {
    BeckRu,
    BeckEn,
    SensoryProfileRu,
    SensoryProfileEn,
}

impl QuestionnaireKind {
    pub const ALL: [QuestionnaireKind; 4] = [
        QuestionnaireKind::BeckRu,
        QuestionnaireKind::BeckEn,
        QuestionnaireKind::SensoryProfileRu,
        QuestionnaireKind::SensoryProfileEn,
    ];

    /// Stable key used in callbacks and persisted attempts.
    pub fn key(self) -> &'static str {
        match self {
            QuestionnaireKind::BeckRu => "beckRu",
            QuestionnaireKind::BeckEn => "beckEn",
            QuestionnaireKind::SensoryProfileRu => "sensoryProfileRu",
            QuestionnaireKind::SensoryProfileEn => "sensoryProfileEn",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }

    pub fn title(self) -> &'static str {
        match self {
            QuestionnaireKind::BeckRu => "Шкала депрессии Бека (Русский)",
            QuestionnaireKind::BeckEn => "Beck Depression Inventory (english)",
            QuestionnaireKind::SensoryProfileRu => "Профиль чувствительности (русский)",
            QuestionnaireKind::SensoryProfileEn => "Sensory Profile (english)",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            QuestionnaireKind::BeckRu => "beck_ru.json",
            QuestionnaireKind::BeckEn => "beck_en.json",
            QuestionnaireKind::SensoryProfileRu => "sensory_profile_ru.json",
            QuestionnaireKind::SensoryProfileEn => "sensory_profile_en.json",
        }
    }

    pub fn locale(self) -> Locale {
        match self {
            QuestionnaireKind::BeckRu | QuestionnaireKind::SensoryProfileRu => Locale::Ru,
            QuestionnaireKind::BeckEn | QuestionnaireKind::SensoryProfileEn => Locale::En,
        }
    }

    pub fn scoring(self) -> ScoringPolicy {
        match self {
            QuestionnaireKind::BeckRu | QuestionnaireKind::BeckEn => ScoringPolicy::Sum,
            QuestionnaireKind::SensoryProfileRu | QuestionnaireKind::SensoryProfileEn => {
                ScoringPolicy::SensoryProfile
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOption {
    pub label: String,
    pub weight: f64,
}

/// A question; option order defines the 1-based numbering shown to users.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub prompt: String,
    pub options: Vec<AnswerOption>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    pub description: String,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionnaireDefinition {
    pub kind: QuestionnaireKind,
    pub blocks: Vec<Block>,
}

#[derive(Deserialize)]
struct RawBlock {
    name: String,
    #[serde(default)]
    description: String,
    questions: Vec<RawQuestion>,
}

#[derive(Deserialize)]
struct RawQuestion {
    q: String,
    a: Map<String, Value>,
}

impl QuestionnaireDefinition {
    pub fn new(kind: QuestionnaireKind, blocks: Vec<Block>) -> Self {
        Self { kind, blocks }
    }

    /// Parses the JSON data format: an array of
    /// `{"name", "description", "questions": [{"q", "a": {label: weight}}]}`.
    pub fn from_json(kind: QuestionnaireKind, json: &str) -> Result<Self, QuestionnaireError> {
        let raw: Vec<RawBlock> =
            serde_json::from_str(json).map_err(|source| QuestionnaireError::Parse {
                key: kind.key().to_string(),
                source,
            })?;

        let mut blocks = Vec::with_capacity(raw.len());
        for raw_block in raw {
            let mut questions = Vec::with_capacity(raw_block.questions.len());
            for raw_question in raw_block.questions {
                let mut options = Vec::with_capacity(raw_question.a.len());
                for (label, value) in raw_question.a {
                    let weight = value.as_f64().ok_or_else(|| QuestionnaireError::InvalidWeight {
                        key: kind.key().to_string(),
                        label: label.clone(),
                    })?;
                    options.push(AnswerOption { label, weight });
                }
                questions.push(Question {
                    prompt: raw_question.q,
                    options,
                });
            }
            blocks.push(Block {
                name: raw_block.name,
                description: raw_block.description,
                questions,
            });
        }

        Ok(Self { kind, blocks })
    }

    pub fn question(&self, block: usize, question: usize) -> Option<&Question> {
        self.blocks.get(block)?.questions.get(question)
    }

    pub fn question_count(&self) -> usize {
        self.blocks.iter().map(|b| b.questions.len()).sum()
    }
}

/// Immutable set of questionnaire definitions loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    definitions: BTreeMap<QuestionnaireKind, Arc<QuestionnaireDefinition>>,
}

impl Catalog {
    pub fn from_definitions(definitions: impl IntoIterator<Item = QuestionnaireDefinition>) -> Self {
        Self {
            definitions: definitions
                .into_iter()
                .map(|d| (d.kind, Arc::new(d)))
                .collect(),
        }
    }

    /// Loads every known questionnaire from `dir`. Missing files are skipped
    /// with a warning; unreadable or malformed files are an error.
    pub fn load_dir(dir: &Path) -> Result<Self, QuestionnaireError> {
        let mut definitions = Vec::new();

        for kind in QuestionnaireKind::ALL {
            let path = dir.join(kind.file_name());
            if !path.exists() {
                tracing::warn!(
                    "Questionnaire data {} not found, '{}' will not be offered",
                    path.display(),
                    kind.key()
                );
                continue;
            }

            let json = std::fs::read_to_string(&path).map_err(|source| QuestionnaireError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let definition = QuestionnaireDefinition::from_json(kind, &json)?;
            tracing::info!(
                "Loaded questionnaire '{}': {} blocks, {} questions",
                kind.key(),
                definition.blocks.len(),
                definition.question_count()
            );
            definitions.push(definition);
        }

        Ok(Self::from_definitions(definitions))
    }

    pub fn get(&self, kind: QuestionnaireKind) -> Result<&QuestionnaireDefinition, QuestionnaireError> {
        self.definitions
            .get(&kind)
            .map(|d| d.as_ref())
            .ok_or_else(|| QuestionnaireError::Unavailable(kind.key().to_string()))
    }

    /// Questionnaires that can be offered, in catalog order.
    pub fn available(&self) -> Vec<QuestionnaireKind> {
        self.definitions.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_order_follows_json_order() {
        let json = r#"[{"name": "B", "description": "d", "questions": [
            {"q": "Q1", "a": {"zeta": 3, "alpha": 0, "mid": 1.5}}
        ]}]"#;
        let def = QuestionnaireDefinition::from_json(QuestionnaireKind::BeckEn, json).unwrap();
        let labels: Vec<_> = def.blocks[0].questions[0]
            .options
            .iter()
            .map(|o| o.label.as_str())
            .collect();
        assert_eq!(labels, vec!["zeta", "alpha", "mid"]);
        assert_eq!(def.blocks[0].questions[0].options[2].weight, 1.5);
    }

    #[test]
    fn test_non_numeric_weight_is_rejected() {
        let json = r#"[{"name": "B", "questions": [{"q": "Q1", "a": {"yes": "a lot"}}]}]"#;
        let result = QuestionnaireDefinition::from_json(QuestionnaireKind::BeckEn, json);
        assert!(matches!(result, Err(QuestionnaireError::InvalidWeight { .. })));
    }

    #[test]
    fn test_kind_keys_round_trip() {
        for kind in QuestionnaireKind::ALL {
            assert_eq!(QuestionnaireKind::from_key(kind.key()), Some(kind));
        }
        assert_eq!(QuestionnaireKind::from_key("unknown"), None);
    }
}
