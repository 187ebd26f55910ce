use std::env;
use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use practice_core::Clock;
use practice_core::model::{
    Difficulty, Question, QuestionDraft, QuestionStatus, QuestionType, TopicId, UnitId,
};
use storage::repository::{QuestionRepository, StorageError, UnitRepository};

use crate::error::GenerationError;

#[derive(Clone, Debug)]
pub struct GenerationConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl GenerationConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("PRACTICE_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url = env::var("PRACTICE_AI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("PRACTICE_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// What to synthesize when the question bank runs dry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationRequest {
    pub unit_id: UnitId,
    pub topic_id: Option<TopicId>,
    pub question_type: QuestionType,
    pub difficulty: Difficulty,
    pub auto_approve: bool,
}

/// On-demand question synthesis via an external chat-completion service.
///
/// The collaborator is opaque: we send a prompt describing the unit, topic,
/// type, and tier, expect a JSON payload back, and persist the result. With
/// no API key configured the generator reports `Disabled` instead.
#[derive(Clone)]
pub struct QuestionGenerator {
    client: Client,
    config: Option<GenerationConfig>,
    clock: Clock,
    units: Arc<dyn UnitRepository>,
    questions: Arc<dyn QuestionRepository>,
}

impl QuestionGenerator {
    #[must_use]
    pub fn from_env(
        clock: Clock,
        units: Arc<dyn UnitRepository>,
        questions: Arc<dyn QuestionRepository>,
    ) -> Self {
        Self::new(GenerationConfig::from_env(), clock, units, questions)
    }

    #[must_use]
    pub fn new(
        config: Option<GenerationConfig>,
        clock: Clock,
        units: Arc<dyn UnitRepository>,
        questions: Arc<dyn QuestionRepository>,
    ) -> Self {
        Self {
            client: Client::new(),
            config,
            clock,
            units,
            questions,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Synthesize a question and persist it.
    ///
    /// Generated questions land in `PendingReview` unless the request
    /// auto-approves them, in which case they are served immediately.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` when the generator is disabled, the request
    /// fails, the payload cannot be parsed, or persistence fails.
    pub async fn generate_and_store(
        &self,
        request: &GenerationRequest,
    ) -> Result<Question, GenerationError> {
        let config = self.config.as_ref().ok_or(GenerationError::Disabled)?;

        let unit = self
            .units
            .get_unit(request.unit_id)
            .await?
            .ok_or(StorageError::NotFound)?;
        let topic_name = match request.topic_id {
            Some(topic_id) => self
                .units
                .list_topics(request.unit_id)
                .await?
                .into_iter()
                .find(|t| t.id == topic_id)
                .map(|t| t.name),
            None => None,
        };

        let prompt = build_prompt(&unit.name, topic_name.as_deref(), request);
        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.7,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenerationError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(GenerationError::EmptyResponse)?;

        let generated: GeneratedQuestion = serde_json::from_str(strip_code_fences(&content))?;

        let status = if request.auto_approve {
            QuestionStatus::Approved
        } else {
            QuestionStatus::PendingReview
        };
        let draft = QuestionDraft {
            unit_id: request.unit_id,
            topic_id: request.topic_id,
            question_text: generated.question_text,
            code_snippet: generated.code_snippet,
            options: generated.options,
            correct_answer: generated.correct_answer,
            explanation: generated.explanation,
            question_type: request.question_type,
            difficulty: request.difficulty,
            status,
        };
        let validated = draft.validate(self.clock.now())?;
        let id = self.questions.insert_question(&validated).await?;

        info!(
            question = %id,
            unit = %request.unit_id,
            difficulty = %request.difficulty,
            auto_approve = request.auto_approve,
            "question generated"
        );

        Ok(validated.assign_id(id))
    }
}

fn build_prompt(unit_name: &str, topic_name: Option<&str>, request: &GenerationRequest) -> String {
    let scope = match topic_name {
        Some(topic) => format!("the topic \"{topic}\" in the unit \"{unit_name}\""),
        None => format!("the unit \"{unit_name}\""),
    };
    format!(
        "Write one {} practice question of type {} about {}.\n\
         Respond with a single JSON object and nothing else, using keys:\n\
         questionText (string), codeSnippet (string or null), options (array of strings,\n\
         empty unless multiple choice), correctAnswer (string), explanation (string).",
        request.difficulty, request.question_type, scope
    )
}

/// Chat models often wrap JSON in markdown fences; tolerate that.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.trim_end_matches('`').trim()
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneratedQuestion {
    question_text: String,
    #[serde(default)]
    code_snippet: Option<String>,
    #[serde(default)]
    options: Vec<String>,
    correct_answer: String,
    explanation: String,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use practice_core::time::fixed_clock;
    use storage::repository::Storage;

    fn request() -> GenerationRequest {
        GenerationRequest {
            unit_id: UnitId::new(1),
            topic_id: None,
            question_type: QuestionType::MultipleChoice,
            difficulty: Difficulty::Medium,
            auto_approve: true,
        }
    }

    #[tokio::test]
    async fn unconfigured_generator_is_disabled() {
        let storage = Storage::in_memory();
        let generator =
            QuestionGenerator::new(None, fixed_clock(), storage.units, storage.questions);
        assert!(!generator.enabled());

        let err = generator.generate_and_store(&request()).await.unwrap_err();
        assert!(matches!(err, GenerationError::Disabled));
    }

    #[test]
    fn prompt_names_unit_topic_and_tier() {
        let prompt = build_prompt("Primitive Types", Some("Casting"), &request());
        assert!(prompt.contains("\"Casting\""));
        assert!(prompt.contains("\"Primitive Types\""));
        assert!(prompt.contains("MEDIUM"));
        assert!(prompt.contains("MULTIPLE_CHOICE"));
    }

    #[test]
    fn fenced_payloads_are_unwrapped() {
        let fenced = "```json\n{\"questionText\": \"Q\"}\n```";
        assert_eq!(strip_code_fences(fenced), "{\"questionText\": \"Q\"}");
        assert_eq!(strip_code_fences(" {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn payload_parses_with_optional_fields_missing() {
        let raw = r#"{
            "questionText": "Which value fits an int?",
            "correctAnswer": "42",
            "explanation": "ints hold whole numbers"
        }"#;
        let parsed: GeneratedQuestion = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.question_text, "Which value fits an int?");
        assert!(parsed.options.is_empty());
        assert!(parsed.code_snippet.is_none());
    }
}
