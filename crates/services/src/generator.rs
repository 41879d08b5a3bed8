use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use outline_core::model::{DEFAULT_SECTION_MINUTES, OutlineDraft, SectionDraft};

use crate::error::GeneratorError;

/// One candidate section returned by a generator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeneratedSection {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// Turns free text into candidate outline sections.
#[async_trait]
pub trait OutlineGenerator: Send + Sync {
    /// # Errors
    ///
    /// Returns `GeneratorError` when the input is blank, the backend is unavailable,
    /// or the response cannot be read as sections.
    async fn generate(&self, source_text: &str) -> Result<Vec<GeneratedSection>, GeneratorError>;
}

/// Convert generated items into section drafts with the default duration.
///
/// Items whose title is blank are dropped.
#[must_use]
pub fn sections_from_generated(items: Vec<GeneratedSection>) -> Vec<SectionDraft> {
    items
        .into_iter()
        .filter(|item| !item.title.trim().is_empty())
        .map(|item| {
            SectionDraft::new(item.title.trim(), item.content.trim())
                .with_duration(DEFAULT_SECTION_MINUTES)
        })
        .collect()
}

/// Replace the draft's sections with generated ones.
///
/// Returns the number of sections applied, or `None` (draft untouched) when
/// nothing usable was generated.
pub fn apply_generated(draft: &mut OutlineDraft, items: Vec<GeneratedSection>) -> Option<usize> {
    let sections = sections_from_generated(items);
    if sections.is_empty() {
        return None;
    }
    let applied = sections.len();
    draft.sections = sections;
    Some(applied)
}

#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl GeneratorConfig {
    /// Read `OUTLINE_AI_*` variables. Returns `None` without an API key.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("OUTLINE_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("OUTLINE_AI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("OUTLINE_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// Generator backed by an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct ChatOutlineGenerator {
    client: Client,
    config: Option<GeneratorConfig>,
}

impl ChatOutlineGenerator {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(GeneratorConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<GeneratorConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }
}

#[async_trait]
impl OutlineGenerator for ChatOutlineGenerator {
    async fn generate(&self, source_text: &str) -> Result<Vec<GeneratedSection>, GeneratorError> {
        let source_text = source_text.trim();
        if source_text.is_empty() {
            return Err(GeneratorError::EmptyInput);
        }
        let config = self.config.as_ref().ok_or(GeneratorError::Disabled)?;

        let url = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: build_prompt(source_text),
            }],
            temperature: 0.2,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        tracing::debug!(model = %config.model, chars = source_text.len(), "requesting outline sections");
        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "outline generator request failed");
            return Err(GeneratorError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(GeneratorError::EmptyResponse)?;

        let sections = parse_sections(&content)?;
        tracing::info!(sections = sections.len(), "outline sections generated");
        Ok(sections)
    }
}

fn build_prompt(source_text: &str) -> String {
    format!(
        "Based on the following article, create a presentation outline.\n\
         Respond with a JSON object containing a \"sections\" key holding an array of objects.\n\
         Each object is one section of the presentation and must have:\n\
         1. \"title\" (string): a concise, engaging title for the section.\n\
         2. \"content\" (string): a few key bullet points summarizing the section. \
         Start each bullet point with a hyphen and a space (- ).\n\n\
         Here is the article:\n---\n{source_text}\n---"
    )
}

/// Parse a `{"sections": [...]}` payload, tolerating a surrounding code fence.
///
/// # Errors
///
/// Returns `GeneratorError::Malformed` if the text is not a sections object.
pub fn parse_sections(raw: &str) -> Result<Vec<GeneratedSection>, GeneratorError> {
    let payload: SectionsPayload = serde_json::from_str(strip_code_fence(raw))?;
    Ok(payload.sections)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an info string such as `json`.
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[derive(Debug, Deserialize)]
struct SectionsPayload {
    sections: Vec<GeneratedSection>,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
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
