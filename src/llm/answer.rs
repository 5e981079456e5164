use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::time::Duration;

use crate::config::AnswerConfig;
use crate::models::SemanticHit;

const PROMPT_PREAMBLE: &str = "Use the program snippets to answer the question. \
     Keep answers grounded and cite program_stream_id when useful.";

/// Produces a grounded natural-language answer from ranked hits.
///
/// Only constructed when a credential is configured; callers hold it as
/// `Option<Arc<dyn AnswerGenerator>>` and treat any error as "no answer".
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn answer(&self, question: &str, hits: &[SemanticHit]) -> Result<String>;
}

/// Render one context block per hit: the snippet followed by its metadata.
pub fn build_context(hits: &[SemanticHit]) -> String {
    let mut context = String::new();
    for (i, hit) in hits.iter().enumerate() {
        if i > 0 {
            context.push_str("\n\n");
        }
        let _ = write!(
            context,
            "[program_stream_id: {} | discipline_name: {} | province: {}]\n{}",
            hit.program_stream_id,
            hit.discipline_name,
            hit.province,
            hit.description_snippet.as_deref().unwrap_or_default(),
        );
    }
    context
}

pub fn build_prompt(question: &str, hits: &[SemanticHit]) -> String {
    format!(
        "{PROMPT_PREAMBLE}\n\nQuestion: {question}\n\nSnippets:\n{}",
        build_context(hits)
    )
}

/// Answer generator backed by an OpenAI-compatible chat completions API.
pub struct OpenAiAnswerer {
    client: reqwest::Client,
    config: AnswerConfig,
    api_key: String,
}

impl OpenAiAnswerer {
    /// Returns `None` when no API key is configured.
    pub fn from_config(client: reqwest::Client, config: &AnswerConfig) -> Option<Self> {
        let api_key = config.api_key.clone()?;
        Some(Self {
            client,
            config: config.clone(),
            api_key,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

fn extract_answer(body: ChatResponse) -> Result<String> {
    body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .context("Answer model returned no content")
}

#[async_trait]
impl AnswerGenerator for OpenAiAnswerer {
    async fn answer(&self, question: &str, hits: &[SemanticHit]) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);
        let prompt = build_prompt(question, hits);

        let req = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
            temperature: 0.0,
        };

        let resp = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&req)
            .send()
            .await
            .context("Failed to call answer model")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Answer model returned {status}: {body}");
        }

        let body: ChatResponse = resp
            .json()
            .await
            .context("Failed to parse answer model response")?;
        extract_answer(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: i64, snippet: Option<&str>) -> SemanticHit {
        SemanticHit {
            program_stream_id: id,
            program_name: "Internal Medicine".to_string(),
            program_stream_name: "CMG".to_string(),
            discipline_name: "Internal Medicine".to_string(),
            province: "AB".to_string(),
            similarity: 0.7,
            description_snippet: snippet.map(str::to_string),
        }
    }

    #[test]
    fn test_context_has_one_block_per_hit() {
        let context = build_context(&[hit(11, Some("Calgary based.")), hit(12, None)]);
        let blocks: Vec<&str> = context.split("\n\n").collect();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].starts_with("[program_stream_id: 11 |"));
        assert!(blocks[0].ends_with("Calgary based."));
        assert!(blocks[1].contains("province: AB"));
    }

    #[test]
    fn test_prompt_contains_question_and_instructions() {
        let prompt = build_prompt("Which programs are in Alberta?", &[hit(11, Some("x"))]);
        assert!(prompt.starts_with("Use the program snippets to answer the question."));
        assert!(prompt.contains("cite program_stream_id when useful"));
        assert!(prompt.contains("Question: Which programs are in Alberta?"));
        assert!(prompt.contains("Snippets:\n[program_stream_id: 11"));
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = AnswerConfig::default();
        assert!(OpenAiAnswerer::from_config(reqwest::Client::new(), &config).is_none());

        let config = AnswerConfig {
            api_key: Some("sk-test".to_string()),
            ..AnswerConfig::default()
        };
        assert!(OpenAiAnswerer::from_config(reqwest::Client::new(), &config).is_some());
    }

    #[test]
    fn test_extract_answer() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": " Program 11. "}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_answer(body).unwrap(), "Program 11.");
    }

    #[test]
    fn test_extract_answer_empty_choices_is_error() {
        let body: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(extract_answer(body).is_err());
    }

    #[test]
    fn test_extract_answer_null_content_is_error() {
        let body: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap();
        assert!(extract_answer(body).is_err());
    }
}
