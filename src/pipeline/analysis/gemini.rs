use std::collections::VecDeque;
use std::sync::Mutex;

use base64::Engine;
use serde::{Deserialize, Serialize};

use super::types::{LlmClient, VisionClient};
use super::AnalysisError;
use crate::config::AppConfig;

/// Gemini REST client (`generateContent`), blocking with a fixed deadline.
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: &str,
        timeout_secs: u64,
    ) -> Result<Self, AnalysisError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AnalysisError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AnalysisError> {
        Self::new(
            &config.llm_base_url,
            &config.model,
            config.api_key(),
            config.llm_timeout_secs,
        )
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn send(&self, parts: Vec<Part<'_>>) -> Result<String, AnalysisError> {
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts,
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    AnalysisError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    AnalysisError::Connection(self.base_url.clone())
                } else {
                    AnalysisError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AnalysisError::Endpoint {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| AnalysisError::ResponseParsing(e.to_string()))?;

        parsed.into_text()
    }
}

// ═══════════════════════════════════════════════════════════
// Wire types (generateContent)
// ═══════════════════════════════════════════════════════════

/// Request body for `models/{model}:generateContent`
#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

/// Response body from `generateContent`
#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Result<String, AnalysisError> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AnalysisError::EmptyResponse("no candidates".into()))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "empty content".into());
            return Err(AnalysisError::EmptyResponse(reason));
        }
        Ok(text)
    }
}

impl LlmClient for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<String, AnalysisError> {
        self.send(vec![Part::Text { text: prompt }])
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

impl VisionClient for GeminiClient {
    fn generate_with_image(&self, prompt: &str, image_png: &[u8]) -> Result<String, AnalysisError> {
        let data = base64::engine::general_purpose::STANDARD.encode(image_png);
        self.send(vec![
            Part::Text { text: prompt },
            Part::InlineData {
                inline_data: InlineData {
                    mime_type: "image/png",
                    data,
                },
            },
        ])
    }
}

// ═══════════════════════════════════════════════════════════
// MockLlmClient: scripted replies for tests
// ═══════════════════════════════════════════════════════════

/// Mock model client for testing. Replies are served in order; the last
/// one repeats once the queue is down to it.
pub struct MockLlmClient {
    replies: Mutex<VecDeque<String>>,
    failure: Option<String>,
    prompts: Mutex<Vec<String>>,
    image_calls: Mutex<usize>,
}

impl MockLlmClient {
    pub fn new(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            failure: None,
            prompts: Mutex::new(Vec::new()),
            image_calls: Mutex::new(0),
        }
    }

    /// Every call fails with an endpoint error carrying `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new(&[])
        }
    }

    /// Number of calls made, text and image alike.
    pub fn calls(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.lock().map(|n| *n).unwrap_or(0)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn next_reply(&self, prompt: &str) -> Result<String, AnalysisError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if let Some(message) = &self.failure {
            return Err(AnalysisError::Endpoint {
                status: 503,
                body: message.clone(),
            });
        }

        let mut replies = self
            .replies
            .lock()
            .map_err(|_| AnalysisError::HttpClient("mock lock poisoned".into()))?;
        let reply = if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        };
        reply.ok_or_else(|| AnalysisError::EmptyResponse("mock has no replies".into()))
    }
}

impl LlmClient for MockLlmClient {
    fn generate(&self, prompt: &str) -> Result<String, AnalysisError> {
        self.next_reply(prompt)
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

impl VisionClient for MockLlmClient {
    fn generate_with_image(
        &self,
        prompt: &str,
        _image_png: &[u8],
    ) -> Result<String, AnalysisError> {
        if let Ok(mut n) = self.image_calls.lock() {
            *n += 1;
        }
        self.next_reply(prompt)
    }
}
