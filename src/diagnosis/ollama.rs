//! Ollama-backed plant health analyzer.
//!
//! The image is base64-encoded and sent to a vision model over `/api/chat`
//! with `format: "json"`. The reply is parsed into a [`HealthAnalysis`];
//! anything that does not parse is a [`AnalysisError::MalformedResponse`].

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::error::AnalysisError;
use super::images::ImageAccess;
use super::traits::{AnalysisCapability, CallerAuth};
use crate::config::AnalysisConfig;
use crate::models::{HealthAnalysis, ImageRef, PlantMetadata};

/// Vision chat transport. One call, one model reply.
pub trait VisionChat: Send + Sync {
    fn chat_with_images(
        &self,
        model: &str,
        prompt: &str,
        images: &[String],
        system: Option<&str>,
        bearer: Option<&str>,
    ) -> Result<String, AnalysisError>;
}

// ── Wire types ───────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    format: &'a str,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<&'a [String]>,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

// ═══════════════════════════════════════════════════════════
// HTTP client
// ═══════════════════════════════════════════════════════════

pub struct OllamaVisionClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaVisionClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, AnalysisError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AnalysisError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn from_config(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        Self::new(&config.base_url, config.timeout_secs)
    }
}

impl VisionChat for OllamaVisionClient {
    fn chat_with_images(
        &self,
        model: &str,
        prompt: &str,
        images: &[String],
        system: Option<&str>,
        bearer: Option<&str>,
    ) -> Result<String, AnalysisError> {
        let url = format!("{}/api/chat", self.base_url);

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
                images: None,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
            images: Some(images),
        });

        let body = ChatRequest {
            model,
            messages,
            stream: false,
            format: "json",
            options: ChatOptions { temperature: 0.1 },
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().map_err(|e| {
            if e.is_connect() {
                AnalysisError::NotReachable(self.base_url.clone())
            } else if e.is_timeout() {
                AnalysisError::Timeout(self.timeout_secs)
            } else {
                AnalysisError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AnalysisError::Unauthorized);
        }
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(AnalysisError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

        Ok(parsed.message.content)
    }
}

// ═══════════════════════════════════════════════════════════
// Analyzer
// ═══════════════════════════════════════════════════════════

const SYSTEM_PROMPT: &str = "You are a plant health specialist. You look at a single photo of a \
plant and assess its health. Reply with JSON only.";

pub struct OllamaPlantAnalyzer {
    client: Arc<dyn VisionChat>,
    images: Arc<ImageAccess>,
    model: String,
}

impl OllamaPlantAnalyzer {
    pub fn new(client: Arc<dyn VisionChat>, images: Arc<ImageAccess>, model: String) -> Self {
        Self {
            client,
            images,
            model,
        }
    }
}

impl AnalysisCapability for OllamaPlantAnalyzer {
    fn analyze(
        &self,
        image_ref: &ImageRef,
        plant: &PlantMetadata,
        auth: &CallerAuth,
    ) -> Result<HealthAnalysis, AnalysisError> {
        let _span = tracing::info_span!(
            "plant_analysis",
            plant_id = %plant.plant_id,
            model = %self.model,
        )
        .entered();

        let bytes = self.images.load(image_ref)?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let prompt = build_prompt(plant);

        tracing::debug!(image_bytes = bytes.len(), "Sending image for analysis");
        let raw = self.client.chat_with_images(
            &self.model,
            &prompt,
            &[encoded],
            Some(SYSTEM_PROMPT),
            auth.token(),
        )?;

        let analysis = parse_analysis_response(&raw)?;
        tracing::info!(
            overall_health = ?analysis.overall_health,
            issues = analysis.issues.len(),
            "Plant analysis received"
        );
        Ok(analysis)
    }
}

fn build_prompt(plant: &PlantMetadata) -> String {
    let species = plant.species.as_deref().unwrap_or("unknown species");
    format!(
        "Assess the health of this plant named \"{}\" ({species}).\n\
         Respond with a JSON object with these fields:\n\
         - \"overall_health\": one of \"excellent\", \"good\", \"fair\", \"poor\", \"critical\"\n\
         - \"confidence\": number between 0 and 1\n\
         - \"issues\": array of {{\"name\", \"severity\" (\"low\"|\"medium\"|\"high\"), \"description\"}}\n\
         - \"recommendations\": array of short care instructions",
        plant.name
    )
}

/// Parse the model reply. Tolerates a surrounding Markdown code fence.
pub fn parse_analysis_response(raw: &str) -> Result<HealthAnalysis, AnalysisError> {
    let trimmed = strip_code_fence(raw.trim());
    if trimmed.is_empty() {
        return Err(AnalysisError::MalformedResponse("empty response".into()));
    }
    serde_json::from_str(trimmed).map_err(|e| AnalysisError::MalformedResponse(e.to_string()))
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Returns a canned reply and records what it was sent.
pub struct MockVisionChat {
    response: Result<String, u16>,
    last_bearer: std::sync::Mutex<Option<String>>,
    last_images: std::sync::Mutex<Vec<String>>,
}

impl MockVisionChat {
    pub fn new(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
            last_bearer: std::sync::Mutex::new(None),
            last_images: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Fails every call with the given HTTP status.
    pub fn failing(status: u16) -> Self {
        Self {
            response: Err(status),
            last_bearer: std::sync::Mutex::new(None),
            last_images: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn last_bearer(&self) -> Option<String> {
        self.last_bearer.lock().ok().and_then(|b| b.clone())
    }

    pub fn last_images(&self) -> Vec<String> {
        self.last_images.lock().map(|i| i.clone()).unwrap_or_default()
    }
}

impl VisionChat for MockVisionChat {
    fn chat_with_images(
        &self,
        _model: &str,
        _prompt: &str,
        images: &[String],
        _system: Option<&str>,
        bearer: Option<&str>,
    ) -> Result<String, AnalysisError> {
        if let Ok(mut slot) = self.last_bearer.lock() {
            *slot = bearer.map(str::to_string);
        }
        if let Ok(mut slot) = self.last_images.lock() {
            *slot = images.to_vec();
        }
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(AnalysisError::Api {
                status: *status,
                message: "mock failure".into(),
            }),
        }
    }
}
