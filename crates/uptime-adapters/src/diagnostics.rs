//! AI-assisted log diagnostics.
//!
//! [`DiagnosticAdvisor`] builds prompts from event log entries and hands
//! them to a [`TextGenerator`]. It never returns an error: missing
//! credentials and transport failures degrade to fixed advisory text.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use uptime_state::{LogEntry, LogLevel, Service};

use crate::error::{AdapterError, AdapterResult};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const SYSTEM_INSTRUCTION: &str =
    "You are an expert IT diagnostics tool embedded in a dashboard.";

pub const ANALYSIS_NO_KEY: &str = "API Key not configured. Unable to analyze.";
pub const ANALYSIS_UNAVAILABLE: &str =
    "Error connecting to AI diagnostics service. Please check your API key and connection.";
pub const ANALYSIS_EMPTY: &str = "No analysis generated.";

pub const REPORT_NO_KEY: &str = "API Key not configured.";
pub const REPORT_UNAVAILABLE: &str = "Failed to generate health report.";
pub const REPORT_EMPTY: &str = "Report generation failed.";

/// Number of recent ERROR entries included in a health report.
pub const REPORT_RECENT_ERRORS: usize = 5;

/// Boxed future returned by [`TextGenerator::generate`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A prompt for the text generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_instruction: Option<String>,
}

/// Pluggable text generation backend.
pub trait TextGenerator: Send + Sync {
    /// Whether credentials are present. The advisor skips the call when
    /// this is false.
    fn is_configured(&self) -> bool {
        true
    }

    /// Generate text for a prompt. An empty string means "no output".
    fn generate<'a>(&'a self, request: &'a GenerationRequest) -> BoxFuture<'a, AdapterResult<String>>;
}

/// Gemini `generateContent` over HTTPS.
#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiGenerator {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> AdapterResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AdapterError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model
        )
    }

    async fn call(&self, request: &GenerationRequest) -> AdapterResult<String> {
        let key = self.api_key.as_deref().ok_or(AdapterError::MissingCredentials)?;

        let mut body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
        });
        if let Some(instruction) = &request.system_instruction {
            body["systemInstruction"] = json!({ "parts": [{ "text": instruction }] });
        }

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::Status(status.as_u16()));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Malformed(e.to_string()))?;
        Ok(parsed.text())
    }
}

impl TextGenerator for GeminiGenerator {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn generate<'a>(&'a self, request: &'a GenerationRequest) -> BoxFuture<'a, AdapterResult<String>> {
        Box::pin(self.call(request))
    }
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

#[derive(Debug, Default, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Turns log entries into advisory text.
#[derive(Clone)]
pub struct DiagnosticAdvisor {
    generator: Arc<dyn TextGenerator>,
}

impl DiagnosticAdvisor {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub fn is_configured(&self) -> bool {
        self.generator.is_configured()
    }

    /// Root cause, troubleshooting steps, and severity for one entry.
    pub async fn summarize_failure(&self, entry: &LogEntry, service: Option<&Service>) -> String {
        if !self.generator.is_configured() {
            return ANALYSIS_NO_KEY.to_string();
        }
        let request = GenerationRequest {
            prompt: failure_prompt(entry, service),
            system_instruction: Some(SYSTEM_INSTRUCTION.to_string()),
        };
        match self.generator.generate(&request).await {
            Ok(text) if text.trim().is_empty() => ANALYSIS_EMPTY.to_string(),
            Ok(text) => {
                debug!(log_id = entry.id, chars = text.len(), "failure analysis generated");
                text
            }
            Err(AdapterError::MissingCredentials) => ANALYSIS_NO_KEY.to_string(),
            Err(e) => {
                warn!(log_id = entry.id, error = %e, "failure analysis unavailable");
                ANALYSIS_UNAVAILABLE.to_string()
            }
        }
    }

    /// Stability summary over all services and the most recent errors.
    pub async fn health_report(&self, services: &[Service], log: &[LogEntry]) -> String {
        if !self.generator.is_configured() {
            return REPORT_NO_KEY.to_string();
        }
        let request = GenerationRequest {
            prompt: health_report_prompt(services, log),
            system_instruction: None,
        };
        match self.generator.generate(&request).await {
            Ok(text) if text.trim().is_empty() => REPORT_EMPTY.to_string(),
            Ok(text) => text,
            Err(AdapterError::MissingCredentials) => REPORT_NO_KEY.to_string(),
            Err(e) => {
                warn!(error = %e, "health report unavailable");
                REPORT_UNAVAILABLE.to_string()
            }
        }
    }
}

/// Prompt asking for a root-cause analysis of one log entry.
pub fn failure_prompt(entry: &LogEntry, service: Option<&Service>) -> String {
    let name = service.map_or("Unknown", |s| s.name.as_str());
    let description = service
        .map(|s| s.description.as_str())
        .filter(|d| !d.is_empty())
        .unwrap_or("N/A");
    let status = service.map_or("Unknown", |s| s.status.as_str());
    let fail_count = service.map_or(0, |s| s.fail_count);

    format!(
        "You are a Senior System Administrator and Reliability Engineer (SRE).\n\
         A critical service has failed in our monitoring system (UptimeSHIELD).\n\
         \n\
         Service Details:\n\
         Name: {name}\n\
         Description: {description}\n\
         Current Status: {status}\n\
         Failure Count: {fail_count}\n\
         \n\
         Log Entry:\n\
         [{timestamp}] [{level}] {message}\n\
         \n\
         Please provide a concise analysis:\n\
         1. Likely Root Cause (Technical explanation).\n\
         2. Recommended Troubleshooting Steps (3-4 bullet points).\n\
         3. Severity Assessment (Low/Medium/High/Critical).\n\
         \n\
         Keep the tone professional and technical. Format with Markdown.",
        timestamp = entry.timestamp.to_rfc3339(),
        level = entry.level,
        message = entry.message,
    )
}

/// Prompt asking for an overall stability summary.
pub fn health_report_prompt(services: &[Service], log: &[LogEntry]) -> String {
    let service_summary = services
        .iter()
        .map(|s| format!("{}: {} (Failures: {})", s.name, s.status, s.fail_count))
        .collect::<Vec<_>>()
        .join("\n");
    let recent_errors = log
        .iter()
        .rev()
        .filter(|e| e.level == LogLevel::Error)
        .take(REPORT_RECENT_ERRORS)
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Generate a brief system health report for the UptimeSHIELD.\n\
         \n\
         Services Status:\n\
         {service_summary}\n\
         \n\
         Recent Critical Errors:\n\
         {recent_errors}\n\
         \n\
         Provide a summary paragraph on overall system stability and any \
         specific recommendations for maintenance."
    )
}
