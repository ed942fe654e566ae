//! Google Gemini provider (`models/{model}:generateContent`).
//!
//! All Gemini wire types are private to this module. Requests ask for a JSON
//! response body; callers still run the reply through `ai::json::extract_json`
//! because models occasionally wrap it in prose or code fences.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::llm::ProviderError;

#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: f32,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(
        api_base_url: String,
        model: String,
        temperature: f32,
        timeout_seconds: u64,
        api_key: String,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            model,
            temperature,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base_url, self.model)
    }

    pub fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let payload = GenerateRequest {
            contents: vec![Content {
                role: "user".into(),
                parts: vec![Part { text: prompt.to_string() }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                response_mime_type: "application/json".into(),
            },
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "sending Gemini request");
        if tracing::enabled!(tracing::Level::TRACE) {
            trace!(prompt = %prompt, "full Gemini prompt");
        }

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .map_err(|e| {
                error!(model = %self.model, error = %e, "Gemini HTTP request failed (transport)");
                ProviderError::Request(e.to_string())
            })?;

        let response = check_status(response)?;

        let parsed = response.json::<GenerateResponse>().map_err(|e| {
            error!(error = %e, "failed to deserialize Gemini response");
            ProviderError::Request(format!("failed to parse response body: {e}"))
        })?;

        if let Some(usage) = &parsed.usage_metadata {
            debug!(
                input_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                "received Gemini response"
            );
        }

        extract_text(parsed)
    }
}

/// First candidate's concatenated text parts.
fn extract_text(parsed: GenerateResponse) -> Result<String, ProviderError> {
    let candidate = parsed
        .candidates
        .into_iter()
        .next()
        .ok_or(ProviderError::EmptyResponse)?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        if let Some(reason) = candidate.finish_reason {
            debug!(%reason, "Gemini candidate had no text");
        }
        return Err(ProviderError::EmptyResponse);
    }
    Ok(text.to_string())
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => {
            let code = env.error.status.map(|s| format!(" [{s}]")).unwrap_or_default();
            format!("HTTP {status}{code}: {}", env.error.message)
        }
        Err(_) => format!("HTTP {status}: {body}"),
    }
}

fn check_status(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .unwrap_or_else(|_| "<failed to read error body>".to_string());
    let message = error_message(status, &body);

    error!(%status, %message, "Gemini request returned HTTP error");
    Err(ProviderError::Request(message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GenerateResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn extracts_first_candidate_text() {
        let resp = parse(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"[{\"front\":"},{"text":"\"a\"}]"}]},"finishReason":"STOP"}],
                "usageMetadata":{"promptTokenCount":12,"candidatesTokenCount":5}}"#,
        );
        assert_eq!(extract_text(resp).unwrap(), r#"[{"front":"a"}]"#);
    }

    #[test]
    fn no_candidates_is_empty_response() {
        let resp = parse(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);
        assert_eq!(extract_text(resp).unwrap_err(), ProviderError::EmptyResponse);
    }

    #[test]
    fn blank_text_is_empty_response() {
        let resp = parse(r#"{"candidates":[{"content":{"parts":[{"text":"  "}]},"finishReason":"MAX_TOKENS"}]}"#);
        assert_eq!(extract_text(resp).unwrap_err(), ProviderError::EmptyResponse);
    }

    #[test]
    fn decodes_error_envelope() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        let msg = error_message(reqwest::StatusCode::BAD_REQUEST, body);
        assert!(msg.contains("INVALID_ARGUMENT"));
        assert!(msg.contains("API key not valid"));

        let raw = error_message(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert!(raw.ends_with("upstream down"));
    }

    #[test]
    fn request_serializes_camel_case() {
        let req = GenerateRequest {
            contents: vec![Content { role: "user".into(), parts: vec![Part { text: "hi".into() }] }],
            generation_config: GenerationConfig {
                temperature: 0.5,
                response_mime_type: "application/json".into(),
            },
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(v["contents"][0]["parts"][0]["text"], "hi");
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let p = GeminiProvider::new("https://x.test/v1beta/".into(), "m".into(), 0.1, 5, "k".into()).unwrap();
        assert_eq!(p.endpoint(), "https://x.test/v1beta/models/m:generateContent");
    }
}
