//! Gemini text rewriter
//!
//! Sends the request inside a keyword-extraction prompt to the
//! `generateContent` endpoint and returns the model's keyword line.
//! HTTP is only compiled with the `gemini` feature; without it the rewriter
//! reports itself unavailable.

use super::TextRewriter;
use crate::config::GeminiConfig;
use crate::error::{Result, SonaraError};
use serde::{Deserialize, Serialize};

/// Reply the model gives for requests unrelated to audio
pub const INVALID_SENTINEL: &str = "[INVALID]";

const TEMPERATURE: f32 = 0.3;
const MAX_OUTPUT_TOKENS: u32 = 500;

/// Build the keyword-extraction prompt for a request
pub fn build_prompt(user_input: &str) -> String {
    format!(
        "You are an audio engineering assistant. Your task is to convert the user's natural \
language request into standardized audio engineering keywords that describe what they want.

Available keyword categories:
- Brightness: bright, airy, sparkle, clarity, crisp, presence, shine, clear, detailed
- Warmth: warm, smooth, body, full, thick, round, mellow, soft, sweet
- Reverb: reverb, room, space, spacious, hall, ambience, ambient, echo, wet, atmosphere
- Compression: punch, punchy, tight, glue, cohesion, consistent, control, level, even
- Bass: bass, low end, lows, deep, boom, thump, kick, weight, heavy
- Presence: presence, forward, upfront, cut, vocal, mids, midrange, snap

User's request: \"{}\"

Instructions:
1. Extract the audio engineering intent from the user's request
2. Convert it to keywords from the categories above
3. Add intensity modifiers if mentioned (slight, more, very, less)
4. Return ONLY the processed keywords/phrases, nothing else
5. Keep it concise - maximum 50 words
6. If the request doesn't relate to audio, return \"{}\"

Processed keywords:",
        user_input, INVALID_SENTINEL
    )
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

fn request_body(prompt: &str) -> GenerateRequest<'_> {
    GenerateRequest {
        contents: [RequestContent {
            parts: [RequestPart { text: prompt }],
        }],
        generation_config: GenerationConfig {
            temperature: TEMPERATURE,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        },
    }
}

/// Extract `candidates[0].content.parts[0].text` from a response body
pub fn parse_response(body: &str) -> Result<String> {
    let malformed = |details: &str| SonaraError::MalformedResponse {
        details: details.to_string(),
    };

    if body.trim().is_empty() {
        return Err(malformed("Empty response"));
    }

    let response: GenerateResponse = serde_json::from_str(body)?;
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| malformed("No candidates in response"))?;
    let content = candidate
        .content
        .ok_or_else(|| malformed("Invalid content format"))?;
    let part = content
        .parts
        .into_iter()
        .next()
        .ok_or_else(|| malformed("No parts in content"))?;
    let text = part.text.ok_or_else(|| malformed("No text in response"))?;

    let text = text.trim();
    if text.contains(INVALID_SENTINEL) {
        return Err(SonaraError::InvalidRewrite);
    }
    Ok(text.to_string())
}

// ============================================================================
// Client
// ============================================================================

/// Gemini `generateContent` client
#[derive(Debug, Clone)]
pub struct GeminiRewriter {
    config: GeminiConfig,
}

impl GeminiRewriter {
    pub fn new(config: GeminiConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Full `generateContent` URL without the key
    pub fn url(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }

    fn api_key(&self) -> Result<&str> {
        match self.config.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(SonaraError::RewriterUnavailable {
                reason: "API key not set. Please configure your Gemini API key.".to_string(),
            }),
        }
    }

    #[cfg(feature = "gemini")]
    fn send(&self, key: &str, prompt: &str) -> Result<String> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_millis(self.config.timeout_ms))
            .build()
            .map_err(|e| SonaraError::RewriterUnavailable {
                reason: e.to_string(),
            })?;

        let response = client
            .post(self.url())
            .query(&[("key", key)])
            .json(&request_body(prompt))
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    SonaraError::RewriteFailed {
                        reason: format!("Request timed out after {} ms", self.config.timeout_ms),
                    }
                } else {
                    SonaraError::RewriterUnavailable {
                        reason: format!(
                            "Failed to connect to Gemini API. Check your internet connection and API key. ({})",
                            e
                        ),
                    }
                }
            })?;

        let status = response.status();
        let body = response.text().map_err(|e| SonaraError::RewriteFailed {
            reason: e.to_string(),
        })?;
        if !status.is_success() {
            return Err(SonaraError::RewriteFailed {
                reason: format!("Gemini returned HTTP {}", status),
            });
        }
        Ok(body)
    }

    #[cfg(not(feature = "gemini"))]
    fn send(&self, _key: &str, prompt: &str) -> Result<String> {
        let payload = serde_json::to_string(&request_body(prompt))?;
        tracing::debug!(bytes = payload.len(), "gemini request not sent");
        Err(SonaraError::RewriterUnavailable {
            reason: "built without the `gemini` feature".to_string(),
        })
    }
}

impl TextRewriter for GeminiRewriter {
    fn rewrite(&self, text: &str) -> Result<String> {
        let key = self.api_key()?;
        let body = self.send(key, &build_prompt(text))?;
        parse_response(&body)
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
