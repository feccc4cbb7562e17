//! Gemini `generateContent` client (https://generativelanguage.googleapis.com/v1beta by default).
//! Non-streaming only; the answer is read from `candidates[0].content.parts[0].text`.

use crate::config::{GeminiAuth, GeminiConfig};
use crate::llm::{Answer, AnswerSource};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client for the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    auth: GeminiAuth,
    system_instruction: Option<String>,
    max_output_tokens: Option<u32>,
    client: reqwest::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("gemini request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("gemini api error: {0} {1}")]
    Api(reqwest::StatusCode, String),
    #[error("gemini response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

impl GeminiClient {
    /// Build a client from config. The key is taken from `config.api_key` (env overrides already
    /// folded in); a missing or blank key leaves the client unconfigured.
    pub fn new(config: &GeminiConfig) -> Result<Self, GeminiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.trim().to_string(),
            api_key: config
                .api_key
                .as_ref()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            auth: config.auth,
            system_instruction: config
                .system_instruction
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            max_output_tokens: config.max_output_tokens,
            client,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn request_body(&self, prompt: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content::user_text(prompt)],
            system_instruction: self
                .system_instruction
                .as_deref()
                .map(Content::instruction),
            generation_config: self.max_output_tokens.map(|n| GenerationConfig {
                max_output_tokens: Some(n),
            }),
        }
    }

    /// POST /models/{model}:generateContent — one prompt, one answer.
    /// Returns `Answer::Unconfigured` without a network call when no key is set.
    pub async fn generate(&self, prompt: &str) -> Result<Answer, GeminiError> {
        let Some(ref key) = self.api_key else {
            return Ok(Answer::Unconfigured);
        };
        let mut req = self.client.post(self.endpoint()).json(&self.request_body(prompt));
        req = match self.auth {
            GeminiAuth::QueryKey => req.query(&[("key", key.as_str())]),
            GeminiAuth::Bearer => req.bearer_auth(key),
        };
        let res = req.send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(GeminiError::Api(status, body));
        }
        let bytes = res.bytes().await?;
        let data: GenerateContentResponse = serde_json::from_slice(&bytes)?;
        let answer = parse_answer(&data);
        if answer == Answer::NoAnswer {
            log::debug!(
                "gemini returned no text (finish reason: {})",
                no_answer_reason(&data).unwrap_or("none")
            );
        }
        Ok(answer)
    }
}

#[async_trait]
impl AnswerSource for GeminiClient {
    async fn answer(&self, prompt: &str) -> Answer {
        match self.generate(prompt).await {
            Ok(answer) => answer,
            Err(e) => {
                log::warn!("{}", e);
                Answer::NoAnswer
            }
        }
    }
}

/// Extract the generated text from a decoded response. Absent at any level, or blank, is `NoAnswer`.
pub fn parse_answer(res: &GenerateContentResponse) -> Answer {
    res.candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .and_then(|c| c.parts.first())
        .and_then(|p| p.text.as_deref())
        .filter(|t| !t.trim().is_empty())
        .map(|t| Answer::Text(t.to_string()))
        .unwrap_or(Answer::NoAnswer)
}

/// Why a response carried no text: the first candidate's finish reason (e.g. `SAFETY`,
/// `MAX_TOKENS`), else the prompt block reason.
pub fn no_answer_reason(res: &GenerateContentResponse) -> Option<&str> {
    res.candidates
        .first()
        .and_then(|c| c.finish_reason.as_deref())
        .or_else(|| {
            res.prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.as_deref())
        })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

/// A turn: role plus text parts. Used both in requests and in response candidates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    fn user_text(text: &str) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }

    fn instruction(text: &str) -> Self {
        Self {
            role: None,
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Response envelope; every level is optional so odd shapes decode to `NoAnswer` instead of failing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GENERATE_PATH: &str = "/models/gemini-test:generateContent";

    fn config_for(server: &MockServer) -> GeminiConfig {
        GeminiConfig {
            api_key: Some("test-key".to_string()),
            base_url: server.uri(),
            model: "gemini-test".to_string(),
            timeout_ms: 2000,
            ..GeminiConfig::default()
        }
    }

    fn answer_body(text: &str) -> serde_json::Value {
        json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }]
        })
    }

    fn decode(v: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn parse_answer_reads_first_part() {
        let res = decode(answer_body("The library opens at 8 AM."));
        assert_eq!(parse_answer(&res), Answer::Text("The library opens at 8 AM.".to_string()));
    }

    #[test]
    fn parse_answer_tolerates_missing_levels() {
        for body in [
            json!({}),
            json!({ "candidates": [] }),
            json!({ "candidates": [{}] }),
            json!({ "candidates": [{ "content": {} }] }),
            json!({ "candidates": [{ "content": { "parts": [] } }] }),
            json!({ "candidates": [{ "content": { "parts": [{}] } }] }),
            json!({ "candidates": [{ "content": { "parts": [{ "text": "  " }] } }] }),
            json!({ "promptFeedback": { "blockReason": "SAFETY" } }),
        ] {
            assert_eq!(parse_answer(&decode(body)), Answer::NoAnswer);
        }
    }

    #[test]
    fn no_answer_reason_prefers_finish_reason() {
        let res = decode(json!({ "candidates": [{ "finishReason": "SAFETY" }] }));
        assert_eq!(parse_answer(&res), Answer::NoAnswer);
        assert_eq!(no_answer_reason(&res), Some("SAFETY"));

        let res = decode(json!({ "promptFeedback": { "blockReason": "OTHER" } }));
        assert_eq!(no_answer_reason(&res), Some("OTHER"));

        assert_eq!(no_answer_reason(&decode(json!({}))), None);
    }

    #[tokio::test]
    async fn generate_sends_prompt_with_query_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(query_param("key", "test-key"))
            .and(body_json(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "what time does the library open" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer_body("The library opens at 8 AM.")))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiClient::new(&config_for(&server)).unwrap();
        let answer = client.generate("what time does the library open").await.unwrap();
        assert_eq!(answer, Answer::Text("The library opens at 8 AM.".to_string()));
    }

    #[tokio::test]
    async fn generate_bearer_auth_and_options() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(header("authorization", "Bearer test-key"))
            .and(body_json(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hi" }] }],
                "systemInstruction": { "parts": [{ "text": "You are a college assistant." }] },
                "generationConfig": { "maxOutputTokens": 128 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer_body("hello")))
            .expect(1)
            .mount(&server)
            .await;

        let config = GeminiConfig {
            auth: GeminiAuth::Bearer,
            system_instruction: Some("You are a college assistant.".to_string()),
            max_output_tokens: Some(128),
            ..config_for(&server)
        };
        let client = GeminiClient::new(&config).unwrap();
        assert_eq!(client.generate("hi").await.unwrap(), Answer::Text("hello".to_string()));
    }

    #[tokio::test]
    async fn missing_or_blank_key_makes_no_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(answer_body("unused")))
            .expect(0)
            .mount(&server)
            .await;

        for api_key in [None, Some("   ".to_string())] {
            let config = GeminiConfig {
                api_key,
                ..config_for(&server)
            };
            let client = GeminiClient::new(&config).unwrap();
            assert!(!client.is_configured());
            assert_eq!(client.generate("hi").await.unwrap(), Answer::Unconfigured);
            assert_eq!(client.answer("hi").await, Answer::Unconfigured);
        }
    }

    #[tokio::test]
    async fn non_success_status_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&config_for(&server)).unwrap();
        match client.generate("hi").await {
            Err(GeminiError::Api(status, body)) => {
                assert_eq!(status.as_u16(), 429);
                assert_eq!(body, "quota exceeded");
            }
            other => panic!("expected api error, got {:?}", other),
        }
        assert_eq!(client.answer("hi").await, Answer::NoAnswer);
    }

    #[tokio::test]
    async fn malformed_json_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&config_for(&server)).unwrap();
        assert!(matches!(client.generate("hi").await, Err(GeminiError::Decode(_))));
        assert_eq!(client.answer("hi").await, Answer::NoAnswer);
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(answer_body("too late"))
                    .set_delay(Duration::from_millis(1500)),
            )
            .mount(&server)
            .await;

        let config = GeminiConfig {
            timeout_ms: 200,
            ..config_for(&server)
        };
        let client = GeminiClient::new(&config).unwrap();
        assert!(matches!(client.generate("hi").await, Err(GeminiError::Request(_))));
        assert_eq!(client.answer("hi").await, Answer::NoAnswer);
    }

    #[tokio::test]
    async fn unreachable_server_is_no_answer() {
        let config = GeminiConfig {
            api_key: Some("k".to_string()),
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_ms: 500,
            ..GeminiConfig::default()
        };
        let client = GeminiClient::new(&config).unwrap();
        assert_eq!(client.answer("hi").await, Answer::NoAnswer);
    }
}
