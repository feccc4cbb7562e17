//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.collegebot/config.json`) and environment.
//! Resolved once at startup and handed to the server and Gemini client; request handling
//! never reads the environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Inbound webhook verification.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Which intents go to the generative backend.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Gemini endpoint, model and credential transport.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// How generated answers are cleaned and shaped into reply segments.
    #[serde(default)]
    pub reply: ReplyConfig,
}

/// Listener bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Bind address (default "0.0.0.0").
    #[serde(default = "default_server_bind")]
    pub bind: String,

    /// Port (default 3000). Overridden by PORT env.
    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_server_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_server_bind(),
            port: default_server_port(),
        }
    }
}

/// Webhook verification: when a secret is set, callers must send it in `X-Webhook-Secret`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    /// Shared secret. Overridden by COLLEGEBOT_WEBHOOK_SECRET env.
    pub secret: Option<String>,
}

/// Which unmatched intents are answered by the generative backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GenerativeFallback {
    /// Every intent outside the canned set is forwarded.
    #[default]
    AnyUnmatched,
    /// Only the configured fallback intent is forwarded; other unknown intents get the "not sure" reply.
    FallbackOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingConfig {
    /// Display name of the platform's fallback intent (default "Default Fallback Intent").
    #[serde(default = "default_fallback_intent")]
    pub fallback_intent: String,

    #[serde(default)]
    pub generative_fallback: GenerativeFallback,
}

fn default_fallback_intent() -> String {
    "Default Fallback Intent".to_string()
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            fallback_intent: default_fallback_intent(),
            generative_fallback: GenerativeFallback::default(),
        }
    }
}

/// How the API key travels with the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GeminiAuth {
    /// `?key=<apiKey>` query parameter.
    #[default]
    QueryKey,
    /// `Authorization: Bearer <apiKey>` header.
    Bearer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiConfig {
    /// API key. Overridden by GEMINI_API_KEY env.
    pub api_key: Option<String>,

    /// API root, without the `/models/...` suffix.
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    #[serde(default = "default_gemini_model")]
    pub model: String,

    #[serde(default)]
    pub auth: GeminiAuth,

    /// Whole-request timeout in milliseconds (default 8000). Expiry counts as a failed call.
    #[serde(default = "default_gemini_timeout_ms")]
    pub timeout_ms: u64,

    /// Optional system instruction sent with every prompt.
    #[serde(default)]
    pub system_instruction: Option<String>,

    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash-latest".to_string()
}

fn default_gemini_timeout_ms() -> u64 {
    8000
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
            auth: GeminiAuth::default(),
            timeout_ms: default_gemini_timeout_ms(),
            system_instruction: None,
            max_output_tokens: None,
        }
    }
}

/// What to do with answers longer than `maxChars`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Overflow {
    /// Cut to one segment and append the truncation marker.
    #[default]
    Truncate,
    /// Emit several text segments of at most `maxChars` each.
    Split,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyConfig {
    /// Per-segment character limit (default 1500).
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    #[serde(default)]
    pub overflow: Overflow,

    /// Upper bound on segments under the split policy (default 4).
    #[serde(default = "default_max_segments")]
    pub max_segments: usize,

    #[serde(default = "default_truncation_marker")]
    pub truncation_marker: String,

    /// Remove bold/italic markers from generated text (default true).
    #[serde(default = "default_true")]
    pub strip_markdown: bool,

    /// Append the topic chips after a generated answer (default true).
    #[serde(default = "default_true")]
    pub menu_with_answer: bool,

    /// Append the topic chips after the apology (default true).
    #[serde(default = "default_true")]
    pub menu_on_failure: bool,
}

fn default_max_chars() -> usize {
    1500
}

fn default_max_segments() -> usize {
    4
}

fn default_truncation_marker() -> String {
    "…".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            overflow: Overflow::default(),
            max_segments: default_max_segments(),
            truncation_marker: default_truncation_marker(),
            strip_markdown: true,
            menu_with_answer: true,
            menu_on_failure: true,
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Raw values of the environment variables that override the config file.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    /// PORT
    pub port: Option<String>,
    /// GEMINI_API_KEY
    pub gemini_api_key: Option<String>,
    /// COLLEGEBOT_WEBHOOK_SECRET
    pub webhook_secret: Option<String>,
}

impl EnvOverrides {
    /// Read the override variables from the process environment.
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT").ok(),
            gemini_api_key: std::env::var("GEMINI_API_KEY").ok(),
            webhook_secret: std::env::var("COLLEGEBOT_WEBHOOK_SECRET").ok(),
        }
    }
}

/// Resolve the Gemini API key: env overrides config; blank values on either side are ignored.
pub fn resolve_gemini_api_key(config: &Config, env: &EnvOverrides) -> Option<String> {
    non_empty(env.gemini_api_key.as_ref()).or_else(|| non_empty(config.gemini.api_key.as_ref()))
}

/// Resolve the webhook secret: env overrides config; blank values on either side are ignored.
pub fn resolve_webhook_secret(config: &Config, env: &EnvOverrides) -> Option<String> {
    non_empty(env.webhook_secret.as_ref()).or_else(|| non_empty(config.webhook.secret.as_ref()))
}

/// Resolve the listen port: env overrides config. A blank or unparsable value is ignored with a warning.
pub fn resolve_port(config: &Config, env: &EnvOverrides) -> u16 {
    match non_empty(env.port.as_ref()) {
        Some(p) => match p.parse::<u16>() {
            Ok(port) => port,
            Err(_) => {
                log::warn!("ignoring invalid PORT value {:?}", p);
                config.server.port
            }
        },
        None => config.server.port,
    }
}

/// Fold the given overrides into the config.
pub fn apply_overrides(mut config: Config, env: &EnvOverrides) -> Config {
    config.server.port = resolve_port(&config, env);
    config.gemini.api_key = resolve_gemini_api_key(&config, env);
    config.webhook.secret = resolve_webhook_secret(&config, env);
    config
}

/// Fold the process environment into the config. Called once at process start.
pub fn apply_env_overrides(config: Config) -> Config {
    apply_overrides(config, &EnvOverrides::from_env())
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("COLLEGEBOT_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".collegebot").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the given path (or the default). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}
