//! Runtime configuration for final-cut-backend.
//!
//! Everything is read once at startup (dotenv file, then process environment)
//! into an immutable [`Config`] that the handlers share through `AppState`.

use std::path::PathBuf;

use clap::Parser;

/// Accepted API key variables, first non-empty wins.
pub const API_KEY_VARS: [&str; 2] = ["LLM_API_KEY", "OPENROUTER_API_KEY"];

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "final-cut-backend", about = "Chat and scoring relay for the Final Cut game")]
pub struct Cli {
    /// Dotenv file loaded before reading the environment (missing file is ignored).
    #[arg(long, default_value = ".env.local")]
    pub env_file: PathBuf,

    /// HTTP listen address.
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8000")]
    pub listen: String,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Upstream provider settings.
    pub upstream: UpstreamConfig,

    /// Chat relay parameters.
    pub chat: ChatConfig,

    /// Score relay parameters.
    pub scoring: ScoringConfig,

    /// Origins allowed by the CORS layer.
    pub allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upstream: UpstreamConfig::default(),
            chat: ChatConfig::default(),
            scoring: ScoringConfig::default(),
            allowed_origins: default_origins(),
        }
    }
}

/// OpenAI-compatible provider settings.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL, without the `/chat/completions` suffix.
    pub base_url: String,

    /// Bearer token. `None` sends no `Authorization` header.
    pub api_key: Option<String>,

    /// Sent as `HTTP-Referer`.
    pub referer: String,

    /// Sent as `X-Title`.
    pub title: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_key: None,
            referer: "https://localhost:3000".to_string(),
            title: "Final Cut Game".to_string(),
        }
    }
}

/// Character chat completion parameters.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: "anthropic/claude-3.5-sonnet".to_string(),
            max_tokens: 300,
            temperature: 0.8,
        }
    }
}

/// Reasoning evaluation parameters.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,

    /// Reasoning shorter than this (in characters) gets the fixed low score.
    pub min_reasoning_chars: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            model: "openai/gpt-4o-mini".to_string(),
            max_tokens: 100,
            temperature: 0.1,
            min_reasoning_chars: 20,
        }
    }
}

fn default_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:3001".to_string(),
    ]
}

impl Config {
    /// Load the dotenv file (if present) and read the process environment.
    pub fn load(env_file: &std::path::Path) -> Self {
        match dotenvy::from_path(env_file) {
            Ok(()) => tracing::debug!("Loaded environment from {:?}", env_file),
            Err(e) if e.not_found() => {
                tracing::debug!("No env file at {:?}, using process environment", env_file)
            }
            Err(e) => tracing::warn!("Failed to read env file {:?}: {e}", env_file),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut config = Config::default();

        config.upstream.api_key = API_KEY_VARS.iter().find_map(|key| get(*key));
        if let Some(url) = get("OPENROUTER_BASE_URL") {
            config.upstream.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(referer) = get("OPENROUTER_REFERER") {
            config.upstream.referer = referer;
        }
        if let Some(title) = get("OPENROUTER_TITLE") {
            config.upstream.title = title;
        }
        if let Some(model) = get("OPENROUTER_MODEL") {
            config.chat.model = model;
        }
        if let Some(model) = get("OPENROUTER_SCORING_MODEL") {
            config.scoring.model = model;
        }
        if let Some(origins) = get("CORS_ALLOWED_ORIGINS") {
            config.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }

        config
    }
}
