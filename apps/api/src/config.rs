use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::llm_client::LlmSettings;
use crate::tailoring::policy::{
    FitPolicy, DEFAULT_HIGH_THRESHOLD, DEFAULT_LOW_THRESHOLD, DEFAULT_MAX_ATTEMPTS,
};

const DEFAULT_LLM_API_URL: &str = "https://api.perplexity.ai/chat/completions";

/// Application configuration loaded from environment variables.
/// Only malformed values fail startup; a missing API key is reported on the
/// first tailoring request instead.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub database_url: String,
    pub compiled_dir: String,
    pub llm_api_url: String,
    pub llm_api_key: Option<String>,
    pub llm_model: String,
    pub llm_timeout: Duration,
    pub pdflatex_bin: String,
    pub compile_timeout: Duration,
    pub fit_policy: FitPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let fit_policy = FitPolicy::new(
            parse_env("FIT_LOW_THRESHOLD", DEFAULT_LOW_THRESHOLD)?,
            parse_env("FIT_HIGH_THRESHOLD", DEFAULT_HIGH_THRESHOLD)?,
            parse_env("FIT_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
        )
        .map_err(|e| anyhow!("Invalid fit policy: {e}"))?;

        Ok(Config {
            port: parse_env("PORT", 5000)?,
            rust_log: env_or("RUST_LOG", "info"),
            database_url: env_or("DATABASE_URL", "sqlite://tailor.db"),
            compiled_dir: env_or("COMPILED_DIR", "compiled"),
            llm_api_url: env_or("LLM_API_URL", DEFAULT_LLM_API_URL),
            llm_api_key: optional_env("PERPLEXITY_API_KEY"),
            llm_model: env_or("LLM_MODEL", "sonar"),
            llm_timeout: Duration::from_secs(parse_env("LLM_TIMEOUT_SECS", 120)?),
            pdflatex_bin: env_or("PDFLATEX_BIN", "pdflatex"),
            compile_timeout: Duration::from_secs(parse_env("COMPILE_TIMEOUT_SECS", 120)?),
            fit_policy,
        })
    }

    pub fn llm_settings(&self) -> LlmSettings {
        LlmSettings {
            api_url: self.llm_api_url.clone(),
            api_key: self.llm_api_key.clone(),
            model: self.llm_model.clone(),
            timeout: self.llm_timeout,
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
