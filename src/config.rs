use serde::{Deserialize, Serialize};

use crate::scoring::ScoreWeights;

/// Tracing filter used when RUST_LOG is unset
pub const DEFAULT_LOG_FILTER: &str = "car_match=info,tower_http=info";

/// Main configuration structure loaded from car_match.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub scoring: ScoringConfig,
    pub llm: LlmConfig,
    pub images: ImageConfig,
    pub store: StoreConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Catalog source and weight table for the scorer
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// TOML file with `[[items]]`; built-in catalog when unset
    pub catalog_path: Option<String>,
    pub weights: ScoreWeights,
}

/// LLM enrichment and chat settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.4,
            max_tokens: 700,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Prefix for the `image` field of picks
    pub base_url: String,
    /// Storage bucket holding cached car images
    pub bucket: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            base_url: "/image".to_string(),
            bucket: "car-images".to_string(),
        }
    }
}

/// Table names used for persistence
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub results_table: String,
    pub guest_results_table: String,
    pub profiles_table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            results_table: "results".to_string(),
            guest_results_table: "guest_results".to_string(),
            profiles_table: "profiles".to_string(),
        }
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub openai_api_key: Option<String>,
    pub supabase_url: Option<String>,
    pub supabase_service_key: Option<String>,
    pub admin_emails: Vec<String>,
    pub http_bind: std::net::SocketAddr,
    pub allowed_origin: Option<String>,
    pub llm_timeout_ms: u64,
    pub store_timeout_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            supabase_url: None,
            supabase_service_key: None,
            admin_emails: Vec::new(),
            http_bind: "127.0.0.1:8788"
                .parse()
                .expect("default bind address should parse"),
            allowed_origin: None,
            llm_timeout_ms: 20_000,
            store_timeout_ms: 10_000,
        }
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables
    /// Uses CAR_MATCH_CONFIG environment variable or defaults to "car_match.toml"
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(env_path) = std::env::var("CAR_MATCH_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::dotenv();
        }

        let config_path =
            std::env::var("CAR_MATCH_CONFIG").unwrap_or_else(|_| "car_match.toml".to_string());

        let mut config: Config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            toml::from_str(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        if let Ok(path) = std::env::var("CAR_MATCH_CATALOG") {
            config.scoring.catalog_path = Some(path);
            tracing::debug!("CAR_MATCH_CATALOG env override applied");
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            config.llm.model = model;
        }
        if let Ok(base) = std::env::var("CAR_MATCH_IMAGE_BASE_URL") {
            config.images.base_url = base;
        }

        config.runtime = RuntimeConfig::load_from_env();
        config.validate();

        Ok(config)
    }

    /// Clamp or warn on out-of-range values
    pub fn validate(&mut self) {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            tracing::warn!(
                "llm.temperature {} outside 0.0..=2.0, clamping",
                self.llm.temperature
            );
            self.llm.temperature = self.llm.temperature.clamp(0.0, 2.0);
        }
        if self.llm.max_tokens == 0 {
            self.llm.max_tokens = LlmConfig::default().max_tokens;
        }
        if self.llm.enabled && self.runtime.openai_api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY not set; recommendations use the offline scorer only");
        }
        if let Some(url) = &self.runtime.supabase_url
            && !url.starts_with("http://")
            && !url.starts_with("https://")
        {
            tracing::warn!("Supabase URL '{}' doesn't start with http:// or https://", url);
        }
        if self.runtime.supabase_url.is_some() != self.runtime.supabase_service_key.is_some() {
            tracing::warn!(
                "SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY must both be set; persistence disabled"
            );
        }
    }

    /// Whether the LLM enrichment path can run at all
    pub fn llm_available(&self) -> bool {
        self.llm.enabled && self.runtime.openai_api_key.is_some()
    }
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        let mut cfg = Self {
            openai_api_key: non_empty_env("OPENAI_API_KEY"),
            supabase_url: non_empty_env("SUPABASE_URL"),
            supabase_service_key: non_empty_env("SUPABASE_SERVICE_ROLE_KEY"),
            admin_emails: std::env::var("CAR_MATCH_ADMIN_EMAILS")
                .map(|v| parse_email_list(&v))
                .unwrap_or_default(),
            allowed_origin: non_empty_env("CAR_MATCH_ALLOWED_ORIGIN"),
            llm_timeout_ms: std::env::var("CAR_MATCH_LLM_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20_000),
            store_timeout_ms: std::env::var("CAR_MATCH_STORE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),
            ..Self::default()
        };

        if let Ok(v) = std::env::var("CAR_MATCH_HTTP_BIND")
            && let Ok(bind) = v.parse::<std::net::SocketAddr>()
        {
            cfg.http_bind = bind;
        }

        cfg
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Comma-separated, case-insensitive admin email list
pub fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}
