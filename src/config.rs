use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Lung Lens";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default bind address (the port the web client has always talked to).
pub const DEFAULT_BIND: &str = "0.0.0.0:5001";
pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:5001";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.studio.nebius.com/v1";
pub const DEFAULT_LLM_MODEL: &str = "meta-llama/Llama-3.3-70B-Instruct";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "info,lung_lens_lib=debug"
    } else {
        "info"
    }
}

/// Get the application data directory
/// ~/LungLens/ unless overridden by `LUNG_LENS_DATA_DIR`.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("LungLens")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Sampling parameters for the report model.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_LLM_MODEL.to_string(),
            max_tokens: 2048,
            temperature: 0.6,
            top_p: 0.9,
            top_k: 50,
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierConfig {
    pub base_url: Option<String>,
    pub max_retries: u32,
    /// Base delay; attempt `n` waits `retry_delay * (n + 1)`.
    pub retry_delay: Duration,
    pub timeout: Duration,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            max_retries: 2,
            retry_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub public_url: String,
    pub data_dir: PathBuf,
    /// HMAC secret for object URLs. `None` means generate one per process.
    pub url_secret: Option<String>,
    pub static_dir: Option<PathBuf>,
    pub users_seed: Option<PathBuf>,
    pub report_fallback: bool,
    pub llm: LlmConfig,
    pub classifier: ClassifierConfig,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_raw = var("LUNG_LENS_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw.parse().map_err(|e| ConfigError::Invalid {
            var: "LUNG_LENS_BIND",
            reason: format!("'{bind_raw}': {e}"),
        })?;

        let public_url = var("LUNG_LENS_PUBLIC_URL")
            .unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if !public_url.starts_with("http://") && !public_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                var: "LUNG_LENS_PUBLIC_URL",
                reason: format!("'{public_url}' is not an http(s) URL"),
            });
        }

        let report_fallback = match var("LUNG_LENS_REPORT_FALLBACK").as_deref() {
            None => false,
            Some(v) => parse_bool(v).ok_or_else(|| ConfigError::Invalid {
                var: "LUNG_LENS_REPORT_FALLBACK",
                reason: format!("'{v}' is not a boolean"),
            })?,
        };

        let mut llm = LlmConfig {
            api_key: var("NEBIUS_API_KEY"),
            ..LlmConfig::default()
        };
        if let Some(base) = var("LLM_BASE_URL") {
            llm.base_url = base.trim_end_matches('/').to_string();
        }
        if let Some(model) = var("LLM_MODEL") {
            llm.model = model;
        }

        let classifier = ClassifierConfig {
            base_url: var("HF_SPACE_URL").map(|u| u.trim_end_matches('/').to_string()),
            ..ClassifierConfig::default()
        };

        Ok(Self {
            bind,
            public_url,
            data_dir: var("LUNG_LENS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(app_data_dir),
            url_secret: var("LUNG_LENS_URL_SECRET"),
            static_dir: var("LUNG_LENS_STATIC_DIR").map(PathBuf::from),
            users_seed: var("LUNG_LENS_USERS_SEED").map(PathBuf::from),
            report_fallback,
            llm,
            classifier,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("lung_lens.db")
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.data_dir.join("objects")
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
