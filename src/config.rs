use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::extraction::DEFAULT_OCR_DPI;
use crate::pipeline_config::PipelineConfig;

/// Application-level constants
pub const APP_NAME: &str = "PPCI Review";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";
pub const DEFAULT_LLM_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_OCR_LANG: &str = "por";

const ENV_API_KEY: &str = "GEMINI_API_KEY";
const ENV_MODEL: &str = "PPCI_MODEL";
const ENV_BASE_URL: &str = "PPCI_LLM_BASE_URL";
const ENV_TIMEOUT: &str = "PPCI_LLM_TIMEOUT_SECS";
const ENV_DATA_DIR: &str = "PPCI_DATA_DIR";
const ENV_OCR_ENABLED: &str = "PPCI_OCR_ENABLED";
const ENV_TWO_STAGE: &str = "PPCI_TWO_STAGE";
const ENV_LOOKUP_NULL_MATCHES: &str = "PPCI_LOOKUP_NULL_MATCHES";
const ENV_OCR_BACKEND: &str = "PPCI_OCR_BACKEND";
const ENV_OCR_LANG: &str = "PPCI_OCR_LANG";
const ENV_OCR_DPI: &str = "PPCI_OCR_DPI";
const ENV_TESSDATA_DIR: &str = "PPCI_TESSDATA_DIR";

// ═══════════════════════════════════════════════════════════
// Error types
// ═══════════════════════════════════════════════════════════

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is not set; the model endpoint cannot be used")]
    MissingApiKey,

    #[error("Invalid value for {var}: '{value}'")]
    InvalidValue { var: &'static str, value: String },

    #[error("Cannot determine home directory; set PPCI_DATA_DIR")]
    NoHomeDirectory,

    #[error("OCR backend '{0}' is not available in this build")]
    OcrBackendUnavailable(String),

    #[error("OCR could not be initialized: {0}")]
    OcrInit(String),

    #[error("Model client could not be created: {0}")]
    ModelClient(String),

    #[error("Extractor runs {built} but PPCI_OCR_ENABLED selects {configured}")]
    ExtractionPolicyMismatch { configured: String, built: String },
}

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "ppci_review=debug,info"
    } else {
        "ppci_review=info,warn"
    }
}

/// ~/PpciReview/ on all platforms.
pub fn default_data_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join("PpciReview"))
        .ok_or(ConfigError::NoHomeDirectory)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrBackend {
    /// Page images sent to the Gemini endpoint.
    Vision,
    /// Local Tesseract (requires the `ocr` cargo feature).
    Tesseract,
}

impl OcrBackend {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_lowercase().as_str() {
            "vision" | "gemini" => Ok(Self::Vision),
            "tesseract" => {
                if cfg!(feature = "ocr") {
                    Ok(Self::Tesseract)
                } else {
                    Err(ConfigError::OcrBackendUnavailable(value.trim().to_string()))
                }
            }
            _ => Err(ConfigError::InvalidValue {
                var: ENV_OCR_BACKEND,
                value: value.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrSettings {
    pub backend: OcrBackend,
    pub lang: String,
    pub dpi: u32,
    pub tessdata_dir: Option<PathBuf>,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            backend: OcrBackend::Vision,
            lang: DEFAULT_OCR_LANG.to_string(),
            dpi: DEFAULT_OCR_DPI,
            tessdata_dir: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// AppConfig
// ═══════════════════════════════════════════════════════════

/// Everything the service needs at startup. Built once; a failure here is
/// the only fatal error of the program.
#[derive(Clone)]
pub struct AppConfig {
    api_key: String,
    pub model: String,
    pub llm_base_url: String,
    pub llm_timeout_secs: u64,
    pub data_dir: PathBuf,
    pub pipeline: PipelineConfig,
    pub ocr: OcrSettings,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("llm_base_url", &self.llm_base_url)
            .field("llm_timeout_secs", &self.llm_timeout_secs)
            .field("data_dir", &self.data_dir)
            .field("pipeline", &self.pipeline)
            .field("ocr", &self.ocr)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_key = get(ENV_API_KEY).ok_or(ConfigError::MissingApiKey)?;

        let data_dir = match get(ENV_DATA_DIR) {
            Some(dir) => PathBuf::from(dir),
            None => default_data_dir()?,
        };

        let defaults = PipelineConfig::default();
        let pipeline = PipelineConfig {
            ocr_enabled: parse_flag(ENV_OCR_ENABLED, get(ENV_OCR_ENABLED), defaults.ocr_enabled)?,
            two_stage_classification: parse_flag(
                ENV_TWO_STAGE,
                get(ENV_TWO_STAGE),
                defaults.two_stage_classification,
            )?,
            lookup_null_matches: parse_flag(
                ENV_LOOKUP_NULL_MATCHES,
                get(ENV_LOOKUP_NULL_MATCHES),
                defaults.lookup_null_matches,
            )?,
        };

        let ocr = OcrSettings {
            backend: match get(ENV_OCR_BACKEND) {
                Some(value) => OcrBackend::parse(&value)?,
                None => OcrBackend::Vision,
            },
            lang: get(ENV_OCR_LANG).unwrap_or_else(|| DEFAULT_OCR_LANG.to_string()),
            dpi: parse_number(ENV_OCR_DPI, get(ENV_OCR_DPI), DEFAULT_OCR_DPI)?,
            tessdata_dir: get(ENV_TESSDATA_DIR).map(PathBuf::from),
        };

        Ok(Self {
            api_key,
            model: get(ENV_MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            llm_base_url: get(ENV_BASE_URL).unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            llm_timeout_secs: parse_number(
                ENV_TIMEOUT,
                get(ENV_TIMEOUT),
                DEFAULT_LLM_TIMEOUT_SECS,
            )?,
            data_dir,
            pipeline,
            ocr,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// `<data_dir>/memoria/historico.csv`
    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join("memoria").join("historico.csv")
    }
}

// ═══════════════════════════════════════════════════════════
// Value parsing
// ═══════════════════════════════════════════════════════════

fn parse_flag(
    var: &'static str,
    value: Option<String>,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { var, value }),
    }
}

fn parse_number<T>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(value) = value else {
        return Ok(default);
    };
    match value.parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(ConfigError::InvalidValue { var, value }),
    }
}
