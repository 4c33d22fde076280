use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, ThaliError};

/// Environment variable that points at a config file.
pub const CONFIG_ENV_VAR: &str = "THALI_CONFIG";

/// Config file looked up in the working directory when nothing else is given.
pub const DEFAULT_CONFIG_FILE: &str = "thali.toml";

/// Top-level configuration for the thali ordering assistant.
///
/// Each section corresponds to one stage of the per-turn pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThaliConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
}

impl ThaliConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ThaliConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ThaliError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Pick the config file: CLI flag, then `THALI_CONFIG`, then `thali.toml`.
    pub fn resolve_path(cli_path: Option<&Path>) -> PathBuf {
        resolve_path_with(cli_path, std::env::var(CONFIG_ENV_VAR).ok())
    }
}

fn resolve_path_with(cli_path: Option<&Path>, env_value: Option<String>) -> PathBuf {
    if let Some(path) = cli_path {
        return path.to_path_buf();
    }
    match env_value {
        Some(value) if !value.trim().is_empty() => PathBuf::from(value),
        _ => PathBuf::from(DEFAULT_CONFIG_FILE),
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Chunking and embedding settings for the retrieval index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub chunk_overlap: usize,
    /// Chunks retrieved per browse turn.
    pub top_k: usize,
    /// Embedding model name.
    pub embedding_model: String,
    /// Directory holding `model.onnx` and `tokenizer.json`. When unset the
    /// hashing embedder is used.
    pub model_dir: Option<PathBuf>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 4,
            embedding_model: "all-MiniLM-L6-v2".to_string(),
            model_dir: None,
        }
    }
}

/// Which completion backend answers browse turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[default]
    Gemini,
    OpenaiCompat,
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmProvider::Gemini => f.write_str("gemini"),
            LlmProvider::OpenaiCompat => f.write_str("openai_compat"),
        }
    }
}

/// LLM completion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    /// Overrides the provider's default endpoint.
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Upper bound on a single completion call.
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Gemini,
            model: "gemini-2.5-flash".to_string(),
            base_url: None,
            api_key_env: "THALI_LLM_API_KEY".to_string(),
            timeout_secs: 30,
            temperature: 0.3,
            max_tokens: 512,
        }
    }
}

/// Conversational agent behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// When false every turn is answered as a browse turn and the cart is
    /// never touched.
    pub agentic_mode: bool,
    /// Menu items listed in the LLM prompt.
    pub prompt_menu_items: usize,
    /// Cap on the recommendation list shown after a browse turn.
    pub max_recommendations: usize,
    /// Fewer parsed items than this marks the extraction as low confidence.
    pub low_confidence_threshold: usize,
    /// Maximum accepted utterance length in characters.
    pub max_message_length: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agentic_mode: true,
            prompt_menu_items: 30,
            max_recommendations: 6,
            low_confidence_threshold: 3,
            max_message_length: 2000,
        }
    }
}

/// Cart pricing rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Currency marker used in messages, e.g. `Rs 450`.
    pub currency: String,
    /// Tax rate applied to the subtotal (0.05 = 5%).
    pub tax_rate: f64,
    pub delivery_fee: f64,
    /// Subtotal at or above which delivery is free.
    pub free_delivery_threshold: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            currency: "Rs".to_string(),
            tax_rate: 0.05,
            delivery_fee: 50.0,
            free_delivery_threshold: 1500.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = ThaliConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.retrieval.chunk_size, 500);
        assert_eq!(config.retrieval.chunk_overlap, 50);
        assert_eq!(config.retrieval.top_k, 4);
        assert!(config.retrieval.model_dir.is_none());
        assert_eq!(config.llm.provider, LlmProvider::Gemini);
        assert_eq!(config.llm.model, "gemini-2.5-flash");
        assert_eq!(config.llm.timeout_secs, 30);
        assert!(config.agent.agentic_mode);
        assert_eq!(config.agent.prompt_menu_items, 30);
        assert_eq!(config.agent.max_recommendations, 6);
        assert_eq!(config.pricing.currency, "Rs");
        assert_eq!(config.pricing.free_delivery_threshold, 1500.0);
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
log_level = "debug"

[retrieval]
chunk_size = 300
chunk_overlap = 30
top_k = 2
model_dir = "/models/minilm"

[llm]
provider = "openai_compat"
model = "llama-3.1-8b-instant"
base_url = "https://api.groq.com/openai/v1"
timeout_secs = 10

[agent]
agentic_mode = false
"#;
        let file = create_temp_config(content);
        let config = ThaliConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.retrieval.chunk_size, 300);
        assert_eq!(config.retrieval.top_k, 2);
        assert_eq!(
            config.retrieval.model_dir,
            Some(PathBuf::from("/models/minilm"))
        );
        assert_eq!(config.llm.provider, LlmProvider::OpenaiCompat);
        assert_eq!(
            config.llm.base_url.as_deref(),
            Some("https://api.groq.com/openai/v1")
        );
        assert_eq!(config.llm.timeout_secs, 10);
        // Unspecified fields keep their defaults.
        assert_eq!(config.llm.max_tokens, 512);
        assert!(!config.agent.agentic_mode);
        assert_eq!(config.agent.max_recommendations, 6);
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let file = create_temp_config("[pricing]\ntax_rate = 0.16\n");
        let config = ThaliConfig::load(file.path()).unwrap();
        assert_eq!(config.pricing.tax_rate, 0.16);
        assert_eq!(config.pricing.delivery_fee, 50.0);
        assert_eq!(config.retrieval.chunk_size, 500);
    }

    #[test]
    fn test_config_empty_toml_uses_all_defaults() {
        let file = create_temp_config("");
        let config = ThaliConfig::load(file.path()).unwrap();
        assert_eq!(config.agent.max_message_length, 2000);
        assert_eq!(config.llm.api_key_env, "THALI_LLM_API_KEY");
    }

    #[test]
    fn test_load_invalid_toml() {
        let file = create_temp_config("[general\nlog_level = ");
        let result = ThaliConfig::load(file.path());
        assert!(matches!(result, Err(ThaliError::Config(_))));
    }

    #[test]
    fn test_load_unknown_provider_fails() {
        let file = create_temp_config("[llm]\nprovider = \"carrier-pigeon\"\n");
        assert!(ThaliConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = ThaliConfig::load_or_default(Path::new("/nonexistent/thali.toml"));
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("thali.toml");

        let mut config = ThaliConfig::default();
        config.agent.agentic_mode = false;
        config.pricing.currency = "PKR".to_string();
        config.retrieval.model_dir = Some(PathBuf::from("/opt/models"));
        config.save(&path).unwrap();

        let reloaded = ThaliConfig::load(&path).unwrap();
        assert!(!reloaded.agent.agentic_mode);
        assert_eq!(reloaded.pricing.currency, "PKR");
        assert_eq!(
            reloaded.retrieval.model_dir,
            Some(PathBuf::from("/opt/models"))
        );
    }

    #[test]
    fn test_llm_provider_display() {
        assert_eq!(LlmProvider::Gemini.to_string(), "gemini");
        assert_eq!(LlmProvider::OpenaiCompat.to_string(), "openai_compat");
    }

    // ---- Path resolution ----

    #[test]
    fn test_resolve_path_prefers_cli() {
        let path = resolve_path_with(
            Some(Path::new("/etc/cli.toml")),
            Some("/etc/env.toml".to_string()),
        );
        assert_eq!(path, PathBuf::from("/etc/cli.toml"));
    }

    #[test]
    fn test_resolve_path_uses_env() {
        let path = resolve_path_with(None, Some("/etc/env.toml".to_string()));
        assert_eq!(path, PathBuf::from("/etc/env.toml"));
    }

    #[test]
    fn test_resolve_path_falls_back_to_default() {
        assert_eq!(resolve_path_with(None, None), PathBuf::from(DEFAULT_CONFIG_FILE));
        assert_eq!(
            resolve_path_with(None, Some("  ".to_string())),
            PathBuf::from(DEFAULT_CONFIG_FILE)
        );
    }
}
