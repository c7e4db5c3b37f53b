use crate::error::{NamerError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an extra config file layered over the global one.
pub const CONFIG_PATH_ENV: &str = "TMUX_NAMER_CONFIG";

/// Prefix for per-key environment overrides, e.g. `TMUX_NAMER__LLM__MODEL`.
pub const ENV_PREFIX: &str = "TMUX_NAMER";

/// Default env var holding the OpenAI credential.
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Hard ceiling on window name length; `naming.max_len` may only lower it.
pub const MAX_NAME_LEN: usize = 40;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You name tmux windows for coding sessions. \
Given a user's most recent questions to an AI coding assistant, reply with a 2-4 word \
lowercase phrase describing the work session. Output ONLY the phrase, nothing else.";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamerConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub naming: NamingConfig,
    #[serde(default)]
    pub tmux: TmuxConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub env_var: Option<String>,
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_llm_temperature")]
    pub temperature: Option<f32>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "default_max_questions")]
    pub max_questions: usize,
    #[serde(default = "default_max_question_chars")]
    pub max_question_chars: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            base_url: None,
            api_key: None,
            env_var: None,
            max_tokens: default_llm_max_tokens(),
            temperature: default_llm_temperature(),
            timeout_secs: default_timeout_secs(),
            system_prompt: default_system_prompt(),
            max_questions: default_max_questions(),
            max_question_chars: default_max_question_chars(),
        }
    }
}

/// Per-million-token price overrides. Unset fields fall back to the
/// built-in table for `llm.model`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingConfig {
    #[serde(default)]
    pub input_per_million: Option<f64>,
    #[serde(default)]
    pub output_per_million: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingConfig {
    #[serde(default = "default_max_len")]
    pub max_len: usize,
    #[serde(default = "default_true")]
    pub lowercase: bool,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            max_len: default_max_len(),
            lowercase: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmuxConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for TmuxConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// Cost log location. Defaults to `~/.local/share/tmux-namer/cost.log`.
    #[serde(default)]
    pub path: Option<String>,
}

// -- Defaults --

fn default_llm_model() -> String {
    "gpt-oss-20b".to_string()
}
fn default_llm_max_tokens() -> usize {
    20
}
fn default_llm_temperature() -> Option<f32> {
    Some(0.7)
}
fn default_timeout_secs() -> u64 {
    5
}
fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}
fn default_max_questions() -> usize {
    3
}
fn default_max_question_chars() -> usize {
    500
}
fn default_max_len() -> usize {
    MAX_NAME_LEN
}
fn default_true() -> bool {
    true
}

impl NamerConfig {
    /// Load configuration with three-layer merge:
    /// 1. ~/.config/tmux-namer/config.toml (global)
    /// 2. $TMUX_NAMER_CONFIG (explicit file)
    /// 3. TMUX_NAMER__SECTION__KEY environment overrides
    pub fn load() -> Result<Self> {
        let explicit = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        Self::load_layers(global_config_path().as_deref(), explicit.as_deref())
    }

    /// Load from the given files (either may be absent) plus environment overrides.
    pub fn load_layers(global: Option<&Path>, explicit: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        for path in [global, explicit].into_iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.to_path_buf()).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| NamerError::Config(e.to_string()))?;

        let mut cfg: Self = config
            .try_deserialize()
            .map_err(|e| NamerError::Config(e.to_string()))?;

        cfg.validate();
        Ok(cfg)
    }

    /// Validate config values, clamping out-of-range values and logging warnings.
    /// Lenient: a bad value is fixed, never rejected.
    pub fn validate(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.llm.model.trim().is_empty() {
            warnings.push(format!(
                "llm.model is empty, using '{}'",
                default_llm_model()
            ));
            self.llm.model = default_llm_model();
        }

        if self.llm.max_tokens == 0 {
            warnings.push(format!(
                "llm.max_tokens = 0, setting to {}",
                default_llm_max_tokens()
            ));
            self.llm.max_tokens = default_llm_max_tokens();
        }

        if let Some(t) = self.llm.temperature {
            if !(0.0..=2.0).contains(&t) {
                warnings.push(format!(
                    "llm.temperature = {t} out of range [0.0, 2.0], clamping"
                ));
                self.llm.temperature = Some(t.clamp(0.0, 2.0));
            }
        }

        if self.llm.timeout_secs == 0 {
            warnings.push(format!(
                "llm.timeout_secs = 0, setting to {}",
                default_timeout_secs()
            ));
            self.llm.timeout_secs = default_timeout_secs();
        }

        if self.llm.system_prompt.trim().is_empty() {
            warnings.push("llm.system_prompt is empty, using the built-in prompt".to_string());
            self.llm.system_prompt = default_system_prompt();
        }

        if self.llm.max_questions == 0 {
            warnings.push("llm.max_questions = 0, setting to 1".to_string());
            self.llm.max_questions = 1;
        }

        if self.llm.max_question_chars == 0 {
            warnings.push(format!(
                "llm.max_question_chars = 0, setting to {}",
                default_max_question_chars()
            ));
            self.llm.max_question_chars = default_max_question_chars();
        }

        if self.naming.max_len == 0 || self.naming.max_len > MAX_NAME_LEN {
            warnings.push(format!(
                "naming.max_len = {} out of range [1, {MAX_NAME_LEN}], setting to {MAX_NAME_LEN}",
                self.naming.max_len
            ));
            self.naming.max_len = MAX_NAME_LEN;
        }

        let prices = [
            ("pricing.input_per_million", &mut self.pricing.input_per_million),
            ("pricing.output_per_million", &mut self.pricing.output_per_million),
        ];
        for (name, val) in prices {
            if let Some(v) = *val {
                if !v.is_finite() || v < 0.0 {
                    warnings.push(format!("{name} = {v} is not a valid price, ignoring"));
                    *val = None;
                }
            }
        }

        for w in &warnings {
            tracing::warn!("config: {}", w);
        }

        warnings
    }

    /// Where cost records are appended.
    pub fn cost_log_path(&self) -> PathBuf {
        match self.log.path.as_deref() {
            Some(p) if !p.trim().is_empty() => PathBuf::from(p),
            _ => default_cost_log_path(),
        }
    }
}

fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tmux-namer").join("config.toml"))
}

fn default_cost_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("tmux-namer")
        .join("cost.log")
}

/// Resolve the API key: config field first, then the configured (or default)
/// environment variable. Empty values count as missing.
pub fn resolve_api_key(config: &LlmConfig) -> Option<String> {
    if let Some(ref key) = config.api_key {
        if !key.trim().is_empty() {
            return Some(key.clone());
        }
    }

    let env_var_name = config.env_var.as_deref().unwrap_or(DEFAULT_API_KEY_ENV);
    std::env::var(env_var_name)
        .ok()
        .filter(|key| !key.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NamerConfig::default();
        assert_eq!(config.llm.model, "gpt-oss-20b");
        assert_eq!(config.llm.timeout_secs, 5);
        assert_eq!(config.llm.max_questions, 3);
        assert_eq!(config.llm.max_tokens, 20);
        assert_eq!(config.llm.temperature, Some(0.7));
        assert_eq!(config.naming.max_len, 40);
        assert!(config.naming.lowercase);
        assert!(config.tmux.enabled);
        assert!(config.pricing.input_per_million.is_none());
    }

    #[test]
    fn test_load_layers_no_files() {
        let config = NamerConfig::load_layers(
            Some(Path::new("/nonexistent/global.toml")),
            Some(Path::new("/nonexistent/explicit.toml")),
        )
        .unwrap();
        assert_eq!(config.llm.model, "gpt-oss-20b");
        assert_eq!(config.naming.max_len, 40);
    }

    #[test]
    fn test_load_layers_explicit_overrides_global() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("global.toml");
        let explicit = dir.path().join("explicit.toml");
        std::fs::write(
            &global,
            "[llm]\nmodel = \"gpt-5-nano\"\ntimeout_secs = 9\n\n[log]\npath = \"/tmp/global.log\"\n",
        )
        .unwrap();
        std::fs::write(&explicit, "[llm]\ntimeout_secs = 3\n").unwrap();

        let config = NamerConfig::load_layers(Some(&global), Some(&explicit)).unwrap();
        assert_eq!(config.llm.model, "gpt-5-nano");
        assert_eq!(config.llm.timeout_secs, 3);
        assert_eq!(config.cost_log_path(), PathBuf::from("/tmp/global.log"));
    }

    #[test]
    fn test_load_layers_pricing_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[pricing]\ninput_per_million = 1.5\noutput_per_million = 6.0\n",
        )
        .unwrap();

        let config = NamerConfig::load_layers(None, Some(&path)).unwrap();
        assert_eq!(config.pricing.input_per_million, Some(1.5));
        assert_eq!(config.pricing.output_per_million, Some(6.0));
    }

    #[test]
    fn test_validate_clamps_values() {
        let mut config = NamerConfig::default();
        config.llm.max_tokens = 0;
        config.llm.timeout_secs = 0;
        config.llm.temperature = Some(5.0);
        config.llm.max_questions = 0;
        config.naming.max_len = 120;
        config.pricing.input_per_million = Some(-1.0);

        let warnings = config.validate();
        assert_eq!(warnings.len(), 6);
        assert_eq!(config.llm.max_tokens, 20);
        assert_eq!(config.llm.timeout_secs, 5);
        assert_eq!(config.llm.temperature, Some(2.0));
        assert_eq!(config.llm.max_questions, 1);
        assert_eq!(config.naming.max_len, 40);
        assert!(config.pricing.input_per_million.is_none());
    }

    #[test]
    fn test_validate_defaults_are_clean() {
        let mut config = NamerConfig::default();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_validate_empty_prompt_restored() {
        let mut config = NamerConfig::default();
        config.llm.system_prompt = "   ".into();
        config.validate();
        assert_eq!(config.llm.system_prompt, DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn test_cost_log_path_default() {
        let config = NamerConfig::default();
        let path = config.cost_log_path();
        assert!(path.ends_with("tmux-namer/cost.log"));
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = NamerConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: NamerConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.llm.model, config.llm.model);
        assert_eq!(parsed.naming.max_len, config.naming.max_len);
    }

    #[test]
    fn test_resolve_api_key_from_config() {
        let config = LlmConfig {
            api_key: Some("config-key".into()),
            ..Default::default()
        };
        assert_eq!(resolve_api_key(&config).as_deref(), Some("config-key"));
    }

    #[test]
    fn test_resolve_api_key_custom_env_var() {
        std::env::set_var("TMUX_NAMER_TEST_KEY", "env-key");
        let config = LlmConfig {
            api_key: None,
            env_var: Some("TMUX_NAMER_TEST_KEY".into()),
            ..Default::default()
        };
        assert_eq!(resolve_api_key(&config).as_deref(), Some("env-key"));
        std::env::remove_var("TMUX_NAMER_TEST_KEY");
    }

    #[test]
    fn test_resolve_api_key_empty_is_missing() {
        std::env::set_var("TMUX_NAMER_TEST_EMPTY_KEY", "");
        let config = LlmConfig {
            api_key: Some(String::new()),
            env_var: Some("TMUX_NAMER_TEST_EMPTY_KEY".into()),
            ..Default::default()
        };
        assert!(resolve_api_key(&config).is_none());
        std::env::remove_var("TMUX_NAMER_TEST_EMPTY_KEY");
    }
}
