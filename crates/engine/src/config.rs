//! Configuration via `formgate.toml`
//!
//! Every field is optional in the file and falls back to its default. On
//! first start an application can write the commented default file with
//! [`FormgateConfig::write_default_if_missing`] and edit it from there.

use formgate_core::{FormgateError, FormgateResult};
use formgate_session::context::DEFAULT_MAX_CONTEXTS_PER_SESSION;
use formgate_session::token::{
    DEFAULT_MAX_TOKENS_PER_SESSION, DEFAULT_TOKEN_LENGTH, MIN_TOKEN_LENGTH,
};
use formgate_session::{RedirectContextStore, TransactionTokenStore};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "formgate.toml";

// ============================================================================
// Sections
// ============================================================================

/// `[tokens]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Alphanumeric characters per token
    pub length: usize,
    /// Unconsumed tokens kept per session; the oldest is evicted beyond this
    pub max_per_session: usize,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            length: DEFAULT_TOKEN_LENGTH,
            max_per_session: DEFAULT_MAX_TOKENS_PER_SESSION,
        }
    }
}

/// `[contexts]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Unconsumed snapshots kept per session; the oldest is evicted beyond this
    pub max_per_session: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_per_session: DEFAULT_MAX_CONTEXTS_PER_SESSION,
        }
    }
}

/// `[messages]`: user-visible notice texts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageConfig {
    /// Shown when a transaction token was already consumed
    pub duplicate_submission: String,
    /// Shown on optimistic conflicts and stale rows
    pub data_changed: String,
    /// Required-field template; `{0}` is the field label
    pub required_field: String,
    /// Shown on the generic error page
    pub generic_failure: String,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            duplicate_submission: "This action was already processed.".to_string(),
            data_changed: "Someone else changed this data. Please reload and try again."
                .to_string(),
            required_field: "{0} is required.".to_string(),
            generic_failure: "Something went wrong. Please try again later.".to_string(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line human-readable output
    #[default]
    Compact,
    /// Multi-line human-readable output
    Pretty,
    /// One JSON object per event
    Json,
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`"info"`, `"formgate=debug,warn"`, ...); `RUST_LOG` overrides it
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
        }
    }
}

// ============================================================================
// FormgateConfig
// ============================================================================

/// Configuration loaded from `formgate.toml`.
///
/// # Example
///
/// ```toml
/// [tokens]
/// length = 32
///
/// [logging]
/// level = "formgate=debug,info"
/// format = "json"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormgateConfig {
    /// Transaction token settings
    pub tokens: TokenConfig,
    /// Redirect context settings
    pub contexts: ContextConfig,
    /// User-visible notice texts
    pub messages: MessageConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl FormgateConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Formgate configuration

[tokens]
# Alphanumeric characters per transaction token (minimum 28).
# 32 characters carry about 190 bits of entropy.
length = 32
# Unconsumed tokens kept per session. Beyond this the oldest is evicted,
# and submitting a form that carried it reports a duplicate submission.
max_per_session = 64

[contexts]
# Unconsumed redirect snapshots kept per session. Beyond this the oldest is
# evicted and its redirect target starts without inherited state.
max_per_session = 16

[messages]
duplicate_submission = "This action was already processed."
data_changed = "Someone else changed this data. Please reload and try again."
# {0} is replaced with the field label
required_field = "{0} is required."
generic_failure = "Something went wrong. Please try again later."

[logging]
# Filter directive; the RUST_LOG environment variable overrides it.
level = "info"
# "compact" (default), "pretty" or "json"
format = "compact"
"#
    }

    /// Parse and validate config text.
    ///
    /// # Errors
    ///
    /// Returns `FormgateError::Config` if the text is not valid TOML or a
    /// value is out of range.
    pub fn from_toml_str(content: &str) -> FormgateResult<Self> {
        let config: FormgateConfig = toml::from_str(content)
            .map_err(|e| FormgateError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> FormgateResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FormgateError::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            FormgateError::Config(msg) => {
                FormgateError::config(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> FormgateResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                FormgateError::internal(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> FormgateResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FormgateError::internal(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            FormgateError::internal(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Check value ranges.
    pub fn validate(&self) -> FormgateResult<()> {
        if self.tokens.length < MIN_TOKEN_LENGTH {
            return Err(FormgateError::config(format!(
                "tokens.length must be at least {}, got {}",
                MIN_TOKEN_LENGTH, self.tokens.length
            )));
        }
        if self.tokens.max_per_session == 0 {
            return Err(FormgateError::config(
                "tokens.max_per_session must be at least 1",
            ));
        }
        if self.contexts.max_per_session == 0 {
            return Err(FormgateError::config(
                "contexts.max_per_session must be at least 1",
            ));
        }
        EnvFilter::try_new(&self.logging.level).map_err(|e| {
            FormgateError::config(format!(
                "Invalid logging.level '{}': {}",
                self.logging.level, e
            ))
        })?;
        Ok(())
    }

    /// Token store built from `[tokens]`
    pub fn token_store(&self) -> FormgateResult<TransactionTokenStore> {
        TransactionTokenStore::new(self.tokens.length, self.tokens.max_per_session)
    }

    /// Context store built from `[contexts]`
    pub fn context_store(&self) -> FormgateResult<RedirectContextStore> {
        RedirectContextStore::new(self.contexts.max_per_session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = FormgateConfig::default();
        assert_eq!(config.tokens.length, 32);
        assert_eq!(config.tokens.max_per_session, 64);
        assert_eq!(config.contexts.max_per_session, 16);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_toml_parses_to_default() {
        let config = FormgateConfig::from_toml_str(FormgateConfig::default_toml()).unwrap();
        assert_eq!(config, FormgateConfig::default());
    }

    #[test]
    fn partial_file_uses_defaults() {
        let config = FormgateConfig::from_toml_str("[logging]\nformat = \"json\"\n").unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.tokens, TokenConfig::default());
    }

    #[test]
    fn short_token_rejected() {
        let err = FormgateConfig::from_toml_str("[tokens]\nlength = 8\n").unwrap_err();
        assert!(matches!(err, FormgateError::Config(_)));
        assert!(err.to_string().contains("tokens.length"));
    }

    #[test]
    fn zero_capacities_rejected() {
        assert!(FormgateConfig::from_toml_str("[tokens]\nmax_per_session = 0\n").is_err());
        assert!(FormgateConfig::from_toml_str("[contexts]\nmax_per_session = 0\n").is_err());
    }

    #[test]
    fn unknown_format_rejected() {
        assert!(FormgateConfig::from_toml_str("[logging]\nformat = \"xml\"\n").is_err());
    }

    #[test]
    fn invalid_level_rejected() {
        assert!(FormgateConfig::from_toml_str("[logging]\nlevel = \"formgate=loud\"\n").is_err());
    }

    #[test]
    fn write_default_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        assert!(!path.exists());

        FormgateConfig::write_default_if_missing(&path).unwrap();
        assert!(path.exists());
        assert_eq!(
            FormgateConfig::from_file(&path).unwrap(),
            FormgateConfig::default()
        );
    }

    #[test]
    fn write_default_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[tokens]\nlength = 40\n").unwrap();

        FormgateConfig::write_default_if_missing(&path).unwrap();
        assert_eq!(FormgateConfig::from_file(&path).unwrap().tokens.length, 40);
    }

    #[test]
    fn write_to_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let mut config = FormgateConfig::default();
        config.messages.data_changed = "Changed elsewhere".to_string();
        config.logging.format = LogFormat::Pretty;

        config.write_to_file(&path).unwrap();
        assert_eq!(FormgateConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = FormgateConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, FormgateError::Config(_)));
    }

    #[test]
    fn stores_built_from_config() {
        let config = FormgateConfig::from_toml_str("[tokens]\nlength = 40\n").unwrap();
        assert_eq!(config.token_store().unwrap().token_length(), 40);
        assert!(config.context_store().is_ok());
    }
}
