//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from a TOML file. Secrets and the root folder
//! can be overridden from the environment, and the binary's command line sits
//! above both.
//!
//! # Root folder priority
//!
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`PFA_ROOT_FOLDER`)
//! 3. TOML config file (`root_folder`)
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable overriding the root folder
pub const ENV_ROOT_FOLDER: &str = "PFA_ROOT_FOLDER";
/// Environment variable pointing at the TOML file
pub const ENV_CONFIG: &str = "PFA_CONFIG";
/// Environment variable overriding `[ai] api_key`
pub const ENV_AI_API_KEY: &str = "PFA_AI_API_KEY";
/// Environment variable overriding `[smtp] password`
pub const ENV_SMTP_PASSWORD: &str = "PFA_SMTP_PASSWORD";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "pfa.db";
/// Upload folder name inside the root folder
pub const UPLOADS_DIR: &str = "uploads";

/// Bootstrap configuration loaded from TOML
///
/// Every field has a default so an absent file is a valid configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Folder holding the database and uploaded files
    pub root_folder: Option<PathBuf>,

    /// Address to bind the HTTP server to
    pub bind: String,

    /// HTTP server port
    pub port: u16,

    /// Largest accepted request body (uploads), in bytes
    pub max_upload_bytes: usize,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Generative-AI document extraction
    pub ai: AiConfig,

    /// Outbound email
    pub smtp: SmtpConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            bind: "127.0.0.1".to_string(),
            port: 5780,
            max_upload_bytes: 25 * 1024 * 1024,
            logging: LoggingConfig::default(),
            ai: AiConfig::default(),
            smtp: SmtpConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive string (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Generative-AI API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// API key; extraction is disabled when absent
    pub api_key: Option<String>,

    /// Model name
    pub model: String,

    /// API base URL (without the `/models/...` suffix)
    pub base_url: String,

    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-1.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            timeout_secs: 60,
        }
    }
}

impl AiConfig {
    /// Whether a usable API key is present
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(is_valid_key)
    }
}

/// SMTP configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Sender mailbox, e.g. `"Finance <me@example.com>"`
    pub from: String,
    /// STARTTLS relay when true, plain connection when false
    pub use_tls: bool,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 587,
            username: String::new(),
            password: String::new(),
            from: String::new(),
            use_tls: true,
        }
    }
}

impl SmtpConfig {
    /// Whether enough is set to attempt delivery
    pub fn is_configured(&self) -> bool {
        !self.host.trim().is_empty() && !self.from.trim().is_empty()
    }
}

/// Validate a secret (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load configuration from a file
    ///
    /// A missing file yields defaults; a malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config file not found, using defaults: {}", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply secret overrides from the environment
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var(ENV_AI_API_KEY) {
            if is_valid_key(&key) {
                self.ai.api_key = Some(key);
            }
        }
        if let Ok(password) = std::env::var(ENV_SMTP_PASSWORD) {
            self.smtp.password = password;
        }
        self
    }
}

/// Locate the TOML configuration file
///
/// Priority: explicit path → `PFA_CONFIG` → `<config_dir>/pfa/pfa.toml`.
pub fn config_file_path(cli_arg: Option<&Path>) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ENV_CONFIG) {
        return PathBuf::from(path);
    }

    dirs::config_dir()
        .map(|d| d.join("pfa").join("pfa.toml"))
        .unwrap_or_else(|| PathBuf::from("pfa.toml"))
}

/// Resolve the root folder following the documented priority order
pub fn resolve_root_folder(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ENV_ROOT_FOLDER) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &toml_config.root_folder {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/pfa
        dirs::data_local_dir()
            .map(|d| d.join("pfa"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/pfa"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/pfa
        dirs::data_dir()
            .map(|d| d.join("pfa"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/pfa"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\pfa
        dirs::data_local_dir()
            .map(|d| d.join("pfa"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\pfa"))
    } else {
        PathBuf::from("./pfa_data")
    }
}

/// Paths derived from the root folder
#[derive(Debug, Clone)]
pub struct RootFolder {
    root: PathBuf,
}

impl RootFolder {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Create the root and upload folders if missing
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(self.uploads_dir())?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join(UPLOADS_DIR)
    }
}
