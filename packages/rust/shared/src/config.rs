//! Application configuration for wikimirror.
//!
//! User config lives at `~/.wikimirror/wikimirror.toml`.
//! CLI flags override config file values, which override defaults.
//! The API token itself is never stored — only the name of the env var
//! holding it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MirrorError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "wikimirror.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".wikimirror";

// ---------------------------------------------------------------------------
// Config structs (matching wikimirror.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote site identity and credentials.
    #[serde(default)]
    pub site: SiteConfig,

    /// Export defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// `[site]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site domain, e.g. `yourcompany.atlassian.net`.
    #[serde(default)]
    pub domain: String,

    /// Account email used for basic auth.
    #[serde(default)]
    pub email: String,

    /// Name of the env var holding the API token (never store the token itself).
    #[serde(default = "default_api_token_env")]
    pub api_token_env: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            email: String::new(),
            api_token_env: default_api_token_env(),
        }
    }
}

fn default_api_token_env() -> String {
    "WIKIMIRROR_API_TOKEN".into()
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default output directory for the mirrored tree.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Concurrent page exports per space.
    #[serde(default = "default_page_concurrency")]
    pub page_concurrency: usize,

    /// Convert page bodies to Markdown alongside the raw HTML.
    #[serde(default)]
    pub export_markdown: bool,

    /// Export at most this many randomly chosen spaces (0 = all).
    #[serde(default)]
    pub sample_spaces: usize,

    /// Export at most this many randomly chosen pages per space (0 = all).
    #[serde(default)]
    pub sample_pages: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            page_concurrency: default_page_concurrency(),
            export_markdown: false,
            sample_spaces: 0,
            sample_pages: 0,
        }
    }
}

fn default_output_dir() -> String {
    "./wikimirror-data".into()
}
fn default_page_concurrency() -> usize {
    5
}

// ---------------------------------------------------------------------------
// Export config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime export configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Root directory for the mirrored tree.
    pub output_dir: PathBuf,
    /// Concurrent page exports per space.
    pub page_concurrency: usize,
    /// Whether to emit `content.md` alongside `content.html`.
    pub export_markdown: bool,
    /// Space sample size (0 = disabled).
    pub sample_spaces: usize,
    /// Per-space page sample size (0 = disabled).
    pub sample_pages: usize,
}

impl From<&AppConfig> for ExportConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            output_dir: PathBuf::from(&config.defaults.output_dir),
            page_concurrency: config.defaults.page_concurrency,
            export_markdown: config.defaults.export_markdown,
            sample_spaces: config.defaults.sample_spaces,
            sample_pages: config.defaults.sample_pages,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.wikimirror/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| MirrorError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.wikimirror/wikimirror.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| MirrorError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| MirrorError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| MirrorError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| MirrorError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| MirrorError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the API token from the env var named in the config.
pub fn resolve_api_token(config: &AppConfig) -> Result<String> {
    let var_name = &config.site.api_token_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(MirrorError::config(format!(
            "API token not found. Set the {var_name} environment variable."
        ))),
    }
}
