//! Application configuration for lakeport.
//!
//! User config lives at `~/.lakeport/lakeport.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LakeportError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "lakeport.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".lakeport";

// ---------------------------------------------------------------------------
// Config structs (matching lakeport.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Image download settings.
    #[serde(default)]
    pub images: ImagesConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default output directory for converted trees.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Download referenced images into per-directory `assets/` folders.
    #[serde(default = "default_true")]
    pub download_images: bool,

    /// Prepend a YAML frontmatter block carrying the document title.
    #[serde(default = "default_true")]
    pub frontmatter: bool,

    /// Disambiguate file names with an identifier suffix instead of `_1`, `_2`.
    #[serde(default)]
    pub unique_suffix: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            download_images: true,
            frontmatter: true,
            unique_suffix: false,
        }
    }
}

fn default_output_dir() -> String {
    "./out".into()
}
fn default_true() -> bool {
    true
}

/// `[images]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// Per-request timeout in seconds for image fetches.
    #[serde(default = "default_image_timeout")]
    pub timeout_secs: u64,

    /// Referer/Origin presented to the CDN (it validates the referring origin).
    #[serde(default = "default_referer")]
    pub referer: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_image_timeout(),
            referer: default_referer(),
        }
    }
}

fn default_image_timeout() -> u64 {
    15
}
fn default_referer() -> String {
    "https://www.yuque.com".into()
}

// ---------------------------------------------------------------------------
// Convert options (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime conversion options — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Download images into `assets/` and rewrite references.
    pub download_images: bool,
    /// Prepend YAML frontmatter with the document title.
    pub frontmatter: bool,
    /// Use identifier suffixes for file-name disambiguation.
    pub unique_suffix: bool,
    /// Per-request image fetch timeout in seconds.
    pub image_timeout_secs: u64,
    /// Referer/Origin presented on image requests.
    pub image_referer: String,
}

impl From<&AppConfig> for ConvertOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            download_images: config.defaults.download_images,
            frontmatter: config.defaults.frontmatter,
            unique_suffix: config.defaults.unique_suffix,
            image_timeout_secs: config.images.timeout_secs,
            image_referer: config.images.referer.clone(),
        }
    }
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.lakeport/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LakeportError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.lakeport/lakeport.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| LakeportError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| LakeportError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| LakeportError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LakeportError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| LakeportError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_dir"));
        assert!(toml_str.contains("timeout_secs"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert!(parsed.defaults.download_images);
        assert!(parsed.defaults.frontmatter);
        assert!(!parsed.defaults.unique_suffix);
        assert_eq!(parsed.images.timeout_secs, 15);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
download_images = false
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert!(!config.defaults.download_images);
        assert!(config.defaults.frontmatter);
        assert_eq!(config.images.referer, "https://www.yuque.com");
    }

    #[test]
    fn convert_options_from_app_config() {
        let app = AppConfig::default();
        let opts = ConvertOptions::from(&app);
        assert!(opts.download_images);
        assert_eq!(opts.image_timeout_secs, 15);
        assert_eq!(opts.image_referer, "https://www.yuque.com");
    }

    #[test]
    fn load_config_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("lakeport.toml");
        std::fs::write(&path, "[defaults]\nunique_suffix = true\n").expect("write");

        let config = load_config_from(&path).expect("load");
        assert!(config.defaults.unique_suffix);
    }

    #[test]
    fn load_config_rejects_bad_toml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("lakeport.toml");
        std::fs::write(&path, "not toml at all [").expect("write");

        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("config error"));
    }
}
