//! Project configuration module.
//!
//! Handles loading and validating `quire.toml`, which describes where a
//! project keeps its content, metadata, and build output. Site metadata
//! itself (title, categories, posts) lives in YAML under the settings
//! directory; see [`crate::settings`].
//!
//! ## Config File Location
//!
//! Place `quire.toml` in the project root. It is optional: without it the
//! stock layout below is used.
//!
//! ```text
//! project/
//! ├── quire.toml          # Optional layout overrides
//! ├── content/
//! │   ├── posts/          # Post sources (*.md, any depth)
//! │   └── pages/          # Page sources (*.md, any depth)
//! ├── settings/           # site.yaml, categories.yaml, posts.yaml, pages.yaml
//! ├── static/
//! │   └── styles.css      # Local stylesheet, appended after external styles
//! └── var/                # Build output + manifest.json
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//! content_dir = "content"
//! settings_dir = "settings"
//! static_dir = "static"
//! output_dir = "var"
//!
//! [minify]
//! enabled = true
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the project config file within the project root.
pub const CONFIG_FILENAME: &str = "quire.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Project layout loaded from `quire.toml`.
///
/// Paths are relative to the project root unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Directory holding `posts/` and `pages/` Markdown trees.
    pub content_dir: String,
    /// Directory holding the YAML metadata documents.
    pub settings_dir: String,
    /// Directory holding `styles.css`.
    pub static_dir: String,
    /// Build output directory (artifacts and manifest).
    pub output_dir: String,
    /// HTML minification settings.
    pub minify: MinifyConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            content_dir: "content".to_string(),
            settings_dir: "settings".to_string(),
            static_dir: "static".to_string(),
            output_dir: "var".to_string(),
            minify: MinifyConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MinifyConfig {
    pub enabled: bool,
}

impl Default for MinifyConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl ProjectConfig {
    /// Validate the layout: every directory set, output kept apart from sources.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("content_dir", &self.content_dir),
            ("settings_dir", &self.settings_dir),
            ("static_dir", &self.static_dir),
            ("output_dir", &self.output_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        let output = Path::new(&self.output_dir);
        if output == Path::new(&self.content_dir) || output == Path::new(&self.settings_dir) {
            return Err(ConfigError::Validation(
                "output_dir must differ from content_dir and settings_dir".into(),
            ));
        }
        Ok(())
    }

    /// Resolve this layout against a project root.
    pub fn paths(&self, root: &Path) -> ProjectPaths {
        ProjectPaths {
            content: root.join(&self.content_dir),
            settings: root.join(&self.settings_dir),
            static_dir: root.join(&self.static_dir),
            output: root.join(&self.output_dir),
        }
    }
}

/// Absolute-ish directories for one project, derived from [`ProjectConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub content: PathBuf,
    pub settings: PathBuf,
    pub static_dir: PathBuf,
    pub output: PathBuf,
}

impl ProjectPaths {
    pub fn posts_source(&self) -> PathBuf {
        self.content.join("posts")
    }

    pub fn pages_source(&self) -> PathBuf {
        self.content.join("pages")
    }

    pub fn stylesheet(&self) -> PathBuf {
        self.static_dir.join("styles.css")
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(ProjectConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `quire.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no config file exists in the directory.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load the project config from `root`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<ProjectConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match load_raw_config(root)? {
        Some(overlay) => merge_toml(base, overlay),
        None => base,
    };
    let config: ProjectConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `quire.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Quire Configuration
# ====================
# All settings are optional. Values shown below are the defaults.
# Paths are relative to the directory holding this file.
# Unknown keys will cause an error.

# Markdown sources: <content_dir>/posts/**/*.md and <content_dir>/pages/**/*.md
content_dir = "content"

# YAML metadata: site.yaml, categories.yaml, posts.yaml, pages.yaml
settings_dir = "settings"

# Local stylesheet: <static_dir>/styles.css
static_dir = "static"

# Rendered HTML and manifest.json
output_dir = "var"

[minify]
# Strip comments and collapse whitespace in generated HTML.
enabled = true
"##
}
