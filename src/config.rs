//! Site configuration module.
//!
//! Handles loading, validating, and merging the optional `site.toml` in the
//! site root. Stock defaults describe the commutative.group build exactly, so a
//! checkout without `site.toml` builds the same site as one with a fully
//! spelled-out file.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [site]
//! title = "commutative.group"   # Written into <title> of the top-level pages
//! theme = "default"             # Renderer theme for the top-level pages
//! pages = ["index.html", "about.html", "posts.html"]
//!
//! [tools]
//! renderer = "plastex"
//! latex = "latexmk"
//! pdf_crop = "pdfcrop"
//! rasterizer = "pdftoppm"
//!
//! [pdf]
//! enabled = true                # Compile a companion PDF for every post
//!
//! [cleanup]
//! aux_dirs = ["_minted-main", "svg-inkscape"]
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse — override just the values you want:
//!
//! ```toml
//! [pdf]
//! enabled = false
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the optional config file in the site root.
pub const CONFIG_FILE: &str = "site.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Build configuration loaded from `site.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Top-level page settings.
    pub site: SiteSection,
    /// External program names.
    pub tools: ToolsConfig,
    /// Companion PDF settings.
    pub pdf: PdfConfig,
    /// Leftover-artifact cleanup settings.
    pub cleanup: CleanupConfig,
}

impl SiteConfig {
    /// Validate config values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site.title.trim().is_empty() {
            return Err(ConfigError::Validation("site.title must not be empty".into()));
        }
        if self.site.pages.is_empty() {
            return Err(ConfigError::Validation("site.pages must not be empty".into()));
        }
        if let Some(page) = self.site.pages.iter().find(|p| !is_plain_file_name(p)) {
            return Err(ConfigError::Validation(format!(
                "site.pages entry '{page}' must be a plain file name"
            )));
        }
        for (key, program) in [
            ("tools.renderer", &self.tools.renderer),
            ("tools.latex", &self.tools.latex),
            ("tools.pdf_crop", &self.tools.pdf_crop),
            ("tools.rasterizer", &self.tools.rasterizer),
        ] {
            if program.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        if let Some(dir) = self.cleanup.aux_dirs.iter().find(|d| !is_plain_file_name(d)) {
            return Err(ConfigError::Validation(format!(
                "cleanup.aux_dirs entry '{dir}' must be a plain directory name"
            )));
        }
        Ok(())
    }
}

/// Names that stay inside the directory they are joined onto.
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Top-level page settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteSection {
    /// Literal title written into every top-level page.
    pub title: String,
    /// Renderer theme for the top-level pages.
    pub theme: String,
    /// Pages the renderer produces for the root document, relative to the output dir.
    pub pages: Vec<String>,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            title: "commutative.group".to_string(),
            theme: "default".to_string(),
            pages: vec![
                "index.html".to_string(),
                "about.html".to_string(),
                "posts.html".to_string(),
            ],
        }
    }
}

/// Program names for the external collaborators. Looked up on `PATH`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    /// LaTeX-to-HTML renderer.
    pub renderer: String,
    /// LaTeX build tool.
    pub latex: String,
    /// PDF whitespace cropper.
    pub pdf_crop: String,
    /// PDF-to-PNG rasterizer.
    pub rasterizer: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            renderer: "plastex".to_string(),
            latex: "latexmk".to_string(),
            pdf_crop: "pdfcrop".to_string(),
            rasterizer: "pdftoppm".to_string(),
        }
    }
}

/// Companion PDF settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PdfConfig {
    /// Compile each post's source to PDF and publish it next to the HTML.
    pub enabled: bool,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Leftover-artifact cleanup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CleanupConfig {
    /// LaTeX auxiliary-state directories removed from the site root and from
    /// every post directory.
    pub aux_dirs: Vec<String>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            aux_dirs: vec!["_minted-main".to_string(), "svg-inkscape".to_string()],
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
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

/// Load `site.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `site.toml`.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `site.toml` in the site root, falling back to stock defaults.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(root)?)
}

/// Returns a fully-commented stock `site.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r#"# commgroup build configuration
# =============================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Top-level pages rendered from main.tex
# ---------------------------------------------------------------------------
[site]
# Literal <title> for every top-level page.
title = "commutative.group"

# Renderer theme for the top-level pages.
theme = "default"

# Pages the renderer writes into gen/ whose titles get rewritten.
pages = ["index.html", "about.html", "posts.html"]

# ---------------------------------------------------------------------------
# External programs (looked up on PATH)
# ---------------------------------------------------------------------------
[tools]
renderer = "plastex"
latex = "latexmk"
pdf_crop = "pdfcrop"
rasterizer = "pdftoppm"

# ---------------------------------------------------------------------------
# Companion PDFs
# ---------------------------------------------------------------------------
[pdf]
# Compile each post to PDF and publish it as gen/posts/<slug>.pdf.
enabled = true

# ---------------------------------------------------------------------------
# Cleanup
# ---------------------------------------------------------------------------
[cleanup]
# LaTeX auxiliary directories removed from the site root and post directories.
aux_dirs = ["_minted-main", "svg-inkscape"]
"#
}
