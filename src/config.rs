//! Controller configuration
//!
//! Every field has a default matching the markup the report page renders, so
//! an empty TOML file (or none at all) yields a working controller. The same
//! structure is accepted from JavaScript by the wasm adapter.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Offset past which the scroll-to-top control is shown
    #[serde(default = "default_scroll_threshold")]
    pub scroll_threshold: f64,
    /// One-shot deferral before the settle step runs
    #[serde(default = "default_init_delay_ms")]
    pub init_delay_ms: u64,
    /// Extra roots scrolled to the top on activation, besides the active surface.
    /// Empty disables the duplication entirely.
    #[serde(default = "default_scroll_roots")]
    pub redundant_scroll_roots: Vec<ScrollRoot>,
    #[serde(default)]
    pub markers: MarkerConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub menu: MenuConfig,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            scroll_threshold: default_scroll_threshold(),
            init_delay_ms: default_init_delay_ms(),
            redundant_scroll_roots: default_scroll_roots(),
            markers: MarkerConfig::default(),
            export: ExportConfig::default(),
            menu: MenuConfig::default(),
        }
    }
}

impl OverlayConfig {
    /// Strict parse: malformed TOML is an error
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Load configuration from disk, falling back to defaults on any problem.
pub fn load_config(path: &Path) -> OverlayConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded overlay config");
            data
        }
        Err(err) => {
            warn!(path = %path.display(), "Falling back to default config: {err}");
            return OverlayConfig::default();
        }
    };

    match OverlayConfig::from_toml_str(&contents) {
        Ok(cfg) => {
            debug!("Parsed overlay configuration");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err}");
            OverlayConfig::default()
        }
    }
}

/// A scroll root written as a plain string in config:
/// `page`, `document_element`, `body`, or any other string as a selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScrollRoot {
    Page,
    DocumentElement,
    Body,
    Selector(String),
}

impl From<String> for ScrollRoot {
    fn from(value: String) -> Self {
        match value.as_str() {
            "page" | "window" => ScrollRoot::Page,
            "document_element" | "html" => ScrollRoot::DocumentElement,
            "body" => ScrollRoot::Body,
            _ => ScrollRoot::Selector(value),
        }
    }
}

impl From<ScrollRoot> for String {
    fn from(root: ScrollRoot) -> Self {
        root.to_string()
    }
}

impl fmt::Display for ScrollRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrollRoot::Page => write!(f, "page"),
            ScrollRoot::DocumentElement => write!(f, "document_element"),
            ScrollRoot::Body => write!(f, "body"),
            ScrollRoot::Selector(s) => write!(f, "{}", s),
        }
    }
}

/// Selectors for the action markers authored by the page renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub preview: String,
    pub save: String,
    pub back: String,
    pub export: String,
    /// Enclosing unit holding exactly one image
    pub card: String,
    pub category_attribute: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            preview: ".maximize-button".to_string(),
            save: ".save-button".to_string(),
            back: ".close-button".to_string(),
            export: "#exportPdf".to_string(),
            card: ".image-card".to_string(),
            category_attribute: "data-image-type".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub storage_id: String,
    pub primary_selector: String,
    pub generic_selector: String,
    /// Generic outputs must hold more markup than this to count
    pub generic_min_length: usize,
    pub title: String,
    pub filename_prefix: String,
    pub missing_notice: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            storage_id: "htmlContentStorage".to_string(),
            primary_selector: ".output-html, .gr-html, [data-testid=\"html-output\"]".to_string(),
            generic_selector: ".prose, .content, .output".to_string(),
            generic_min_length: 1000,
            title: "Age & Gender Analysis Report".to_string(),
            filename_prefix: "age_gender_analysis_".to_string(),
            missing_notice: "No analysis results available. Please run estimation first."
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuConfig {
    pub toggle_id: String,
    pub panel_id: String,
    pub active_class: String,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            toggle_id: "menuToggle".to_string(),
            panel_id: "mobileNav".to_string(),
            active_class: "active".to_string(),
        }
    }
}

fn default_scroll_threshold() -> f64 {
    100.0
}

fn default_init_delay_ms() -> u64 {
    100
}

fn default_scroll_roots() -> Vec<ScrollRoot> {
    vec![
        ScrollRoot::Page,
        ScrollRoot::DocumentElement,
        ScrollRoot::Body,
        ScrollRoot::Selector(".gradio-container".to_string()),
    ]
}
