use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::filters::FilterConfig;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub companies: Vec<SourceConfig>,
}

/// One monitored source. A source is either a JSON API (`api_url` set, with
/// dotted field paths into each listing) or an HTML page (`url` set, with CSS
/// selectors). `api_url` wins when both are present.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,

    // JSON API sources
    #[serde(default)]
    pub api_url: Option<String>,
    /// Dotted path to the listings array, for APIs that nest it somewhere
    /// other than the usual data/jobs/results wrappers.
    #[serde(default)]
    pub api_jobs_path: Option<String>,
    #[serde(default = "default_title_field")]
    pub api_title_field: String,
    #[serde(default = "default_department_field")]
    pub api_department_field: String,
    #[serde(default = "default_location_field")]
    pub api_location_field: String,
    #[serde(default = "default_link_field")]
    pub api_link_field: String,
    /// Base for turning relative links absolute; derived from api_url when
    /// absent.
    #[serde(default)]
    pub base_url: Option<String>,

    // HTML sources
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub job_selector: Option<String>,
    #[serde(default)]
    pub title_selector: Option<String>,
    #[serde(default)]
    pub department_selector: Option<String>,
    #[serde(default)]
    pub link_selector: Option<String>,

    #[serde(flatten)]
    pub filters: FilterConfig,
}

impl SourceConfig {
    pub fn is_api(&self) -> bool {
        self.api_url.is_some()
    }
}

fn default_title_field() -> String {
    "title".to_string()
}

fn default_department_field() -> String {
    "department".to_string()
}

fn default_location_field() -> String {
    "location".to_string()
}

fn default_link_field() -> String {
    "url".to_string()
}

/// Missing config is not an error - it just means nothing is being monitored
/// yet. A present but unparsable config is.
pub fn load(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Invalid config file: {}", path.display()))
}
