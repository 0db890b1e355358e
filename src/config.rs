//! Site configuration: optional TOML file, then environment overrides

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{BlogError, Result};
use crate::utils::Locale;

pub const ENV_API_ENDPOINT: &str = "PRISMIC_API_ENDPOINT";
pub const ENV_ACCESS_TOKEN: &str = "PRISMIC_ACCESS_TOKEN";
pub const ENV_PAGE_SIZE: &str = "BLOG_PAGE_SIZE";
pub const ENV_OUTPUT_DIR: &str = "BLOG_OUTPUT_DIR";
pub const ENV_LOCALE: &str = "BLOG_LOCALE";

const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Repository API root, e.g. `https://my-repo.cdn.prismic.io/api/v2`.
    pub api_endpoint: String,
    pub access_token: Option<String>,
    /// Custom type holding the posts.
    pub document_type: String,
    /// Posts per listing page.
    pub page_size: u32,
    pub locale: Locale,
    pub output_dir: PathBuf,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            api_endpoint: String::new(),
            access_token: None,
            document_type: String::from("post"),
            page_size: 1,
            locale: Locale::PtBr,
            output_dir: PathBuf::from("./public"),
        }
    }
}

impl SiteConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| BlogError::Config(e.to_string()))
    }

    /// Load `.env`, the optional config file, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Ok(dotenv_path) = dotenv::dotenv() {
            debug!("loaded environment from {}", dotenv_path.display());
        }

        let mut config = match path {
            Some(path) => {
                debug!("reading config from {}", path.display());
                Self::from_toml_str(&fs::read_to_string(path)?)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from `lookup` (the process environment outside tests).
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENV_API_ENDPOINT) {
            self.api_endpoint = endpoint;
        }
        if let Some(token) = lookup(ENV_ACCESS_TOKEN).filter(|t| !t.is_empty()) {
            self.access_token = Some(token);
        }
        if let Some(size) = lookup(ENV_PAGE_SIZE) {
            self.page_size = size.trim().parse().map_err(|_| {
                BlogError::Config(format!("{ENV_PAGE_SIZE} must be a number, got {size:?}"))
            })?;
        }
        if let Some(dir) = lookup(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(locale) = lookup(ENV_LOCALE) {
            self.locale = locale.parse().map_err(BlogError::Config)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_endpoint.is_empty() {
            return Err(BlogError::Config(format!(
                "no API endpoint configured (set {ENV_API_ENDPOINT} or api_endpoint)"
            )));
        }
        Url::parse(&self.api_endpoint)?;
        if self.document_type.is_empty() {
            return Err(BlogError::Config("document_type must not be empty".to_string()));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(BlogError::Config(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }
        Ok(())
    }
}
