// src/config.rs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    net::{IpAddr, Ipv4Addr},
    path::{Path, PathBuf},
};
use tracing::{debug, info};

use crate::dates::parse_weekday;
use crate::fetch::urls::LANDING_PAGE;

/// Environment variable naming an optional YAML config file.
pub const CONFIG_ENV: &str = "BANANAS_CONFIG";

pub const DEFAULT_URL_ROOT: &str = "https://assets.publishing.service.gov.uk/government/uploads/system/uploads/attachment_data/file/1045165/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Prefix the computed file name is appended to.
    pub url_root: String,
    pub landing_page: String,
    /// Scrape `landing_page` for the download link before falling back to
    /// `url_root` + computed file name.
    pub discover_link: bool,
    /// Weekday the dataset is published on.
    pub publish_weekday: String,
    pub local_fallback: PathBuf,
    pub bind: IpAddr,
    pub port: u16,
    pub fetch_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url_root: DEFAULT_URL_ROOT.to_string(),
            landing_page: LANDING_PAGE.to_string(),
            discover_link: false,
            publish_weekday: "monday".to_string(),
            local_fallback: PathBuf::from("data/bananas-1nov21.csv"),
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8050,
            fetch_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Defaults, then the YAML file named by `BANANAS_CONFIG`, then
    /// `PORT` / `BANANAS_URL_ROOT` from the environment.
    pub fn load() -> Result<Self> {
        let mut config = match env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.check()?;
        debug!(?config, "configuration loaded");
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_yaml_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        info!(path = %path.display(), "read config file");
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Apply environment-style overrides from `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = lookup("PORT") {
            self.port = port
                .parse()
                .with_context(|| format!("PORT={port:?} is not a port number"))?;
        }
        if let Some(root) = lookup("BANANAS_URL_ROOT") {
            self.url_root = root;
        }
        Ok(())
    }

    /// Reject settings that would only fail later, mid-startup.
    pub fn check(&self) -> Result<()> {
        parse_weekday(&self.publish_weekday).context("publish_weekday")?;
        Ok(())
    }
}
