use std::path::PathBuf;

use color_eyre::{Result, eyre::Context};
use serde::Deserialize;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fangtang_key: Option<String>,
    #[serde(default = "default_app_info_file")]
    pub app_info_file: PathBuf,
    #[serde(default = "default_status_file")]
    pub status_file: PathBuf,
    #[serde(default = "default_country")]
    pub default_country: String,
    #[serde(default = "default_lookup_url")]
    pub lookup_url: Url,
    #[serde(default = "default_push_base_url")]
    pub push_base_url: Url,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_app_info_file() -> PathBuf {
    "app_info.json".into()
}

fn default_status_file() -> PathBuf {
    "app_status.json".into()
}

fn default_country() -> String {
    "cn".into()
}

fn default_lookup_url() -> Url {
    Url::parse("https://itunes.apple.com/lookup").expect("static lookup url is valid")
}

fn default_push_base_url() -> Url {
    Url::parse("https://sctapi.ftqq.com/").expect("static push url is valid")
}

const fn default_request_timeout_secs() -> u64 {
    10
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = envy::from_env::<Self>().wrap_err("failed to load config")?;
        config.default_country = config.default_country.trim().to_lowercase();
        config.fangtang_key = config.fangtang_key.filter(|key| !key.trim().is_empty());
        Ok(config)
    }

    /// Push endpoint for the configured token, or `None` when no token is set.
    pub fn push_endpoint(&self) -> Result<Option<Url>> {
        let Some(key) = self.fangtang_key.as_deref() else {
            return Ok(None);
        };
        // `join` replaces the last segment unless the base ends in a slash.
        let mut base = self.push_base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(&format!("{}.send", key.trim()))
            .map(Some)
            .wrap_err("failed to build push endpoint")
    }
}

#[cfg(test)]
impl Default for Config {
    fn default() -> Self {
        Self {
            fangtang_key: None,
            app_info_file: default_app_info_file(),
            status_file: default_status_file(),
            default_country: default_country(),
            lookup_url: default_lookup_url(),
            push_base_url: default_push_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}
