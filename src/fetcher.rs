use std::time::Duration;

use crate::apps::TrackedApp;
use crate::config::Config;
use color_eyre::{Result, eyre::Context};
use log::{debug, error};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, VariantArray};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, VariantArray)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AppStatus {
    Unknown,
    Online,
    Offline,
    Error,
}

impl AppStatus {
    pub const fn glyph(self) -> &'static str {
        match self {
            Self::Unknown => "❔",
            Self::Online => "✅",
            Self::Offline => "🚫",
            Self::Error => "❌",
        }
    }
}

/// Listing metadata, only present while an app is online.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppDetails {
    pub developer: String,
    pub version: String,
    pub price: String,
    pub genre: String,
    pub rating: Option<f64>,
    pub rating_count: u64,
    pub url: String,
    pub icon: String,
}

/// Result of checking one `(app, country)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppObservation {
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub country: String,
    pub status: AppStatus,
    pub name: String,
    pub last_check: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<AppDetails>,
}

impl AppObservation {
    pub fn key(&self) -> String {
        compound_key(&self.app_id, &self.country)
    }
}

pub fn compound_key(app_id: &str, country: &str) -> String {
    format!("{app_id}_{country}")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    #[serde(default)]
    result_count: u64,
    #[serde(default)]
    results: Vec<LookupResult>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResult {
    track_name: Option<String>,
    version: Option<String>,
    formatted_price: Option<String>,
    seller_name: Option<String>,
    primary_genre_name: Option<String>,
    average_user_rating: Option<f64>,
    user_rating_count: Option<u64>,
    track_view_url: Option<String>,
    artwork_url100: Option<String>,
}

fn classify(
    app: &TrackedApp,
    country: &str,
    response: LookupResponse,
    checked_at: &str,
) -> AppObservation {
    let mut observation = AppObservation {
        app_id: app.id.clone(),
        country: country.to_string(),
        status: AppStatus::Offline,
        name: app.name.clone(),
        last_check: checked_at.to_string(),
        details: None,
    };

    debug!(
        "Lookup for {} ({country}) returned {} results",
        app.id, response.result_count
    );
    let Some(result) = response.results.into_iter().next() else {
        return observation;
    };

    observation.status = AppStatus::Online;
    if let Some(name) = result.track_name {
        observation.name = name;
    }
    observation.details = Some(AppDetails {
        developer: result.seller_name.unwrap_or_else(|| "unknown developer".into()),
        version: result.version.unwrap_or_else(|| "unknown version".into()),
        price: result.formatted_price.unwrap_or_else(|| "unknown price".into()),
        genre: result.primary_genre_name.unwrap_or_else(|| "unknown genre".into()),
        rating: result.average_user_rating,
        rating_count: result.user_rating_count.unwrap_or(0),
        url: result.track_view_url.unwrap_or_default(),
        icon: result
            .artwork_url100
            .map(|icon| icon.replace("100x100bb", "512x512bb"))
            .unwrap_or_default(),
    });
    observation
}

fn errored(app: &TrackedApp, country: &str, checked_at: &str) -> AppObservation {
    AppObservation {
        app_id: app.id.clone(),
        country: country.to_string(),
        status: AppStatus::Error,
        name: app.name.clone(),
        last_check: checked_at.to_string(),
        details: None,
    }
}

pub fn build_client(config: &Config) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .wrap_err("failed to build http client")
}

pub struct Fetcher<'a> {
    client: &'a Client,
    lookup_url: &'a Url,
}

impl<'a> Fetcher<'a> {
    pub const fn new(client: &'a Client, lookup_url: &'a Url) -> Self {
        Self { client, lookup_url }
    }

    fn lookup(&self, app_id: &str, country: &str) -> Result<LookupResponse> {
        debug!("Looking up {app_id} in {country}");
        self.client
            .get(self.lookup_url.clone())
            .query(&[("id", app_id), ("country", country)])
            .send()?
            .error_for_status()?
            .json()
            .map_err(Into::into)
    }

    /// Checks one pair; lookup failures become an `error` observation.
    pub fn check(&self, app: &TrackedApp, country: &str, checked_at: &str) -> AppObservation {
        match self.lookup(&app.id, country) {
            Ok(response) => classify(app, country, response, checked_at),
            Err(e) => {
                error!("❌ [{}] [{}] lookup failed: {e:#}", app.id, country.to_uppercase());
                errored(app, country, checked_at)
            }
        }
    }
}
