use std::fs;
use std::path::Path;

use color_eyre::{Result, eyre::Context};
use log::{error, info, warn};
use serde::{Deserialize, Deserializer, Serialize};

/// An app to watch, checked once per listed country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedApp {
    pub id: String,
    pub name: String,
    pub countries: Vec<String>,
}

/// App ids show up both as JSON strings and as bare numbers.
fn scalar_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct ListedApp {
    #[serde(deserialize_with = "scalar_id")]
    id: String,
    name: String,
    #[serde(default)]
    countries: Vec<String>,
    #[serde(default)]
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LegacyApp {
    #[serde(deserialize_with = "scalar_id")]
    id: String,
    name: String,
    #[serde(default)]
    country: Option<String>,
}

/// The two shapes `app_info.json` has had over time.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AppInfoFile {
    Tracked(Vec<ListedApp>),
    Legacy {
        #[serde(default)]
        default_country: Option<String>,
        apps: Vec<LegacyApp>,
    },
}

fn normalize_country(code: &str) -> String {
    code.trim().to_lowercase()
}

fn normalize(file: AppInfoFile, default_country: &str) -> Vec<TrackedApp> {
    match file {
        AppInfoFile::Tracked(apps) => apps
            .into_iter()
            .map(|app| {
                let mut countries: Vec<String> = app
                    .countries
                    .iter()
                    .map(|c| normalize_country(c))
                    .filter(|c| !c.is_empty())
                    .collect();
                match app.country.as_deref().map(normalize_country) {
                    Some(single) if countries.is_empty() && !single.is_empty() => {
                        countries.push(single)
                    }
                    Some(single) if !single.is_empty() && !countries.contains(&single) => warn!(
                        "App {} lists both `countries` and `country`; ignoring `country: {single}`",
                        app.id
                    ),
                    _ => {}
                }
                if countries.is_empty() {
                    countries.push(normalize_country(default_country));
                }
                TrackedApp {
                    id: app.id,
                    name: app.name,
                    countries,
                }
            })
            .collect(),
        AppInfoFile::Legacy {
            default_country: file_default,
            apps,
        } => {
            let fallback = normalize_country(file_default.as_deref().unwrap_or(default_country));
            apps.into_iter()
                .map(|app| TrackedApp {
                    id: app.id,
                    name: app.name,
                    countries: vec![
                        app.country
                            .as_deref()
                            .map(normalize_country)
                            .filter(|c| !c.is_empty())
                            .unwrap_or_else(|| fallback.clone()),
                    ],
                })
                .collect()
        }
    }
}

fn parse_tracked_apps(raw: &str, default_country: &str) -> Result<Vec<TrackedApp>> {
    let file: AppInfoFile = serde_json::from_str(raw).wrap_err("unrecognized app list format")?;
    Ok(normalize(file, default_country))
}

fn read_tracked_apps(path: &Path, default_country: &str) -> Result<Vec<TrackedApp>> {
    let raw = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    parse_tracked_apps(&raw, default_country)
}

/// Loads the tracked apps, returning an empty list (and logging why) when the
/// file cannot be used.
pub fn load_tracked_apps(path: &Path, default_country: &str) -> Vec<TrackedApp> {
    match read_tracked_apps(path, default_country) {
        Ok(apps) => {
            info!("Loaded {} tracked apps from {}", apps.len(), path.display());
            apps
        }
        Err(e) => {
            error!("Failed to load app list: {e:#}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multi_country_array() {
        let apps = parse_tracked_apps(
            r#"[{"id": "123", "name": "Foo", "countries": ["CN", "us"]}]"#,
            "cn",
        )
        .unwrap();
        assert_eq!(
            apps,
            vec![TrackedApp {
                id: "123".into(),
                name: "Foo".into(),
                countries: vec!["cn".into(), "us".into()],
            }]
        );
    }

    #[test]
    fn legacy_object_falls_back_to_file_default_country() {
        let apps = parse_tracked_apps(
            r#"{"default_country": "jp", "apps": [
                {"id": "1", "name": "One"},
                {"id": "2", "name": "Two", "country": "US"}
            ]}"#,
            "cn",
        )
        .unwrap();
        assert_eq!(apps[0].countries, vec!["jp".to_string()]);
        assert_eq!(apps[1].countries, vec!["us".to_string()]);
    }

    #[test]
    fn legacy_object_without_default_uses_configured_country() {
        let apps = parse_tracked_apps(r#"{"apps": [{"id": "1", "name": "One"}]}"#, "cn").unwrap();
        assert_eq!(apps[0].countries, vec!["cn".to_string()]);
    }

    #[test]
    fn numeric_ids_are_accepted() {
        let apps = parse_tracked_apps(r#"[{"id": 123, "name": "A"}]"#, "cn").unwrap();
        assert_eq!(apps[0].id, "123");

        let apps = parse_tracked_apps(r#"{"apps": [{"id": 456, "name": "B"}]}"#, "cn").unwrap();
        assert_eq!(apps[0].id, "456");
    }

    #[test]
    fn single_country_on_array_entry_is_used() {
        let apps = parse_tracked_apps(r#"[{"id": "1", "name": "A", "country": "US"}]"#, "cn")
            .unwrap();
        assert_eq!(apps[0].countries, vec!["us".to_string()]);

        let apps = parse_tracked_apps(
            r#"[{"id": "1", "name": "A", "countries": ["jp"], "country": "us"}]"#,
            "cn",
        )
        .unwrap();
        assert_eq!(apps[0].countries, vec!["jp".to_string()]);
    }

    #[test]
    fn missing_countries_defaults() {
        let apps = parse_tracked_apps(r#"[{"id": "9", "name": "Nine"}]"#, "hk").unwrap();
        assert_eq!(apps[0].countries, vec!["hk".to_string()]);
    }

    #[test]
    fn normalization_is_idempotent() {
        let first = parse_tracked_apps(
            r#"{"default_country": "cn", "apps": [
                {"id": "1", "name": "One"},
                {"id": "2", "name": "Two", "country": "US"}
            ]}"#,
            "cn",
        )
        .unwrap();
        let again = parse_tracked_apps(&serde_json::to_string(&first).unwrap(), "cn").unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn unreadable_file_yields_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_tracked_apps(&dir.path().join("missing.json"), "cn").is_empty());

        let garbage = dir.path().join("garbage.json");
        fs::write(&garbage, "{ not json").unwrap();
        assert!(load_tracked_apps(&garbage, "cn").is_empty());
    }
}
