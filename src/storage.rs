use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::apps::TrackedApp;
use crate::fetcher::{AppObservation, AppStatus, compound_key};

use color_eyre::{Result, eyre::Context};
use log::{error, info};

/// Last known observation per compound key (`{app_id}_{country}`).
pub type StatusStore = BTreeMap<String, AppObservation>;

const NOT_CHECKED: &str = "not checked";

/// A baseline with every tracked pair marked `unknown`.
pub fn initial_store(apps: &[TrackedApp]) -> StatusStore {
    apps.iter()
        .flat_map(|app| {
            app.countries.iter().map(|country| {
                (
                    compound_key(&app.id, country),
                    AppObservation {
                        app_id: app.id.clone(),
                        country: country.clone(),
                        status: AppStatus::Unknown,
                        name: app.name.clone(),
                        last_check: NOT_CHECKED.into(),
                        details: None,
                    },
                )
            })
        })
        .collect()
}

/// Stores written before multi-country support were keyed by bare app id.
pub fn is_legacy(store: &StatusStore) -> bool {
    !store.is_empty() && !store.keys().any(|key| key.contains('_'))
}

/// Expands a legacy store into compound keys, one entry per configured
/// country. Apps that are no longer configured land on `default_country`.
/// Already-migrated stores are returned unchanged.
pub fn migrate(old: StatusStore, apps: &[TrackedApp], default_country: &str) -> StatusStore {
    if !is_legacy(&old) {
        return old;
    }

    let mut migrated = StatusStore::new();
    for (app_id, record) in old {
        let countries = apps
            .iter()
            .find(|app| app.id == app_id)
            .map(|app| app.countries.clone())
            .unwrap_or_else(|| vec![default_country.to_string()]);

        for country in countries {
            migrated.insert(
                compound_key(&app_id, &country),
                AppObservation {
                    app_id: app_id.clone(),
                    country,
                    details: None,
                    ..record.clone()
                },
            );
        }
    }
    migrated
}

fn read_store(path: &Path) -> Result<StatusStore> {
    let raw = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).wrap_err_with(|| format!("failed to parse {}", path.display()))
}

fn write_store(path: &Path, store: &StatusStore) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(store)?)
        .wrap_err_with(|| format!("failed to write {}", path.display()))
}

fn load_or_init(path: &Path, apps: &[TrackedApp], default_country: &str) -> Result<StatusStore> {
    if !path.exists() {
        let store = initial_store(apps);
        info!("No status file yet, starting {} entries as unknown", store.len());
        write_store(path, &store)?;
        return Ok(store);
    }

    let store = read_store(path)?;
    if is_legacy(&store) {
        let migrated = migrate(store, apps, default_country);
        info!("Migrated status file to per-country keys ({} entries)", migrated.len());
        write_store(path, &migrated)?;
        return Ok(migrated);
    }
    Ok(store)
}

/// Loads the previous run's statuses. Any failure is logged and yields an
/// empty store, so no transitions are reported this run.
pub fn load(path: &Path, apps: &[TrackedApp], default_country: &str) -> StatusStore {
    load_or_init(path, apps, default_country).unwrap_or_else(|e| {
        error!("Failed to load status file: {e:#}");
        StatusStore::new()
    })
}

/// Overwrites the status file with this run's observations.
pub fn save(path: &Path, store: &StatusStore) {
    match write_store(path, store) {
        Ok(()) => info!("Saved {} statuses to {}", store.len(), path.display()),
        Err(e) => error!("Failed to save status file: {e:#}"),
    }
}
