use chrono::Utc;
use clap::Parser;
use color_eyre::Result;
use log::{error, info, warn};
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

mod apps;
mod config;
mod diff;
mod fetcher;
mod notify;
mod report;
mod schedule;
mod storage;
#[cfg(test)]
mod test_support;

use crate::config::Config;
use crate::fetcher::{AppStatus, Fetcher};

#[derive(Parser)]
#[command(about = "Checks whether tracked App Store apps are still listed", version)]
struct Cli {
    /// Run even outside the 08:00-22:00 (UTC+8) window
    #[arg(long)]
    force: bool,
}

fn monitor(config: &Config, force: bool) -> Result<()> {
    let now = Utc::now();
    if !schedule::should_run(now, force) {
        info!("Outside the 08:00-22:00 (UTC+8) reporting window, skipping");
        return Ok(());
    }

    let apps = apps::load_tracked_apps(&config.app_info_file, &config.default_country);
    if apps.is_empty() {
        error!("No apps to check, see {}", config.app_info_file.display());
        return Ok(());
    }

    let previous = storage::load(&config.status_file, &apps, &config.default_country);

    let client = match fetcher::build_client(config) {
        Ok(client) => client,
        Err(e) => {
            error!("{e:#}");
            return Ok(());
        }
    };
    let fetcher = Fetcher::new(&client, &config.lookup_url);
    let checked_at = schedule::local_time(now)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();

    info!("Checking {} apps", apps.len());
    let mut observations = Vec::new();
    for app in &apps {
        for country in &app.countries {
            let obs = fetcher.check(app, country, &checked_at);
            let region = country.to_uppercase();
            match obs.status {
                AppStatus::Online => info!("✅ [{}] [{region}] {}", obs.app_id, obs.name),
                AppStatus::Offline => {
                    warn!("🚨 [{}] [{region}] {} is offline", obs.app_id, obs.name)
                }
                // the fetcher already logged the failure with its cause
                AppStatus::Error | AppStatus::Unknown => {}
            }
            observations.push(obs);
        }
    }

    let diff = diff::compute_diff(&previous, &observations);
    for obs in &diff.newly_offline {
        warn!("{} ({}) went offline in {}", obs.name, obs.app_id, obs.country.to_uppercase());
    }

    let current: storage::StatusStore = observations
        .iter()
        .map(|obs| (obs.key(), obs.clone()))
        .collect();
    storage::save(&config.status_file, &current);

    let report = report::render(&observations, &diff, schedule::local_time(now));
    match config.push_endpoint() {
        Ok(Some(endpoint)) => {
            if let Err(e) = notify::send_report(&client, &endpoint, &report) {
                error!("Push failed: {e:#}");
            }
        }
        Ok(None) => warn!("FANGTANG_KEY not set, skipping push"),
        Err(e) => error!("Push failed: {e:#}"),
    }

    info!("Run complete: {}", report.digest);
    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    monitor(&config, cli.force)
}
