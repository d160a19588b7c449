//! Markdown report and one-line digest pushed after every run.

use chrono::NaiveDateTime;
use strum::VariantArray;

use crate::diff::StatusDiff;
use crate::fetcher::{AppObservation, AppStatus};

const SEPARATOR: &str = "---";
const SEPARATOR_EVERY: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub title: String,
    pub content: String,
    pub digest: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct RegionCounts {
    online: usize,
    offline: usize,
    error: usize,
}

impl RegionCounts {
    fn record(&mut self, status: AppStatus) {
        match status {
            AppStatus::Online => self.online += 1,
            AppStatus::Offline => self.offline += 1,
            AppStatus::Error => self.error += 1,
            AppStatus::Unknown => {}
        }
    }
}

/// Groups by country, keeping countries in first-seen order.
fn group_by_country<'a>(
    observations: impl IntoIterator<Item = &'a AppObservation>,
) -> Vec<(&'a str, Vec<&'a AppObservation>)> {
    let mut groups: Vec<(&str, Vec<&AppObservation>)> = Vec::new();
    for obs in observations {
        match groups.iter_mut().find(|(country, _)| *country == obs.country) {
            Some((_, members)) => members.push(obs),
            None => groups.push((obs.country.as_str(), vec![obs])),
        }
    }
    groups
}

fn region_counts(observations: &[AppObservation]) -> Vec<(&str, RegionCounts)> {
    group_by_country(observations)
        .into_iter()
        .map(|(country, members)| {
            let mut counts = RegionCounts::default();
            for obs in members {
                counts.record(obs.status);
            }
            (country, counts)
        })
        .collect()
}

fn format_line(obs: &AppObservation) -> String {
    let mut line = format!(
        "- {} **{}** (ID: {}) [{}]",
        obs.status.glyph(),
        obs.name,
        obs.app_id,
        obs.country.to_uppercase()
    );

    let details = match (&obs.status, &obs.details) {
        (AppStatus::Online, Some(details)) => details,
        _ => return line,
    };
    line.push_str(&format!("\n  - Developer: {}", details.developer));
    line.push_str(&format!("\n  - Version: {}", details.version));
    line.push_str(&format!("\n  - Price: {}", details.price));
    line.push_str(&format!("\n  - Genre: {}", details.genre));
    if let Some(rating) = details.rating {
        line.push_str(&format!(
            "\n  - Rating: {rating:.1} ({} ratings)",
            details.rating_count
        ));
    }
    if !details.url.is_empty() {
        line.push_str(&format!("\n  - [App Store]({})", details.url));
    }
    if !details.icon.is_empty() {
        line.push_str(&format!("\n  - ![icon]({})", details.icon));
    }
    line
}

fn render_country_group(country: &str, members: &[&AppObservation]) -> String {
    let mut entries = Vec::with_capacity(members.len() + members.len() / SEPARATOR_EVERY);
    for (i, obs) in members.iter().enumerate() {
        if i > 0 && i % SEPARATOR_EVERY == 0 {
            entries.push(SEPARATOR.to_string());
        }
        entries.push(format_line(obs));
    }
    format!("### {}\n\n{}", country.to_uppercase(), entries.join("\n\n"))
}

fn bucket_heading(status: AppStatus) -> (&'static str, Option<&'static str>) {
    match status {
        AppStatus::Online => ("## 📱 Online apps", Some("- No apps online")),
        AppStatus::Offline => ("## 🚫 Offline apps", Some("- No apps offline")),
        AppStatus::Error => ("## ❌ Lookup errors", None),
        AppStatus::Unknown => ("## ❔ Not checked", None),
    }
}

/// Renders one status bucket, or nothing for an empty bucket without a
/// placeholder line.
fn render_bucket(status: AppStatus, observations: &[AppObservation]) -> Option<String> {
    let (heading, placeholder) = bucket_heading(status);
    let groups = group_by_country(observations.iter().filter(|o| o.status == status));
    if groups.is_empty() {
        return placeholder.map(|line| format!("{heading}\n\n{line}"));
    }

    let body = groups
        .iter()
        .map(|(country, members)| render_country_group(country, members))
        .collect::<Vec<_>>()
        .join("\n\n");
    Some(format!("{heading}\n\n{body}"))
}

fn render_summary(counts: &[(&str, RegionCounts)]) -> String {
    let lines = counts
        .iter()
        .map(|(country, c)| {
            format!(
                "- **{}**: {} {} online · {} {} offline · {} {} error",
                country.to_uppercase(),
                AppStatus::Online.glyph(),
                c.online,
                AppStatus::Offline.glyph(),
                c.offline,
                AppStatus::Error.glyph(),
                c.error
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("## 🌍 Regions\n\n{lines}")
}

fn render_newly_offline(diff: &StatusDiff) -> Option<String> {
    if diff.is_empty() {
        return None;
    }
    let lines = diff
        .newly_offline
        .iter()
        .map(format_line)
        .collect::<Vec<_>>()
        .join("\n");
    Some(format!("## 🚨 Newly offline\n\n{lines}"))
}

/// e.g. `Online CN 3, US 2 | Offline 1` (zero offline/error segments omitted).
pub fn render_digest(observations: &[AppObservation]) -> String {
    let counts = region_counts(observations);
    let online = counts
        .iter()
        .map(|(country, c)| format!("{} {}", country.to_uppercase(), c.online))
        .collect::<Vec<_>>()
        .join(", ");

    let mut digest = format!("Online {online}");
    let offline: usize = counts.iter().map(|(_, c)| c.offline).sum();
    let error: usize = counts.iter().map(|(_, c)| c.error).sum();
    if offline > 0 {
        digest.push_str(&format!(" | Offline {offline}"));
    }
    if error > 0 {
        digest.push_str(&format!(" | Error {error}"));
    }
    digest
}

pub fn render(
    observations: &[AppObservation],
    diff: &StatusDiff,
    now_local: NaiveDateTime,
) -> Report {
    let base_title = format!(
        "AppStore Monitor Report - {}",
        now_local.format("%Y-%m-%d %H:%M")
    );
    let title = if diff.is_empty() {
        base_title
    } else {
        format!("🚨 {} newly offline | {base_title}", diff.newly_offline.len())
    };

    let mut sections = vec![render_summary(&region_counts(observations))];
    sections.extend(render_newly_offline(diff));
    sections.extend(
        AppStatus::VARIANTS
            .iter()
            .filter(|&&status| status != AppStatus::Unknown)
            .filter_map(|&status| render_bucket(status, observations)),
    );

    Report {
        title,
        content: sections.join("\n\n"),
        digest: render_digest(observations),
    }
}
