use crate::fetcher::{AppObservation, AppStatus};
use crate::storage::StatusStore;

#[derive(Debug, Default)]
pub struct StatusDiff {
    pub newly_offline: Vec<AppObservation>,
}

impl StatusDiff {
    pub const fn is_empty(&self) -> bool {
        self.newly_offline.is_empty()
    }
}

/// Only `online -> offline` is an alert. Unknown baselines and failed lookups
/// never count as the "before" side.
pub fn is_newly_offline(previous: Option<AppStatus>, current: AppStatus) -> bool {
    matches!(
        (previous, current),
        (Some(AppStatus::Online), AppStatus::Offline)
    )
}

pub fn compute_diff(previous: &StatusStore, current: &[AppObservation]) -> StatusDiff {
    StatusDiff {
        newly_offline: current
            .iter()
            .filter(|obs| {
                is_newly_offline(previous.get(&obs.key()).map(|p| p.status), obs.status)
            })
            .cloned()
            .collect(),
    }
}
