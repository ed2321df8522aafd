//! Data freshness tracker: decides when the cached data needs a refresh

use crate::data::prices::ensure_parent_dir;
use crate::error::Result;
use chrono::{Datelike, Duration, Local, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Days after which data is always refreshed
pub const REFRESH_INTERVAL_DAYS: i64 = 7;

const SECONDS_PER_DAY: i64 = 86_400;

/// The single persisted tracker record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataUpdateTracker {
    pub last_update: NaiveDateTime,
    pub update_success: bool,
    pub next_scheduled_update: NaiveDateTime,
}

/// Freshness of the cached data relative to now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessState {
    NeverUpdated,
    Fresh,
    Stale,
}

impl FreshnessState {
    pub fn needs_update(self) -> bool {
        !matches!(self, Self::Fresh)
    }
}

/// Whole days between two timestamps, rounded towards negative infinity
pub fn whole_days(from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    (to - from).num_seconds().div_euclid(SECONDS_PER_DAY)
}

fn iso(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Classify a tracker record at `now`
///
/// Stale once [`REFRESH_INTERVAL_DAYS`] have passed, on a Monday once at
/// least a day has passed, or when the last recorded update failed.
pub fn freshness(tracker: Option<&DataUpdateTracker>, now: NaiveDateTime) -> FreshnessState {
    let Some(tracker) = tracker else {
        return FreshnessState::NeverUpdated;
    };

    let days = whole_days(tracker.last_update, now);
    let monday_catch_up = now.weekday() == Weekday::Mon && days >= 1;

    if !tracker.update_success || days >= REFRESH_INTERVAL_DAYS || monday_catch_up {
        FreshnessState::Stale
    } else {
        FreshnessState::Fresh
    }
}

/// Read-side summary of the tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStatus {
    /// ISO timestamp, or "Never"
    pub last_update: String,
    /// ISO timestamp, or "Unknown"
    pub next_scheduled_update: String,
    /// `None` when the data was never updated
    pub days_since_update: Option<i64>,
    pub days_until_next_update: i64,
    pub update_success: bool,
    pub state: FreshnessState,
}

/// Persists the tracker record as JSON
#[derive(Debug, Clone)]
pub struct TrackerStore {
    path: PathBuf,
}

impl TrackerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the tracker. A missing file is `None`; an unreadable one is
    /// logged and also treated as `None`.
    pub fn load(&self) -> Option<DataUpdateTracker> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Could not read tracker {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&text) {
            Ok(tracker) => Some(tracker),
            Err(e) => {
                warn!(
                    "Tracker {} is corrupt ({}), treating data as never updated",
                    self.path.display(),
                    e
                );
                None
            }
        }
    }

    pub fn state_at(&self, now: NaiveDateTime) -> FreshnessState {
        freshness(self.load().as_ref(), now)
    }

    /// Whether a refresh is due at `now`
    pub fn should_update_at(&self, now: NaiveDateTime) -> bool {
        let state = self.state_at(now);
        info!("Data freshness: {:?}", state);
        state.needs_update()
    }

    /// Whether a refresh is due now (local time)
    pub fn should_update(&self) -> bool {
        self.should_update_at(Local::now().naive_local())
    }

    /// Overwrite the tracker with a new record stamped `now`
    pub fn record(&self, success: bool, now: NaiveDateTime) -> Result<DataUpdateTracker> {
        let tracker = DataUpdateTracker {
            last_update: now,
            update_success: success,
            next_scheduled_update: now + Duration::days(REFRESH_INTERVAL_DAYS),
        };

        ensure_parent_dir(&self.path)?;
        std::fs::write(&self.path, serde_json::to_string_pretty(&tracker)?)?;
        info!("Data update tracker updated: {}", tracker.last_update);
        Ok(tracker)
    }

    pub fn status_at(&self, now: NaiveDateTime) -> UpdateStatus {
        let tracker = self.load();
        let state = freshness(tracker.as_ref(), now);

        match tracker {
            Some(t) => UpdateStatus {
                last_update: iso(t.last_update),
                next_scheduled_update: iso(t.next_scheduled_update),
                days_since_update: Some(whole_days(t.last_update, now)),
                days_until_next_update: whole_days(now, t.next_scheduled_update),
                update_success: t.update_success,
                state,
            },
            None => UpdateStatus {
                last_update: "Never".to_string(),
                next_scheduled_update: "Unknown".to_string(),
                days_since_update: None,
                days_until_next_update: 0,
                update_success: false,
                state,
            },
        }
    }

    pub fn status(&self) -> UpdateStatus {
        self.status_at(Local::now().naive_local())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    /// 2024-06-12 is a Wednesday, 2024-06-17 a Monday
    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn tracker(last_update: NaiveDateTime, success: bool) -> DataUpdateTracker {
        DataUpdateTracker {
            last_update,
            update_success: success,
            next_scheduled_update: last_update + Duration::days(7),
        }
    }

    #[test]
    fn test_never_updated_needs_update() {
        assert_eq!(freshness(None, at(12, 9)), FreshnessState::NeverUpdated);
        assert!(FreshnessState::NeverUpdated.needs_update());
    }

    #[test]
    fn test_eight_days_old_is_stale() {
        let now = at(20, 9);
        let t = tracker(now - Duration::days(8), true);
        assert_eq!(freshness(Some(&t), now), FreshnessState::Stale);
    }

    #[test]
    fn test_one_day_old_midweek_is_fresh() {
        let now = at(13, 9); // Thursday
        let t = tracker(now - Duration::days(1), true);
        assert_eq!(freshness(Some(&t), now), FreshnessState::Fresh);
    }

    #[test]
    fn test_monday_after_a_day_is_stale() {
        let now = at(17, 9); // Monday
        let t = tracker(now - Duration::days(1), true);
        assert_eq!(freshness(Some(&t), now), FreshnessState::Stale);

        let same_day = tracker(now - Duration::hours(3), true);
        assert_eq!(freshness(Some(&same_day), now), FreshnessState::Fresh);
    }

    #[test]
    fn test_failed_update_is_stale() {
        let now = at(13, 9);
        let t = tracker(now - Duration::hours(1), false);
        assert_eq!(freshness(Some(&t), now), FreshnessState::Stale);
    }

    #[test]
    fn test_whole_days_floors() {
        assert_eq!(whole_days(at(12, 9), at(13, 8)), 0);
        assert_eq!(whole_days(at(12, 9), at(19, 9)), 7);
        assert_eq!(whole_days(at(13, 9), at(12, 21)), -1);
    }

    #[test]
    fn test_store_record_and_reload() {
        let dir = TempDir::new().unwrap();
        let store = TrackerStore::new(dir.path().join("data/tracker.json"));
        assert!(store.should_update_at(at(12, 9)));

        let written = store.record(true, at(12, 9)).unwrap();
        assert_eq!(written.next_scheduled_update, at(19, 9));
        assert_eq!(store.load(), Some(written));
        assert!(!store.should_update_at(at(13, 9)));
        assert!(store.should_update_at(at(20, 9)));

        // Overwritten, not appended
        store.record(false, at(14, 9)).unwrap();
        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.last_update, at(14, 9));
        assert!(!reloaded.update_success);
    }

    #[test]
    fn test_corrupt_tracker_is_never_updated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tracker.json");
        std::fs::write(&path, "{ broken").unwrap();
        let store = TrackerStore::new(&path);

        assert_eq!(store.state_at(at(12, 9)), FreshnessState::NeverUpdated);
    }

    #[test]
    fn test_status_reports() {
        let dir = TempDir::new().unwrap();
        let store = TrackerStore::new(dir.path().join("tracker.json"));

        let never = store.status_at(at(12, 9));
        assert_eq!(never.last_update, "Never");
        assert_eq!(never.next_scheduled_update, "Unknown");
        assert_eq!(never.days_since_update, None);
        assert!(!never.update_success);

        store.record(true, at(12, 9)).unwrap();
        let status = store.status_at(at(14, 10));
        assert_eq!(status.last_update, "2024-06-12T09:00:00");
        assert_eq!(status.days_since_update, Some(2));
        assert_eq!(status.days_until_next_update, 4);
        assert!(status.update_success);
        assert_eq!(status.state, FreshnessState::Fresh);
    }
}
