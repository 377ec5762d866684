use chrono::{DateTime, Utc};

use crate::models::DownloadOutcome;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub written: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
}

impl SyncSummary {
    /// Order of `outcomes` does not matter. Written files without a
    /// timestamp count toward `written` but not toward the date range.
    pub fn from_outcomes(outcomes: &[DownloadOutcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            match outcome {
                DownloadOutcome::Written { timestamp, .. } => {
                    summary.written += 1;
                    if let Some(at) = *timestamp {
                        summary.earliest = Some(summary.earliest.map_or(at, |cur| cur.min(at)));
                        summary.latest = Some(summary.latest.map_or(at, |cur| cur.max(at)));
                    }
                }
                DownloadOutcome::Skipped { .. } => summary.duplicates += 1,
                DownloadOutcome::Failed { .. } => summary.failed += 1,
            }
        }
        summary
    }

    pub fn message(&self) -> String {
        if self.written == 0 {
            return "No new photos to download".to_string();
        }
        match (self.earliest, self.latest) {
            (Some(earliest), Some(latest)) => format!(
                "Downloaded {} photos ({} to {})",
                self.written,
                earliest.format("%d-%m-%y"),
                latest.format("%d-%m-%y")
            ),
            _ => format!("Downloaded {} photos", self.written),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SkipReason;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn written(id: &str, timestamp: Option<DateTime<Utc>>) -> DownloadOutcome {
        DownloadOutcome::Written {
            file_id: id.to_string(),
            path: PathBuf::from(format!("/photos/{id}.jpg")),
            timestamp,
        }
    }

    #[test]
    fn range_ignores_input_order_and_undated_files() {
        let march = Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 0).unwrap();
        let january = Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap();
        let outcomes = vec![
            written("F1", Some(march)),
            written("F2", None),
            DownloadOutcome::Skipped {
                file_id: "F3".to_string(),
                reason: SkipReason::Duplicate { existing: None },
            },
            written("F4", Some(january)),
            DownloadOutcome::Failed {
                file_id: "F5".to_string(),
                reason: "HTTP 404".to_string(),
            },
        ];

        let summary = SyncSummary::from_outcomes(&outcomes);
        assert_eq!(summary.written, 3);
        assert_eq!(summary.duplicates, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.earliest, Some(january));
        assert_eq!(summary.latest, Some(march));
        assert_eq!(summary.message(), "Downloaded 3 photos (15-01-24 to 02-03-24)");
    }

    #[test]
    fn nothing_new_message() {
        let summary = SyncSummary::from_outcomes(&[]);
        assert_eq!(summary.message(), "No new photos to download");
    }

    #[test]
    fn undated_only_has_no_range() {
        let summary = SyncSummary::from_outcomes(&[written("F1", None)]);
        assert_eq!(summary.message(), "Downloaded 1 photos");
    }
}
