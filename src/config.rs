use std::path::PathBuf;

pub const DEFAULT_MAX_WORKERS: usize = 10;
pub const MAX_WORKERS: usize = 64;
pub const DEFAULT_LIST_COUNT: usize = 1000;
pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";

/// One channel whose files are mirrored into one local folder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncTarget {
    pub label: &'static str,
    pub channel_id: Option<String>,
    pub download_folder: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub slack_token: String,
    pub api_base: String,
    pub pineapple_channel_id: Option<String>,
    pub field_trip_channel_id: Option<String>,
    pub automations_channel_id: Option<String>,
    pub pineapple_download_folder: Option<PathBuf>,
    pub field_trip_download_folder: Option<PathBuf>,
    pub max_workers: usize,
    pub list_count: usize,
    pub request_timeout_seconds: u64,
    pub connect_timeout_seconds: u64,
    pub log_dir: Option<PathBuf>,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup. Nothing is validated
    /// here; a missing credential or channel shows up as a failed API call.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let number = |key: &str| string(key).and_then(|value| value.parse::<u64>().ok());

        Self {
            slack_token: string("SLACK_TOKEN").unwrap_or_default(),
            api_base: string("SLACK_API_BASE")
                .unwrap_or_else(|| DEFAULT_SLACK_API_BASE.to_string()),
            pineapple_channel_id: string("PINEAPPLE_CHANNEL_ID"),
            field_trip_channel_id: string("FIELD_TRIP_CHANNEL_ID"),
            automations_channel_id: string("AUTOMATIONS_CHANNEL_ID"),
            pineapple_download_folder: string("PINEAPPLE_DOWNLOAD_FOLDER").map(PathBuf::from),
            field_trip_download_folder: string("FIELD_TRIP_DOWNLOAD_FOLDER").map(PathBuf::from),
            max_workers: number("SYNC_MAX_WORKERS")
                .map(|value| (value as usize).clamp(1, MAX_WORKERS))
                .unwrap_or(DEFAULT_MAX_WORKERS),
            list_count: number("SYNC_LIST_COUNT")
                .map(|value| (value as usize).clamp(1, DEFAULT_LIST_COUNT))
                .unwrap_or(DEFAULT_LIST_COUNT),
            request_timeout_seconds: number("SYNC_HTTP_TIMEOUT_SECONDS")
                .unwrap_or(120)
                .clamp(10, 3600),
            connect_timeout_seconds: number("SYNC_HTTP_CONNECT_TIMEOUT_SECONDS")
                .unwrap_or(10)
                .clamp(2, 120),
            log_dir: string("SYNC_LOG_DIR").map(PathBuf::from),
        }
    }

    /// The pineapple pair is always attempted. The field-trip pair is only
    /// synced when both of its values are present.
    pub fn targets(&self) -> Vec<SyncTarget> {
        let mut targets = vec![SyncTarget {
            label: "pineapple",
            channel_id: self.pineapple_channel_id.clone(),
            download_folder: self.pineapple_download_folder.clone(),
        }];
        if self.field_trip_channel_id.is_some() && self.field_trip_download_folder.is_some() {
            targets.push(SyncTarget {
                label: "field_trip",
                channel_id: self.field_trip_channel_id.clone(),
                download_folder: self.field_trip_download_folder.clone(),
            });
        }
        targets
    }
}
