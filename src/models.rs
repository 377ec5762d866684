use std::path::PathBuf;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_FILE_NAME: &str = "unnamed_file";

fn default_file_name() -> String {
    DEFAULT_FILE_NAME.to_string()
}

/// Accepts strings and numbers; anything else becomes `None`. Blank strings
/// are treated as missing.
fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let text = match value {
        Some(serde_json::Value::String(text)) => Some(text),
        Some(serde_json::Value::Number(number)) => Some(number.to_string()),
        _ => None,
    };
    Ok(text.filter(|value| !value.trim().is_empty()))
}

fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

fn lenient_file_name<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_else(default_file_name))
}

/// Drops listing entries that are not file objects at all, so one bad entry
/// never hides the rest of the page.
fn lenient_files<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<RemoteFileDescriptor>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(values
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(descriptor) => Some(descriptor),
            Err(err) => {
                tracing::warn!("skipping malformed file entry: {}", err);
                None
            }
        })
        .collect())
}

/// Slack sends unix seconds as numbers on some endpoints and as strings on
/// others. Zero and blank values are treated as missing.
fn lenient_unix_seconds<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let seconds = match value {
        Some(serde_json::Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|value| value as i64)),
        Some(serde_json::Value::String(text)) => {
            let trimmed = text.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().map(|value| value as i64))
        }
        _ => None,
    };
    Ok(seconds.filter(|value| *value > 0))
}

/// Remote metadata for one downloadable file.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RemoteFileDescriptor {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default = "default_file_name", deserialize_with = "lenient_file_name")]
    pub name: String,
    #[serde(default)]
    pub url_private: Option<String>,
    #[serde(default, deserialize_with = "lenient_unix_seconds")]
    pub timestamp: Option<i64>,
    #[serde(default, deserialize_with = "lenient_unix_seconds")]
    pub created: Option<i64>,
}

impl RemoteFileDescriptor {
    /// Creation time, preferring `timestamp` over `created`.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .or(self.created)
            .and_then(|seconds| Utc.timestamp_opt(seconds, 0).single())
    }

    pub fn locator(&self) -> Option<&str> {
        self.url_private
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct FilesListResponse {
    pub ok: bool,
    #[serde(default, deserialize_with = "lenient_files")]
    pub files: Vec<RemoteFileDescriptor>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct PostMessageResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct PostMessagePayload<'a> {
    pub channel: &'a str,
    pub text: &'a str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    Duplicate { existing: Option<PathBuf> },
}

/// Terminal state of one descriptor's pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DownloadOutcome {
    Written {
        file_id: String,
        path: PathBuf,
        timestamp: Option<DateTime<Utc>>,
    },
    Skipped {
        file_id: String,
        reason: SkipReason,
    },
    Failed {
        file_id: String,
        reason: String,
    },
}

impl DownloadOutcome {
    pub fn file_id(&self) -> &str {
        match self {
            Self::Written { file_id, .. }
            | Self::Skipped { file_id, .. }
            | Self::Failed { file_id, .. } => file_id,
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            Self::Skipped {
                reason: SkipReason::Duplicate { .. },
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_prefers_timestamp_over_created() {
        let descriptor: RemoteFileDescriptor = serde_json::from_value(serde_json::json!({
            "id": "F1",
            "name": "beach.jpg",
            "url_private": "https://files.example/F1",
            "timestamp": 1_700_000_000,
            "created": 1_600_000_000
        }))
        .expect("parse descriptor");

        assert_eq!(descriptor.created_at().map(|at| at.timestamp()), Some(1_700_000_000));
        assert_eq!(descriptor.locator(), Some("https://files.example/F1"));
    }

    #[test]
    fn descriptor_falls_back_to_created_and_accepts_strings() {
        let descriptor: RemoteFileDescriptor = serde_json::from_value(serde_json::json!({
            "id": "F2",
            "timestamp": 0,
            "created": "1600000000"
        }))
        .expect("parse descriptor");

        assert_eq!(descriptor.name, DEFAULT_FILE_NAME);
        assert_eq!(descriptor.created_at().map(|at| at.timestamp()), Some(1_600_000_000));
        assert!(descriptor.locator().is_none());
    }

    #[test]
    fn descriptor_without_any_timestamp_has_no_date() {
        let descriptor: RemoteFileDescriptor = serde_json::from_value(serde_json::json!({
            "id": "F3",
            "name": "notes.txt",
            "url_private": "  ",
            "created": null
        }))
        .expect("parse descriptor");

        assert!(descriptor.created_at().is_none());
        assert!(descriptor.locator().is_none());
    }

    #[test]
    fn files_list_error_payload_parses() {
        let response: FilesListResponse =
            serde_json::from_str(r#"{"ok":false,"error":"invalid_auth"}"#).expect("parse");
        assert!(!response.ok);
        assert!(response.files.is_empty());
        assert_eq!(response.error.as_deref(), Some("invalid_auth"));
    }

    #[test]
    fn files_list_keeps_good_entries_next_to_malformed_ones() {
        let response: FilesListResponse = serde_json::from_str(
            r#"{
                "ok": true,
                "files": [
                    {"id": "F1", "name": "good.jpg", "url_private": "https://files.example/F1", "timestamp": 1700000000},
                    {"id": "F2", "name": null, "url_private": "https://files.example/F2"},
                    {"name": "no-id.jpg", "url_private": "https://files.example/F3"},
                    {"id": null, "name": "   ", "url_private": "https://files.example/F4"},
                    42
                ]
            }"#,
        )
        .expect("parse mixed listing");

        assert!(response.ok);
        let names: Vec<&str> = response.files.iter().map(|file| file.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["good.jpg", DEFAULT_FILE_NAME, "no-id.jpg", DEFAULT_FILE_NAME]
        );
        assert_eq!(response.files[0].id, "F1");
        assert_eq!(response.files[2].id, "");
        assert_eq!(response.files[3].id, "");
        assert_eq!(response.files[1].locator(), Some("https://files.example/F2"));
    }
}
