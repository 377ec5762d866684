use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::models::DEFAULT_FILE_NAME;

pub const UNKNOWN_DATE_BUCKET: &str = "unknown_date";
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Year-month folder for a file, or the fixed unknown-date folder.
pub fn bucket_for(timestamp: Option<DateTime<Utc>>) -> String {
    match timestamp {
        Some(at) => at.format("%Y-%m").to_string(),
        None => UNKNOWN_DATE_BUCKET.to_string(),
    }
}

/// Reduces a remote display name to a single path component.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            ch if ch.is_control() => '_',
            ch => ch,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => DEFAULT_FILE_NAME.to_string(),
        _ => cleaned,
    }
}

/// `attempt == 0` is the name itself; later attempts insert `_N` before the
/// extension, so `photo.jpg` becomes `photo_1.jpg`, `photo_2.jpg`, ...
pub fn candidate_name(name: &str, attempt: u32) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|value| value.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_string());
    match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, attempt, ext.to_string_lossy()),
        None => format!("{}_{}", stem, attempt),
    }
}

/// Writes `contents` under `dir` using the first free candidate of `name`.
///
/// The path is claimed with an exclusive create, so two writers racing for
/// the same name always end up on distinct paths.
pub async fn write_unique(dir: &Path, name: &str, contents: &[u8]) -> io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let path = dir.join(candidate_name(name, attempt));
        let opened = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;
        let mut file = match opened {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        };
        if attempt > 0 {
            tracing::info!(
                "filename conflict resolved: {} -> {}",
                name,
                path.display()
            );
        }
        fill_claimed(&path, &mut file, contents).await?;
        return Ok(path);
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!(
            "no free name for {} in {} after {} attempts",
            name,
            dir.display(),
            MAX_NAME_ATTEMPTS
        ),
    ))
}

/// Writes into a freshly claimed path. On failure the partial file is removed
/// so a later scan cannot index truncated bytes.
async fn fill_claimed<W>(path: &Path, file: &mut W, contents: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let written = async {
        file.write_all(contents).await?;
        file.flush().await
    }
    .await;

    if let Err(err) = written {
        if let Err(remove_err) = tokio::fs::remove_file(path).await {
            tracing::warn!(
                "failed to remove partial file {}: {}",
                path.display(),
                remove_err
            );
        }
        return Err(err);
    }
    Ok(())
}
