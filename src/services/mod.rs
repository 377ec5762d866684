pub mod content_index;
pub mod download_worker;
pub mod remote;
pub mod slack_client;
pub mod summary;
pub mod sync_engine;

pub use content_index::{ContentFingerprint, ContentIndex, IndexEntry, SeedStats};
pub use download_worker::DownloadWorker;
pub use remote::{FileSource, Notifier};
pub use slack_client::{notify_best_effort, SlackClient};
pub use summary::SyncSummary;
pub use sync_engine::{SyncEngine, SyncReport};
