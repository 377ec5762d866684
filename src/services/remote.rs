use async_trait::async_trait;

use crate::errors::Result;
use crate::models::RemoteFileDescriptor;

/// Where descriptors and file bytes come from.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// First page of files shared in `channel_id`.
    async fn list_files(&self, channel_id: &str) -> Result<Vec<RemoteFileDescriptor>>;

    /// Full body of the file at `locator`. Non-success responses are errors.
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post_message(&self, channel_id: &str, text: &str) -> Result<()>;
}
