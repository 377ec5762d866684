use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::Settings;
use crate::errors::{Result, SyncError};
use crate::models::{
    FilesListResponse, PostMessagePayload, PostMessageResponse, RemoteFileDescriptor,
};
use crate::services::remote::{FileSource, Notifier};

const MISSING_SCOPE: &str = "missing_scope";

#[derive(Clone)]
pub struct SlackClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    list_count: usize,
}

impl SlackClient {
    pub fn new(settings: &Settings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_seconds))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_seconds))
            .pool_max_idle_per_host((settings.max_workers * 2).clamp(8, 128))
            .build()
            .unwrap_or_else(|err| {
                tracing::warn!(
                    "failed to build configured http client, using defaults: {}",
                    err
                );
                reqwest::Client::new()
            });
        Self {
            client,
            base_url: settings.api_base.clone(),
            token: settings.slack_token.clone(),
            list_count: settings.list_count,
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            method.trim_start_matches('/')
        )
    }

    async fn call<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        api_method: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T> {
        let mut request = self
            .client
            .request(method, self.endpoint(api_method))
            .bearer_auth(&self.token)
            .query(query);
        if let Some(payload) = body {
            request = request.json(payload);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(SyncError::Http(format!(
                "{} returned HTTP {}: {}",
                api_method,
                status.as_u16(),
                text
            )));
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl FileSource for SlackClient {
    async fn list_files(&self, channel_id: &str) -> Result<Vec<RemoteFileDescriptor>> {
        let response: FilesListResponse = self
            .call(
                Method::GET,
                "files.list",
                &[
                    ("channel", channel_id.to_string()),
                    ("count", self.list_count.to_string()),
                ],
                Option::<&()>::None,
            )
            .await?;
        if !response.ok {
            return Err(SyncError::Api(
                response.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(response.files)
    }

    async fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(locator)
            .bearer_auth(&self.token)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SyncError::Http(format!(
                "download failed: HTTP {}",
                response.status().as_u16()
            )));
        }

        let capacity = response
            .content_length()
            .map(|len| len.min(64 * 1024 * 1024) as usize)
            .unwrap_or(0);
        let mut data = Vec::with_capacity(capacity);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk?);
        }
        Ok(data)
    }
}

#[async_trait]
impl Notifier for SlackClient {
    async fn post_message(&self, channel_id: &str, text: &str) -> Result<()> {
        let payload = PostMessagePayload {
            channel: channel_id,
            text,
        };
        let response: PostMessageResponse = self
            .call(Method::POST, "chat.postMessage", &[], Some(&payload))
            .await?;
        if response.ok {
            return Ok(());
        }
        Err(SyncError::Api(
            response.error.unwrap_or_else(|| "unknown error".to_string()),
        ))
    }
}

/// Posts the run summary. Failures are logged and swallowed.
pub async fn notify_best_effort(notifier: &dyn Notifier, channel_id: Option<&str>, text: &str) {
    let Some(channel_id) = channel_id else {
        tracing::warn!("summary not sent: no notification channel configured");
        return;
    };
    match notifier.post_message(channel_id, text).await {
        Ok(()) => tracing::info!("summary sent to {}", channel_id),
        Err(SyncError::Api(error)) if error == MISSING_SCOPE => tracing::warn!(
            "summary skipped: token needs the 'chat:write' scope (add it under OAuth & Permissions and reinstall the app)"
        ),
        Err(err) => tracing::error!("summary post failed: {}", err),
    }
}
