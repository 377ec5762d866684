use std::sync::Arc;

use channel_sync::config::{Settings, SyncTarget};
use channel_sync::logging;
use channel_sync::services::{notify_best_effort, FileSource, Notifier, SlackClient, SyncEngine};

async fn sync_target(
    settings: &Settings,
    client: &Arc<SlackClient>,
    target: &SyncTarget,
) {
    let (Some(channel_id), Some(folder)) = (
        target.channel_id.as_deref(),
        target.download_folder.as_ref(),
    ) else {
        tracing::warn!(
            "skipping {}: channel id or download folder not configured",
            target.label
        );
        return;
    };

    let source: Arc<dyn FileSource> = client.clone();
    let engine = SyncEngine::new(source, folder.clone(), settings.max_workers);
    let report = match engine.sync_channel(channel_id).await {
        Ok(report) => report,
        Err(err) => {
            tracing::error!("{} sync failed: {}", target.label, err);
            return;
        }
    };

    let message = report.summary.message();
    tracing::info!("{}: {}", target.label, message);
    let notifier: &dyn Notifier = client.as_ref();
    notify_best_effort(notifier, settings.automations_channel_id.as_deref(), &message).await;
}

#[tokio::main]
async fn main() {
    let settings = Settings::from_env();
    if let Err(err) = logging::init(settings.log_dir.as_deref()) {
        eprintln!("failed to initialise logging: {err}");
    }

    let client = Arc::new(SlackClient::new(&settings));
    for target in settings.targets() {
        sync_target(&settings, &client, &target).await;
    }
    tracing::info!("channel sync finished");
}
