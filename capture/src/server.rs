use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use common_s3::{S3Config, S3Impl};
use tokio::net::TcpListener;

use crate::config::Config;
use crate::fetch::PublicBatchClient;
use crate::last_batch::LastBatch;
use crate::router;
use crate::time::SystemTime;
use crate::utils::RandomSuffix;

pub async fn serve<F>(config: Config, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let store = S3Impl::new(S3Config::from(&config.storage)).await;

    let public_batches = PublicBatchClient::new(
        config.public_url_prefix(),
        Duration::from_millis(config.fetch_timeout_ms),
    )
    .context("failed to build public batch client")?;

    let app = router::router(
        SystemTime {},
        RandomSuffix {},
        store,
        LastBatch::new(),
        public_batches,
        config.export_prometheus,
    );

    tracing::info!(
        "listening on {:?}",
        listener.local_addr().context("listener has no address")?
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("server error")
}
