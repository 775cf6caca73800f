use std::future::ready;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use common_s3::S3Client;
use tower_http::trace::TraceLayer;

use crate::endpoints;
use crate::fetch::PublicBatchClient;
use crate::last_batch::LastBatch;
use crate::prometheus::{setup_metrics_recorder, track_metrics};
use crate::time::TimeSource;
use crate::utils::SuffixSource;

#[derive(Clone)]
pub struct State {
    pub store: Arc<dyn S3Client>,
    pub timesource: Arc<dyn TimeSource + Send + Sync>,
    pub suffixes: Arc<dyn SuffixSource + Send + Sync>,
    pub last_batch: LastBatch,
    pub public_batches: PublicBatchClient,
}

pub fn router<
    TZ: TimeSource + Send + Sync + 'static,
    SF: SuffixSource + Send + Sync + 'static,
    S: S3Client + 'static,
>(
    timesource: TZ,
    suffixes: SF,
    store: S,
    last_batch: LastBatch,
    public_batches: PublicBatchClient,
    metrics: bool,
) -> Router {
    let state = State {
        store: Arc::new(store),
        timesource: Arc::new(timesource),
        suffixes: Arc::new(suffixes),
        last_batch,
        public_batches,
    };

    let router = Router::new()
        .route("/", get(endpoints::index))
        .route("/batches", post(endpoints::create_batch))
        .route("/batches/", post(endpoints::create_batch))
        .route("/batches/:date/users", get(endpoints::users))
        .route(
            "/batches/:date/users/:public_user_id",
            get(endpoints::batch_ids),
        )
        .route(
            "/batches/:date/users/:public_user_id/batch/:batch_id",
            get(endpoints::batch),
        )
        .route("/latest-batch", get(endpoints::latest_batch))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(track_metrics))
        .with_state(state);

    // Don't install metrics unless asked to
    // Installing a global recorder when capture is used as a library (during tests etc)
    // does not work well.
    if metrics {
        let recorder_handle = setup_metrics_recorder();

        router.route("/metrics", get(move || ready(recorder_handle.render())))
    } else {
        router
    }
}
