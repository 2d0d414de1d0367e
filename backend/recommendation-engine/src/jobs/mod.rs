//! Background timers: feature refresh, trending aggregate, segmentation,
//! and cache warming.
//!
//! Each job runs on its own tokio task with a shared shutdown channel. Job
//! failures are logged and the timer keeps ticking; nothing here blocks the
//! request path.

use crate::config::JobsConfig;
use crate::services::engine::RecommendationEngine;
use crate::storage::ContentStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{error, info};

pub struct JobScheduler {
    engine: Arc<RecommendationEngine>,
    store: Arc<dyn ContentStore>,
    config: JobsConfig,
}

impl JobScheduler {
    pub fn new(
        engine: Arc<RecommendationEngine>,
        store: Arc<dyn ContentStore>,
        config: JobsConfig,
    ) -> Self {
        Self {
            engine,
            store,
            config,
        }
    }

    /// Spawn all periodic jobs. The first tick of each runs immediately.
    ///
    /// Returns the shutdown sender and the task handles; send on the
    /// channel (or drop the sender) to stop every job.
    pub fn spawn(self) -> (watch::Sender<()>, Vec<JoinHandle<()>>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let mut handles = Vec::new();

        {
            let engine = self.engine.clone();
            let store = self.store.clone();
            handles.push(spawn_periodic(
                "feature-refresh",
                Duration::from_secs(self.config.feature_refresh_secs),
                shutdown_rx.clone(),
                move || {
                    let engine = engine.clone();
                    let store = store.clone();
                    async move {
                        match engine.feature_index().refresh(store.as_ref()).await {
                            Ok(stats) => info!(
                                features = stats.features,
                                segments = stats.segments,
                                "feature refresh completed"
                            ),
                            Err(e) => error!(error = %e, "feature refresh failed"),
                        }
                    }
                },
            ));
        }

        {
            let engine = self.engine.clone();
            handles.push(spawn_periodic(
                "trending-update",
                Duration::from_secs(self.config.trending_update_secs),
                shutdown_rx.clone(),
                move || {
                    let engine = engine.clone();
                    async move {
                        if let Err(e) = engine.update_trending_scores().await {
                            error!(error = %e, "trending score update failed");
                        }
                    }
                },
            ));
        }

        {
            let engine = self.engine.clone();
            handles.push(spawn_periodic(
                "segmentation",
                Duration::from_secs(self.config.segment_update_secs),
                shutdown_rx.clone(),
                move || {
                    let engine = engine.clone();
                    async move {
                        if let Err(e) = engine.update_user_segments().await {
                            error!(error = %e, "segmentation sweep failed");
                        }
                    }
                },
            ));
        }

        {
            let engine = self.engine.clone();
            handles.push(spawn_periodic(
                "cache-warming",
                Duration::from_secs(self.config.cache_warm_secs),
                shutdown_rx,
                move || {
                    let engine = engine.clone();
                    async move {
                        if let Err(e) = engine.warm_cache().await {
                            error!(error = %e, "cache warming pass failed");
                        }
                    }
                },
            ));
        }

        (shutdown_tx, handles)
    }
}

fn spawn_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<()>,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        info!(
            job = name,
            period_secs = period.as_secs(),
            "background job started"
        );
        let mut timer = interval(period);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!(job = name, "background job stopped");
                    break;
                }
                _ = timer.tick() => tick().await,
            }
        }
    })
}
