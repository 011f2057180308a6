//! Background worker: warms the search index on start, then periodically
//! sweeps expired entries out of every cache.
//!
//! Expiry is also checked on every read, so the sweep only bounds memory held
//! by entries nobody asks for again.

use crate::browser::DocBrowser;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

pub struct BackgroundWorker {
    browser: Arc<DocBrowser>,
    sweep_interval: Option<Duration>,
    warm_up: bool,
}

impl BackgroundWorker {
    pub fn new(browser: Arc<DocBrowser>) -> Self {
        let sweep_interval = browser.config().sweep_interval();
        Self {
            browser,
            sweep_interval,
            warm_up: true,
        }
    }

    /// Leave the index empty until something asks for a rebuild.
    pub fn skip_warm_up(mut self) -> Self {
        self.warm_up = false;
        self
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(shutdown).await })
    }

    /// Run until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        if self.warm_up {
            tokio::select! {
                () = shutdown.cancelled() => return,
                () = self.warm_index() => {}
            }
        }

        let Some(period) = self.sweep_interval else {
            tracing::debug!("Cache sweep disabled");
            return;
        };

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately; nothing has expired yet
        ticker.tick().await;

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => self.sweep(),
            }
        }
        tracing::debug!("Background worker stopped");
    }

    async fn warm_index(&self) {
        match self.browser.index().rebuild().await {
            Ok(report) if report.is_partial() => {
                tracing::warn!(
                    "Search index warmed with {} documents, {} failed",
                    report.indexed,
                    report.failed
                );
            }
            Ok(report) => {
                tracing::debug!("Search index warmed with {} documents", report.indexed);
            }
            Err(e) => {
                tracing::warn!("Search index warm-up failed: {}", e);
            }
        }
    }

    fn sweep(&self) {
        let report = self.browser.purge_expired();
        if report.total() > 0 {
            tracing::debug!(
                "Swept {} expired entries (structure {}, document {}, related {})",
                report.total(),
                report.structure,
                report.document,
                report.related
            );
        }
    }
}

/// Spawn the background worker as a tokio task.
///
/// Cancel `shutdown` to stop it; the returned handle resolves once it has.
pub fn spawn_background_worker(
    browser: Arc<DocBrowser>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    BackgroundWorker::new(browser).spawn(shutdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BrowserConfig;
    use crate::error::TransportError;
    use crate::source::ContentSource;
    use crate::types::{ContentItem, DocumentPayload, Metadata};
    use assert2::check;
    use async_trait::async_trait;

    struct SingleDoc;

    #[async_trait]
    impl ContentSource for SingleDoc {
        async fn fetch_directory(&self, path: &str) -> Result<Vec<ContentItem>, TransportError> {
            if path.is_empty() {
                Ok(vec![ContentItem::file("intro.md", "intro.md")])
            } else {
                Err(TransportError::not_found(path))
            }
        }

        async fn fetch_document(&self, path: &str) -> Result<DocumentPayload, TransportError> {
            Ok(DocumentPayload {
                path: path.to_string(),
                name: path.to_string(),
                body: "Welcome".to_string(),
                metadata: Metadata::default(),
                headings: vec![],
            })
        }
    }

    fn browser(sweep_interval_secs: Option<u64>) -> Arc<DocBrowser> {
        let config = BrowserConfig {
            sweep_interval_secs,
            ..BrowserConfig::default()
        };
        Arc::new(DocBrowser::new(Arc::new(SingleDoc), config))
    }

    #[tokio::test]
    async fn test_worker_warms_index_and_exits_without_sweep() {
        let browser = browser(None);
        let handle = spawn_background_worker(Arc::clone(&browser), CancellationToken::new());

        handle.await.unwrap();
        check!(browser.index().is_ready());
        check!(browser.index().len() == 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_worker_sweeps_until_cancelled() {
        let browser = browser(Some(60));
        let shutdown = CancellationToken::new();
        let handle = spawn_background_worker(Arc::clone(&browser), shutdown.clone());

        // Warm-up caches the root listing and the document
        tokio::time::sleep(Duration::from_secs(1)).await;
        check!(browser.structure().cache_stats().size == 1);

        tokio::time::sleep(Duration::from_secs(400)).await;
        check!(browser.structure().cache_stats().size == 0);
        check!(browser.documents().cache_stats().size == 0);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_skip_warm_up_leaves_index_empty() {
        let browser = browser(None);
        BackgroundWorker::new(Arc::clone(&browser))
            .skip_warm_up()
            .spawn(CancellationToken::new())
            .await
            .unwrap();
        check!(!browser.index().is_ready());
    }
}
