use crate::services::sessions::UploadSessionStore;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;

/// Periodically drops upload sessions nobody has touched within the TTL.
pub struct SessionSweeper {
    sessions: UploadSessionStore,
    ttl: Duration,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl SessionSweeper {
    pub fn new(
        sessions: UploadSessionStore,
        ttl: Duration,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            sessions,
            ttl,
            interval,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            "🚀 Session sweeper started (ttl {:?}, every {:?})",
            self.ttl,
            self.interval
        );

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    tracing::info!("🛑 Session sweeper shutting down");
                    break;
                }
                _ = sleep(self.interval) => {
                    self.sweep_once();
                }
            }
        }
    }

    pub fn sweep_once(&self) -> usize {
        let removed = self.sessions.sweep(self.ttl);
        if removed > 0 {
            tracing::info!(
                "🧹 Swept {} idle upload session(s), {} active",
                removed,
                self.sessions.len()
            );
        }
        removed
    }
}
