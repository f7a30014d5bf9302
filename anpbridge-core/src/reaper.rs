//! Background eviction of idle sessions

use crate::config::SessionSettings;
use crate::session::SessionRegistry;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Periodically sweeps a [`SessionRegistry`]
pub struct SessionReaper;

impl SessionReaper {
    /// Start sweeping. The first sweep runs one interval after the call.
    pub fn spawn<R>(registry: Arc<SessionRegistry<R>>, settings: &SessionSettings) -> ReaperHandle
    where
        R: Send + Sync + 'static,
    {
        let idle_timeout = settings.idle_timeout();
        let sweep_interval = settings.sweep_interval();
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + sweep_interval, sweep_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!(
                timeout_secs = idle_timeout.as_secs(),
                interval_secs = sweep_interval.as_secs(),
                "Cleanup task started"
            );

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = registry.sweep(idle_timeout).await;
                        debug!(removed, "Sweep finished");
                    }
                    changed = shutdown_rx.changed() => {
                        // a dropped handle counts as a shutdown request
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Cleanup task stopped");
        });

        ReaperHandle { shutdown_tx, task }
    }
}

/// Owner of a running reaper. Dropping it also stops the task.
pub struct ReaperHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Ask the task to stop without waiting for it
    pub fn signal_shutdown(&self) {
        // the receiver is gone only if the task already exited
        let _ = self.shutdown_tx.send(true);
    }

    /// Stop the task and wait for it to finish its current sweep
    pub async fn shutdown(self) {
        self.signal_shutdown();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Cleanup task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeResult;
    use crate::traits::ResourceFactory;
    use crate::types::Credential;
    use async_trait::async_trait;
    use std::time::Duration;

    struct UnitFactory;

    #[async_trait]
    impl ResourceFactory for UnitFactory {
        type Resource = ();

        async fn make(&self, _credential: &Credential) -> BridgeResult<()> {
            Ok(())
        }
    }

    fn registry() -> Arc<SessionRegistry<()>> {
        Arc::new(SessionRegistry::new(Arc::new(UnitFactory)))
    }

    fn settings(idle: u64, interval: u64) -> SessionSettings {
        SessionSettings {
            idle_timeout_secs: idle,
            sweep_interval_secs: interval,
        }
    }

    fn credential() -> Credential {
        Credential::new("did.json", "key.pem")
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_is_reaped() {
        let registry = registry();
        let handle = SessionReaper::spawn(Arc::clone(&registry), &settings(2, 1));

        let id = registry.create(credential()).await;

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(registry.contains(&id).await);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(registry.get(&id).await.is_none());

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_active_session_is_kept() {
        let registry = registry();
        let handle = SessionReaper::spawn(Arc::clone(&registry), &settings(2, 1));

        let id = registry.create(credential()).await;
        for _ in 0..10 {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            assert!(registry.get(&id).await.is_some());
        }

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_interval_keeps_task_alive() {
        let handle = SessionReaper::spawn(registry(), &settings(2, u64::MAX));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_finished());

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_task() {
        let handle = SessionReaper::spawn(registry(), &settings(2, 1));
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_shutdown_does_not_block() {
        let handle = SessionReaper::spawn(registry(), &settings(2, 1));
        handle.signal_shutdown();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_stops_task() {
        let registry = registry();
        let handle = SessionReaper::spawn(Arc::clone(&registry), &settings(2, 1));
        drop(handle);

        tokio::time::sleep(Duration::from_millis(10)).await;
        // the task released its registry clone
        assert_eq!(Arc::strong_count(&registry), 1);
    }
}
