//! Background rescanning of the plugin roots.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use crate::manager::PluginManager;

/// Periodically hot-loads new plugins and unloads vanished ones.
#[derive(Debug)]
pub struct RescanService {
    /// Manager whose roots are rescanned.
    manager: Arc<PluginManager>,
    /// Time between scans.
    interval: Duration,
}

impl RescanService {
    /// Creates a service scanning every `interval`.
    pub fn new(manager: Arc<PluginManager>, interval: Duration) -> Self {
        Self { manager, interval }
    }

    /// Runs until `cancel` turns `true` or its sender is dropped.
    ///
    /// The first scan happens one interval after start; startup loading is
    /// left to the caller.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        tracing::info!(
            interval_seconds = self.interval.as_secs_f64(),
            "Plugin rescan service started"
        );

        let mut interval = time::interval_at(time::Instant::now() + self.interval, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.manager.rescan().await {
                        Ok(report) => tracing::trace!(
                            loaded = report.loaded.len(),
                            unloaded = report.unloaded.len(),
                            "Plugin rescan finished"
                        ),
                        Err(e) => tracing::error!(error = %e, "Plugin rescan failed"),
                    }
                }
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        tracing::info!("Plugin rescan service shutting down");
                        break;
                    }
                }
            }
        }
    }
}
