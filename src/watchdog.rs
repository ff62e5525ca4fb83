//! Hardware reconnect watchdog
//!
//! Probes the surface link at a fixed interval. When a probe fails the link
//! is reopened until that succeeds; the application is then notified so it
//! can restore the LEDs, a fresh watchdog takes over and this one ends.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Link to the control surface as seen by the watchdog
#[async_trait]
pub trait SurfaceLink: Send + Sync {
    /// Cheap write proving the output port is still there
    async fn probe(&self) -> Result<()>;

    /// Drop stale ports and open them again
    async fn reopen(&self) -> Result<()>;
}

#[derive(Clone)]
pub struct Watchdog {
    link: Arc<dyn SurfaceLink>,
    probe_interval: Duration,
    reconnect_interval: Duration,
    reconnected: mpsc::Sender<()>,
}

impl Watchdog {
    pub fn new(
        link: Arc<dyn SurfaceLink>,
        probe_interval: Duration,
        reconnect_interval: Duration,
        reconnected: mpsc::Sender<()>,
    ) -> Self {
        Self {
            link,
            probe_interval,
            reconnect_interval,
            reconnected,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        debug!("Surface watchdog armed ({:?})", self.probe_interval);

        loop {
            tokio::time::sleep(self.probe_interval).await;
            match self.link.probe().await {
                Ok(()) => continue,
                Err(e) => {
                    warn!("⚠️ Control surface lost: {}", e);
                    break;
                }
            }
        }

        loop {
            match self.link.reopen().await {
                Ok(()) => break,
                Err(e) => {
                    debug!("Surface reopen failed: {}", e);
                    tokio::time::sleep(self.reconnect_interval).await;
                }
            }
        }
        info!("✅ Control surface reconnected");

        if self.reconnected.send(()).await.is_err() {
            debug!("Reconnect listener gone");
        }

        self.clone().spawn();
    }
}
