//! Mixer link supervisor
//!
//! Waits for the receiver of the current link to end, then re-dials,
//! reloads the snapshot into the state actor and only then subscribes and
//! starts a new receiver. The application is notified after each resync.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{MixerClient, Result};
use crate::state::{fetch_snapshot, StateActorHandle};

pub struct MixerSupervisor {
    client: Arc<MixerClient>,
    lines: mpsc::Sender<String>,
    state: StateActorHandle,
    resynced: mpsc::Sender<()>,
}

impl MixerSupervisor {
    pub fn new(
        client: Arc<MixerClient>,
        lines: mpsc::Sender<String>,
        state: StateActorHandle,
        resynced: mpsc::Sender<()>,
    ) -> Self {
        Self {
            client,
            lines,
            state,
            resynced,
        }
    }

    /// Supervise the link whose receiver is `receiver`
    pub fn spawn(self, receiver: JoinHandle<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(receiver))
    }

    async fn run(self, mut receiver: JoinHandle<()>) {
        loop {
            if let Err(e) = receiver.await {
                warn!("Mixer receiver task failed: {}", e);
            }
            warn!("⚠️ Mixer connection lost, reconnecting...");

            receiver = self.reconnect().await;
            info!("✅ Mixer link resynchronized");

            if self.resynced.send(()).await.is_err() {
                return;
            }
        }
    }

    async fn reconnect(&self) -> JoinHandle<()> {
        let retry = self.client.policy().interval;
        loop {
            match self.try_reconnect().await {
                Ok(receiver) => return receiver,
                Err(e) => {
                    warn!("Mixer reconnect failed: {}", e);
                    tokio::time::sleep(retry).await;
                }
            }
        }
    }

    async fn try_reconnect(&self) -> Result<JoinHandle<()>> {
        self.client.reconnect().await?;

        // Replace is queued before the new receiver can deliver any event
        match fetch_snapshot(self.client.addr(), self.client.policy()).await {
            Ok(snapshot) => self.state.replace(snapshot),
            Err(e) => warn!("Failed to refresh mixer state: {}", e),
        }

        self.client.subscribe().await?;
        self.client.spawn_receiver(self.lines.clone())
    }
}
