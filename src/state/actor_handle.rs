//! StateActorHandle - public API for the StateActor
//!
//! Fire-and-forget methods for the event path, async methods backed by
//! oneshot channels for queries.

use tokio::sync::{mpsc, oneshot};

use super::commands::StateCommand;
use super::types::MirroredState;
use crate::mixer::ActsEvent;

/// Cloneable handle to the state actor
///
/// If the actor has stopped, updates are dropped and queries return the
/// default value.
#[derive(Clone)]
pub struct StateActorHandle {
    cmd_tx: mpsc::UnboundedSender<StateCommand>,
}

impl StateActorHandle {
    pub fn new(cmd_tx: mpsc::UnboundedSender<StateCommand>) -> Self {
        Self { cmd_tx }
    }

    /// Spawn a new StateActor and return a handle
    pub fn spawn(initial: MirroredState) -> Self {
        super::actor::StateActor::spawn(initial)
    }

    // =========================================================================
    // Hot path methods (fire-and-forget, no await)
    // =========================================================================

    pub fn apply(&self, event: ActsEvent) {
        let _ = self.cmd_tx.send(StateCommand::Apply(event));
    }

    pub fn replace(&self, state: MirroredState) {
        let _ = self.cmd_tx.send(StateCommand::Replace(Box::new(state)));
    }

    // =========================================================================
    // Query methods (async with response)
    // =========================================================================

    pub async fn snapshot(&self) -> MirroredState {
        let (response_tx, response_rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(StateCommand::Snapshot {
                response: response_tx,
            })
            .is_err()
        {
            return MirroredState::default();
        }
        response_rx.await.unwrap_or_default()
    }

    pub async fn update_count(&self) -> u64 {
        let (response_tx, response_rx) = oneshot::channel();
        if self
            .cmd_tx
            .send(StateCommand::UpdateCount {
                response: response_tx,
            })
            .is_err()
        {
            return 0;
        }
        response_rx.await.unwrap_or_default()
    }
}
