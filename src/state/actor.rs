//! StateActor - single owner of the mirrored mixer state
//!
//! All mutation goes through the actor's command channel, so the mixer
//! event consumer and the snapshot refresh after a reconnect never race.

use super::actor_handle::StateActorHandle;
use super::commands::StateCommand;
use super::types::MirroredState;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

pub struct StateActor {
    state: MirroredState,

    command_rx: mpsc::UnboundedReceiver<StateCommand>,

    /// Notifications applied since start
    update_count: u64,
}

impl StateActor {
    /// Spawn the actor seeded with `initial` and return its handle
    pub fn spawn(initial: MirroredState) -> StateActorHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let actor = StateActor {
            state: initial,
            command_rx: cmd_rx,
            update_count: 0,
        };
        tokio::spawn(actor.run());

        info!("StateActor spawned");
        StateActorHandle::new(cmd_tx)
    }

    /// Process commands until every handle is dropped
    async fn run(mut self) {
        debug!("StateActor run loop started");

        while let Some(cmd) = self.command_rx.recv().await {
            trace!(?cmd, "Processing command");

            match cmd {
                StateCommand::Apply(event) => {
                    if self.state.apply(&event) {
                        self.update_count += 1;
                    } else {
                        trace!("Not mirrored: {}", event);
                    }
                }
                StateCommand::Replace(state) => {
                    self.state = *state;
                    debug!("State replaced from snapshot");
                }
                StateCommand::Snapshot { response } => {
                    let _ = response.send(self.state.clone());
                }
                StateCommand::UpdateCount { response } => {
                    let _ = response.send(self.update_count);
                }
            }
        }

        debug!(
            "StateActor stopped after {} updates",
            self.update_count
        );
    }
}
