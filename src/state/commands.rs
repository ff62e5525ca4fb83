//! Commands for the state actor
//!
//! Updates are fire-and-forget; queries carry a oneshot channel for the
//! reply.

use super::types::MirroredState;
use crate::mixer::ActsEvent;
use tokio::sync::oneshot;

#[derive(Debug)]
pub enum StateCommand {
    // -------------------------------------------------------------------------
    // Hot path commands (no response)
    // -------------------------------------------------------------------------
    /// Apply one activator notification
    Apply(ActsEvent),

    /// Replace the whole state with a fresh snapshot
    Replace(Box<MirroredState>),

    // -------------------------------------------------------------------------
    // Request-response commands
    // -------------------------------------------------------------------------
    /// Clone of the current state
    Snapshot {
        response: oneshot::Sender<MirroredState>,
    },

    /// Number of notifications applied since start
    UpdateCount { response: oneshot::Sender<u64> },
}
