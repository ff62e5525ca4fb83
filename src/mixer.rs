//! vMix TCP API plumbing
//!
//! The mixer speaks a line-oriented text protocol: commands go out as
//! `FUNCTION <Name> <query>` terminated by CRLF, activator notifications
//! come back as `ACTS OK <param> [<input>] <value>`.

pub mod client;
pub mod command;
pub mod event;
pub mod supervisor;

use async_trait::async_trait;
use thiserror::Error;

pub use client::{MixerClient, RetryPolicy};
pub use command::MixerCommand;
pub use event::ActsEvent;
pub use supervisor::MixerSupervisor;

pub type Result<T> = std::result::Result<T, MixerError>;

#[derive(Error, Debug)]
pub enum MixerError {
    #[error("cannot connect to mixer at {addr}: {source}")]
    Fatal {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("write to mixer failed: {0}")]
    Write(#[source] std::io::Error),

    #[error("read from mixer failed: {0}")]
    Read(#[source] std::io::Error),

    #[error("mixer link is not connected")]
    NotConnected,
}

/// Destination for outgoing mixer commands
///
/// Implemented by [`MixerClient`]; tests substitute a recording sink.
#[async_trait]
pub trait CommandSink: Send + Sync {
    async fn send(&self, command: &MixerCommand) -> Result<()>;
}
