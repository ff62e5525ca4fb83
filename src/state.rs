//! Mirrored mixer state
//!
//! The state is seeded from an XML snapshot and kept current by the
//! activator notification stream. It is owned by a single actor task; other
//! tasks hold a `StateActorHandle`.

mod actor;
mod actor_handle;
mod commands;
pub mod snapshot;
mod sync;
mod types;

pub use actor_handle::StateActorHandle;
pub use snapshot::{fetch_snapshot, parse_snapshot};
pub use types::{InputFlags, MirroredState, OVERLAY_SLOTS};
