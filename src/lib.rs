//! Embeddable client adapter for a ZooKeeper-style coordination service.
//!
//! Bridges an asynchronous client engine into a `Session` handle callers
//! drive with plain `async` calls: one spawned I/O driver task pumps the
//! engine's interest/process cycle while every request suspends its caller
//! on a one-shot completion. Reconnection after transport loss, the
//! connected-state broadcast and watcher registration/dispatch all live
//! behind the handle.
//!
//! The wire protocol itself stays behind the [`engine`] trait seams; this
//! crate supplies the lifecycle, the call adapter and the watcher registry.

pub mod constants;
pub mod engine;
pub mod errors;
pub mod record;

mod ops;
mod session;
mod watch;

pub use constants::Code;
pub use constants::EventType;
pub use constants::SessionState;
pub use errors::Error;
pub use errors::PreconditionError;
pub use errors::Result;
pub use ops::*;
pub use session::*;
pub use watch::WatchFn;
pub use watch::WatchToken;
pub use watch::WatchedEvent;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
