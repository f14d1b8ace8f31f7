//! Watcher registration and dispatch.
//!
//! Two watcher kinds share one dispatch contract: the registered callback is
//! invoked with the [`WatchedEvent`] that fired. The *global* watcher is
//! installed explicitly, persists across reconnects and fires repeatedly for
//! the life of the session. A *local* watcher is registered implicitly by a
//! watch-bearing read request and fires at most once; its registration is
//! released unconditionally the first time it is dispatched.
//!
//! Dispatch happens only on the I/O driver task, never on a caller's task,
//! so at most one watcher callback runs at a time per session.

mod registry;

pub use registry::*;


use std::sync::Arc;

use crate::constants::EventType;
use crate::constants::SessionState;

/// The fixed event record delivered to every watcher callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedEvent {
    pub event_type: EventType,
    pub state: SessionState,
    pub path: String,
}

/// A watcher callback. Context travels by closure capture; the registry is
/// polymorphic over whatever the embedder moves in.
pub type WatchFn = Arc<dyn Fn(&WatchedEvent) + Send + Sync>;

/// Handle to one local watcher registration. Generated, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchToken(pub(crate) u64);
