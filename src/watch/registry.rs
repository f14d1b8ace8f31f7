use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::WatchFn;
use super::WatchToken;
use super::WatchedEvent;
use crate::engine::WatchSignal;

/// The session-wide watcher registration.
///
/// Wrapped in its own struct so replacement can build the new registration
/// completely before the swap makes it visible to the dispatching driver.
pub struct GlobalWatch {
    callback: WatchFn,
}

/// Holds the global watcher and the table of outstanding local watchers.
///
/// Local registrations follow a single-owner release discipline: the entry
/// is removed from the table *before* its callback runs, so one dispatch is
/// the only possible dispatch.
pub struct WatchRegistry {
    global: ArcSwapOption<GlobalWatch>,

    /// Outstanding one-shot watchers keyed by generated token.
    locals: DashMap<WatchToken, WatchFn>,

    /// Next local token (monotonically increasing, never reused).
    next_token: AtomicU64,
}

impl Default for WatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self {
            global: ArcSwapOption::const_empty(),
            locals: DashMap::new(),
            next_token: AtomicU64::new(1),
        }
    }

    /// Install, replace or clear the global watcher.
    ///
    /// The replacement is constructed fully before the swap; the previous
    /// registration is released only after the swap, so a dispatch in flight
    /// observes either the old or the new registration, never a half-built
    /// one.
    pub fn set_global(
        &self,
        callback: Option<WatchFn>,
    ) {
        let fresh = callback.map(|callback| Arc::new(GlobalWatch { callback }));
        let previous = self.global.swap(fresh);
        if previous.is_some() {
            debug!("global watcher replaced");
        }
    }

    pub fn has_global(&self) -> bool {
        self.global.load().is_some()
    }

    /// Register a one-shot local watcher and hand back its token.
    pub fn register_local(
        &self,
        callback: WatchFn,
    ) -> WatchToken {
        let token = WatchToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.locals.insert(token, callback);
        trace!(token = token.0, "local watcher registered");
        token
    }

    /// Release a local registration that never fired (submission failure or
    /// session close).
    pub fn release_local(
        &self,
        token: WatchToken,
    ) {
        if self.locals.remove(&token).is_some() {
            trace!(token = token.0, "local watcher released unfired");
        }
    }

    /// Resolve one engine watch signal to its registration and invoke it.
    ///
    /// Runs on the driver task only. A local registration is removed before
    /// its callback runs; a signal for an unknown token is dropped.
    pub fn dispatch(
        &self,
        signal: WatchSignal,
    ) {
        let event = WatchedEvent {
            event_type: signal.event_type,
            state: signal.state,
            path: signal.path,
        };

        match signal.token {
            None => {
                if let Some(global) = self.global.load_full() {
                    debug!(
                        event_type = ?event.event_type,
                        state = ?event.state,
                        path = %event.path,
                        "dispatching global watcher"
                    );
                    (global.callback)(&event);
                }
            }
            Some(token) => match self.locals.remove(&token) {
                Some((_, callback)) => {
                    debug!(
                        token = token.0,
                        event_type = ?event.event_type,
                        path = %event.path,
                        "dispatching local watcher"
                    );
                    callback(&event);
                }
                None => {
                    warn!(token = token.0, "watch signal for unknown local watcher, dropped");
                }
            },
        }
    }

    /// Number of outstanding local registrations.
    pub fn local_count(&self) -> usize {
        self.locals.len()
    }

    /// Release every registration. Close path.
    pub fn clear(&self) {
        self.global.store(None);
        self.locals.clear();
    }
}
