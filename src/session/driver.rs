//! The I/O driver loop: one long-running task per session.
//!
//! Each iteration queries the engine for its transport interest, waits for
//! readiness (or the engine's suggested timeout), then drives one engine
//! processing step. Queued request completions and watcher callbacks fire
//! from inside that step, on this task. A dead transport routes through the
//! reconnection path with a cooperative backoff sleep; persistent transport
//! failure is never fatal to the process.

use std::sync::Arc;

use tokio::time::sleep;
use tracing::debug;
use tracing::error;
use tracing::trace;
use tracing::warn;

use super::SessionShared;
use crate::constants::SessionState;
use crate::engine::InterestSet;
use crate::engine::ReadySet;

/// Translate engine interest bits into transport readiness bits.
pub(crate) fn wanted_readiness(wants: InterestSet) -> ReadySet {
    ReadySet {
        readable: wants.read,
        writable: wants.write,
    }
}

/// Translate satisfied readiness bits back into engine event bits.
pub(crate) fn satisfied_events(ready: ReadySet) -> InterestSet {
    InterestSet {
        read: ready.readable,
        write: ready.writable,
    }
}

pub(crate) async fn run(shared: Arc<SessionShared>) {
    loop {
        let interest = {
            let mut guard = shared.engine.lock();
            let Some(engine) = guard.as_mut() else {
                break;
            };
            match engine.interest() {
                Ok(interest) => interest,
                Err(code) => {
                    error!(code = %code, "engine interest query failed, stopping driver");
                    break;
                }
            }
        };

        let Some(transport) = interest.transport else {
            // No usable descriptor: the transport is dead.
            warn!(
                backoff = ?shared.settings.reconnect_backoff,
                "transport lost, reconnecting"
            );
            reconnect(&shared);
            tokio::select! {
                biased;
                _ = shared.cancel.cancelled() => break,
                _ = sleep(shared.settings.reconnect_backoff) => {}
            }
            continue;
        };

        let wanted = wanted_readiness(interest.wants);
        let ready = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => break,
            ready = transport.ready(wanted, interest.timeout) => ready,
        };

        // Cancellation observed on wake terminates the loop immediately.
        if shared.cancel.is_cancelled() {
            break;
        }

        if ready.is_empty() {
            // Timeout wake: re-poll without driving the engine.
            trace!("readiness wait timed out, re-polling");
            continue;
        }

        let signals = {
            let mut guard = shared.engine.lock();
            let Some(engine) = guard.as_mut() else {
                break;
            };
            let signals = engine.process(satisfied_events(ready));

            let state = engine.state();
            let changed = shared.state_tx.send_if_modified(|last| {
                if *last == state {
                    false
                } else {
                    *last = state;
                    true
                }
            });
            if changed {
                debug!(?state, "session state changed");
            }

            signals
        };

        // Dispatch after releasing the engine lock, still on this task, so
        // at most one watcher callback runs at a time per session.
        for signal in signals {
            shared.registry.dispatch(signal);
        }
    }
    debug!("session driver finished");
}

/// Rebuild the engine session after transport loss.
///
/// The replacement reuses the original settings — credentials included — so
/// the service can resume the session, and inherits the session-wide watch
/// interest when a global watcher is registered. The caller sleeps the
/// configured backoff before polling again.
fn reconnect(shared: &SessionShared) {
    let mut guard = shared.engine.lock();
    let Some(engine) = guard.as_mut() else {
        return;
    };
    engine.close();

    match shared.connector.connect(&shared.settings) {
        Ok(mut fresh) => {
            fresh.watch_session_events(shared.registry.has_global());
            *guard = Some(fresh);
            shared.state_tx.send_if_modified(|last| {
                if *last == SessionState::NotConnected {
                    false
                } else {
                    *last = SessionState::NotConnected;
                    true
                }
            });
        }
        Err(code) => {
            // Retried after the backoff; the closed engine keeps reporting
            // a dead transport until a connect succeeds.
            error!(code = %code, "reconnect failed");
        }
    }
}
