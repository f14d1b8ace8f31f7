//! The engine abstraction layer: the boundary to the coordination-service
//! client library.
//!
//! This crate does not implement the wire protocol. It drives an external
//! *engine* that owns the session and the socket, exposed here as three trait
//! seams:
//!
//! - [`EngineConnector`] establishes a session (initial connect and every
//!   reconnect, replaying the same [`SessionId`] so the service can resume
//!   the session).
//! - [`SessionEngine`] is the interest/process state machine plus the
//!   per-operation asynchronous submission surface.
//! - [`Transport`] is the readiness wait on the engine's descriptor, kept
//!   separate so the driver can await it without holding the engine lock.
//!
//! Completions are delivered by the engine during [`SessionEngine::process`]
//! through the oneshot [`Completion`] sender handed over at submission time;
//! watcher callbacks surface as [`WatchSignal`]s returned from the same call.

// Trait definition of the current module
// -----------------------------------------------------------------------------

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::sync::oneshot;

use crate::constants::Code;
use crate::constants::EventType;
use crate::constants::SessionState;
use crate::record::AclList;
use crate::record::SessionId;
use crate::record::Stat;
use crate::session::SessionSettings;
use crate::watch::WatchToken;

/// Engine-side interest bits, as reported by the interest query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterestSet {
    pub read: bool,
    pub write: bool,
}

impl InterestSet {
    pub fn is_empty(&self) -> bool {
        !self.read && !self.write
    }
}

/// Transport-side readiness bits, as satisfied by the readiness wait.
///
/// Deliberately a distinct type from [`InterestSet`]: the driver loop
/// translates between the two vocabularies on every iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadySet {
    pub readable: bool,
    pub writable: bool,
}

impl ReadySet {
    /// An empty set is how a readiness wait reports a timeout.
    pub fn is_empty(&self) -> bool {
        !self.readable && !self.writable
    }
}

/// Result of one interest query: where to wait, for what, and for how long.
///
/// `transport: None` means the engine currently has no usable descriptor;
/// the driver treats the transport as dead and takes the reconnection path.
#[derive(Clone)]
pub struct Interest {
    pub transport: Option<Arc<dyn Transport>>,
    pub wants: InterestSet,
    pub timeout: Duration,
}

/// Readiness wait on the engine's transport descriptor.
///
/// Implementations must be cancel-safe: the driver races this wait against
/// its cancellation token.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Wait until any of the `wanted` bits is satisfied or `timeout`
    /// elapses. An empty [`ReadySet`] signals the timeout case.
    async fn ready(
        &self,
        wanted: ReadySet,
        timeout: Duration,
    ) -> ReadySet;
}

/// Watch registration carried inside a read request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Watch {
    /// No watch.
    None,
    /// Route the eventual event to the session-wide (global) watcher.
    Session,
    /// Route the eventual event to the one-shot local watcher behind this
    /// token.
    Local(WatchToken),
}

/// One asynchronous request, with the fixed argument set of its operation.
#[derive(Debug, Clone)]
pub enum EngineOp {
    Create {
        path: String,
        value: Option<Vec<u8>>,
        acl: AclList,
        flags: i32,
    },
    Delete {
        path: String,
        version: i32,
    },
    Exists {
        path: String,
        watch: Watch,
    },
    Get {
        path: String,
        watch: Watch,
    },
    Set {
        path: String,
        value: Vec<u8>,
        version: i32,
    },
    GetChildren {
        path: String,
        watch: Watch,
    },
    GetChildren2 {
        path: String,
        watch: Watch,
    },
    Sync {
        path: String,
    },
    GetAcl {
        path: String,
    },
    SetAcl {
        path: String,
        version: i32,
        acl: AclList,
    },
    AddAuth {
        scheme: String,
        cert: Vec<u8>,
    },
}

impl EngineOp {
    /// Operation name for logs and invariant-violation reports.
    pub fn name(&self) -> &'static str {
        match self {
            EngineOp::Create { .. } => "create",
            EngineOp::Delete { .. } => "delete",
            EngineOp::Exists { .. } => "exists",
            EngineOp::Get { .. } => "get",
            EngineOp::Set { .. } => "set",
            EngineOp::GetChildren { .. } => "get_children",
            EngineOp::GetChildren2 { .. } => "get_children2",
            EngineOp::Sync { .. } => "sync",
            EngineOp::GetAcl { .. } => "get_acl",
            EngineOp::SetAcl { .. } => "set_acl",
            EngineOp::AddAuth { .. } => "add_auth",
        }
    }
}

/// The decoded result of one completed request.
///
/// Engines must always produce the payload shape matching the submitted
/// operation, zeroed/`None` on error completions, so the adapter can decode
/// uniformly and treat any shape mismatch as an invariant violation.
#[derive(Debug, Clone, PartialEq)]
pub struct CallReply {
    pub code: Code,
    pub payload: Payload,
}

/// Generic result slot, one variant per completion shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Status only (delete, set_acl, add_auth).
    None,
    /// Value bytes plus metadata (get).
    Data { value: Option<Vec<u8>>, stat: Stat },
    /// Existence flag plus metadata (exists).
    Exists { exists: bool, stat: Stat },
    /// Metadata only (set).
    Stat { stat: Stat },
    /// Name string (create, sync).
    Name { name: Option<String> },
    /// Name list (get_children).
    Children { children: Option<Vec<String>> },
    /// Name list plus metadata (get_children2).
    ChildrenStat {
        children: Option<Vec<String>>,
        stat: Stat,
    },
    /// Permission list plus metadata (get_acl).
    AclStat { acl: Option<AclList>, stat: Stat },
}

/// Single-use completion sender: the write side of one PendingCall.
pub type Completion = oneshot::Sender<CallReply>;

/// One watcher callback surfaced by a processing step.
///
/// `token: None` addresses the session-wide global watcher; `Some` addresses
/// the one-shot local watcher registered with that token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSignal {
    pub token: Option<WatchToken>,
    pub event_type: EventType,
    pub state: SessionState,
    pub path: String,
}

/// The asynchronous client engine for one established session.
///
/// All methods are synchronous and non-blocking; the only awaiting happens
/// on the [`Transport`] returned by [`interest`](SessionEngine::interest).
/// Queued completions and watcher callbacks fire exclusively inside
/// [`process`](SessionEngine::process).
pub trait SessionEngine: Send {
    /// Query `{transport, interest bits, suggested timeout}` for the next
    /// wait. A hard engine failure here terminates the driver loop.
    fn interest(&mut self) -> std::result::Result<Interest, Code>;

    /// Drive one processing step with the satisfied event bits. Fires queued
    /// completions through their [`Completion`] senders and returns the
    /// watcher signals raised by this step, in occurrence order.
    fn process(
        &mut self,
        events: InterestSet,
    ) -> Vec<WatchSignal>;

    /// Current session state (live query; the driver records it per step).
    fn state(&self) -> SessionState;

    /// Identity of the current session, for resumption across reconnects.
    fn session_id(&self) -> SessionId;

    /// Hand one request to the engine. A non-ok return means the request
    /// was rejected synchronously and `completion` was dropped unfired.
    fn submit(
        &mut self,
        op: EngineOp,
        completion: Completion,
    ) -> Code;

    /// Enable or disable delivery of session-wide watch events (the
    /// engine-side half of global watcher installation).
    fn watch_session_events(
        &mut self,
        enabled: bool,
    );

    /// Tear the session down. Idempotent; pending completions are dropped,
    /// which wakes their callers with a closed error.
    fn close(&mut self) -> Code;
}

/// Session factory: initial connect and reconnect share this seam.
#[cfg_attr(test, automock)]
pub trait EngineConnector: Send + Sync {
    /// Establish an engine session from the given settings. Host order is
    /// expected to come from [`SessionSettings::connect_hosts`].
    fn connect(
        &self,
        settings: &SessionSettings,
    ) -> std::result::Result<Box<dyn SessionEngine>, Code>;
}
