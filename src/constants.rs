//! Protocol constant tables exposed to embedders.
//!
//! Numeric values follow the coordination service's C client headers so that
//! codes observed on the wire, in logs and in embedder scripts all agree.

use serde::Deserialize;
use serde::Serialize;

/// Client-side and service-side status codes.
///
/// Negative values in `-1..=-99` are client (system) errors, values in
/// `-100..=-199` are service (API) errors. `Ok` is the only non-error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum Code {
    Ok = 0,

    // System / client errors
    SystemError = -1,
    RuntimeInconsistency = -2,
    DataInconsistency = -3,
    ConnectionLoss = -4,
    MarshallingError = -5,
    Unimplemented = -6,
    OperationTimeout = -7,
    BadArguments = -8,
    InvalidState = -9,

    // API errors
    ApiError = -100,
    NoNode = -101,
    NoAuth = -102,
    BadVersion = -103,
    NoChildrenForEphemerals = -108,
    NodeExists = -110,
    NotEmpty = -111,
    SessionExpired = -112,
    InvalidCallback = -113,
    InvalidAcl = -114,
    AuthFailed = -115,
    Closing = -116,
    Nothing = -117,
    SessionMoved = -118,
}

impl Code {
    pub fn is_ok(&self) -> bool {
        *self == Code::Ok
    }

    /// True for client-side (system) error codes.
    pub fn is_system_error(&self) -> bool {
        let v = *self as i32;
        (-99..0).contains(&v)
    }

    /// True for service-side (API) error codes.
    pub fn is_api_error(&self) -> bool {
        (*self as i32) < -99
    }

    /// Human-readable description, mirroring the engine's error-to-string
    /// function.
    pub fn message(&self) -> &'static str {
        match self {
            Code::Ok => "ok",
            Code::SystemError => "system error",
            Code::RuntimeInconsistency => "runtime inconsistency",
            Code::DataInconsistency => "data inconsistency",
            Code::ConnectionLoss => "connection loss",
            Code::MarshallingError => "marshalling error",
            Code::Unimplemented => "unimplemented",
            Code::OperationTimeout => "operation timeout",
            Code::BadArguments => "bad arguments",
            Code::InvalidState => "invalid zhandle state",
            Code::ApiError => "api error",
            Code::NoNode => "no node",
            Code::NoAuth => "not authenticated",
            Code::BadVersion => "bad version",
            Code::NoChildrenForEphemerals => "no children for ephemerals",
            Code::NodeExists => "node exists",
            Code::NotEmpty => "not empty",
            Code::SessionExpired => "session expired",
            Code::InvalidCallback => "invalid callback",
            Code::InvalidAcl => "invalid acl",
            Code::AuthFailed => "authentication failed",
            Code::Closing => "zookeeper is closing",
            Code::Nothing => "(not error) no server responses to process",
            Code::SessionMoved => "session moved to another server",
        }
    }
}

impl std::fmt::Display for Code {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl TryFrom<i32> for Code {
    type Error = i32;

    fn try_from(value: i32) -> std::result::Result<Self, i32> {
        Ok(match value {
            0 => Code::Ok,
            -1 => Code::SystemError,
            -2 => Code::RuntimeInconsistency,
            -3 => Code::DataInconsistency,
            -4 => Code::ConnectionLoss,
            -5 => Code::MarshallingError,
            -6 => Code::Unimplemented,
            -7 => Code::OperationTimeout,
            -8 => Code::BadArguments,
            -9 => Code::InvalidState,
            -100 => Code::ApiError,
            -101 => Code::NoNode,
            -102 => Code::NoAuth,
            -103 => Code::BadVersion,
            -108 => Code::NoChildrenForEphemerals,
            -110 => Code::NodeExists,
            -111 => Code::NotEmpty,
            -112 => Code::SessionExpired,
            -113 => Code::InvalidCallback,
            -114 => Code::InvalidAcl,
            -115 => Code::AuthFailed,
            -116 => Code::Closing,
            -117 => Code::Nothing,
            -118 => Code::SessionMoved,
            other => return Err(other),
        })
    }
}

/// Connection states as observed by the I/O driver loop.
///
/// `NotConnected` is a driver-side synthetic state recorded before the first
/// handshake completes and again after the transport is rebuilt; `Closed` is
/// terminal and reachable only through an explicit close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum SessionState {
    Closed = 0,
    Connecting = 1,
    Associating = 2,
    Connected = 3,
    ReadOnly = 5,
    NotConnected = 999,
    ExpiredSession = -112,
    AuthFailed = -113,
}

impl SessionState {
    pub fn is_connected(&self) -> bool {
        *self == SessionState::Connected
    }

    /// Terminal-ish states: the engine will not recover from these on its
    /// own.
    pub fn is_unrecoverable(&self) -> bool {
        matches!(
            self,
            SessionState::ExpiredSession | SessionState::AuthFailed | SessionState::Closed
        )
    }
}

/// Watch event types delivered to watcher callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum EventType {
    Created = 1,
    Deleted = 2,
    Changed = 3,
    Child = 4,
    Session = -1,
    NotWatching = -2,
}

/// Node permission bits used in ACL entries.
pub mod perm {
    pub const READ: u32 = 1 << 0;
    pub const WRITE: u32 = 1 << 1;
    pub const CREATE: u32 = 1 << 2;
    pub const DELETE: u32 = 1 << 3;
    pub const ADMIN: u32 = 1 << 4;
    pub const ALL: u32 = READ | WRITE | CREATE | DELETE | ADMIN;
}

/// Node creation flags accepted by `create`.
pub mod create_flag {
    pub const EPHEMERAL: i32 = 1 << 0;
    pub const SEQUENCE: i32 = 1 << 1;
}

/// Engine log verbosity levels, mapped onto `tracing` levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum LogLevel {
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
}

impl LogLevel {
    pub fn as_tracing(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
        }
    }
}
