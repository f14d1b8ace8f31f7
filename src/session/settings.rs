use std::time::Duration;

use rand::seq::SliceRandom;
use serde::Deserialize;
use serde::Serialize;

use crate::errors::PreconditionError;
use crate::record::SessionId;
use crate::Result;

/// Connection settings, fixed for the life of a session.
///
/// Reconnection reuses these verbatim — including `credentials` — so the
/// service can resume the existing session when it is still valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Comma-separated `host:port` list.
    pub hosts: String,

    /// Receive timeout negotiated with the service.
    pub recv_timeout: Duration,

    /// Session identity to resume, if any.
    pub credentials: Option<SessionId>,

    /// Engine creation flags (e.g. read-only session allowed).
    pub flags: i32,

    /// Pause between reconnection attempts after the transport dies.
    pub reconnect_backoff: Duration,

    /// When false (the default), the host list is shuffled before each
    /// connect so clients spread across the ensemble.
    pub deterministic_conn_order: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            hosts: String::new(),
            recv_timeout: Duration::from_millis(5000),
            credentials: None,
            flags: 0,
            reconnect_backoff: Duration::from_secs(1),
            deterministic_conn_order: false,
        }
    }
}

impl SessionSettings {
    pub fn new(
        hosts: impl Into<String>,
        recv_timeout: Duration,
    ) -> Self {
        Self {
            hosts: hosts.into(),
            recv_timeout,
            ..Default::default()
        }
    }

    pub fn with_credentials(
        mut self,
        credentials: SessionId,
    ) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_flags(
        mut self,
        flags: i32,
    ) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_reconnect_backoff(
        mut self,
        backoff: Duration,
    ) -> Self {
        self.reconnect_backoff = backoff;
        self
    }

    pub fn with_deterministic_conn_order(
        mut self,
        deterministic: bool,
    ) -> Self {
        self.deterministic_conn_order = deterministic;
        self
    }

    /// Host list in connection order. Shuffled unless deterministic order
    /// was requested.
    pub fn connect_hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = self
            .hosts
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .collect();
        if !self.deterministic_conn_order {
            hosts.shuffle(&mut rand::thread_rng());
        }
        hosts
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.connect_hosts().is_empty() {
            return Err(
                PreconditionError::InvalidArgument("empty host list".to_string()).into(),
            );
        }
        if self.recv_timeout.is_zero() {
            return Err(
                PreconditionError::InvalidArgument("zero receive timeout".to_string()).into(),
            );
        }
        if let Some(credentials) = &self.credentials {
            if !credentials.is_valid() {
                return Err(PreconditionError::InvalidArgument(
                    "session secret exceeds 16 bytes".to_string(),
                )
                .into());
            }
        }
        Ok(())
    }
}
