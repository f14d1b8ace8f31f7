//! Request operations on [`Session`]: the submit-then-suspend bridge.

use tracing::trace;

use super::pending::PendingCall;
use super::reply::AckReply;
use super::reply::AclReply;
use super::reply::ChildrenReply;
use super::reply::ChildrenStatReply;
use super::reply::DataReply;
use super::reply::DecodeReply;
use super::reply::ExistsReply;
use super::reply::NameReply;
use super::reply::StatReply;
use crate::engine::CallReply;
use crate::engine::EngineOp;
use crate::engine::Watch;
use crate::errors::Error;
use crate::errors::PreconditionError;
use crate::record::AclList;
use crate::session::Session;
use crate::watch::WatchFn;
use crate::watch::WatchToken;
use crate::Result;

/// Versions are optional at the API surface; `-1` means "any version".
const ANY_VERSION: i32 = -1;

fn check_path(path: &str) -> Result<String> {
    if path.is_empty() || !path.starts_with('/') {
        return Err(PreconditionError::InvalidPath(path.to_string()).into());
    }
    Ok(path.to_string())
}

fn watch_flag(watch: bool) -> Watch {
    if watch {
        Watch::Session
    } else {
        Watch::None
    }
}

impl Session {
    /// Create a node.
    ///
    /// With the sequence flag set, the returned name is the requested path
    /// extended with a server-assigned numeric suffix.
    pub async fn create(
        &self,
        path: &str,
        value: Option<&[u8]>,
        acl: &AclList,
        flags: i32,
    ) -> Result<NameReply> {
        let op = EngineOp::Create {
            path: check_path(path)?,
            value: value.map(|v| v.to_vec()),
            acl: acl.clone(),
            flags,
        };
        self.round_trip(op, true).await
    }

    pub async fn delete(
        &self,
        path: &str,
        version: Option<i32>,
    ) -> Result<AckReply> {
        let op = EngineOp::Delete {
            path: check_path(path)?,
            version: version.unwrap_or(ANY_VERSION),
        };
        self.round_trip(op, true).await
    }

    /// Check a node's existence. `watch` routes the eventual node event to
    /// the session-wide watcher.
    pub async fn exists(
        &self,
        path: &str,
        watch: bool,
    ) -> Result<ExistsReply> {
        let op = EngineOp::Exists {
            path: check_path(path)?,
            watch: watch_flag(watch),
        };
        self.round_trip(op, true).await
    }

    /// Read a node's value and metadata. A missing node arrives as a nil
    /// value, a zeroed stat and the no-node code.
    pub async fn get(
        &self,
        path: &str,
        watch: bool,
    ) -> Result<DataReply> {
        let op = EngineOp::Get {
            path: check_path(path)?,
            watch: watch_flag(watch),
        };
        self.round_trip(op, true).await
    }

    pub async fn set(
        &self,
        path: &str,
        value: &[u8],
        version: Option<i32>,
    ) -> Result<StatReply> {
        let op = EngineOp::Set {
            path: check_path(path)?,
            value: value.to_vec(),
            version: version.unwrap_or(ANY_VERSION),
        };
        self.round_trip(op, true).await
    }

    pub async fn get_children(
        &self,
        path: &str,
        watch: bool,
    ) -> Result<ChildrenReply> {
        let op = EngineOp::GetChildren {
            path: check_path(path)?,
            watch: watch_flag(watch),
        };
        self.round_trip(op, true).await
    }

    pub async fn get_children2(
        &self,
        path: &str,
        watch: bool,
    ) -> Result<ChildrenStatReply> {
        let op = EngineOp::GetChildren2 {
            path: check_path(path)?,
            watch: watch_flag(watch),
        };
        self.round_trip(op, true).await
    }

    /// Flush the leader channel for `path`.
    pub async fn sync(
        &self,
        path: &str,
    ) -> Result<NameReply> {
        let op = EngineOp::Sync {
            path: check_path(path)?,
        };
        self.round_trip(op, true).await
    }

    pub async fn get_acl(
        &self,
        path: &str,
    ) -> Result<AclReply> {
        let op = EngineOp::GetAcl {
            path: check_path(path)?,
        };
        self.round_trip(op, true).await
    }

    pub async fn set_acl(
        &self,
        path: &str,
        version: Option<i32>,
        acl: &AclList,
    ) -> Result<AckReply> {
        let op = EngineOp::SetAcl {
            path: check_path(path)?,
            version: version.unwrap_or(ANY_VERSION),
            acl: acl.clone(),
        };
        self.round_trip(op, true).await
    }

    /// Attach authentication credentials to the session. Unlike the data
    /// operations this only requires a live handle, not a connected one.
    pub async fn add_auth(
        &self,
        scheme: &str,
        cert: &[u8],
    ) -> Result<AckReply> {
        if scheme.is_empty() {
            return Err(PreconditionError::InvalidArgument("empty auth scheme".to_string()).into());
        }
        let op = EngineOp::AddAuth {
            scheme: scheme.to_string(),
            cert: cert.to_vec(),
        };
        self.round_trip(op, false).await
    }

    /// `exists` with a one-shot local watcher on the path.
    ///
    /// The watch is installed whether or not the node exists, so a missing
    /// node can be awaited into existence.
    pub async fn wexists(
        &self,
        path: &str,
        watcher: WatchFn,
    ) -> Result<ExistsReply> {
        let path = check_path(path)?;
        self.watched_round_trip(watcher, true, move |token| EngineOp::Exists {
            path,
            watch: Watch::Local(token),
        })
        .await
    }

    /// `get` with a one-shot local watcher on the path.
    pub async fn wget(
        &self,
        path: &str,
        watcher: WatchFn,
    ) -> Result<DataReply> {
        let path = check_path(path)?;
        self.watched_round_trip(watcher, false, move |token| EngineOp::Get {
            path,
            watch: Watch::Local(token),
        })
        .await
    }

    /// `get_children` with a one-shot local watcher on the path.
    pub async fn wget_children(
        &self,
        path: &str,
        watcher: WatchFn,
    ) -> Result<ChildrenReply> {
        let path = check_path(path)?;
        self.watched_round_trip(watcher, false, move |token| EngineOp::GetChildren {
            path,
            watch: Watch::Local(token),
        })
        .await
    }

    /// `get_children2` with a one-shot local watcher on the path.
    pub async fn wget_children2(
        &self,
        path: &str,
        watcher: WatchFn,
    ) -> Result<ChildrenStatReply> {
        let path = check_path(path)?;
        self.watched_round_trip(watcher, false, move |token| EngineOp::GetChildren2 {
            path,
            watch: Watch::Local(token),
        })
        .await
    }

    /// Submit one request and suspend until its completion fires.
    ///
    /// The engine lock is released before the suspension, so the driver and
    /// other callers proceed while this call is outstanding. Submissions
    /// reach the engine in caller order; completions may resolve out of
    /// order.
    async fn round_trip<R: DecodeReply>(
        &self,
        op: EngineOp,
        require_connected: bool,
    ) -> Result<R> {
        let name = op.name();
        let reply = self.submit_and_wait(op, require_connected, None).await?;
        R::decode(reply, name)
    }

    /// Variant of [`round_trip`](Self::round_trip) that registers a local
    /// watcher before submission and releases it on every path where the
    /// engine cannot have installed the watch. `keep_on_error` is set for
    /// operations whose watch survives an error completion (`exists` on a
    /// missing node).
    async fn watched_round_trip<R: DecodeReply>(
        &self,
        watcher: WatchFn,
        keep_on_error: bool,
        make_op: impl FnOnce(WatchToken) -> EngineOp,
    ) -> Result<R> {
        let token = self.shared.registry.register_local(watcher);
        let op = make_op(token);
        let name = op.name();
        let reply = match self.submit_and_wait(op, true, Some(token)).await {
            Ok(reply) => reply,
            Err(e) => {
                self.shared.registry.release_local(token);
                return Err(e);
            }
        };
        if !keep_on_error && !reply.code.is_ok() {
            self.shared.registry.release_local(token);
        }
        R::decode(reply, name)
    }

    async fn submit_and_wait(
        &self,
        op: EngineOp,
        require_connected: bool,
        token: Option<WatchToken>,
    ) -> Result<CallReply> {
        let pending = {
            let mut guard = self.shared.engine.lock();
            let engine = guard.as_mut().ok_or(Error::SessionClosed)?;

            if require_connected && !engine.state().is_connected() {
                return Err(PreconditionError::NotConnected.into());
            }

            let (completion, pending) = PendingCall::new();
            trace!(op = op.name(), watch = ?token, "submitting request");
            let code = engine.submit(op, completion);
            if !code.is_ok() {
                // The completion sender was dropped unfired; the pending
                // call is released with it.
                return Err(Error::Submit(code));
            }
            pending
        };

        pending.wait().await
    }
}
