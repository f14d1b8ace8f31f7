use tokio::sync::oneshot;

use crate::engine::CallReply;
use crate::engine::Completion;
use crate::errors::Error;
use crate::Result;

/// One in-flight request: a single-writer, single-reader future.
///
/// The [`Completion`] half is handed to the engine at submission time and
/// fired at most once, from inside the driver's processing step. The
/// receiving half is consumed exactly once by the caller that created it.
/// Dropping either half on an early exit path releases the call; the
/// channel itself makes double-signalling unrepresentable.
pub(crate) struct PendingCall {
    rx: oneshot::Receiver<CallReply>,
}

impl PendingCall {
    pub(crate) fn new() -> (Completion, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// Suspend until the completion fires.
    ///
    /// A wake without a written reply means the engine was torn down with
    /// this call outstanding; that surfaces as [`Error::SessionClosed`].
    pub(crate) async fn wait(self) -> Result<CallReply> {
        self.rx.await.map_err(|_| Error::SessionClosed)
    }
}
