use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;

use super::driver;
use super::SessionSettings;
use crate::constants::Code;
use crate::constants::SessionState;
use crate::engine::EngineConnector;
use crate::engine::SessionEngine;
use crate::errors::Error;
use crate::record::SessionId;
use crate::watch::WatchFn;
use crate::watch::WatchRegistry;
use crate::Result;

/// State shared between the session handle, the driver task and the call
/// adapter.
pub(crate) struct SessionShared {
    /// The engine slot. `None` once the session is closed. Never held
    /// across a suspension point.
    pub(crate) engine: Mutex<Option<Box<dyn SessionEngine>>>,

    pub(crate) connector: Arc<dyn EngineConnector>,

    pub(crate) settings: SessionSettings,

    pub(crate) registry: WatchRegistry,

    /// Last state observed by the driver; doubles as the connected
    /// broadcast. Written only by the driver and by `close`.
    pub(crate) state_tx: watch::Sender<SessionState>,

    /// Cooperative shutdown signal for the driver loop.
    pub(crate) cancel: CancellationToken,
}

/// A connection to the coordination service.
///
/// Construction establishes the engine session synchronously and spawns the
/// I/O driver task; must therefore run inside a tokio runtime. Request
/// operations live in the call adapter (`ops`); this type carries the
/// lifecycle surface.
pub struct Session {
    pub(crate) shared: Arc<SessionShared>,

    /// Driver task handle, taken by `close`.
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl Session {
    /// Establish a session and start driving it.
    ///
    /// The engine session is constructed synchronously through `connector`;
    /// the initial observed state is `NotConnected` until the driver pumps
    /// the handshake.
    ///
    /// # Errors
    /// - [`Error::Precondition`] for malformed settings
    /// - [`Error::Connect`] when the engine refuses the session
    pub fn init(
        settings: SessionSettings,
        connector: Arc<dyn EngineConnector>,
    ) -> Result<Self> {
        settings.validate()?;

        let engine = connector.connect(&settings).map_err(Error::Connect)?;
        info!(hosts = %settings.hosts, "engine session established");

        let (state_tx, _) = watch::channel(SessionState::NotConnected);
        let shared = Arc::new(SessionShared {
            engine: Mutex::new(Some(engine)),
            connector,
            settings,
            registry: WatchRegistry::new(),
            state_tx,
            cancel: CancellationToken::new(),
        });

        let driver = tokio::spawn(driver::run(shared.clone()));

        Ok(Self {
            shared,
            driver: Mutex::new(Some(driver)),
        })
    }

    /// Last session state observed by the driver loop (not a live query).
    pub fn state(&self) -> SessionState {
        *self.shared.state_tx.borrow()
    }

    /// Suspend until the driver observes the connected state.
    ///
    /// Returns immediately when already connected. All concurrent waiters
    /// wake on one transition; their resumption order is unspecified.
    ///
    /// # Errors
    /// - [`Error::WaitTimeout`] when `timeout` elapses first
    /// - [`Error::SessionClosed`] when the session closes while waiting
    pub async fn wait_connected(
        &self,
        timeout: Option<std::time::Duration>,
    ) -> Result<()> {
        let mut rx = self.shared.state_tx.subscribe();
        let reached = rx.wait_for(|state| {
            matches!(state, SessionState::Connected | SessionState::Closed)
        });

        let observed = match timeout {
            Some(limit) => tokio::time::timeout(limit, reached)
                .await
                .map_err(|_| Error::WaitTimeout)?,
            None => reached.await,
        };

        match observed {
            Ok(state) if state.is_connected() => Ok(()),
            // Reached `Closed`, or the sender disappeared underneath us.
            _ => Err(Error::SessionClosed),
        }
    }

    /// Identity of the current session, usable to resume it later.
    pub fn client_id(&self) -> Result<SessionId> {
        let guard = self.shared.engine.lock();
        let engine = guard.as_ref().ok_or(Error::SessionClosed)?;
        Ok(engine.session_id())
    }

    /// Install, replace or clear the session-wide watcher.
    ///
    /// Replacement is atomic: the new registration is fully built before
    /// the old one is released, so an in-flight dispatch never observes a
    /// half-updated registration.
    pub fn set_watcher(
        &self,
        callback: Option<WatchFn>,
    ) {
        self.shared.registry.set_global(callback);
        if let Some(engine) = self.shared.engine.lock().as_mut() {
            engine.watch_session_events(self.shared.registry.has_global());
        }
    }

    /// Tear the session down.
    ///
    /// Cancels the driver, closes the engine (idempotent: a second call is
    /// a no-op returning `Ok`), releases every watcher registration and
    /// records the terminal `Closed` state. In-flight requests wake with
    /// [`Error::SessionClosed`].
    pub async fn close(&self) -> Result<Code> {
        self.shared.cancel.cancel();

        let driver = self.driver.lock().take();
        if let Some(driver) = driver {
            if let Err(e) = driver.await {
                error!("driver task join failed: {:?}", e);
            }
        }

        let engine = self.shared.engine.lock().take();
        let code = match engine {
            Some(mut engine) => engine.close(),
            None => Code::Ok,
        };

        self.shared.registry.clear();
        self.shared.state_tx.send_replace(SessionState::Closed);
        debug!(code = %code, "session closed");
        Ok(code)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // A dropped handle must not leave the driver task running.
        self.shared.cancel.cancel();
    }
}
