//! Session lifecycle: handle construction, the I/O driver loop,
//! reconnection and the connected-state broadcast.
//!
//! A [`Session`] owns one engine session and one spawned driver task. The
//! driver is the only writer of the observed [`SessionState`] and the only
//! task that dispatches watcher callbacks; lifecycle calls (`close`,
//! `set_watcher`) and the call adapter touch the engine through a mutex that
//! is never held across a suspension point.

mod driver;
mod session;
mod settings;

pub use session::*;
pub use settings::*;
