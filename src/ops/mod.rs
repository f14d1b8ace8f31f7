//! The call adapter: synchronous-style request operations over the
//! engine's asynchronous submission surface.
//!
//! Every operation follows one pattern: validate, allocate a
//! [`PendingCall`](pending::PendingCall), submit, suspend, decode. Exactly
//! one of {synchronous error, one asynchronous completion} is observed per
//! request — never both, never neither.

mod adapter;
mod pending;
mod reply;

pub use reply::*;
