//! HTTP API surface
//!
//! The presentation contract: resource endpoints for the observable
//! state plus the SSE stream of change events.

pub mod auth;
pub mod comments;
pub mod health;
pub mod locations;
pub mod sse;
