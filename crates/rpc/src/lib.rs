//! HTTP control surface
//!
//! Exposes vendor lookups and registry maintenance over a small JSON API.

pub mod server;

pub use server::{build_router, start_server, AppState};
