//! Viewtally Web - JSON view-count endpoint
//!
//! Serves the aggregate produced by `viewtally-core` over HTTP with
//! cache-friendly headers and an origin allow-list.

pub mod cors;
pub mod error;
pub mod handlers;
pub mod server;

// Re-export main types
pub use error::ApiError;
pub use server::{AppState, build_router, run_server};
