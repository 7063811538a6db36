//! HTTP request handlers

pub mod viewcount;

// Re-export handler functions
pub use viewcount::{healthz, viewcount, viewcount_head, viewcount_preflight};
