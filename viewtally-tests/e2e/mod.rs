//! End-to-end tests for Viewtally
//!
//! These tests send HTTP requests through the full axum router, from CORS
//! handling down to the scripted provider transport.

#[path = "../integration/fixtures.rs"]
mod fixtures;

mod viewcount_endpoint;
