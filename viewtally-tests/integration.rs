//! Integration tests for Viewtally
//!
//! These tests drive the aggregator through corpus files on disk and a
//! scripted provider transport, checking request shapes and the summary
//! returned for whole-corpus scenarios.

#[path = "integration/fixtures.rs"]
mod fixtures;

#[path = "integration/aggregation_scenarios.rs"]
mod aggregation_scenarios;

#[path = "integration/corpus_strategies.rs"]
mod corpus_strategies;
