// Test Helper Modules
//
// Shared fixtures for integration and contract tests. Services run against
// an in-memory ledger and a scripted gateway; the Asaas HTTP client itself
// is exercised against wiremock in tests/contract.
//
// Usage (from a test file one directory down):
//   #[path = "../helpers/mod.rs"]
//   mod helpers;
//   use helpers::*;

#![allow(dead_code)]

pub mod fake_gateway;
pub mod harness;
pub mod test_data;

pub use fake_gateway::*;
pub use harness::*;
pub use memory_store::*;
pub use test_data::*;
