// Library root: re-exports all modules so integration tests and the CLI
// can access the crate's public API.

pub mod config;
pub mod ingest;
pub mod player;
pub mod scoring;
pub mod store;
pub mod valuation;
