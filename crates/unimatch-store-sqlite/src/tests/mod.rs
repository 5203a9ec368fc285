//! Integration tests for `SqliteStore` and for `MatchEngine` running on it.

mod engine;
mod support;
