//! Core types and the match-formation engine for unimatch.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::MatchStore`]; the [`engine::MatchEngine`]
//! layers the ledger, pairing and query rules on top of any backend.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod engine;
pub mod error;
pub mod interaction;
pub mod matching;
pub mod profile;
pub mod store;
pub mod wire;

pub use error::{Error, ErrorKind, Result};
