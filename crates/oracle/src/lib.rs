//! # Doc Scout Oracle
//!
//! Client boundary for the external text-generation service that produces
//! area indexes, file summaries, and relevance verdicts.
//!
//! The rest of the workspace talks to the oracle through the [`Oracle`]
//! trait, so components can run against the HTTP-backed client, the offline
//! stub, or a scripted fake in tests. Every call site drives its retries
//! through a shared [`RetryPolicy`] instead of ad hoc sleep loops.

mod client;
mod error;
pub mod parse;
pub mod prompt;
mod retry;
mod stub;

pub use client::{HttpOracle, HttpOracleConfig, Oracle};
pub use error::{OracleError, Result};
pub use retry::RetryPolicy;
pub use stub::StubOracle;
