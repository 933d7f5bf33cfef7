//! # Doc Scout Publisher
//!
//! Decides whether locally rebuilt cache artifacts are safe to push to the
//! shared branch, then performs a selective, best-effort publish.
//!
//! The hazard it guards against: a branch that diverged from the shared
//! branch holds indexes built from older documentation, and pushing them
//! wholesale would overwrite newer shared state. When the local branch is
//! strictly ahead the whole index root is published; when it has diverged,
//! area indexes are refused and only summaries whose source file is
//! byte-identical on the shared branch remain eligible.
//!
//! Publication is an optimization, never a requirement. Every failure path
//! logs and reports [`PublishOutcome::NotPublished`] instead of propagating
//! an error.

mod publisher;

pub use publisher::{CachePublisher, PublishConfig, PublishOutcome};
