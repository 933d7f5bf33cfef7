//! # Doc Scout Index
//!
//! Incremental semantic-index cache over a documentation tree.
//!
//! ## Pipeline
//!
//! ```text
//! Docs root
//!     │
//!     ├──> Area Scanner (top-level doc folders)
//!     │      └─> DocArea { name, files }
//!     │
//!     ├──> Folder Manifest (per-area digest maps)
//!     │      └─> stale / fresh decision
//!     │
//!     └──> Build Orchestrator (bounded worker pool)
//!            └─> Index Builder ──> oracle ──> *.index.md
//! ```
//!
//! An area is rebuilt only when its current file→digest map differs from the
//! stored one; anything else is skipped entirely, so a warm run performs
//! zero oracle calls.

mod areas;
mod builder;
mod error;
mod fingerprint;
mod manifest;
mod orchestrator;
mod store;
mod summary;

pub use areas::{AreaScanner, DocArea, DOC_EXTENSIONS};
pub use builder::{IndexBuilder, BuilderLimits};
pub use error::{IndexError, Result};
pub use fingerprint::{digest_bytes, digest_file};
pub use manifest::{
    area_doc_hashes, is_stale, unix_now_ms, FolderManifest, FolderManifestEntry, ManifestStore,
    MANIFEST_VERSION,
};
pub use orchestrator::{AreaStatus, BuildConfig, BuildOrchestrator, BuildReport};
pub use store::IndexStore;
pub use summary::{SummaryCache, SummaryManifest, SummaryManifestEntry};
