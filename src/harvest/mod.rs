//! Harvest module - manifest ingestion and index construction.
//!
//! The moving parts, leaf-first:
//! - **Traits**: [`ManifestParser`] format seam
//! - **Formats**: [`formats::ScoopParser`], [`formats::WingetParser`]
//! - **Index**: deduplicating ordered collection via [`PackageIndex`]
//! - **Pipeline**: sequential coordinator via [`pipeline::HarvestPipeline`]

pub mod formats;
pub mod index;
pub mod pipeline;
pub mod traits;

// Re-export commonly used types
pub use index::PackageIndex;
pub use pipeline::{HarvestPipeline, PipelineError, SourceSpec};
pub use traits::{EntryParseError, ManifestParser};
