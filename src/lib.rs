pub mod archive;
pub mod cache;
pub mod fetch;
pub mod harvest;
pub mod model;

// Re-export common types for convenience
pub use archive::{ArchiveError, TarballReader};
pub use cache::{CacheError, CacheStore, CachedFetch};
pub use fetch::{Fetch, FetchError, HttpFetcher};
pub use harvest::{HarvestPipeline, PackageIndex, PipelineError, SourceSpec};
pub use model::{PackageRecord, SourceKind};
