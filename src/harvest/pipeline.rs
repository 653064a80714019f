//! Harvest pipeline coordinator.
//!
//! Drives each configured source repository through
//! fetch → read entries → parse → admit, strictly sequentially:
//! repositories in configuration order, entries in archive-storage
//! order. Both orderings are load-bearing: identifier collisions are
//! resolved in favor of the earlier source, so one repository is fully
//! drained before the next begins.

use thiserror::Error;
use tracing::{info, warn};

use crate::archive::{ArchiveError, TarballReader};
use crate::fetch::{Fetch, FetchError};
use crate::harvest::index::PackageIndex;
use crate::harvest::traits::ManifestParser;
use crate::model::PackageRecord;

// ============================================================================
// Pipeline Types
// ============================================================================

/// One source repository and the parser that understands its manifests.
pub struct SourceSpec {
    /// Repository base URL, e.g. `https://github.com/ScoopInstaller/Main`.
    pub repo_url: String,

    /// Format-specific manifest parser for this repository.
    pub parser: Box<dyn ManifestParser>,
}

impl SourceSpec {
    pub fn new(repo_url: impl Into<String>, parser: impl ManifestParser + 'static) -> Self {
        Self {
            repo_url: repo_url.into(),
            parser: Box::new(parser),
        }
    }
}

/// Errors that abort a run, naming the failing repository and stage.
///
/// Per-entry parse failures never reach this level; they are logged and
/// skipped inside the scan.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Head resolution or archive download failed for a repository
    #[error("retrieval failed for {repo}: {source}")]
    Fetch {
        repo: String,
        #[source]
        source: FetchError,
    },

    /// The downloaded archive is not a valid tar stream
    #[error("archive scan failed for {repo}: {source}")]
    Archive {
        repo: String,
        #[source]
        source: ArchiveError,
    },
}

// ============================================================================
// Pipeline Executor
// ============================================================================

/// Sequential harvest over an ordered list of source repositories.
///
/// The pipeline owns nothing but configuration; each [`run`] builds a
/// fresh [`PackageIndex`], so the same pipeline can run repeatedly and,
/// given unchanged upstream revisions, produce identical collections.
///
/// [`run`]: HarvestPipeline::run
pub struct HarvestPipeline<F: Fetch> {
    fetcher: F,
    sources: Vec<SourceSpec>,
}

impl<F: Fetch> HarvestPipeline<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            sources: Vec::new(),
        }
    }

    /// Appends a source repository. Configuration order is processing
    /// order, and earlier sources win identifier ties.
    pub fn with_source(mut self, source: SourceSpec) -> Self {
        self.sources.push(source);
        self
    }

    /// Executes the full harvest and returns the deduplicated, ordered
    /// record collection.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if any repository's retrieval or archive
    /// scan fails. A run with a silently missing source would be worse
    /// than a hard failure, so there is no partial output.
    pub async fn run(&self) -> Result<Vec<PackageRecord>, PipelineError> {
        let mut index = PackageIndex::new();

        for source in &self.sources {
            self.harvest_source(source, &mut index).await?;
        }

        info!(records = index.len(), "harvest complete");
        Ok(index.into_records())
    }

    async fn harvest_source(
        &self,
        source: &SourceSpec,
        index: &mut PackageIndex,
    ) -> Result<(), PipelineError> {
        let repo = source.repo_url.as_str();
        info!(repo, ecosystem = %source.parser.source(), "retrieving repository");

        let fetch_stage = |e| PipelineError::Fetch {
            repo: repo.to_string(),
            source: e,
        };
        let head = self.fetcher.resolve_head(repo).await.map_err(fetch_stage)?;
        let tarball = self
            .fetcher
            .fetch_archive(repo, &head)
            .await
            .map_err(fetch_stage)?;

        let archive_stage = |e| PipelineError::Archive {
            repo: repo.to_string(),
            source: e,
        };
        let mut admitted = 0usize;
        let mut reader = TarballReader::new(tarball);
        for entry in reader.entries().map_err(archive_stage)? {
            let (path, content) = entry.map_err(archive_stage)?;
            match source.parser.parse(&path, &content) {
                Ok(Some(record)) => {
                    if index.admit(record) {
                        admitted += 1;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "skipping malformed manifest"),
            }
        }

        info!(repo, admitted, "repository drained");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
