//! Format seam for manifest extraction.

use thiserror::Error;

use crate::model::{PackageRecord, SourceKind};

/// A single manifest entry failed to parse.
///
/// Isolated by the pipeline: the entry is skipped with a warning and the
/// archive scan continues.
#[derive(Error, Debug)]
#[error("cannot parse manifest {path}: {reason}")]
pub struct EntryParseError {
    pub path: String,
    pub reason: String,
}

/// Format-specific manifest recognition and extraction.
///
/// `parse` is handed every archive entry in storage order. `Ok(None)`
/// means the entry is not a relevant manifest (wrong path shape, or a
/// sibling file lacking the target fields) and is silently skipped,
/// since most archive entries are legitimately non-matching. `Err` means
/// the entry matched the relevance test but its content is malformed.
pub trait ManifestParser: Send + Sync {
    /// The ecosystem this parser produces records for.
    fn source(&self) -> SourceKind;

    /// Tests one archive entry for relevance and extracts its record.
    fn parse(&self, path: &str, content: &[u8])
        -> Result<Option<PackageRecord>, EntryParseError>;
}
