//! Repository archive retrieval.
//!
//! This module resolves a repository's default-branch head from its
//! smart-HTTP ref advertisement, downloads the `archive/<rev>.tar.gz`
//! snapshot, and gunzips it in memory. Every request gets one retry
//! through a mirror host before the failure is surfaced.

use std::io::Read;
use std::time::Duration;

use async_trait::async_trait;
use flate2::read::GzDecoder;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default connect timeout per request attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Host prefix rewritten when the primary fetch fails.
pub const PRIMARY_HOST: &str = "https://github.com";

/// Mirror host substituted for [`PRIMARY_HOST`] on retry.
pub const MIRROR_HOST: &str = "https://hub.fastgit.org";

// ============================================================================
// Errors
// ============================================================================

/// Errors that can occur during repository retrieval.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The ref advertisement contains no HEAD pointer
    #[error("cannot resolve default branch head of {repo}")]
    Resolution { repo: String },

    /// Download failed on the primary host and on the mirror
    #[error("download failed for {url}: {reason}")]
    Network { url: String, reason: String },

    /// Downloaded payload is not a valid gzip stream
    #[error("payload from {url} is not a valid gzip stream: {reason}")]
    Format { url: String, reason: String },
}

// ============================================================================
// Fetch Trait
// ============================================================================

/// Retrieval seam for the harvest pipeline.
///
/// The two primitives are deliberately separate so that a caching
/// decorator can memoize each one on its own arguments; see
/// [`CachedFetch`](crate::cache::CachedFetch).
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Resolves the commit id the repository's default branch points at.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Resolution`] if the ref advertisement has no
    /// HEAD pointer, or [`FetchError::Network`] if it cannot be retrieved.
    async fn resolve_head(&self, repo_url: &str) -> Result<String, FetchError>;

    /// Downloads the repository snapshot at `revision` and returns the
    /// decompressed tar bytes.
    async fn fetch_archive(&self, repo_url: &str, revision: &str) -> Result<Vec<u8>, FetchError>;

    /// Convenience combinator: resolve the head, then fetch at it.
    async fn fetch_default_branch(&self, repo_url: &str) -> Result<Vec<u8>, FetchError> {
        let head = self.resolve_head(repo_url).await?;
        self.fetch_archive(repo_url, &head).await
    }
}

// ============================================================================
// HTTP Implementation
// ============================================================================

/// [`Fetch`] implementation backed by `reqwest`.
///
/// Construction is infallible in practice; the underlying client only
/// fails to build if the TLS backend cannot be initialized.
pub struct HttpFetcher {
    client: reqwest::Client,
    /// (primary prefix, mirror prefix) host rewrite applied on retry.
    mirror: (String, String),
}

impl HttpFetcher {
    /// Creates a fetcher with the default connect timeout and the
    /// github.com mirror substitution.
    pub fn new() -> Self {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    /// Creates a fetcher with a custom per-attempt connect timeout.
    pub fn with_connect_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .expect("failed to initialize HTTP client");
        Self {
            client,
            mirror: (PRIMARY_HOST.to_string(), MIRROR_HOST.to_string()),
        }
    }

    /// Overrides the host rewrite pair used for the mirror retry.
    pub fn with_mirror(mut self, primary: impl Into<String>, mirror: impl Into<String>) -> Self {
        self.mirror = (primary.into(), mirror.into());
        self
    }

    /// Rewrites `url` onto the mirror host, if it lives on the primary.
    fn mirror_url(&self, url: &str) -> Option<String> {
        let (primary, mirror) = &self.mirror;
        url.strip_prefix(primary.as_str())
            .map(|rest| format!("{mirror}{rest}"))
    }

    async fn get_once(&self, url: &str) -> Result<Vec<u8>, reqwest::Error> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    /// One GET with a single mirror retry on any failure.
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let primary_err = match self.get_once(url).await {
            Ok(body) => return Ok(body),
            Err(e) => e,
        };

        let Some(mirror_url) = self.mirror_url(url) else {
            return Err(FetchError::Network {
                url: url.to_string(),
                reason: primary_err.to_string(),
            });
        };

        warn!(url, error = %primary_err, "primary fetch failed, retrying via mirror");
        self.get_once(&mirror_url)
            .await
            .map_err(|mirror_err| FetchError::Network {
                url: url.to_string(),
                reason: format!("primary: {primary_err}; mirror: {mirror_err}"),
            })
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn resolve_head(&self, repo_url: &str) -> Result<String, FetchError> {
        let refs_url = format!(
            "{}/info/refs?service=git-upload-pack",
            repo_url.trim_end_matches('/')
        );
        debug!(repo = repo_url, "requesting ref advertisement");
        let body = self.get(&refs_url).await?;

        parse_head_ref(&String::from_utf8_lossy(&body)).ok_or_else(|| FetchError::Resolution {
            repo: repo_url.to_string(),
        })
    }

    async fn fetch_archive(&self, repo_url: &str, revision: &str) -> Result<Vec<u8>, FetchError> {
        let archive_url = format!(
            "{}/archive/{}.tar.gz",
            repo_url.trim_end_matches('/'),
            revision
        );
        info!(repo = repo_url, revision, "downloading archive snapshot");
        let gzip = self.get(&archive_url).await?;

        let mut tarball = Vec::new();
        GzDecoder::new(gzip.as_slice())
            .read_to_end(&mut tarball)
            .map_err(|e| FetchError::Format {
                url: archive_url,
                reason: e.to_string(),
            })?;
        Ok(tarball)
    }
}

// ============================================================================
// Ref Advertisement Parsing
// ============================================================================

/// Extracts the HEAD commit id from a smart-HTTP ref advertisement.
///
/// Pkt-lines look like `<4-hex-len><40-hex-oid> <refname>[\0caps]`; the
/// first ref line is glued to a `0000` flush marker and the HEAD entry
/// carries its capability list after a NUL byte.
fn parse_head_ref(advertisement: &str) -> Option<String> {
    for line in advertisement.lines() {
        if line.contains("# service=") {
            continue;
        }
        let line = line.trim_start_matches("0000");
        if !line.is_char_boundary(4) {
            continue;
        }
        let payload = match line.get(4..) {
            Some(p) if p.len() > 41 && p.is_char_boundary(40) => p,
            _ => continue,
        };
        let (oid, rest) = payload.split_at(40);
        if !oid.bytes().all(|b| b.is_ascii_hexdigit()) {
            continue;
        }
        let Some(refname) = rest.strip_prefix(' ') else {
            continue;
        };
        if refname.split('\0').next().map(str::trim) == Some("HEAD") {
            return Some(oid.to_string());
        }
    }
    None
}

// ============================================================================
// Tests
// ============================================================================
