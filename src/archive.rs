//! Structural tar unpacking.
//!
//! Purely mechanical: yields each entry's path and raw content in
//! archive-storage order, in memory, with no filtering and no
//! interpretation of the content.

use std::io::{Cursor, Read};

use thiserror::Error;

/// Errors that can occur while reading an archive stream.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The byte stream is not a well-formed tar archive
    #[error("malformed archive stream: {0}")]
    Format(#[from] std::io::Error),
}

/// Single-pass reader over an in-memory tarball.
pub struct TarballReader {
    inner: tar::Archive<Cursor<Vec<u8>>>,
}

impl TarballReader {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            inner: tar::Archive::new(Cursor::new(bytes)),
        }
    }

    /// Iterates the archive entries as owned `(path, content)` pairs.
    ///
    /// The sequence is finite, single-pass, and non-restartable; calling
    /// this twice on the same reader is not supported.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Format`] if the header block is invalid;
    /// individual items yield `Err` if an entry is truncated or its
    /// header cannot be decoded.
    pub fn entries(
        &mut self,
    ) -> Result<impl Iterator<Item = Result<(String, Vec<u8>), ArchiveError>> + '_, ArchiveError>
    {
        let entries = self.inner.entries()?;
        Ok(entries.map(|entry| {
            let mut entry = entry?;
            let path = entry.path()?.to_string_lossy().into_owned();
            let mut content = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut content)?;
            Ok((path, content))
        }))
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    /// Builds an in-memory tarball from (path, content) pairs.
    pub(crate) fn tarball(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *content).unwrap();
        }
        builder.into_inner().unwrap()
    }
}
