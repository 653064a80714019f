//! winget manifest parsing.
//!
//! winget splits one package across several sibling YAML files (version,
//! installer, locale manifests); only files carrying both a
//! `PackageIdentifier` and a `PackageUrl` line qualify. Extraction is
//! deliberately line-pattern based rather than structural: the sibling
//! files mix structured and freeform content, and the two target fields
//! are all the index needs.

use regex::Regex;

use crate::harvest::traits::{EntryParseError, ManifestParser};
use crate::model::{PackageRecord, SourceKind};

const MANIFEST_MARKER: &str = "/manifests/";
const MANIFEST_EXT: &str = ".yaml";

/// Parser for winget package manifests.
pub struct WingetParser {
    identifier: Regex,
    url: Regex,
}

impl WingetParser {
    pub fn new() -> Self {
        Self {
            identifier: Regex::new(r"PackageIdentifier:\s*(.+)").expect("valid literal pattern"),
            url: Regex::new(r"PackageUrl:\s*(.*)").expect("valid literal pattern"),
        }
    }

    /// First capture of `pattern`, with trailing CR/whitespace trimmed.
    fn capture(pattern: &Regex, text: &str) -> Option<String> {
        pattern
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().trim_end().to_string())
    }
}

impl Default for WingetParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestParser for WingetParser {
    fn source(&self) -> SourceKind {
        SourceKind::Winget
    }

    fn parse(
        &self,
        path: &str,
        content: &[u8],
    ) -> Result<Option<PackageRecord>, EntryParseError> {
        if !path.contains(MANIFEST_MARKER) || !path.ends_with(MANIFEST_EXT) {
            return Ok(None);
        }

        let text = String::from_utf8_lossy(content);
        // Each extractor is independently optional; sibling manifest
        // files lacking either field are not this package's entry.
        let Some(identifier) = Self::capture(&self.identifier, &text) else {
            return Ok(None);
        };
        let Some(url) = Self::capture(&self.url, &text) else {
            return Ok(None);
        };

        // Finest-grained component of the dotted identifier; the full
        // dotted form stays behind as the broader match token.
        let id = identifier
            .rsplit('.')
            .next()
            .unwrap_or(identifier.as_str())
            .to_string();

        Ok(Some(PackageRecord {
            id,
            keywords: vec![identifier],
            url: Some(url),
            source: SourceKind::Winget,
        }))
    }
}
