//! Scoop bucket manifest parsing.
//!
//! A relevant entry lives under a `bucket/` directory with a `.json`
//! extension; its identifier is the path slice between the two. The
//! reference URL comes from an ordered candidate chain over the
//! `checkver`, `github`, and `homepage` fields, and keyword tokens are
//! derived from the manifest's `bin` entries.

use serde_json::Value;

use crate::harvest::traits::{EntryParseError, ManifestParser};
use crate::model::{PackageRecord, SourceKind};

const BUCKET_MARKER: &str = "/bucket/";
const MANIFEST_EXT: &str = ".json";

/// Checkver URLs with these suffixes point at version data files, not at
/// pages worth linking; the homepage wins instead.
const DATA_FILE_SUFFIXES: [&str; 4] = [".json", ".yaml", ".yml", ".txt"];

/// Parser for Scoop bucket manifests.
pub struct ScoopParser;

impl ScoopParser {
    /// Identifier between the `/bucket/` marker and the last `.json`.
    fn manifest_id(path: &str) -> Option<&str> {
        let start = path.find(BUCKET_MARKER)? + BUCKET_MARKER.len();
        let end = path.rfind(MANIFEST_EXT)?;
        path.get(start..end)
    }
}

impl ManifestParser for ScoopParser {
    fn source(&self) -> SourceKind {
        SourceKind::Scoop
    }

    fn parse(
        &self,
        path: &str,
        content: &[u8],
    ) -> Result<Option<PackageRecord>, EntryParseError> {
        let Some(id) = Self::manifest_id(path) else {
            return Ok(None);
        };

        let manifest: Value =
            serde_json::from_slice(content).map_err(|e| EntryParseError {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        let mut keywords = vec![id.to_string()];
        collect_bin_keywords(&manifest, &mut keywords);

        Ok(Some(PackageRecord {
            id: id.to_string(),
            keywords,
            url: best_url(&manifest),
            source: SourceKind::Scoop,
        }))
    }
}

/// Resolves the most stable reference URL out of the manifest's
/// candidate fields.
///
/// - `checkver` as a plain string: the version check scrapes the
///   homepage, so the homepage is the reference.
/// - `checkver` as an object: its own `url`, else the `github` field,
///   else the homepage; a winner with a data-file suffix is discarded
///   in favor of the homepage.
/// - No `checkver`: the homepage, or nothing.
fn best_url(manifest: &Value) -> Option<String> {
    let homepage = || manifest.get("homepage").and_then(Value::as_str);

    let candidate = match manifest.get("checkver") {
        Some(Value::String(_)) => homepage(),
        Some(Value::Object(checkver)) => {
            let chain = [
                checkver.get("url").and_then(Value::as_str),
                manifest.get("github").and_then(Value::as_str),
                homepage(),
            ];
            match chain.into_iter().flatten().next() {
                Some(url) if DATA_FILE_SUFFIXES.iter().any(|s| url.ends_with(s)) => homepage(),
                other => other,
            }
        }
        _ => None,
    };

    candidate.or_else(homepage).map(str::to_string)
}

/// Appends the extensionless basename of every `bin` entry.
///
/// `bin` may be a single string or an arbitrarily nested array of
/// strings (aliased shims carry `[path, alias, args]` triples).
fn collect_bin_keywords(manifest: &Value, keywords: &mut Vec<String>) {
    match manifest.get("bin") {
        Some(Value::String(bin)) => keywords.push(bin_basename(bin)),
        Some(Value::Array(bins)) => flatten_bins(bins, keywords),
        _ => {}
    }
}

fn flatten_bins(values: &[Value], keywords: &mut Vec<String>) {
    for value in values {
        match value {
            Value::String(bin) => keywords.push(bin_basename(bin)),
            Value::Array(nested) => flatten_bins(nested, keywords),
            _ => {}
        }
    }
}

/// Base filename with the last extension stripped, after normalizing
/// Windows path separators.
fn bin_basename(bin: &str) -> String {
    let normalized = bin.replace('\\', "/");
    let base = normalized.rsplit('/').next().unwrap_or(&normalized);
    match base.rfind('.') {
        Some(i) if i > 0 => base[..i].to_string(),
        _ => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(path: &str, content: &str) -> Result<Option<PackageRecord>, EntryParseError> {
        ScoopParser.parse(path, content.as_bytes())
    }

    #[test]
    fn test_plain_manifest_with_bin_string() {
        let record = parse(
            "Main-abc123/bucket/foo.json",
            r#"{"homepage":"https://foo.example","bin":"foo.exe"}"#,
        )
        .unwrap()
        .unwrap();

        assert_eq!(record.id, "foo");
        // id and bin basename legitimately coincide; no dedup within keywords
        assert_eq!(record.keywords, vec!["foo", "foo"]);
        assert_eq!(record.url.as_deref(), Some("https://foo.example"));
        assert_eq!(record.source, SourceKind::Scoop);
    }

    #[test]
    fn test_irrelevant_paths_are_skipped() {
        assert!(parse("Main-abc123/README.md", "").unwrap().is_none());
        assert!(parse("Main-abc123/bucket/", "").unwrap().is_none());
        assert!(parse("Main-abc123/deprecated/foo.json", "{}")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_malformed_manifest_is_an_entry_error() {
        let err = parse("Main-abc123/bucket/broken.json", "{not json").unwrap_err();
        assert_eq!(err.path, "Main-abc123/bucket/broken.json");
    }

    #[test]
    fn test_string_checkver_uses_homepage() {
        let record = parse(
            "x/bucket/p.json",
            r#"{"checkver":"v([\\d.]+)","homepage":"https://p.example"}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(record.url.as_deref(), Some("https://p.example"));
    }

    #[test]
    fn test_object_checkver_url_wins() {
        let record = parse(
            "x/bucket/p.json",
            r#"{"checkver":{"url":"https://releases.example/latest"},
                "github":"https://github.com/o/p",
                "homepage":"https://p.example"}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(record.url.as_deref(), Some("https://releases.example/latest"));
    }

    #[test]
    fn test_object_checkver_falls_back_to_github_then_homepage() {
        let record = parse(
            "x/bucket/p.json",
            r#"{"checkver":{"regex":"v(.+)"},"github":"https://github.com/o/p"}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(record.url.as_deref(), Some("https://github.com/o/p"));

        let record = parse(
            "x/bucket/p.json",
            r#"{"checkver":{"regex":"v(.+)"},"homepage":"https://p.example"}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(record.url.as_deref(), Some("https://p.example"));
    }

    #[test]
    fn test_data_file_checkver_url_is_rejected() {
        let record = parse(
            "x/bucket/p.json",
            r#"{"checkver":{"url":"https://releases.example/versions.json"},
                "homepage":"https://p.example"}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(record.url.as_deref(), Some("https://p.example"));
    }

    #[test]
    fn test_no_candidates_means_no_url() {
        let record = parse("x/bucket/p.json", r#"{"version":"1.0"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(record.url, None);
        assert_eq!(record.keywords, vec!["p"]);
    }

    #[test]
    fn test_bin_array_is_flattened_and_separators_normalized() {
        let record = parse(
            "x/bucket/tool.json",
            r#"{"bin":["bin\\tool.exe",["helpers/aux.cmd","aux-alias"],"plain"]}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            record.keywords,
            vec!["tool", "tool", "aux", "aux-alias", "plain"]
        );
    }
}
