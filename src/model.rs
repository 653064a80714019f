use serde::{Deserialize, Serialize};

/// One normalized package entry in the output index.
///
/// Field names follow the `db.json` contract consumed by the search UI:
/// `id`, `kw`, `url`, `src`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Stable package identifier; dedup key across the whole run.
    pub id: String,

    /// Matchable tokens: the identifier itself plus derived executable
    /// basenames (Scoop) or the full dotted identifier (winget).
    /// Insertion order preserved, duplicates allowed, never empty.
    #[serde(rename = "kw")]
    pub keywords: Vec<String>,

    /// Best-effort canonical reference URL. Absent is a valid terminal
    /// state when no candidate field was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Which upstream ecosystem produced the record. Used only for
    /// filtering in the consuming UI, never for dedup.
    #[serde(rename = "src")]
    pub source: SourceKind,
}

/// Upstream manifest ecosystem tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Scoop,
    Winget,
}

impl SourceKind {
    /// Lowercase tag as it appears in the serialized index.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Scoop => "scoop",
            SourceKind::Winget => "winget",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
