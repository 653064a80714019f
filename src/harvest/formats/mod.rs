//! Manifest format implementations.
//!
//! One [`ManifestParser`](crate::harvest::traits::ManifestParser) per
//! upstream ecosystem:
//! - [`scoop`] - Scoop bucket JSON manifests
//! - [`winget`] - winget YAML manifests

pub mod scoop;
pub mod winget;

pub use scoop::ScoopParser;
pub use winget::WingetParser;
