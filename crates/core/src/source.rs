// crates/core/src/source.rs
//! Supplementary visit sources.
//!
//! A source hands over its live visits exactly once, before aggregation
//! starts. Every visit contributes its path to the path index; visits that
//! also carry a timestamp are folded into the counts.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::SourceError;

/// One visit from the supplementary store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceVisit {
    pub uri: String,
    /// `YYYY-MM-DD...` timestamp, if the store records one.
    #[serde(default)]
    pub visited_at: Option<String>,
}

impl SourceVisit {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            visited_at: None,
        }
    }

    pub fn at(mut self, visited_at: impl Into<String>) -> Self {
        self.visited_at = Some(visited_at.into());
        self
    }
}

/// A one-shot enumerable collection of visits.
pub trait VisitSource {
    /// Take every visit. A second call is an error.
    fn drain(&mut self) -> Result<Vec<SourceVisit>, SourceError>;
}

/// A source with nothing in it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoVisits;

impl VisitSource for NoVisits {
    fn drain(&mut self) -> Result<Vec<SourceVisit>, SourceError> {
        Ok(Vec::new())
    }
}

/// In-memory visits.
#[derive(Debug, Default, Clone)]
pub struct StaticVisits {
    visits: Option<Vec<SourceVisit>>,
}

impl StaticVisits {
    pub fn new(visits: Vec<SourceVisit>) -> Self {
        Self {
            visits: Some(visits),
        }
    }
}

impl VisitSource for StaticVisits {
    fn drain(&mut self) -> Result<Vec<SourceVisit>, SourceError> {
        self.visits.take().ok_or(SourceError::AlreadyDrained)
    }
}

/// Visits exported as a JSON array of `{"uri": ..., "visitedAt": ...}`.
#[derive(Debug, Clone)]
pub struct JsonVisitFile {
    path: PathBuf,
    drained: bool,
}

impl JsonVisitFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            drained: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VisitSource for JsonVisitFile {
    fn drain(&mut self) -> Result<Vec<SourceVisit>, SourceError> {
        if self.drained {
            return Err(SourceError::AlreadyDrained);
        }
        self.drained = true;

        let contents =
            std::fs::read_to_string(&self.path).map_err(|e| SourceError::io(&self.path, e))?;
        serde_json::from_str(&contents).map_err(|e| SourceError::MalformedJson {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_static_visits_drain_once() {
        let mut source = StaticVisits::new(vec![SourceVisit::new("https://stitcher.io/blog/a")]);
        assert_eq!(source.drain().unwrap().len(), 1);
        assert!(matches!(source.drain(), Err(SourceError::AlreadyDrained)));
    }

    #[test]
    fn test_json_visit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("visits.json");
        let json = r#"[
            {"uri": "https://stitcher.io/blog/p/alpha", "visitedAt": "2020-01-05T09:00:00+00:00"},
            {"uri": "https://stitcher.io/blog/p/gamma"}
        ]"#;
        std::fs::write(&path, json).unwrap();

        let mut source = JsonVisitFile::new(&path);
        let visits = source.drain().unwrap();
        assert_eq!(visits.len(), 2);
        assert_eq!(
            visits[0],
            SourceVisit::new("https://stitcher.io/blog/p/alpha").at("2020-01-05T09:00:00+00:00")
        );
        assert_eq!(visits[1].visited_at, None);
        assert!(matches!(source.drain(), Err(SourceError::AlreadyDrained)));
    }

    #[test]
    fn test_json_visit_file_missing() {
        let mut source = JsonVisitFile::new("/nonexistent/visits.json");
        assert!(matches!(source.drain(), Err(SourceError::NotFound { .. })));
    }

    #[test]
    fn test_json_visit_file_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("visits.json");
        std::fs::write(&path, "{not json").unwrap();

        let mut source = JsonVisitFile::new(&path);
        assert!(matches!(source.drain(), Err(SourceError::MalformedJson { .. })));
    }
}
