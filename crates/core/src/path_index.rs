// crates/core/src/path_index.rs
//! Interning of path slugs into dense ids, in first-seen order.
//!
//! Only UTF-8 slugs are interned, so every id maps to one distinct report key.

use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::ScanError;
use crate::record::{slug_from_uri, Record};
use crate::source::SourceVisit;

/// Dense surrogate key for a path slug.
pub type PathId = u32;

#[derive(Debug, Clone, Default)]
pub struct PathIndex {
    ids: FxHashMap<Box<[u8]>, PathId>,
    slugs: Vec<Box<str>>,
}

impl PathIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `slug`, assigning the next one if it has not been seen.
    pub fn intern(&mut self, slug: &str) -> PathId {
        if let Some(&id) = self.ids.get(slug.as_bytes()) {
            return id;
        }
        let id = self.slugs.len() as PathId;
        self.ids.insert(slug.as_bytes().into(), id);
        self.slugs.push(slug.into());
        id
    }

    #[inline]
    pub fn get(&self, slug: &[u8]) -> Option<PathId> {
        self.ids.get(slug).copied()
    }

    pub fn slug(&self, id: PathId) -> Option<&str> {
        self.slugs.get(id as usize).map(|s| &**s)
    }

    pub fn len(&self) -> usize {
        self.slugs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slugs.is_empty()
    }

    /// Slugs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (PathId, &str)> {
        self.slugs.iter().enumerate().map(|(i, s)| (i as PathId, &**s))
    }

    /// Intern every slug found in the first `limit` bytes of the log.
    ///
    /// Only complete lines count, unless the prefix covers the whole file, in
    /// which case an unterminated final record is read as well. Lines that do
    /// not fit the record layout are ignored here; the aggregator counts them.
    pub fn discover(&mut self, path: &Path, limit: u64) -> Result<usize, ScanError> {
        let file = File::open(path).map_err(|e| ScanError::io(path, e))?;
        let file_len = file.metadata().map_err(|e| ScanError::io(path, e))?.len();

        let take = limit.min(file_len);
        let mut prefix = Vec::with_capacity(take as usize);
        file.take(take)
            .read_to_end(&mut prefix)
            .map_err(|e| ScanError::io(path, e))?;

        let complete = if take == file_len {
            prefix.len()
        } else {
            memchr::memrchr(b'\n', &prefix).unwrap_or(0)
        };

        let before = self.len();
        for line in prefix[..complete].split(|&b| b == b'\n') {
            if let Some(record) = Record::parse(line) {
                self.intern(record.slug);
            }
        }
        debug!(bytes = take, complete, "Scanned discovery prefix");

        let added = self.len() - before;
        info!(path = %path.display(), discovered = added, "Discovered paths from log prefix");
        Ok(added)
    }

    /// Intern the slug of every supplementary visit. URIs too short to
    /// carry a slug are ignored.
    pub fn extend_from_visits(&mut self, visits: &[SourceVisit]) -> usize {
        let before = self.len();
        for visit in visits {
            match slug_from_uri(&visit.uri) {
                Some(slug) => {
                    self.intern(slug);
                }
                None => warn!(uri = %visit.uri, "Ignoring supplementary visit without a slug"),
            }
        }
        self.len() - before
    }
}
