// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{
    collections::HashSet,
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
};

use log::{debug, warn};
use thiserror::Error;

/// The set of blocked domain names.
///
/// Names are compared exactly as they are decoded from a query: case-sensitive, with the
/// trailing dot. `ads.example.com.` does not block `example.com.` nor `ADS.example.com.`.
///
/// A [BlockSet] is built once and never changes afterwards, so listeners read it
/// concurrently without any lock.
///
/// ```
/// use sinkhole::BlockSet;
///
/// let blocked: BlockSet = ["ads.example.com."].into_iter().collect();
/// assert!(blocked.is_blocked("ads.example.com."));
/// assert!(!blocked.is_blocked("ads.example.com"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockSet {
    names: HashSet<String>,
}

impl<S: Into<String>> FromIterator<S> for BlockSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        BlockSet {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl BlockSet {
    /// Create an empty [BlockSet], which blocks nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a block list with one domain name per line.
    ///
    /// Surrounding whitespace is trimmed, empty lines and lines starting with `#` are
    /// skipped. Names are kept verbatim otherwise.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, BlockListError> {
        let mut names = HashSet::new();
        for line in reader.lines() {
            let line = line?;
            let name = line.trim();
            if name.is_empty() || name.starts_with('#') {
                continue;
            }
            if !name.ends_with('.') {
                warn!("block list entry {name:?} has no trailing dot and will never match");
            }
            names.insert(name.to_string());
        }
        Ok(BlockSet { names })
    }

    /// Read the block list stored at `path`. See [BlockSet::from_reader] for the format.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BlockListError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| BlockListError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let set = Self::from_reader(BufReader::new(file))?;
        debug!("loaded {} blocked names from {}", set.len(), path.display());
        Ok(set)
    }

    /// Exact membership test.
    #[inline]
    pub fn is_blocked(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of blocked names.
    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if nothing is blocked.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// The block list could not be loaded.
#[derive(Error, Debug)]
pub enum BlockListError {
    /// The file could not be opened.
    #[error("could not open block list {}: {source}", .path.display())]
    Open {
        /// Path of the block list.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// The contents could not be read.
    #[error("could not read block list: {0}")]
    Read(#[from] io::Error),
}
