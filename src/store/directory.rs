//! Directory form storage.
//!
//! ```text
//! <root>/index.json
//! <root>/data/points.raw
//! <root>/data/cells.raw
//! <root>/data/point-data.raw
//! <root>/data/cell-data.raw
//! ```
//!
//! Every payload write goes straight to its file; there is nothing to
//! finalize.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use super::raw::{read_counted, write_exact};
use crate::core::{MeshDescriptor, PayloadKind};
use crate::index::json;
use crate::util::{open_error, Error, Result};

/// Name of the index document inside the dataset directory.
pub const INDEX_FILE: &str = "index.json";

/// Name of the payload directory inside the dataset directory.
pub const DATA_DIR: &str = "data";

/// Accessor for a directory-form dataset rooted at one path.
#[derive(Clone, Debug)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    /// Path of a payload file, e.g. `<root>/data/points.raw`.
    pub fn payload_path(&self, kind: PayloadKind) -> PathBuf {
        self.data_dir().join(kind.file_name())
    }

    /// Read and decode `index.json`.
    pub fn read_index(&self) -> Result<MeshDescriptor> {
        let path = self.index_path();
        debug!("Reading index {}", path.display());
        let text = fs::read_to_string(&path).map_err(|e| open_error(&path, e))?;
        Ok(json::decode(&text)?)
    }

    /// Encode and write `index.json`, creating the root and `data/`
    /// directories if needed.
    pub fn write_index(&self, descriptor: &MeshDescriptor, pretty: bool) -> Result<()> {
        fs::create_dir_all(self.data_dir())?;
        let text = json::encode(descriptor, pretty)?;
        let path = self.index_path();
        debug!("Writing index {}", path.display());
        fs::write(&path, text)?;
        Ok(())
    }

    /// Fill `buf` from the payload file. `buf.len()` is the required count.
    pub fn read_payload(&self, kind: PayloadKind, buf: &mut [u8]) -> Result<()> {
        let path = self.payload_path(kind);
        trace!("Reading {} bytes from {}", buf.len(), path.display());
        let mut file = File::open(&path).map_err(|e| open_error(&path, e))?;
        let actual = read_counted(&mut file, buf)?;
        if actual < buf.len() {
            return Err(Error::ShortRead {
                kind,
                expected: buf.len() as u64,
                actual: actual as u64,
            });
        }
        Ok(())
    }

    /// Write `buf` as the payload file, replacing any previous content.
    pub fn write_payload(&self, kind: PayloadKind, buf: &[u8]) -> Result<()> {
        let path = self.payload_path(kind);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        trace!("Writing {} bytes to {}", buf.len(), path.display());
        let mut file = File::create(&path)?;
        write_exact(&mut file, buf, &path)
    }
}
