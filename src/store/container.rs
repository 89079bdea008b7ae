//! Container form storage.
//!
//! Reading decodes the whole container once and serves payloads from the
//! decoded blobs. Writing stages a CBOR map in memory; [`ContainerWriter::finish`]
//! serializes it exactly once.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tracing::{debug, trace};

use super::raw::write_exact;
use crate::core::{MeshDescriptor, PayloadKind};
use crate::index::cbor::{self, Blob, Container, Entries};
use crate::util::{open_error, CborErrorKind, DecodeError, Error, Result};

fn oversized(size: u64, limit: u64) -> Error {
    Error::Decode(DecodeError::Cbor {
        kind: CborErrorKind::OutOfMemory,
        offset: None,
        consumed: 0,
        detail: Some(format!("input of {size} bytes exceeds the {limit} byte limit")),
    })
}

/// Decode a container from memory.
pub fn load_bytes(bytes: &[u8], limit: Option<u64>) -> Result<Container> {
    let size = bytes.len() as u64;
    if let Some(limit) = limit.filter(|&l| size > l) {
        return Err(oversized(size, limit));
    }
    Ok(cbor::decode(bytes)?)
}

/// Decode a container file, memory-mapping it when `use_mmap` is set and
/// the `mmap` feature is enabled.
pub fn load_file(path: &Path, use_mmap: bool, limit: Option<u64>) -> Result<Container> {
    let mut file = File::open(path).map_err(|e| open_error(path, e))?;
    let size = file.metadata()?.len();
    if let Some(limit) = limit.filter(|&l| size > l) {
        return Err(oversized(size, limit));
    }
    debug!("Loading container {} ({} bytes)", path.display(), size);

    if use_mmap && size > 0 {
        if let Some(container) = decode_mapped(&file)? {
            return Ok(container);
        }
    }

    let mut bytes = Vec::with_capacity(size as usize);
    file.read_to_end(&mut bytes)?;
    Ok(cbor::decode(&bytes)?)
}

#[cfg(feature = "mmap")]
fn decode_mapped(file: &File) -> Result<Option<Container>> {
    // Safety: the mapping is read-only and dropped before returning;
    // concurrent writers to the same path are the caller's responsibility.
    let mmap = unsafe { memmap2::Mmap::map(file) }?;
    Ok(Some(cbor::decode(&mmap)?))
}

#[cfg(not(feature = "mmap"))]
fn decode_mapped(_file: &File) -> Result<Option<Container>> {
    Ok(None)
}

impl Container {
    /// Fill `buf` from the named blob. `buf.len()` is the required count.
    pub fn read_payload(&self, kind: PayloadKind, buf: &mut [u8]) -> Result<()> {
        let available = self.blobs.get(&kind).map_or(&[][..], |b| b.bytes.as_slice());
        if available.len() < buf.len() {
            return Err(Error::ShortRead {
                kind,
                expected: buf.len() as u64,
                actual: available.len() as u64,
            });
        }
        trace!("Reading {} bytes from container blob '{}'", buf.len(), kind);
        buf.copy_from_slice(&available[..buf.len()]);
        Ok(())
    }
}

/// In-memory CBOR map staged for a container write.
#[derive(Clone, Debug, Default)]
pub struct ContainerWriter {
    entries: Entries,
}

impl ContainerWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) the index entries.
    pub fn stage_index(&mut self, descriptor: &MeshDescriptor) {
        for (key, value) in cbor::encode_index(descriptor) {
            if let Some(key) = key.as_text() {
                cbor::upsert(&mut self.entries, key, value);
            }
        }
    }

    /// Insert or replace a payload blob, tagged with its component type.
    pub fn insert_payload(&mut self, kind: PayloadKind, descriptor: &MeshDescriptor, bytes: &[u8]) {
        trace!("Staging {} bytes as container blob '{}'", bytes.len(), kind);
        let blob = Blob::typed(kind.component_type(descriptor), bytes.to_vec());
        cbor::upsert_blob(&mut self.entries, kind, blob);
    }

    /// Number of root map entries staged so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the staged map, consuming the writer.
    pub fn finish(self) -> Result<Vec<u8>> {
        cbor::serialize(self.entries)
    }

    /// Serialize the staged map into `sink`, consuming the writer. `path`
    /// names the destination in errors.
    pub fn finish_into<W: Write>(self, sink: &mut W, path: &Path) -> Result<()> {
        let bytes = self.finish()?;
        debug!("Writing container {} ({} bytes)", path.display(), bytes.len());
        write_exact(sink, &bytes, path)
    }

    /// Serialize the staged map to `path`, consuming the writer.
    pub fn finish_to_file(self, path: &Path) -> Result<()> {
        let mut file = File::create(path)?;
        self.finish_into(&mut file, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::raw::Limited;
    use tempfile::TempDir;

    fn descriptor() -> MeshDescriptor {
        let mut d = MeshDescriptor::new();
        d.number_of_points = 2;
        d.number_of_cells = 1;
        d.cell_buffer_size = 4;
        d
    }

    #[test]
    fn test_writer_then_load() {
        let d = descriptor();
        let mut writer = ContainerWriter::new();
        writer.stage_index(&d);
        assert_eq!(writer.len(), 6);
        writer.insert_payload(PayloadKind::Points, &d, &[5u8; 24]);
        writer.insert_payload(PayloadKind::Points, &d, &[6u8; 24]);
        assert_eq!(writer.len(), 7);

        let container = load_bytes(&writer.finish().unwrap(), None).unwrap();
        assert_eq!(container.descriptor, d);

        let mut buf = [0u8; 24];
        container.read_payload(PayloadKind::Points, &mut buf).unwrap();
        assert_eq!(buf, [6u8; 24]);
    }

    #[test]
    fn test_missing_blob_is_short_read() {
        let d = descriptor();
        let mut writer = ContainerWriter::new();
        writer.stage_index(&d);
        let container = load_bytes(&writer.finish().unwrap(), None).unwrap();

        let mut buf = [0u8; 16];
        let err = container.read_payload(PayloadKind::Cells, &mut buf).unwrap_err();
        assert!(matches!(err, Error::ShortRead { actual: 0, expected: 16, .. }));
    }

    #[test]
    fn test_size_limit() {
        let d = descriptor();
        let mut writer = ContainerWriter::new();
        writer.stage_index(&d);
        let bytes = writer.finish().unwrap();

        let err = load_bytes(&bytes, Some(8)).unwrap_err();
        assert_eq!(
            err.as_decode().and_then(DecodeError::cbor_kind),
            Some(CborErrorKind::OutOfMemory)
        );
    }

    #[test]
    fn test_file_roundtrip_with_and_without_mmap() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.iwm.cbor");
        let d = descriptor();
        let mut writer = ContainerWriter::new();
        writer.stage_index(&d);
        writer.finish_to_file(&path).unwrap();

        assert_eq!(load_file(&path, true, None).unwrap().descriptor, d);
        assert_eq!(load_file(&path, false, None).unwrap().descriptor, d);
    }

    #[test]
    fn test_short_container_write() {
        let d = descriptor();
        let mut writer = ContainerWriter::new();
        writer.stage_index(&d);
        writer.insert_payload(PayloadKind::Points, &d, &[5u8; 24]);
        let total = writer.clone().finish().unwrap().len() as u64;

        let mut sink = Limited::new(10);
        let err = writer
            .finish_into(&mut sink, Path::new("out.iwm.cbor"))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ShortWrite { expected, actual: 10, .. } if expected == total
        ));
    }

    #[test]
    fn test_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.iwm.cbor");
        std::fs::write(&path, b"").unwrap();
        let err = load_file(&path, true, None).unwrap_err();
        assert_eq!(
            err.as_decode().and_then(DecodeError::cbor_kind),
            Some(CborErrorKind::Empty)
        );
    }
}
