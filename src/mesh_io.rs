//! Codec session - the public entry point for reading and writing IWM data.
//!
//! A [`MeshIo`] session targets one dataset, either a directory (`.iwm`) or a
//! single container (`.iwm.cbor`, or an in-memory buffer). The form is chosen
//! from the path suffix when the session is created; every operation then
//! dispatches to that form.
//!
//! ## Read path
//!
//! ```text
//! Unopened --read_metadata--> MetadataRead --read_payload*--> ... --close--> Closed
//! ```
//!
//! ## Write path
//!
//! ```text
//! Unopened --write_metadata--> MetadataStaged --write_payload*--> ... --finalize--> Finalized
//! ```
//!
//! The descriptor must be read or staged before any payload operation, since
//! payload byte counts depend on it.
//!
//! ## Example
//!
//! ```no_run
//! use iwm::{MeshIo, PayloadKind};
//!
//! let mut io = MeshIo::new("sphere.iwm.cbor")?;
//! io.read_metadata()?;
//! let mut points = vec![0u8; io.required_byte_count(PayloadKind::Points) as usize];
//! io.read_payload(PayloadKind::Points, &mut points)?;
//! # Ok::<(), iwm::Error>(())
//! ```

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use crate::core::{MeshDescriptor, PayloadKind};
use crate::index::cbor::Container;
use crate::store::{container, ContainerWriter, DirectoryStore};
use crate::util::{ByteOrder, Error, Result};

/// Base extension shared by both forms.
pub const EXTENSION: &str = ".iwm";

/// Extension of the container form.
pub const CONTAINER_EXTENSION: &str = ".iwm.cbor";

/// Which of the two encodings a path refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MeshFormat {
    /// Directory with `index.json` and raw payload files
    Directory,
    /// Single CBOR container
    Container,
}

impl MeshFormat {
    /// Select the form for `path`, or `None` if it lacks the base extension.
    pub fn detect(path: impl AsRef<Path>) -> Option<Self> {
        let name = path.as_ref().to_string_lossy();
        if !name.contains(EXTENSION) {
            return None;
        }
        if name.ends_with(CONTAINER_EXTENSION) {
            Some(Self::Container)
        } else {
            Some(Self::Directory)
        }
    }
}

impl fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory => f.write_str("directory"),
            Self::Container => f.write_str("container"),
        }
    }
}

fn has_extension(path: &Path) -> bool {
    let name = path.to_string_lossy();
    !name.is_empty() && name.contains(EXTENSION)
}

/// Whether `path` names something this codec can read.
///
/// Only the base extension is checked, independent of form.
pub fn can_read_file(path: impl AsRef<Path>) -> bool {
    let ok = has_extension(path.as_ref());
    if !ok {
        debug!("The filename extension is not recognized: {}", path.as_ref().display());
    }
    ok
}

/// Whether `path` names something this codec can write.
pub fn can_write_file(path: impl AsRef<Path>) -> bool {
    can_read_file(path)
}

/// Session configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeshIoOptions {
    /// Memory-map container files when reading (needs the `mmap` feature).
    pub use_mmap: bool,
    /// Reject container inputs larger than this many bytes.
    pub max_container_bytes: Option<u64>,
    /// Pretty-print `index.json`.
    pub pretty_index: bool,
}

impl Default for MeshIoOptions {
    fn default() -> Self {
        Self {
            use_mmap: cfg!(feature = "mmap"),
            max_container_bytes: None,
            pretty_index: true,
        }
    }
}

impl MeshIoOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn with_max_container_bytes(mut self, limit: u64) -> Self {
        self.max_container_bytes = Some(limit);
        self
    }

    pub fn with_pretty_index(mut self, pretty: bool) -> Self {
        self.pretty_index = pretty;
        self
    }
}

/// Lifecycle state of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No metadata read or staged yet
    Unopened,
    /// Descriptor decoded; payloads can be read
    MetadataRead,
    /// Descriptor written/staged; payloads can be written
    MetadataStaged,
    /// Write session completed
    Finalized,
    /// Session released
    Closed,
}

impl SessionState {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unopened => "Unopened",
            Self::MetadataRead => "MetadataRead",
            Self::MetadataStaged => "MetadataStaged",
            Self::Finalized => "Finalized",
            Self::Closed => "Closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a container lives.
#[derive(Debug)]
enum Location {
    File(PathBuf),
    /// Source bytes before reading, finalized bytes after writing
    Buffer(Option<Vec<u8>>),
}

/// Container-form session resources.
#[derive(Debug)]
struct ContainerSession {
    location: Location,
    decoded: Option<Container>,
    writer: Option<ContainerWriter>,
}

impl ContainerSession {
    fn new(location: Location) -> Self {
        Self {
            location,
            decoded: None,
            writer: None,
        }
    }

    fn release(&mut self) {
        self.decoded = None;
        self.writer = None;
    }
}

#[derive(Debug)]
enum Backend {
    Directory(DirectoryStore),
    Container(ContainerSession),
}

/// One read or write session over an IWM dataset.
#[derive(Debug)]
pub struct MeshIo {
    backend: Backend,
    options: MeshIoOptions,
    descriptor: MeshDescriptor,
    state: SessionState,
}

impl MeshIo {
    /// Open a session for `path` with default options.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(path, MeshIoOptions::default())
    }

    /// Open a session for `path`.
    ///
    /// Fails with [`Error::UnsupportedPath`] if the path does not carry the
    /// `.iwm` extension. No I/O happens until the first operation.
    pub fn with_options(path: impl AsRef<Path>, options: MeshIoOptions) -> Result<Self> {
        let path = path.as_ref();
        if !has_extension(path) {
            return Err(Error::UnsupportedPath(path.to_path_buf()));
        }
        let backend = match MeshFormat::detect(path) {
            Some(MeshFormat::Container) => {
                Backend::Container(ContainerSession::new(Location::File(path.to_path_buf())))
            }
            Some(MeshFormat::Directory) => Backend::Directory(DirectoryStore::new(path)),
            None => return Err(Error::UnsupportedPath(path.to_path_buf())),
        };
        Ok(Self::from_backend(backend, options))
    }

    /// Read session over container bytes held in memory.
    pub fn from_buffer(bytes: Vec<u8>) -> Self {
        let session = ContainerSession::new(Location::Buffer(Some(bytes)));
        Self::from_backend(Backend::Container(session), MeshIoOptions::default())
    }

    /// Write session producing container bytes in memory.
    ///
    /// Retrieve the output with [`into_buffer`](Self::into_buffer) after
    /// [`finalize`](Self::finalize).
    pub fn to_buffer() -> Self {
        let session = ContainerSession::new(Location::Buffer(None));
        Self::from_backend(Backend::Container(session), MeshIoOptions::default())
    }

    fn from_backend(backend: Backend, options: MeshIoOptions) -> Self {
        Self {
            backend,
            options,
            descriptor: MeshDescriptor::default(),
            state: SessionState::Unopened,
        }
    }

    /// Replace the session options. Only allowed before metadata is read or
    /// staged.
    pub fn set_options(&mut self, options: MeshIoOptions) -> Result<()> {
        self.expect_state("change options", SessionState::Unopened)?;
        self.options = options;
        Ok(())
    }

    // === Accessors ===

    pub fn format(&self) -> MeshFormat {
        match self.backend {
            Backend::Directory(_) => MeshFormat::Directory,
            Backend::Container(_) => MeshFormat::Container,
        }
    }

    /// Target path, or `None` for in-memory containers.
    pub fn path(&self) -> Option<&Path> {
        match &self.backend {
            Backend::Directory(store) => Some(store.root()),
            Backend::Container(ContainerSession {
                location: Location::File(path),
                ..
            }) => Some(path),
            Backend::Container(_) => None,
        }
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[inline]
    pub fn options(&self) -> &MeshIoOptions {
        &self.options
    }

    /// Payload byte order. Always little-endian.
    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        ByteOrder::PAYLOAD
    }

    #[inline]
    pub fn descriptor(&self) -> &MeshDescriptor {
        &self.descriptor
    }

    /// Mutable descriptor, for populating before [`write_metadata`](Self::write_metadata).
    pub fn descriptor_mut(&mut self) -> Result<&mut MeshDescriptor> {
        self.expect_state("set descriptor fields", SessionState::Unopened)?;
        Ok(&mut self.descriptor)
    }

    /// Replace the descriptor before [`write_metadata`](Self::write_metadata).
    pub fn set_descriptor(&mut self, descriptor: MeshDescriptor) -> Result<()> {
        *self.descriptor_mut()? = descriptor;
        Ok(())
    }

    /// Bytes the given payload must contain under the current descriptor.
    #[inline]
    pub fn required_byte_count(&self, kind: PayloadKind) -> u64 {
        kind.required_byte_count(&self.descriptor)
    }

    /// Whether the current descriptor declares the given payload.
    #[inline]
    pub fn has_payload(&self, kind: PayloadKind) -> bool {
        kind.is_present(&self.descriptor)
    }

    fn expect_state(&self, operation: &'static str, expected: SessionState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::InvalidState {
                operation,
                state: self.state.name(),
            })
        }
    }

    fn required_len(&self, kind: PayloadKind, provided: usize) -> Result<usize> {
        let required = self.required_byte_count(kind);
        if (provided as u64) < required {
            return Err(Error::BufferTooSmall {
                kind,
                required,
                provided: provided as u64,
            });
        }
        // provided >= required, so required fits in usize
        Ok(required as usize)
    }

    // === Read path ===

    /// Decode the index and make payloads readable.
    ///
    /// On failure the session stays `Unopened` and the descriptor is left
    /// untouched.
    pub fn read_metadata(&mut self) -> Result<&MeshDescriptor> {
        self.expect_state("read metadata", SessionState::Unopened)?;

        let descriptor = match &mut self.backend {
            Backend::Directory(store) => store.read_index()?,
            Backend::Container(session) => {
                let limit = self.options.max_container_bytes;
                let decoded = match &session.location {
                    Location::File(path) => container::load_file(path, self.options.use_mmap, limit)?,
                    Location::Buffer(Some(bytes)) => container::load_bytes(bytes, limit)?,
                    Location::Buffer(None) => {
                        return Err(Error::InvalidState {
                            operation: "read metadata from an output buffer",
                            state: self.state.name(),
                        })
                    }
                };
                let descriptor = decoded.descriptor;
                session.decoded = Some(decoded);
                descriptor
            }
        };

        self.descriptor = descriptor;
        self.state = SessionState::MetadataRead;
        debug!(
            "Read {} metadata: {} points, {} cells, {} point pixels, {} cell pixels",
            self.format(),
            descriptor.number_of_points,
            descriptor.number_of_cells,
            descriptor.number_of_point_pixels,
            descriptor.number_of_cell_pixels
        );
        Ok(&self.descriptor)
    }

    /// Fill `buf` with the payload's bytes.
    ///
    /// `buf` must hold at least [`required_byte_count`](Self::required_byte_count)
    /// bytes; only that prefix is written. Absent payloads are a no-op.
    pub fn read_payload(&mut self, kind: PayloadKind, buf: &mut [u8]) -> Result<()> {
        self.expect_state("read payload", SessionState::MetadataRead)?;
        let len = self.required_len(kind, buf.len())?;
        if len == 0 {
            trace!("Skipping read of absent payload '{}'", kind);
            return Ok(());
        }
        let buf = &mut buf[..len];
        match &self.backend {
            Backend::Directory(store) => store.read_payload(kind, buf),
            Backend::Container(session) => match &session.decoded {
                Some(decoded) => decoded.read_payload(kind, buf),
                None => Err(Error::InvalidState {
                    operation: "read payload",
                    state: self.state.name(),
                }),
            },
        }
    }

    /// Read a payload into a freshly allocated buffer of the required size.
    ///
    /// Fails with an `OutOfMemory` I/O error if the descriptor asks for more
    /// bytes than can be allocated.
    pub fn read_payload_vec(&mut self, kind: PayloadKind) -> Result<Vec<u8>> {
        let required = self.required_byte_count(kind);
        let mut buf = Vec::new();
        let len = usize::try_from(required)
            .ok()
            .filter(|&len| buf.try_reserve_exact(len).is_ok())
            .ok_or_else(|| {
                Error::Io(io::Error::new(
                    io::ErrorKind::OutOfMemory,
                    format!("cannot allocate {required} bytes for {kind} payload"),
                ))
            })?;
        buf.resize(len, 0);
        self.read_payload(kind, &mut buf)?;
        Ok(buf)
    }

    /// Release decoded data. The session cannot be used afterwards.
    pub fn close(&mut self) {
        if let Backend::Container(session) = &mut self.backend {
            session.release();
        }
        if self.state == SessionState::MetadataStaged {
            warn!("Closing a write session that was never finalized");
        }
        self.state = SessionState::Closed;
    }

    // === Write path ===

    /// Write (directory) or stage (container) the index for the current
    /// descriptor.
    pub fn write_metadata(&mut self) -> Result<()> {
        self.expect_state("write metadata", SessionState::Unopened)?;
        match &mut self.backend {
            Backend::Directory(store) => {
                store.write_index(&self.descriptor, self.options.pretty_index)?;
            }
            Backend::Container(session) => {
                let mut writer = ContainerWriter::new();
                writer.stage_index(&self.descriptor);
                session.writer = Some(writer);
            }
        }
        self.state = SessionState::MetadataStaged;
        debug!("Staged {} metadata", self.format());
        Ok(())
    }

    /// Write the first [`required_byte_count`](Self::required_byte_count)
    /// bytes of `buf` as the payload. Absent payloads are a no-op.
    pub fn write_payload(&mut self, kind: PayloadKind, buf: &[u8]) -> Result<()> {
        self.expect_state("write payload", SessionState::MetadataStaged)?;
        let len = self.required_len(kind, buf.len())?;
        if len == 0 {
            trace!("Skipping write of absent payload '{}'", kind);
            return Ok(());
        }
        let buf = &buf[..len];
        match &mut self.backend {
            Backend::Directory(store) => store.write_payload(kind, buf),
            Backend::Container(session) => match session.writer.as_mut() {
                Some(writer) => {
                    writer.insert_payload(kind, &self.descriptor, buf);
                    Ok(())
                }
                None => Err(Error::InvalidState {
                    operation: "write payload",
                    state: self.state.name(),
                }),
            },
        }
    }

    /// Complete a write session.
    ///
    /// The container form serializes its staged map once and releases it,
    /// whether or not serialization succeeds. The directory form has nothing
    /// to flush.
    pub fn finalize(&mut self) -> Result<()> {
        self.expect_state("finalize", SessionState::MetadataStaged)?;
        if let Backend::Container(session) = &mut self.backend {
            let writer = session.writer.take().unwrap_or_default();
            let result = match &mut session.location {
                Location::File(path) => writer.finish_to_file(path),
                Location::Buffer(out) => writer.finish().map(|bytes| {
                    *out = Some(bytes);
                }),
            };
            if let Err(e) = result {
                self.state = SessionState::Closed;
                return Err(e);
            }
        }
        self.state = SessionState::Finalized;
        debug!("Finalized {} output", self.format());
        Ok(())
    }

    /// Finalized container bytes of an in-memory write session.
    pub fn into_buffer(self) -> Option<Vec<u8>> {
        if self.state != SessionState::Finalized {
            return None;
        }
        match self.backend {
            Backend::Container(ContainerSession {
                location: Location::Buffer(out),
                ..
            }) => out,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::ComponentType;
    use tempfile::TempDir;

    fn descriptor() -> MeshDescriptor {
        let mut d = MeshDescriptor::new();
        d.set_point_dimension(3);
        d.set_point_component_type(ComponentType::Float32);
        d.set_number_of_points(4);
        d.set_number_of_cells(1);
        d.set_cell_buffer_size(6);
        d
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(MeshFormat::detect("a/mesh.iwm"), Some(MeshFormat::Directory));
        assert_eq!(MeshFormat::detect("a/mesh.iwm.cbor"), Some(MeshFormat::Container));
        assert_eq!(MeshFormat::detect("a/mesh.iwm.bak"), Some(MeshFormat::Directory));
        assert_eq!(MeshFormat::detect("a/mesh.vtk"), None);
    }

    #[test]
    fn test_can_read_write() {
        assert!(can_read_file("mesh.iwm"));
        assert!(can_read_file("mesh.iwm.cbor"));
        assert!(can_write_file("out/mesh.iwm"));
        assert!(!can_read_file("mesh.stl"));
        assert!(!can_write_file(""));
    }

    #[test]
    fn test_unsupported_path() {
        assert!(matches!(MeshIo::new("mesh.obj"), Err(Error::UnsupportedPath(_))));
    }

    #[test]
    fn test_payload_before_metadata() {
        let mut io = MeshIo::new("never-created.iwm").unwrap();
        let mut buf = [0u8; 4];
        let err = io.read_payload(PayloadKind::Points, &mut buf).unwrap_err();
        assert!(matches!(err, Error::InvalidState { state: "Unopened", .. }));
        let err = io.write_payload(PayloadKind::Points, &buf).unwrap_err();
        assert!(matches!(err, Error::InvalidState { .. }));
        assert!(matches!(io.finalize(), Err(Error::InvalidState { .. })));
    }

    #[test]
    fn test_failed_metadata_read_stays_unopened() {
        let dir = TempDir::new().unwrap();
        let mut io = MeshIo::new(dir.path().join("missing.iwm.cbor")).unwrap();
        assert!(io.read_metadata().is_err());
        assert_eq!(io.state(), SessionState::Unopened);
        assert_eq!(*io.descriptor(), MeshDescriptor::default());
    }

    #[test]
    fn test_buffer_roundtrip() {
        let d = descriptor();
        let points: Vec<u8> = (0..48).collect();
        let cells = vec![3u8; 24];

        let mut out = MeshIo::to_buffer();
        out.set_descriptor(d).unwrap();
        out.write_metadata().unwrap();
        assert!(out.descriptor_mut().is_err());
        out.write_payload(PayloadKind::Points, &points).unwrap();
        out.write_payload(PayloadKind::Cells, &cells).unwrap();
        // absent payloads are skipped
        out.write_payload(PayloadKind::PointData, &[]).unwrap();
        out.finalize().unwrap();
        let bytes = out.into_buffer().unwrap();

        let mut io = MeshIo::from_buffer(bytes);
        assert_eq!(io.format(), MeshFormat::Container);
        assert!(io.path().is_none());
        assert_eq!(io.byte_order(), ByteOrder::LittleEndian);
        assert_eq!(*io.read_metadata().unwrap(), d);
        assert_eq!(io.read_payload_vec(PayloadKind::Points).unwrap(), points);
        assert_eq!(io.read_payload_vec(PayloadKind::Cells).unwrap(), cells);
        assert!(!io.has_payload(PayloadKind::CellData));
        io.close();
        assert_eq!(io.state(), SessionState::Closed);
    }

    #[test]
    fn test_buffer_too_small() {
        let mut out = MeshIo::to_buffer();
        out.set_descriptor(descriptor()).unwrap();
        out.write_metadata().unwrap();
        let err = out.write_payload(PayloadKind::Points, &[0u8; 10]).unwrap_err();
        assert!(matches!(
            err,
            Error::BufferTooSmall {
                required: 48,
                provided: 10,
                ..
            }
        ));
    }

    #[test]
    fn test_oversized_payload_is_not_allocated() {
        let mut d = descriptor();
        d.set_number_of_points(u64::MAX / 4);
        let mut writer = ContainerWriter::new();
        writer.stage_index(&d);

        let mut io = MeshIo::from_buffer(writer.finish().unwrap());
        io.read_metadata().unwrap();
        let err = io.read_payload_vec(PayloadKind::Points).unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::OutOfMemory));
    }

    #[test]
    fn test_options_builder() {
        let options = MeshIoOptions::new()
            .with_mmap(false)
            .with_max_container_bytes(1024)
            .with_pretty_index(false);
        assert!(!options.use_mmap);
        assert_eq!(options.max_container_bytes, Some(1024));
        assert!(!options.pretty_index);

        let mut io = MeshIo::with_options("x.iwm", options.clone()).unwrap();
        assert_eq!(io.options(), &options);
        io.set_options(MeshIoOptions::default()).unwrap();
        assert!(io.options().pretty_index);
    }
}
