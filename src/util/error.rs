//! Error types for the IWM codec.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::PayloadKind;

/// How a container-form (CBOR) input failed to parse.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CborErrorKind {
    /// Structurally invalid data
    Malformed,
    /// Input too large to load
    OutOfMemory,
    /// Zero-length input
    Empty,
    /// Input ends before the root item is complete
    Truncated,
    /// Bytes that violate the CBOR grammar (RFC 8949)
    Syntax,
}

impl fmt::Display for CborErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let desc = match self {
            Self::Malformed => "malformed data",
            Self::OutOfMemory => "memory error, perhaps the input is too large",
            Self::Empty => "the input is empty",
            Self::Truncated => "data seem to be missing, is the input complete?",
            Self::Syntax => "syntactically malformed data, see RFC 8949",
        };
        f.write_str(desc)
    }
}

/// Failure to decode an index (either form) into a mesh descriptor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Index document is not valid JSON
    #[error("Could not parse index JSON at line {line}, column {column}: {message}")]
    Json {
        line: usize,
        column: usize,
        message: String,
    },

    /// Container bytes are not a valid CBOR item
    #[error("{kind}: error near byte {} (read {consumed} bytes in total){}", offset_text(.offset), detail_text(.detail))]
    Cbor {
        kind: CborErrorKind,
        offset: Option<u64>,
        consumed: u64,
        detail: Option<String>,
    },

    /// Component type string outside the closed table
    #[error("Unknown component type '{value}' for field '{field}'")]
    UnknownComponentType { field: String, value: String },

    /// Pixel type string outside the closed table
    #[error("Unknown pixel type '{value}' for field '{field}'")]
    UnknownPixelType { field: String, value: String },

    /// Key not part of the closed schema
    #[error("Unexpected {scope} key: {key}")]
    UnknownKey { scope: &'static str, key: String },

    /// Required key absent
    #[error("Missing {scope} key: {key}")]
    MissingKey { scope: &'static str, key: String },

    /// Key present more than once
    #[error("Duplicate {scope} key: {key}")]
    DuplicateKey { scope: &'static str, key: String },

    /// Value of the wrong kind or out of range
    #[error("Invalid value for '{key}': expected {expected}")]
    InvalidValue { key: String, expected: &'static str },

    /// Typed-array tag on a blob disagrees with the declared component type
    #[error("Blob '{key}' is tagged as {actual}, but the index declares {expected}")]
    BlobTypeMismatch {
        key: String,
        expected: String,
        actual: String,
    },

    /// Extra bytes after the root map
    #[error("Trailing bytes after container root: consumed {consumed} of {total}")]
    TrailingBytes { consumed: u64, total: u64 },
}

fn offset_text(offset: &Option<u64>) -> String {
    offset.map_or_else(|| "?".to_string(), |o| o.to_string())
}

fn detail_text(detail: &Option<String>) -> String {
    detail.as_ref().map(|d| format!(": {d}")).unwrap_or_default()
}

impl DecodeError {
    /// Create an invalid-value error.
    pub fn invalid(key: impl Into<String>, expected: &'static str) -> Self {
        Self::InvalidValue {
            key: key.into(),
            expected,
        }
    }

    /// Classification for container decode failures.
    pub fn cbor_kind(&self) -> Option<CborErrorKind> {
        match self {
            Self::Cbor { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Main error type for IWM operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Index could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Payload source held fewer bytes than the descriptor requires
    #[error("Read failed for {kind}: wanted {expected} bytes, but read {actual} bytes")]
    ShortRead {
        kind: PayloadKind,
        expected: u64,
        actual: u64,
    },

    /// Sink accepted fewer bytes than requested
    #[error("Write failed for {path}: wanted to write {expected} bytes, but wrote {actual} bytes")]
    ShortWrite {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// Flat value array whose length is not a whole number of items
    #[error("{len} values for {kind} do not divide into items of {width} components")]
    UnevenValues { kind: PayloadKind, len: u64, width: u32 },

    /// Payload length differs from what the descriptor declares
    #[error("Payload {kind} holds {actual} bytes, descriptor requires {required}")]
    PayloadLength {
        kind: PayloadKind,
        required: u64,
        actual: u64,
    },

    /// Caller buffer smaller than the required byte count
    #[error("Buffer for {kind} holds {provided} bytes, {required} required")]
    BufferTooSmall {
        kind: PayloadKind,
        required: u64,
        provided: u64,
    },

    /// Path does not carry the IWM extension
    #[error("Unsupported path (expected .iwm or .iwm.cbor): {0}")]
    UnsupportedPath(PathBuf),

    /// Operation not permitted in the current session state
    #[error("Cannot {operation} in session state {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    /// Typed access with a Rust type that does not match the descriptor
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Index or container could not be serialized
    #[error("Encode failed: {0}")]
    Encode(String),

    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an encode error from a message.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Borrow the decode error, if this is one.
    pub fn as_decode(&self) -> Option<&DecodeError> {
        match self {
            Self::Decode(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type alias for IWM operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Map a `NotFound` I/O error on `path` to [`Error::FileNotFound`].
pub(crate) fn open_error(path: &std::path::Path, e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        Error::FileNotFound(path.to_path_buf())
    } else {
        Error::Io(e)
    }
}
