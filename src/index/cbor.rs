//! Root map of the container form.
//!
//! The container is a single CBOR map holding the `meshType` sub-map, the
//! five count entries and up to four payload byte strings. Payloads are
//! wrapped in the RFC 8746 typed-array tag of their component type.

use std::collections::BTreeMap;
use std::io::Cursor;

use ciborium::value::Integer;
use ciborium::Value;

use super::*;
use crate::core::{MeshDescriptor, PayloadKind};
use crate::util::{CborErrorKind, ComponentType, DecodeError, Error, Result};

/// Entries of the root map, in insertion order.
pub type Entries = Vec<(Value, Value)>;

/// A payload byte string as stored in the container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    /// Typed-array tag, if the producer wrote one
    pub tag: Option<u64>,
    pub bytes: Vec<u8>,
}

impl Blob {
    /// Blob tagged with the typed-array tag of `ty`.
    pub fn typed(ty: ComponentType, bytes: Vec<u8>) -> Self {
        Self {
            tag: Some(ty.cbor_tag()),
            bytes,
        }
    }

    fn into_value(self) -> Value {
        let bytes = Value::Bytes(self.bytes);
        match self.tag {
            Some(tag) => Value::Tag(tag, Box::new(bytes)),
            None => bytes,
        }
    }

    fn from_value(key: &str, value: Value) -> std::result::Result<Self, DecodeError> {
        match value {
            Value::Bytes(bytes) => Ok(Self { tag: None, bytes }),
            Value::Tag(tag, inner) => match *inner {
                Value::Bytes(bytes) => Ok(Self {
                    tag: Some(tag),
                    bytes,
                }),
                _ => Err(DecodeError::invalid(key, "tagged byte string")),
            },
            _ => Err(DecodeError::invalid(key, "byte string")),
        }
    }

    /// Check the tag against the component type declared by the index.
    fn check_type(&self, key: &str, expected: ComponentType) -> std::result::Result<(), DecodeError> {
        let Some(tag) = self.tag else {
            return Ok(());
        };
        match ComponentType::from_cbor_tag(tag) {
            Some(actual) if actual == expected => Ok(()),
            actual => Err(DecodeError::BlobTypeMismatch {
                key: key.to_string(),
                expected: expected.to_string(),
                actual: actual.map_or_else(|| format!("tag {tag}"), |ty| ty.to_string()),
            }),
        }
    }
}

/// A fully decoded container.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Container {
    pub descriptor: MeshDescriptor,
    pub blobs: BTreeMap<PayloadKind, Blob>,
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

fn uint(v: impl Into<Integer>) -> Value {
    Value::Integer(v.into())
}

/// Build the `meshType` sub-map (9 entries).
pub fn encode_mesh_type(d: &MeshDescriptor) -> Value {
    let t = &d.mesh_type;
    Value::Map(vec![
        (text(DIMENSION), uint(t.dimension)),
        (text(POINT_COMPONENT_TYPE), text(t.point_component_type.name())),
        (text(POINT_PIXEL_TYPE), text(t.point_pixel_type.name())),
        (text(POINT_PIXEL_COMPONENT_TYPE), text(t.point_pixel_component_type.name())),
        (text(POINT_PIXEL_COMPONENTS), uint(t.point_pixel_components)),
        (text(CELL_COMPONENT_TYPE), text(t.cell_component_type.name())),
        (text(CELL_PIXEL_TYPE), text(t.cell_pixel_type.name())),
        (text(CELL_PIXEL_COMPONENT_TYPE), text(t.cell_pixel_component_type.name())),
        (text(CELL_PIXEL_COMPONENTS), uint(t.cell_pixel_components)),
    ])
}

/// Build the index entries of the root map: `meshType` and the five counts.
pub fn encode_index(d: &MeshDescriptor) -> Entries {
    vec![
        (text(MESH_TYPE), encode_mesh_type(d)),
        (text(NUMBER_OF_POINTS), uint(d.number_of_points)),
        (text(NUMBER_OF_POINT_PIXELS), uint(d.number_of_point_pixels)),
        (text(NUMBER_OF_CELLS), uint(d.number_of_cells)),
        (text(NUMBER_OF_CELL_PIXELS), uint(d.number_of_cell_pixels)),
        (text(CELL_BUFFER_SIZE), uint(d.cell_buffer_size)),
    ]
}

/// Insert or replace `key` in `entries`, keeping the original position.
pub fn upsert(entries: &mut Entries, key: &str, value: Value) {
    match entries
        .iter_mut()
        .find(|(k, _)| k.as_text() == Some(key))
    {
        Some((_, slot)) => *slot = value,
        None => entries.push((text(key), value)),
    }
}

/// Insert or replace a payload blob.
pub fn upsert_blob(entries: &mut Entries, kind: PayloadKind, blob: Blob) {
    upsert(entries, kind.key(), blob.into_value());
}

/// Serialize root entries to CBOR bytes.
pub fn serialize(entries: Entries) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(&Value::Map(entries), &mut buf)
        .map_err(|e| Error::encode(format!("CBOR serialization failed: {e}")))?;
    Ok(buf)
}

/// Parse raw bytes into a CBOR value, classifying failures.
pub fn parse(bytes: &[u8]) -> std::result::Result<Value, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Cbor {
            kind: CborErrorKind::Empty,
            offset: Some(0),
            consumed: 0,
            detail: None,
        });
    }

    let mut cursor = Cursor::new(bytes);
    let result: std::result::Result<Value, _> = ciborium::from_reader(&mut cursor);
    let consumed = cursor.position();
    let value = result.map_err(|e| classify(e, consumed))?;

    let total = bytes.len() as u64;
    if consumed < total {
        return Err(DecodeError::TrailingBytes { consumed, total });
    }
    Ok(value)
}

fn classify(e: ciborium::de::Error<std::io::Error>, consumed: u64) -> DecodeError {
    use ciborium::de::Error as DeError;

    let (kind, offset, detail) = match e {
        DeError::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            (CborErrorKind::Truncated, Some(consumed), None)
        }
        DeError::Io(io) => (CborErrorKind::Malformed, Some(consumed), Some(io.to_string())),
        DeError::Syntax(offset) => (CborErrorKind::Syntax, Some(offset as u64), None),
        DeError::Semantic(offset, msg) => {
            (CborErrorKind::Malformed, offset.map(|o| o as u64), Some(msg))
        }
        DeError::RecursionLimitExceeded => (
            CborErrorKind::OutOfMemory,
            Some(consumed),
            Some("nesting too deep".to_string()),
        ),
    };
    DecodeError::Cbor {
        kind,
        offset,
        consumed,
        detail,
    }
}

/// Decode a parsed root value into a descriptor and its payload blobs.
pub fn decode_value(root: Value) -> std::result::Result<Container, DecodeError> {
    let Value::Map(entries) = root else {
        return Err(DecodeError::invalid(INDEX_SCOPE, "CBOR map"));
    };

    let mut fields = DescriptorFields::new();
    let mut blobs = BTreeMap::new();
    for (key, value) in entries {
        let key = map_key(key, INDEX_SCOPE)?;
        if key == MESH_TYPE {
            fields.begin_mesh_type()?;
            let Value::Map(mesh_entries) = value else {
                return Err(DecodeError::invalid(MESH_TYPE, "CBOR map"));
            };
            for (mesh_key, mesh_value) in mesh_entries {
                let mesh_key = map_key(mesh_key, MESH_TYPE_SCOPE)?;
                fields.mesh_type_entry(&mesh_key, &mesh_value)?;
            }
        } else if let Some(kind) = PayloadKind::from_key(&key) {
            let blob = Blob::from_value(&key, value)?;
            if blobs.insert(kind, blob).is_some() {
                return Err(DecodeError::DuplicateKey {
                    scope: INDEX_SCOPE,
                    key,
                });
            }
        } else {
            fields.count_entry(&key, &value)?;
        }
    }

    let descriptor = fields.finish()?;
    for (kind, blob) in &blobs {
        blob.check_type(kind.key(), kind.component_type(&descriptor))?;
    }
    Ok(Container { descriptor, blobs })
}

fn map_key(key: Value, scope: &'static str) -> std::result::Result<String, DecodeError> {
    match key {
        Value::Text(s) => Ok(s),
        _ => Err(DecodeError::invalid(scope, "text map keys")),
    }
}

/// Parse and decode container bytes.
pub fn decode(bytes: &[u8]) -> std::result::Result<Container, DecodeError> {
    decode_value(parse(bytes)?)
}
