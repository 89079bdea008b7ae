//! Component types - the scalar numeric storage kinds of mesh arrays.

use bytemuck::{Pod, Zeroable};
use byteorder::{ByteOrder as _, LittleEndian};
use std::fmt;
use std::str::FromStr;

use super::DecodeError;

/// Scalar representation of one element of a mesh array.
///
/// This is a closed set: every wire string maps to exactly one variant and an
/// unrecognized string is a decode error, never a default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ComponentType {
    /// Signed 8-bit integer
    Int8 = 0,
    /// Unsigned 8-bit integer
    Uint8 = 1,
    /// Signed 16-bit integer
    Int16 = 2,
    /// Unsigned 16-bit integer
    Uint16 = 3,
    /// Signed 32-bit integer
    Int32 = 4,
    /// Unsigned 32-bit integer
    Uint32 = 5,
    /// Signed 64-bit integer
    Int64 = 6,
    /// Unsigned 64-bit integer
    Uint64 = 7,
    /// 32-bit floating point (IEEE 754 single precision)
    Float32 = 8,
    /// 64-bit floating point (IEEE 754 double precision)
    Float64 = 9,
}

impl ComponentType {
    /// Number of component types.
    pub const COUNT: usize = 10;

    /// All component types in wire order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Int8,
        Self::Uint8,
        Self::Int16,
        Self::Uint16,
        Self::Int32,
        Self::Uint32,
        Self::Int64,
        Self::Uint64,
        Self::Float32,
        Self::Float64,
    ];

    /// Returns the size in bytes of a single element of this type.
    ///
    /// Every payload size in the crate is derived from this table.
    #[inline]
    pub const fn byte_width(self) -> u64 {
        match self {
            Self::Int8 | Self::Uint8 => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
            Self::Int64 | Self::Uint64 | Self::Float64 => 8,
        }
    }

    /// Returns the wire name of this type.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Uint8 => "uint8",
            Self::Int16 => "int16",
            Self::Uint16 => "uint16",
            Self::Int32 => "int32",
            Self::Uint32 => "uint32",
            Self::Int64 => "int64",
            Self::Uint64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// Parse a component type from its wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.name() == name)
    }

    /// Parse a wire name, reporting `field` in the error.
    pub fn parse_field(field: &str, value: &str) -> Result<Self, DecodeError> {
        Self::from_name(value).ok_or_else(|| DecodeError::UnknownComponentType {
            field: field.to_string(),
            value: value.to_string(),
        })
    }

    /// RFC 8746 typed-array tag for a little-endian array of this type.
    #[inline]
    pub const fn cbor_tag(self) -> u64 {
        match self {
            Self::Uint8 => 64,
            Self::Uint16 => 69,
            Self::Uint32 => 70,
            Self::Uint64 => 71,
            Self::Int8 => 72,
            Self::Int16 => 77,
            Self::Int32 => 78,
            Self::Int64 => 79,
            Self::Float32 => 85,
            Self::Float64 => 86,
        }
    }

    /// Inverse of [`cbor_tag`](Self::cbor_tag).
    pub fn from_cbor_tag(tag: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.cbor_tag() == tag)
    }

    /// Returns true if this is an integer type.
    #[inline]
    pub const fn is_integer(self) -> bool {
        !self.is_float()
    }

    /// Returns true if this is a floating point type.
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// Returns true if this type can represent negative values.
    #[inline]
    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64 | Self::Float32 | Self::Float64
        )
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ComponentType {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_field("componentType", s)
    }
}

// === POD Trait for typed payload access ===

/// Rust primitives that can be stored as mesh array components.
///
/// Payload bytes are always little-endian; `read_le`/`write_le` convert
/// regardless of host byte order.
pub trait MeshPod: Pod + Zeroable + Copy + Default {
    /// The corresponding component type.
    const COMPONENT_TYPE: ComponentType;

    /// Size of this type in bytes.
    const SIZE: usize = std::mem::size_of::<Self>();

    /// Decode `out.len()` values from `bytes`, which must be exactly
    /// `out.len() * SIZE` long.
    fn read_le(bytes: &[u8], out: &mut [Self]);

    /// Encode `values` into `out`, which must be exactly
    /// `values.len() * SIZE` long.
    fn write_le(values: &[Self], out: &mut [u8]);
}

impl MeshPod for u8 {
    const COMPONENT_TYPE: ComponentType = ComponentType::Uint8;

    fn read_le(bytes: &[u8], out: &mut [Self]) {
        out.copy_from_slice(bytes);
    }

    fn write_le(values: &[Self], out: &mut [u8]) {
        out.copy_from_slice(values);
    }
}

impl MeshPod for i8 {
    const COMPONENT_TYPE: ComponentType = ComponentType::Int8;

    fn read_le(bytes: &[u8], out: &mut [Self]) {
        out.copy_from_slice(bytemuck::cast_slice(bytes));
    }

    fn write_le(values: &[Self], out: &mut [u8]) {
        out.copy_from_slice(bytemuck::cast_slice(values));
    }
}

macro_rules! impl_mesh_pod {
    ($ty:ty, $component:ident, $read:ident, $write:ident) => {
        impl MeshPod for $ty {
            const COMPONENT_TYPE: ComponentType = ComponentType::$component;

            fn read_le(bytes: &[u8], out: &mut [Self]) {
                LittleEndian::$read(bytes, out);
            }

            fn write_le(values: &[Self], out: &mut [u8]) {
                LittleEndian::$write(values, out);
            }
        }
    };
}

impl_mesh_pod!(i16, Int16, read_i16_into, write_i16_into);
impl_mesh_pod!(u16, Uint16, read_u16_into, write_u16_into);
impl_mesh_pod!(i32, Int32, read_i32_into, write_i32_into);
impl_mesh_pod!(u32, Uint32, read_u32_into, write_u32_into);
impl_mesh_pod!(i64, Int64, read_i64_into, write_i64_into);
impl_mesh_pod!(u64, Uint64, read_u64_into, write_u64_into);
impl_mesh_pod!(f32, Float32, read_f32_into, write_f32_into);
impl_mesh_pod!(f64, Float64, read_f64_into, write_f64_into);

/// Decode little-endian payload bytes into a vector of `T`.
///
/// Trailing bytes that do not fill a whole element are ignored.
pub fn decode_components<T: MeshPod>(bytes: &[u8]) -> Vec<T> {
    let count = bytes.len() / T::SIZE;
    let mut out = vec![T::default(); count];
    T::read_le(&bytes[..count * T::SIZE], &mut out);
    out
}

/// Encode values as little-endian payload bytes.
pub fn encode_components<T: MeshPod>(values: &[T]) -> Vec<u8> {
    let mut out = vec![0u8; values.len() * T::SIZE];
    T::write_le(values, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_widths() {
        let widths: Vec<u64> = ComponentType::ALL.iter().map(|ty| ty.byte_width()).collect();
        assert_eq!(widths, vec![1, 1, 2, 2, 4, 4, 8, 8, 4, 8]);
    }

    #[test]
    fn test_name_roundtrip() {
        for ty in ComponentType::ALL {
            assert_eq!(ComponentType::from_name(ty.name()), Some(ty));
            assert_eq!(ty.name().parse::<ComponentType>().unwrap(), ty);
        }
    }

    #[test]
    fn test_unknown_name() {
        assert_eq!(ComponentType::from_name("int128"), None);
        assert_eq!(ComponentType::from_name("Float32"), None);

        let err = ComponentType::parse_field("pointComponentType", "int128").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("int128"));
        assert!(msg.contains("pointComponentType"));
    }

    #[test]
    fn test_cbor_tags_unique() {
        for ty in ComponentType::ALL {
            assert_eq!(ComponentType::from_cbor_tag(ty.cbor_tag()), Some(ty));
        }
        assert_eq!(ComponentType::from_cbor_tag(65), None);
    }

    #[test]
    fn test_pod_sizes_match_widths() {
        assert_eq!(<i8 as MeshPod>::SIZE as u64, i8::COMPONENT_TYPE.byte_width());
        assert_eq!(<u16 as MeshPod>::SIZE as u64, u16::COMPONENT_TYPE.byte_width());
        assert_eq!(<u32 as MeshPod>::SIZE as u64, u32::COMPONENT_TYPE.byte_width());
        assert_eq!(<i64 as MeshPod>::SIZE as u64, i64::COMPONENT_TYPE.byte_width());
        assert_eq!(<f32 as MeshPod>::SIZE as u64, f32::COMPONENT_TYPE.byte_width());
        assert_eq!(<f64 as MeshPod>::SIZE as u64, f64::COMPONENT_TYPE.byte_width());
    }

    #[test]
    fn test_little_endian_encoding() {
        let bytes = encode_components(&[1u32, 0x0102_0304]);
        assert_eq!(bytes, vec![1, 0, 0, 0, 4, 3, 2, 1]);

        let values: Vec<u32> = decode_components(&bytes);
        assert_eq!(values, vec![1, 0x0102_0304]);

        let floats: Vec<f32> = decode_components(&encode_components(&[1.5f32, -2.0]));
        assert_eq!(floats, vec![1.5, -2.0]);

        let signed: Vec<i8> = decode_components(&[0xff, 0x01]);
        assert_eq!(signed, vec![-1, 1]);
    }
}
