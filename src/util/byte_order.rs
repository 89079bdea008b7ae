//! Byte order of payload data.

use std::fmt;

/// Byte order of binary payloads.
///
/// IWM payloads are always little-endian; the variant exists so callers can
/// state and check their expectation explicitly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    /// The byte order used by every IWM payload.
    pub const PAYLOAD: Self = Self::LittleEndian;

    /// Byte order of the running host.
    #[inline]
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            Self::LittleEndian
        } else {
            Self::BigEndian
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LittleEndian => f.write_str("LittleEndian"),
            Self::BigEndian => f.write_str("BigEndian"),
        }
    }
}
