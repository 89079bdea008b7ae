//! Pixel types - the shape of a composite value at one point or cell.

use std::fmt;
use std::str::FromStr;

use super::DecodeError;

/// Shape/semantic category of the value attached to each point or cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PixelType {
    /// Shape not known to the producer
    Unknown = 0,
    /// One component per pixel
    #[default]
    Scalar = 1,
    /// Fixed-length vector
    Vector = 2,
    /// Fixed-length covariant vector, e.g. a gradient or normal
    CovariantVector = 3,
    /// Symmetric tensor stored as its upper triangle
    SymmetricSecondRankTensor = 4,
    /// Symmetric 3x3 diffusion tensor (6 components)
    DiffusionTensor3D = 5,
    /// Real and imaginary parts (2 components)
    Complex = 6,
    /// Fixed-length array with no vector semantics
    FixedArray = 7,
    /// Fixed-size matrix in row-major order
    Matrix = 8,
    /// Vector whose length is set at run time
    VariableLengthVector = 9,
    /// Matrix whose size is set at run time
    VariableSizeMatrix = 10,
}

impl PixelType {
    /// Number of pixel types, including `Unknown`.
    pub const COUNT: usize = 11;

    /// All pixel types in wire order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Unknown,
        Self::Scalar,
        Self::Vector,
        Self::CovariantVector,
        Self::SymmetricSecondRankTensor,
        Self::DiffusionTensor3D,
        Self::Complex,
        Self::FixedArray,
        Self::Matrix,
        Self::VariableLengthVector,
        Self::VariableSizeMatrix,
    ];

    /// Returns the wire name of this type.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Scalar => "Scalar",
            Self::Vector => "Vector",
            Self::CovariantVector => "CovariantVector",
            Self::SymmetricSecondRankTensor => "SymmetricSecondRankTensor",
            Self::DiffusionTensor3D => "DiffusionTensor3D",
            Self::Complex => "Complex",
            Self::FixedArray => "FixedArray",
            Self::Matrix => "Matrix",
            Self::VariableLengthVector => "VariableLengthVector",
            Self::VariableSizeMatrix => "VariableSizeMatrix",
        }
    }

    /// Parse a pixel type from its wire name.
    ///
    /// `"Unknown"` is a valid name; anything outside the table is not.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.name() == name)
    }

    /// Parse a wire name, reporting `field` in the error.
    pub fn parse_field(field: &str, value: &str) -> Result<Self, DecodeError> {
        Self::from_name(value).ok_or_else(|| DecodeError::UnknownPixelType {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelType {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_field("pixelType", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_roundtrip() {
        for ty in PixelType::ALL {
            assert_eq!(PixelType::from_name(ty.name()), Some(ty));
        }
    }

    #[test]
    fn test_pixel_unknown_is_named() {
        assert_eq!(PixelType::from_name("Unknown"), Some(PixelType::Unknown));
        assert_eq!(PixelType::from_name("RGBA"), None);
        assert!(matches!(
            "scalar".parse::<PixelType>(),
            Err(DecodeError::UnknownPixelType { .. })
        ));
    }
}
