//! Utility types and functions for IWM.
//!
//! This module contains fundamental types used throughout the library:
//! - [`ComponentType`] - Scalar storage kinds and their byte widths
//! - [`PixelType`] - Pixel shape kinds
//! - [`MeshPod`] - Typed, little-endian access to payload bytes
//! - [`Error`] / [`Result`] - Error handling

mod byte_order;
mod component;
mod error;
mod pixel;

pub use byte_order::*;
pub use component::*;
pub use error::*;
pub use pixel::*;
