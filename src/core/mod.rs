//! Core layer - the schema model.
//!
//! This module provides:
//! - [`MeshType`] - component and pixel typing of points, cells and their data
//! - [`MeshDescriptor`] - mesh type plus the counts that size every payload
//! - [`PayloadKind`] - the four payloads and their byte-count rules

mod descriptor;
mod payload;

pub use descriptor::{MeshDescriptor, MeshType};
pub use payload::PayloadKind;
