//! # IWM
//!
//! Reader and writer for IWM mesh datasets: point coordinates, cell
//! connectivity, and optional per-point and per-cell pixel data.
//!
//! A dataset is stored in one of two interchangeable forms:
//!
//! - **Directory** (`mesh.iwm/`) - an `index.json` document describing the
//!   mesh, plus one raw little-endian file per payload under `data/`.
//! - **Container** (`mesh.iwm.cbor`) - a single CBOR map holding the same
//!   index fields and the payloads as embedded byte strings.
//!
//! Reading one form and writing the other reproduces an equivalent dataset.
//!
//! ## Modules
//!
//! - [`util`] - Component/pixel types, byte order, errors
//! - [`core`] - Mesh descriptor and payload sizing
//! - [`index`] - Index encoding for both forms
//! - [`store`] - Payload storage for both forms
//! - [`mesh_io`] - Session API ([`MeshIo`])
//! - [`mesh`] - Whole-mesh helpers
//!
//! ## Example
//!
//! ```no_run
//! use iwm::prelude::*;
//!
//! let mut mesh = Mesh::new();
//! mesh.set_points(3, &[0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0])?;
//! mesh.set_cells(1, &[2u32, 3, 0, 1, 2]);
//! write_mesh("triangle.iwm", &mesh)?;
//!
//! convert("triangle.iwm", "triangle.iwm.cbor")?;
//! let back = read_mesh("triangle.iwm.cbor")?;
//! assert_eq!(back.points_as::<f32>()?.len(), 9);
//! # Ok::<(), iwm::Error>(())
//! ```

pub mod util;
pub mod core;
pub mod index;
pub mod store;
pub mod mesh_io;
pub mod mesh;

// Re-export commonly used types
pub use crate::util::{ByteOrder, ComponentType, DecodeError, Error, MeshPod, PixelType, Result};
pub use crate::core::{MeshDescriptor, MeshType, PayloadKind};
pub use crate::mesh_io::{can_read_file, can_write_file, MeshFormat, MeshIo, MeshIoOptions, SessionState};
pub use crate::mesh::{convert, read_mesh, write_mesh, Mesh};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{ComponentType, Error, MeshPod, PixelType, Result};
    pub use crate::core::{MeshDescriptor, MeshType, PayloadKind};
    pub use crate::mesh_io::{MeshFormat, MeshIo, MeshIoOptions, SessionState};
    pub use crate::mesh::{convert, read_mesh, write_mesh, Mesh};
}
