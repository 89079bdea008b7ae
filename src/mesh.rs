//! Whole-mesh helpers.
//!
//! [`Mesh`] holds a descriptor together with all four payloads, so a dataset
//! can be read, inspected, and written in one call each. Typed views go
//! through [`MeshPod`] and are checked against the descriptor.

use std::path::Path;

use tracing::debug;

use crate::core::{MeshDescriptor, PayloadKind};
use crate::mesh_io::MeshIo;
use crate::util::{decode_components, encode_components, Error, MeshPod, PixelType, Result};

/// A complete mesh dataset held in memory.
///
/// Payload buffers are little-endian bytes laid out exactly as stored.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub descriptor: MeshDescriptor,
    pub points: Vec<u8>,
    pub cells: Vec<u8>,
    pub point_data: Vec<u8>,
    pub cell_data: Vec<u8>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_descriptor(descriptor: MeshDescriptor) -> Self {
        Self {
            descriptor,
            ..Self::default()
        }
    }

    /// Bytes of one payload.
    pub fn payload(&self, kind: PayloadKind) -> &[u8] {
        match kind {
            PayloadKind::Points => &self.points,
            PayloadKind::Cells => &self.cells,
            PayloadKind::PointData => &self.point_data,
            PayloadKind::CellData => &self.cell_data,
        }
    }

    fn payload_mut(&mut self, kind: PayloadKind) -> &mut Vec<u8> {
        match kind {
            PayloadKind::Points => &mut self.points,
            PayloadKind::Cells => &mut self.cells,
            PayloadKind::PointData => &mut self.point_data,
            PayloadKind::CellData => &mut self.cell_data,
        }
    }

    /// Replace one payload's raw bytes. The descriptor is not touched.
    pub fn set_payload(&mut self, kind: PayloadKind, bytes: Vec<u8>) {
        *self.payload_mut(kind) = bytes;
    }

    /// Set point coordinates, `dimension` components per point.
    ///
    /// Updates the point component type, dimension and point count. Fails
    /// with [`Error::UnevenValues`] unless `coords` holds whole points; the
    /// mesh is left unchanged on error.
    pub fn set_points<T: MeshPod>(&mut self, dimension: u32, coords: &[T]) -> Result<()> {
        let count = item_count(PayloadKind::Points, coords.len(), dimension)?;
        let d = &mut self.descriptor;
        d.set_point_dimension(dimension);
        d.set_point_component_type(T::COMPONENT_TYPE);
        d.set_number_of_points(count);
        self.points = encode_components(coords);
        Ok(())
    }

    /// Set the flat cell buffer for `number_of_cells` cells.
    ///
    /// The buffer length becomes `cellBufferSize`.
    pub fn set_cells<T: MeshPod>(&mut self, number_of_cells: u64, buffer: &[T]) {
        let d = &mut self.descriptor;
        d.set_cell_component_type(T::COMPONENT_TYPE);
        d.set_number_of_cells(number_of_cells);
        d.set_cell_buffer_size(buffer.len() as u64);
        self.cells = encode_components(buffer);
    }

    /// Set per-point pixel data, `components` values per pixel.
    pub fn set_point_data<T: MeshPod>(
        &mut self,
        pixel_type: PixelType,
        components: u32,
        values: &[T],
    ) -> Result<()> {
        let count = item_count(PayloadKind::PointData, values.len(), components)?;
        let d = &mut self.descriptor;
        d.set_point_pixel_component_type(T::COMPONENT_TYPE);
        d.set_point_pixel_type(pixel_type);
        d.set_number_of_point_pixel_components(components);
        d.set_number_of_point_pixels(count);
        self.point_data = encode_components(values);
        Ok(())
    }

    /// Set per-cell pixel data, `components` values per pixel.
    pub fn set_cell_data<T: MeshPod>(
        &mut self,
        pixel_type: PixelType,
        components: u32,
        values: &[T],
    ) -> Result<()> {
        let count = item_count(PayloadKind::CellData, values.len(), components)?;
        let d = &mut self.descriptor;
        d.set_cell_pixel_component_type(T::COMPONENT_TYPE);
        d.set_cell_pixel_type(pixel_type);
        d.set_number_of_cell_pixel_components(components);
        d.set_number_of_cell_pixels(count);
        self.cell_data = encode_components(values);
        Ok(())
    }

    /// Decode a payload as `T`, which must match the descriptor's component
    /// type for that payload.
    pub fn payload_as<T: MeshPod>(&self, kind: PayloadKind) -> Result<Vec<T>> {
        let expected = kind.component_type(&self.descriptor);
        if T::COMPONENT_TYPE != expected {
            return Err(Error::TypeMismatch {
                expected: expected.to_string(),
                actual: T::COMPONENT_TYPE.to_string(),
            });
        }
        Ok(decode_components(self.payload(kind)))
    }

    pub fn points_as<T: MeshPod>(&self) -> Result<Vec<T>> {
        self.payload_as(PayloadKind::Points)
    }

    pub fn cells_as<T: MeshPod>(&self) -> Result<Vec<T>> {
        self.payload_as(PayloadKind::Cells)
    }

    pub fn point_data_as<T: MeshPod>(&self) -> Result<Vec<T>> {
        self.payload_as(PayloadKind::PointData)
    }

    pub fn cell_data_as<T: MeshPod>(&self) -> Result<Vec<T>> {
        self.payload_as(PayloadKind::CellData)
    }

    /// Check that every payload holds exactly its required byte count, so
    /// writing the mesh stores every byte.
    pub fn validate(&self) -> Result<()> {
        for kind in PayloadKind::ALL {
            let required = kind.required_byte_count(&self.descriptor);
            let actual = self.payload(kind).len() as u64;
            if actual != required {
                return Err(Error::PayloadLength {
                    kind,
                    required,
                    actual,
                });
            }
        }
        Ok(())
    }
}

/// Number of `width`-component items in `len` values.
fn item_count(kind: PayloadKind, len: usize, width: u32) -> Result<u64> {
    let len = len as u64;
    let uneven = Error::UnevenValues { kind, len, width };
    match u64::from(width) {
        0 if len == 0 => Ok(0),
        0 => Err(uneven),
        w if len % w != 0 => Err(uneven),
        w => Ok(len / w),
    }
}

fn read_session(mut io: MeshIo) -> Result<Mesh> {
    let descriptor = *io.read_metadata()?;
    let mut mesh = Mesh::with_descriptor(descriptor);
    for kind in PayloadKind::ALL {
        let bytes = io.read_payload_vec(kind)?;
        mesh.set_payload(kind, bytes);
    }
    io.close();
    Ok(mesh)
}

fn write_session(io: &mut MeshIo, mesh: &Mesh) -> Result<()> {
    mesh.validate()?;
    io.set_descriptor(mesh.descriptor)?;
    io.write_metadata()?;
    for kind in PayloadKind::ALL {
        io.write_payload(kind, mesh.payload(kind))?;
    }
    io.finalize()
}

/// Read a whole dataset from either form.
pub fn read_mesh(path: impl AsRef<Path>) -> Result<Mesh> {
    read_session(MeshIo::new(path)?)
}

/// Read a whole dataset from container bytes.
pub fn read_mesh_from_buffer(bytes: Vec<u8>) -> Result<Mesh> {
    read_session(MeshIo::from_buffer(bytes))
}

/// Write a whole dataset; the form follows the path suffix.
pub fn write_mesh(path: impl AsRef<Path>, mesh: &Mesh) -> Result<()> {
    let mut io = MeshIo::new(path)?;
    write_session(&mut io, mesh)
}

/// Write a whole dataset as container bytes.
pub fn write_mesh_to_buffer(mesh: &Mesh) -> Result<Vec<u8>> {
    let mut io = MeshIo::to_buffer();
    write_session(&mut io, mesh)?;
    io.into_buffer().ok_or_else(|| Error::encode("container buffer was not produced"))
}

/// Re-encode the dataset at `src` into `dst`, typically switching form.
///
/// Returns the descriptor that was carried over.
pub fn convert(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<MeshDescriptor> {
    let (src, dst) = (src.as_ref(), dst.as_ref());
    let mesh = read_mesh(src)?;
    write_mesh(dst, &mesh)?;
    debug!("Converted {} -> {}", src.display(), dst.display());
    Ok(mesh.descriptor)
}
