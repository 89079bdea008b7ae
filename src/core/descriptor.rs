//! Mesh descriptor - the schema of an IWM dataset.
//!
//! A descriptor records dimensionality, element types and element counts. It
//! never owns payload memory; binary arrays are always supplied by the caller.

use crate::util::{ComponentType, PixelType};

/// Per-array type information, stored under `meshType` in both index forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshType {
    /// Spatial dimension of point coordinates
    pub dimension: u32,
    /// Component type of point coordinates
    pub point_component_type: ComponentType,
    /// Component type of per-point pixel values
    pub point_pixel_component_type: ComponentType,
    /// Shape of per-point pixel values
    pub point_pixel_type: PixelType,
    /// Components per point pixel
    pub point_pixel_components: u32,
    /// Component type of the flattened cell connectivity
    pub cell_component_type: ComponentType,
    /// Component type of per-cell pixel values
    pub cell_pixel_component_type: ComponentType,
    /// Shape of per-cell pixel values
    pub cell_pixel_type: PixelType,
    /// Components per cell pixel
    pub cell_pixel_components: u32,
}

impl Default for MeshType {
    fn default() -> Self {
        Self {
            dimension: 3,
            point_component_type: ComponentType::Float32,
            point_pixel_component_type: ComponentType::Float32,
            point_pixel_type: PixelType::Scalar,
            point_pixel_components: 1,
            cell_component_type: ComponentType::Uint32,
            cell_pixel_component_type: ComponentType::Float32,
            cell_pixel_type: PixelType::Scalar,
            cell_pixel_components: 1,
        }
    }
}

/// Complete descriptor of a mesh dataset.
///
/// Counts gate payload presence: a zero count means the corresponding
/// payload is absent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MeshDescriptor {
    pub mesh_type: MeshType,
    pub number_of_points: u64,
    pub number_of_point_pixels: u64,
    pub number_of_cells: u64,
    pub number_of_cell_pixels: u64,
    /// Total element count of the flattened, variable-length cell array.
    pub cell_buffer_size: u64,
}

impl MeshDescriptor {
    /// Create a descriptor with default types and no payloads.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a descriptor for the given mesh type with no payloads.
    pub fn with_mesh_type(mesh_type: MeshType) -> Self {
        Self {
            mesh_type,
            ..Self::default()
        }
    }

    // === Getters ===

    #[inline]
    pub fn point_dimension(&self) -> u32 {
        self.mesh_type.dimension
    }

    #[inline]
    pub fn point_component_type(&self) -> ComponentType {
        self.mesh_type.point_component_type
    }

    #[inline]
    pub fn point_pixel_component_type(&self) -> ComponentType {
        self.mesh_type.point_pixel_component_type
    }

    #[inline]
    pub fn point_pixel_type(&self) -> PixelType {
        self.mesh_type.point_pixel_type
    }

    #[inline]
    pub fn number_of_point_pixel_components(&self) -> u32 {
        self.mesh_type.point_pixel_components
    }

    #[inline]
    pub fn cell_component_type(&self) -> ComponentType {
        self.mesh_type.cell_component_type
    }

    #[inline]
    pub fn cell_pixel_component_type(&self) -> ComponentType {
        self.mesh_type.cell_pixel_component_type
    }

    #[inline]
    pub fn cell_pixel_type(&self) -> PixelType {
        self.mesh_type.cell_pixel_type
    }

    #[inline]
    pub fn number_of_cell_pixel_components(&self) -> u32 {
        self.mesh_type.cell_pixel_components
    }

    // === Setters ===

    pub fn set_point_dimension(&mut self, dimension: u32) {
        self.mesh_type.dimension = dimension;
    }

    pub fn set_point_component_type(&mut self, ty: ComponentType) {
        self.mesh_type.point_component_type = ty;
    }

    pub fn set_point_pixel_component_type(&mut self, ty: ComponentType) {
        self.mesh_type.point_pixel_component_type = ty;
    }

    pub fn set_point_pixel_type(&mut self, ty: PixelType) {
        self.mesh_type.point_pixel_type = ty;
    }

    pub fn set_number_of_point_pixel_components(&mut self, components: u32) {
        self.mesh_type.point_pixel_components = components;
    }

    pub fn set_cell_component_type(&mut self, ty: ComponentType) {
        self.mesh_type.cell_component_type = ty;
    }

    pub fn set_cell_pixel_component_type(&mut self, ty: ComponentType) {
        self.mesh_type.cell_pixel_component_type = ty;
    }

    pub fn set_cell_pixel_type(&mut self, ty: PixelType) {
        self.mesh_type.cell_pixel_type = ty;
    }

    pub fn set_number_of_cell_pixel_components(&mut self, components: u32) {
        self.mesh_type.cell_pixel_components = components;
    }

    pub fn set_number_of_points(&mut self, count: u64) {
        self.number_of_points = count;
    }

    pub fn set_number_of_point_pixels(&mut self, count: u64) {
        self.number_of_point_pixels = count;
    }

    pub fn set_number_of_cells(&mut self, count: u64) {
        self.number_of_cells = count;
    }

    pub fn set_number_of_cell_pixels(&mut self, count: u64) {
        self.number_of_cell_pixels = count;
    }

    pub fn set_cell_buffer_size(&mut self, size: u64) {
        self.cell_buffer_size = size;
    }
}
