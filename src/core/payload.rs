//! Payload kinds and the byte accounting that sizes them.

use std::fmt;

use super::MeshDescriptor;
use crate::util::ComponentType;

/// One of the four binary arrays of a mesh dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PayloadKind {
    /// Point coordinates
    Points,
    /// Flattened cell connectivity
    Cells,
    /// Per-point pixel values
    PointData,
    /// Per-cell pixel values
    CellData,
}

impl PayloadKind {
    pub const ALL: [Self; 4] = [Self::Points, Self::Cells, Self::PointData, Self::CellData];

    /// Key used for this payload in both index forms.
    #[inline]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Points => "points",
            Self::Cells => "cells",
            Self::PointData => "pointData",
            Self::CellData => "cellData",
        }
    }

    /// Parse a payload key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }

    /// File name of this payload under the `data/` directory.
    #[inline]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Points => "points.raw",
            Self::Cells => "cells.raw",
            Self::PointData => "point-data.raw",
            Self::CellData => "cell-data.raw",
        }
    }

    /// Component type of this payload's elements.
    #[inline]
    pub fn component_type(self, d: &MeshDescriptor) -> ComponentType {
        match self {
            Self::Points => d.mesh_type.point_component_type,
            Self::Cells => d.mesh_type.cell_component_type,
            Self::PointData => d.mesh_type.point_pixel_component_type,
            Self::CellData => d.mesh_type.cell_pixel_component_type,
        }
    }

    /// The count that gates this payload's presence.
    #[inline]
    pub fn count(self, d: &MeshDescriptor) -> u64 {
        match self {
            Self::Points => d.number_of_points,
            Self::Cells => d.number_of_cells,
            Self::PointData => d.number_of_point_pixels,
            Self::CellData => d.number_of_cell_pixels,
        }
    }

    /// Total number of components stored in this payload.
    ///
    /// Cells are variable-length records, so their size comes from
    /// `cell_buffer_size` rather than the cell count.
    pub fn component_count(self, d: &MeshDescriptor) -> u64 {
        if !self.is_present(d) {
            return 0;
        }
        match self {
            Self::Points => d.number_of_points.saturating_mul(u64::from(d.mesh_type.dimension)),
            Self::Cells => d.cell_buffer_size,
            Self::PointData => d
                .number_of_point_pixels
                .saturating_mul(u64::from(d.mesh_type.point_pixel_components)),
            Self::CellData => d
                .number_of_cell_pixels
                .saturating_mul(u64::from(d.mesh_type.cell_pixel_components)),
        }
    }

    /// Whether the descriptor declares this payload.
    #[inline]
    pub fn is_present(self, d: &MeshDescriptor) -> bool {
        self.count(d) > 0
    }

    /// Number of bytes this payload must contain.
    ///
    /// Absent payloads require zero bytes. Sizes that overflow `u64`
    /// saturate, which no real source can satisfy.
    pub fn required_byte_count(self, d: &MeshDescriptor) -> u64 {
        self.component_count(d)
            .saturating_mul(self.component_type(d).byte_width())
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MeshType;

    fn descriptor() -> MeshDescriptor {
        MeshDescriptor {
            mesh_type: MeshType {
                dimension: 3,
                point_component_type: ComponentType::Float32,
                point_pixel_component_type: ComponentType::Float64,
                point_pixel_type: crate::util::PixelType::Vector,
                point_pixel_components: 3,
                cell_component_type: ComponentType::Uint32,
                cell_pixel_component_type: ComponentType::Int16,
                cell_pixel_type: crate::util::PixelType::Scalar,
                cell_pixel_components: 2,
            },
            number_of_points: 4,
            number_of_point_pixels: 4,
            number_of_cells: 2,
            number_of_cell_pixels: 2,
            cell_buffer_size: 10,
        }
    }

    #[test]
    fn test_points_byte_count() {
        let d = descriptor();
        assert_eq!(PayloadKind::Points.required_byte_count(&d), 48);
    }

    #[test]
    fn test_size_laws() {
        let d = descriptor();
        assert_eq!(PayloadKind::Cells.required_byte_count(&d), 10 * 4);
        assert_eq!(PayloadKind::PointData.required_byte_count(&d), 4 * 3 * 8);
        assert_eq!(PayloadKind::CellData.required_byte_count(&d), 2 * 2 * 2);
    }

    #[test]
    fn test_cell_data_uses_cell_pixel_count() {
        let mut d = descriptor();
        d.number_of_point_pixels = 100;
        assert_eq!(PayloadKind::CellData.required_byte_count(&d), 2 * 2 * 2);
    }

    #[test]
    fn test_zero_count_means_absent() {
        let mut d = descriptor();
        d.number_of_points = 0;
        d.number_of_cells = 0;
        assert!(!PayloadKind::Points.is_present(&d));
        assert_eq!(PayloadKind::Points.required_byte_count(&d), 0);
        // cell_buffer_size alone does not make the cells payload present
        assert_eq!(PayloadKind::Cells.required_byte_count(&d), 0);
    }

    #[test]
    fn test_keys_and_files() {
        for kind in PayloadKind::ALL {
            assert_eq!(PayloadKind::from_key(kind.key()), Some(kind));
        }
        assert_eq!(PayloadKind::PointData.file_name(), "point-data.raw");
        assert_eq!(PayloadKind::from_key("meshType"), None);
    }

    #[test]
    fn test_overflow_saturates() {
        let mut d = descriptor();
        d.number_of_points = u64::MAX;
        assert_eq!(PayloadKind::Points.required_byte_count(&d), u64::MAX);
    }
}
