//! Index encoding for both IWM forms.
//!
//! The index is the same closed schema in both forms:
//!
//! ```text
//! meshType
//!   dimension, pointComponentType, pointPixelComponentType, pointPixelType,
//!   pointPixelComponents, cellComponentType, cellPixelComponentType,
//!   cellPixelType, cellPixelComponents
//! numberOfPoints, numberOfPointPixels, numberOfCells, numberOfCellPixels,
//! cellBufferSize
//! points, cells, pointData, cellData
//! ```
//!
//! - [`json`] - `index.json` of the directory form; payload keys hold
//!   documentary location strings
//! - [`cbor`] - root map of the container form; payload keys hold the
//!   raw payload bytes
//!
//! Decoding is strict in both forms: unknown keys, duplicate keys and missing
//! keys are all errors.

pub mod cbor;
pub mod json;

use crate::core::{MeshDescriptor, MeshType};
use crate::util::{ComponentType, DecodeError, PixelType};

pub const MESH_TYPE: &str = "meshType";

pub const DIMENSION: &str = "dimension";
pub const POINT_COMPONENT_TYPE: &str = "pointComponentType";
pub const POINT_PIXEL_COMPONENT_TYPE: &str = "pointPixelComponentType";
pub const POINT_PIXEL_TYPE: &str = "pointPixelType";
pub const POINT_PIXEL_COMPONENTS: &str = "pointPixelComponents";
pub const CELL_COMPONENT_TYPE: &str = "cellComponentType";
pub const CELL_PIXEL_COMPONENT_TYPE: &str = "cellPixelComponentType";
pub const CELL_PIXEL_TYPE: &str = "cellPixelType";
pub const CELL_PIXEL_COMPONENTS: &str = "cellPixelComponents";

pub const NUMBER_OF_POINTS: &str = "numberOfPoints";
pub const NUMBER_OF_POINT_PIXELS: &str = "numberOfPointPixels";
pub const NUMBER_OF_CELLS: &str = "numberOfCells";
pub const NUMBER_OF_CELL_PIXELS: &str = "numberOfCellPixels";
pub const CELL_BUFFER_SIZE: &str = "cellBufferSize";

/// Scope names used in decode errors.
pub(crate) const INDEX_SCOPE: &str = "index";
pub(crate) const MESH_TYPE_SCOPE: &str = "meshType";

/// Scalar access shared by the JSON and CBOR value trees.
pub(crate) trait IndexValue {
    fn as_unsigned(&self) -> Option<u64>;
    fn as_string(&self) -> Option<&str>;
}

impl IndexValue for serde_json::Value {
    fn as_unsigned(&self) -> Option<u64> {
        self.as_u64()
    }

    fn as_string(&self) -> Option<&str> {
        self.as_str()
    }
}

impl IndexValue for ciborium::Value {
    fn as_unsigned(&self) -> Option<u64> {
        self.as_integer().and_then(|i| u64::try_from(i).ok())
    }

    fn as_string(&self) -> Option<&str> {
        self.as_text()
    }
}

/// Collects index fields while walking either form, then checks that the
/// closed field set is complete.
#[derive(Debug, Default)]
pub(crate) struct DescriptorFields {
    mesh_type_seen: bool,
    dimension: Option<u32>,
    point_component_type: Option<ComponentType>,
    point_pixel_component_type: Option<ComponentType>,
    point_pixel_type: Option<PixelType>,
    point_pixel_components: Option<u32>,
    cell_component_type: Option<ComponentType>,
    cell_pixel_component_type: Option<ComponentType>,
    cell_pixel_type: Option<PixelType>,
    cell_pixel_components: Option<u32>,
    number_of_points: Option<u64>,
    number_of_point_pixels: Option<u64>,
    number_of_cells: Option<u64>,
    number_of_cell_pixels: Option<u64>,
    cell_buffer_size: Option<u64>,
}

fn put<T>(slot: &mut Option<T>, scope: &'static str, key: &str, value: T) -> Result<(), DecodeError> {
    if slot.is_some() {
        return Err(DecodeError::DuplicateKey {
            scope,
            key: key.to_string(),
        });
    }
    *slot = Some(value);
    Ok(())
}

fn read_u32<V: IndexValue>(key: &str, value: &V) -> Result<u32, DecodeError> {
    value
        .as_unsigned()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| DecodeError::invalid(key, "unsigned 32-bit integer"))
}

fn read_u64<V: IndexValue>(key: &str, value: &V) -> Result<u64, DecodeError> {
    value
        .as_unsigned()
        .ok_or_else(|| DecodeError::invalid(key, "unsigned 64-bit integer"))
}

fn read_component<V: IndexValue>(key: &str, value: &V) -> Result<ComponentType, DecodeError> {
    let name = value
        .as_string()
        .ok_or_else(|| DecodeError::invalid(key, "component type string"))?;
    ComponentType::parse_field(key, name)
}

fn read_pixel<V: IndexValue>(key: &str, value: &V) -> Result<PixelType, DecodeError> {
    let name = value
        .as_string()
        .ok_or_else(|| DecodeError::invalid(key, "pixel type string"))?;
    PixelType::parse_field(key, name)
}

fn require<T>(slot: Option<T>, scope: &'static str, key: &str) -> Result<T, DecodeError> {
    slot.ok_or_else(|| DecodeError::MissingKey {
        scope,
        key: key.to_string(),
    })
}

impl DescriptorFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the `meshType` map was encountered.
    pub fn begin_mesh_type(&mut self) -> Result<(), DecodeError> {
        if self.mesh_type_seen {
            return Err(DecodeError::DuplicateKey {
                scope: INDEX_SCOPE,
                key: MESH_TYPE.to_string(),
            });
        }
        self.mesh_type_seen = true;
        Ok(())
    }

    /// Accept one entry of the `meshType` map.
    pub fn mesh_type_entry<V: IndexValue>(&mut self, key: &str, value: &V) -> Result<(), DecodeError> {
        const S: &str = MESH_TYPE_SCOPE;
        match key {
            DIMENSION => put(&mut self.dimension, S, key, read_u32(key, value)?),
            POINT_COMPONENT_TYPE => {
                put(&mut self.point_component_type, S, key, read_component(key, value)?)
            }
            POINT_PIXEL_COMPONENT_TYPE => put(
                &mut self.point_pixel_component_type,
                S,
                key,
                read_component(key, value)?,
            ),
            POINT_PIXEL_TYPE => put(&mut self.point_pixel_type, S, key, read_pixel(key, value)?),
            POINT_PIXEL_COMPONENTS => {
                put(&mut self.point_pixel_components, S, key, read_u32(key, value)?)
            }
            CELL_COMPONENT_TYPE => {
                put(&mut self.cell_component_type, S, key, read_component(key, value)?)
            }
            CELL_PIXEL_COMPONENT_TYPE => put(
                &mut self.cell_pixel_component_type,
                S,
                key,
                read_component(key, value)?,
            ),
            CELL_PIXEL_TYPE => put(&mut self.cell_pixel_type, S, key, read_pixel(key, value)?),
            CELL_PIXEL_COMPONENTS => {
                put(&mut self.cell_pixel_components, S, key, read_u32(key, value)?)
            }
            _ => Err(DecodeError::UnknownKey {
                scope: S,
                key: key.to_string(),
            }),
        }
    }

    /// Accept one top-level count entry. Any other key is rejected.
    pub fn count_entry<V: IndexValue>(&mut self, key: &str, value: &V) -> Result<(), DecodeError> {
        const S: &str = INDEX_SCOPE;
        match key {
            NUMBER_OF_POINTS => put(&mut self.number_of_points, S, key, read_u64(key, value)?),
            NUMBER_OF_POINT_PIXELS => {
                put(&mut self.number_of_point_pixels, S, key, read_u64(key, value)?)
            }
            NUMBER_OF_CELLS => put(&mut self.number_of_cells, S, key, read_u64(key, value)?),
            NUMBER_OF_CELL_PIXELS => {
                put(&mut self.number_of_cell_pixels, S, key, read_u64(key, value)?)
            }
            CELL_BUFFER_SIZE => put(&mut self.cell_buffer_size, S, key, read_u64(key, value)?),
            _ => Err(DecodeError::UnknownKey {
                scope: S,
                key: key.to_string(),
            }),
        }
    }

    /// Check completeness and build the descriptor.
    pub fn finish(self) -> Result<MeshDescriptor, DecodeError> {
        if !self.mesh_type_seen {
            return Err(DecodeError::MissingKey {
                scope: INDEX_SCOPE,
                key: MESH_TYPE.to_string(),
            });
        }
        const M: &str = MESH_TYPE_SCOPE;
        const I: &str = INDEX_SCOPE;
        let mesh_type = MeshType {
            dimension: require(self.dimension, M, DIMENSION)?,
            point_component_type: require(self.point_component_type, M, POINT_COMPONENT_TYPE)?,
            point_pixel_component_type: require(
                self.point_pixel_component_type,
                M,
                POINT_PIXEL_COMPONENT_TYPE,
            )?,
            point_pixel_type: require(self.point_pixel_type, M, POINT_PIXEL_TYPE)?,
            point_pixel_components: require(self.point_pixel_components, M, POINT_PIXEL_COMPONENTS)?,
            cell_component_type: require(self.cell_component_type, M, CELL_COMPONENT_TYPE)?,
            cell_pixel_component_type: require(
                self.cell_pixel_component_type,
                M,
                CELL_PIXEL_COMPONENT_TYPE,
            )?,
            cell_pixel_type: require(self.cell_pixel_type, M, CELL_PIXEL_TYPE)?,
            cell_pixel_components: require(self.cell_pixel_components, M, CELL_PIXEL_COMPONENTS)?,
        };
        Ok(MeshDescriptor {
            mesh_type,
            number_of_points: require(self.number_of_points, I, NUMBER_OF_POINTS)?,
            number_of_point_pixels: require(self.number_of_point_pixels, I, NUMBER_OF_POINT_PIXELS)?,
            number_of_cells: require(self.number_of_cells, I, NUMBER_OF_CELLS)?,
            number_of_cell_pixels: require(self.number_of_cell_pixels, I, NUMBER_OF_CELL_PIXELS)?,
            cell_buffer_size: require(self.cell_buffer_size, I, CELL_BUFFER_SIZE)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_mesh_type(fields: &mut DescriptorFields) {
        fields.begin_mesh_type().unwrap();
        let entries = [
            (DIMENSION, json!(3)),
            (POINT_COMPONENT_TYPE, json!("float32")),
            (POINT_PIXEL_COMPONENT_TYPE, json!("float32")),
            (POINT_PIXEL_TYPE, json!("Scalar")),
            (POINT_PIXEL_COMPONENTS, json!(1)),
            (CELL_COMPONENT_TYPE, json!("uint32")),
            (CELL_PIXEL_COMPONENT_TYPE, json!("float32")),
            (CELL_PIXEL_TYPE, json!("Scalar")),
            (CELL_PIXEL_COMPONENTS, json!(1)),
        ];
        for (key, value) in entries {
            fields.mesh_type_entry(key, &value).unwrap();
        }
    }

    #[test]
    fn test_missing_count_is_named() {
        let mut fields = DescriptorFields::new();
        full_mesh_type(&mut fields);
        for key in [NUMBER_OF_POINTS, NUMBER_OF_POINT_PIXELS, NUMBER_OF_CELLS, NUMBER_OF_CELL_PIXELS] {
            fields.count_entry(key, &json!(0)).unwrap();
        }
        let err = fields.finish().unwrap_err();
        assert_eq!(
            err,
            DecodeError::MissingKey {
                scope: INDEX_SCOPE,
                key: CELL_BUFFER_SIZE.to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut fields = DescriptorFields::new();
        fields.count_entry(NUMBER_OF_POINTS, &json!(1)).unwrap();
        let err = fields.count_entry(NUMBER_OF_POINTS, &json!(2)).unwrap_err();
        assert!(matches!(err, DecodeError::DuplicateKey { .. }));
    }

    #[test]
    fn test_value_kinds_checked() {
        let mut fields = DescriptorFields::new();
        let err = fields.count_entry(NUMBER_OF_CELLS, &json!(-1)).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidValue { .. }));

        let err = fields.mesh_type_entry(DIMENSION, &json!(1u64 << 40)).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidValue { .. }));

        let err = fields.mesh_type_entry(CELL_PIXEL_TYPE, &json!(7)).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidValue { .. }));
    }

    #[test]
    fn test_cbor_values_accepted() {
        let mut fields = DescriptorFields::new();
        fields
            .count_entry(NUMBER_OF_POINTS, &ciborium::Value::Integer(12u64.into()))
            .unwrap();
        fields
            .mesh_type_entry(POINT_PIXEL_TYPE, &ciborium::Value::Text("Vector".into()))
            .unwrap();
        let err = fields
            .mesh_type_entry(CELL_COMPONENT_TYPE, &ciborium::Value::Text("int128".into()))
            .unwrap_err();
        assert!(matches!(err, DecodeError::UnknownComponentType { .. }));
    }
}
