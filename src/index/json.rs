//! `index.json` - the index document of the directory form.
//!
//! Field order is fixed so hand-edited documents stay diffable. The four
//! payload-location strings are written for readers of the document; on read
//! they are checked for type and otherwise ignored, since the `data/`
//! directory layout is the source of truth.
//!
//! [`decode`] walks the document's maps entry by entry rather than through a
//! [`Value`] tree, so a repeated key is reported instead of overwritten.

use std::collections::BTreeSet;
use std::fmt;

use serde::de::{self, DeserializeSeed, Deserializer as _, MapAccess, Visitor};
use serde::Serialize;
use serde_json::Value;

use super::*;
use crate::core::{MeshDescriptor, PayloadKind};
use crate::util::{DecodeError, Error, Result};

/// Prefix of the symbolic location strings.
pub const LOCATION_PREFIX: &str = "data:application/vnd.itk.path,data/";

/// Location string written for a payload, e.g.
/// `data:application/vnd.itk.path,data/points.raw`.
pub fn location(kind: PayloadKind) -> String {
    format!("{LOCATION_PREFIX}{}", kind.file_name())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MeshTypeDocument {
    dimension: u32,
    point_component_type: &'static str,
    point_pixel_component_type: &'static str,
    point_pixel_type: &'static str,
    point_pixel_components: u32,
    cell_component_type: &'static str,
    cell_pixel_component_type: &'static str,
    cell_pixel_type: &'static str,
    cell_pixel_components: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexDocument {
    mesh_type: MeshTypeDocument,
    number_of_points: u64,
    number_of_point_pixels: u64,
    number_of_cells: u64,
    number_of_cell_pixels: u64,
    cell_buffer_size: u64,
    points: String,
    cells: String,
    point_data: String,
    cell_data: String,
}

impl IndexDocument {
    fn new(d: &MeshDescriptor) -> Self {
        let t = &d.mesh_type;
        Self {
            mesh_type: MeshTypeDocument {
                dimension: t.dimension,
                point_component_type: t.point_component_type.name(),
                point_pixel_component_type: t.point_pixel_component_type.name(),
                point_pixel_type: t.point_pixel_type.name(),
                point_pixel_components: t.point_pixel_components,
                cell_component_type: t.cell_component_type.name(),
                cell_pixel_component_type: t.cell_pixel_component_type.name(),
                cell_pixel_type: t.cell_pixel_type.name(),
                cell_pixel_components: t.cell_pixel_components,
            },
            number_of_points: d.number_of_points,
            number_of_point_pixels: d.number_of_point_pixels,
            number_of_cells: d.number_of_cells,
            number_of_cell_pixels: d.number_of_cell_pixels,
            cell_buffer_size: d.cell_buffer_size,
            points: location(PayloadKind::Points),
            cells: location(PayloadKind::Cells),
            point_data: location(PayloadKind::PointData),
            cell_data: location(PayloadKind::CellData),
        }
    }
}

/// Encode a descriptor as an index document.
pub fn encode(d: &MeshDescriptor, pretty: bool) -> Result<String> {
    let doc = IndexDocument::new(d);
    let text = if pretty {
        serde_json::to_string_pretty(&doc)
    } else {
        serde_json::to_string(&doc)
    };
    text.map_err(|e| Error::encode(e.to_string()))
}

fn json_error(e: &serde_json::Error) -> DecodeError {
    DecodeError::Json {
        line: e.line(),
        column: e.column(),
        message: e.to_string(),
    }
}

/// Record a schema error so it survives the trip through `serde_json::Error`.
fn fail<E: de::Error>(failure: &mut Option<DecodeError>, e: DecodeError) -> E {
    let err = E::custom(&e);
    *failure = Some(e);
    err
}

/// Root object of the index document.
struct IndexVisitor<'a> {
    failure: &'a mut Option<DecodeError>,
}

impl<'de> Visitor<'de> for IndexVisitor<'_> {
    type Value = MeshDescriptor;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an index object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
        let failure = self.failure;
        let mut fields = DescriptorFields::new();
        let mut locations = BTreeSet::new();

        while let Some(key) = map.next_key::<String>()? {
            if key == MESH_TYPE {
                if let Err(e) = fields.begin_mesh_type() {
                    return Err(fail(failure, e));
                }
                map.next_value_seed(MeshTypeSeed {
                    fields: &mut fields,
                    failure: &mut *failure,
                })?;
            } else if let Some(kind) = PayloadKind::from_key(&key) {
                let value: Value = map.next_value()?;
                if !locations.insert(kind) {
                    return Err(fail(failure, DecodeError::DuplicateKey { scope: INDEX_SCOPE, key }));
                }
                if !value.is_string() {
                    return Err(fail(failure, DecodeError::invalid(key, "location string")));
                }
            } else {
                let value: Value = map.next_value()?;
                if let Err(e) = fields.count_entry(&key, &value) {
                    return Err(fail(failure, e));
                }
            }
        }

        fields.finish().map_err(|e| fail(failure, e))
    }
}

/// The nested `meshType` object, fed straight into the field collector.
struct MeshTypeSeed<'a> {
    fields: &'a mut DescriptorFields,
    failure: &'a mut Option<DecodeError>,
}

impl<'de> DeserializeSeed<'de> for MeshTypeSeed<'_> {
    type Value = ();

    fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> std::result::Result<(), D::Error> {
        deserializer.deserialize_map(self)
    }
}

impl<'de> Visitor<'de> for MeshTypeSeed<'_> {
    type Value = ();

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a meshType object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<(), A::Error> {
        let Self { fields, failure } = self;
        while let Some(key) = map.next_key::<String>()? {
            let value: Value = map.next_value()?;
            if let Err(e) = fields.mesh_type_entry(&key, &value) {
                return Err(fail(failure, e));
            }
        }
        Ok(())
    }
}

/// Decode an index document.
///
/// Schema errors (unknown, missing or repeated keys, bad values) come back as
/// their own [`DecodeError`] variants; anything else the JSON parser rejects
/// is [`DecodeError::Json`].
pub fn decode(text: &str) -> std::result::Result<MeshDescriptor, DecodeError> {
    let mut failure = None;
    let mut deserializer = serde_json::Deserializer::from_str(text);
    let result = (&mut deserializer).deserialize_map(IndexVisitor {
        failure: &mut failure,
    });
    let result = result.and_then(|descriptor| deserializer.end().map(|()| descriptor));
    result.map_err(|e| failure.take().unwrap_or_else(|| json_error(&e)))
}

/// Decode an already-parsed index document.
///
/// A [`Value`] has already collapsed repeated keys; use [`decode`] on the
/// text to have them rejected.
pub fn decode_value(root: &Value) -> std::result::Result<MeshDescriptor, DecodeError> {
    let root = root
        .as_object()
        .ok_or_else(|| DecodeError::invalid(INDEX_SCOPE, "JSON object"))?;

    let mut fields = DescriptorFields::new();
    for (key, value) in root {
        if key == MESH_TYPE {
            fields.begin_mesh_type()?;
            let mesh_type = value
                .as_object()
                .ok_or_else(|| DecodeError::invalid(MESH_TYPE, "JSON object"))?;
            for (mesh_key, mesh_value) in mesh_type {
                fields.mesh_type_entry(mesh_key, mesh_value)?;
            }
        } else if PayloadKind::from_key(key).is_some() {
            if !value.is_string() {
                return Err(DecodeError::invalid(key.as_str(), "location string"));
            }
        } else {
            fields.count_entry(key, value)?;
        }
    }
    fields.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MeshType;
    use crate::util::{ComponentType, PixelType};

    fn sample() -> MeshDescriptor {
        MeshDescriptor {
            mesh_type: MeshType {
                dimension: 2,
                point_component_type: ComponentType::Float64,
                point_pixel_component_type: ComponentType::Uint8,
                point_pixel_type: PixelType::Vector,
                point_pixel_components: 3,
                cell_component_type: ComponentType::Uint64,
                cell_pixel_component_type: ComponentType::Float32,
                cell_pixel_type: PixelType::DiffusionTensor3D,
                cell_pixel_components: 6,
            },
            number_of_points: 5,
            number_of_point_pixels: 5,
            number_of_cells: 2,
            number_of_cell_pixels: 2,
            cell_buffer_size: 9,
        }
    }

    #[test]
    fn test_roundtrip() {
        let d = sample();
        let text = encode(&d, true).unwrap();
        assert_eq!(decode(&text).unwrap(), d);

        let compact = encode(&d, false).unwrap();
        assert_eq!(decode(&compact).unwrap(), d);
    }

    #[test]
    fn test_field_order_is_fixed() {
        let text = encode(&sample(), false).unwrap();
        let order = [
            "\"meshType\"",
            "\"dimension\"",
            "\"pointComponentType\"",
            "\"pointPixelComponentType\"",
            "\"pointPixelType\"",
            "\"pointPixelComponents\"",
            "\"cellComponentType\"",
            "\"cellPixelComponentType\"",
            "\"cellPixelType\"",
            "\"cellPixelComponents\"",
            "\"numberOfPoints\"",
            "\"numberOfPointPixels\"",
            "\"numberOfCells\"",
            "\"numberOfCellPixels\"",
            "\"cellBufferSize\"",
            "\"points\"",
            "\"cells\"",
            "\"pointData\"",
            "\"cellData\"",
        ];
        let positions: Vec<usize> = order.iter().map(|k| text.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{text}");
    }

    #[test]
    fn test_locations_emitted() {
        let text = encode(&sample(), true).unwrap();
        assert!(text.contains("data:application/vnd.itk.path,data/points.raw"));
        assert!(text.contains("data:application/vnd.itk.path,data/cell-data.raw"));
    }

    #[test]
    fn test_locations_optional_on_read() {
        let mut value: Value = serde_json::from_str(&encode(&sample(), true).unwrap()).unwrap();
        let obj = value.as_object_mut().unwrap();
        for kind in PayloadKind::ALL {
            obj.remove(kind.key());
        }
        assert_eq!(decode_value(&value).unwrap(), sample());

        value["points"] = serde_json::json!("somewhere/else.raw");
        assert_eq!(decode_value(&value).unwrap(), sample());
    }

    #[test]
    fn test_missing_cell_buffer_size() {
        let mut value: Value = serde_json::from_str(&encode(&sample(), true).unwrap()).unwrap();
        value.as_object_mut().unwrap().remove("cellBufferSize");
        let err = decode_value(&value).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MissingKey {
                scope: "index",
                key: "cellBufferSize".into()
            }
        );
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let mut value: Value = serde_json::from_str(&encode(&sample(), true).unwrap()).unwrap();
        value["schemaVersion"] = serde_json::json!(2);
        let err = decode_value(&value).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownKey { key, .. } if key == "schemaVersion"));

        let mut value: Value = serde_json::from_str(&encode(&sample(), true).unwrap()).unwrap();
        value["meshType"]["name"] = serde_json::json!("sphere");
        let err = decode_value(&value).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownKey { scope: "meshType", .. }));
    }

    #[test]
    fn test_unknown_component_type() {
        let mut value: Value = serde_json::from_str(&encode(&sample(), true).unwrap()).unwrap();
        value["meshType"]["pointComponentType"] = serde_json::json!("int128");
        let err = decode_value(&value).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnknownComponentType {
                field: "pointComponentType".into(),
                value: "int128".into()
            }
        );
    }

    #[test]
    fn test_repeated_keys_rejected() {
        let text = encode(&sample(), false).unwrap();

        let repeated = text.replace("\"numberOfPoints\":5", "\"numberOfPoints\":7,\"numberOfPoints\":5");
        assert_eq!(
            decode(&repeated).unwrap_err(),
            DecodeError::DuplicateKey {
                scope: "index",
                key: "numberOfPoints".into()
            }
        );

        let repeated = text.replace("\"dimension\":2", "\"dimension\":3,\"dimension\":2");
        assert!(matches!(
            decode(&repeated).unwrap_err(),
            DecodeError::DuplicateKey { scope: "meshType", ref key } if key == "dimension"
        ));

        let repeated = text.replacen("\"points\":", "\"points\":\"x\",\"points\":", 1);
        assert!(matches!(
            decode(&repeated).unwrap_err(),
            DecodeError::DuplicateKey { ref key, .. } if key == "points"
        ));
    }

    #[test]
    fn test_schema_errors_keep_their_variant() {
        let text = encode(&sample(), false).unwrap();
        let bad = text.replace("\"float64\"", "\"float128\"");
        assert!(matches!(
            decode(&bad).unwrap_err(),
            DecodeError::UnknownComponentType { ref value, .. } if value == "float128"
        ));

        assert!(matches!(decode("[]").unwrap_err(), DecodeError::Json { .. }));
        assert!(matches!(
            decode(&format!("{text} {{}}")).unwrap_err(),
            DecodeError::Json { .. }
        ));
    }

    #[test]
    fn test_malformed_json() {
        let err = decode("{\"meshType\": ").unwrap_err();
        assert!(matches!(err, DecodeError::Json { line: 1, .. }));
    }
}
