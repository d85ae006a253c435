//! Mapping strict des enregistrements shapefile vers `Neighborhood`
//!
//! Le mapping est validé à la construction (cibles connues, types compatibles,
//! cibles obligatoires présentes), puis appliqué en mode strict: le premier
//! enregistrement invalide fait échouer tout le fichier.

use std::str::FromStr;

use encoding_rs::Encoding;
use esri_shp::{Record, ShapeType, Shapefile};
use geo::{Geometry, MultiPolygon};
use thiserror::Error;

use crate::config::FieldMapping;
use crate::model::Neighborhood;

/// Erreurs de mapping (configuration ou données)
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Unknown target field: {0}")]
    UnknownTarget(String),

    #[error("Unknown data type {data_type:?} for {target}")]
    UnknownType { target: String, data_type: String },

    #[error("Target {target} cannot hold {data_type:?} values")]
    IncompatibleType {
        target: &'static str,
        data_type: DataType,
    },

    #[error("Target {0} is mapped more than once")]
    DuplicateTarget(&'static str),

    #[error("Required target {0} is not mapped")]
    Unmapped(&'static str),

    #[error("Invalid geometry type in mapping: {0} (use MULTIPOLYGON or POLYGON)")]
    InvalidGeometrySource(String),

    #[error("Field {field} is missing from the layer")]
    MissingField { field: String },

    #[error("Layer geometry is {found:?}, expected polygons")]
    LayerGeometry { found: ShapeType },

    #[error("Record #{record}: required field {field} is empty")]
    EmptyValue { record: u32, field: String },

    #[error("Record #{record}: cannot convert {field}={value:?} to {data_type:?}")]
    Conversion {
        record: u32,
        field: String,
        value: String,
        data_type: DataType,
    },

    #[error("Record #{record}: {field} is {len} characters long (max {max})")]
    TooLong {
        record: u32,
        field: String,
        len: usize,
        max: usize,
    },

    #[error("Record #{record}: invalid geometry: {reason}")]
    Geometry { record: u32, reason: String },
}

/// Champs cibles de `Neighborhood`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    State,
    County,
    City,
    Name,
    RegionId,
    Geom,
}

impl Target {
    /// Cibles sans lesquelles un enregistrement n'a pas de sens
    pub const REQUIRED: [Target; 3] = [Target::State, Target::Name, Target::Geom];

    pub fn as_str(self) -> &'static str {
        match self {
            Target::State => "state",
            Target::County => "county",
            Target::City => "city",
            Target::Name => "name",
            Target::RegionId => "region_id",
            Target::Geom => "geom",
        }
    }

    fn accepts(self, data_type: DataType) -> bool {
        match self {
            Target::State | Target::County | Target::City | Target::Name => {
                data_type == DataType::Text
            }
            Target::RegionId => data_type == DataType::Integer,
            Target::Geom => data_type == DataType::MultiPolygon,
        }
    }
}

impl FromStr for Target {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "state" => Ok(Target::State),
            "county" => Ok(Target::County),
            "city" => Ok(Target::City),
            "name" => Ok(Target::Name),
            "region_id" | "regionid" => Ok(Target::RegionId),
            "geom" | "geometry" => Ok(Target::Geom),
            _ => Err(MappingError::UnknownTarget(s.to_string())),
        }
    }
}

/// Convertisseurs disponibles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Text,
    Integer,
    MultiPolygon,
}

impl DataType {
    fn parse(target: &str, s: &str) -> Result<Self, MappingError> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "varchar" => Ok(DataType::Text),
            "integer" | "int" | "bigint" => Ok(DataType::Integer),
            "multipolygon" => Ok(DataType::MultiPolygon),
            _ => Err(MappingError::UnknownType {
                target: target.to_string(),
                data_type: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledField {
    source: String,
    target: Target,
    data_type: DataType,
    required: bool,
    max_length: Option<usize>,
}

/// Mapping compilé, prêt à être appliqué à une couche
#[derive(Debug, Clone)]
pub struct LayerMapping {
    fields: Vec<CompiledField>,
    encoding: &'static Encoding,
}

impl LayerMapping {
    /// Compile et valide une table de mapping
    pub fn new(fields: &[FieldMapping], encoding: &'static Encoding) -> Result<Self, MappingError> {
        let mut compiled: Vec<CompiledField> = Vec::with_capacity(fields.len());

        for field in fields {
            let target: Target = field.target.parse()?;
            let data_type = DataType::parse(&field.target, &field.data_type)?;

            if !target.accepts(data_type) {
                return Err(MappingError::IncompatibleType {
                    target: target.as_str(),
                    data_type,
                });
            }
            if compiled.iter().any(|c| c.target == target) {
                return Err(MappingError::DuplicateTarget(target.as_str()));
            }
            if data_type == DataType::MultiPolygon
                && !matches!(
                    field.source.to_ascii_uppercase().as_str(),
                    "MULTIPOLYGON" | "POLYGON"
                )
            {
                return Err(MappingError::InvalidGeometrySource(field.source.clone()));
            }

            compiled.push(CompiledField {
                source: field.source.clone(),
                target,
                data_type,
                // Une géométrie absente ne peut pas être stockée
                required: field.required || target == Target::Geom,
                max_length: field.max_length,
            });
        }

        for required in Target::REQUIRED {
            if !compiled.iter().any(|c| c.target == required) {
                return Err(MappingError::Unmapped(required.as_str()));
            }
        }

        Ok(Self {
            fields: compiled,
            encoding,
        })
    }

    /// Encodage des attributs de la couche
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Vérifie que la couche expose tous les champs mappés
    pub fn check_layer(&self, layer: &Shapefile) -> Result<(), MappingError> {
        for field in &self.fields {
            match field.data_type {
                DataType::MultiPolygon => {
                    if layer.shape_type.base() != ShapeType::Polygon {
                        return Err(MappingError::LayerGeometry {
                            found: layer.shape_type,
                        });
                    }
                }
                _ => {
                    if layer.field(&field.source).is_none() {
                        return Err(MappingError::MissingField {
                            field: field.source.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Applique le mapping à toute la couche (mode strict)
    pub fn map_all(&self, layer: &Shapefile) -> Result<Vec<Neighborhood>, MappingError> {
        self.check_layer(layer)?;
        layer
            .records
            .iter()
            .map(|record| self.map_record(record))
            .collect()
    }

    /// Convertit un enregistrement
    pub fn map_record(&self, record: &Record) -> Result<Neighborhood, MappingError> {
        let mut state = String::new();
        let mut county = String::new();
        let mut city = String::new();
        let mut name = String::new();
        let mut region_id = None;
        let mut geom = None;

        for field in &self.fields {
            match field.data_type {
                DataType::Text => {
                    let value = self.text(record, field)?;
                    match field.target {
                        Target::State => state = value,
                        Target::County => county = value,
                        Target::City => city = value,
                        Target::Name => name = value,
                        _ => unreachable!("validated in LayerMapping::new"),
                    }
                }
                DataType::Integer => region_id = self.integer(record, field)?,
                DataType::MultiPolygon => geom = Some(self.geometry(record)?),
            }
        }

        let geom = geom.ok_or(MappingError::Unmapped(Target::Geom.as_str()))?;

        Ok(Neighborhood {
            state,
            county,
            city,
            name,
            region_id,
            geom,
        })
    }

    fn raw<'r>(&self, record: &'r Record, field: &CompiledField) -> Result<&'r str, MappingError> {
        let value = record
            .attribute(&field.source)
            .ok_or_else(|| MappingError::MissingField {
                field: field.source.clone(),
            })?;

        if value.is_empty() && field.required {
            return Err(MappingError::EmptyValue {
                record: record.number,
                field: field.source.clone(),
            });
        }
        Ok(value)
    }

    fn text(&self, record: &Record, field: &CompiledField) -> Result<String, MappingError> {
        let value = self.raw(record, field)?;
        if let Some(max) = field.max_length {
            let len = value.chars().count();
            if len > max {
                return Err(MappingError::TooLong {
                    record: record.number,
                    field: field.source.clone(),
                    len,
                    max,
                });
            }
        }
        Ok(value.to_string())
    }

    fn integer(&self, record: &Record, field: &CompiledField) -> Result<Option<i64>, MappingError> {
        let value = self.raw(record, field)?;
        if value.is_empty() {
            return Ok(None);
        }
        parse_integer(value).map(Some).ok_or_else(|| MappingError::Conversion {
            record: record.number,
            field: field.source.clone(),
            value: value.to_string(),
            data_type: DataType::Integer,
        })
    }

    fn geometry(&self, record: &Record) -> Result<MultiPolygon, MappingError> {
        let invalid = |reason: &str| MappingError::Geometry {
            record: record.number,
            reason: reason.to_string(),
        };

        let mp = match &record.geometry {
            None => return Err(invalid("null shape")),
            Some(Geometry::MultiPolygon(mp)) => mp.clone(),
            Some(Geometry::Polygon(p)) => MultiPolygon::new(vec![p.clone()]),
            Some(_) => return Err(invalid("not a polygon")),
        };

        if mp.0.is_empty() {
            return Err(invalid("no valid ring"));
        }
        Ok(mp)
    }
}

/// Entier, ou décimal à partie fractionnaire nulle (ex: "270001.0")
fn parse_integer(value: &str) -> Option<i64> {
    if let Ok(n) = value.parse::<i64>() {
        return Some(n);
    }
    let f: f64 = fast_float::parse(value).ok()?;
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MappingConfig;
    use esri_shp::{FieldDescriptor, FieldKind};
    use geo::polygon;
    use std::collections::HashMap;

    fn layer_mapping() -> LayerMapping {
        let config = MappingConfig::from_preset("neighborhoods").unwrap();
        LayerMapping::new(&config.fields, encoding_rs::WINDOWS_1252).unwrap()
    }

    fn record(number: u32, values: &[(&str, &str)], geometry: Option<Geometry>) -> Record {
        Record {
            number,
            geometry,
            attributes: values
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    fn square() -> Geometry {
        Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 0.0, y: 1.0),
            (x: 1.0, y: 1.0),
            (x: 1.0, y: 0.0)
        ])
    }

    fn full_values<'a>() -> Vec<(&'a str, &'a str)> {
        vec![
            ("STATE", "DE"),
            ("COUNTY", "New Castle"),
            ("CITY", "Wilmington"),
            ("NAME", "Trolley Square"),
            ("REGIONID", "275133"),
        ]
    }

    fn field(source: &str, target: &str, data_type: &str) -> FieldMapping {
        FieldMapping {
            source: source.into(),
            target: target.into(),
            data_type: data_type.into(),
            required: true,
            max_length: None,
        }
    }

    #[test]
    fn test_map_record_promotes_polygon() {
        let n = layer_mapping()
            .map_record(&record(1, &full_values(), Some(square())))
            .unwrap();
        assert_eq!(n.state, "DE");
        assert_eq!(n.city, "Wilmington");
        assert_eq!(n.name, "Trolley Square");
        assert_eq!(n.region_id, Some(275133));
        assert_eq!(n.geom.0.len(), 1);
    }

    #[test]
    fn test_empty_required_value_fails() {
        let mut values = full_values();
        values[3] = ("NAME", "");
        let err = layer_mapping()
            .map_record(&record(7, &values, Some(square())))
            .unwrap_err();
        assert!(matches!(err, MappingError::EmptyValue { record: 7, ref field } if field == "NAME"));
    }

    #[test]
    fn test_optional_empty_integer_is_none() {
        let mut config = MappingConfig::from_preset("neighborhoods").unwrap();
        for f in &mut config.fields {
            if f.target == "region_id" {
                f.required = false;
            }
        }
        let mapping = LayerMapping::new(&config.fields, encoding_rs::WINDOWS_1252).unwrap();

        let mut values = full_values();
        values[4] = ("REGIONID", "");
        let n = mapping.map_record(&record(1, &values, Some(square()))).unwrap();
        assert_eq!(n.region_id, None);
    }

    #[test]
    fn test_integer_conversion() {
        assert_eq!(parse_integer("42"), Some(42));
        assert_eq!(parse_integer("270001.0"), Some(270001));
        assert_eq!(parse_integer("12.5"), None);
        assert_eq!(parse_integer("n/a"), None);

        let mut values = full_values();
        values[4] = ("REGIONID", "abc");
        let err = layer_mapping()
            .map_record(&record(3, &values, Some(square())))
            .unwrap_err();
        assert!(matches!(err, MappingError::Conversion { record: 3, .. }));
    }

    #[test]
    fn test_too_long_text_fails() {
        let mut values = full_values();
        values[0] = ("STATE", "DEL");
        let err = layer_mapping()
            .map_record(&record(2, &values, Some(square())))
            .unwrap_err();
        assert!(matches!(err, MappingError::TooLong { max: 2, len: 3, .. }));
    }

    #[test]
    fn test_null_or_wrong_geometry_fails() {
        let mapping = layer_mapping();
        assert!(matches!(
            mapping.map_record(&record(1, &full_values(), None)),
            Err(MappingError::Geometry { record: 1, .. })
        ));
        let point = Geometry::Point(geo::Point::new(0.0, 0.0));
        assert!(mapping
            .map_record(&record(1, &full_values(), Some(point)))
            .is_err());
    }

    #[test]
    fn test_check_layer_missing_field() {
        let layer = Shapefile {
            shape_type: ShapeType::Polygon,
            bbox: [0.0; 4],
            fields: vec![
                FieldDescriptor::new("STATE", FieldKind::Character, 2, 0),
                FieldDescriptor::new("NAME", FieldKind::Character, 64, 0),
            ],
            records: vec![],
        };
        let err = layer_mapping().map_all(&layer).unwrap_err();
        assert!(matches!(err, MappingError::MissingField { ref field } if field == "COUNTY"));
    }

    #[test]
    fn test_check_layer_wrong_shape_type() {
        let layer = Shapefile {
            shape_type: ShapeType::PolyLine,
            bbox: [0.0; 4],
            fields: vec![],
            records: vec![],
        };
        let mapping = LayerMapping::new(
            &[
                field("POLYGON", "geom", "multipolygon"),
                field("STATE", "state", "text"),
                field("NAME", "name", "text"),
            ],
            encoding_rs::WINDOWS_1252,
        )
        .unwrap();
        assert!(matches!(
            mapping.check_layer(&layer),
            Err(MappingError::LayerGeometry { .. })
        ));
    }

    #[test]
    fn test_invalid_mapping_tables() {
        let enc = encoding_rs::WINDOWS_1252;

        let unknown = [field("X", "population", "integer")];
        assert!(matches!(
            LayerMapping::new(&unknown, enc),
            Err(MappingError::UnknownTarget(_))
        ));

        let incompatible = [field("STATE", "state", "integer")];
        assert!(matches!(
            LayerMapping::new(&incompatible, enc),
            Err(MappingError::IncompatibleType { .. })
        ));

        let duplicate = [field("STATE", "state", "text"), field("ST", "state", "text")];
        assert!(matches!(
            LayerMapping::new(&duplicate, enc),
            Err(MappingError::DuplicateTarget("state"))
        ));

        let missing_geom = [field("STATE", "state", "text"), field("NAME", "name", "text")];
        assert!(matches!(
            LayerMapping::new(&missing_geom, enc),
            Err(MappingError::Unmapped("geom"))
        ));

        let bad_geom = [
            field("STATE", "state", "text"),
            field("NAME", "name", "text"),
            field("POINT", "geom", "multipolygon"),
        ];
        assert!(matches!(
            LayerMapping::new(&bad_geom, enc),
            Err(MappingError::InvalidGeometrySource(_))
        ));
    }
}
