//! Types de données pour le crate esri-shp

use geo::Geometry;
use std::collections::HashMap;

use crate::ShpError;

/// Shapefile lu: géométries et attributs appariés
#[derive(Debug)]
pub struct Shapefile {
    /// Type de forme déclaré dans l'en-tête .shp
    pub shape_type: ShapeType,

    /// Emprise [xmin, ymin, xmax, ymax]
    pub bbox: [f64; 4],

    /// Schéma attributaire (.dbf)
    pub fields: Vec<FieldDescriptor>,

    /// Enregistrements non supprimés, dans l'ordre du fichier
    pub records: Vec<Record>,
}

impl Shapefile {
    /// Récupère la définition d'un champ par son nom (insensible à la casse)
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }
}

/// Un enregistrement: forme + attributs
#[derive(Debug, Clone)]
pub struct Record {
    /// Numéro d'enregistrement (1-based, tel que dans le .shp)
    pub number: u32,

    /// Géométrie (None pour une forme Null)
    pub geometry: Option<Geometry>,

    /// Attributs décodés (nom du champ -> valeur)
    pub attributes: HashMap<String, String>,
}

impl Record {
    /// Valeur d'un attribut (recherche exacte puis insensible à la casse)
    pub fn attribute(&self, name: &str) -> Option<&str> {
        if let Some(v) = self.attributes.get(name) {
            return Some(v.as_str());
        }
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Types de forme ESRI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeType {
    Null,
    Point,
    PolyLine,
    Polygon,
    MultiPoint,
    PointZ,
    PolyLineZ,
    PolygonZ,
    MultiPointZ,
    PointM,
    PolyLineM,
    PolygonM,
    MultiPointM,
}

impl ShapeType {
    /// Code numérique ESRI
    pub fn code(self) -> i32 {
        match self {
            ShapeType::Null => 0,
            ShapeType::Point => 1,
            ShapeType::PolyLine => 3,
            ShapeType::Polygon => 5,
            ShapeType::MultiPoint => 8,
            ShapeType::PointZ => 11,
            ShapeType::PolyLineZ => 13,
            ShapeType::PolygonZ => 15,
            ShapeType::MultiPointZ => 18,
            ShapeType::PointM => 21,
            ShapeType::PolyLineM => 23,
            ShapeType::PolygonM => 25,
            ShapeType::MultiPointM => 28,
        }
    }

    /// Famille de forme, sans distinction Z/M
    pub fn base(self) -> ShapeType {
        match self {
            ShapeType::PointZ | ShapeType::PointM => ShapeType::Point,
            ShapeType::PolyLineZ | ShapeType::PolyLineM => ShapeType::PolyLine,
            ShapeType::PolygonZ | ShapeType::PolygonM => ShapeType::Polygon,
            ShapeType::MultiPointZ | ShapeType::MultiPointM => ShapeType::MultiPoint,
            other => other,
        }
    }
}

impl TryFrom<i32> for ShapeType {
    type Error = ShpError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => ShapeType::Null,
            1 => ShapeType::Point,
            3 => ShapeType::PolyLine,
            5 => ShapeType::Polygon,
            8 => ShapeType::MultiPoint,
            11 => ShapeType::PointZ,
            13 => ShapeType::PolyLineZ,
            15 => ShapeType::PolygonZ,
            18 => ShapeType::MultiPointZ,
            21 => ShapeType::PointM,
            23 => ShapeType::PolyLineM,
            25 => ShapeType::PolygonM,
            28 => ShapeType::MultiPointM,
            other => return Err(ShpError::UnsupportedShapeType(other)),
        })
    }
}

/// Type d'un champ dBase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// 'C'
    Character,
    /// 'N'
    Numeric,
    /// 'F'
    Float,
    /// 'D' (YYYYMMDD)
    Date,
    /// 'L'
    Logical,
    /// Tout autre code (memo, etc.), lu comme texte brut
    Other(u8),
}

impl FieldKind {
    pub fn from_code(code: u8) -> Self {
        match code.to_ascii_uppercase() {
            b'C' => FieldKind::Character,
            b'N' => FieldKind::Numeric,
            b'F' => FieldKind::Float,
            b'D' => FieldKind::Date,
            b'L' => FieldKind::Logical,
            other => FieldKind::Other(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            FieldKind::Character => b'C',
            FieldKind::Numeric => b'N',
            FieldKind::Float => b'F',
            FieldKind::Date => b'D',
            FieldKind::Logical => b'L',
            FieldKind::Other(c) => c,
        }
    }
}

/// Définition d'un champ dBase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub length: u8,
    pub decimals: u8,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind, length: u8, decimals: u8) -> Self {
        Self {
            name: name.into(),
            kind,
            length,
            decimals,
        }
    }
}
