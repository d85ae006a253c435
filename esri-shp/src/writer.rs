//! Écriture de shapefiles polygonaux (.shp, .shx, .dbf)
//!
//! Sert à produire des jeux de données de test et des fixtures; seule la
//! forme Polygon est écrite.

use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use geo::{BoundingRect, LineString, MultiPolygon, Winding};

use crate::parser::{dbf, shp};
use crate::types::{FieldDescriptor, FieldKind, ShapeType};
use crate::ShpError;

/// Contenu binaire des trois fichiers d'un shapefile
#[derive(Debug, Clone)]
pub struct ShapefileBytes {
    pub shp: Vec<u8>,
    pub shx: Vec<u8>,
    pub dbf: Vec<u8>,
}

impl ShapefileBytes {
    /// Écrit `<stem>.shp`, `<stem>.shx` et `<stem>.dbf` dans `dir`, retourne le chemin du .shp
    pub fn write_to(&self, dir: &Path, stem: &str) -> std::io::Result<PathBuf> {
        let shp_path = dir.join(format!("{}.shp", stem));
        std::fs::write(&shp_path, &self.shp)?;
        std::fs::write(dir.join(format!("{}.shx", stem)), &self.shx)?;
        std::fs::write(dir.join(format!("{}.dbf", stem)), &self.dbf)?;
        Ok(shp_path)
    }
}

/// Constructeur de shapefile Polygon
pub struct PolygonWriter {
    fields: Vec<FieldDescriptor>,
    encoding: &'static Encoding,
    rows: Vec<(Option<MultiPolygon>, Vec<Vec<u8>>)>,
}

impl PolygonWriter {
    pub fn new(fields: Vec<FieldDescriptor>, encoding: &'static Encoding) -> Self {
        Self {
            fields,
            encoding,
            rows: Vec::new(),
        }
    }

    /// Ajoute un enregistrement (None = forme Null)
    ///
    /// # Errors
    /// Retourne une erreur si le nombre de valeurs ne correspond pas au schéma
    /// ou si une valeur encodée dépasse la largeur de son champ.
    pub fn add(&mut self, geometry: Option<MultiPolygon>, values: &[&str]) -> Result<(), ShpError> {
        if values.len() != self.fields.len() {
            return Err(ShpError::InvalidTable(format!(
                "{} values for {} fields",
                values.len(),
                self.fields.len()
            )));
        }

        let mut encoded = Vec::with_capacity(values.len());
        for (field, value) in self.fields.iter().zip(values) {
            let (bytes, _, _) = self.encoding.encode(value);
            if bytes.len() > field.length as usize {
                return Err(ShpError::InvalidTable(format!(
                    "value {:?} does not fit field {} ({} bytes)",
                    value, field.name, field.length
                )));
            }
            encoded.push(pad(&bytes, field));
        }

        self.rows.push((geometry, encoded));
        Ok(())
    }

    /// Nombre d'enregistrements ajoutés
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Produit les octets des trois fichiers
    pub fn finish(self) -> ShapefileBytes {
        let mut records = Vec::new();
        let mut index = Vec::new();
        let mut bbox: Option<[f64; 4]> = None;

        for (i, (geometry, _)) in self.rows.iter().enumerate() {
            let content = match geometry {
                Some(mp) => {
                    if let Some(rect) = mp.bounding_rect() {
                        bbox = Some(merge_bbox(
                            bbox,
                            [rect.min().x, rect.min().y, rect.max().x, rect.max().y],
                        ));
                    }
                    polygon_content(mp)
                }
                None => ShapeType::Null.code().to_le_bytes().to_vec(),
            };

            let offset_words = (shp::HEADER_LEN + records.len()) / 2;
            let len_words = content.len() / 2;
            index.extend_from_slice(&(offset_words as i32).to_be_bytes());
            index.extend_from_slice(&(len_words as i32).to_be_bytes());

            records.extend_from_slice(&(i as i32 + 1).to_be_bytes());
            records.extend_from_slice(&(len_words as i32).to_be_bytes());
            records.extend_from_slice(&content);
        }

        let bbox = bbox.unwrap_or([0.0; 4]);

        let mut shp_bytes = main_header(shp::HEADER_LEN + records.len(), bbox);
        shp_bytes.extend(records);

        let mut shx_bytes = main_header(shp::HEADER_LEN + index.len(), bbox);
        shx_bytes.extend(index);

        let dbf_bytes = self.dbf_bytes();

        ShapefileBytes {
            shp: shp_bytes,
            shx: shx_bytes,
            dbf: dbf_bytes,
        }
    }

    fn dbf_bytes(&self) -> Vec<u8> {
        let record_len: usize = 1 + self.fields.iter().map(|f| f.length as usize).sum::<usize>();
        let header_len = 32 + self.fields.len() * 32 + 1;

        let mut out = vec![0u8; 32];
        out[0] = 0x03;
        out[4..8].copy_from_slice(&(self.rows.len() as u32).to_le_bytes());
        out[8..10].copy_from_slice(&(header_len as u16).to_le_bytes());
        out[10..12].copy_from_slice(&(record_len as u16).to_le_bytes());

        for field in &self.fields {
            let mut desc = [0u8; 32];
            let name = field.name.as_bytes();
            let n = name.len().min(10);
            desc[..n].copy_from_slice(&name[..n]);
            desc[11] = field.kind.code();
            desc[16] = field.length;
            desc[17] = field.decimals;
            out.extend_from_slice(&desc);
        }
        out.push(dbf::FIELD_TERMINATOR);

        for (_, values) in &self.rows {
            out.push(b' ');
            for value in values {
                out.extend_from_slice(value);
            }
        }
        out.push(dbf::EOF_MARKER);
        out
    }
}

/// Texte aligné à gauche, nombres alignés à droite
fn pad(bytes: &[u8], field: &FieldDescriptor) -> Vec<u8> {
    let width = field.length as usize;
    let fill = width - bytes.len();
    let mut out = Vec::with_capacity(width);
    match field.kind {
        FieldKind::Character | FieldKind::Other(_) => {
            out.extend_from_slice(bytes);
            out.resize(width, b' ');
        }
        _ => {
            out.resize(fill, b' ');
            out.extend_from_slice(bytes);
        }
    }
    out
}

fn polygon_content(mp: &MultiPolygon) -> Vec<u8> {
    let mut rings: Vec<LineString> = Vec::new();
    for polygon in &mp.0 {
        let mut exterior = polygon.exterior().clone();
        exterior.make_cw_winding();
        rings.push(exterior);
        for interior in polygon.interiors() {
            let mut hole = interior.clone();
            hole.make_ccw_winding();
            rings.push(hole);
        }
    }

    let num_points: usize = rings.iter().map(|r| r.0.len()).sum();
    let rect = mp.bounding_rect();

    let mut out = Vec::with_capacity(44 + rings.len() * 4 + num_points * 16);
    out.extend_from_slice(&ShapeType::Polygon.code().to_le_bytes());
    for v in rect
        .map(|r| [r.min().x, r.min().y, r.max().x, r.max().y])
        .unwrap_or([0.0; 4])
    {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.extend_from_slice(&(rings.len() as i32).to_le_bytes());
    out.extend_from_slice(&(num_points as i32).to_le_bytes());

    let mut start = 0i32;
    for ring in &rings {
        out.extend_from_slice(&start.to_le_bytes());
        start += ring.0.len() as i32;
    }
    for ring in &rings {
        for c in &ring.0 {
            out.extend_from_slice(&c.x.to_le_bytes());
            out.extend_from_slice(&c.y.to_le_bytes());
        }
    }
    out
}

fn main_header(total_len: usize, bbox: [f64; 4]) -> Vec<u8> {
    let mut h = vec![0u8; shp::HEADER_LEN];
    h[0..4].copy_from_slice(&shp::FILE_CODE.to_be_bytes());
    h[24..28].copy_from_slice(&((total_len / 2) as i32).to_be_bytes());
    h[28..32].copy_from_slice(&shp::VERSION.to_le_bytes());
    h[32..36].copy_from_slice(&ShapeType::Polygon.code().to_le_bytes());
    for (i, v) in bbox.iter().enumerate() {
        h[36 + i * 8..44 + i * 8].copy_from_slice(&v.to_le_bytes());
    }
    h
}

fn merge_bbox(acc: Option<[f64; 4]>, b: [f64; 4]) -> [f64; 4] {
    match acc {
        None => b,
        Some(a) => [a[0].min(b[0]), a[1].min(b[1]), a[2].max(b[2]), a[3].max(b[3])],
    }
}
