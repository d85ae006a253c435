//! Parser pour les fichiers .shp (géométries)
//!
//! En-tête de 100 octets puis enregistrements: en-tête big-endian
//! (numéro, longueur en mots de 16 bits), contenu little-endian.

use geo::{Coord, Geometry, LineString, MultiLineString, MultiPoint, Point};

use crate::rings;
use crate::types::ShapeType;
use crate::ShpError;

const FILE: &str = "shp";

/// Code de fichier attendu en tête de .shp/.shx
pub const FILE_CODE: i32 = 9994;
/// Version du format
pub const VERSION: i32 = 1000;
/// Taille de l'en-tête principal
pub const HEADER_LEN: usize = 100;

/// Contenu décodé d'un .shp
#[derive(Debug)]
pub struct ShpData {
    pub shape_type: ShapeType,
    pub bbox: [f64; 4],
    /// (numéro d'enregistrement, géométrie)
    pub shapes: Vec<(u32, Option<Geometry>)>,
}

/// Parse le contenu complet d'un .shp
pub fn parse(data: &[u8]) -> Result<ShpData, ShpError> {
    if data.len() < HEADER_LEN {
        return Err(ShpError::InvalidHeader(format!(
            "file is {} bytes, header needs {}",
            data.len(),
            HEADER_LEN
        )));
    }

    let file_code = be_i32(data, 0);
    if file_code != FILE_CODE {
        return Err(ShpError::InvalidHeader(format!(
            "bad file code {} (expected {})",
            file_code, FILE_CODE
        )));
    }

    let version = le_i32(data, 28);
    if version != VERSION {
        tracing::warn!(version, "Unexpected shapefile version, reading anyway");
    }

    let shape_type = ShapeType::try_from(le_i32(data, 32))?;
    let bbox = [
        le_f64(data, 36),
        le_f64(data, 44),
        le_f64(data, 52),
        le_f64(data, 60),
    ];

    // La longueur déclarée (en mots) peut être fausse: on borne par la taille réelle
    let declared_len = be_i32(data, 24).max(0) as usize * 2;
    let end = if declared_len >= HEADER_LEN {
        declared_len.min(data.len())
    } else {
        data.len()
    };

    let mut shapes = Vec::new();
    let mut offset = HEADER_LEN;

    while offset + 8 <= end {
        let number = be_i32(data, offset).max(0) as u32;
        let content_len = be_i32(data, offset + 4).max(0) as usize * 2;
        let start = offset + 8;
        let stop = start + content_len;

        if stop > data.len() {
            return Err(ShpError::truncated(
                FILE,
                number,
                format!("content ends at {} but file has {} bytes", stop, data.len()),
            ));
        }

        let geometry = parse_shape(&data[start..stop], number)?;
        shapes.push((number, geometry));
        offset = stop;
    }

    Ok(ShpData {
        shape_type,
        bbox,
        shapes,
    })
}

/// Décode le contenu d'un enregistrement
fn parse_shape(content: &[u8], number: u32) -> Result<Option<Geometry>, ShpError> {
    if content.len() < 4 {
        return Err(ShpError::truncated(FILE, number, "missing shape type"));
    }

    let shape_type = ShapeType::try_from(le_i32(content, 0))?;

    match shape_type.base() {
        ShapeType::Null => Ok(None),
        ShapeType::Point => {
            need(content, 20, number)?;
            let point = Point::new(le_f64(content, 4), le_f64(content, 12));
            Ok(Some(Geometry::Point(point)))
        }
        ShapeType::MultiPoint => {
            need(content, 40, number)?;
            let num_points = count(content, 36, number)?;
            let coords = read_coords(content, 40, num_points, number)?;
            let points: Vec<Point> = coords.into_iter().map(Point::from).collect();
            Ok(Some(Geometry::MultiPoint(MultiPoint::new(points))))
        }
        ShapeType::PolyLine => {
            let parts = read_parts(content, number)?;
            let mut lines: Vec<LineString> = parts.into_iter().map(LineString::new).collect();
            if lines.len() == 1 {
                Ok(lines.pop().map(Geometry::LineString))
            } else {
                Ok(Some(Geometry::MultiLineString(MultiLineString::new(lines))))
            }
        }
        ShapeType::Polygon => {
            let parts = read_parts(content, number)?;
            let polygons = rings::assemble(parts.into_iter().map(LineString::new).collect());
            Ok(Some(Geometry::MultiPolygon(polygons)))
        }
        _ => unreachable!("base() only returns 2D shape families"),
    }
}

/// Lit les parties d'une PolyLine/Polygon (bbox, numParts, numPoints, parts, points)
fn read_parts(content: &[u8], number: u32) -> Result<Vec<Vec<Coord>>, ShpError> {
    need(content, 44, number)?;
    let num_parts = count(content, 36, number)?;
    let num_points = count(content, 40, number)?;

    let parts_offset = 44;
    let points_offset = parts_offset + num_parts * 4;
    need(content, points_offset, number)?;

    let coords = read_coords(content, points_offset, num_points, number)?;

    let mut starts: Vec<usize> = (0..num_parts)
        .map(|i| le_i32(content, parts_offset + i * 4).max(0) as usize)
        .collect();
    starts.push(num_points);

    let mut parts = Vec::with_capacity(num_parts);
    for window in starts.windows(2) {
        let (from, to) = (window[0], window[1]);
        if from > to || to > num_points {
            return Err(ShpError::truncated(
                FILE,
                number,
                format!("invalid part range {}..{} for {} points", from, to, num_points),
            ));
        }
        parts.push(coords[from..to].to_vec());
    }

    Ok(parts)
}

fn read_coords(
    content: &[u8],
    offset: usize,
    num_points: usize,
    number: u32,
) -> Result<Vec<Coord>, ShpError> {
    need(content, offset + num_points * 16, number)?;
    Ok((0..num_points)
        .map(|i| {
            let at = offset + i * 16;
            Coord {
                x: le_f64(content, at),
                y: le_f64(content, at + 8),
            }
        })
        .collect())
}

fn count(content: &[u8], offset: usize, number: u32) -> Result<usize, ShpError> {
    let n = le_i32(content, offset);
    if n < 0 {
        return Err(ShpError::truncated(FILE, number, format!("negative count {}", n)));
    }
    Ok(n as usize)
}

fn need(content: &[u8], len: usize, number: u32) -> Result<(), ShpError> {
    if content.len() < len {
        return Err(ShpError::truncated(
            FILE,
            number,
            format!("needs {} bytes, has {}", len, content.len()),
        ));
    }
    Ok(())
}

fn be_i32(data: &[u8], at: usize) -> i32 {
    i32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn le_i32(data: &[u8], at: usize) -> i32 {
    i32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn le_f64(data: &[u8], at: usize) -> f64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[at..at + 8]);
    f64::from_le_bytes(buf)
}
