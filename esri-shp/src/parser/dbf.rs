//! Parser pour les tables dBase (.dbf)

use encoding_rs::Encoding;

use crate::types::{FieldDescriptor, FieldKind};
use crate::ShpError;

/// Marqueur de fin des descripteurs de champs
pub const FIELD_TERMINATOR: u8 = 0x0D;
/// Marqueur de fin de fichier
pub const EOF_MARKER: u8 = 0x1A;
/// Drapeau d'enregistrement supprimé
pub const DELETED_FLAG: u8 = b'*';

/// Contenu décodé d'un .dbf
#[derive(Debug)]
pub struct DbfData {
    pub fields: Vec<FieldDescriptor>,
    /// Une entrée par enregistrement du fichier; None si supprimé
    pub rows: Vec<Option<Vec<String>>>,
}

/// Parse une table dBase en décodant les valeurs avec l'encodage fourni
pub fn parse(data: &[u8], encoding: &'static Encoding) -> Result<DbfData, ShpError> {
    if data.len() < 32 {
        return Err(ShpError::InvalidTable(format!(
            "header needs 32 bytes, file has {}",
            data.len()
        )));
    }

    let num_records = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;
    let header_len = u16::from_le_bytes([data[8], data[9]]) as usize;
    let record_len = u16::from_le_bytes([data[10], data[11]]) as usize;

    // Descripteurs: blocs de 32 octets jusqu'au terminateur 0x0D
    let descriptors_end = memchr::memchr(FIELD_TERMINATOR, &data[32..])
        .map(|p| 32 + p)
        .ok_or_else(|| ShpError::InvalidTable("missing field terminator".into()))?;

    let fields = parse_fields(&data[32..descriptors_end])?;

    let declared: usize = 1 + fields.iter().map(|f| f.length as usize).sum::<usize>();
    if declared != record_len {
        return Err(ShpError::InvalidTable(format!(
            "record length {} does not match field widths {}",
            record_len, declared
        )));
    }

    if header_len < descriptors_end + 1 {
        return Err(ShpError::InvalidTable(format!(
            "header length {} overlaps field descriptors",
            header_len
        )));
    }

    // Le nombre d'enregistrements annoncé doit tenir dans le fichier avant toute allocation
    let body_len = num_records
        .checked_mul(record_len)
        .and_then(|n| n.checked_add(header_len));
    if body_len.map_or(true, |end| end > data.len()) {
        return Err(ShpError::InvalidTable(format!(
            "header declares {} records of {} bytes, file has {} bytes",
            num_records,
            record_len,
            data.len()
        )));
    }

    let mut rows = Vec::with_capacity(num_records);
    for i in 0..num_records {
        let start = header_len + i * record_len;
        let record = &data[start..start + record_len];
        if record[0] == EOF_MARKER {
            break;
        }
        if record[0] == DELETED_FLAG {
            rows.push(None);
            continue;
        }

        let mut values = Vec::with_capacity(fields.len());
        let mut offset = 1;
        for field in &fields {
            let raw = &record[offset..offset + field.length as usize];
            values.push(decode_value(raw, field.kind, encoding));
            offset += field.length as usize;
        }
        rows.push(Some(values));
    }

    Ok(DbfData { fields, rows })
}

fn parse_fields(block: &[u8]) -> Result<Vec<FieldDescriptor>, ShpError> {
    if block.len() % 32 != 0 {
        return Err(ShpError::InvalidTable(format!(
            "field descriptor block of {} bytes is not a multiple of 32",
            block.len()
        )));
    }

    block
        .chunks_exact(32)
        .map(|desc| {
            let name_end = memchr::memchr(0, &desc[..11]).unwrap_or(11);
            let name = std::str::from_utf8(&desc[..name_end])
                .map_err(|_| ShpError::InvalidTable("non-ASCII field name".into()))?
                .trim()
                .to_string();
            if name.is_empty() {
                return Err(ShpError::InvalidTable("empty field name".into()));
            }
            Ok(FieldDescriptor {
                name,
                kind: FieldKind::from_code(desc[11]),
                length: desc[16],
                decimals: desc[17],
            })
        })
        .collect()
}

/// Décode une valeur brute; le texte est tronqué à droite, le reste des deux côtés
fn decode_value(raw: &[u8], kind: FieldKind, encoding: &'static Encoding) -> String {
    let (decoded, _, _) = encoding.decode(raw);
    let value = decoded.trim_end_matches(['\0', ' ']);
    match kind {
        FieldKind::Character | FieldKind::Other(_) => value.to_string(),
        _ => value.trim_start().to_string(),
    }
}
