//! Tests d'intégration: écriture puis lecture de shapefiles complets

use esri_shp::writer::PolygonWriter;
use esri_shp::{FieldDescriptor, FieldKind, ShapeType, ShpError};
use geo::{polygon, Geometry, MultiPolygon};

fn fields() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::new("STATE", FieldKind::Character, 2, 0),
        FieldDescriptor::new("NAME", FieldKind::Character, 32, 0),
        FieldDescriptor::new("REGIONID", FieldKind::Numeric, 10, 0),
    ]
}

fn donut() -> MultiPolygon {
    MultiPolygon::new(vec![polygon!(
        exterior: [
            (x: 0.0, y: 0.0),
            (x: 10.0, y: 0.0),
            (x: 10.0, y: 10.0),
            (x: 0.0, y: 10.0),
        ],
        interiors: [[
            (x: 4.0, y: 4.0),
            (x: 6.0, y: 4.0),
            (x: 6.0, y: 6.0),
            (x: 4.0, y: 6.0),
        ]]
    )])
}

#[test]
fn test_read_written_polygons_with_holes_and_latin1() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = PolygonWriter::new(fields(), encoding_rs::WINDOWS_1252);
    writer
        .add(Some(donut()), &["NM", "Cañoncito", "270001"])
        .unwrap();
    writer.add(None, &["NM", "Nowhere", ""]).unwrap();

    let shp_path = writer
        .finish()
        .write_to(dir.path(), "ZillowNeighborhoods-NM")
        .unwrap();

    let shp = esri_shp::read(&shp_path, encoding_rs::WINDOWS_1252).unwrap();
    assert_eq!(shp.shape_type, ShapeType::Polygon);
    assert_eq!(shp.bbox, [0.0, 0.0, 10.0, 10.0]);
    assert_eq!(shp.records.len(), 2);
    assert!(shp.field("regionid").is_some());

    let first = &shp.records[0];
    assert_eq!(first.number, 1);
    assert_eq!(first.attribute("NAME"), Some("Cañoncito"));
    assert_eq!(first.attribute("REGIONID"), Some("270001"));
    match &first.geometry {
        Some(Geometry::MultiPolygon(mp)) => {
            assert_eq!(mp.0.len(), 1);
            assert_eq!(mp.0[0].interiors().len(), 1);
        }
        other => panic!("expected a multipolygon, got {:?}", other),
    }

    let second = &shp.records[1];
    assert!(second.geometry.is_none());
    assert_eq!(second.attribute("REGIONID"), Some(""));
}

#[test]
fn test_record_count_mismatch() {
    let dir = tempfile::tempdir().unwrap();

    let mut two = PolygonWriter::new(fields(), encoding_rs::WINDOWS_1252);
    two.add(Some(donut()), &["DE", "A", "1"]).unwrap();
    two.add(Some(donut()), &["DE", "B", "2"]).unwrap();
    let shp_path = two.finish().write_to(dir.path(), "mismatch").unwrap();

    let mut one = PolygonWriter::new(fields(), encoding_rs::WINDOWS_1252);
    one.add(Some(donut()), &["DE", "A", "1"]).unwrap();
    std::fs::write(dir.path().join("mismatch.dbf"), one.finish().dbf).unwrap();

    let err = esri_shp::read(&shp_path, encoding_rs::WINDOWS_1252).unwrap_err();
    assert!(matches!(
        err,
        ShpError::RecordCountMismatch { shapes: 2, rows: 1 }
    ));
}

#[test]
fn test_writer_rejects_oversized_value() {
    let mut writer = PolygonWriter::new(fields(), encoding_rs::WINDOWS_1252);
    let err = writer.add(Some(donut()), &["DEL", "A", "1"]).unwrap_err();
    assert!(matches!(err, ShpError::InvalidTable(_)));
    assert!(writer.is_empty());
}
