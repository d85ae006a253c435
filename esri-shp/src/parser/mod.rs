//! Parsers des fichiers composant un shapefile

pub mod dbf;
pub mod shp;
