//! Enregistrement persisté

use geo::MultiPolygon;

/// Un quartier Zillow
#[derive(Debug, Clone, PartialEq)]
pub struct Neighborhood {
    /// Code de l'État parent (ex: "DE")
    pub state: String,
    pub county: String,
    pub city: String,
    /// Nom du quartier
    pub name: String,
    /// Identifiant de région Zillow
    pub region_id: Option<i64>,
    /// Contour, stocké sans reprojection
    pub geom: MultiPolygon,
}
