//! Assemblage des anneaux de polygones
//!
//! Convention ESRI: les anneaux extérieurs tournent dans le sens horaire,
//! les trous dans le sens anti-horaire.

use geo::{BoundingRect, Contains, Coord, LineString, MultiPolygon, Point, Polygon, Winding};

/// Construit un MultiPolygon à partir des anneaux d'une forme Polygon
pub fn assemble(rings: Vec<LineString>) -> MultiPolygon {
    let mut shells: Vec<LineString> = Vec::new();
    let mut holes: Vec<LineString> = Vec::new();

    for ring in rings {
        let Some(ring) = close_ring(ring) else {
            tracing::debug!("Dropping degenerate ring (< 4 points)");
            continue;
        };
        if ring.is_cw() {
            shells.push(ring);
        } else {
            holes.push(ring);
        }
    }

    // Pas d'anneau horaire: fichier mal orienté, chaque anneau devient une coque
    if shells.is_empty() {
        return MultiPolygon::new(
            holes
                .into_iter()
                .map(|ring| Polygon::new(ring, vec![]))
                .collect(),
        );
    }

    let mut interiors: Vec<Vec<LineString>> = vec![Vec::new(); shells.len()];
    let candidates: Vec<Polygon> = shells
        .iter()
        .map(|shell| Polygon::new(shell.clone(), vec![]))
        .collect();

    for hole in holes {
        match find_owner(&candidates, &hole) {
            Some(idx) => interiors[idx].push(hole),
            None => {
                tracing::debug!("Orphan hole promoted to shell");
                shells.push(hole);
                interiors.push(Vec::new());
            }
        }
    }

    MultiPolygon::new(
        shells
            .into_iter()
            .zip(interiors)
            .map(|(shell, holes)| Polygon::new(shell, holes))
            .collect(),
    )
}

/// Trouve la coque qui contient le trou (test sur le premier sommet,
/// puis repli sur l'emprise)
fn find_owner(shells: &[Polygon], hole: &LineString) -> Option<usize> {
    let first = Point::from(hole.0[0]);

    if let Some(idx) = shells.iter().position(|shell| shell.contains(&first)) {
        return Some(idx);
    }

    let hole_rect = hole.bounding_rect()?;
    shells.iter().position(|shell| {
        shell.bounding_rect().is_some_and(|rect| {
            rect.min().x <= hole_rect.min().x
                && rect.min().y <= hole_rect.min().y
                && rect.max().x >= hole_rect.max().x
                && rect.max().y >= hole_rect.max().y
        })
    })
}

/// Ferme l'anneau si nécessaire; None s'il reste moins de 4 points
fn close_ring(mut ring: LineString) -> Option<LineString> {
    let (first, last): (Coord, Coord) = (*ring.0.first()?, *ring.0.last()?);
    if first != last {
        ring.0.push(first);
    }
    (ring.0.len() >= 4).then_some(ring)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64, clockwise: bool) -> LineString {
        let mut coords = vec![
            Coord { x: x0, y: y0 },
            Coord { x: x0, y: y0 + size },
            Coord { x: x0 + size, y: y0 + size },
            Coord { x: x0 + size, y: y0 },
            Coord { x: x0, y: y0 },
        ];
        if !clockwise {
            coords.reverse();
        }
        LineString::new(coords)
    }

    #[test]
    fn test_hole_attached_to_containing_shell() {
        let rings = vec![
            square(0.0, 0.0, 10.0, true),
            square(20.0, 20.0, 10.0, true),
            square(22.0, 22.0, 2.0, false),
        ];
        let mp = assemble(rings);
        assert_eq!(mp.0.len(), 2);
        assert!(mp.0[0].interiors().is_empty());
        assert_eq!(mp.0[1].interiors().len(), 1);
    }

    #[test]
    fn test_counter_clockwise_only_becomes_shells() {
        let mp = assemble(vec![square(0.0, 0.0, 1.0, false)]);
        assert_eq!(mp.0.len(), 1);
        assert!(mp.0[0].interiors().is_empty());
    }

    #[test]
    fn test_orphan_hole_promoted() {
        let rings = vec![square(0.0, 0.0, 1.0, true), square(50.0, 50.0, 1.0, false)];
        let mp = assemble(rings);
        assert_eq!(mp.0.len(), 2);
    }

    #[test]
    fn test_unclosed_ring_is_closed_and_degenerate_dropped() {
        let mut open = square(0.0, 0.0, 1.0, true);
        open.0.pop();
        let degenerate = LineString::new(vec![Coord { x: 0.0, y: 0.0 }, Coord { x: 1.0, y: 1.0 }]);

        let mp = assemble(vec![open, degenerate]);
        assert_eq!(mp.0.len(), 1);
        let ext = mp.0[0].exterior();
        assert_eq!(ext.0.first(), ext.0.last());
    }
}
