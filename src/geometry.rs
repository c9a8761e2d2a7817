//! Geometrische Prüfungen für platzierte Einheiten.
//!
//! Dieses Modul prüft Überschneidungen zwischen platzierten Einheiten und ob
//! sie vollständig im Container liegen. `verify_packing` fasst beides für ein
//! komplettes Ergebnis zusammen.

use thiserror::Error;

use crate::model::{Container, PackedItem};
use crate::optimizer::PackingResult;

/// Prüft, ob zwei platzierte Einheiten sich räumlich überschneiden.
///
/// Verwendet Axis-Aligned Bounding Box (AABB) Kollisionserkennung.
/// Einheiten, die sich nur an einer Fläche berühren, überschneiden sich nicht.
///
/// # Parameter
/// * `a` - Erste platzierte Einheit
/// * `b` - Zweite platzierte Einheit
/// * `tolerance` - Numerische Toleranz
///
/// # Rückgabewert
/// `true` wenn sich die Einheiten überschneiden, sonst `false`
pub fn intersects(a: &PackedItem, b: &PackedItem, tolerance: f64) -> bool {
    a.bounding_box().intersects(&b.bounding_box(), tolerance)
}

/// Prüft, ob eine Einheit vollständig im Container liegt.
pub fn within_container(container: &Container, item: &PackedItem, tolerance: f64) -> bool {
    container
        .bounding_box()
        .contains(&item.bounding_box(), tolerance)
}

/// Verstoß gegen die geometrische Gültigkeit einer Beladung.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlacementViolation {
    #[error("units {first} ({first_id}) and {second} ({second_id}) overlap")]
    Overlap {
        first: usize,
        first_id: String,
        second: usize,
        second_id: String,
    },
    #[error("unit {index} ({id}) lies outside the container")]
    OutOfBounds { index: usize, id: String },
}

/// Prüft ein komplettes Ergebnis auf Überschneidungen und Containergrenzen.
///
/// # Rückgabewert
/// Den ersten gefundenen Verstoß, sonst `Ok(())`
pub fn verify_packing(result: &PackingResult, tolerance: f64) -> Result<(), PlacementViolation> {
    for (index, item) in result.packed.iter().enumerate() {
        if !within_container(&result.container, item, tolerance) {
            return Err(PlacementViolation::OutOfBounds {
                index,
                id: item.id.clone(),
            });
        }
    }

    for (i, a) in result.packed.iter().enumerate() {
        for (j, b) in result.packed.iter().enumerate().skip(i + 1) {
            if intersects(a, b, tolerance) {
                return Err(PlacementViolation::Overlap {
                    first: i,
                    first_id: a.id.clone(),
                    second: j,
                    second_id: b.id.clone(),
                });
            }
        }
    }

    Ok(())
}
