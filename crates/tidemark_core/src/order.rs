//! Order key allocation for drag-reordering.
//!
//! # Responsibility
//! - Assign a relative position key between zero, one, or two neighbors
//!   without renumbering the rest of the collection.
//! - Detect midpoint exhaustion so the repository can renumber a partition
//!   before the gap shrinks below floating-point granularity.
//!
//! # Invariants
//! - `allocate(Some(b), Some(a))` requires `b < a` in caller order and
//!   returns a key strictly between them while the gap is representable.
//! - Renumbered sequences keep relative order and restore `KEY_GAP` spacing.

/// Key assigned to the first item of an empty collection.
pub const BASE_KEY: f64 = 0.0;

/// Spacing used for head/tail allocation and renumbering. Large enough that
/// thousands of sequential edge insertions stay well inside f64 precision.
pub const KEY_GAP: f64 = 1000.0;

/// Smallest neighbor gap still considered splittable. Below this the caller
/// must renumber before allocating.
pub const MIN_KEY_GAP: f64 = 1e-6;

/// Returns a key ordered relative to the given neighbors.
///
/// - No neighbors: `BASE_KEY`.
/// - Only `after` (insert at head): `after - KEY_GAP`.
/// - Only `before` (insert at tail): `before + KEY_GAP`.
/// - Both: the arithmetic midpoint.
pub fn allocate(before: Option<f64>, after: Option<f64>) -> f64 {
    match (before, after) {
        (None, None) => BASE_KEY,
        (None, Some(after)) => after - KEY_GAP,
        (Some(before), None) => before + KEY_GAP,
        (Some(before), Some(after)) => (before + after) / 2.0,
    }
}

/// Whether the gap between two neighbors is too small to split again.
///
/// Single-neighbor and empty allocations never exhaust.
pub fn gap_exhausted(before: Option<f64>, after: Option<f64>) -> bool {
    match (before, after) {
        (Some(before), Some(after)) => (after - before) < MIN_KEY_GAP,
        _ => false,
    }
}

/// Dense replacement keys for `count` items already in display order.
pub fn renumbered(count: usize) -> Vec<f64> {
    (0..count).map(|slot| slot as f64 * KEY_GAP).collect()
}

#[cfg(test)]
mod tests {
    use super::{allocate, gap_exhausted, renumbered, BASE_KEY, KEY_GAP, MIN_KEY_GAP};

    #[test]
    fn empty_collection_gets_baseline() {
        assert_eq!(allocate(None, None), BASE_KEY);
    }

    #[test]
    fn head_insert_moves_below_first_key() {
        assert_eq!(allocate(None, Some(0.0)), -KEY_GAP);
        assert_eq!(allocate(None, Some(-KEY_GAP)), -2.0 * KEY_GAP);
    }

    #[test]
    fn tail_insert_moves_above_last_key() {
        assert_eq!(allocate(Some(3000.0), None), 3000.0 + KEY_GAP);
    }

    #[test]
    fn between_neighbors_allocates_midpoint() {
        assert_eq!(allocate(Some(1000.0), Some(2000.0)), 1500.0);
    }

    #[test]
    fn repeated_midpoints_eventually_exhaust() {
        let before = 0.0;
        let mut after = KEY_GAP;
        let mut splits = 0;
        while !gap_exhausted(Some(before), Some(after)) {
            after = allocate(Some(before), Some(after));
            splits += 1;
            assert!(splits < 128, "gap never exhausted");
        }
        assert!((after - before) < MIN_KEY_GAP);
    }

    #[test]
    fn renumbered_keys_are_dense_and_ascending() {
        let keys = renumbered(4);
        assert_eq!(keys, vec![0.0, 1000.0, 2000.0, 3000.0]);
        assert!(!gap_exhausted(Some(keys[1]), Some(keys[2])));
    }
}
