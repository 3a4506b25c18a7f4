//! Particle address space
//!
//! Bijective mapping between a linear particle index and a cell in a square
//! grid of side `ceil(sqrt(count))`. Cells beyond the live count are dead
//! space: computed every pass, never displayed.

/// A cell position in a square state grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCoord {
    pub x: u32,
    pub y: u32,
}

/// Smallest side length S such that S * S >= count
///
/// A square grid wastes at most `2 * sqrt(count)` cells while keeping
/// per-particle addressing a function of the index alone.
pub fn grid_side(count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    let mut side = (count as f64).sqrt().ceil() as usize;
    // Guard against float rounding on large counts
    while side * side < count {
        side += 1;
    }
    while side > 1 && (side - 1) * (side - 1) >= count {
        side -= 1;
    }
    side
}

/// Map a particle index to its grid cell
pub fn to_grid(index: usize, side: usize) -> GridCoord {
    debug_assert!(side > 0 && index < side * side);
    GridCoord {
        x: (index % side) as u32,
        y: (index / side) as u32,
    }
}

/// Map a grid cell back to its particle index
pub fn to_index(coord: GridCoord, side: usize) -> usize {
    coord.y as usize * side + coord.x as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_side_minimal() {
        assert_eq!(grid_side(1), 1);
        assert_eq!(grid_side(2), 2);
        assert_eq!(grid_side(4), 2);
        assert_eq!(grid_side(5), 3);
        assert_eq!(grid_side(9), 3);
        assert_eq!(grid_side(10), 4);
        assert_eq!(grid_side(1_000_000), 1000);
        assert_eq!(grid_side(1_000_001), 1001);
    }

    #[test]
    fn test_grid_side_covers_count() {
        for count in 1..2000 {
            let side = grid_side(count);
            assert!(side * side >= count, "side {side} too small for {count}");
            assert!(
                (side - 1) * (side - 1) < count,
                "side {side} not minimal for {count}"
            );
        }
    }

    #[test]
    fn test_round_trip_bijection() {
        for count in [1, 2, 7, 16, 100, 101] {
            let side = grid_side(count);
            for i in 0..count {
                assert_eq!(to_index(to_grid(i, side), side), i);
            }
        }
    }

    #[test]
    fn test_row_major_layout() {
        let side = 4;
        assert_eq!(to_grid(0, side), GridCoord { x: 0, y: 0 });
        assert_eq!(to_grid(3, side), GridCoord { x: 3, y: 0 });
        assert_eq!(to_grid(4, side), GridCoord { x: 0, y: 1 });
        assert_eq!(to_grid(15, side), GridCoord { x: 3, y: 3 });
    }
}
