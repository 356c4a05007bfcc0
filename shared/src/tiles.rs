//! Tile-pyramid addressing for the pre-rendered world map.
//!
//! The map is rendered at 7 levels of detail. The surface asks for
//! tiles by grid cell at its own zoom (0 coarsest .. 6 finest); the
//! asset pyramid numbers its levels the other way round, so the level
//! in the filename is the inverted surface zoom. Each coarser level
//! halves resolution, hence the power-of-two multiplier table that
//! converts a cell index into the finest-level 64x64 grid.

use serde::{Deserialize, Serialize};

/// Tiles are square, in projected units (and source pixels).
pub const TILE_SIZE: f64 = 1024.0;

/// The addressable tile grid is 64x64 at every level.
pub const TILE_GRID: i32 = 64;

const MULTIPLIERS: [i32; 7] = [1, 2, 4, 8, 16, 32, 64];

/// One tile slot as seen by a rendering surface. Derived per rendered
/// tile and recomputed on every draw, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCell {
    pub x: i32,
    pub y: i32,
    /// Surface zoom, 0..=6.
    pub zoom: u8,
}

/// Resolved tile address. Cells outside the map resolve to `Empty`
/// rather than erroring, so the surface paints a blank tile at the
/// boundary instead of showing edge artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileLocator {
    Tile { level: u8, x: i32, y: i32 },
    Empty,
}

/// Map a grid cell to its tile address. Pure; cacheable by
/// `(x, y, zoom)`.
pub fn resolve(cell: TileCell) -> TileLocator {
    if cell.zoom > 6 {
        return TileLocator::Empty;
    }
    let level = 8 - cell.zoom as i32 - 1;
    let multiplier = i64::from(MULTIPLIERS[(level - 1) as usize]);
    // Widened so the extreme cell indices a deep overscroll can
    // produce stay in range instead of overflowing.
    let x = i64::from(cell.x) * multiplier;
    // The tile origin is top-left while the world origin is
    // bottom-left: invert y and shift by one row.
    let y = (-i64::from(cell.y) - 1) * multiplier;

    if x < 0 || y < 0 || x >= i64::from(TILE_GRID) || y >= i64::from(TILE_GRID) {
        TileLocator::Empty
    } else {
        TileLocator::Tile {
            level: level as u8,
            x: x as i32,
            y: y as i32,
        }
    }
}

/// Asset URL for a resolved tile, with zero-padded 3-digit indices.
pub fn tile_url(endpoint: &str, locator: TileLocator) -> String {
    match locator {
        TileLocator::Tile { level, x, y } => {
            format!("{endpoint}/assets/map/map_l{level}_y{y:03}_x{x:03}.webp")
        }
        TileLocator::Empty => format!("{endpoint}/assets/map/empty.webp"),
    }
}
