//! Coordinate transform between game-world units and the projected
//! space the rendering surfaces work in.
//!
//! The same linear transform is applied to tile placement, marker
//! placement and pointer read-back. Using it anywhere but everywhere
//! desyncs those three visually, so all projection goes through here.

use crate::coords::WorldCoordinate;

/// One projected unit is 16 world units; y is negated because the
/// surface y axis grows downward while world y grows northward.
const SCALE: f64 = 1.0 / 16.0;

/// A position in the rendering surface's internal projected space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedCoordinate {
    pub x: f64,
    pub y: f64,
}

pub fn to_projected(world: WorldCoordinate) -> ProjectedCoordinate {
    ProjectedCoordinate {
        x: world.x * SCALE,
        y: -world.y * SCALE,
    }
}

pub fn to_world(projected: ProjectedCoordinate) -> WorldCoordinate {
    WorldCoordinate::new(projected.x / SCALE, -projected.y / SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::{WORLD_MAX_X, WORLD_MAX_Y};

    #[test]
    fn projection_scales_and_flips_y() {
        let p = to_projected(WorldCoordinate::new(WORLD_MAX_X, WORLD_MAX_Y));
        assert_eq!(p.x, 896.0);
        assert_eq!(p.y, -625.0);
    }

    #[test]
    fn round_trip_is_lossless_within_float_rounding() {
        for &(x, y) in &[(0.0, 0.0), (14336.0, 10000.0), (10224.57, 6401.33)] {
            let w = WorldCoordinate::new(x, y);
            let back = to_world(to_projected(w));
            assert!((back.x - w.x).abs() < 1e-9);
            assert!((back.y - w.y).abs() < 1e-9);
        }
    }
}
