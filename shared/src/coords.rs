use serde::{Deserialize, Serialize};

/// World-space extents of the game map. The origin is the south-west
/// corner; y grows northward.
pub const WORLD_MIN_X: f64 = 0.0;
pub const WORLD_MAX_X: f64 = 14336.0;
pub const WORLD_MIN_Y: f64 = 0.0;
pub const WORLD_MAX_Y: f64 = 10000.0;

/// A position in game-world units. `layer` distinguishes stacked
/// sub-maps (caves, interiors) that share the same x/y footprint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldCoordinate {
    pub x: f64,
    pub y: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layer: Option<f64>,
}

impl WorldCoordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, layer: None }
    }

    pub fn in_bounds(&self) -> bool {
        (WORLD_MIN_X..=WORLD_MAX_X).contains(&self.x)
            && (WORLD_MIN_Y..=WORLD_MAX_Y).contains(&self.y)
    }

    /// Clamp into world bounds. Callers that would rather reject
    /// out-of-range input use `in_bounds` instead; nothing ever wraps.
    pub fn clamped(&self) -> Self {
        Self {
            x: self.x.clamp(WORLD_MIN_X, WORLD_MAX_X),
            y: self.y.clamp(WORLD_MIN_Y, WORLD_MAX_Y),
            layer: self.layer,
        }
    }
}

/// Center of the full world extent, the default view when no state
/// has been published yet.
pub fn world_center() -> WorldCoordinate {
    WorldCoordinate::new(
        (WORLD_MIN_X + WORLD_MAX_X) / 2.0,
        (WORLD_MIN_Y + WORLD_MAX_Y) / 2.0,
    )
}

/// Euclidean distance between two world points, ignoring layers.
pub fn calc_distance(a: WorldCoordinate, b: WorldCoordinate) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    (dx * dx + dy * dy).sqrt()
}

/// Round to the 0.01 granularity used by coordinate inputs and the
/// pointer read-out.
pub fn round_coord(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Format a world position for display, e.g. `[10224.50, 6401.25]`.
pub fn format_coords(position: WorldCoordinate) -> String {
    format!("[{:.2}, {:.2}]", position.x, position.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_keeps_in_range_values() {
        let p = WorldCoordinate::new(7000.0, 5000.0);
        assert_eq!(p.clamped(), p);
        assert!(p.in_bounds());
    }

    #[test]
    fn clamp_pins_out_of_range_values_to_the_edge() {
        let p = WorldCoordinate::new(-50.0, 12000.0).clamped();
        assert_eq!(p.x, WORLD_MIN_X);
        assert_eq!(p.y, WORLD_MAX_Y);
    }

    #[test]
    fn distance_is_euclidean() {
        let a = WorldCoordinate::new(0.0, 0.0);
        let b = WorldCoordinate::new(3.0, 4.0);
        assert_eq!(calc_distance(a, b), 5.0);
    }

    #[test]
    fn display_rounds_to_two_decimals() {
        let p = WorldCoordinate::new(10224.498, 6401.254);
        assert_eq!(format_coords(p), "[10224.50, 6401.25]");
        assert_eq!(round_coord(10224.498), 10224.5);
    }
}
