//! The canonical logical view: center, zoom, optional selection.
//! Serialized into the location's flat query parameters so every
//! surface can adopt it by parsing the broadcast string.

use crate::coords::{WorldCoordinate, world_center};
use crate::location::Location;

pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub center: WorldCoordinate,
    pub zoom: u8,
    pub selection: Option<String>,
}

impl ViewState {
    /// Read the view from a location, filling absent coordinates with
    /// the world-bounds center and clamping zoom into range.
    pub fn from_location(location: &Location) -> Self {
        let fallback = world_center();
        let x = parse_coord(location.param("x")).unwrap_or(fallback.x);
        let y = parse_coord(location.param("y")).unwrap_or(fallback.y);
        let zoom = location
            .param("zoom")
            .and_then(|raw| raw.parse::<i64>().ok())
            .map(clamp_zoom)
            .unwrap_or(MIN_ZOOM);
        Self {
            center: WorldCoordinate::new(x, y),
            zoom,
            selection: location.selection().map(str::to_string),
        }
    }

    /// The explicitly published view, only when all three parameters
    /// are present and numeric. Surfaces that find none self-seed by
    /// fitting bounds instead.
    pub fn explicit(location: &Location) -> Option<(WorldCoordinate, u8)> {
        let x = parse_coord(location.param("x"))?;
        let y = parse_coord(location.param("y"))?;
        let zoom = location.param("zoom")?.parse::<i64>().ok()?;
        Some((WorldCoordinate::new(x, y), clamp_zoom(zoom)))
    }

    pub fn query_params(&self) -> [(&'static str, String); 3] {
        [
            ("x", self.center.x.to_string()),
            ("y", self.center.y.to_string()),
            ("zoom", self.zoom.to_string()),
        ]
    }
}

pub fn clamp_zoom(zoom: i64) -> u8 {
    zoom.clamp(MIN_ZOOM as i64, MAX_ZOOM as i64) as u8
}

fn parse_coord(raw: Option<&str>) -> Option<f64> {
    let value = raw?.parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_explicit_view_from_query() {
        let loc = Location::parse("/m1?x=8000&y=2500.5&zoom=4").unwrap();
        let state = ViewState::from_location(&loc);
        assert_eq!(state.center, WorldCoordinate::new(8000.0, 2500.5));
        assert_eq!(state.zoom, 4);
        assert_eq!(state.selection.as_deref(), Some("m1"));
        assert!(ViewState::explicit(&loc).is_some());
    }

    #[test]
    fn absent_coordinates_default_to_world_center() {
        let loc = Location::parse("/?zoom=2").unwrap();
        let state = ViewState::from_location(&loc);
        assert_eq!(state.center, world_center());
        assert_eq!(ViewState::explicit(&loc), None);
    }

    #[test]
    fn zoom_is_clamped_into_range() {
        let loc = Location::parse("/?x=1&y=1&zoom=9").unwrap();
        assert_eq!(ViewState::from_location(&loc).zoom, MAX_ZOOM);
        let loc = Location::parse("/?x=1&y=1&zoom=-3").unwrap();
        assert_eq!(ViewState::from_location(&loc).zoom, MIN_ZOOM);
    }

    #[test]
    fn non_numeric_coordinates_are_treated_as_absent() {
        let loc = Location::parse("/?x=abc&y=5&zoom=1").unwrap();
        assert_eq!(ViewState::explicit(&loc), None);
        assert_eq!(ViewState::from_location(&loc).center.x, world_center().x);
    }
}
