//! Marker records as served by the marker API. Owned by the external
//! collaborator; this crate only reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coords::WorldCoordinate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Point markers carry `position`; multi-point entities (routes)
    /// carry `positions` instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positions: Option<Vec<[f64; 2]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl MarkerRecord {
    /// Where the camera should center to focus this marker: its own
    /// position, or the first waypoint of a multi-point entity.
    /// Positions are stored `[x, y, layer]`.
    pub fn focus_position(&self) -> Option<WorldCoordinate> {
        if let Some([x, y, layer]) = self.position {
            let mut coord = WorldCoordinate::new(x, y);
            coord.layer = Some(layer);
            return Some(coord);
        }
        let first = self.positions.as_ref()?.first()?;
        Some(WorldCoordinate::new(first[0], first[1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(json: serde_json::Value) -> MarkerRecord {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn deserializes_point_markers_from_api_shape() {
        let record = marker(serde_json::json!({
            "_id": "61a2b3",
            "type": "iron",
            "position": [10224.5, 6401.2, 1.0],
            "name": "Iron next to the gate",
            "createdAt": "2023-04-01T10:00:00Z"
        }));
        assert_eq!(record.kind, "iron");
        let focus = record.focus_position().unwrap();
        assert_eq!((focus.x, focus.y), (10224.5, 6401.2));
        assert_eq!(focus.layer, Some(1.0));
    }

    #[test]
    fn multi_point_markers_focus_on_the_first_waypoint() {
        let record = marker(serde_json::json!({
            "_id": "61a2b4",
            "type": "chest",
            "positions": [[9000.0, 4000.0], [9100.0, 4050.0]],
            "createdAt": "2023-04-01T10:00:00Z"
        }));
        let focus = record.focus_position().unwrap();
        assert_eq!((focus.x, focus.y), (9000.0, 4000.0));
    }

    #[test]
    fn positionless_markers_have_no_focus() {
        let record = marker(serde_json::json!({
            "_id": "61a2b5",
            "type": "chest",
            "positions": [],
            "createdAt": "2023-04-01T10:00:00Z"
        }));
        assert_eq!(record.focus_position(), None);
    }
}
