pub mod coords;
pub mod crs;
pub mod filters;
pub mod location;
pub mod markers;
pub mod routes;
pub mod tiles;
pub mod view_state;

pub use coords::{WorldCoordinate, calc_distance, world_center};
pub use crs::{ProjectedCoordinate, to_projected, to_world};
pub use filters::{CategoryItem, find_category};
pub use location::Location;
pub use markers::MarkerRecord;
pub use routes::MarkerRoute;
pub use tiles::{TileCell, TileLocator};
pub use view_state::ViewState;
