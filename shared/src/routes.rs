//! Marker routes and the list filtering/sorting behind the route
//! browser.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coords::{WorldCoordinate, calc_distance};
use crate::filters::find_category;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerRoute {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub username: String,
    #[serde(rename = "isPublic")]
    pub is_public: bool,
    pub positions: Vec<[f64; 2]>,
    /// Marker count per type along the route.
    #[serde(rename = "markersByType")]
    pub markers_by_type: HashMap<String, u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorites: Option<u32>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl MarkerRoute {
    pub fn first_waypoint(&self) -> Option<WorldCoordinate> {
        let first = self.positions.first()?;
        Some(WorldCoordinate::new(first[0], first[1]))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteFilter {
    All,
    MyRoutes { user_id: String },
    Favorites { route_ids: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RouteSort {
    Match,
    Favorites,
    Distance,
    Date,
    Name,
    Username,
}

/// Case-insensitive search over the route name and the titles of its
/// marker types. An empty search matches everything.
fn matches_search(route: &MarkerRoute, search: &str) -> bool {
    if search.is_empty() {
        return true;
    }
    let needle = search.to_lowercase();
    if route.name.to_lowercase().contains(&needle) {
        return true;
    }
    route.markers_by_type.keys().any(|kind| {
        find_category(kind)
            .map(|category| category.title.to_lowercase().contains(&needle))
            .unwrap_or(false)
    })
}

pub fn filter_routes<'a>(
    routes: &'a [MarkerRoute],
    filter: &RouteFilter,
    search: &str,
) -> Vec<&'a MarkerRoute> {
    routes
        .iter()
        .filter(|route| match filter {
            RouteFilter::All => true,
            RouteFilter::MyRoutes { user_id } => &route.user_id == user_id,
            RouteFilter::Favorites { route_ids } => route_ids.contains(&route.id),
        })
        .filter(|route| matches_search(route, search))
        .collect()
}

/// Ratio of a route's marker types to those currently active; lower
/// is a better match (1.0 means every type is visible). A route with
/// no active types at all has no ratio and sorts after everything
/// else instead of poisoning the order with a division by zero.
fn match_ratio(route: &MarkerRoute, active_filters: &[String]) -> Option<f64> {
    let total = route.markers_by_type.len();
    let matched = route
        .markers_by_type
        .keys()
        .filter(|kind| active_filters.iter().any(|f| f == *kind))
        .count();
    if matched == 0 {
        None
    } else {
        Some(total as f64 / matched as f64)
    }
}

pub fn sort_routes(
    routes: &mut [&MarkerRoute],
    sort: RouteSort,
    active_filters: &[String],
    player: Option<WorldCoordinate>,
) {
    routes.sort_by(|a, b| {
        let ordering = match sort {
            RouteSort::Favorites => b.favorites.unwrap_or(0).cmp(&a.favorites.unwrap_or(0)),
            RouteSort::Date => b.created_at.cmp(&a.created_at),
            RouteSort::Distance => {
                let distance = |route: &MarkerRoute| {
                    match (player, route.first_waypoint()) {
                        (Some(player), Some(start)) => calc_distance(player, start),
                        _ => f64::INFINITY,
                    }
                };
                distance(a).total_cmp(&distance(b))
            }
            RouteSort::Name => a.name.cmp(&b.name),
            RouteSort::Username => a.username.cmp(&b.username),
            RouteSort::Match => {
                match (match_ratio(a, active_filters), match_ratio(b, active_filters)) {
                    (Some(ra), Some(rb)) => ra.total_cmp(&rb),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            }
        };
        ordering.then_with(|| a.name.cmp(&b.name))
    });
}
