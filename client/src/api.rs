#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

//! HTTP access to the marker API.

use outpost_shared::markers::MarkerRecord;
use outpost_shared::routes::MarkerRoute;

/// Fetch all visible markers.
pub async fn fetch_markers(endpoint: &str) -> Result<Vec<MarkerRecord>, String> {
    let url = format!("{endpoint}/api/markers");
    let resp = gloo_net::http::Request::get(&url)
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;

    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }

    resp.json::<Vec<MarkerRecord>>()
        .await
        .map_err(|e| format!("parse error: {e}"))
}

/// Fetch all public marker routes.
pub async fn fetch_marker_routes(endpoint: &str) -> Result<Vec<MarkerRoute>, String> {
    let url = format!("{endpoint}/api/marker-routes");
    let resp = gloo_net::http::Request::get(&url)
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;

    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }

    resp.json::<Vec<MarkerRoute>>()
        .await
        .map_err(|e| format!("parse error: {e}"))
}
