#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

//! Player position tracking. A polling loop samples the companion
//! app's position endpoint; while "following" is on, each sample is
//! republished as the shared view center so every surface tracks the
//! player.

use std::cell::Cell;
use std::rc::Rc;

use gloo_timers::future::TimeoutFuture;
use leptos::prelude::*;
use serde::Deserialize;
use wasm_bindgen_futures::spawn_local;

use outpost_shared::coords::WorldCoordinate;

use crate::log;
use crate::router::Router;

const POLL_INTERVAL_MS: u32 = 1_000;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PlayerSample {
    pub location: [f64; 2],
    #[serde(default)]
    pub rotation: f64,
}

pub struct PositionTracker {
    endpoint: String,
    router: Rc<Router>,
    pub position: RwSignal<Option<WorldCoordinate>>,
    pub rotation: RwSignal<f64>,
    tracking: RwSignal<bool>,
    following: RwSignal<bool>,
    alive: Rc<Cell<bool>>,
}

impl PositionTracker {
    pub fn new(
        endpoint: String,
        router: Rc<Router>,
        tracking: RwSignal<bool>,
        following: RwSignal<bool>,
    ) -> Rc<Self> {
        Rc::new(Self {
            endpoint,
            router,
            position: RwSignal::new(None),
            rotation: RwSignal::new(0.0),
            tracking,
            following,
            alive: Rc::new(Cell::new(false)),
        })
    }

    /// Start the polling loop. The loop re-checks the liveness flag
    /// before every sample, so `stop` takes effect within one tick.
    pub fn start(self: &Rc<Self>) {
        if self.alive.replace(true) {
            return;
        }
        let tracker = self.clone();
        spawn_local(async move {
            loop {
                if !tracker.alive.get() {
                    break;
                }
                if tracker.tracking.get_untracked() {
                    tracker.sample().await;
                }
                TimeoutFuture::new(POLL_INTERVAL_MS).await;
            }
        });
    }

    pub fn stop(&self) {
        self.alive.set(false);
    }

    async fn sample(&self) {
        let url = format!("{}/api/position", self.endpoint);
        match fetch_sample(&url).await {
            Ok(sample) => {
                let position = WorldCoordinate::new(sample.location[0], sample.location[1]);
                self.position.set(Some(position));
                self.rotation.set(sample.rotation);
                if self.following.get_untracked() {
                    self.router.search(&[
                        ("x", position.x.to_string()),
                        ("y", position.y.to_string()),
                    ]);
                }
            }
            // Transient outages self-heal on the next tick.
            Err(err) => log::warn(&format!("position sample failed: {err}")),
        }
    }
}

async fn fetch_sample(url: &str) -> Result<PlayerSample, String> {
    let resp = gloo_net::http::Request::get(url)
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;

    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }

    resp.json::<PlayerSample>()
        .await
        .map_err(|e| format!("parse error: {e}"))
}
