//! Per-surface viewport controller: owns the rendering surface
//! lifecycle, seeds and follows the shared view state, and publishes
//! settled pan/zoom positions back onto the sync channel.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use outpost_shared::markers::MarkerRecord;
use outpost_shared::view_state::{ViewState, clamp_zoom};

use crate::log;
use crate::router::Router;
use crate::surface::{MapSurface, SurfaceConfig};

/// Pan only when the target is further than this from the current
/// center on either axis; float jitter in round-tripped coordinates
/// would otherwise oscillate the view.
const FOLLOW_DEADBAND: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Bound,
    Active,
    Disposed,
}

#[derive(Debug, Clone, Default)]
pub struct ControllerOptions {
    /// Position-picking mode: the surface neither follows shared
    /// state nor publishes its own movements.
    pub select_mode: bool,
    pub hide_controls: bool,
    pub initial_zoom: Option<u8>,
    /// Minimap-style surfaces that continuously track the player;
    /// they must not fight the primary surface for view authorship.
    pub always_following: bool,
}

pub struct ViewportController<S: MapSurface> {
    surface: RefCell<Option<Rc<S>>>,
    router: Router,
    options: ControllerOptions,
    state: Cell<LifecycleState>,
    /// Marker id the view last centered on; focusing is a one-shot
    /// pan, not a continuous follow.
    focused_marker: RefCell<Option<String>>,
}

impl<S: MapSurface + 'static> ViewportController<S> {
    pub fn new(router: Router, options: ControllerOptions) -> Rc<Self> {
        Rc::new(Self {
            surface: RefCell::new(None),
            router,
            options,
            state: Cell::new(LifecycleState::Uninitialized),
            focused_marker: RefCell::new(None),
        })
    }

    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    /// Bind and activate a surface. If the shared view state already
    /// carries an explicit position the surface jumps straight there;
    /// otherwise it fits the default bounds and publishes the
    /// resulting view, so the first surface to mount establishes the
    /// canonical default for every later one.
    pub fn open(self: &Rc<Self>, surface: Rc<S>) {
        if self.state.get() != LifecycleState::Uninitialized {
            log::warn("viewport controller opened twice; ignoring");
            return;
        }

        surface.bind(SurfaceConfig::world_default(!self.options.hide_controls));
        self.state.set(LifecycleState::Bound);

        let location = self.router.current();
        if let Some((center, zoom)) = ViewState::explicit(&location) {
            surface.set_view(center, zoom);
        } else {
            surface.fit_bounds();
            if let Some(zoom) = self.options.initial_zoom {
                surface.set_zoom(clamp_zoom(zoom as i64));
            }
            publish_view(&self.router, surface.as_ref());
        }

        if !self.options.select_mode && !self.options.always_following {
            let router = self.router.clone();
            let weak = Rc::downgrade(&surface);
            surface.set_move_end_handler(Some(Rc::new(move || {
                if let Some(surface) = Weak::upgrade(&weak) {
                    publish_view(&router, surface.as_ref());
                }
            })));
        }

        // A background click clears the selection but keeps the query
        // (and with it the published view) intact.
        let router = self.router.clone();
        surface.set_background_click_handler(Some(Rc::new(move || {
            router.go("/", true);
        })));

        *self.surface.borrow_mut() = Some(surface);
        self.state.set(LifecycleState::Active);
    }

    /// Reconcile the view against the current shared location:
    /// auto-follow a published target position, and focus a selected
    /// marker once. Called whenever the location or the marker list
    /// changes.
    pub fn sync_view(&self, markers: &[MarkerRecord]) {
        if self.state.get() != LifecycleState::Active || self.options.select_mode {
            return;
        }
        let Some(surface) = self.surface.borrow().clone() else {
            return;
        };
        let location = self.router.current();

        let target_x = location.param("x").and_then(|raw| raw.parse::<f64>().ok());
        let target_y = location.param("y").and_then(|raw| raw.parse::<f64>().ok());
        if let (Some(x), Some(y)) = (target_x, target_y) {
            let center = surface.center();
            // Always-following surfaces track the target outright;
            // everything else only moves past the deadband.
            let past_deadband =
                (center.x - x).abs() > FOLLOW_DEADBAND || (center.y - y).abs() > FOLLOW_DEADBAND;
            if self.options.always_following || past_deadband {
                surface.pan_to(outpost_shared::WorldCoordinate::new(x, y));
            }
        }

        match location.selection() {
            Some(id) => {
                let already_focused = self.focused_marker.borrow().as_deref() == Some(id);
                if !already_focused
                    && let Some(marker) = markers.iter().find(|marker| marker.id == id)
                {
                    if let Some(position) = marker.focus_position() {
                        surface.pan_to(position);
                    }
                    *self.focused_marker.borrow_mut() = Some(id.to_string());
                }
            }
            None => {
                self.focused_marker.borrow_mut().take();
            }
        }
    }

    /// Step the zoom by one, driven by the surface's chrome buttons.
    /// Published like a settled move, and for the same reasons not at
    /// all on passive surfaces.
    pub fn nudge_zoom(&self, delta: i8) {
        if self.state.get() != LifecycleState::Active {
            return;
        }
        let Some(surface) = self.surface.borrow().clone() else {
            return;
        };
        let stepped = i64::from(surface.zoom()) + i64::from(delta);
        surface.set_zoom(clamp_zoom(stepped));
        if !self.options.select_mode && !self.options.always_following {
            publish_view(&self.router, surface.as_ref());
        }
    }

    /// Release the surface. The handle is cleared before the handlers
    /// are detached so an in-flight event cannot observe a half-dead
    /// surface.
    pub fn close(&self) {
        let surface = self.surface.borrow_mut().take();
        if let Some(surface) = surface {
            surface.set_move_end_handler(None);
            surface.set_background_click_handler(None);
        }
        self.state.set(LifecycleState::Disposed);
    }
}

fn publish_view<S: MapSurface>(router: &Router, surface: &S) {
    let center = surface.center();
    router.search(&[
        ("x", center.x.to_string()),
        ("y", center.y.to_string()),
        ("zoom", surface.zoom().to_string()),
    ]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{MemoryChannel, StateChannel};
    use crate::router::RouterRole;
    use crate::surface::mock::MockSurface;
    use chrono::{TimeZone, Utc};
    use outpost_shared::Location;

    fn master_router(channel: Rc<MemoryChannel>) -> Router {
        Router::new(RouterRole::Master, channel, Location::root())
    }

    fn marker(id: &str, kind: &str, x: f64, y: f64) -> MarkerRecord {
        MarkerRecord {
            id: id.to_string(),
            kind: kind.to_string(),
            position: Some([x, y, 0.0]),
            positions: None,
            name: None,
            level: None,
            description: None,
            username: None,
            created_at: Utc.with_ymd_and_hms(2023, 4, 1, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn first_mount_fits_bounds_and_self_seeds_the_shared_state() {
        let channel = MemoryChannel::new();
        let router = master_router(channel.clone());
        let controller = ViewportController::new(router.clone(), ControllerOptions::default());
        let surface = MockSurface::new();

        controller.open(surface.clone());

        assert_eq!(controller.state(), LifecycleState::Active);
        assert_eq!(surface.fit_bounds_calls.get(), 1);
        // Bounds center of SW (4000, 0) / NE (14336, 10000).
        let location = router.current();
        assert_eq!(location.param("x"), Some("9168"));
        assert_eq!(location.param("y"), Some("5000"));
        assert_eq!(location.param("zoom"), Some("0"));
        // The published value reached the shared store.
        assert!(channel.read().unwrap().contains("x=9168"));
    }

    #[test]
    fn second_surface_adopts_the_published_view_without_its_own_fit() {
        let channel = MemoryChannel::new();
        let first = ViewportController::new(
            master_router(channel.clone()),
            ControllerOptions::default(),
        );
        first.open(MockSurface::new());

        let replica_router = Router::new(RouterRole::Replica, channel, Location::root());
        let second = ViewportController::new(replica_router, ControllerOptions::default());
        let surface = MockSurface::new();
        second.open(surface.clone());

        assert_eq!(surface.fit_bounds_calls.get(), 0);
        assert_eq!(surface.center.get(), (9168.0, 5000.0));
    }

    #[test]
    fn initial_zoom_override_applies_after_bounds_fit() {
        let channel = MemoryChannel::new();
        let router = master_router(channel);
        let controller = ViewportController::new(
            router.clone(),
            ControllerOptions {
                initial_zoom: Some(5),
                ..Default::default()
            },
        );
        let surface = MockSurface::new();
        controller.open(surface.clone());

        assert_eq!(surface.zoom.get(), 5);
        assert_eq!(router.current().param("zoom"), Some("5"));
    }

    #[test]
    fn move_end_publishes_the_settled_view() {
        let channel = MemoryChannel::new();
        let router = master_router(channel);
        let controller = ViewportController::new(router.clone(), ControllerOptions::default());
        let surface = MockSurface::new();
        controller.open(surface.clone());

        surface.center.set((8000.0, 4200.0));
        surface.zoom.set(3);
        surface.fire_move_end();

        let location = router.current();
        assert_eq!(location.param("x"), Some("8000"));
        assert_eq!(location.param("y"), Some("4200"));
        assert_eq!(location.param("zoom"), Some("3"));
    }

    #[test]
    fn select_mode_and_always_following_do_not_publish_movements() {
        for options in [
            ControllerOptions {
                select_mode: true,
                ..Default::default()
            },
            ControllerOptions {
                always_following: true,
                ..Default::default()
            },
        ] {
            let channel = MemoryChannel::new();
            let router = master_router(channel);
            let controller = ViewportController::new(router, options);
            let surface = MockSurface::new();
            controller.open(surface.clone());

            assert!(surface.move_end.borrow().is_none());
        }
    }

    #[test]
    fn auto_follow_respects_the_deadband() {
        let channel = MemoryChannel::new();
        let router = master_router(channel);
        let controller = ViewportController::new(router.clone(), ControllerOptions::default());
        let surface = MockSurface::new();
        controller.open(surface.clone());

        surface.center.set((100.0, 100.0));

        // 0.6 off on x: past the deadband, pans.
        router.search(&[("x", "100.6".to_string()), ("y", "100".to_string())]);
        controller.sync_view(&[]);
        assert_eq!(surface.pan_history.borrow().last(), Some(&(100.6, 100.0)));

        // 0.4 off: inside the deadband, stays put.
        let pans_before = surface.pan_history.borrow().len();
        surface.center.set((100.0, 100.0));
        router.search(&[("x", "100.4".to_string()), ("y", "100".to_string())]);
        controller.sync_view(&[]);
        assert_eq!(surface.pan_history.borrow().len(), pans_before);
    }

    #[test]
    fn an_embedded_passive_surface_follows_its_masters_router_in_process() {
        // Storage events never reach the writing window, so an
        // embedded minimap must ride the master's own router rather
        // than a storage-backed replica.
        let channel = MemoryChannel::new();
        let router = master_router(channel);
        let primary = ViewportController::new(router.clone(), ControllerOptions::default());
        let primary_surface = MockSurface::new();
        primary.open(primary_surface.clone());

        let embedded = ViewportController::new(
            router.clone(),
            ControllerOptions {
                hide_controls: true,
                always_following: true,
                ..Default::default()
            },
        );
        let minimap_surface = MockSurface::new();
        embedded.open(minimap_surface.clone());

        // The user settles a pan on the primary surface.
        primary_surface.center.set((8200.0, 4600.0));
        primary_surface.fire_move_end();

        embedded.sync_view(&[]);
        assert_eq!(
            minimap_surface.pan_history.borrow().last(),
            Some(&(8200.0, 4600.0))
        );
    }

    #[test]
    fn zoom_chrome_steps_clamp_and_publish() {
        let channel = MemoryChannel::new();
        let router = master_router(channel);
        let controller = ViewportController::new(router.clone(), ControllerOptions::default());
        let surface = MockSurface::new();
        controller.open(surface.clone());

        controller.nudge_zoom(1);
        assert_eq!(surface.zoom.get(), 1);
        assert_eq!(router.current().param("zoom"), Some("1"));

        controller.nudge_zoom(-5);
        assert_eq!(surface.zoom.get(), 0);
        assert_eq!(router.current().param("zoom"), Some("0"));
    }

    #[test]
    fn always_following_tracks_the_target_inside_the_deadband() {
        let channel = MemoryChannel::new();
        let router = master_router(channel);
        let controller = ViewportController::new(
            router.clone(),
            ControllerOptions {
                always_following: true,
                ..Default::default()
            },
        );
        let surface = MockSurface::new();
        controller.open(surface.clone());

        surface.center.set((100.0, 100.0));
        router.search(&[("x", "100.1".to_string()), ("y", "100".to_string())]);
        controller.sync_view(&[]);
        assert_eq!(surface.pan_history.borrow().last(), Some(&(100.1, 100.0)));
    }

    #[test]
    fn marker_focus_pans_once_per_selection() {
        let channel = MemoryChannel::new();
        let router = master_router(channel);
        let controller = ViewportController::new(router.clone(), ControllerOptions::default());
        let surface = MockSurface::new();
        controller.open(surface.clone());

        let markers = vec![marker("m1", "iron", 9000.0, 4000.0)];
        router.go("/m1", true);
        controller.sync_view(&markers);
        assert_eq!(surface.pan_history.borrow().last(), Some(&(9000.0, 4000.0)));

        // Same selection again: no second pan. The settled view has
        // been republished, so auto-follow is quiescent too.
        router.search(&[("x", "9000".to_string()), ("y", "4000".to_string())]);
        let pans_before = surface.pan_history.borrow().len();
        surface.center.set((9000.0, 4000.0));
        controller.sync_view(&markers);
        assert_eq!(surface.pan_history.borrow().len(), pans_before);

        // Deselect and reselect: focuses again.
        router.go("/", true);
        controller.sync_view(&markers);
        surface.center.set((0.0, 0.0));
        router.go("/m1", true);
        controller.sync_view(&markers);
        assert!(surface.pan_history.borrow().len() > pans_before);
    }

    #[test]
    fn background_click_clears_selection_but_keeps_the_query() {
        let channel = MemoryChannel::new();
        let router = master_router(channel);
        let controller = ViewportController::new(router.clone(), ControllerOptions::default());
        let surface = MockSurface::new();
        controller.open(surface.clone());

        router.go("/m1?x=1&y=2&zoom=3", false);
        surface.fire_background_click();

        let location = router.current();
        assert_eq!(location.path, "/");
        assert_eq!(location.param("zoom"), Some("3"));
    }

    #[test]
    fn close_clears_the_surface_before_detaching_handlers() {
        let channel = MemoryChannel::new();
        let router = master_router(channel);
        let controller = ViewportController::new(router, ControllerOptions::default());
        let surface = MockSurface::new();
        controller.open(surface.clone());

        controller.close();

        assert_eq!(controller.state(), LifecycleState::Disposed);
        assert!(surface.move_end.borrow().is_none());
        assert!(surface.background_click.borrow().is_none());
        // A late event after disposal must not reach the engine.
        surface.fire_move_end();
    }
}
