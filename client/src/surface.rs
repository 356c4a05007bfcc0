//! The rendering surface as an opaque capability: something that can
//! show a view of the world, place tile images, and carry named
//! marker layers. The viewport engine only ever talks to this trait,
//! so the canvas implementation and the mock used by native tests are
//! interchangeable.

use std::rc::Rc;

use outpost_shared::WorldCoordinate;

/// World-space configuration applied when a controller binds a
/// surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceConfig {
    /// Default view rectangle, south-west to north-east.
    pub bounds_sw: WorldCoordinate,
    pub bounds_ne: WorldCoordinate,
    /// Hard clamp rectangle, deliberately much larger than the map to
    /// permit temporary overscroll while panning.
    pub clamp_sw: WorldCoordinate,
    pub clamp_ne: WorldCoordinate,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub show_controls: bool,
}

impl SurfaceConfig {
    pub fn world_default(show_controls: bool) -> Self {
        Self {
            bounds_sw: WorldCoordinate::new(4000.0, 0.0),
            bounds_ne: WorldCoordinate::new(14336.0, 10000.0),
            clamp_sw: WorldCoordinate::new(-7000.0, -10000.0),
            clamp_ne: WorldCoordinate::new(25000.0, 20000.0),
            min_zoom: 0,
            max_zoom: 6,
            show_controls,
        }
    }
}

/// One marker to place on a layer. Built by the data-driven icon
/// factory from category metadata; no icon type hierarchy involved.
#[derive(Clone)]
pub struct SurfaceMarker {
    pub position: WorldCoordinate,
    pub icon_url: String,
    pub title: String,
    pub on_click: Rc<dyn Fn()>,
}

pub trait MapSurface {
    /// Handle for one attached marker layer.
    type Layer;

    fn bind(&self, config: SurfaceConfig);
    fn set_view(&self, center: WorldCoordinate, zoom: u8);
    fn fit_bounds(&self);
    fn pan_to(&self, center: WorldCoordinate);
    fn center(&self) -> WorldCoordinate;
    fn zoom(&self) -> u8;
    fn set_zoom(&self, zoom: u8);
    /// Marker layers can only attach once the surface finished
    /// setting up its panes.
    fn has_marker_pane(&self) -> bool;
    fn add_marker_layer(&self, markers: Vec<SurfaceMarker>) -> Self::Layer;
    fn remove_marker_layer(&self, layer: Self::Layer);
    /// Fired when a pan or zoom settles.
    fn set_move_end_handler(&self, handler: Option<Rc<dyn Fn()>>);
    /// Fired on a primary click that hits no marker.
    fn set_background_click_handler(&self, handler: Option<Rc<dyn Fn()>>);
}

#[cfg(any(test, not(target_arch = "wasm32")))]
pub mod mock {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    /// Records every interaction so tests can assert on the exact
    /// sequence of surface operations the engine performed.
    #[derive(Default)]
    pub struct MockSurface {
        pub config: RefCell<Option<SurfaceConfig>>,
        pub center: Cell<(f64, f64)>,
        pub zoom: Cell<u8>,
        pub fit_bounds_calls: Cell<u32>,
        pub pan_history: RefCell<Vec<(f64, f64)>>,
        pub marker_pane_ready: Cell<bool>,
        pub layers: RefCell<HashMap<u64, Vec<SurfaceMarker>>>,
        pub next_layer_id: Cell<u64>,
        pub move_end: RefCell<Option<Rc<dyn Fn()>>>,
        pub background_click: RefCell<Option<Rc<dyn Fn()>>>,
    }

    impl MockSurface {
        pub fn new() -> Rc<Self> {
            let surface = Self::default();
            surface.marker_pane_ready.set(true);
            Rc::new(surface)
        }

        pub fn fire_move_end(&self) {
            let handler = self.move_end.borrow().clone();
            if let Some(handler) = handler {
                handler();
            }
        }

        pub fn fire_background_click(&self) {
            let handler = self.background_click.borrow().clone();
            if let Some(handler) = handler {
                handler();
            }
        }

        pub fn layer_marker_count(&self, layer: u64) -> Option<usize> {
            self.layers.borrow().get(&layer).map(Vec::len)
        }
    }

    impl MapSurface for MockSurface {
        type Layer = u64;

        fn bind(&self, config: SurfaceConfig) {
            *self.config.borrow_mut() = Some(config);
        }

        fn set_view(&self, center: WorldCoordinate, zoom: u8) {
            self.center.set((center.x, center.y));
            self.zoom.set(zoom);
        }

        fn fit_bounds(&self) {
            let config = self.config.borrow();
            if let Some(config) = config.as_ref() {
                let center_x = (config.bounds_sw.x + config.bounds_ne.x) / 2.0;
                let center_y = (config.bounds_sw.y + config.bounds_ne.y) / 2.0;
                self.center.set((center_x, center_y));
            }
            self.fit_bounds_calls.set(self.fit_bounds_calls.get() + 1);
        }

        fn pan_to(&self, center: WorldCoordinate) {
            self.center.set((center.x, center.y));
            self.pan_history.borrow_mut().push((center.x, center.y));
        }

        fn center(&self) -> WorldCoordinate {
            let (x, y) = self.center.get();
            WorldCoordinate::new(x, y)
        }

        fn zoom(&self) -> u8 {
            self.zoom.get()
        }

        fn set_zoom(&self, zoom: u8) {
            self.zoom.set(zoom);
        }

        fn has_marker_pane(&self) -> bool {
            self.marker_pane_ready.get()
        }

        fn add_marker_layer(&self, markers: Vec<SurfaceMarker>) -> u64 {
            let id = self.next_layer_id.get();
            self.next_layer_id.set(id + 1);
            self.layers.borrow_mut().insert(id, markers);
            id
        }

        fn remove_marker_layer(&self, layer: u64) {
            self.layers.borrow_mut().remove(&layer);
        }

        fn set_move_end_handler(&self, handler: Option<Rc<dyn Fn()>>) {
            *self.move_end.borrow_mut() = handler;
        }

        fn set_background_click_handler(&self, handler: Option<Rc<dyn Fn()>>) {
            *self.background_click.borrow_mut() = handler;
        }
    }
}
