#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

//! Canvas 2D map surface. Draws the tile pyramid and marker layers in
//! projected space at integer zoom steps, and translates pointer input
//! back into world coordinates for hit-testing and the coordinate
//! read-out.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::Closure;
use web_sys::{
    CanvasRenderingContext2d, HtmlCanvasElement, HtmlImageElement, MouseEvent, PointerEvent,
    WheelEvent,
};

use outpost_shared::coords::WorldCoordinate;
use outpost_shared::crs::{ProjectedCoordinate, to_projected, to_world};
use outpost_shared::tiles::{TILE_SIZE, TileCell};

use crate::surface::{MapSurface, SurfaceConfig, SurfaceMarker};
use crate::tiles::TileStore;

const ICON_SIZE: f64 = 32.0;
const CLICK_SLOP_PX: f64 = 5.0;
const DRAW_MARGIN_PX: f64 = 64.0;
const BACKGROUND_CSS: &str = "#859594";

pub struct CanvasSurface {
    inner: Rc<Inner>,
}

struct Inner {
    canvas: HtmlCanvasElement,
    tiles: Rc<TileStore>,
    icons: RefCell<HashMap<String, HtmlImageElement>>,
    config: RefCell<SurfaceConfig>,
    bound: Cell<bool>,
    /// View center in world units; zoom is the integer pyramid level.
    center: Cell<(f64, f64)>,
    zoom: Cell<u8>,
    layers: RefCell<HashMap<u64, Vec<SurfaceMarker>>>,
    next_layer_id: Cell<u64>,
    move_end: RefCell<Option<Rc<dyn Fn()>>>,
    background_click: RefCell<Option<Rc<dyn Fn()>>>,
    pointer_readout: RefCell<Option<Rc<dyn Fn(Option<WorldCoordinate>)>>>,
    frame_queued: Cell<bool>,
    // Drag state: last client position while a pointer is down, and
    // whether the gesture moved far enough to count as a pan.
    drag_last: Cell<Option<(f64, f64)>>,
    drag_start: Cell<(f64, f64)>,
    dragged: Cell<bool>,
    listeners: RefCell<Vec<(&'static str, Closure<dyn FnMut(web_sys::Event)>)>>,
}

impl CanvasSurface {
    pub fn new(canvas: HtmlCanvasElement, tiles: Rc<TileStore>) -> Self {
        let inner = Rc::new(Inner {
            canvas,
            tiles,
            icons: RefCell::new(HashMap::new()),
            config: RefCell::new(SurfaceConfig::world_default(true)),
            bound: Cell::new(false),
            center: Cell::new((0.0, 0.0)),
            zoom: Cell::new(0),
            layers: RefCell::new(HashMap::new()),
            next_layer_id: Cell::new(1),
            move_end: RefCell::new(None),
            background_click: RefCell::new(None),
            pointer_readout: RefCell::new(None),
            frame_queued: Cell::new(false),
            drag_last: Cell::new(None),
            drag_start: Cell::new((0.0, 0.0)),
            dragged: Cell::new(false),
            listeners: RefCell::new(Vec::new()),
        });

        let store = inner.clone();
        inner.tiles.set_on_loaded(Some(Rc::new(move || {
            store.schedule_draw();
        })));

        Self { inner }
    }

    /// Reports the world position under the pointer, or None when the
    /// pointer leaves the surface.
    pub fn set_pointer_handler(&self, handler: Option<Rc<dyn Fn(Option<WorldCoordinate>)>>) {
        *self.inner.pointer_readout.borrow_mut() = handler;
    }
}

impl MapSurface for CanvasSurface {
    type Layer = u64;

    fn bind(&self, config: SurfaceConfig) {
        *self.inner.config.borrow_mut() = config;
        if !self.inner.bound.replace(true) {
            self.inner.attach_listeners();
        }
        self.inner.resize_to_parent();
        self.inner.schedule_draw();
    }

    fn set_view(&self, center: WorldCoordinate, zoom: u8) {
        let config = *self.inner.config.borrow();
        self.inner
            .zoom
            .set(zoom.clamp(config.min_zoom, config.max_zoom));
        self.inner.set_center_clamped(center.x, center.y);
        self.inner.schedule_draw();
    }

    fn fit_bounds(&self) {
        let config = *self.inner.config.borrow();
        let sw = to_projected(config.bounds_sw);
        let ne = to_projected(config.bounds_ne);
        let span_x = (ne.x - sw.x).abs();
        let span_y = (ne.y - sw.y).abs();
        let (width, height) = self.inner.canvas_size();

        // Largest integer zoom at which the whole bounds rectangle
        // still fits on screen.
        let mut zoom = config.min_zoom;
        for candidate in config.min_zoom..=config.max_zoom {
            let scale = pixels_per_unit(candidate);
            if span_x * scale <= width && span_y * scale <= height {
                zoom = candidate;
            } else {
                break;
            }
        }
        self.inner.zoom.set(zoom);

        let mid = to_world(ProjectedCoordinate {
            x: (sw.x + ne.x) / 2.0,
            y: (sw.y + ne.y) / 2.0,
        });
        self.inner.set_center_clamped(mid.x, mid.y);
        self.inner.schedule_draw();
    }

    fn pan_to(&self, center: WorldCoordinate) {
        self.inner.set_center_clamped(center.x, center.y);
        self.inner.schedule_draw();
    }

    fn center(&self) -> WorldCoordinate {
        let (x, y) = self.inner.center.get();
        WorldCoordinate::new(x, y)
    }

    fn zoom(&self) -> u8 {
        self.inner.zoom.get()
    }

    fn set_zoom(&self, zoom: u8) {
        let config = *self.inner.config.borrow();
        self.inner
            .zoom
            .set(zoom.clamp(config.min_zoom, config.max_zoom));
        self.inner.schedule_draw();
    }

    fn has_marker_pane(&self) -> bool {
        self.inner.bound.get()
    }

    fn add_marker_layer(&self, markers: Vec<SurfaceMarker>) -> u64 {
        for marker in &markers {
            self.inner.ensure_icon(&marker.icon_url);
        }
        let id = self.inner.next_layer_id.get();
        self.inner.next_layer_id.set(id + 1);
        self.inner.layers.borrow_mut().insert(id, markers);
        self.inner.schedule_draw();
        id
    }

    fn remove_marker_layer(&self, layer: u64) {
        self.inner.layers.borrow_mut().remove(&layer);
        self.inner.schedule_draw();
    }

    fn set_move_end_handler(&self, handler: Option<Rc<dyn Fn()>>) {
        *self.inner.move_end.borrow_mut() = handler;
    }

    fn set_background_click_handler(&self, handler: Option<Rc<dyn Fn()>>) {
        *self.inner.background_click.borrow_mut() = handler;
    }
}

impl Drop for CanvasSurface {
    fn drop(&mut self) {
        self.inner.tiles.set_on_loaded(None);
        self.inner.detach_listeners();
    }
}

fn pixels_per_unit(zoom: u8) -> f64 {
    f64::from(1u32 << zoom)
}

impl Inner {
    fn canvas_size(&self) -> (f64, f64) {
        (
            f64::from(self.canvas.width()),
            f64::from(self.canvas.height()),
        )
    }

    fn resize_to_parent(&self) {
        let Some(parent) = self.canvas.parent_element() else {
            return;
        };
        let width = parent.client_width().max(1) as u32;
        let height = parent.client_height().max(1) as u32;
        if self.canvas.width() != width || self.canvas.height() != height {
            self.canvas.set_width(width);
            self.canvas.set_height(height);
        }
    }

    fn set_center_clamped(&self, x: f64, y: f64) {
        let config = *self.config.borrow();
        self.center.set((
            x.clamp(config.clamp_sw.x, config.clamp_ne.x),
            y.clamp(config.clamp_sw.y, config.clamp_ne.y),
        ));
    }

    fn projected_center(&self) -> ProjectedCoordinate {
        let (x, y) = self.center.get();
        to_projected(WorldCoordinate::new(x, y))
    }

    fn screen_to_world(&self, screen_x: f64, screen_y: f64) -> WorldCoordinate {
        let (width, height) = self.canvas_size();
        let scale = pixels_per_unit(self.zoom.get());
        let c = self.projected_center();
        to_world(ProjectedCoordinate {
            x: c.x + (screen_x - width / 2.0) / scale,
            y: c.y + (screen_y - height / 2.0) / scale,
        })
    }

    fn local_position(&self, client_x: f64, client_y: f64) -> (f64, f64) {
        let rect = self.canvas.get_bounding_client_rect();
        (client_x - rect.left(), client_y - rect.top())
    }

    fn fire_move_end(&self) {
        let handler = self.move_end.borrow().clone();
        if let Some(handler) = handler {
            handler();
        }
    }

    // --- Rendering ---

    fn schedule_draw(self: &Rc<Self>) {
        if self.frame_queued.replace(true) {
            return;
        }
        let Some(window) = web_sys::window() else {
            self.frame_queued.set(false);
            return;
        };
        let inner = self.clone();
        let frame = Closure::once_into_js(move || {
            inner.frame_queued.set(false);
            inner.draw();
        });
        if window
            .request_animation_frame(frame.unchecked_ref())
            .is_err()
        {
            self.frame_queued.set(false);
        }
    }

    fn draw(self: &Rc<Self>) {
        self.resize_to_parent();
        let Some(ctx) = self
            .canvas
            .get_context("2d")
            .ok()
            .flatten()
            .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
        else {
            return;
        };

        let (width, height) = self.canvas_size();
        let zoom = self.zoom.get();
        let scale = pixels_per_unit(zoom);
        let c = self.projected_center();

        ctx.set_fill_style_str(BACKGROUND_CSS);
        ctx.fill_rect(0.0, 0.0, width, height);

        // Each tile covers TILE_SIZE screen pixels, so TILE_SIZE/scale
        // projected units.
        let span = TILE_SIZE / scale;
        let left = c.x - width / 2.0 / scale;
        let top = c.y - height / 2.0 / scale;
        let first_x = (left / span).floor() as i32;
        let first_y = (top / span).floor() as i32;
        let count_x = (width / TILE_SIZE).ceil() as i32 + 1;
        let count_y = (height / TILE_SIZE).ceil() as i32 + 1;

        for cell_y in first_y..first_y + count_y {
            for cell_x in first_x..first_x + count_x {
                let cell = TileCell {
                    x: cell_x,
                    y: cell_y,
                    zoom,
                };
                let Some(image) = self.tiles.get(cell) else {
                    continue;
                };
                let screen_x = f64::from(cell_x) * TILE_SIZE - c.x * scale + width / 2.0;
                let screen_y = f64::from(cell_y) * TILE_SIZE - c.y * scale + height / 2.0;
                let _ = ctx.draw_image_with_html_image_element(&image, screen_x, screen_y);
            }
        }

        let icons = self.icons.borrow();
        for markers in self.layers.borrow().values() {
            for marker in markers {
                let p = to_projected(marker.position);
                let screen_x = (p.x - c.x) * scale + width / 2.0;
                let screen_y = (p.y - c.y) * scale + height / 2.0;
                if screen_x < -DRAW_MARGIN_PX
                    || screen_y < -DRAW_MARGIN_PX
                    || screen_x > width + DRAW_MARGIN_PX
                    || screen_y > height + DRAW_MARGIN_PX
                {
                    continue;
                }
                let Some(icon) = icons.get(&marker.icon_url) else {
                    continue;
                };
                if icon.complete() && icon.natural_width() > 0 {
                    let _ = ctx.draw_image_with_html_image_element_and_dw_and_dh(
                        icon,
                        screen_x - ICON_SIZE / 2.0,
                        screen_y - ICON_SIZE / 2.0,
                        ICON_SIZE,
                        ICON_SIZE,
                    );
                }
            }
        }
    }

    fn ensure_icon(self: &Rc<Self>, url: &str) {
        if self.icons.borrow().contains_key(url) {
            return;
        }
        let Ok(image) = HtmlImageElement::new() else {
            return;
        };
        let inner = self.clone();
        let loaded = image.clone();
        let onload = Closure::<dyn FnMut()>::new(move || {
            loaded.set_onload(None);
            inner.schedule_draw();
        });
        image.set_onload(Some(onload.as_ref().unchecked_ref()));
        onload.forget();
        image.set_src(url);
        self.icons.borrow_mut().insert(url.to_string(), image);
    }

    // --- Pointer input ---

    fn hit_test(&self, screen_x: f64, screen_y: f64) -> Option<SurfaceMarker> {
        let (width, height) = self.canvas_size();
        let scale = pixels_per_unit(self.zoom.get());
        let c = self.projected_center();
        let half = ICON_SIZE / 2.0;

        for markers in self.layers.borrow().values() {
            for marker in markers {
                let p = to_projected(marker.position);
                let marker_x = (p.x - c.x) * scale + width / 2.0;
                let marker_y = (p.y - c.y) * scale + height / 2.0;
                if (screen_x - marker_x).abs() <= half && (screen_y - marker_y).abs() <= half {
                    return Some(marker.clone());
                }
            }
        }
        None
    }

    fn on_pointer_down(self: &Rc<Self>, event: &PointerEvent) {
        let position = (f64::from(event.client_x()), f64::from(event.client_y()));
        self.drag_last.set(Some(position));
        self.drag_start.set(position);
        self.dragged.set(false);

        if let Some(target) = event.target()
            && let Ok(element) = target.dyn_into::<web_sys::HtmlElement>()
        {
            element.set_pointer_capture(event.pointer_id()).ok();
        }
    }

    fn on_pointer_move(self: &Rc<Self>, event: &PointerEvent) {
        let client_x = f64::from(event.client_x());
        let client_y = f64::from(event.client_y());

        if let Some((last_x, last_y)) = self.drag_last.get() {
            let dx = client_x - last_x;
            let dy = client_y - last_y;
            self.drag_last.set(Some((client_x, client_y)));

            let (start_x, start_y) = self.drag_start.get();
            if (client_x - start_x).abs() > CLICK_SLOP_PX
                || (client_y - start_y).abs() > CLICK_SLOP_PX
            {
                self.dragged.set(true);
            }
            if self.dragged.get() {
                let scale = pixels_per_unit(self.zoom.get());
                let c = self.projected_center();
                let moved = to_world(ProjectedCoordinate {
                    x: c.x - dx / scale,
                    y: c.y - dy / scale,
                });
                self.set_center_clamped(moved.x, moved.y);
                self.schedule_draw();
            }
            return;
        }

        // The read-out is part of the surface chrome; chromeless
        // surfaces (the minimap) never report pointer positions.
        if !self.config.borrow().show_controls {
            return;
        }
        let handler = self.pointer_readout.borrow().clone();
        if let Some(handler) = handler {
            let (local_x, local_y) = self.local_position(client_x, client_y);
            let world = self.screen_to_world(local_x, local_y);
            handler(world.in_bounds().then_some(world));
        }
    }

    fn on_pointer_up(self: &Rc<Self>) {
        if self.drag_last.take().is_some() && self.dragged.get() {
            self.fire_move_end();
        }
    }

    fn on_pointer_leave(self: &Rc<Self>) {
        let handler = self.pointer_readout.borrow().clone();
        if let Some(handler) = handler {
            handler(None);
        }
    }

    fn on_wheel(self: &Rc<Self>, event: &WheelEvent) {
        event.prevent_default();
        let config = *self.config.borrow();
        let zoom = self.zoom.get();
        let next = if event.delta_y() < 0.0 {
            zoom.saturating_add(1).min(config.max_zoom)
        } else {
            zoom.saturating_sub(1).max(config.min_zoom)
        };
        if next != zoom {
            self.zoom.set(next);
            self.schedule_draw();
            self.fire_move_end();
        }
    }

    fn on_click(self: &Rc<Self>, event: &MouseEvent) {
        // A completed drag ends with a click event too; only a
        // stationary release counts as selection.
        if self.dragged.get() {
            return;
        }
        let (local_x, local_y) =
            self.local_position(f64::from(event.client_x()), f64::from(event.client_y()));
        match self.hit_test(local_x, local_y) {
            Some(marker) => (marker.on_click)(),
            None => {
                let handler = self.background_click.borrow().clone();
                if let Some(handler) = handler {
                    handler();
                }
            }
        }
    }

    // --- Listener plumbing ---

    fn attach_listeners(self: &Rc<Self>) {
        let mut listeners = self.listeners.borrow_mut();

        let inner = self.clone();
        listeners.push(self.listen("pointerdown", move |event| {
            if let Ok(event) = event.dyn_into::<PointerEvent>() {
                inner.on_pointer_down(&event);
            }
        }));

        let inner = self.clone();
        listeners.push(self.listen("pointermove", move |event| {
            if let Ok(event) = event.dyn_into::<PointerEvent>() {
                inner.on_pointer_move(&event);
            }
        }));

        let inner = self.clone();
        listeners.push(self.listen("pointerup", move |_| {
            inner.on_pointer_up();
        }));

        let inner = self.clone();
        listeners.push(self.listen("pointerleave", move |_| {
            inner.on_pointer_leave();
        }));

        let inner = self.clone();
        listeners.push(self.listen("wheel", move |event| {
            if let Ok(event) = event.dyn_into::<WheelEvent>() {
                inner.on_wheel(&event);
            }
        }));

        let inner = self.clone();
        listeners.push(self.listen("click", move |event| {
            if let Ok(event) = event.dyn_into::<MouseEvent>() {
                inner.on_click(&event);
            }
        }));
    }

    fn listen(
        &self,
        name: &'static str,
        handler: impl FnMut(web_sys::Event) + 'static,
    ) -> (&'static str, Closure<dyn FnMut(web_sys::Event)>) {
        let closure = Closure::<dyn FnMut(web_sys::Event)>::new(handler);
        let _ = self
            .canvas
            .add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
        (name, closure)
    }

    fn detach_listeners(&self) {
        for (name, closure) in self.listeners.borrow_mut().drain(..) {
            let _ = self
                .canvas
                .remove_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
        }
    }
}
