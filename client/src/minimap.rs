#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

//! Minimap: a small replica surface that continuously follows the
//! shared view state with its own persisted zoom and styling.

use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;

use outpost_shared::location::Location;
use outpost_shared::view_state::{MAX_ZOOM, MIN_ZOOM};

use crate::app::{ApiEndpoint, MinimapBorderRadius, MinimapOpacity, MinimapZoom, SharedRouter};
use crate::canvas::CanvasSurface;
use crate::channel::StorageChannel;
use crate::controller::{ControllerOptions, ViewportController};
use crate::router::{Router, RouterRole};
use crate::surface::MapSurface;
use crate::tiles::TileStore;

const MIN_OPACITY: u8 = 20;
const MAX_OPACITY: u8 = 100;
const MAX_BORDER_RADIUS: u8 = 50;

/// Step the minimap zoom by one, staying inside the pyramid range.
fn step_zoom(zoom: u8, delta: i8) -> u8 {
    let stepped = i16::from(zoom) + i16::from(delta);
    stepped.clamp(i16::from(MIN_ZOOM), i16::from(MAX_ZOOM)) as u8
}

/// Root for a detached minimap window: provides the contexts the
/// embedded minimap expects, seeded from the shared settings. Being
/// a separate window, it receives the master's storage events and so
/// runs its own replica router.
#[component]
pub fn MinimapWindow() -> impl IntoView {
    let config = crate::app::AppConfig::from_window();
    let (zoom, opacity, border_radius) = crate::app::saved_minimap_settings();

    let router = Rc::new(Router::new(
        RouterRole::Replica,
        StorageChannel::new(),
        Location::root(),
    ));
    provide_context(SharedRouter(StoredValue::new_local(router)));
    provide_context(ApiEndpoint(config.endpoint));
    provide_context(MinimapZoom(RwSignal::new(zoom)));
    provide_context(MinimapOpacity(RwSignal::new(opacity)));
    provide_context(MinimapBorderRadius(RwSignal::new(border_radius)));

    view! { <Minimap /> }
}

#[component]
pub fn Minimap() -> impl IntoView {
    // The minimap never authors view state; it follows whatever
    // router its host provides. In the main document that is the
    // master itself (a same-window storage replica would never hear
    // its own writes); in the detached window it is a true replica.
    let SharedRouter(router_slot) = expect_context();
    let router = router_slot.get_value();
    let ApiEndpoint(endpoint) = expect_context();
    let MinimapZoom(zoom) = expect_context();
    let MinimapOpacity(opacity) = expect_context();
    let MinimapBorderRadius(border_radius) = expect_context();

    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
    type ControllerSlot = Rc<RefCell<Option<Rc<ViewportController<CanvasSurface>>>>>;
    type SurfaceSlot = Rc<RefCell<Option<Rc<CanvasSurface>>>>;
    let controller_slot: ControllerSlot = Rc::new(RefCell::new(None));
    let surface_slot: SurfaceSlot = Rc::new(RefCell::new(None));

    Effect::new({
        let controller_slot = controller_slot.clone();
        let surface_slot = surface_slot.clone();
        let router = router.clone();
        let endpoint = endpoint.clone();
        move || {
            let Some(canvas) = canvas_ref.get() else {
                return;
            };
            if controller_slot.borrow().is_some() {
                return;
            }
            let canvas: &web_sys::HtmlCanvasElement = &canvas;
            let tiles = TileStore::new(endpoint.clone());
            let surface = Rc::new(CanvasSurface::new(canvas.clone(), tiles));
            let controller = ViewportController::new(
                (*router).clone(),
                ControllerOptions {
                    hide_controls: true,
                    always_following: true,
                    initial_zoom: Some(zoom.get_untracked()),
                    ..ControllerOptions::default()
                },
            );
            controller.open(surface.clone());
            *surface_slot.borrow_mut() = Some(surface);
            *controller_slot.borrow_mut() = Some(controller);
        }
    });

    // Track the broadcast view state.
    Effect::new({
        let controller_slot = controller_slot.clone();
        let router = router.clone();
        move || {
            router.location().track();
            if let Some(controller) = controller_slot.borrow().as_ref() {
                controller.sync_view(&[]);
            }
        }
    });

    // The zoom steppers act on the surface directly; the shared view
    // center is untouched.
    Effect::new({
        let surface_slot = surface_slot.clone();
        move || {
            let level = zoom.get();
            if let Some(surface) = surface_slot.borrow().as_ref() {
                surface.set_zoom(level);
            }
        }
    });

    // on_cleanup closures must be Send; park the Rc in a local slot.
    let teardown_slot = StoredValue::new_local(controller_slot.clone());
    on_cleanup(move || {
        teardown_slot.with_value(|slot| {
            if let Some(controller) = slot.borrow_mut().take() {
                controller.close();
            }
        });
    });

    let container_style = move || {
        format!(
            "opacity: {}%; border-radius: {}%;",
            opacity.get().clamp(MIN_OPACITY, MAX_OPACITY),
            border_radius.get().min(MAX_BORDER_RADIUS),
        )
    };

    view! {
        <div class="minimap" style=container_style>
            <canvas
                node_ref=canvas_ref
                style="position: absolute; inset: 0; width: 100%; height: 100%;"
            />
            <div class="minimap-controls">
                <button on:click=move |_| zoom.update(|level| *level = step_zoom(*level, 1))>
                    "+"
                </button>
                <button on:click=move |_| zoom.update(|level| *level = step_zoom(*level, -1))>
                    "-"
                </button>
                <input
                    type="range"
                    min=MIN_OPACITY.to_string()
                    max=MAX_OPACITY.to_string()
                    prop:value=move || opacity.get().to_string()
                    on:input=move |ev| {
                        if let Ok(value) = event_target_value(&ev).parse::<u8>() {
                            opacity.set(value.clamp(MIN_OPACITY, MAX_OPACITY));
                        }
                    }
                />
                <input
                    type="range"
                    min="0"
                    max=MAX_BORDER_RADIUS.to_string()
                    prop:value=move || border_radius.get().to_string()
                    on:input=move |ev| {
                        if let Ok(value) = event_target_value(&ev).parse::<u8>() {
                            border_radius.set(value.min(MAX_BORDER_RADIUS));
                        }
                    }
                />
            </div>
        </div>
    }
}
