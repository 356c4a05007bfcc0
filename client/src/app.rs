#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

//! Root application component: master navigation context, marker
//! data, the primary map surface and its reconciled overlay layers.

use std::cell::RefCell;
use std::rc::Rc;

use gloo_storage::Storage;
use js_sys::Reflect;
use leptos::prelude::*;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::spawn_local;

use outpost_shared::coords::{WorldCoordinate, format_coords};
use outpost_shared::filters::{CATEGORIES, CategoryItem, default_filters, search_categories};
use outpost_shared::location::Location;
use outpost_shared::markers::MarkerRecord;
use outpost_shared::routes::{MarkerRoute, RouteFilter, RouteSort, filter_routes, sort_routes};

use crate::api;
use crate::canvas::CanvasSurface;
use crate::channel::StorageChannel;
use crate::controller::{ControllerOptions, ViewportController};
use crate::layers::LayerReconciler;
use crate::log;
use crate::minimap::Minimap;
use crate::position::PositionTracker;
use crate::router::{Router, RouterRole};
use crate::tiles::TileStore;

const SETTINGS_KEY: &str = "outpost_settings";

/// Host-page configuration. The embedding page may override the API
/// endpoint through a global before the bundle loads.
pub struct AppConfig {
    pub endpoint: String,
}

impl AppConfig {
    pub fn from_window() -> Self {
        let endpoint = web_sys::window()
            .and_then(|window| {
                Reflect::get(window.as_ref(), &JsValue::from_str("__OUTPOST_API")).ok()
            })
            .and_then(|value| value.as_string())
            .unwrap_or_default();
        Self { endpoint }
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
struct Settings {
    filters: Vec<String>,
    tracking: bool,
    following: bool,
    minimap_shown: bool,
    minimap_zoom: u8,
    minimap_opacity: u8,
    minimap_border_radius: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            filters: default_filters(),
            tracking: false,
            following: true,
            minimap_shown: false,
            minimap_zoom: 4,
            minimap_opacity: 80,
            minimap_border_radius: 50,
        }
    }
}

/// Persisted minimap styling for a detached minimap window, which
/// reads the shared settings but never writes them.
pub(crate) fn saved_minimap_settings() -> (u8, u8, u8) {
    let saved: Settings = gloo_storage::LocalStorage::get(SETTINGS_KEY).unwrap_or_default();
    (
        saved.minimap_zoom,
        saved.minimap_opacity,
        saved.minimap_border_radius,
    )
}

// Context newtypes shared with the minimap.
//
// The embedded minimap rides the master's own router: storage events
// never fire in the window that wrote them, so a storage-backed
// replica in the same document would adopt the view once and then go
// deaf. Only the detached minimap window runs its own replica.
#[derive(Clone, Copy)]
pub(crate) struct SharedRouter(pub StoredValue<Rc<Router>, LocalStorage>);
#[derive(Clone)]
pub(crate) struct ApiEndpoint(pub String);
#[derive(Clone, Copy)]
pub(crate) struct MinimapZoom(pub RwSignal<u8>);
#[derive(Clone, Copy)]
pub(crate) struct MinimapOpacity(pub RwSignal<u8>);
#[derive(Clone, Copy)]
pub(crate) struct MinimapBorderRadius(pub RwSignal<u8>);

/// Root application component. Provides shared state via context.
#[component]
pub fn App() -> impl IntoView {
    let config = AppConfig::from_window();
    let endpoint = config.endpoint;

    let saved: Settings = gloo_storage::LocalStorage::get(SETTINGS_KEY).unwrap_or_default();
    let active_filters: RwSignal<Vec<String>> = RwSignal::new(saved.filters);
    let tracking: RwSignal<bool> = RwSignal::new(saved.tracking);
    let following: RwSignal<bool> = RwSignal::new(saved.following);
    let minimap_shown: RwSignal<bool> = RwSignal::new(saved.minimap_shown);
    let minimap_zoom: RwSignal<u8> = RwSignal::new(saved.minimap_zoom);
    let minimap_opacity: RwSignal<u8> = RwSignal::new(saved.minimap_opacity);
    let minimap_border_radius: RwSignal<u8> = RwSignal::new(saved.minimap_border_radius);

    let markers: RwSignal<Vec<MarkerRecord>> = RwSignal::new(Vec::new());
    let routes: RwSignal<Vec<MarkerRoute>> = RwSignal::new(Vec::new());
    let pointer: RwSignal<Option<WorldCoordinate>> = RwSignal::new(None);
    let filter_query: RwSignal<String> = RwSignal::new(String::new());
    let route_query: RwSignal<String> = RwSignal::new(String::new());
    let route_sort: RwSignal<RouteSort> = RwSignal::new(RouteSort::Match);

    // This surface owns navigation; every other window replicates it.
    let router = Rc::new(Router::new(
        RouterRole::Master,
        StorageChannel::new(),
        Location::root(),
    ));
    provide_context(SharedRouter(StoredValue::new_local(router.clone())));
    provide_context(ApiEndpoint(endpoint.clone()));
    provide_context(MinimapZoom(minimap_zoom));
    provide_context(MinimapOpacity(minimap_opacity));
    provide_context(MinimapBorderRadius(minimap_border_radius));

    // Initial load plus on-demand refresh from the sidebar.
    let refresh = {
        let endpoint = endpoint.clone();
        move || {
            let endpoint = endpoint.clone();
            spawn_local(async move {
                match api::fetch_markers(&endpoint).await {
                    Ok(list) => markers.set(list),
                    // Keep whatever we already had; an empty overlay
                    // is worse than a stale one.
                    Err(err) => log::warn(&format!("marker fetch failed: {err}")),
                }
                match api::fetch_marker_routes(&endpoint).await {
                    Ok(list) => routes.set(list),
                    Err(err) => log::warn(&format!("route fetch failed: {err}")),
                }
            });
        }
    };
    refresh();

    let position_tracker =
        PositionTracker::new(endpoint.clone(), router.clone(), tracking, following);
    position_tracker.start();
    // on_cleanup closures must be Send; park the Rc in a local slot.
    let tracker_slot = StoredValue::new_local(position_tracker.clone());
    on_cleanup(move || tracker_slot.with_value(|tracker| tracker.stop()));

    // Persist settings on any change.
    Effect::new(move || {
        let settings = Settings {
            filters: active_filters.get(),
            tracking: tracking.get(),
            following: following.get(),
            minimap_shown: minimap_shown.get(),
            minimap_zoom: minimap_zoom.get(),
            minimap_opacity: minimap_opacity.get(),
            minimap_border_radius: minimap_border_radius.get(),
        };
        let _ = gloo_storage::LocalStorage::set(SETTINGS_KEY, &settings);
    });

    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
    type ControllerSlot = Rc<RefCell<Option<Rc<ViewportController<CanvasSurface>>>>>;
    type SurfaceSlot = Rc<RefCell<Option<Rc<CanvasSurface>>>>;
    let controller_slot: ControllerSlot = Rc::new(RefCell::new(None));
    let surface_slot: SurfaceSlot = Rc::new(RefCell::new(None));
    let reconciler: Rc<LayerReconciler<CanvasSurface>> = Rc::new(LayerReconciler::new());

    // Open the controller once the canvas exists.
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
            surface.set_pointer_handler(Some(Rc::new(move |world| pointer.set(world))));

            let controller =
                ViewportController::new((*router).clone(), ControllerOptions::default());
            controller.open(surface.clone());
            *surface_slot.borrow_mut() = Some(surface);
            *controller_slot.borrow_mut() = Some(controller);
        }
    });

    // Follow shared view state and marker focus.
    Effect::new({
        let controller_slot = controller_slot.clone();
        let router = router.clone();
        move || {
            router.location().track();
            markers.track();
            if let Some(controller) = controller_slot.borrow().as_ref() {
                markers.with_untracked(|list| controller.sync_view(list));
            }
        }
    });

    // Reconcile overlay layers with the active filter set.
    Effect::new({
        let surface_slot = surface_slot.clone();
        let reconciler = reconciler.clone();
        let router = router.clone();
        move || {
            let filters = active_filters.get();
            markers.track();
            let slot = surface_slot.borrow();
            let Some(surface) = slot.as_ref() else {
                return;
            };
            let router = router.clone();
            let on_click: Rc<dyn Fn(MarkerRecord, &'static CategoryItem)> =
                Rc::new(move |record, _category| {
                    router.go(&format!("/{}", record.id), true);
                });
            markers.with_untracked(|list| {
                reconciler.reconcile(surface.as_ref(), &filters, list, on_click);
            });
        }
    });

    let teardown_slot = StoredValue::new_local((
        controller_slot.clone(),
        surface_slot.clone(),
        reconciler.clone(),
    ));
    on_cleanup(move || {
        teardown_slot.with_value(|(controllers, surfaces, reconciler)| {
            if let Some(surface) = surfaces.borrow().as_ref() {
                reconciler.clear(surface.as_ref());
            }
            if let Some(controller) = controllers.borrow_mut().take() {
                controller.close();
            }
        });
    });

    let player_position = position_tracker.position;
    let player_rotation = position_tracker.rotation;
    let sorted_routes = move || {
        let query = route_query.get().to_lowercase();
        let sort = route_sort.get();
        let active = active_filters.get();
        let player = player_position.get();
        routes.with(|list| {
            let mut visible = filter_routes(list, &RouteFilter::All, &query);
            sort_routes(&mut visible, sort, &active, player);
            visible.into_iter().cloned().collect::<Vec<_>>()
        })
    };
    // <For> children must be Send; hand the router in through a local
    // slot instead of capturing the Rc directly.
    let router_for_routes = StoredValue::new_local(router.clone());

    let router_for_selection = StoredValue::new_local(router.clone());
    let selected_marker = move || {
        let location = router_for_selection.get_value().location().get();
        let id = location.selection()?.to_string();
        markers.with(|list| list.iter().find(|record| record.id == id).cloned())
    };
    let router_for_close = StoredValue::new_local(router.clone());

    view! {
        <div style="position: relative; width: 100%; height: 100%; overflow: hidden;">
            <canvas
                node_ref=canvas_ref
                style="position: absolute; inset: 0; width: 100%; height: 100%; touch-action: none; cursor: grab;"
            />

            <div class="coords-readout">
                {move || pointer.get().map(format_coords).unwrap_or_default()}
            </div>

            <div class="zoom-controls">
                <button on:click={
                    let slot = controller_slot.clone();
                    move |_| {
                        if let Some(controller) = slot.borrow().as_ref() {
                            controller.nudge_zoom(1);
                        }
                    }
                }>
                    "+"
                </button>
                <button on:click={
                    let slot = controller_slot.clone();
                    move |_| {
                        if let Some(controller) = slot.borrow().as_ref() {
                            controller.nudge_zoom(-1);
                        }
                    }
                }>
                    "-"
                </button>
            </div>

            <div class="player-status">
                {move || {
                    player_position
                        .get()
                        .map(|position| {
                            format!("{} {:.0}°", format_coords(position), player_rotation.get())
                        })
                        .unwrap_or_default()
                }}
            </div>

            <div class="filter-panel">
                <input
                    type="search"
                    placeholder="Search categories"
                    prop:value=move || filter_query.get()
                    on:input=move |ev| filter_query.set(event_target_value(&ev))
                />
                <For
                    each=move || {
                        let query = filter_query.get().to_lowercase();
                        let matches = search_categories(&query);
                        CATEGORIES
                            .iter()
                            .filter(|category| matches(category))
                            .collect::<Vec<_>>()
                    }
                    key=|category| category.kind
                    children=move |category: &'static CategoryItem| {
                        view! {
                            <label>
                                <input
                                    type="checkbox"
                                    prop:checked=move || {
                                        active_filters
                                            .with(|list| list.iter().any(|kind| kind == category.kind))
                                    }
                                    on:change=move |_| {
                                        active_filters
                                            .update(|list| {
                                                match list.iter().position(|kind| kind == category.kind) {
                                                    Some(index) => {
                                                        list.remove(index);
                                                    }
                                                    None => list.push(category.kind.to_string()),
                                                }
                                            })
                                    }
                                />
                                <img src=category.icon_url alt=category.title />
                                {category.title}
                            </label>
                        }
                    }
                />
                <label>
                    <input
                        type="checkbox"
                        prop:checked=move || tracking.get()
                        on:change=move |_| tracking.update(|value| *value = !*value)
                    />
                    "Track position"
                </label>
                <label>
                    <input
                        type="checkbox"
                        prop:checked=move || following.get()
                        on:change=move |_| following.update(|value| *value = !*value)
                    />
                    "Follow player"
                </label>
                <label>
                    <input
                        type="checkbox"
                        prop:checked=move || minimap_shown.get()
                        on:change=move |_| minimap_shown.update(|value| *value = !*value)
                    />
                    "Minimap"
                </label>
            </div>

            <div class="routes-panel">
                <button on:click={
                    let refresh = refresh.clone();
                    move |_| refresh()
                }>
                    "Refresh"
                </button>
                <input
                    type="search"
                    placeholder="Search routes"
                    prop:value=move || route_query.get()
                    on:input=move |ev| route_query.set(event_target_value(&ev))
                />
                <select on:change=move |ev| {
                    route_sort
                        .set(
                            match event_target_value(&ev).as_str() {
                                "favorites" => RouteSort::Favorites,
                                "distance" => RouteSort::Distance,
                                "date" => RouteSort::Date,
                                "name" => RouteSort::Name,
                                "username" => RouteSort::Username,
                                _ => RouteSort::Match,
                            },
                        )
                }>
                    <option value="match">"Best match"</option>
                    <option value="favorites">"Favorites"</option>
                    <option value="distance">"Distance"</option>
                    <option value="date">"Newest"</option>
                    <option value="name">"Name"</option>
                    <option value="username">"Author"</option>
                </select>
                <For
                    each=sorted_routes
                    key=|route| route.id.clone()
                    children=move |route: MarkerRoute| {
                        let start = route.first_waypoint();
                        let router = router_for_routes.get_value();
                        view! {
                            <button
                                class="route-item"
                                on:click=move |_| {
                                    if let Some(start) = start {
                                        router
                                            .search(
                                                &[
                                                    ("x", start.x.to_string()),
                                                    ("y", start.y.to_string()),
                                                ],
                                            );
                                    }
                                }
                            >
                                <span>{route.name.clone()}</span>
                                <span class="route-author">{route.username.clone()}</span>
                            </button>
                        }
                    }
                />
            </div>

            {move || {
                selected_marker()
                    .map(|record| {
                        let close_router = router_for_close.get_value();
                        view! {
                            <div class="marker-panel">
                                <h3>{record.name.clone().unwrap_or_else(|| record.kind.clone())}</h3>
                                <p>{record.description.clone().unwrap_or_default()}</p>
                                <button on:click=move |_| close_router.go("/", true)>"Close"</button>
                            </div>
                        }
                    })
            }}

            {move || minimap_shown.get().then(|| view! { <Minimap /> })}
        </div>
    }
}
