#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

//! Tile image loading for the canvas surface. Visible cells resolve
//! through the shared tile pyramid to asset URLs; images load through
//! a bounded queue so a zoomed-out view does not fire dozens of
//! requests at once, and each completed decode repaints the scene.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use js_sys::Reflect;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlImageElement;

use outpost_shared::tiles::{TileCell, TileLocator, resolve, tile_url};

const LOAD_CONCURRENCY: usize = 6;
const ONLOAD_HANDLE_KEY: &str = "__outpostTileOnload";
const ONERROR_HANDLE_KEY: &str = "__outpostTileOnerror";

/// Cache of decoded tile images keyed by resolved locator. The empty
/// sentinel loads once and is then shared by every out-of-range cell.
pub struct TileStore {
    endpoint: String,
    images: RefCell<HashMap<TileLocator, HtmlImageElement>>,
    pending: RefCell<HashSet<TileLocator>>,
    queue: RefCell<VecDeque<TileLocator>>,
    in_flight: Cell<usize>,
    on_loaded: RefCell<Option<Rc<dyn Fn()>>>,
}

impl TileStore {
    pub fn new(endpoint: String) -> Rc<Self> {
        Rc::new(Self {
            endpoint,
            images: RefCell::new(HashMap::new()),
            pending: RefCell::new(HashSet::new()),
            queue: RefCell::new(VecDeque::new()),
            in_flight: Cell::new(0),
            on_loaded: RefCell::new(None),
        })
    }

    /// Callback fired after a queued tile finishes decoding (or fails),
    /// so the surface can schedule a repaint.
    pub fn set_on_loaded(&self, callback: Option<Rc<dyn Fn()>>) {
        *self.on_loaded.borrow_mut() = callback;
    }

    /// Image for a cell if it is already decoded; otherwise queue the
    /// load and return nothing for this frame.
    pub fn get(self: &Rc<Self>, cell: TileCell) -> Option<HtmlImageElement> {
        let locator = resolve(cell);
        if let Some(image) = self.images.borrow().get(&locator) {
            return Some(image.clone());
        }
        if self.pending.borrow_mut().insert(locator) {
            self.queue.borrow_mut().push_back(locator);
            self.pump();
        }
        None
    }

    fn pump(self: &Rc<Self>) {
        while self.in_flight.get() < LOAD_CONCURRENCY {
            let Some(locator) = self.queue.borrow_mut().pop_front() else {
                break;
            };
            self.in_flight.set(self.in_flight.get() + 1);
            self.load(locator);
        }
    }

    fn load(self: &Rc<Self>, locator: TileLocator) {
        let src = tile_url(&self.endpoint, locator);
        let image = match HtmlImageElement::new() {
            Ok(image) => image,
            Err(_) => {
                self.finish(locator, None);
                return;
            }
        };

        let store_for_load = self.clone();
        let image_for_load = image.clone();
        let onload = Closure::<dyn FnMut()>::new(move || {
            clear_image_handlers(&image_for_load);

            let store = store_for_load.clone();
            let decoded = image_for_load.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let _ = JsFuture::from(decoded.decode()).await;
                store.finish(locator, Some(decoded));
            });
        });

        let store_for_error = self.clone();
        let image_for_error = image.clone();
        let onerror = Closure::<dyn FnMut()>::new(move || {
            clear_image_handlers(&image_for_error);
            store_for_error.finish(locator, None);
        });

        let onload_js = onload.into_js_value();
        let onerror_js = onerror.into_js_value();
        image.set_onload(Some(onload_js.unchecked_ref()));
        image.set_onerror(Some(onerror_js.unchecked_ref()));
        let _ = Reflect::set(
            image.as_ref(),
            &JsValue::from_str(ONLOAD_HANDLE_KEY),
            &onload_js,
        );
        let _ = Reflect::set(
            image.as_ref(),
            &JsValue::from_str(ONERROR_HANDLE_KEY),
            &onerror_js,
        );
        image.set_src(&src);
    }

    fn finish(self: &Rc<Self>, locator: TileLocator, image: Option<HtmlImageElement>) {
        self.in_flight.set(self.in_flight.get().saturating_sub(1));
        match image {
            Some(image) => {
                self.images.borrow_mut().insert(locator, image);
            }
            None => {
                // Dropping the pending entry allows the next draw that
                // wants this cell to retry the load.
                self.pending.borrow_mut().remove(&locator);
            }
        }
        self.pump();

        let callback = self.on_loaded.borrow().clone();
        if let Some(callback) = callback {
            callback();
        }
    }
}

fn clear_image_handlers(image: &HtmlImageElement) {
    image.set_onload(None);
    image.set_onerror(None);
    let _ = Reflect::delete_property(image.as_ref(), &JsValue::from_str(ONLOAD_HANDLE_KEY));
    let _ = Reflect::delete_property(image.as_ref(), &JsValue::from_str(ONERROR_HANDLE_KEY));
}
