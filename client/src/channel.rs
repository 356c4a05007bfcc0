#![cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]

//! The broadcast medium behind cross-surface view-state sync.
//!
//! Surfaces never talk to each other directly: the master publishes
//! the serialized location into a shared store and replicas adopt
//! whatever value they observe, last write wins. The channel is a
//! trait so the engine can run against an in-memory implementation in
//! native tests and against `localStorage` + storage events in the
//! browser.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::Closure;

use crate::log;

/// Storage key holding the last-published location string.
pub const CHANNEL_KEY: &str = "url";

pub trait StateChannel {
    /// Last-published value, if any.
    fn read(&self) -> Option<String>;
    /// Publish a new value. Observers on *other* surfaces are
    /// notified; the publishing surface is not.
    fn publish(&self, value: &str);
    /// Observe published values until the returned subscription is
    /// dropped.
    fn subscribe(&self, callback: Rc<dyn Fn(&str)>) -> Subscription;
}

/// RAII unsubscribe handle.
pub struct Subscription {
    cleanup: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cleanup: impl FnOnce() + 'static) -> Self {
        Self {
            cleanup: Some(Box::new(cleanup)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

/// In-process channel for native tests and single-window fallbacks.
/// Delivery is synchronous; only non-publishing surfaces subscribe,
/// which preserves the no-self-notify contract.
#[derive(Default)]
pub struct MemoryChannel {
    value: RefCell<Option<String>>,
    subscribers: Rc<RefCell<HashMap<usize, Rc<dyn Fn(&str)>>>>,
    next_id: RefCell<usize>,
}

impl MemoryChannel {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }
}

impl StateChannel for MemoryChannel {
    fn read(&self) -> Option<String> {
        self.value.borrow().clone()
    }

    fn publish(&self, value: &str) {
        *self.value.borrow_mut() = Some(value.to_string());
        let subscribers: Vec<_> = self.subscribers.borrow().values().cloned().collect();
        for callback in subscribers {
            callback(value);
        }
    }

    fn subscribe(&self, callback: Rc<dyn Fn(&str)>) -> Subscription {
        let id = {
            let mut next = self.next_id.borrow_mut();
            *next += 1;
            *next
        };
        self.subscribers.borrow_mut().insert(id, callback);

        let subscribers = Rc::downgrade(&self.subscribers);
        Subscription::new(move || {
            if let Some(subscribers) = Weak::upgrade(&subscribers) {
                subscribers.borrow_mut().remove(&id);
            }
        })
    }
}

/// Browser channel over `localStorage`. Storage events only fire in
/// windows other than the writer, which is exactly the broadcast
/// semantics the sync protocol needs.
pub struct StorageChannel;

impl StorageChannel {
    pub fn new() -> Rc<Self> {
        Rc::new(Self)
    }

    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok()?
    }
}

impl StateChannel for StorageChannel {
    fn read(&self) -> Option<String> {
        Self::storage()?.get_item(CHANNEL_KEY).ok()?
    }

    fn publish(&self, value: &str) {
        let Some(storage) = Self::storage() else {
            return;
        };
        if storage.set_item(CHANNEL_KEY, value).is_err() {
            log::warn("failed to persist view state to localStorage");
        }
    }

    fn subscribe(&self, callback: Rc<dyn Fn(&str)>) -> Subscription {
        let Some(window) = web_sys::window() else {
            return Subscription::new(|| {});
        };

        let handler = Closure::<dyn Fn(web_sys::StorageEvent)>::new(
            move |event: web_sys::StorageEvent| {
                if event.key().as_deref() != Some(CHANNEL_KEY) {
                    return;
                }
                let Some(value) = event.new_value() else {
                    return;
                };
                if !value.is_empty() {
                    callback(&value);
                }
            },
        );
        if window
            .add_event_listener_with_callback("storage", handler.as_ref().unchecked_ref())
            .is_err()
        {
            log::warn("failed to attach storage listener");
            return Subscription::new(move || drop(handler));
        }

        Subscription::new(move || {
            let _ = window
                .remove_event_listener_with_callback("storage", handler.as_ref().unchecked_ref());
        })
    }
}
