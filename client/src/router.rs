//! Cross-surface navigation: one master surface authors the shared
//! location, replicas mirror it. This is an explicit context object
//! constructed once per process and handed to everything that
//! navigates; there is no hidden global location.

use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;

use outpost_shared::Location;

use crate::channel::{StateChannel, Subscription};
use crate::log;

/// Exactly one master per logical session may write; replicas are
/// read-only mirrors. The role is fixed at construction, never
/// inferred. Two racing masters is a contract violation, not a
/// runtime condition this handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterRole {
    Master,
    Replica,
}

#[derive(Clone)]
pub struct Router {
    role: RouterRole,
    location: RwSignal<Location>,
    /// Local navigation history (back/forward), master only. The
    /// replica adopts broadcast values without touching it.
    history: Rc<RefCell<Vec<String>>>,
    channel: Rc<dyn StateChannel>,
    _subscription: Rc<Option<Subscription>>,
}

impl Router {
    /// Build the navigation context. The initial location is the
    /// shared store's current value, falling back to the surface's
    /// own last-known location when nothing has been published yet.
    pub fn new(role: RouterRole, channel: Rc<dyn StateChannel>, fallback: Location) -> Self {
        let initial = channel
            .read()
            .and_then(|raw| Location::parse(&raw).ok())
            .unwrap_or(fallback);
        let location = RwSignal::new(initial);

        let subscription = match role {
            RouterRole::Master => None,
            RouterRole::Replica => {
                // Adopt every observed value immediately, bypassing
                // local history. Malformed values are ignored so a
                // bad write can never take a replica down.
                Some(channel.subscribe(Rc::new(move |raw: &str| match Location::parse(raw) {
                    Ok(parsed) => location.set(parsed),
                    Err(_) => log::warn(&format!("ignoring malformed shared location: {raw:?}")),
                })))
            }
        };

        Self {
            role,
            location,
            history: Rc::new(RefCell::new(Vec::new())),
            channel,
            _subscription: Rc::new(subscription),
        }
    }

    /// Reactive handle on the current location.
    pub fn location(&self) -> RwSignal<Location> {
        self.location
    }

    pub fn current(&self) -> Location {
        self.location.get_untracked()
    }

    /// Navigate to a path. With `preserve_search` the current query
    /// parameters survive underneath any the target itself carries.
    /// A no-op when the resolved target equals the current location,
    /// so repeated navigations never pile up history entries.
    pub fn go(&self, href: &str, preserve_search: bool) {
        let current = self.current();
        let Ok(mut target) = Location::parse(href) else {
            log::warn(&format!("refusing to navigate to malformed href: {href:?}"));
            return;
        };
        if preserve_search {
            let own_params = std::mem::take(&mut target.query);
            target.query = current.query.clone();
            for (key, value) in own_params {
                target.set_param(&key, &value);
            }
        }

        if target == current {
            return;
        }

        let serialized = target.to_string();
        self.location.set(target);
        if self.role == RouterRole::Master {
            self.history.borrow_mut().push(serialized.clone());
            self.channel.publish(&serialized);
        }
    }

    /// Merge parameters into the current query (overwriting same-named
    /// keys, preserving the rest) and navigate.
    pub fn search(&self, params: &[(&str, String)]) {
        let mut target = self.current();
        for (key, value) in params {
            target.set_param(key, value);
        }
        self.go(&target.to_string(), false);
    }

    #[cfg(test)]
    pub(crate) fn history_len(&self) -> usize {
        self.history.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MemoryChannel;

    fn master(channel: Rc<MemoryChannel>) -> Router {
        Router::new(RouterRole::Master, channel, Location::root())
    }

    #[test]
    fn repeated_navigation_to_the_same_target_is_a_no_op() {
        let channel = MemoryChannel::new();
        let router = master(channel);

        router.go("/marker1?foo=bar", false);
        assert_eq!(router.history_len(), 1);

        router.go("/marker1?foo=bar", false);
        assert_eq!(router.history_len(), 1);
        assert_eq!(router.current().to_string(), "/marker1?foo=bar");
    }

    #[test]
    fn search_merges_without_dropping_unrelated_keys() {
        let channel = MemoryChannel::new();
        let router = master(channel);
        router.go("/?mapFilters=iron,gold&x=1", false);

        router.search(&[
            ("x", "5".to_string()),
            ("y", "5".to_string()),
            ("zoom", "3".to_string()),
        ]);

        let location = router.current();
        assert_eq!(location.param("mapFilters"), Some("iron,gold"));
        assert_eq!(location.param("x"), Some("5"));
        assert_eq!(location.param("y"), Some("5"));
        assert_eq!(location.param("zoom"), Some("3"));
    }

    #[test]
    fn preserve_search_keeps_existing_params_under_new_ones() {
        let channel = MemoryChannel::new();
        let router = master(channel);
        router.go("/marker1?x=1&y=2&zoom=3", false);

        router.go("/", true);

        let location = router.current();
        assert_eq!(location.path, "/");
        assert_eq!(location.param("x"), Some("1"));
        assert_eq!(location.param("zoom"), Some("3"));
    }

    #[test]
    fn replica_adopts_published_state_without_history() {
        let channel = MemoryChannel::new();
        let writer = master(channel.clone());
        let replica = Router::new(RouterRole::Replica, channel, Location::root());

        writer.go("/?x=5000&y=4000&zoom=2", false);

        assert_eq!(replica.current().param("x"), Some("5000"));
        assert_eq!(replica.history_len(), 0);
    }

    #[test]
    fn replica_ignores_malformed_values_and_keeps_last_good_state() {
        let channel = MemoryChannel::new();
        let writer = master(channel.clone());
        let replica = Router::new(RouterRole::Replica, channel.clone(), Location::root());

        writer.go("/?x=1&y=2&zoom=3", false);
        channel.publish("not a location at all");

        assert_eq!(replica.current().to_string(), "/?x=1&y=2&zoom=3");
    }

    #[test]
    fn initial_state_comes_from_the_shared_store_when_present() {
        let channel = MemoryChannel::new();
        channel.publish("/abc?zoom=4");

        let router = Router::new(RouterRole::Replica, channel, Location::root());
        assert_eq!(router.current().path, "/abc");
        assert_eq!(router.current().param("zoom"), Some("4"));
    }
}
