//! Incremental per-category marker layers. Marker sets are large, so
//! a filter toggle must not rebuild every layer: layers whose type
//! left the active set are destroyed, layers already present are kept
//! untouched, and only the newly-missing types are built.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use outpost_shared::filters::{CategoryItem, find_category};
use outpost_shared::markers::MarkerRecord;

use crate::log;
use crate::surface::{MapSurface, SurfaceMarker};

struct LayerEntry<L> {
    layer: L,
    /// Ids of the records the layer was built from, in list order. A
    /// mismatch on a later reconcile means the layer is stale and gets
    /// replaced wholesale; there is no per-marker diffing.
    member_ids: Vec<String>,
}

pub struct LayerReconciler<S: MapSurface> {
    /// At most one layer per category; a key's presence implies the
    /// category is in the active filter set.
    layer_by_kind: RefCell<HashMap<String, LayerEntry<S::Layer>>>,
}

impl<S: MapSurface> Default for LayerReconciler<S> {
    fn default() -> Self {
        Self {
            layer_by_kind: RefCell::new(HashMap::new()),
        }
    }
}

fn member_ids(markers: &[MarkerRecord], kind: &str) -> Vec<String> {
    markers
        .iter()
        .filter(|marker| marker.kind == kind)
        .map(|marker| marker.id.clone())
        .collect()
}

impl<S: MapSurface> LayerReconciler<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layer_count(&self) -> usize {
        self.layer_by_kind.borrow().len()
    }

    /// Bring the surface's layers in line with the active filter set
    /// and the current marker list. A category missing from the
    /// registry is skipped with a warning; the rest still reconcile.
    pub fn reconcile(
        &self,
        surface: &S,
        active_filters: &[String],
        markers: &[MarkerRecord],
        on_marker_click: Rc<dyn Fn(MarkerRecord, &'static CategoryItem)>,
    ) {
        if !surface.has_marker_pane() {
            return;
        }

        let mut missing: Vec<&String> = active_filters.iter().collect();
        {
            let mut layers = self.layer_by_kind.borrow_mut();
            let kinds: Vec<String> = layers.keys().cloned().collect();
            for kind in kinds {
                if let Some(index) = missing.iter().position(|wanted| **wanted == kind) {
                    let fresh = markers.is_empty()
                        || layers
                            .get(&kind)
                            .is_some_and(|entry| entry.member_ids == member_ids(markers, &kind));
                    if fresh {
                        // Already attached, still wanted, same marker
                        // data; leave it be.
                        missing.swap_remove(index);
                    } else if let Some(entry) = layers.remove(&kind) {
                        // Stale marker data: replace wholesale, so the
                        // kind stays on the rebuild list.
                        surface.remove_marker_layer(entry.layer);
                    }
                } else if let Some(entry) = layers.remove(&kind) {
                    surface.remove_marker_layer(entry.layer);
                }
            }
        }

        // An empty list means the data has not arrived (or the fetch
        // failed); a stale overlay beats a blank one.
        if markers.is_empty() {
            return;
        }

        for kind in missing {
            let Some(category) = find_category(kind) else {
                log::warn(&format!("no category metadata for filter {kind}"));
                continue;
            };

            let surface_markers: Vec<SurfaceMarker> = markers
                .iter()
                .filter(|marker| marker.kind == category.kind)
                .filter_map(|marker| {
                    let position = marker.focus_position()?;
                    let record = marker.clone();
                    let on_click = on_marker_click.clone();
                    Some(SurfaceMarker {
                        position,
                        icon_url: category.icon_url.to_string(),
                        title: category.title.to_string(),
                        on_click: Rc::new(move || on_click(record.clone(), category)),
                    })
                })
                .collect();

            let layer = surface.add_marker_layer(surface_markers);
            self.layer_by_kind.borrow_mut().insert(
                category.kind.to_string(),
                LayerEntry {
                    layer,
                    member_ids: member_ids(markers, category.kind),
                },
            );
        }
    }

    /// Detach every layer, used when the owning surface closes.
    pub fn clear(&self, surface: &S) {
        for (_, entry) in self.layer_by_kind.borrow_mut().drain() {
            surface.remove_marker_layer(entry.layer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::mock::MockSurface;
    use chrono::{TimeZone, Utc};
    use std::cell::Cell;

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

    fn no_click() -> Rc<dyn Fn(MarkerRecord, &'static CategoryItem)> {
        Rc::new(|_, _| {})
    }

    fn filters(kinds: &[&str]) -> Vec<String> {
        kinds.iter().map(|kind| kind.to_string()).collect()
    }

    #[test]
    fn builds_one_layer_per_active_category() {
        let surface = MockSurface::new();
        let reconciler: LayerReconciler<MockSurface> = LayerReconciler::new();
        let markers = vec![
            marker("m1", "iron", 9000.0, 4000.0),
            marker("m2", "iron", 9100.0, 4100.0),
            marker("m3", "wyrdwood", 8000.0, 3000.0),
        ];

        reconciler.reconcile(&surface, &filters(&["iron", "wyrdwood"]), &markers, no_click());

        assert_eq!(reconciler.layer_count(), 2);
        let layers = surface.layers.borrow();
        let sizes: Vec<usize> = layers.values().map(Vec::len).collect();
        assert!(sizes.contains(&2) && sizes.contains(&1));
    }

    #[test]
    fn toggling_a_filter_off_removes_only_that_layer() {
        let surface = MockSurface::new();
        let reconciler: LayerReconciler<MockSurface> = LayerReconciler::new();
        let markers = vec![
            marker("m1", "iron", 9000.0, 4000.0),
            marker("m3", "wyrdwood", 8000.0, 3000.0),
        ];

        reconciler.reconcile(&surface, &filters(&["iron", "wyrdwood"]), &markers, no_click());
        let iron_layer_before = reconciler
            .layer_by_kind
            .borrow()
            .get("iron")
            .expect("iron layer")
            .layer;

        reconciler.reconcile(&surface, &filters(&["iron"]), &markers, no_click());

        assert_eq!(reconciler.layer_count(), 1);
        // The surviving layer was not rebuilt.
        assert_eq!(
            reconciler.layer_by_kind.borrow().get("iron").unwrap().layer,
            iron_layer_before
        );
        assert!(surface.layers.borrow().contains_key(&iron_layer_before));
    }

    #[test]
    fn toggling_off_and_back_on_reproduces_an_equivalent_layer() {
        let surface = MockSurface::new();
        let reconciler: LayerReconciler<MockSurface> = LayerReconciler::new();
        let markers = vec![
            marker("m1", "iron", 9000.0, 4000.0),
            marker("m2", "iron", 9100.0, 4100.0),
        ];

        reconciler.reconcile(&surface, &filters(&["iron"]), &markers, no_click());
        let first = reconciler.layer_by_kind.borrow().get("iron").unwrap().layer;
        let first_count = surface.layer_marker_count(first).unwrap();

        reconciler.reconcile(&surface, &filters(&[]), &markers, no_click());
        assert_eq!(reconciler.layer_count(), 0);

        reconciler.reconcile(&surface, &filters(&["iron"]), &markers, no_click());
        let second = reconciler.layer_by_kind.borrow().get("iron").unwrap().layer;
        assert_eq!(surface.layer_marker_count(second), Some(first_count));
    }

    #[test]
    fn changed_marker_data_replaces_the_layer_of_a_still_active_kind() {
        let surface = MockSurface::new();
        let reconciler: LayerReconciler<MockSurface> = LayerReconciler::new();
        let markers = vec![marker("m1", "iron", 9000.0, 4000.0)];

        reconciler.reconcile(&surface, &filters(&["iron"]), &markers, no_click());
        let first = reconciler.layer_by_kind.borrow().get("iron").unwrap().layer;
        assert_eq!(surface.layer_marker_count(first), Some(1));

        // A refreshed marker list rebuilds the layer wholesale.
        let grown = vec![
            marker("m1", "iron", 9000.0, 4000.0),
            marker("m2", "iron", 9100.0, 4100.0),
        ];
        reconciler.reconcile(&surface, &filters(&["iron"]), &grown, no_click());
        let second = reconciler.layer_by_kind.borrow().get("iron").unwrap().layer;
        assert_ne!(second, first);
        assert_eq!(surface.layer_marker_count(second), Some(2));
        assert!(!surface.layers.borrow().contains_key(&first));

        // An unchanged list leaves it alone.
        reconciler.reconcile(&surface, &filters(&["iron"]), &grown, no_click());
        assert_eq!(
            reconciler.layer_by_kind.borrow().get("iron").unwrap().layer,
            second
        );

        // An empty list means no data, not an empty world.
        reconciler.reconcile(&surface, &filters(&["iron"]), &[], no_click());
        assert_eq!(surface.layer_marker_count(second), Some(2));
    }

    #[test]
    fn unknown_categories_are_skipped_without_failing_the_rest() {
        let surface = MockSurface::new();
        let reconciler: LayerReconciler<MockSurface> = LayerReconciler::new();
        let markers = vec![marker("m1", "iron", 9000.0, 4000.0)];

        reconciler.reconcile(
            &surface,
            &filters(&["definitely_not_registered", "iron"]),
            &markers,
            no_click(),
        );

        assert_eq!(reconciler.layer_count(), 1);
        assert!(reconciler.layer_by_kind.borrow().contains_key("iron"));
    }

    #[test]
    fn reconcile_waits_for_the_marker_pane() {
        let surface = MockSurface::new();
        surface.marker_pane_ready.set(false);
        let reconciler: LayerReconciler<MockSurface> = LayerReconciler::new();
        let markers = vec![marker("m1", "iron", 9000.0, 4000.0)];

        reconciler.reconcile(&surface, &filters(&["iron"]), &markers, no_click());
        assert_eq!(reconciler.layer_count(), 0);

        surface.marker_pane_ready.set(true);
        reconciler.reconcile(&surface, &filters(&["iron"]), &markers, no_click());
        assert_eq!(reconciler.layer_count(), 1);
    }

    #[test]
    fn marker_clicks_report_the_record_and_its_category() {
        let surface = MockSurface::new();
        let reconciler: LayerReconciler<MockSurface> = LayerReconciler::new();
        let markers = vec![marker("m1", "iron", 9000.0, 4000.0)];

        let clicked: Rc<Cell<bool>> = Rc::new(Cell::new(false));
        let clicked_cb = clicked.clone();
        reconciler.reconcile(
            &surface,
            &filters(&["iron"]),
            &markers,
            Rc::new(move |record, category| {
                assert_eq!(record.id, "m1");
                assert_eq!(category.kind, "iron");
                clicked_cb.set(true);
            }),
        );

        let layers = surface.layers.borrow();
        let layer = layers.values().next().unwrap();
        (layer[0].on_click)();
        assert!(clicked.get());
    }
}
