//! Static category registry: every marker type a layer can be built
//! for, with its display metadata. Marker types not listed here are a
//! soft error at reconciliation time, never a hard failure.

/// Display metadata for one marker category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryItem {
    /// Marker type identifier, matching `MarkerRecord::kind`.
    pub kind: &'static str,
    pub title: &'static str,
    pub icon_url: &'static str,
}

pub const CATEGORIES: &[CategoryItem] = &[
    CategoryItem {
        kind: "iron",
        title: "Iron Vein",
        icon_url: "/pois/iron.webp",
    },
    CategoryItem {
        kind: "silver",
        title: "Silver Vein",
        icon_url: "/pois/silver.webp",
    },
    CategoryItem {
        kind: "gold",
        title: "Gold Vein",
        icon_url: "/pois/gold.webp",
    },
    CategoryItem {
        kind: "orichalcum",
        title: "Orichalcum Vein",
        icon_url: "/pois/orichalcum.webp",
    },
    CategoryItem {
        kind: "saltpeter",
        title: "Saltpeter",
        icon_url: "/pois/saltpeter.webp",
    },
    CategoryItem {
        kind: "ironwood",
        title: "Ironwood Tree",
        icon_url: "/pois/ironwood.webp",
    },
    CategoryItem {
        kind: "wyrdwood",
        title: "Wyrdwood Tree",
        icon_url: "/pois/wyrdwood.webp",
    },
    CategoryItem {
        kind: "azoth_spring",
        title: "Azoth Spring",
        icon_url: "/pois/azoth_spring.webp",
    },
    CategoryItem {
        kind: "hemp",
        title: "Hemp Plant",
        icon_url: "/pois/hemp.webp",
    },
    CategoryItem {
        kind: "herb",
        title: "Herb Garden",
        icon_url: "/pois/herb.webp",
    },
    CategoryItem {
        kind: "fish_hotspot",
        title: "Fishing Hotspot",
        icon_url: "/pois/fish_hotspot.webp",
    },
    CategoryItem {
        kind: "chest",
        title: "Supply Chest",
        icon_url: "/pois/chest.webp",
    },
    CategoryItem {
        kind: "lore_page",
        title: "Lore Page",
        icon_url: "/pois/lore_page.webp",
    },
];

pub fn find_category(kind: &str) -> Option<&'static CategoryItem> {
    CATEGORIES.iter().find(|category| category.kind == kind)
}

/// Every known type; the default active filter set.
pub fn default_filters() -> Vec<String> {
    CATEGORIES
        .iter()
        .map(|category| category.kind.to_string())
        .collect()
}

/// Case-insensitive substring match over category titles, used by the
/// filter sidebar search box.
pub fn search_categories(query: &str) -> impl Fn(&CategoryItem) -> bool + '_ {
    move |category: &CategoryItem| {
        query.is_empty()
            || category
                .title
                .to_lowercase()
                .contains(&query.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lookup_by_kind() {
        assert_eq!(find_category("iron").map(|c| c.title), Some("Iron Vein"));
        assert_eq!(find_category("unknown_kind"), None);
    }

    #[test]
    fn default_filters_cover_every_category() {
        let defaults = default_filters();
        assert_eq!(defaults.len(), CATEGORIES.len());
        assert!(defaults.iter().any(|kind| kind == "wyrdwood"));
    }

    #[test]
    fn search_matches_titles_case_insensitively() {
        let matches: Vec<_> = CATEGORIES
            .iter()
            .filter(|c| search_categories("vein")(c))
            .map(|c| c.kind)
            .collect();
        assert_eq!(matches, vec!["iron", "silver", "gold", "orichalcum"]);
        assert!(CATEGORIES.iter().all(|c| search_categories("")(c)));
    }
}
