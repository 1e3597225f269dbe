//! Queries over a [`CatalogStore`].
//!
//! Boolean search groups the requested tags by category: an item has to carry at least one tag of every group. Tags
//! match by exact string equality, so `color_red` never matches `color_dark_red`.
//!
//! Similarity search ranks items of the same type by how much of their color distribution differs from a reference
//! item's.

use crate::{
    catalog::{category_of, CatalogStore, ColorMap, Item, ItemId},
    error::CatalogError,
};
use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

pub const TYPE_CATEGORY: &str = "type";
pub const COMPANY_CATEGORY: &str = "company";
pub const DEFAULT_SIMILAR_LIMIT: usize = 50;

/// Distance between two color maps with nothing in common.
pub const MAX_COLOR_DISTANCE: f64 = 100.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagQuery {
    pub tags: Vec<String>,
    #[serde(default)]
    pub sort_colors: Vec<String>,
    #[serde(default)]
    pub exclusive_type: bool,
}

impl TagQuery {
    pub fn new<I, T>(tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Rank results by the summed share of these colors, highest first.
    pub fn sort_by_colors<I, T>(self, colors: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            sort_colors: colors.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    /// Require an item's `type_*` tags to be exactly the requested ones.
    pub fn exclusive_type(self, exclusive_type: bool) -> Self {
        Self { exclusive_type, ..self }
    }

    /// The requested tags grouped by category, in first-appearance order.
    pub fn groups(&self) -> IndexMap<&str, Vec<&str>> {
        let mut groups: IndexMap<&str, Vec<&str>> = IndexMap::new();

        for tag in &self.tags {
            groups.entry(category_of(tag)).or_default().push(tag);
        }

        groups
    }

    /// Whether the item passes the tag groups and the exclusive-type filter. An empty query matches nothing.
    pub fn matches(&self, item: &Item) -> bool {
        let groups = self.groups();

        if groups.is_empty() {
            return false;
        }

        let in_every_group = groups
            .values()
            .all(|group| group.iter().any(|tag| item.has_tag(tag)));

        if !in_every_group {
            return false;
        }

        match groups.get(TYPE_CATEGORY) {
            Some(requested) if self.exclusive_type => {
                let requested: BTreeSet<&str> = requested.iter().copied().collect();
                let present: BTreeSet<&str> = item.tags_in_category(TYPE_CATEGORY).collect();

                requested == present
            }
            _ => true,
        }
    }

    fn color_score(&self, item: &Item) -> f64 {
        self.sort_colors.iter().map(|color| item.color(color)).sum()
    }
}

/// Run a boolean tag query against the store.
pub fn search<S>(store: &S, query: &TagQuery) -> Result<Vec<Item>, CatalogError>
where
    S: CatalogStore + ?Sized,
{
    let results = filter_items(store.items()?, query);
    debug!(tags = ?query.tags, results = results.len(), "tag search");

    Ok(results)
}

/// Filter and optionally rank already loaded items. Ties keep their input order.
pub fn filter_items(items: Vec<Item>, query: &TagQuery) -> Vec<Item> {
    let matching = items.into_iter().filter(|item| query.matches(item));

    if query.sort_colors.is_empty() {
        return matching.collect();
    }

    let mut scored: Vec<(f64, Item)> = matching.map(|item| (query.color_score(&item), item)).collect();
    scored.sort_by(|(a, _), (b, _)| b.total_cmp(a));
    scored.into_iter().map(|(_, item)| item).collect()
}

/// Half the summed absolute difference over the union of both maps' colors: 0 for identical distributions, 100 for
/// disjoint ones. Either map being empty counts as disjoint.
pub fn color_distance(a: &ColorMap, b: &ColorMap) -> f64 {
    if a.is_empty() || b.is_empty() {
        return MAX_COLOR_DISTANCE;
    }

    let names: IndexSet<&str> = a.keys().chain(b.keys()).map(String::as_str).collect();
    let total: f64 = names
        .iter()
        .map(|name| {
            let pa = a.get(*name).copied().unwrap_or(0.0);
            let pb = b.get(*name).copied().unwrap_or(0.0);
            (pa - pb).abs()
        })
        .sum();

    (total / 2.0).clamp(0.0, MAX_COLOR_DISTANCE)
}

/// Items of the reference item's type (and brand, when asked) ordered by ascending color distance, at most `limit`
/// of them. The reference item is one of its own candidates and comes first with distance 0.
///
/// An unknown reference or one without `type_*` tags gives an empty result.
pub fn similar_by_color<S>(
    store: &S,
    reference: &ItemId,
    limit: usize,
    same_brand: bool,
) -> Result<Vec<(Item, f64)>, CatalogError>
where
    S: CatalogStore + ?Sized,
{
    let reference = match store.get(reference)? {
        Some(item) => item,
        None => {
            debug!(%reference, "similarity reference not found");
            return Ok(Vec::new());
        }
    };

    let types: Vec<&str> = reference.tags_in_category(TYPE_CATEGORY).collect();
    if types.is_empty() {
        return Ok(Vec::new());
    }

    let brands: Vec<&str> = reference.tags_in_category(COMPANY_CATEGORY).collect();

    let candidates: Vec<Item> = store
        .items()?
        .into_iter()
        .filter(|item| types.iter().any(|tag| item.has_tag(tag)))
        .filter(|item| !same_brand || brands.iter().any(|tag| item.has_tag(tag)))
        .collect();

    let mut scored: Vec<(Item, f64)> = candidates
        .into_par_iter()
        .map(|item| {
            let distance = color_distance(&reference.colors, &item.colors);
            (item, distance)
        })
        .collect();

    // the reference wins ties against items with an identical palette
    scored.sort_by(|(item_a, a), (item_b, b)| {
        a.total_cmp(b)
            .then_with(|| (item_a.id != reference.id).cmp(&(item_b.id != reference.id)))
    });
    scored.truncate(limit);

    debug!(reference = %reference.id, results = scored.len(), same_brand, "similarity search");
    Ok(scored)
}
