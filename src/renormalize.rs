//! Corpus-wide color renormalization.
//!
//! Some colors show up in nearly every photo (studio backdrops, grey floors) and drown out the colors of the item
//! itself. [`Renormalizer::adjust`] subtracts each target color's corpus average from every item carrying it, drops
//! the color (and its `color_*` tag) where nothing meaningful is left, and rescales the remaining colors so every
//! item's map sums to 100 again.
//!
//! The job runs in two passes. The first computes the averages over the whole corpus and must finish before the
//! second rewrites any item.

use crate::{
    catalog::{CatalogStore, ColorMap, Item, ItemId},
    error::CatalogError,
    tagger::color_tag,
};
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const DEFAULT_DEAD_ZONE: f64 = 0.01;
pub const TOTAL_PERCENTAGE: f64 = 100.0;
pub const SUM_TOLERANCE: f64 = 0.01;

/// What a renormalization run did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    /// Corpus average of every target color, keyed by the name it was requested with.
    pub averages: IndexMap<String, f64>,
    pub items_updated: usize,
}

/// The new state of one item after adjustment.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemAdjustment {
    pub colors: ColorMap,
    /// The new tag list, only when a `color_*` tag was removed.
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct Renormalizer {
    dead_zone: f64,
    synonyms: Vec<(String, String)>,
}

impl Renormalizer {
    pub fn new() -> Self {
        Self {
            dead_zone: DEFAULT_DEAD_ZONE,
            synonyms: vec![("grey".to_string(), "gray".to_string())],
        }
    }

    /// Adjusted values at or below this are dropped, and changes smaller than it leave an item untouched.
    pub fn dead_zone(self, dead_zone: f64) -> Self {
        Self { dead_zone, ..self }
    }

    /// Treat two color names as the same logical color.
    pub fn synonym(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.synonyms.push((a.into(), b.into()));
        self
    }

    pub fn clear_synonyms(self) -> Self {
        Self {
            synonyms: Vec::new(),
            ..self
        }
    }

    /// Every name that stands for the same logical color as `name`, `name` first.
    pub fn aliases<'a>(&'a self, name: &'a str) -> Vec<&'a str> {
        let mut aliases = vec![name];

        for (a, b) in &self.synonyms {
            let other = if a == name {
                b
            } else if b == name {
                a
            } else {
                continue;
            };

            if !aliases.contains(&other.as_str()) {
                aliases.push(other);
            }
        }

        aliases
    }

    /// Run both passes over the store. Safe on an empty store.
    pub fn adjust<S>(&self, store: &S, targets: &[String]) -> Result<Adjustment, CatalogError>
    where
        S: CatalogStore + ?Sized,
    {
        let items = store.items()?;
        let averages = self.averages(&items, targets);

        info!(?averages, items = items.len(), "renormalizing colors");

        let updates: Vec<(ItemId, ItemAdjustment)> = items
            .par_iter()
            .filter_map(|item| {
                self.adjust_item(item, &averages)
                    .map(|adjustment| (item.id.clone(), adjustment))
            })
            .collect();

        updates
            .par_iter()
            .map(|(id, adjustment)| store.apply_adjustment(id, adjustment.colors.clone(), adjustment.tags.clone()))
            .collect::<Result<Vec<()>, CatalogError>>()?;

        info!(items_updated = updates.len(), "renormalization finished");

        Ok(Adjustment {
            averages,
            items_updated: updates.len(),
        })
    }

    /// Pass one: the mean share of every target color over the items that have it, zero when none do.
    ///
    /// A target that is a synonym of an earlier target is skipped.
    pub fn averages(&self, items: &[Item], targets: &[String]) -> IndexMap<String, f64> {
        let mut averages = IndexMap::new();

        for target in targets {
            let aliases = self.aliases(target);
            if averages.keys().any(|seen: &String| aliases.contains(&seen.as_str())) {
                continue;
            }

            let (sum, count) = items
                .iter()
                .filter_map(|item| logical_share(&item.colors, &aliases))
                .fold((0.0, 0usize), |(sum, count), share| (sum + share, count + 1));

            let average = if count > 0 { sum / count as f64 } else { 0.0 };
            averages.insert(target.clone(), average);
        }

        averages
    }

    /// Pass two for a single item. `None` means the item stays as it is.
    pub fn adjust_item(&self, item: &Item, averages: &IndexMap<String, f64>) -> Option<ItemAdjustment> {
        let mut colors = item.colors.clone();
        let mut target_keys: Vec<String> = Vec::new();
        let mut dropped: Vec<String> = Vec::new();
        let mut changed = false;

        for (target, &average) in averages {
            let aliases = self.aliases(target);
            let present: Vec<String> = item
                .colors
                .keys()
                .filter(|key| aliases.contains(&key.as_str()))
                .cloned()
                .collect();

            let original = match logical_share(&item.colors, &aliases) {
                Some(share) => share,
                None => continue,
            };

            target_keys.extend(present.iter().cloned());

            let adjusted = original - average;
            let (keep, rest) = present.split_at(1);

            if adjusted > self.dead_zone {
                // synonyms carried by one item collapse into the first key
                colors.insert(keep[0].clone(), adjusted);
                dropped.extend(rest.iter().cloned());
                changed |= (original - adjusted).abs() > self.dead_zone || !rest.is_empty();
            } else {
                dropped.extend(present.iter().cloned());
                changed = true;
            }
        }

        if !changed {
            return None;
        }

        for key in &dropped {
            colors.shift_remove(key);
        }

        let pre_other_sum: f64 = item
            .colors
            .iter()
            .filter(|(key, _)| !target_keys.contains(key))
            .map(|(_, share)| share)
            .sum();
        let retained_target_sum: f64 = colors
            .iter()
            .filter(|(key, _)| target_keys.contains(key))
            .map(|(_, share)| share)
            .sum();
        let budget = (TOTAL_PERCENTAGE - retained_target_sum).max(0.0);

        for (key, share) in colors.iter_mut() {
            if target_keys.contains(key) {
                continue;
            }

            *share = if pre_other_sum > 0.0 {
                *share * budget / pre_other_sum
            } else {
                0.0
            };
        }

        rescale_to_total(&mut colors);

        let dropped_tags: Vec<String> = dropped.iter().map(|key| color_tag(key)).collect();
        let tags = if item.tags.iter().any(|tag| dropped_tags.contains(tag)) {
            Some(
                item.tags
                    .iter()
                    .filter(|tag| !dropped_tags.contains(tag))
                    .cloned()
                    .collect(),
            )
        } else {
            None
        };

        debug!(item = %item.id, ?dropped, "adjusted colors");
        Some(ItemAdjustment { colors, tags })
    }
}

impl Default for Renormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// The summed share of every alias present in the map, `None` when none is.
fn logical_share(colors: &ColorMap, aliases: &[&str]) -> Option<f64> {
    let shares: Vec<f64> = aliases.iter().filter_map(|alias| colors.get(*alias).copied()).collect();

    if shares.is_empty() {
        None
    } else {
        Some(shares.iter().sum())
    }
}

fn rescale_to_total(colors: &mut ColorMap) {
    let total: f64 = colors.values().sum();

    if total > 0.0 && (total - TOTAL_PERCENTAGE).abs() > SUM_TOLERANCE {
        let factor = TOTAL_PERCENTAGE / total;
        for share in colors.values_mut() {
            *share *= factor;
        }
    }
}
