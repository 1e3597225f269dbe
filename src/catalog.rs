use crate::error::CatalogError;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::{
    fmt,
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
    sync::RwLock,
};
use tracing::{debug, info};

/// Separator between a tag's category and its value.
pub const CATEGORY_SEPARATOR: char = '_';
/// Category of tags without a separator.
pub const MISC_CATEGORY: &str = "misc";

/// Color name to percentage. Iteration follows insertion order, which for freshly tagged items is palette rank.
pub type ColorMap = IndexMap<String, f64>;

/// Opaque, stable item identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A catalog item: its tags and the color composition of its cover image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "lenient_colors")]
    pub colors: ColorMap,
}

impl Item {
    pub fn new(id: ItemId, tags: Vec<String>, colors: ColorMap) -> Self {
        Self { id, tags, colors }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Tags whose category is `category`, in tag order.
    pub fn tags_in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.tags
            .iter()
            .map(String::as_str)
            .filter(move |tag| category_of(tag) == category)
    }

    /// The item's share of a color, zero when absent.
    pub fn color(&self, name: &str) -> f64 {
        self.colors.get(name).copied().unwrap_or(0.0)
    }
}

/// The category of a tag: everything before its first separator, or [`MISC_CATEGORY`].
pub fn category_of(tag: &str) -> &str {
    match tag.split_once(CATEGORY_SEPARATOR) {
        Some((category, _)) => category,
        None => MISC_CATEGORY,
    }
}

// anything that is not a map of non-negative numbers counts as no color data
fn lenient_colors<'de, D>(deserializer: D) -> Result<ColorMap, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;

    let map = match value {
        serde_json::Value::Object(map) => map,
        _ => return Ok(ColorMap::new()),
    };

    let mut colors = ColorMap::with_capacity(map.len());
    for (name, percentage) in map {
        match percentage.as_f64() {
            Some(p) if p.is_finite() && p >= 0.0 => {
                colors.insert(name, p);
            }
            _ => return Ok(ColorMap::new()),
        }
    }

    Ok(colors)
}

/// Storage for catalog items.
///
/// Items are read as owned snapshots. The only writes are a wholesale replace ([`CatalogStore::upsert`]) and
/// [`CatalogStore::apply_adjustment`], which swaps an item's color map and, optionally, its tags in one step so no
/// reader sees one without the other.
pub trait CatalogStore: Send + Sync {
    /// Store an item, replacing any previous record with the same id.
    fn upsert(&self, item: Item) -> Result<(), CatalogError>;

    fn get(&self, id: &ItemId) -> Result<Option<Item>, CatalogError>;

    /// Every item, in insertion order.
    fn items(&self) -> Result<Vec<Item>, CatalogError>;

    /// Replace an item's colors, and its tags when given, atomically.
    fn apply_adjustment(&self, id: &ItemId, colors: ColorMap, tags: Option<Vec<String>>) -> Result<(), CatalogError>;
}

/// In-memory catalog with JSON snapshot support.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    items: RwLock<IndexMap<ItemId, Item>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: impl IntoIterator<Item = Item>) -> Self {
        Self {
            items: RwLock::new(items.into_iter().map(|item| (item.id.clone(), item)).collect()),
        }
    }

    /// Load a snapshot written by [`InMemoryCatalog::save_json`]. A missing file is an empty catalog.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();

        if !path.exists() {
            debug!("No catalog at {}, starting empty", path.display());
            return Ok(Self::new());
        }

        let reader = BufReader::new(File::open(path)?);
        let items: Vec<Item> = serde_json::from_reader(reader)?;

        info!("Loaded {} items from {}", items.len(), path.display());
        Ok(Self::from_items(items))
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<(), CatalogError> {
        let items = self.items()?;
        let writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer_pretty(writer, &items)?;

        debug!("Saved {} items to {}", items.len(), path.as_ref().display());
        Ok(())
    }

    pub fn len(&self) -> Result<usize, CatalogError> {
        Ok(self.items.read().map_err(|_| CatalogError::Poisoned)?.len())
    }

    pub fn is_empty(&self) -> Result<bool, CatalogError> {
        Ok(self.len()? == 0)
    }
}

impl CatalogStore for InMemoryCatalog {
    fn upsert(&self, item: Item) -> Result<(), CatalogError> {
        let mut items = self.items.write().map_err(|_| CatalogError::Poisoned)?;
        items.insert(item.id.clone(), item);
        Ok(())
    }

    fn get(&self, id: &ItemId) -> Result<Option<Item>, CatalogError> {
        let items = self.items.read().map_err(|_| CatalogError::Poisoned)?;
        Ok(items.get(id).cloned())
    }

    fn items(&self) -> Result<Vec<Item>, CatalogError> {
        let items = self.items.read().map_err(|_| CatalogError::Poisoned)?;
        Ok(items.values().cloned().collect())
    }

    fn apply_adjustment(&self, id: &ItemId, colors: ColorMap, tags: Option<Vec<String>>) -> Result<(), CatalogError> {
        let mut items = self.items.write().map_err(|_| CatalogError::Poisoned)?;
        let item = items
            .get_mut(id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;

        item.colors = colors;
        if let Some(tags) = tags {
            item.tags = tags;
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn item(id: &str, tags: &[&str], colors: &[(&str, f64)]) -> Item {
        Item::new(
            ItemId::new(id),
            tags.iter().map(|t| t.to_string()).collect(),
            colors.iter().map(|(n, p)| (n.to_string(), *p)).collect(),
        )
    }

    #[test]
    fn category_is_the_prefix_before_the_first_separator() {
        assert_eq!(category_of("color_red"), "color");
        assert_eq!(category_of("color_dark_red"), "color");
        assert_eq!(category_of("type_hoodie"), "type");
        assert_eq!(category_of("vintage"), MISC_CATEGORY);
    }

    #[test]
    fn tags_in_category_filters_by_prefix() {
        let item = item("a", &["type_hoodie", "color_red", "type_jacket", "vintage"], &[]);

        assert_eq!(item.tags_in_category("type").collect::<Vec<_>>(), vec!["type_hoodie", "type_jacket"]);
        assert_eq!(item.tags_in_category("misc").collect::<Vec<_>>(), vec!["vintage"]);
    }

    #[test]
    fn malformed_colors_deserialize_as_empty() {
        let broken: Item = serde_json::from_str(r#"{"id": "a", "tags": ["x"], "colors": "oops"}"#).unwrap();
        let negative: Item = serde_json::from_str(r#"{"id": "b", "colors": {"red": -5}}"#).unwrap();
        let mixed: Item = serde_json::from_str(r#"{"id": "c", "colors": {"red": 50, "blue": "half"}}"#).unwrap();
        let missing: Item = serde_json::from_str(r#"{"id": "d", "tags": []}"#).unwrap();

        assert!(broken.colors.is_empty());
        assert!(negative.colors.is_empty());
        assert!(mixed.colors.is_empty());
        assert!(missing.colors.is_empty());
        assert_eq!(broken.tags, vec!["x".to_string()]);
    }

    #[test]
    fn empty_colors_serialize_as_an_object() {
        let json = serde_json::to_value(item("a", &[], &[])).unwrap();
        assert_eq!(json["colors"], serde_json::json!({}));
    }

    #[test]
    fn upsert_replaces_wholesale_and_keeps_position() {
        let catalog = InMemoryCatalog::new();
        catalog.upsert(item("a", &["color_red"], &[("red", 100.0)])).unwrap();
        catalog.upsert(item("b", &["color_blue"], &[("blue", 100.0)])).unwrap();
        catalog.upsert(item("a", &["color_green"], &[("green", 100.0)])).unwrap();

        let items = catalog.items().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], item("a", &["color_green"], &[("green", 100.0)]));
        assert_eq!(items[1].id, ItemId::new("b"));
    }

    #[test]
    fn apply_adjustment_swaps_colors_and_tags_together() {
        let catalog = InMemoryCatalog::from_items([item("a", &["color_grey", "color_red"], &[("grey", 30.0), ("red", 70.0)])]);
        let id = ItemId::new("a");

        let colors: ColorMap = [("red".to_string(), 100.0)].into_iter().collect();
        catalog
            .apply_adjustment(&id, colors, Some(vec!["color_red".to_string()]))
            .unwrap();

        assert_eq!(catalog.get(&id).unwrap(), Some(item("a", &["color_red"], &[("red", 100.0)])));
    }

    #[test]
    fn apply_adjustment_on_unknown_item_fails() {
        let catalog = InMemoryCatalog::new();

        assert!(matches!(
            catalog.apply_adjustment(&ItemId::new("nope"), ColorMap::new(), None),
            Err(CatalogError::NotFound(_))
        ));
    }

    #[test]
    fn snapshot_survives_a_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let catalog = InMemoryCatalog::from_items([
            item("a", &["type_hoodie", "color_red"], &[("red", 80.0), ("white", 20.0)]),
            item("b", &["type_tee"], &[]),
        ]);

        catalog.save_json(&path).unwrap();
        let loaded = InMemoryCatalog::load_json(&path).unwrap();

        assert_eq!(loaded.items().unwrap(), catalog.items().unwrap());
    }

    #[test]
    fn missing_snapshot_is_an_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = InMemoryCatalog::load_json(dir.path().join("absent.json")).unwrap();

        assert!(catalog.is_empty().unwrap());
    }
}
