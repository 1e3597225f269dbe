use crate::{
    brand::BrandTable,
    catalog::{ColorMap, Item, ItemId},
    error::TagError,
    Palette, DEFAULT_CLUSTER_COUNT, DEFAULT_SEED,
};
use image::RgbImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const COLOR_TAG_PREFIX: &str = "color_";
pub const COMPANY_TAG_PREFIX: &str = "company_";

const BRIGHT_MIN_INTENSITY: f64 = 180.0;
const DARK_MAX_INTENSITY: f64 = 70.0;
const WIDE_MIN_RATIO: f64 = 1.2;
const TALL_MAX_RATIO: f64 = 0.8;

/// The tags and color percentages computed for one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageTags {
    pub tags: Vec<String>,
    pub colors: ColorMap,
}

impl ImageTags {
    /// Combine a palette with other tags. Color tags come first in palette rank, then the other tags in the given
    /// order; repeated tags keep their first position.
    pub fn from_palette<I>(palette: &Palette, other_tags: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let colors = palette.percentages();
        let mut tags: Vec<String> = Vec::new();

        let color_tags = colors.keys().map(|name| color_tag(name));
        for tag in color_tags.chain(other_tags) {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        Self { tags, colors }
    }

    pub fn into_item(self, id: ItemId) -> Item {
        Item::new(id, self.tags, self.colors)
    }
}

pub fn color_tag(name: &str) -> String {
    format!("{}{}", COLOR_TAG_PREFIX, name)
}

/// Turns cover images into item tags.
#[derive(Debug, Clone)]
pub struct Tagger {
    brands: BrandTable,
    cluster_count: usize,
    seed: u64,
    describe: bool,
}

impl Tagger {
    pub fn new(brands: BrandTable) -> Self {
        Self {
            brands,
            cluster_count: DEFAULT_CLUSTER_COUNT,
            seed: DEFAULT_SEED,
            describe: true,
        }
    }

    pub fn cluster_count(self, cluster_count: usize) -> Self {
        Self { cluster_count, ..self }
    }

    pub fn seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    /// Whether `brightness_*` and `aspect_*` tags are added.
    pub fn describe_image(self, describe: bool) -> Self {
        Self { describe, ..self }
    }

    pub fn brands(&self) -> &BrandTable {
        &self.brands
    }

    /// Decode an encoded image and tag it.
    pub fn tag_image(&self, bytes: &[u8], extra_tags: &[String]) -> Result<ImageTags, TagError> {
        let image = image::load_from_memory(bytes)?.to_rgb8();
        self.tag_rgb(&image, extra_tags)
    }

    pub fn tag_rgb(&self, image: &RgbImage, extra_tags: &[String]) -> Result<ImageTags, TagError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(TagError::EmptyImage);
        }

        let palette = Palette::from_image(image.clone())
            .cluster_count(self.cluster_count)
            .seed(self.seed)
            .generate();

        if palette.is_empty() {
            return Err(TagError::EmptyImage);
        }

        let mut other_tags = Vec::with_capacity(extra_tags.len() + 2);
        if self.describe {
            other_tags.push(format!("brightness_{}", brightness(image)));
            other_tags.push(format!("aspect_{}", aspect(image)));
        }
        other_tags.extend(extra_tags.iter().map(|tag| self.normalize_tag(tag)));

        let tags = ImageTags::from_palette(&palette, other_tags);
        debug!(tags = ?tags.tags, "tagged image");

        Ok(tags)
    }

    /// Tag many images in parallel. Images that fail are logged and left out.
    pub fn tag_batch(&self, images: &[(ItemId, Vec<u8>, Vec<String>)]) -> Vec<Item> {
        images
            .par_iter()
            .filter_map(|(id, bytes, extra_tags)| match self.tag_image(bytes, extra_tags) {
                Ok(tags) => Some(tags.into_item(id.clone())),
                Err(e) => {
                    warn!("Error generating tags for {}: {}", id, e);
                    None
                }
            })
            .collect()
    }

    fn normalize_tag(&self, tag: &str) -> String {
        match tag.strip_prefix(COMPANY_TAG_PREFIX) {
            Some(brand) => self.brands.company_tag(brand),
            None => tag.to_string(),
        }
    }
}

impl Default for Tagger {
    fn default() -> Self {
        Self::new(BrandTable::default())
    }
}

fn brightness(image: &RgbImage) -> &'static str {
    let gray = image::imageops::grayscale(image);
    let sum: u64 = gray.pixels().map(|p| p.0[0] as u64).sum();
    let mean = sum as f64 / (gray.width() as f64 * gray.height() as f64);

    if mean > BRIGHT_MIN_INTENSITY {
        "bright"
    } else if mean < DARK_MAX_INTENSITY {
        "dark"
    } else {
        "normal"
    }
}

fn aspect(image: &RgbImage) -> &'static str {
    let ratio = image.width() as f64 / image.height() as f64;

    if ratio > WIDE_MIN_RATIO {
        "wide"
    } else if ratio < TALL_MAX_RATIO {
        "tall"
    } else {
        "square"
    }
}
