// Copyright 2022 Spanfile
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Tag catalog items with the colors of their cover image, and search them.
//!
//! The pipeline runs in one direction:
//!
//! 1. [`Palette`] clusters a smoothed, downsampled image and names every cluster with [`classifier::classify`].
//! 2. [`Tagger`] turns a palette plus externally supplied tags into an item's tag list and color percentage map.
//! 3. A [`CatalogStore`] holds the items; [`search`] runs boolean tag queries and color-similarity ranking over it.
//! 4. [`Renormalizer`] pulls chosen colors toward their corpus average while keeping each item's map at 100%.
//!
//! [`CatalogService`] wraps all of the above behind the four operations exposed to clients.

pub mod brand;
pub mod catalog;
pub mod classifier;
pub mod error;
mod filter;
mod kmeans;
pub mod renormalize;
pub mod search;
pub mod service;
mod swatch;
pub mod tagger;

pub const DEFAULT_CLUSTER_COUNT: usize = 8;
pub const DEFAULT_RESIZE_IMAGE_AREA: u32 = 256 * 256;
pub const DEFAULT_SAMPLE_SIZE: u32 = 64;
pub const DEFAULT_ATTEMPTS: usize = 3;
pub const DEFAULT_MAX_ITERATIONS: usize = 20;
pub const DEFAULT_EPSILON: f32 = 1.0;
pub const DEFAULT_SEED: u64 = 0x5eed_c010;

pub use crate::{
    brand::BrandTable,
    catalog::{CatalogStore, ColorMap, InMemoryCatalog, Item, ItemId},
    error::{CatalogError, ServiceError, TagError},
    filter::Smoothing,
    renormalize::{Adjustment, Renormalizer},
    search::TagQuery,
    service::CatalogService,
    swatch::Swatch,
    tagger::{ImageTags, Tagger},
};
pub use image;
pub use palette;

use image::{imageops::FilterType, RgbImage};
use kmeans::KMeans;
use palette::Srgb;
use tracing::debug;

/// The ranked colors of one image, most prominent first.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Palette {
    swatches: Vec<Swatch>,
}

#[derive(Debug, Clone)]
pub struct PaletteBuilder {
    image: RgbImage,
    cluster_count: usize,
    resize_area: u32,
    sample_size: u32,
    attempts: usize,
    max_iterations: usize,
    epsilon: f32,
    seed: u64,
    smoothing: Option<Smoothing>,
}

impl Palette {
    pub fn from_image(image: RgbImage) -> PaletteBuilder {
        PaletteBuilder::from_image(image)
    }

    /// Every non-empty cluster, ordered by descending share. Several swatches may carry the same name.
    pub fn swatches(&self) -> &[Swatch] {
        &self.swatches
    }

    /// Distinct color names in rank order.
    pub fn color_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();

        for swatch in &self.swatches {
            if !names.contains(&swatch.name()) {
                names.push(swatch.name());
            }
        }

        names
    }

    /// Color name to percentage, summing the shares of clusters that were classified to the same name. Entries keep
    /// the rank of the first swatch carrying the name.
    pub fn percentages(&self) -> ColorMap {
        let mut map = ColorMap::new();

        for swatch in &self.swatches {
            *map.entry(swatch.name().to_string()).or_insert(0.0) += swatch.percentage();
        }

        map
    }

    pub fn most_prominent_color(&self) -> Option<(u8, u8, u8)> {
        self.swatches.first().map(|swatch| swatch.rgb())
    }

    pub fn is_empty(&self) -> bool {
        self.swatches.is_empty()
    }
}

impl PaletteBuilder {
    pub fn from_image(image: RgbImage) -> Self {
        Self {
            image,
            cluster_count: DEFAULT_CLUSTER_COUNT,
            resize_area: DEFAULT_RESIZE_IMAGE_AREA,
            sample_size: DEFAULT_SAMPLE_SIZE,
            attempts: DEFAULT_ATTEMPTS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            epsilon: DEFAULT_EPSILON,
            seed: DEFAULT_SEED,
            smoothing: Some(Smoothing::default()),
        }
    }

    pub fn cluster_count(self, cluster_count: usize) -> Self {
        Self { cluster_count, ..self }
    }

    /// Images larger than this area are shrunk before smoothing. Zero disables it.
    pub fn resize_image_area(self, resize_area: u32) -> Self {
        Self { resize_area, ..self }
    }

    /// Side length of the square image the clustering runs on. Zero clusters the smoothed image as is.
    pub fn sample_size(self, sample_size: u32) -> Self {
        Self { sample_size, ..self }
    }

    pub fn attempts(self, attempts: usize) -> Self {
        Self { attempts, ..self }
    }

    pub fn max_iterations(self, max_iterations: usize) -> Self {
        Self { max_iterations, ..self }
    }

    pub fn epsilon(self, epsilon: f32) -> Self {
        Self { epsilon, ..self }
    }

    pub fn seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    pub fn smoothing(self, smoothing: Smoothing) -> Self {
        Self {
            smoothing: Some(smoothing),
            ..self
        }
    }

    pub fn clear_smoothing(self) -> Self {
        Self {
            smoothing: None,
            ..self
        }
    }

    pub fn generate(mut self) -> Palette {
        if self.image.width() == 0 || self.image.height() == 0 {
            return Palette { swatches: Vec::new() };
        }

        self.scale_image_down();

        if let Some(smoothing) = self.smoothing {
            self.image = smoothing.apply(&self.image);
        }

        if self.sample_size > 0 {
            self.image = image::imageops::resize(&self.image, self.sample_size, self.sample_size, FilterType::Triangle);
        }

        let pixels: Vec<Srgb<u8>> = self
            .image
            .pixels()
            .map(|pixel| Srgb::from(pixel.0))
            .collect();
        let total = pixels.len() as u32;

        let clustering = KMeans::new(
            self.cluster_count,
            self.attempts,
            self.max_iterations,
            self.epsilon,
            self.seed,
        )
        .run(&pixels);

        let mut swatches: Vec<Swatch> = clustering
            .centroids
            .iter()
            .zip(&clustering.counts)
            .filter(|(_, &count)| count > 0)
            .map(|(centroid, &count)| Swatch::new(centroid.into_components(), count, total))
            .collect();

        // stable, so equally sized clusters keep their clustering order
        swatches.sort_by(|a, b| b.population().cmp(&a.population()));

        debug!(
            pixels = total,
            clusters = swatches.len(),
            "extracted palette {:?}",
            swatches.iter().map(|s| s.name()).collect::<Vec<_>>()
        );

        Palette { swatches }
    }

    fn scale_image_down(&mut self) -> bool {
        let (width, height) = self.image.dimensions();
        let scale_ratio = scale_ratio(width, height, self.resize_area);

        if scale_ratio > 0.0 {
            self.image = image::imageops::resize(
                &self.image,
                (width as f32 * scale_ratio).ceil() as u32,
                (height as f32 * scale_ratio).ceil() as u32,
                FilterType::Nearest,
            );

            true
        } else {
            false
        }
    }
}

/// The factor that brings `width` × `height` down to `resize_area` pixels, or 0 when no downscale is needed.
fn scale_ratio(width: u32, height: u32, resize_area: u32) -> f32 {
    let area = width as u64 * height as u64;

    if resize_area > 0 && area > resize_area as u64 {
        (resize_area as f64 / area as f64).sqrt() as f32
    } else {
        0.0
    }
}
