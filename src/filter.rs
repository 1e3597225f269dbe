use image::{imageops, Rgb, RgbImage};

const DEFAULT_BILATERAL_RADIUS: u32 = 2;
const DEFAULT_SIGMA_COLOR: f32 = 40.0;
const DEFAULT_SIGMA_SPACE: f32 = 2.0;
const DEFAULT_BLUR_SIGMA: f32 = 0.8;

/// Pre-clustering smoothing used to suppress lossy compression artifacts.
///
/// An edge-preserving bilateral pass flattens block noise inside regions without bleeding colors across strong
/// edges, then a mild gaussian blur softens what is left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Smoothing {
    radius: u32,
    sigma_color: f32,
    sigma_space: f32,
    blur_sigma: f32,
}

impl Smoothing {
    pub fn new(radius: u32, sigma_color: f32, sigma_space: f32, blur_sigma: f32) -> Self {
        Self {
            radius,
            sigma_color,
            sigma_space,
            blur_sigma,
        }
    }

    pub fn apply(&self, image: &RgbImage) -> RgbImage {
        let filtered = bilateral(image, self.radius, self.sigma_color, self.sigma_space);

        if self.blur_sigma > 0.0 {
            imageops::blur(&filtered, self.blur_sigma)
        } else {
            filtered
        }
    }
}

impl Default for Smoothing {
    fn default() -> Self {
        Self::new(
            DEFAULT_BILATERAL_RADIUS,
            DEFAULT_SIGMA_COLOR,
            DEFAULT_SIGMA_SPACE,
            DEFAULT_BLUR_SIGMA,
        )
    }
}

fn bilateral(image: &RgbImage, radius: u32, sigma_color: f32, sigma_space: f32) -> RgbImage {
    let (width, height) = image.dimensions();

    if radius == 0 || width == 0 || height == 0 {
        return image.clone();
    }

    let color_coeff = -0.5 / (sigma_color * sigma_color);
    let space_coeff = -0.5 / (sigma_space * sigma_space);
    let radius = radius as i64;

    RgbImage::from_fn(width, height, |x, y| {
        let center = image.get_pixel(x, y).0;
        let mut sums = [0.0f32; 3];
        let mut weight_sum = 0.0f32;

        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let nx = x as i64 + dx;
                let ny = y as i64 + dy;

                if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                    continue;
                }

                let neighbour = image.get_pixel(nx as u32, ny as u32).0;
                let color_distance: f32 = center
                    .iter()
                    .zip(neighbour.iter())
                    .map(|(&a, &b)| {
                        let d = a as f32 - b as f32;
                        d * d
                    })
                    .sum();
                let space_distance = (dx * dx + dy * dy) as f32;
                let weight = (color_distance * color_coeff + space_distance * space_coeff).exp();

                for (sum, &channel) in sums.iter_mut().zip(neighbour.iter()) {
                    *sum += channel as f32 * weight;
                }

                weight_sum += weight;
            }
        }

        // the center pixel always contributes with weight 1
        Rgb(sums.map(|sum| (sum / weight_sum).round().clamp(0.0, 255.0) as u8))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_regions_stay_flat() {
        let image = RgbImage::from_pixel(16, 16, Rgb([220, 20, 20]));
        let smoothed = Smoothing::default().apply(&image);

        for pixel in smoothed.pixels() {
            let [r, g, b] = pixel.0;
            assert!((218..=222).contains(&r) && (18..=22).contains(&g) && (18..=22).contains(&b));
        }
    }

    #[test]
    fn bilateral_keeps_hard_edges() {
        let image = RgbImage::from_fn(8, 8, |x, _| if x < 4 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) });
        let filtered = bilateral(&image, 2, 40.0, 2.0);

        assert_eq!(filtered.get_pixel(3, 4).0, [0, 0, 0]);
        assert_eq!(filtered.get_pixel(4, 4).0, [255, 255, 255]);
    }
}
