use serde::Serialize;

/// One cluster of an image's palette: its centroid, how many sampled pixels it holds, its share of all sampled
/// pixels in percent and the centroid's classified name.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Swatch {
    red: u8,
    green: u8,
    blue: u8,
    population: u32,
    percentage: f64,
    name: &'static str,
}

impl Swatch {
    pub fn new((red, green, blue): (u8, u8, u8), population: u32, total: u32) -> Swatch {
        let percentage = if total > 0 {
            population as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        Self {
            red,
            green,
            blue,
            population,
            percentage,
            name: crate::classifier::classify(palette::Srgb::new(red, green, blue)),
        }
    }

    pub fn rgb(self) -> (u8, u8, u8) {
        (self.red, self.green, self.blue)
    }

    pub fn population(self) -> u32 {
        self.population
    }

    pub fn percentage(self) -> f64 {
        self.percentage
    }

    pub fn name(self) -> &'static str {
        self.name
    }
}
