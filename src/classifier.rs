//! Mapping of a single sRGB color to a coarse, human readable name.
//!
//! Classification walks [`RULES`] top to bottom and returns the name of the first rule whose channel ranges contain
//! the color. Rules overlap on purpose: the first match wins, so neutrals and near-black/white come before saturated
//! hues and narrow ranges come before the broad ones. A color no rule accepts falls back to the nearest entry of
//! [`REFERENCE_COLORS`] by squared Euclidean distance, which makes [`classify`] total.

use palette::Srgb;

/// Any channel spread is allowed.
const ANY_SPREAD: u8 = u8::MAX;
/// Maximum difference between the largest and smallest channel for a color to count as a neutral.
const NEUTRAL_SPREAD: u8 = 20;

/// A named set of inclusive channel ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorRule {
    name: &'static str,
    // min, max
    red: (u8, u8),
    // min, max
    green: (u8, u8),
    // min, max
    blue: (u8, u8),
    max_spread: u8,
}

impl ColorRule {
    const fn new(name: &'static str, red: (u8, u8), green: (u8, u8), blue: (u8, u8)) -> Self {
        Self {
            name,
            red,
            green,
            blue,
            max_spread: ANY_SPREAD,
        }
    }

    const fn neutral(name: &'static str, range: (u8, u8)) -> Self {
        Self {
            name,
            red: range,
            green: range,
            blue: range,
            max_spread: NEUTRAL_SPREAD,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn matches(&self, (r, g, b): (u8, u8, u8)) -> bool {
        let spread = r.max(g).max(b) - r.min(g).min(b);

        within(r, self.red) && within(g, self.green) && within(b, self.blue) && spread <= self.max_spread
    }
}

fn within(value: u8, (min, max): (u8, u8)) -> bool {
    (min..=max).contains(&value)
}

/// The ordered decision list. Order is significant.
pub static RULES: &[ColorRule] = &[
    // near-black and near-white regardless of hue
    ColorRule::new("black", (0, 35), (0, 35), (0, 35)),
    ColorRule::new("white", (235, 255), (235, 255), (235, 255)),
    // neutrals
    ColorRule::neutral("charcoal", (36, 70)),
    ColorRule::neutral("dark_grey", (71, 110)),
    ColorRule::neutral("grey", (111, 160)),
    ColorRule::neutral("silver", (161, 200)),
    ColorRule::neutral("light_grey", (201, 234)),
    // off-whites
    ColorRule::new("ivory", (240, 255), (235, 255), (200, 234)),
    ColorRule::new("cream", (235, 255), (220, 245), (170, 215)),
    ColorRule::new("beige", (200, 240), (180, 225), (140, 195)),
    // earth tones
    ColorRule::new("tan", (180, 225), (140, 185), (90, 140)),
    ColorRule::new("khaki", (170, 215), (160, 205), (100, 150)),
    ColorRule::new("camel", (170, 210), (120, 160), (60, 105)),
    ColorRule::new("brown", (110, 170), (60, 110), (20, 80)),
    ColorRule::new("dark_brown", (50, 109), (25, 70), (0, 50)),
    ColorRule::new("rust", (170, 215), (60, 110), (10, 60)),
    ColorRule::new("olive", (90, 140), (90, 140), (0, 60)),
    ColorRule::new("mustard", (190, 230), (150, 190), (0, 70)),
    // reds
    ColorRule::new("maroon", (90, 140), (0, 40), (0, 50)),
    ColorRule::new("dark_red", (141, 190), (0, 40), (0, 50)),
    ColorRule::new("burgundy", (100, 150), (0, 40), (51, 90)),
    ColorRule::new("crimson", (191, 235), (0, 50), (40, 80)),
    ColorRule::new("red", (191, 255), (0, 70), (0, 60)),
    ColorRule::new("coral", (240, 255), (110, 150), (80, 120)),
    ColorRule::new("salmon", (230, 255), (140, 170), (110, 140)),
    // oranges
    ColorRule::new("dark_orange", (220, 255), (100, 150), (0, 50)),
    ColorRule::new("orange", (230, 255), (151, 190), (0, 70)),
    ColorRule::new("peach", (240, 255), (191, 225), (150, 190)),
    // yellows
    ColorRule::new("gold", (210, 255), (191, 220), (0, 80)),
    ColorRule::new("yellow", (230, 255), (221, 255), (0, 140)),
    ColorRule::new("lemon", (240, 255), (240, 255), (141, 200)),
    // greens
    ColorRule::new("dark_green", (0, 60), (60, 120), (0, 60)),
    ColorRule::new("forest_green", (20, 80), (100, 150), (20, 80)),
    ColorRule::new("green", (0, 100), (151, 255), (0, 100)),
    ColorRule::new("spring_green", (0, 100), (180, 255), (101, 169)),
    ColorRule::new("lime", (101, 200), (200, 255), (0, 100)),
    ColorRule::new("mint", (150, 210), (220, 255), (170, 230)),
    ColorRule::new("sage", (140, 180), (160, 200), (120, 160)),
    ColorRule::new("teal", (0, 60), (100, 160), (100, 160)),
    ColorRule::new("turquoise", (20, 100), (180, 230), (170, 230)),
    ColorRule::new("cyan", (0, 100), (200, 255), (200, 255)),
    // blues
    ColorRule::new("navy", (0, 40), (0, 60), (80, 150)),
    ColorRule::new("dark_blue", (0, 40), (0, 60), (151, 200)),
    ColorRule::new("royal_blue", (50, 90), (80, 130), (200, 255)),
    ColorRule::new("blue", (0, 80), (0, 120), (201, 255)),
    ColorRule::new("steel_blue", (60, 100), (110, 150), (160, 200)),
    ColorRule::new("denim", (60, 110), (90, 140), (140, 190)),
    ColorRule::new("sky_blue", (110, 170), (190, 230), (220, 255)),
    ColorRule::new("light_blue", (171, 220), (200, 235), (220, 255)),
    // purples
    ColorRule::new("indigo", (60, 100), (0, 40), (110, 160)),
    ColorRule::new("purple", (101, 160), (0, 60), (101, 180)),
    ColorRule::new("violet", (140, 200), (60, 130), (200, 255)),
    ColorRule::new("lavender", (190, 235), (170, 215), (230, 255)),
    ColorRule::new("plum", (120, 170), (60, 100), (120, 170)),
    ColorRule::new("magenta", (200, 255), (0, 80), (200, 255)),
    // pinks
    ColorRule::new("hot_pink", (230, 255), (60, 130), (150, 200)),
    ColorRule::new("pink", (230, 255), (150, 200), (180, 220)),
    ColorRule::new("light_pink", (240, 255), (201, 230), (210, 240)),
    ColorRule::new("rose", (190, 240), (80, 140), (110, 160)),
    ColorRule::new("fuchsia", (200, 255), (0, 80), (120, 199)),
];

/// Canonical colors used when no rule matches.
pub static REFERENCE_COLORS: &[(&str, (u8, u8, u8))] = &[
    ("black", (0, 0, 0)),
    ("white", (255, 255, 255)),
    ("grey", (128, 128, 128)),
    ("red", (255, 0, 0)),
    ("orange", (255, 165, 0)),
    ("yellow", (255, 255, 0)),
    ("green", (0, 128, 0)),
    ("blue", (0, 0, 255)),
    ("purple", (128, 0, 128)),
    ("brown", (165, 42, 42)),
];

/// Returns the name for the given color. Never fails.
pub fn classify(color: Srgb<u8>) -> &'static str {
    let rgb = color.into_components();
    match_rule(rgb).unwrap_or_else(|| nearest_reference(rgb))
}

/// Returns the name of the first rule accepting the color, if any.
pub fn match_rule(rgb: (u8, u8, u8)) -> Option<&'static str> {
    RULES.iter().find(|rule| rule.matches(rgb)).map(ColorRule::name)
}

/// Returns the name of the closest reference color. Ties go to the earlier entry.
pub fn nearest_reference((r, g, b): (u8, u8, u8)) -> &'static str {
    let mut best = REFERENCE_COLORS[0].0;
    let mut best_distance = u32::MAX;

    for &(name, (pr, pg, pb)) in REFERENCE_COLORS {
        let distance = squared(r, pr) + squared(g, pg) + squared(b, pb);

        if distance < best_distance {
            best = name;
            best_distance = distance;
        }
    }

    best
}

/// Every name [`classify`] can return, in rule order followed by any reference-only names.
pub fn vocabulary() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = RULES.iter().map(ColorRule::name).collect();

    for (name, _) in REFERENCE_COLORS {
        if !names.contains(name) {
            names.push(name);
        }
    }

    names
}

fn squared(a: u8, b: u8) -> u32 {
    let diff = a as i32 - b as i32;
    (diff * diff) as u32
}
