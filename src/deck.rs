//! Deck description: ordered slides plus one visual variant.
//!
//! Decks are immutable data handed to the engine by the host. They can be
//! built in code or loaded from JSON:
//!
//! ```json
//! {
//!   "variant": { "name": "aurora", "render": { "bloom_scale": 1.2 } },
//!   "slides": [
//!     { "behavior": "text", "title": "Hello", "word": "HELLO",
//!       "particle_color": "#7fd4ff", "background_color": "#03040a",
//!       "fx": { "bloom_strength": 1.1, "trails_damp": 0.9 } }
//!   ]
//! }
//! ```

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::behavior::Behavior;
use crate::error::DeckError;

/// An RGB color, written as `"#rrggbb"` in deck files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub Vec3);

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self(Vec3::new(r, g, b))
    }

    pub fn to_array(self) -> [f32; 3] {
        self.0.to_array()
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let hex = value.trim().trim_start_matches('#');
        if hex.len() != 6 {
            return Err(format!("expected #rrggbb color, got `{}`", value));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map(|v| v as f32 / 255.0)
                .map_err(|e| format!("bad color `{}`: {}", value, e))
        };
        Ok(Rgb(Vec3::new(channel(0..2)?, channel(2..4)?, channel(4..6)?)))
    }
}

impl From<Rgb> for String {
    fn from(c: Rgb) -> Self {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", q(c.0.x), q(c.0.y), q(c.0.z))
    }
}

/// Post-processing preset carried by a slide.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FxPreset {
    pub bloom_strength: f32,
    pub bloom_radius: f32,
    pub bloom_threshold: f32,
    /// Fraction of the previous frame kept by the trail pass. `1.0` turns
    /// trails off.
    pub trails_damp: f32,
}

impl Default for FxPreset {
    fn default() -> Self {
        Self {
            bloom_strength: 0.8,
            bloom_radius: 0.4,
            bloom_threshold: 0.2,
            trails_damp: 1.0,
        }
    }
}

/// One slide of a deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slide {
    /// Behavior this slide runs.
    #[serde(alias = "id")]
    pub behavior: Behavior,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    /// Word for `text` slides; falls back to the title.
    #[serde(default)]
    pub word: Option<String>,
    #[serde(default = "default_particle_color")]
    pub particle_color: Rgb,
    #[serde(default = "default_background_color")]
    pub background_color: Rgb,
    #[serde(default)]
    pub fx: FxPreset,
}

fn default_particle_color() -> Rgb {
    Rgb::new(0.55, 0.8, 1.0)
}

fn default_background_color() -> Rgb {
    Rgb::new(0.01, 0.012, 0.03)
}

impl Slide {
    pub fn new(behavior: Behavior, title: impl Into<String>) -> Self {
        Self {
            behavior,
            title: title.into(),
            subtitle: String::new(),
            word: None,
            particle_color: default_particle_color(),
            background_color: default_background_color(),
            fx: FxPreset::default(),
        }
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = subtitle.into();
        self
    }

    pub fn with_word(mut self, word: impl Into<String>) -> Self {
        self.word = Some(word.into());
        self
    }

    pub fn with_colors(mut self, particle: Rgb, background: Rgb) -> Self {
        self.particle_color = particle;
        self.background_color = background;
        self
    }

    pub fn with_fx(mut self, fx: FxPreset) -> Self {
        self.fx = fx;
        self
    }

    /// Word a text slide spells.
    pub fn text_word(&self) -> &str {
        self.word.as_deref().unwrap_or(&self.title)
    }
}

/// How particles and overlays are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayStyle {
    /// Soft round glow.
    #[default]
    Glow,
    /// Smaller, crisper points.
    Crisp,
}

/// Host chrome drawn around the deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChromeStyle {
    #[default]
    Minimal,
    Full,
    Hidden,
}

/// Rendering half of a variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderStyle {
    pub overlay: OverlayStyle,
    /// Brightness gain applied by the twinkle signal.
    pub sparkle: f32,
    /// Overall particle opacity.
    pub opacity: f32,
    /// Base point size multiplier.
    pub point_scale: f32,
    pub bloom_scale: f32,
    pub trails_scale: f32,
    pub constellation: bool,
    /// Constellation line opacity relative to particles.
    pub line_opacity: f32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            overlay: OverlayStyle::Glow,
            sparkle: 0.6,
            opacity: 0.9,
            point_scale: 1.0,
            bloom_scale: 1.0,
            trails_scale: 1.0,
            constellation: true,
            line_opacity: 0.25,
        }
    }
}

/// Per-deck skin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantConfig {
    pub name: String,
    pub render: RenderStyle,
    pub chrome: ChromeStyle,
}

impl Default for VariantConfig {
    fn default() -> Self {
        Self::aurora()
    }
}

impl VariantConfig {
    /// Bright, glowy, constellation lines on.
    pub fn aurora() -> Self {
        Self {
            name: "aurora".into(),
            render: RenderStyle {
                sparkle: 0.8,
                bloom_scale: 1.2,
                ..RenderStyle::default()
            },
            chrome: ChromeStyle::Minimal,
        }
    }

    /// Dim, long trails, no lines.
    pub fn noir() -> Self {
        Self {
            name: "noir".into(),
            render: RenderStyle {
                overlay: OverlayStyle::Crisp,
                sparkle: 0.3,
                opacity: 0.75,
                point_scale: 0.8,
                bloom_scale: 0.6,
                trails_scale: 0.95,
                constellation: false,
                line_opacity: 0.0,
            },
            chrome: ChromeStyle::Full,
        }
    }

    /// No post effects at all.
    pub fn minimal() -> Self {
        Self {
            name: "minimal".into(),
            render: RenderStyle {
                overlay: OverlayStyle::Crisp,
                sparkle: 0.2,
                bloom_scale: 0.0,
                trails_scale: 0.0,
                constellation: false,
                ..RenderStyle::default()
            },
            chrome: ChromeStyle::Hidden,
        }
    }
}

/// An ordered list of slides plus one variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deck {
    pub slides: Vec<Slide>,
    #[serde(default)]
    pub variant: VariantConfig,
}

impl Deck {
    /// Build and validate a deck.
    pub fn new(slides: Vec<Slide>, variant: VariantConfig) -> Result<Self, DeckError> {
        let deck = Self { slides, variant };
        deck.validate()?;
        Ok(deck)
    }

    pub fn from_json_str(json: &str) -> Result<Self, DeckError> {
        let deck: Deck = serde_json::from_str(json)?;
        deck.validate()?;
        Ok(deck)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DeckError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn slide(&self, index: usize) -> Option<&Slide> {
        self.slides.get(index)
    }

    /// Check invariants the engine relies on.
    pub fn validate(&self) -> Result<(), DeckError> {
        if self.slides.is_empty() {
            return Err(DeckError::Empty);
        }
        for (index, slide) in self.slides.iter().enumerate() {
            let value = slide.fx.trails_damp;
            if !(0.0..=1.0).contains(&value) {
                return Err(DeckError::TrailsDampOutOfRange { index, value });
            }
        }
        let render = &self.variant.render;
        for (field, value) in [
            ("sparkle", render.sparkle),
            ("opacity", render.opacity),
            ("point_scale", render.point_scale),
            ("bloom_scale", render.bloom_scale),
            ("trails_scale", render.trails_scale),
            ("line_opacity", render.line_opacity),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(DeckError::InvalidScale { field, value });
            }
        }
        Ok(())
    }

    /// Built-in deck touching every behavior once.
    pub fn showcase() -> Self {
        let ink = Rgb::new(0.01, 0.012, 0.03);
        let fx = |bloom_strength: f32, trails_damp: f32| FxPreset {
            bloom_strength,
            trails_damp,
            ..FxPreset::default()
        };
        let slides = vec![
            Slide::new(Behavior::Text, "Choreo")
                .with_subtitle("particles, arranged")
                .with_word("CHOREO")
                .with_colors(Rgb::new(0.55, 0.85, 1.0), ink)
                .with_fx(fx(1.1, 1.0)),
            Slide::new(Behavior::Scatter, "Scatter")
                .with_subtitle("a quiet cloud")
                .with_colors(Rgb::new(0.8, 0.8, 1.0), ink),
            Slide::new(Behavior::CurlFlow, "Curl flow")
                .with_subtitle("turbulence without noise")
                .with_colors(Rgb::new(0.4, 1.0, 0.8), ink)
                .with_fx(fx(0.9, 0.9)),
            Slide::new(Behavior::Orbitals, "Orbitals")
                .with_subtitle("outer rings run faster")
                .with_colors(Rgb::new(1.0, 0.75, 0.35), ink)
                .with_fx(fx(1.0, 0.88)),
            Slide::new(Behavior::GravityWells, "Gravity wells")
                .with_subtitle("three points of pull")
                .with_colors(Rgb::new(0.7, 0.55, 1.0), ink)
                .with_fx(fx(1.2, 0.92)),
            Slide::new(Behavior::RepulsionLattice, "Repulsion")
                .with_subtitle("a lattice under pressure")
                .with_colors(Rgb::new(0.5, 0.9, 1.0), ink),
            Slide::new(Behavior::WaveSurface, "Wave surface")
                .with_subtitle("two traveling waves")
                .with_colors(Rgb::new(0.3, 0.7, 1.0), ink)
                .with_fx(fx(0.7, 1.0)),
            Slide::new(Behavior::VortexColumn, "Vortex")
                .with_subtitle("a rotating column")
                .with_colors(Rgb::new(0.95, 0.5, 0.9), ink)
                .with_fx(fx(1.0, 0.85)),
            Slide::new(Behavior::Burst, "Burst")
                .with_subtitle("periodic release")
                .with_colors(Rgb::new(1.0, 0.6, 0.3), ink)
                .with_fx(fx(1.4, 0.8)),
            Slide::new(Behavior::Flock, "Flock")
                .with_subtitle("separation, alignment, cohesion")
                .with_colors(Rgb::new(0.6, 1.0, 0.6), ink)
                .with_fx(fx(0.8, 0.9)),
            Slide::new(Behavior::StrangeAttractor, "Lorenz")
                .with_subtitle("sigma 10, rho 28, beta 8/3")
                .with_colors(Rgb::new(1.0, 0.45, 0.45), ink)
                .with_fx(fx(1.1, 0.9)),
            Slide::new(Behavior::GlitchGrid, "Glitch")
                .with_subtitle("digital noise")
                .with_colors(Rgb::new(0.3, 1.0, 0.9), ink)
                .with_fx(fx(0.9, 1.0)),
            Slide::new(Behavior::Singularity, "Singularity")
                .with_subtitle("everything falls in")
                .with_colors(Rgb::new(1.0, 0.85, 0.6), ink)
                .with_fx(fx(1.5, 0.86)),
        ];
        Self {
            slides,
            variant: VariantConfig::aurora(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_showcase_is_valid_and_complete() {
        let deck = Deck::showcase();
        deck.validate().unwrap();
        for b in Behavior::ALL {
            assert!(deck.slides.iter().any(|s| s.behavior == b), "{} missing", b);
        }
    }

    #[test]
    fn test_parse_minimal_json() {
        let deck = Deck::from_json_str(
            r##"{ "slides": [ { "id": "flock", "title": "Birds",
                 "particle_color": "#ff8000" } ] }"##,
        )
        .unwrap();
        assert_eq!(deck.len(), 1);
        assert_eq!(deck.slides[0].behavior, Behavior::Flock);
        assert_eq!(deck.slides[0].fx, FxPreset::default());
        let c = deck.slides[0].particle_color.0;
        assert!((c.x - 1.0).abs() < 1e-6 && (c.y - 128.0 / 255.0).abs() < 1e-6 && c.z == 0.0);
        assert_eq!(deck.variant, VariantConfig::aurora());
    }

    #[test]
    fn test_rejects_empty_deck() {
        assert!(matches!(
            Deck::from_json_str(r#"{ "slides": [] }"#),
            Err(DeckError::Empty)
        ));
    }

    #[test]
    fn test_rejects_trails_damp_out_of_range() {
        let json = r#"{ "slides": [ { "behavior": "burst", "title": "x",
            "fx": { "trails_damp": 1.5 } } ] }"#;
        assert!(matches!(
            Deck::from_json_str(json),
            Err(DeckError::TrailsDampOutOfRange { index: 0, .. })
        ));
    }

    #[test]
    fn test_rejects_negative_scale() {
        let mut variant = VariantConfig::aurora();
        variant.render.bloom_scale = -1.0;
        let result = Deck::new(vec![Slide::new(Behavior::Scatter, "a")], variant);
        assert!(matches!(result, Err(DeckError::InvalidScale { field: "bloom_scale", .. })));
    }

    #[test]
    fn test_bad_color() {
        let json = r##"{ "slides": [ { "behavior": "burst", "title": "x",
            "particle_color": "#12" } ] }"##;
        assert!(matches!(Deck::from_json_str(json), Err(DeckError::Parse(_))));
    }

    #[test]
    fn test_color_string_roundtrip() {
        let s: String = Rgb::new(1.0, 0.0, 0.5).into();
        assert_eq!(s, "#ff0080");
    }

    #[test]
    fn test_text_word_falls_back_to_title() {
        let slide = Slide::new(Behavior::Text, "Hello");
        assert_eq!(slide.text_word(), "Hello");
        assert_eq!(slide.with_word("BYE").text_word(), "BYE");
    }
}
