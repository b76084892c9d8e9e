//! Text silhouette sampling.
//!
//! A word is drawn with the 8x8 bitmap font into an offscreen grayscale image
//! of fixed 3:1 aspect, thresholded, and walked on a regular stride. The
//! resulting points are what `text` slides pull particles toward.

use std::collections::HashMap;
use std::sync::Arc;

use font8x8::legacy::BASIC_LEGACY;
use glam::Vec2;
use image::{GrayImage, Luma};

/// Offscreen bitmap width in pixels.
pub const BITMAP_WIDTH: u32 = 480;
/// Offscreen bitmap height in pixels.
pub const BITMAP_HEIGHT: u32 = 160;

const LIT: u8 = 255;
const THRESHOLD: u8 = 127;

/// Sampled outline of one word.
#[derive(Debug, Clone)]
pub struct Silhouette {
    /// Points in `[-1, 1]` on both axes (y up).
    pub points: Vec<Vec2>,
    /// Bitmap width / height.
    pub aspect: f32,
}

impl Silhouette {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Sample assigned to a particle with the given seed.
    ///
    /// The same seed always lands on the same point, so revisiting a text
    /// slide does not reshuffle the particles.
    pub fn point_for_seed(&self, seed: f32) -> Option<Vec2> {
        if self.points.is_empty() {
            return None;
        }
        let idx = ((seed.clamp(0.0, 1.0) * self.points.len() as f32) as usize)
            .min(self.points.len() - 1);
        Some(self.points[idx])
    }
}

/// Draw `word` large and bold into a fresh bitmap.
pub fn rasterize(word: &str) -> GrayImage {
    let mut bitmap = GrayImage::new(BITMAP_WIDTH, BITMAP_HEIGHT);
    let glyphs: Vec<[u8; 8]> = word.chars().map(glyph_for_char).collect();
    if glyphs.is_empty() {
        return bitmap;
    }

    let fit_w = (BITMAP_WIDTH as f32 * 0.92) / (8.0 * glyphs.len() as f32);
    let fit_h = (BITMAP_HEIGHT as f32 * 0.8) / 8.0;
    let cell = fit_w.min(fit_h).floor().max(1.0) as u32;
    let bold = (cell / 3).max(1);

    let text_w = cell * 8 * glyphs.len() as u32;
    let origin_x = BITMAP_WIDTH.saturating_sub(text_w) / 2;
    let origin_y = BITMAP_HEIGHT.saturating_sub(cell * 8) / 2;

    for (ci, glyph) in glyphs.iter().enumerate() {
        let glyph_x = origin_x + ci as u32 * cell * 8;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..8u32 {
                if bits & (1 << col) == 0 {
                    continue;
                }
                let x0 = glyph_x + col * cell;
                let y0 = origin_y + row as u32 * cell;
                fill_rect(&mut bitmap, x0, y0, cell + bold, cell);
            }
        }
    }
    bitmap
}

/// Walk a thresholded bitmap and emit normalized points.
///
/// The stride is chosen so the point count lands near `hint`.
pub fn sample_bitmap(bitmap: &GrayImage, hint: usize) -> Vec<Vec2> {
    let (w, h) = bitmap.dimensions();
    let stride = sample_stride(w, h, hint);
    let mut points = Vec::new();
    for y in (0..h).step_by(stride as usize) {
        for x in (0..w).step_by(stride as usize) {
            if bitmap.get_pixel(x, y).0[0] > THRESHOLD {
                points.push(Vec2::new(
                    x as f32 / w as f32 * 2.0 - 1.0,
                    1.0 - y as f32 / h as f32 * 2.0,
                ));
            }
        }
    }
    points
}

/// `sqrt(area / hint) * 0.75`, at least one pixel.
pub fn sample_stride(width: u32, height: u32, hint: usize) -> u32 {
    let area = (width * height) as f32;
    let hint = hint.max(1) as f32;
    ((area / hint).sqrt() * 0.75).round().max(1.0) as u32
}

fn glyph_for_char(ch: char) -> [u8; 8] {
    let index = ch as usize;
    if index < BASIC_LEGACY.len() {
        BASIC_LEGACY[index]
    } else {
        BASIC_LEGACY[b'?' as usize]
    }
}

fn fill_rect(bitmap: &mut GrayImage, x0: u32, y0: u32, w: u32, h: u32) {
    let x1 = (x0 + w).min(bitmap.width());
    let y1 = (y0 + h).min(bitmap.height());
    for y in y0..y1 {
        for x in x0..x1 {
            bitmap.put_pixel(x, y, Luma([LIT]));
        }
    }
}

/// Per-deck cache of sampled words.
#[derive(Debug, Default)]
pub struct TextSampler {
    cache: HashMap<(String, usize), Arc<Silhouette>>,
}

impl TextSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample `word`, reusing an earlier result for the same word and hint.
    pub fn sample(&mut self, word: &str, hint: usize) -> Arc<Silhouette> {
        let key = (word.to_string(), hint);
        if let Some(hit) = self.cache.get(&key) {
            return Arc::clone(hit);
        }
        let bitmap = rasterize(word);
        let points = sample_bitmap(&bitmap, hint);
        log::debug!("sampled \"{}\": {} points for hint {}", word, points.len(), hint);
        let silhouette = Arc::new(Silhouette {
            points,
            aspect: BITMAP_WIDTH as f32 / BITMAP_HEIGHT as f32,
        });
        self.cache.insert(key, Arc::clone(&silhouette));
        silhouette
    }

    pub fn cached_words(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rasterize_draws_something() {
        let bitmap = rasterize("HI");
        let lit = bitmap.pixels().filter(|p| p.0[0] > THRESHOLD).count();
        assert!(lit > 500, "only {} lit pixels", lit);
    }

    #[test]
    fn test_empty_word_is_blank() {
        let bitmap = rasterize("");
        assert!(bitmap.pixels().all(|p| p.0[0] == 0));
        assert!(sample_bitmap(&bitmap, 1000).is_empty());
    }

    #[test]
    fn test_points_normalized() {
        let points = sample_bitmap(&rasterize("CHOREO"), 2500);
        assert!(!points.is_empty());
        for p in &points {
            assert!(p.x >= -1.0 && p.x <= 1.0 && p.y >= -1.0 && p.y <= 1.0);
        }
    }

    #[test]
    fn test_point_count_tracks_hint() {
        let bitmap = rasterize("WAVE");
        let few = sample_bitmap(&bitmap, 300).len();
        let many = sample_bitmap(&bitmap, 5000).len();
        assert!(many > few * 4, "few={} many={}", few, many);
    }

    #[test]
    fn test_stride_formula() {
        assert_eq!(sample_stride(480, 160, 2500), 4);
        assert_eq!(sample_stride(480, 160, 1_000_000), 1);
    }

    #[test]
    fn test_seed_assignment_is_stable() {
        let mut sampler = TextSampler::new();
        let a = sampler.sample("HELLO", 2000);
        let b = sampler.sample("HELLO", 2000);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(sampler.cached_words(), 1);
        assert_eq!(a.point_for_seed(0.37), b.point_for_seed(0.37));
        assert_eq!(a.point_for_seed(0.9999), a.points.last().copied());
    }
}
