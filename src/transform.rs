//! Texture Transform Layer
//!
//! Fixed order: normalize -> recolor -> vary -> dedup. Every step is a pure
//! function of its inputs; the only state is the per-run [`DedupCache`],
//! owned by the caller.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::classify::{Classifier, Predicate, Rule};
use crate::hashing::{sha256_hex, string_hash};
use crate::png::{self, PngError, RgbaImage};

/// Expand grayscale / indexed / grayscale+alpha PNGs to RGBA.
///
/// RGB and RGBA inputs are returned byte-for-byte unchanged, which makes the
/// function idempotent: its output is always color type 2 or 6.
pub fn normalize(bytes: &[u8]) -> Result<Vec<u8>, PngError> {
    let decoded = png::decode(bytes)?;
    if decoded.color_type.is_truecolor() {
        return Ok(bytes.to_vec());
    }
    let rgba = decoded.to_rgba()?;
    png::encode_image(&rgba)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub h: f32,
    pub s: f32,
    pub v: f32,
}

pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let r = f32::from(r) / 255.0;
    let g = f32::from(g) / 255.0;
    let b = f32::from(b) / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta <= f32::EPSILON {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let s = if max <= f32::EPSILON { 0.0 } else { delta / max };
    Hsv { h, s, v: max }
}

pub fn hsv_to_rgb(hsv: Hsv) -> [u8; 3] {
    let h = hsv.h.rem_euclid(360.0);
    let c = hsv.v * hsv.s;
    let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
    let m = hsv.v - c;
    let (r, g, b) = match (h / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let to_u8 = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    [to_u8(r), to_u8(g), to_u8(b)]
}

const HUE_RULES: &[Rule<u16>] = &[
    Rule::new(Predicate::Word("ruby"), 350),
    Rule::new(Predicate::Word("garnet"), 345),
    Rule::new(Predicate::Word("cherry"), 345),
    Rule::new(Predicate::Word("crimson"), 350),
    Rule::new(Predicate::Word("red"), 0),
    Rule::new(Predicate::Word("rose"), 340),
    Rule::new(Predicate::Word("maple"), 18),
    Rule::new(Predicate::Word("copper"), 22),
    Rule::new(Predicate::Word("orange"), 28),
    Rule::new(Predicate::Word("bronze"), 30),
    Rule::new(Predicate::Word("amber"), 38),
    Rule::new(Predicate::Word("topaz"), 42),
    Rule::new(Predicate::Word("gold"), 48),
    Rule::new(Predicate::Word("citrine"), 50),
    Rule::new(Predicate::Word("yellow"), 55),
    Rule::new(Predicate::Word("lime"), 90),
    Rule::new(Predicate::Word("green"), 120),
    Rule::new(Predicate::Word("emerald"), 140),
    Rule::new(Predicate::Word("jade"), 145),
    Rule::new(Predicate::Word("malachite"), 155),
    Rule::new(Predicate::Word("aquamarine"), 170),
    Rule::new(Predicate::Word("teal"), 175),
    Rule::new(Predicate::Word("turquoise"), 175),
    Rule::new(Predicate::Word("cyan"), 185),
    Rule::new(Predicate::Word("sky"), 200),
    Rule::new(Predicate::Word("cobalt"), 215),
    Rule::new(Predicate::Word("sapphire"), 220),
    Rule::new(Predicate::Word("blue"), 225),
    Rule::new(Predicate::Word("lapis"), 225),
    Rule::new(Predicate::Word("indigo"), 250),
    Rule::new(Predicate::Word("obsidian"), 265),
    Rule::new(Predicate::Word("amethyst"), 275),
    Rule::new(Predicate::Word("purple"), 280),
    Rule::new(Predicate::Word("violet"), 285),
    Rule::new(Predicate::Word("magenta"), 300),
    Rule::new(Predicate::Word("pink"), 330),
];

const HUES: Classifier<u16> = Classifier::new(HUE_RULES);

/// Target hue in degrees for an entity id: curated table first, then a
/// hash of the id.
pub fn target_hue(id: &str) -> f32 {
    match HUES.classify(id) {
        Some(h) => f32::from(h),
        None => (string_hash(id) % 360) as f32,
    }
}

/// Hue of an explicit color hint, if the hint carries one.
pub fn hint_hue(rgb: [u8; 3]) -> Option<f32> {
    let hsv = rgb_to_hsv(rgb[0], rgb[1], rgb[2]);
    (hsv.s > 0.1 && hsv.v > 0.1).then_some(hsv.h)
}

const TARGET_SATURATION: f32 = 0.65;
const BLACK_CUTOFF: f32 = 0.08;

fn lerp_hue(from: f32, to: f32, t: f32) -> f32 {
    let mut diff = (to - from).rem_euclid(360.0);
    if diff > 180.0 {
        diff -= 360.0;
    }
    (from + diff * t).rem_euclid(360.0)
}

/// Blend every opaque pixel's hue and saturation toward `hue`. Blend weight
/// is `strength * value`, so dark pixels barely move and near-black pixels
/// are left alone.
pub fn recolor(image: &RgbaImage, hue: f32, strength: f32) -> RgbaImage {
    let strength = strength.clamp(0.0, 1.0);
    let mut out = image.clone();
    for px in out.pixels.chunks_exact_mut(4) {
        if px[3] == 0 {
            continue;
        }
        let hsv = rgb_to_hsv(px[0], px[1], px[2]);
        if hsv.v < BLACK_CUTOFF {
            continue;
        }
        let w = strength * hsv.v;
        // Unsaturated pixels have no meaningful hue; adopt the target outright.
        let h = if hsv.s <= f32::EPSILON { hue } else { lerp_hue(hsv.h, hue, w) };
        let s = hsv.s + (TARGET_SATURATION - hsv.s) * w;
        let rgb = hsv_to_rgb(Hsv { h, s, v: hsv.v });
        px[..3].copy_from_slice(&rgb);
    }
    out
}

/// Nudge one hash-chosen opaque pixel and its four neighbours so that two
/// entities sharing a template never produce identical bytes.
pub fn vary(image: &RgbaImage, key: &str) -> RgbaImage {
    let mut out = image.clone();
    let opaque: Vec<u32> = (0..image.pixel_count() as u32)
        .filter(|i| image.pixels[*i as usize * 4 + 3] > 0)
        .collect();
    if opaque.is_empty() {
        return out;
    }

    let h = string_hash(key);
    let index = opaque[(h as usize) % opaque.len()];
    let delta = 3 + ((h >> 16) % 6) as u8;
    let (cx, cy) = (index % image.width, index / image.width);

    let neighbours = [(0i64, 0i64), (-1, 0), (1, 0), (0, -1), (0, 1)];
    for (dx, dy) in neighbours {
        let x = i64::from(cx) + dx;
        let y = i64::from(cy) + dy;
        if x < 0 || y < 0 || x >= i64::from(image.width) || y >= i64::from(image.height) {
            continue;
        }
        let (x, y) = (x as u32, y as u32);
        let mut px = out.get(x, y);
        if px[3] == 0 {
            continue;
        }
        for c in px.iter_mut().take(3) {
            *c = if *c > 127 { *c - delta } else { *c + delta };
        }
        out.set(x, y, px);
    }
    out
}

/// 4x4 grid of average colors, each channel quantized to 4 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub [[u8; 4]; 16]);

pub fn fingerprint(image: &RgbaImage) -> Fingerprint {
    let mut cells = [[0u8; 4]; 16];
    for cy in 0..4u32 {
        for cx in 0..4u32 {
            let (x0, x1) = (cx * image.width / 4, (cx + 1) * image.width / 4);
            let (y0, y1) = (cy * image.height / 4, (cy + 1) * image.height / 4);
            let mut sum = [0u64; 4];
            let mut count = 0u64;
            for y in y0..y1 {
                for x in x0..x1 {
                    let px = image.get(x, y);
                    for c in 0..4 {
                        sum[c] += u64::from(px[c]);
                    }
                    count += 1;
                }
            }
            if count > 0 {
                let cell = &mut cells[(cy * 4 + cx) as usize];
                for c in 0..4 {
                    cell[c] = ((sum[c] / count) >> 4) as u8;
                }
            }
        }
    }
    Fingerprint(cells)
}

/// Per-run record of fingerprints and exact pixel hashes already emitted.
/// Construct one per materialization; never share across runs.
#[derive(Debug, Default)]
pub struct DedupCache {
    fingerprints: HashMap<Fingerprint, String>,
    exact: HashMap<String, String>,
    pub collisions: u32,
    pub exhausted: u32,
}

impl DedupCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_unique(&self, fp: &Fingerprint, digest: &str, owner: &str) -> bool {
        let fp_ok = self.fingerprints.get(fp).map_or(true, |o| o == owner);
        let exact_ok = self.exact.get(digest).map_or(true, |o| o == owner);
        fp_ok && exact_ok
    }

    fn record(&mut self, fp: Fingerprint, digest: String, owner: &str) {
        self.fingerprints.entry(fp).or_insert_with(|| owner.to_string());
        self.exact.entry(digest).or_insert_with(|| owner.to_string());
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThemeSettings {
    pub strength: f32,
    pub retry_cap: u32,
    pub strength_step: f32,
    /// Hue offset added per retry so that entities aimed at the same hue can
    /// still separate.
    pub hue_nudge: f32,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            strength: 0.55,
            retry_cap: 4,
            strength_step: 0.12,
            hue_nudge: 11.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Themed {
    pub image: RgbaImage,
    pub attempts: u32,
    pub unique: bool,
}

/// recolor -> vary -> dedup for one output texture.
///
/// `owner` is the output path; a fingerprint seen before under the same
/// owner is not a collision.
pub fn theme(
    source: &RgbaImage,
    hue: f32,
    owner: &str,
    settings: &ThemeSettings,
    cache: &mut DedupCache,
) -> Themed {
    let mut attempt = 0;
    loop {
        let strength = (settings.strength + settings.strength_step * attempt as f32).min(1.0);
        let attempt_hue = hue + settings.hue_nudge * attempt as f32;
        let vary_key = if attempt == 0 {
            owner.to_string()
        } else {
            format!("{}#{}", owner, attempt)
        };
        let image = vary(&recolor(source, attempt_hue, strength), &vary_key);
        let fp = fingerprint(&image);
        let digest = sha256_hex(&image.pixels);

        if cache.is_unique(&fp, &digest, owner) {
            cache.record(fp, digest, owner);
            if attempt > 0 {
                debug!(owner, attempt, "texture separated after retries");
            }
            return Themed { image, attempts: attempt, unique: true };
        }

        cache.collisions += 1;
        if attempt >= settings.retry_cap {
            warn!(owner, attempt, "perceptual duplicate accepted after retry cap");
            cache.exhausted += 1;
            cache.record(fp, digest, owner);
            return Themed { image, attempts: attempt, unique: false };
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::png::{assemble, ihdr, zlib, ColorType};

    fn gradient(w: u32, h: u32) -> RgbaImage {
        let mut img = RgbaImage::new(w, h);
        for y in 0..h {
            for x in 0..w {
                img.set(x, y, [(x * 8) as u8, (y * 8) as u8, 90, 255]);
            }
        }
        img
    }

    #[test]
    fn test_normalize_indexed_to_rgba_and_idempotent() {
        let bytes = assemble(&[
            (b"IHDR", ihdr(2, 1, 8, 3)),
            (b"PLTE", vec![255, 0, 0, 0, 0, 255]),
            (b"IDAT", zlib(&[0, 0, 1])),
            (b"IEND", vec![]),
        ]);
        let once = normalize(&bytes).unwrap();
        let decoded = png::decode(&once).unwrap();
        assert_eq!(decoded.color_type, ColorType::Rgba);
        assert_eq!(decoded.raw, vec![255, 0, 0, 255, 0, 0, 255, 255]);

        let twice = normalize(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_passes_truecolor_through() {
        let bytes = png::encode_image(&gradient(16, 16)).unwrap();
        assert_eq!(normalize(&bytes).unwrap(), bytes);
    }

    #[test]
    fn test_hsv_round_trip() {
        for rgb in [[255, 0, 0], [12, 200, 40], [30, 30, 30], [250, 250, 10]] {
            let back = hsv_to_rgb(rgb_to_hsv(rgb[0], rgb[1], rgb[2]));
            for c in 0..3 {
                assert!((i16::from(back[c]) - i16::from(rgb[c])).abs() <= 1, "{:?} -> {:?}", rgb, back);
            }
        }
    }

    #[test]
    fn test_target_hue_curated_and_fallback() {
        assert_eq!(target_hue("ruby"), 350.0);
        assert_eq!(target_hue("sapphire_block"), 220.0);
        let h = target_hue("zzyzx");
        assert!((0.0..360.0).contains(&h));
        assert_eq!(h, target_hue("zzyzx"));
    }

    #[test]
    fn test_recolor_moves_toward_target_and_spares_black() {
        let mut img = RgbaImage::new(2, 1);
        img.set(0, 0, [120, 120, 255, 255]);
        img.set(1, 0, [5, 5, 5, 255]);
        let out = recolor(&img, 0.0, 1.0);
        let [r, _, b, _] = out.get(0, 0);
        assert!(r > b, "expected red-shifted pixel, got {:?}", out.get(0, 0));
        assert_eq!(out.get(1, 0), [5, 5, 5, 255]);
    }

    #[test]
    fn test_vary_differs_by_key() {
        let img = gradient(16, 16);
        let a = vary(&img, "m:block/maple_planks");
        let b = vary(&img, "m:block/birch_planks");
        assert_ne!(a, img);
        assert_ne!(a, b);
        assert_eq!(a, vary(&img, "m:block/maple_planks"));
    }

    #[test]
    fn test_dedup_separates_identical_sources() {
        let img = gradient(16, 16);
        let settings = ThemeSettings::default();
        let mut cache = DedupCache::new();
        let a = theme(&img, 120.0, "a.png", &settings, &mut cache);
        let b = theme(&img, 120.0, "b.png", &settings, &mut cache);
        assert!(a.unique && b.unique);
        assert_ne!(fingerprint(&a.image), fingerprint(&b.image));
        assert_eq!(cache.len(), 2);

        // Re-theming the same owner is not a collision.
        let again = theme(&img, 120.0, "a.png", &settings, &mut cache);
        assert_eq!(again.attempts, 0);
    }

    #[test]
    fn test_dedup_cap_accepts_last_result() {
        let flat = RgbaImage::from_pixels(16, 16, vec![0; 16 * 16 * 4]).unwrap();
        let settings = ThemeSettings { retry_cap: 2, ..Default::default() };
        let mut cache = DedupCache::new();
        theme(&flat, 0.0, "a.png", &settings, &mut cache);
        let second = theme(&flat, 0.0, "b.png", &settings, &mut cache);
        assert!(!second.unique);
        assert_eq!(second.attempts, 2);
        assert_eq!(cache.exhausted, 1);
    }
}
