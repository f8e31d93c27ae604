//! Procedural Texture Synthesis
//!
//! Used when no vanilla source texture exists for an entity. Output depends
//! only on `(seed, profile, color hint, size)`.

use crate::classify::MaterialClass;
use crate::hashing::{noise_hash, string_hash};
use crate::png::RgbaImage;
use crate::profile::{Motif, TextureProfile};

pub fn base_color(class: MaterialClass) -> [u8; 3] {
    match class {
        MaterialClass::Wood => [150, 111, 51],
        MaterialClass::Stone => [128, 128, 128],
        MaterialClass::Metal => [188, 190, 198],
        MaterialClass::Food => [204, 124, 62],
        MaterialClass::Crystal => [120, 200, 220],
        MaterialClass::Generic => [160, 140, 120],
    }
}

/// Synthesize an opaque texture.
pub fn synthesize(
    seed: &str,
    profile: &TextureProfile,
    color_hint: Option<[u8; 3]>,
    width: u32,
    height: u32,
) -> RgbaImage {
    let base = color_hint.unwrap_or_else(|| base_color(profile.material_class));
    let amp = profile.noise_amplitude();
    let mut img = RgbaImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let n = (noise_hash(seed, x, y) % (2 * amp as u32 + 1)) as i32 - amp;
            img.set(
                x,
                y,
                [offset(base[0], n), offset(base[1], n), offset(base[2], n), 255],
            );
        }
    }

    let mut motifs = profile.motifs.clone();
    motifs.sort();
    for motif in motifs {
        let motif_seed = format!("{}:{:?}", seed, motif);
        match motif {
            Motif::Strata => strata(&mut img, &motif_seed),
            Motif::Grain => grain(&mut img, &motif_seed),
            Motif::Rings => rings(&mut img),
            Motif::Veins => veins(&mut img, &motif_seed),
            Motif::Holes => holes(&mut img, &motif_seed),
            Motif::Bubbles => bubbles(&mut img, &motif_seed),
            Motif::Flakes => flakes(&mut img, &motif_seed),
        }
    }

    ensure_two_values(&mut img);
    img
}

fn offset(c: u8, delta: i32) -> u8 {
    (i32::from(c) + delta).clamp(0, 255) as u8
}

fn shade(img: &mut RgbaImage, x: i64, y: i64, delta: i32) {
    if x < 0 || y < 0 || x >= i64::from(img.width) || y >= i64::from(img.height) {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    let [r, g, b, a] = img.get(x, y);
    img.set(x, y, [offset(r, delta), offset(g, delta), offset(b, delta), a]);
}

fn scale(img: &RgbaImage) -> i64 {
    (i64::from(img.width.min(img.height)) / 16).max(1)
}

fn strata(img: &mut RgbaImage, seed: &str) {
    let band = 2 + (string_hash(seed) % 3) as u32 * scale(img) as u32;
    for y in 0..img.height {
        if (y / band) % 2 == 1 {
            let jitter = (noise_hash(seed, 0, y) % 5) as i32;
            for x in 0..img.width {
                shade(img, i64::from(x), i64::from(y), -12 - jitter);
            }
        }
    }
}

fn grain(img: &mut RgbaImage, seed: &str) {
    for x in 0..img.width {
        if noise_hash(seed, x, 0) % 4 != 0 {
            continue;
        }
        for y in 0..img.height {
            let d = 10 + (noise_hash(seed, x, y) % 5) as i32;
            shade(img, i64::from(x), i64::from(y), -d);
        }
    }
}

fn rings(img: &mut RgbaImage) {
    let cx = f64::from(img.width) / 2.0 - 0.5;
    let cy = f64::from(img.height) / 2.0 - 0.5;
    let step = 2 * scale(img) as u32 + 1;
    for y in 0..img.height {
        for x in 0..img.width {
            let d = ((f64::from(x) - cx).powi(2) + (f64::from(y) - cy).powi(2)).sqrt();
            if (d as u32) % step == 0 {
                shade(img, i64::from(x), i64::from(y), -18);
            }
        }
    }
}

fn veins(img: &mut RgbaImage, seed: &str) {
    for vein in 0..2u32 {
        let mut x = i64::from(noise_hash(seed, vein, 0) % img.width);
        for y in 0..i64::from(img.height) {
            shade(img, x, y, -30);
            shade(img, x - 1, y, -10);
            shade(img, x + 1, y, -10);
            let step = noise_hash(seed, vein, y as u32 + 1) % 3;
            x = (x + i64::from(step) - 1).clamp(0, i64::from(img.width) - 1);
        }
    }
}

fn disks(img: &RgbaImage, seed: &str, count: u32) -> Vec<(i64, i64, i64)> {
    let s = scale(img);
    (0..count)
        .map(|i| {
            let h = noise_hash(seed, i, 7);
            let cx = i64::from(h % img.width);
            let cy = i64::from((h >> 12) % img.height);
            let r = (1 + i64::from((h >> 24) % 2)) * s;
            (cx, cy, r)
        })
        .collect()
}

fn holes(img: &mut RgbaImage, seed: &str) {
    for (cx, cy, r) in disks(img, seed, 3) {
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    shade(img, cx + dx, cy + dy, -40);
                }
            }
        }
    }
}

fn bubbles(img: &mut RgbaImage, seed: &str) {
    for (cx, cy, r) in disks(img, seed, 3) {
        let r = r + 1;
        for dy in -r..=r {
            for dx in -r..=r {
                let d2 = dx * dx + dy * dy;
                if d2 > r * r {
                    continue;
                }
                let delta = if d2 >= (r - 1) * (r - 1) { -20 } else { 25 };
                shade(img, cx + dx, cy + dy, delta);
            }
        }
    }
}

fn flakes(img: &mut RgbaImage, seed: &str) {
    for y in 0..img.height {
        for x in 0..img.width {
            if noise_hash(seed, x, y) % 11 == 0 {
                shade(img, i64::from(x), i64::from(y), -35);
            }
        }
    }
}

/// A flat texture is rejected by validation; nudge one pixel if the noise
/// happened to cancel out (e.g. a pure black or white color hint).
fn ensure_two_values(img: &mut RgbaImage) {
    let first = img.get(0, 0);
    let flat = img.pixels.chunks_exact(4).all(|p| p == first);
    if flat {
        let delta = if first[0] > 127 { -40 } else { 40 };
        shade(img, 0, 0, delta);
    }
}
