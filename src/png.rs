//! PNG Codec - Signature, Chunks, Zlib-Wrapped Scanlines
//!
//! Encoding always writes 8-bit RGBA (color type 6), filter type 0 on every
//! row, a single IDAT and a fixed compression level, so identical pixels give
//! identical bytes. Decoding accepts every standard color type and bit depth
//! (non-interlaced) and rejects anything truncated or inconsistent; it never
//! returns partial pixel data.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Compression level used for every encoded texture. Changing it changes
/// every output byte, so it is a constant and not configuration.
const COMPRESSION_LEVEL: u32 = 9;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PngError {
    #[error("Missing PNG signature")]
    BadSignature,

    #[error("Truncated chunk at byte offset {0}")]
    Truncated(usize),

    #[error("CRC mismatch in {0} chunk")]
    CrcMismatch(String),

    #[error("IHDR must be the first chunk")]
    MissingHeader,

    #[error("Invalid IHDR: {0}")]
    InvalidHeader(String),

    #[error("Unsupported color type {0}")]
    UnsupportedColorType(u8),

    #[error("Unsupported bit depth {depth} for color type {color_type}")]
    UnsupportedBitDepth { depth: u8, color_type: u8 },

    #[error("Interlaced images are not supported")]
    Interlaced,

    #[error("Missing IDAT chunk")]
    MissingData,

    #[error("Missing IEND chunk")]
    MissingEnd,

    #[error("Indexed image without a PLTE chunk")]
    MissingPalette,

    #[error("Malformed PLTE chunk of {0} bytes")]
    BadPalette(usize),

    #[error("Palette index {0} out of range")]
    PaletteIndex(u8),

    #[error("Compressed image data is corrupt: {0}")]
    Inflate(String),

    #[error("Image data has {actual} bytes, expected {expected}")]
    DataLength { expected: usize, actual: usize },

    #[error("Unknown scanline filter type {0}")]
    BadFilter(u8),

    #[error("Pixel buffer has {actual} bytes, expected {expected} for {width}x{height} RGBA")]
    BufferSize { width: u32, height: u32, expected: usize, actual: usize },

    #[error("Image dimensions must be non-zero")]
    ZeroSize,

    #[error("Compression failed: {0}")]
    Deflate(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorType {
    Grayscale,
    Rgb,
    Indexed,
    GrayscaleAlpha,
    Rgba,
}

impl ColorType {
    pub fn from_byte(b: u8) -> Result<Self, PngError> {
        match b {
            0 => Ok(Self::Grayscale),
            2 => Ok(Self::Rgb),
            3 => Ok(Self::Indexed),
            4 => Ok(Self::GrayscaleAlpha),
            6 => Ok(Self::Rgba),
            other => Err(PngError::UnsupportedColorType(other)),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Self::Grayscale => 0,
            Self::Rgb => 2,
            Self::Indexed => 3,
            Self::GrayscaleAlpha => 4,
            Self::Rgba => 6,
        }
    }

    pub fn channels(self) -> usize {
        match self {
            Self::Grayscale | Self::Indexed => 1,
            Self::GrayscaleAlpha => 2,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }

    /// Color types the pipeline is allowed to ship.
    pub fn is_truecolor(self) -> bool {
        matches!(self, Self::Rgb | Self::Rgba)
    }

    fn allows_depth(self, depth: u8) -> bool {
        match self {
            Self::Grayscale => matches!(depth, 1 | 2 | 4 | 8 | 16),
            Self::Indexed => matches!(depth, 1 | 2 | 4 | 8),
            Self::Rgb | Self::GrayscaleAlpha | Self::Rgba => matches!(depth, 8 | 16),
        }
    }
}

/// 8-bit RGBA pixel buffer, row-major, 4 bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbaImage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, PngError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(PngError::BufferSize { width, height, expected, actual: pixels.len() });
        }
        Ok(Self { width, height, pixels })
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    pub fn get(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [self.pixels[i], self.pixels[i + 1], self.pixels[i + 2], self.pixels[i + 3]]
    }

    pub fn set(&mut self, x: u32, y: u32, px: [u8; 4]) {
        let i = self.offset(x, y);
        self.pixels[i..i + 4].copy_from_slice(&px);
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Result of decoding: header facts plus unfiltered scanline bytes in the
/// file's own color type and bit depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPng {
    pub width: u32,
    pub height: u32,
    pub color_type: ColorType,
    pub bit_depth: u8,
    /// Unfiltered scanlines, `height` rows of `stride()` bytes, no filter bytes.
    pub raw: Vec<u8>,
    pub palette: Vec<[u8; 3]>,
    pub transparency: Option<Vec<u8>>,
}

impl DecodedPng {
    pub fn stride(&self) -> usize {
        row_stride(self.width, self.color_type, self.bit_depth)
    }

    /// Expand any color type and bit depth to 8-bit RGBA.
    pub fn to_rgba(&self) -> Result<RgbaImage, PngError> {
        let stride = self.stride();
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        let depth = self.bit_depth;

        for row in self.raw.chunks_exact(stride) {
            for x in 0..self.width as usize {
                let px = match self.color_type {
                    ColorType::Grayscale => {
                        let v = read_sample(row, x, depth);
                        let g = scale_to_u8(v, depth);
                        let a = match &self.transparency {
                            Some(t) if t.len() >= 2 && u16::from_be_bytes([t[0], t[1]]) == v => 0,
                            _ => 255,
                        };
                        [g, g, g, a]
                    }
                    ColorType::GrayscaleAlpha => {
                        let g = read_sample(row, x * 2, depth);
                        let a = read_sample(row, x * 2 + 1, depth);
                        let g = scale_to_u8(g, depth);
                        [g, g, g, scale_to_u8(a, depth)]
                    }
                    ColorType::Rgb => {
                        let r = read_sample(row, x * 3, depth);
                        let g = read_sample(row, x * 3 + 1, depth);
                        let b = read_sample(row, x * 3 + 2, depth);
                        let a = match &self.transparency {
                            Some(t) if t.len() >= 6 => {
                                let key = [
                                    u16::from_be_bytes([t[0], t[1]]),
                                    u16::from_be_bytes([t[2], t[3]]),
                                    u16::from_be_bytes([t[4], t[5]]),
                                ];
                                if key == [r, g, b] { 0 } else { 255 }
                            }
                            _ => 255,
                        };
                        [scale_to_u8(r, depth), scale_to_u8(g, depth), scale_to_u8(b, depth), a]
                    }
                    ColorType::Rgba => [
                        scale_to_u8(read_sample(row, x * 4, depth), depth),
                        scale_to_u8(read_sample(row, x * 4 + 1, depth), depth),
                        scale_to_u8(read_sample(row, x * 4 + 2, depth), depth),
                        scale_to_u8(read_sample(row, x * 4 + 3, depth), depth),
                    ],
                    ColorType::Indexed => {
                        let idx = read_sample(row, x, depth) as u8;
                        let rgb = self
                            .palette
                            .get(idx as usize)
                            .ok_or(PngError::PaletteIndex(idx))?;
                        let a = self
                            .transparency
                            .as_ref()
                            .and_then(|t| t.get(idx as usize).copied())
                            .unwrap_or(255);
                        [rgb[0], rgb[1], rgb[2], a]
                    }
                };
                out.extend_from_slice(&px);
            }
        }

        RgbaImage::from_pixels(self.width, self.height, out)
    }
}

/// Encode an 8-bit RGBA buffer as a color type 6 PNG.
pub fn encode(width: u32, height: u32, rgba: &[u8]) -> Result<Vec<u8>, PngError> {
    if width == 0 || height == 0 {
        return Err(PngError::ZeroSize);
    }
    let expected = width as usize * height as usize * 4;
    if rgba.len() != expected {
        return Err(PngError::BufferSize { width, height, expected, actual: rgba.len() });
    }

    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    ihdr.extend_from_slice(&[8, ColorType::Rgba.as_byte(), 0, 0, 0]);

    let stride = width as usize * 4;
    let mut scanlines = Vec::with_capacity(height as usize * (stride + 1));
    for row in rgba.chunks_exact(stride) {
        scanlines.push(0);
        scanlines.extend_from_slice(row);
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(COMPRESSION_LEVEL));
    encoder
        .write_all(&scanlines)
        .map_err(|e| PngError::Deflate(e.to_string()))?;
    let idat = encoder.finish().map_err(|e| PngError::Deflate(e.to_string()))?;

    let mut out = Vec::with_capacity(idat.len() + 64);
    out.extend_from_slice(&PNG_SIGNATURE);
    write_chunk(&mut out, b"IHDR", &ihdr);
    write_chunk(&mut out, b"IDAT", &idat);
    write_chunk(&mut out, b"IEND", &[]);
    Ok(out)
}

/// Convenience wrapper for [`encode`].
pub fn encode_image(image: &RgbaImage) -> Result<Vec<u8>, PngError> {
    encode(image.width, image.height, &image.pixels)
}

fn write_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    out.extend_from_slice(&chunk_crc(kind, data).to_be_bytes());
}

/// CRC-32 (reflected, polynomial 0xEDB88320) over chunk type + data.
fn chunk_crc(kind: &[u8], data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(kind);
    hasher.update(data);
    hasher.finalize()
}

struct Header {
    width: u32,
    height: u32,
    bit_depth: u8,
    color_type: ColorType,
}

/// Decode a PNG file into header facts and unfiltered scanlines.
pub fn decode(bytes: &[u8]) -> Result<DecodedPng, PngError> {
    if bytes.len() < PNG_SIGNATURE.len() || bytes[..8] != PNG_SIGNATURE {
        return Err(PngError::BadSignature);
    }

    let mut pos = PNG_SIGNATURE.len();
    let mut header: Option<Header> = None;
    let mut palette = Vec::new();
    let mut transparency = None;
    let mut idat = Vec::new();
    let mut saw_end = false;

    while pos < bytes.len() {
        if bytes.len() - pos < 12 {
            return Err(PngError::Truncated(pos));
        }
        let len = u32::from_be_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]]) as usize;
        let kind = &bytes[pos + 4..pos + 8];
        let data_start = pos + 8;
        let data_end = data_start
            .checked_add(len)
            .filter(|end| end + 4 <= bytes.len())
            .ok_or(PngError::Truncated(pos))?;
        let data = &bytes[data_start..data_end];
        let stored = u32::from_be_bytes([
            bytes[data_end],
            bytes[data_end + 1],
            bytes[data_end + 2],
            bytes[data_end + 3],
        ]);
        let kind_name = String::from_utf8_lossy(kind).into_owned();
        if chunk_crc(kind, data) != stored {
            return Err(PngError::CrcMismatch(kind_name));
        }

        if header.is_none() && kind != b"IHDR" {
            return Err(PngError::MissingHeader);
        }

        match kind {
            b"IHDR" => {
                if header.is_some() {
                    return Err(PngError::InvalidHeader("duplicate IHDR".into()));
                }
                header = Some(parse_header(data)?);
            }
            b"PLTE" => {
                if data.len() % 3 != 0 || data.is_empty() || data.len() > 256 * 3 {
                    return Err(PngError::BadPalette(data.len()));
                }
                palette = data.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
            }
            b"tRNS" => transparency = Some(data.to_vec()),
            b"IDAT" => idat.extend_from_slice(data),
            b"IEND" => {
                saw_end = true;
                break;
            }
            // Ancillary chunks we do not interpret.
            _ => {}
        }
        pos = data_end + 4;
    }

    let header = header.ok_or(PngError::MissingHeader)?;
    if !saw_end {
        return Err(PngError::MissingEnd);
    }
    if idat.is_empty() {
        return Err(PngError::MissingData);
    }
    if header.color_type == ColorType::Indexed && palette.is_empty() {
        return Err(PngError::MissingPalette);
    }

    let stride = row_stride(header.width, header.color_type, header.bit_depth);
    let expected = (header.height as usize)
        .checked_mul(stride + 1)
        .ok_or_else(|| PngError::InvalidHeader(format!("{}x{} image", header.width, header.height)))?;

    // One byte past the expected length is enough to report a mismatch.
    let mut inflated = Vec::new();
    ZlibDecoder::new(idat.as_slice())
        .take(expected as u64 + 1)
        .read_to_end(&mut inflated)
        .map_err(|e| PngError::Inflate(e.to_string()))?;

    if inflated.len() != expected {
        return Err(PngError::DataLength { expected, actual: inflated.len() });
    }

    let bpp = filter_bpp(header.color_type, header.bit_depth);
    let raw = unfilter(&inflated, stride, bpp)?;

    Ok(DecodedPng {
        width: header.width,
        height: header.height,
        color_type: header.color_type,
        bit_depth: header.bit_depth,
        raw,
        palette,
        transparency,
    })
}

/// Decode and expand straight to RGBA.
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage, PngError> {
    decode(bytes)?.to_rgba()
}

fn parse_header(data: &[u8]) -> Result<Header, PngError> {
    if data.len() != 13 {
        return Err(PngError::InvalidHeader(format!("IHDR has {} bytes", data.len())));
    }
    let width = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
    let height = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
    if width == 0 || height == 0 {
        return Err(PngError::InvalidHeader(format!("{}x{} image", width, height)));
    }
    let bit_depth = data[8];
    let color_type = ColorType::from_byte(data[9])?;
    if !color_type.allows_depth(bit_depth) {
        return Err(PngError::UnsupportedBitDepth { depth: bit_depth, color_type: data[9] });
    }
    if data[10] != 0 || data[11] != 0 {
        return Err(PngError::InvalidHeader("unknown compression or filter method".into()));
    }
    match data[12] {
        0 => {}
        1 => return Err(PngError::Interlaced),
        other => return Err(PngError::InvalidHeader(format!("interlace method {}", other))),
    }
    Ok(Header { width, height, bit_depth, color_type })
}

fn row_stride(width: u32, color_type: ColorType, bit_depth: u8) -> usize {
    let bits = width as usize * color_type.channels() * bit_depth as usize;
    bits.div_ceil(8)
}

fn filter_bpp(color_type: ColorType, bit_depth: u8) -> usize {
    ((color_type.channels() * bit_depth as usize) / 8).max(1)
}

fn unfilter(data: &[u8], stride: usize, bpp: usize) -> Result<Vec<u8>, PngError> {
    let rows = data.len() / (stride + 1);
    let mut out = vec![0u8; rows * stride];

    for y in 0..rows {
        let filter = data[y * (stride + 1)];
        let src = &data[y * (stride + 1) + 1..(y + 1) * (stride + 1)];
        let (done, rest) = out.split_at_mut(y * stride);
        let prev = if y == 0 { None } else { Some(&done[(y - 1) * stride..]) };
        let cur = &mut rest[..stride];

        for i in 0..stride {
            let a = if i >= bpp { cur[i - bpp] } else { 0 };
            let b = prev.map_or(0, |p| p[i]);
            let c = if i >= bpp { prev.map_or(0, |p| p[i - bpp]) } else { 0 };
            let predictor = match filter {
                0 => 0,
                1 => a,
                2 => b,
                3 => ((u16::from(a) + u16::from(b)) / 2) as u8,
                4 => paeth(a, b, c),
                other => return Err(PngError::BadFilter(other)),
            };
            cur[i] = src[i].wrapping_add(predictor);
        }
    }
    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = i16::from(a) + i16::from(b) - i16::from(c);
    let pa = (p - i16::from(a)).abs();
    let pb = (p - i16::from(b)).abs();
    let pc = (p - i16::from(c)).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Read the `index`-th sample of a row at the given bit depth.
fn read_sample(row: &[u8], index: usize, depth: u8) -> u16 {
    match depth {
        16 => u16::from_be_bytes([row[index * 2], row[index * 2 + 1]]),
        8 => u16::from(row[index]),
        _ => {
            let bit = index * depth as usize;
            let byte = row[bit / 8];
            let shift = 8 - depth as usize - (bit % 8);
            let mask = (1u16 << depth) - 1;
            (u16::from(byte) >> shift) & mask
        }
    }
}

fn scale_to_u8(v: u16, depth: u8) -> u8 {
    match depth {
        16 => (v >> 8) as u8,
        8 => v as u8,
        _ => {
            let max = (1u32 << depth) - 1;
            (u32::from(v) * 255 / max) as u8
        }
    }
}

/// Build a PNG from arbitrary chunks. Used to produce non-RGBA fixtures
/// (indexed, grayscale) without going through [`encode`].
#[cfg(test)]
pub(crate) fn assemble(chunks: &[(&[u8; 4], Vec<u8>)]) -> Vec<u8> {
    let mut out = PNG_SIGNATURE.to_vec();
    for (kind, data) in chunks {
        write_chunk(&mut out, kind, data);
    }
    out
}

#[cfg(test)]
pub(crate) fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

#[cfg(test)]
pub(crate) fn ihdr(width: u32, height: u32, depth: u8, color_type: u8) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&width.to_be_bytes());
    v.extend_from_slice(&height.to_be_bytes());
    v.extend_from_slice(&[depth, color_type, 0, 0, 0]);
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(width: u32, height: u32) -> Vec<u8> {
        let mut px = Vec::new();
        for y in 0..height {
            for x in 0..width {
                if (x + y) % 2 == 0 {
                    px.extend_from_slice(&[200, 40, 40, 255]);
                } else {
                    px.extend_from_slice(&[20, 20, 90, 128]);
                }
            }
        }
        px
    }

    #[test]
    fn test_round_trip_preserves_pixels() {
        let px = checker(16, 16);
        let bytes = encode(16, 16, &px).unwrap();
        assert_eq!(&bytes[..8], &PNG_SIGNATURE);

        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.width, 16);
        assert_eq!(decoded.height, 16);
        assert_eq!(decoded.color_type, ColorType::Rgba);
        assert_eq!(decoded.raw, px);
    }

    #[test]
    fn test_encode_deterministic() {
        let px = checker(32, 32);
        assert_eq!(encode(32, 32, &px).unwrap(), encode(32, 32, &px).unwrap());
    }

    #[test]
    fn test_encode_rejects_wrong_buffer() {
        let err = encode(4, 4, &[0; 10]).unwrap_err();
        assert!(matches!(err, PngError::BufferSize { expected: 64, actual: 10, .. }));
        assert_eq!(encode(0, 4, &[]).unwrap_err(), PngError::ZeroSize);
    }

    #[test]
    fn test_truncated_input_is_rejected() {
        let bytes = encode(16, 16, &checker(16, 16)).unwrap();
        for cut in [4, 20, 40, bytes.len() - 1] {
            assert!(decode(&bytes[..cut]).is_err(), "cut at {} decoded", cut);
        }
    }

    #[test]
    fn test_crc_corruption_is_rejected() {
        let mut bytes = encode(16, 16, &checker(16, 16)).unwrap();
        // Flip a bit inside the IHDR width field.
        bytes[18] ^= 0x01;
        assert_eq!(decode(&bytes).unwrap_err(), PngError::CrcMismatch("IHDR".into()));
    }

    #[test]
    fn test_missing_iend_is_rejected() {
        let data = zlib(&[0, 1, 2, 3, 4]);
        let bytes = assemble(&[(b"IHDR", ihdr(1, 1, 8, 6)), (b"IDAT", data)]);
        assert_eq!(decode(&bytes).unwrap_err(), PngError::MissingEnd);
    }

    #[test]
    fn test_decode_indexed_with_transparency() {
        // 2x1, 8-bit indexed: pixel 0 -> palette 1, pixel 1 -> palette 0
        let palette = vec![10, 20, 30, 200, 100, 50];
        let trns = vec![0];
        let data = zlib(&[0, 1, 0]);
        let bytes = assemble(&[
            (b"IHDR", ihdr(2, 1, 8, 3)),
            (b"PLTE", palette),
            (b"tRNS", trns),
            (b"IDAT", data),
            (b"IEND", vec![]),
        ]);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.color_type, ColorType::Indexed);
        let rgba = decoded.to_rgba().unwrap();
        assert_eq!(rgba.pixels, vec![200, 100, 50, 255, 10, 20, 30, 0]);
    }

    #[test]
    fn test_decode_low_bit_depth_grayscale() {
        // 4x1, 2-bit grayscale: samples 0,1,2,3 packed into one byte.
        let data = zlib(&[0, 0b00_01_10_11]);
        let bytes = assemble(&[
            (b"IHDR", ihdr(4, 1, 2, 0)),
            (b"IDAT", data),
            (b"IEND", vec![]),
        ]);
        let rgba = decode_rgba(&bytes).unwrap();
        let grays: Vec<u8> = rgba.pixels.chunks(4).map(|p| p[0]).collect();
        assert_eq!(grays, vec![0, 85, 170, 255]);
    }

    #[test]
    fn test_unfilter_sub_up_average_paeth() {
        // 2x2 grayscale 8-bit, rows use Sub then Up filters.
        let raw_filtered = vec![1, 10, 5, 2, 1, 1];
        let data = zlib(&raw_filtered);
        let bytes = assemble(&[
            (b"IHDR", ihdr(2, 2, 8, 0)),
            (b"IDAT", data),
            (b"IEND", vec![]),
        ]);
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded.raw, vec![10, 15, 11, 16]);

        assert_eq!(paeth(10, 20, 10), 20);
        assert_eq!(paeth(20, 10, 10), 20);
    }

    #[test]
    fn test_oversized_image_data_stops_at_expected_length() {
        // 1x1 RGBA needs 5 bytes; the stream inflates to a megabyte.
        let data = zlib(&vec![0u8; 1 << 20]);
        let bytes = assemble(&[(b"IHDR", ihdr(1, 1, 8, 6)), (b"IDAT", data), (b"IEND", vec![])]);
        assert_eq!(decode(&bytes).unwrap_err(), PngError::DataLength { expected: 5, actual: 6 });
    }

    #[test]
    fn test_interlaced_is_rejected() {
        let mut header = ihdr(1, 1, 8, 6);
        header[12] = 1;
        let bytes = assemble(&[(b"IHDR", header), (b"IDAT", zlib(&[0, 0, 0, 0, 0])), (b"IEND", vec![])]);
        assert_eq!(decode(&bytes).unwrap_err(), PngError::Interlaced);
    }
}
