//! BMP decode and bitmap-to-mosaic transform
//!
//! The mosaic transform is a pure batch conversion: it partitions a decoded
//! bitmap into block x block pixel tiles, averages each tile's color and
//! emits one flat-colored rectangle per non-black tile, centered on the
//! image origin with +y up. It runs once per unique (asset, parameters)
//! pair; the [`crate::assets::AssetStore`] caches the results.

use glam::Vec2;
use thiserror::Error;

use crate::scene::Rgb;

/// Alpha threshold below which a 32-bit source pixel counts as fully
/// transparent (and therefore black for averaging purposes)
pub const ALPHA_OPAQUE_MIN: u8 = 128;

/// Errors from [`decode_bmp`]. Any of these is a hard load failure for the
/// asset; callers mask it with a placeholder bitmap.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BmpError {
    #[error("missing BM signature")]
    BadSignature,
    #[error("unsupported DIB header size {0} (need >= 40)")]
    BadDibHeader(u32),
    #[error("invalid dimensions {width}x{height}")]
    BadDimensions { width: i32, height: i32 },
    #[error("unsupported plane count {0}")]
    BadPlanes(u16),
    #[error("unsupported bits-per-pixel {0} (only 24 and 32)")]
    BadBitDepth(u16),
    #[error("unsupported compression {0} (only BI_RGB)")]
    BadCompression(u32),
    #[error("pixel data truncated")]
    Truncated,
}

/// Decoded bitmap, RGBA, top-down raster order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    /// width * height * 4 bytes
    pub data: Vec<u8>,
}

fn read_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    Some(u16::from_le_bytes(bytes.get(offset..offset + 2)?.try_into().ok()?))
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    Some(u32::from_le_bytes(bytes.get(offset..offset + 4)?.try_into().ok()?))
}

fn read_i32(bytes: &[u8], offset: usize) -> Option<i32> {
    read_u32(bytes, offset).map(|v| v as i32)
}

/// Decode an uncompressed 24- or 32-bit BI_RGB Windows bitmap
pub fn decode_bmp(bytes: &[u8]) -> Result<Bitmap, BmpError> {
    if bytes.len() < 54 || bytes[0] != b'B' || bytes[1] != b'M' {
        return Err(BmpError::BadSignature);
    }
    let pixel_offset = read_u32(bytes, 10).ok_or(BmpError::Truncated)? as usize;
    let dib_size = read_u32(bytes, 14).ok_or(BmpError::Truncated)?;
    if dib_size < 40 {
        return Err(BmpError::BadDibHeader(dib_size));
    }
    let width = read_i32(bytes, 18).ok_or(BmpError::Truncated)?;
    let height_signed = read_i32(bytes, 22).ok_or(BmpError::Truncated)?;
    let planes = read_u16(bytes, 26).ok_or(BmpError::Truncated)?;
    let bpp = read_u16(bytes, 28).ok_or(BmpError::Truncated)?;
    let compression = read_u32(bytes, 30).ok_or(BmpError::Truncated)?;

    if planes != 1 {
        return Err(BmpError::BadPlanes(planes));
    }
    if compression != 0 {
        return Err(BmpError::BadCompression(compression));
    }
    if bpp != 24 && bpp != 32 {
        return Err(BmpError::BadBitDepth(bpp));
    }
    if width <= 0 || height_signed == 0 {
        return Err(BmpError::BadDimensions {
            width,
            height: height_signed,
        });
    }

    let top_down = height_signed < 0;
    let width = width as usize;
    let height = height_signed.unsigned_abs() as usize;
    let bytes_per_pixel = (bpp / 8) as usize;
    // rows are padded to a 4-byte boundary
    let row_stride = (width * bytes_per_pixel + 3) & !3;

    let needed = pixel_offset
        .checked_add(row_stride.checked_mul(height).ok_or(BmpError::Truncated)?)
        .ok_or(BmpError::Truncated)?;
    if bytes.len() < needed {
        return Err(BmpError::Truncated);
    }

    let mut data = vec![0u8; width * height * 4];
    for row in 0..height {
        let src_row = if top_down { row } else { height - 1 - row };
        let base = pixel_offset + src_row * row_stride;
        for x in 0..width {
            let src = base + x * bytes_per_pixel;
            let dst = (row * width + x) * 4;
            data[dst] = bytes[src + 2];
            data[dst + 1] = bytes[src + 1];
            data[dst + 2] = bytes[src];
            data[dst + 3] = if bytes_per_pixel == 4 { bytes[src + 3] } else { 255 };
        }
    }

    Ok(Bitmap {
        width: width as u32,
        height: height as u32,
        data,
    })
}

/// Separable radial brightness falloff: per-axis power-law over normalized
/// distance from the image center
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fading {
    /// Normalized x distance at which brightness reaches zero
    pub x_radius: f32,
    pub y_radius: f32,
    pub x_pow: f32,
    pub y_pow: f32,
}

impl Fading {
    fn multiplier(&self, nx: f32, ny: f32) -> f32 {
        let fx = (1.0 - nx / self.x_radius.max(1e-9)).max(0.0).powf(self.x_pow.max(0.0));
        let fy = (1.0 - ny / self.y_radius.max(1e-9)).max(0.0).powf(self.y_pow.max(0.0));
        fx * fy
    }
}

/// Parameters for the mosaic transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MosaicParams {
    /// Tile size in source pixels per side
    pub block: u32,
    /// Output scale: one source pixel maps to `size_factor` world units
    pub size_factor: f32,
    /// Flat brightness multiplier applied to every tile
    pub brightness: f32,
    pub fading: Option<Fading>,
}

impl MosaicParams {
    /// Panics when `block` is zero or `size_factor` is not positive; both
    /// indicate a programming error upstream.
    pub fn new(block: u32, size_factor: f32) -> Self {
        assert!(block > 0, "mosaic block size must be positive");
        assert!(size_factor > 0.0, "mosaic size factor must be positive");
        Self {
            block,
            size_factor,
            brightness: 1.0,
            fading: None,
        }
    }

    pub fn brightness(mut self, brightness: f32) -> Self {
        self.brightness = brightness;
        self
    }

    pub fn fading(mut self, fading: Fading) -> Self {
        self.fading = Some(fading);
        self
    }
}

/// One flat-colored rectangle of a mosaic, in local node coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MosaicBlock {
    /// Tile center relative to the image origin, +y up
    pub offset: Vec2,
    pub size: Vec2,
    pub color: Rgb,
}

/// Pure transform: average each tile, discard exactly-black tiles, emit
/// centered scaled rectangles. Deterministic for identical inputs.
pub fn mosaic_blocks(bitmap: &Bitmap, params: &MosaicParams) -> Vec<MosaicBlock> {
    let w = bitmap.width as usize;
    let h = bitmap.height as usize;
    let block = params.block as usize;
    let s = params.size_factor;
    let mut blocks = Vec::new();

    let mut y0 = 0;
    while y0 < h {
        let y1 = (y0 + block).min(h);
        let mut x0 = 0;
        while x0 < w {
            let x1 = (x0 + block).min(w);
            let mut sum = [0u32; 3];
            let mut count = 0u32;
            for yy in y0..y1 {
                for xx in x0..x1 {
                    let p = (yy * w + xx) * 4;
                    let opaque = bitmap.data[p + 3] >= ALPHA_OPAQUE_MIN;
                    if opaque {
                        sum[0] += bitmap.data[p] as u32;
                        sum[1] += bitmap.data[p + 1] as u32;
                        sum[2] += bitmap.data[p + 2] as u32;
                    }
                    count += 1;
                }
            }
            if count > 0 {
                let r = sum[0] / count;
                let g = sum[1] / count;
                let b = sum[2] / count;
                if r + g + b != 0 {
                    let mut mult = params.brightness;
                    if let Some(fading) = &params.fading {
                        let cx = 0.5 * (x0 + x1) as f32;
                        let cy = 0.5 * (y0 + y1) as f32;
                        let nx = (cx - 0.5 * w as f32).abs() / (0.5 * w as f32);
                        let ny = (cy - 0.5 * h as f32).abs() / (0.5 * h as f32);
                        mult *= fading.multiplier(nx, ny);
                    }
                    let shade = |v: u32| ((v as f32 * mult) as i32).clamp(0, 255) as u8;
                    blocks.push(MosaicBlock {
                        offset: Vec2::new(
                            (-(w as f32) / 2.0 + 0.5 * (x0 + x1) as f32) * s,
                            (h as f32 / 2.0 - 0.5 * (y0 + y1) as f32) * s,
                        ),
                        size: Vec2::new((x1 - x0) as f32 * s, (y1 - y0) as f32 * s),
                        color: Rgb(shade(r), shade(g), shade(b)),
                    });
                }
            }
            x0 = x1;
        }
        y0 = y1;
    }
    blocks
}
