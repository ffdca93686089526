//! Bitmap decoder for BITD payloads
//!
//! Supports:
//! - 1-bit bitmaps (rows padded to 16 pixels, set bit = white)
//! - 2-bit grayscale
//! - 4-bit and 8-bit palette-indexed
//! - 24-bit RGB (interleaved raw, planar run-length)
//! - 32-bit ARGB (rotated raw, planar run-length, alpha inverted)
//!
//! A payload is raw when its length equals the uncompressed size for its
//! dimensions and depth; otherwise it is run-length coded.

pub mod packbits;

use crate::error::{Result, ShockwaveError};
use crate::palette::{Palette, PaletteRegistry};

/// Dimensions and color information from a bitmap cast member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapParams {
    pub width: u16,
    pub height: u16,
    pub depth: u8,
    pub palette_id: i16,
}

impl BitmapParams {
    /// Width including row padding
    pub fn stored_width(&self) -> usize {
        let width = self.width as usize;
        match self.depth {
            1 => width.div_ceil(16) * 16,
            4 => width.div_ceil(4) * 4,
            _ => width,
        }
    }

    /// Size of the payload when stored without run-length coding
    pub fn raw_len(&self) -> usize {
        (self.stored_width() * self.height as usize * self.depth as usize).div_ceil(8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packing {
    Raw,
    RunLength,
}

/// Decoded bitmap in RGBA format
#[derive(Debug, Clone)]
pub struct DecodedBitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>, // RGBA, 4 bytes per pixel
    pub packing: Packing,
}

impl DecodedBitmap {
    /// RGBA value at `(x, y)`, or `None` outside the image
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let rgba = self.pixels.get(i..i + 4)?;
        Some([rgba[0], rgba[1], rgba[2], rgba[3]])
    }

    /// Encode as an 8-bit RGBA PNG
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.width, self.height);
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);

            let mut writer = encoder.write_header()?;
            writer.write_image_data(&self.pixels)?;
            writer.finish()?;
        }
        Ok(out)
    }
}

/// Decode a BITD payload into RGBA pixels.
///
/// Depths 4 and 8 look up `params.palette_id` in `palettes`.
pub fn decode_bitd(
    data: &[u8],
    params: &BitmapParams,
    palettes: &PaletteRegistry,
) -> Result<DecodedBitmap> {
    let packing = if data.len() == params.raw_len() {
        Packing::Raw
    } else {
        Packing::RunLength
    };
    tracing::debug!(
        "BITD {}x{} depth={} len={} raw_len={} ({:?})",
        params.width,
        params.height,
        params.depth,
        data.len(),
        params.raw_len(),
        packing
    );

    let pixels = match params.depth {
        1 | 2 => {
            let bytes = indexed_bytes(data, params, packing)?;
            if params.depth == 1 {
                decode_1bit(&bytes, params)
            } else {
                decode_2bit(&bytes, params)
            }
        }
        4 | 8 => {
            let palette = palettes.retrieve(params.palette_id)?;
            let bytes = indexed_bytes(data, params, packing)?;
            if params.depth == 4 {
                decode_4bit(&bytes, params, palette)
            } else {
                decode_8bit(&bytes, params, palette)
            }
        }
        24 => decode_24bit(data, params, packing)?,
        32 => decode_32bit(data, params, packing)?,
        depth => return Err(ShockwaveError::UnsupportedDepth(depth)),
    };

    Ok(DecodedBitmap {
        width: params.width as u32,
        height: params.height as u32,
        pixels,
        packing,
    })
}

/// Decode a BITD payload straight to PNG bytes
pub fn convert_bitmap(
    data: &[u8],
    params: &BitmapParams,
    palettes: &PaletteRegistry,
) -> Result<Vec<u8>> {
    decode_bitd(data, params, palettes)?.to_png()
}

/// Unpacked index data, zero-padded to the raw size
fn indexed_bytes(data: &[u8], params: &BitmapParams, packing: Packing) -> Result<Vec<u8>> {
    let mut bytes = match packing {
        Packing::Raw => data.to_vec(),
        Packing::RunLength => packbits::unpack(data)?,
    };
    let expected = params.raw_len();
    if bytes.len() < expected {
        tracing::warn!(
            "BITD: decoded {} bytes, expected {}; padding",
            bytes.len(),
            expected
        );
        bytes.resize(expected, 0);
    }
    Ok(bytes)
}

fn rgba_buffer(params: &BitmapParams) -> Vec<u8> {
    Vec::with_capacity(params.width as usize * params.height as usize * 4)
}

// ============================================================================
// Indexed depths
// ============================================================================

fn decode_1bit(data: &[u8], params: &BitmapParams) -> Vec<u8> {
    let stride = params.stored_width();
    let mut pixels = rgba_buffer(params);
    for y in 0..params.height as usize {
        for x in 0..params.width as usize {
            let bit = y * stride + x;
            let set = data[bit / 8] & (0x80 >> (bit % 8)) != 0;
            let v = if set { 255 } else { 0 };
            pixels.extend_from_slice(&[v, v, v, 255]);
        }
    }
    pixels
}

fn decode_2bit(data: &[u8], params: &BitmapParams) -> Vec<u8> {
    let width = params.width as usize;
    let mut pixels = rgba_buffer(params);
    for index in 0..width * params.height as usize {
        let shift = (3 - index % 4) * 2;
        let v = ((data[index / 4] >> shift) & 0x03) * 85;
        pixels.extend_from_slice(&[v, v, v, 255]);
    }
    pixels
}

fn decode_4bit(data: &[u8], params: &BitmapParams, palette: &Palette) -> Vec<u8> {
    let stride = params.stored_width();
    let mut pixels = rgba_buffer(params);
    for y in 0..params.height as usize {
        for x in 0..params.width as usize {
            let byte = data[(y * stride + x) / 2];
            let index = if x % 2 == 0 { byte >> 4 } else { byte & 0x0F };
            let [r, g, b] = palette.get(index);
            pixels.extend_from_slice(&[r, g, b, 255]);
        }
    }
    pixels
}

fn decode_8bit(data: &[u8], params: &BitmapParams, palette: &Palette) -> Vec<u8> {
    let count = params.width as usize * params.height as usize;
    let mut pixels = rgba_buffer(params);
    for &index in &data[..count] {
        let [r, g, b] = palette.get(index);
        pixels.extend_from_slice(&[r, g, b, 255]);
    }
    pixels
}

// ============================================================================
// Direct color depths
// ============================================================================

fn pad_pixels(mut pixels: Vec<u8>, params: &BitmapParams) -> Vec<u8> {
    let expected = params.width as usize * params.height as usize * 4;
    if pixels.len() < expected {
        tracing::warn!(
            "BITD: decoded {} of {} pixels; padding",
            pixels.len() / 4,
            expected / 4
        );
    }
    pixels.resize(expected, 0);
    pixels
}

fn decode_24bit(data: &[u8], params: &BitmapParams, packing: Packing) -> Result<Vec<u8>> {
    let width = params.width as usize;
    let mut pixels = rgba_buffer(params);
    match packing {
        Packing::Raw => {
            for rgb in data.chunks_exact(3) {
                pixels.extend_from_slice(&[rgb[0], rgb[1], rgb[2], 255]);
            }
        }
        Packing::RunLength => {
            // Scanline holds the R plane, then G, then B
            packbits::unpack_scanlines(data, width, 3, |line| {
                for x in 0..width {
                    pixels.extend_from_slice(&[line[x], line[x + width], line[x + width * 2], 255]);
                }
            })?;
        }
    }
    Ok(pad_pixels(pixels, params))
}

fn decode_32bit(data: &[u8], params: &BitmapParams, packing: Packing) -> Result<Vec<u8>> {
    let width = params.width as usize;
    let mut pixels = rgba_buffer(params);
    match packing {
        Packing::Raw => {
            // Each group is rotated with its first byte complemented, then
            // read as A,R,G,B with alpha complemented again
            for group in data.chunks_exact(4) {
                let argb = [group[1], group[2], group[3], 255 - group[0]];
                pixels.extend_from_slice(&[argb[1], argb[2], argb[3], 255 - argb[0]]);
            }
        }
        Packing::RunLength => {
            // Scanline holds the A plane, then R, G and B
            packbits::unpack_scanlines(data, width, 4, |line| {
                for x in 0..width {
                    pixels.extend_from_slice(&[
                        line[x + width],
                        line[x + width * 2],
                        line[x + width * 3],
                        255 - line[x],
                    ]);
                }
            })?;
        }
    }
    Ok(pad_pixels(pixels, params))
}
