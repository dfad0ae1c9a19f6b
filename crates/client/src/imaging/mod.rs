//! Raster decode, background removal and PNG data-URL encoding.
//!
//! Everything here is CPU-bound and synchronous. Async callers run it inside
//! `spawn_blocking`.

pub mod background;

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};

pub use background::{Rgb, color_distance, feathered_alpha, remove_background, sample_background};

use giftlist_core::Error;

/// Prefix of every payload produced by [`encode_png_data_url`].
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Decode any supported raster format into an RGBA pixel buffer.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage, Error> {
    let image = image::load_from_memory(bytes).map_err(|e| Error::DecodeFailed(format!("failed to decode image: {e}")))?;
    Ok(image.to_rgba8())
}

/// Encode an RGBA buffer as PNG. Alpha is preserved.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, Error> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(Error::EncodeFailed("image has no pixels".into()));
    }

    let mut buffer = Vec::new();
    PngEncoder::new_with_quality(Cursor::new(&mut buffer), CompressionType::Default, FilterType::Adaptive)
        .write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8)
        .map_err(|e| Error::EncodeFailed(format!("failed to encode PNG: {e}")))?;

    Ok(buffer)
}

/// Encode an RGBA buffer as a `data:image/png;base64,` URL.
pub fn encode_png_data_url(image: &RgbaImage) -> Result<String, Error> {
    let png = encode_png(image)?;
    Ok(format!("{PNG_DATA_URL_PREFIX}{}", STANDARD.encode(png)))
}

/// Decode the PNG bytes behind a data URL produced by [`encode_png_data_url`].
pub fn decode_png_data_url(data_url: &str) -> Result<RgbaImage, Error> {
    let encoded = data_url
        .strip_prefix(PNG_DATA_URL_PREFIX)
        .ok_or_else(|| Error::DecodeFailed("not a PNG data URL".into()))?;
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| Error::DecodeFailed(format!("invalid base64: {e}")))?;
    decode(&bytes)
}
