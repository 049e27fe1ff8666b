//! Photo preparation for community posts.
//!
//! The shell hands over whatever the picker returned. Before upload the core
//! decodes it under allocation limits, downsizes it so the longest side fits
//! [`MAX_UPLOAD_DIMENSION`], drops alpha and metadata, and re-encodes as JPEG.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, GenericImageView, ImageEncoder, ImageReader, Limits};
use thiserror::Error;
use tracing::debug;

use crate::{
    JPEG_QUALITY, MAX_IMAGE_ALLOC, MAX_IMAGE_DIMENSION, MAX_UPLOAD_DIMENSION,
    MAX_UPLOAD_IMAGE_BYTES,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImagePrepError {
    #[error("photo is empty")]
    Empty,

    #[error("photo too large: {size} bytes, max {max_size}")]
    TooLarge { size: usize, max_size: usize },

    #[error("photo dimensions too large: {width}x{height}, max {max}")]
    DimensionsTooLarge { width: u32, height: u32, max: u32 },

    #[error("unsupported photo format")]
    UnsupportedFormat,

    #[error("failed to decode photo: {0}")]
    Decode(String),

    #[error("failed to encode photo: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl PreparedImage {
    pub const CONTENT_TYPE: &'static str = "image/jpeg";
}

pub fn prepare_upload(raw_bytes: &[u8]) -> Result<PreparedImage, ImagePrepError> {
    let img = decode_image(raw_bytes)?;
    let (w, h) = img.dimensions();

    let img = if w > MAX_UPLOAD_DIMENSION || h > MAX_UPLOAD_DIMENSION {
        img.resize(MAX_UPLOAD_DIMENSION, MAX_UPLOAD_DIMENSION, FilterType::Triangle)
    } else {
        img
    };

    let prepared = encode_jpeg(&img)?;
    debug!(
        input_bytes = raw_bytes.len(),
        output_bytes = prepared.bytes.len(),
        width = prepared.width,
        height = prepared.height,
        "photo prepared for upload"
    );
    Ok(prepared)
}

fn decode_image(raw_bytes: &[u8]) -> Result<DynamicImage, ImagePrepError> {
    if raw_bytes.is_empty() {
        return Err(ImagePrepError::Empty);
    }

    if raw_bytes.len() > MAX_UPLOAD_IMAGE_BYTES {
        return Err(ImagePrepError::TooLarge {
            size: raw_bytes.len(),
            max_size: MAX_UPLOAD_IMAGE_BYTES,
        });
    }

    let mut reader = ImageReader::new(Cursor::new(raw_bytes))
        .with_guessed_format()
        .map_err(|e| ImagePrepError::Decode(e.to_string()))?;

    if reader.format().is_none() {
        return Err(ImagePrepError::UnsupportedFormat);
    }

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| ImagePrepError::Decode(e.to_string()))?;
    if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
        return Err(ImagePrepError::DimensionsTooLarge {
            width,
            height,
            max: MAX_IMAGE_DIMENSION,
        });
    }

    // `into_dimensions` consumed the first reader.
    reader = ImageReader::new(Cursor::new(raw_bytes))
        .with_guessed_format()
        .map_err(|e| ImagePrepError::Decode(e.to_string()))?;

    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
    limits.max_image_height = Some(MAX_IMAGE_DIMENSION);
    limits.max_alloc = Some(MAX_IMAGE_ALLOC);
    reader.limits(limits);

    reader
        .decode()
        .map_err(|e| ImagePrepError::Decode(e.to_string()))
}

fn encode_jpeg(img: &DynamicImage) -> Result<PreparedImage, ImagePrepError> {
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    if width == 0 || height == 0 {
        return Err(ImagePrepError::Encode("zero dimension".into()));
    }

    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY)
        .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
        .map_err(|e| ImagePrepError::Encode(e.to_string()))?;

    Ok(PreparedImage {
        bytes,
        width,
        height,
    })
}
