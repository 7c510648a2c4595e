//! Client-side image compression before upload
//!
//! Payloads over a size threshold are decoded, scaled down along their
//! longest dimension, and re-encoded as JPEG at a fixed quality. The
//! dimension cap shrinks iteratively until the result fits the threshold
//! or a floor is reached. Compression failure is never fatal: if decoding
//! or encoding fails, or the result is not actually smaller, the original
//! bytes are uploaded unchanged.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::io::Cursor;
use tracing::{debug, warn};

/// Configuration for pre-upload compression
#[derive(Debug, Clone)]
pub struct CompressionConfig {
    /// Payloads at or below this size are uploaded as-is
    pub size_threshold: usize,
    /// Starting cap on the longest image dimension
    pub max_dimension: u32,
    /// The dimension cap never shrinks below this
    pub min_dimension: u32,
    /// JPEG re-encode quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            size_threshold: 1_000_000,
            max_dimension: 1600,
            min_dimension: 320,
            jpeg_quality: 80,
        }
    }
}

impl CompressionConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the size threshold above which compression kicks in
    pub fn size_threshold(mut self, bytes: usize) -> Self {
        self.size_threshold = bytes;
        self
    }

    /// Set the starting cap on the longest dimension
    pub fn max_dimension(mut self, pixels: u32) -> Self {
        self.max_dimension = pixels;
        self
    }

    /// Set the JPEG quality
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }
}

/// Compresses oversized image payloads, falling back to the original
pub struct Compressor {
    config: CompressionConfig,
}

impl Compressor {
    /// Create a compressor with default settings
    pub fn new() -> Self {
        Self { config: CompressionConfig::default() }
    }

    /// Create a compressor with custom settings
    pub fn with_config(config: CompressionConfig) -> Self {
        Self { config }
    }

    /// Compress the payload if it exceeds the threshold
    ///
    /// Always returns bytes to upload; never an error.
    pub fn compress_if_needed(&self, bytes: &[u8]) -> Vec<u8> {
        if bytes.len() <= self.config.size_threshold {
            return bytes.to_vec();
        }

        match self.try_compress(bytes) {
            Some(compressed) if compressed.len() < bytes.len() => {
                debug!(
                    original = bytes.len(),
                    compressed = compressed.len(),
                    "payload compressed before upload"
                );
                compressed
            }
            Some(_) => {
                debug!(size = bytes.len(), "compression did not shrink payload, using original");
                bytes.to_vec()
            }
            None => {
                warn!(size = bytes.len(), "compression failed, uploading original bytes");
                bytes.to_vec()
            }
        }
    }

    /// Iteratively shrink the dimension cap until the encoded size fits
    fn try_compress(&self, bytes: &[u8]) -> Option<Vec<u8>> {
        let img = image::load_from_memory(bytes).ok()?;
        let mut cap = self.config.max_dimension;
        let mut best: Option<Vec<u8>> = None;

        loop {
            let encoded = self.encode_scaled(&img, cap)?;
            if encoded.len() <= self.config.size_threshold {
                return Some(encoded);
            }
            let better = best.as_ref().map_or(true, |b| encoded.len() < b.len());
            if better {
                best = Some(encoded);
            }
            if cap <= self.config.min_dimension {
                break;
            }
            cap = (cap * 4 / 5).max(self.config.min_dimension);
        }

        best
    }

    /// Scale the longest dimension down to `cap` and encode as JPEG
    fn encode_scaled(&self, img: &DynamicImage, cap: u32) -> Option<Vec<u8>> {
        let (width, height) = img.dimensions();
        let scaled = if width.max(height) > cap {
            img.resize(cap, cap, FilterType::Lanczos3)
        } else {
            img.clone()
        };

        let mut out = Vec::new();
        let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut out), self.config.jpeg_quality);
        scaled.write_with_encoder(encoder).ok()?;
        Some(out)
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}
