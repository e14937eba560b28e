//! Perceptual fingerprinting for images.
//!
//! This module computes fingerprints that stay close (in Hamming distance)
//! for visually similar images, even after re-encoding, compression or a
//! small resize.
//!
//! # Algorithm
//!
//! The 64-bit digest has two parts:
//!
//! - **48 structural bits**: a mean (average) hash over an 8x6 grayscale
//!   thumbnail. Each bit says whether a cell is at least as bright as the
//!   thumbnail mean.
//! - **16 colour bits**: mean red, green, blue and luma, each rounded to one
//!   of five levels and thermometer-coded into a nibble (level `k` sets the
//!   low `k` bits). Two levels `k` apart differ in exactly `k` bits, so a
//!   value sitting on a level boundary never costs more than one bit.
//!
//! The colour part is what separates images with no structure at all, e.g.
//! flat fills of different colours, which share an identical mean hash.
//!
//! # Bounded decoding
//!
//! Input is never decoded when it exceeds `max_input_bytes`, and the decoder
//! runs under [`image::Limits`] so adversarial headers cannot force huge
//! allocations. Every failure on the pixel path degrades to a
//! [fallback fingerprint](super::fallback) instead of an error.
//!
//! # Usage
//!
//! ```no_run
//! use neardup_core::fingerprint::FingerprintHasher;
//!
//! let image_data = std::fs::read("image.jpg").unwrap();
//! let hasher = FingerprintHasher::default();
//! let fp1 = hasher.fingerprint(&image_data).unwrap();
//!
//! let image_data2 = std::fs::read("image2.jpg").unwrap();
//! let fp2 = hasher.fingerprint(&image_data2).unwrap();
//! let similar = fp1.distance(&fp2) <= 5;
//! ```

use std::io::Cursor;
use std::time::Duration;

use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageFormat, ImageReader, Limits};
use image_hasher::{HashAlg, HasherConfig};
use tracing::{debug, instrument, warn};

use super::{fallback_fingerprint, FallbackReason, Fingerprint, Fingerprinted};
use crate::error::{NeardupError, Result};

/// Perceptual digest size in bytes.
pub const PERCEPTUAL_HASH_SIZE: usize = 8;

/// Perceptual digest size in bits.
pub const PERCEPTUAL_HASH_BITS: u32 = (PERCEPTUAL_HASH_SIZE * 8) as u32;

/// Length of a perceptual fingerprint in hex characters.
pub const PERCEPTUAL_HEX_LEN: usize = PERCEPTUAL_HASH_SIZE * 2;

/// Structural hash grid (8x6 = 48 bits).
const GRID_WIDTH: u32 = 8;
const GRID_HEIGHT: u32 = 6;
const STRUCTURE_BYTES: usize = (GRID_WIDTH * GRID_HEIGHT / 8) as usize;

/// Thumbnail edge used to average colours.
const COLOUR_SAMPLE_EDGE: u32 = 8;

/// Highest colour quantisation level (levels are `0..=COLOUR_LEVELS`).
const COLOUR_LEVELS: u32 = 4;

/// Resource ceilings applied before and during decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HasherLimits {
    /// Inputs larger than this are never decoded.
    pub max_input_bytes: usize,
    /// Maximum accepted width and height in pixels.
    pub max_dimension: u32,
    /// Maximum decoder allocation in bytes.
    pub max_alloc_bytes: u64,
    /// Upper bound on decode time for the async path.
    pub decode_timeout: Duration,
}

impl Default for HasherLimits {
    fn default() -> Self {
        Self {
            max_input_bytes: 25 * 1024 * 1024,
            max_dimension: 8192,
            max_alloc_bytes: 256 * 1024 * 1024,
            decode_timeout: Duration::from_secs(10),
        }
    }
}

/// Fingerprint computation with bounded decoding.
#[derive(Debug, Clone, Default)]
pub struct FingerprintHasher {
    limits: HasherLimits,
}

impl FingerprintHasher {
    pub fn new(limits: HasherLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &HasherLimits {
        &self.limits
    }

    /// Compute a fingerprint from raw image bytes.
    ///
    /// Fails only on empty input. Undecodable input yields a fallback
    /// fingerprint.
    pub fn fingerprint(&self, data: &[u8]) -> Result<Fingerprint> {
        self.fingerprint_detailed(data).map(|f| f.fingerprint)
    }

    /// Like [`fingerprint`](Self::fingerprint), but also reports why a
    /// fallback was taken.
    #[instrument(level = "debug", skip_all, fields(bytes = data.len()))]
    pub fn fingerprint_detailed(&self, data: &[u8]) -> Result<Fingerprinted> {
        if data.is_empty() {
            return Err(NeardupError::InvalidInput(
                "cannot fingerprint an empty byte sequence".into(),
            ));
        }

        if data.len() > self.limits.max_input_bytes {
            return Ok(degrade(data, FallbackReason::TooLarge));
        }

        match self.decode(data) {
            Ok(image) => {
                let fingerprint = self.hash_image(&image);
                debug!(fingerprint = %fingerprint, "Computed perceptual fingerprint");
                Ok(Fingerprinted::perceptual(fingerprint))
            }
            Err(reason) => Ok(degrade(data, reason)),
        }
    }

    /// Compute the perceptual fingerprint of an already decoded image.
    pub fn hash_image(&self, image: &DynamicImage) -> Fingerprint {
        let hasher = HasherConfig::new()
            .hash_size(GRID_WIDTH, GRID_HEIGHT)
            .hash_alg(HashAlg::Mean)
            .to_hasher();
        let structure = hasher.hash_image(image);

        let mut bytes = [0u8; PERCEPTUAL_HASH_SIZE];
        for (dst, src) in bytes[..STRUCTURE_BYTES]
            .iter_mut()
            .zip(structure.as_bytes())
        {
            *dst = *src;
        }
        bytes[STRUCTURE_BYTES..].copy_from_slice(&colour_signature(image).to_be_bytes());

        Fingerprint::perceptual(bytes)
    }

    /// Async variant that bounds decode time.
    ///
    /// Decoding runs on the blocking pool. If it does not finish within
    /// `decode_timeout` the result is a fallback with
    /// [`FallbackReason::TimedOut`]; the abandoned decode is discarded when it
    /// completes.
    #[cfg(feature = "async")]
    pub async fn fingerprint_with_timeout(&self, data: Vec<u8>) -> Result<Fingerprinted> {
        use std::sync::Arc;

        if data.is_empty() {
            return Err(NeardupError::InvalidInput(
                "cannot fingerprint an empty byte sequence".into(),
            ));
        }

        let data: Arc<[u8]> = Arc::from(data);
        let worker = self.clone();
        let shared = Arc::clone(&data);
        let task = tokio::task::spawn_blocking(move || worker.fingerprint_detailed(&shared));

        match tokio::time::timeout(self.limits.decode_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                warn!(error = %join_error, "Fingerprint worker failed");
                Ok(degrade(&data, FallbackReason::DecodeFailed))
            }
            Err(_) => Ok(degrade(&data, FallbackReason::TimedOut)),
        }
    }

    fn decode(&self, data: &[u8]) -> std::result::Result<DynamicImage, FallbackReason> {
        let mut reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|_| FallbackReason::UnrecognizedFormat)?;

        let format = reader.format().ok_or(FallbackReason::UnrecognizedFormat)?;
        if !is_hashable(format) {
            debug!(format = ?format, "Format not supported for perceptual hashing");
            return Err(FallbackReason::UnsupportedFormat);
        }

        let mut limits = Limits::default();
        limits.max_image_width = Some(self.limits.max_dimension);
        limits.max_image_height = Some(self.limits.max_dimension);
        limits.max_alloc = Some(self.limits.max_alloc_bytes);
        reader.limits(limits);

        debug!(format = ?format, "Decoding image");
        reader.decode().map_err(|e| match e {
            ImageError::Limits(_) => FallbackReason::LimitsExceeded,
            other => {
                debug!(error = %other, "Image decode failed");
                FallbackReason::DecodeFailed
            }
        })
    }
}

/// Compute a fingerprint for image data using default limits.
///
/// # Errors
///
/// [`NeardupError::InvalidInput`] if `image_data` is empty. Undecodable data
/// is not an error; it yields a fallback fingerprint.
pub fn compute_fingerprint(image_data: &[u8]) -> Result<Fingerprint> {
    FingerprintHasher::default().fingerprint(image_data)
}

/// Check if the provided bytes look like an image format we can hash
/// perceptually (PNG, JPEG, GIF or WebP).
pub fn is_supported_format(data: &[u8]) -> bool {
    image::guess_format(data).map(is_hashable).unwrap_or(false)
}

fn is_hashable(format: ImageFormat) -> bool {
    matches!(
        format,
        ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif | ImageFormat::WebP
    )
}

fn degrade(data: &[u8], reason: FallbackReason) -> Fingerprinted {
    let fingerprint = fallback_fingerprint(data);
    warn!(
        reason = %reason,
        fingerprint = %fingerprint,
        "Using byte-sampled fallback fingerprint"
    );
    Fingerprinted::fallback(fingerprint, reason)
}

/// Mean R, G, B and luma, each thermometer-coded into a nibble.
fn colour_signature(image: &DynamicImage) -> u16 {
    let sample = image.resize_exact(COLOUR_SAMPLE_EDGE, COLOUR_SAMPLE_EDGE, FilterType::Triangle);
    let rgb = sample.to_rgb8();
    let luma = sample.to_luma8();

    let count = u64::from(rgb.width()) * u64::from(rgb.height());
    let mut sums = [0u64; 3];
    for pixel in rgb.pixels() {
        for (sum, channel) in sums.iter_mut().zip(pixel.0) {
            *sum += u64::from(channel);
        }
    }
    let luma_sum: u64 = luma.pixels().map(|p| u64::from(p.0[0])).sum();

    let mean = |sum: u64| (sum / count.max(1)) as u8;
    let nibbles = [
        thermometer(mean(sums[0])),
        thermometer(mean(sums[1])),
        thermometer(mean(sums[2])),
        thermometer(mean(luma_sum)),
    ];

    nibbles
        .iter()
        .fold(0u16, |acc, nibble| (acc << 4) | u16::from(*nibble))
}

/// Round a channel value to `0..=COLOUR_LEVELS` and set that many low bits.
fn thermometer(value: u8) -> u8 {
    let level = (u32::from(value) * COLOUR_LEVELS + 127) / 255;
    ((1u32 << level) - 1) as u8
}
