//! End-to-end near-duplicate scenarios.
//!
//! These tests run generated images through encode, fingerprint and decide,
//! checking that re-encoded or lightly transformed copies are caught while
//! unrelated images pass.

use image::{DynamicImage, GenericImageView, ImageBuffer, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use neardup_core::{
    compute_fingerprint, hamming_distance, is_near_duplicate, Fingerprint, FingerprintHasher,
    FingerprintKind, NeardupError, Threshold,
};

/// Threshold used by the upload path in these scenarios.
const THRESHOLD: u32 = 3;

/// Looser bound for resizing and mild compression of structured images.
const TRANSFORM_THRESHOLD: u32 = 8;

fn solid(colour: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_pixel(10, 10, Rgb(colour)))
}

/// Create a test image with recognizable patterns.
fn create_test_image(width: u32, height: u32) -> RgbImage {
    ImageBuffer::from_fn(width, height, |x, y| {
        let r = ((x as f32 / width as f32) * 255.0) as u8;
        let g = ((y as f32 / height as f32) * 255.0) as u8;
        let b = (((x + y) as f32 / (width + height) as f32) * 200.0) as u8;
        Rgb([r, g, b])
    })
}

fn encode_png(img: &DynamicImage) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png)
        .expect("PNG encoding failed");
    buffer.into_inner()
}

/// Encode an image as JPEG with the specified quality (1-100).
fn encode_jpeg(img: &DynamicImage, quality: u8) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
    img.write_with_encoder(encoder)
        .expect("JPEG encoding failed");
    buffer.into_inner()
}

fn fingerprint(bytes: &[u8]) -> Fingerprint {
    compute_fingerprint(bytes).expect("fingerprinting failed")
}

// ============================================================================
// Red/blue upload scenario
// ============================================================================

#[test]
fn test_reencoded_jpeg_is_duplicate_of_stored_png() {
    let h1 = fingerprint(&encode_png(&solid([255, 0, 0])));
    let existing = vec![(h1, "imgA")];

    let jpeg = encode_jpeg(&solid([255, 0, 0]), 95);
    let candidate = fingerprint(&jpeg);
    assert_eq!(candidate.kind(), FingerprintKind::Perceptual);

    let found = is_near_duplicate(&candidate, existing, Threshold::new(THRESHOLD).unwrap());
    assert_eq!(found, Some("imgA"));
}

#[test]
fn test_unrelated_blue_png_is_not_duplicate() {
    let h1 = fingerprint(&encode_png(&solid([255, 0, 0])));
    let existing = vec![(h1, "imgA")];

    let candidate = fingerprint(&encode_png(&solid([0, 0, 255])));
    let found = is_near_duplicate(&candidate, existing, Threshold::new(THRESHOLD).unwrap());
    assert_eq!(found, None);
}

// ============================================================================
// Fingerprint properties
// ============================================================================

#[test]
fn test_fingerprint_is_deterministic() {
    let bytes = encode_png(&DynamicImage::ImageRgb8(create_test_image(64, 64)));
    assert_eq!(fingerprint(&bytes), fingerprint(&bytes));

    let text = b"plain text, twice";
    assert_eq!(fingerprint(text), fingerprint(text));
}

#[test]
fn test_self_distance_and_symmetry() {
    let a = fingerprint(&encode_png(&DynamicImage::ImageRgb8(create_test_image(64, 48))));
    let b = fingerprint(&encode_png(&solid([12, 200, 80])));
    let c = fingerprint(b"not an image");

    for f in [&a, &b, &c] {
        assert_eq!(f.distance(f), 0);
        for g in [&a, &b, &c] {
            assert_eq!(f.distance(g), g.distance(f));
        }
    }
}

#[test]
fn test_text_input_is_marked_fallback() {
    let fp = fingerprint(b"# Shopping list\n- eggs\n- milk\n");
    assert!(fp.is_fallback());
    assert_eq!(fp.kind(), FingerprintKind::Fallback);
    assert!(fp.as_str().len() < neardup_core::PERCEPTUAL_HEX_LEN);
}

#[test]
fn test_empty_input_is_invalid() {
    assert!(matches!(
        compute_fingerprint(&[]),
        Err(NeardupError::InvalidInput(_))
    ));
}

#[test]
fn test_length_mismatch_distance() {
    assert_eq!(hamming_distance("abcd", "abcdef"), 2);
}

// ============================================================================
// Robustness
// ============================================================================

#[test]
fn test_jpeg_compression_90_stays_close() {
    let original = DynamicImage::ImageRgb8(create_test_image(256, 256));
    let a = fingerprint(&encode_png(&original));
    let b = fingerprint(&encode_jpeg(&original, 90));

    let distance = a.distance(&b);
    println!("JPEG 90% quality - Hamming distance: {}", distance);
    assert!(
        distance <= TRANSFORM_THRESHOLD,
        "JPEG 90% compression should preserve similarity (distance: {})",
        distance
    );
}

#[test]
fn test_resize_half_stays_close() {
    let original = DynamicImage::ImageRgb8(create_test_image(256, 256));
    let (width, height) = original.dimensions();
    let resized = original.resize_exact(
        width / 2,
        height / 2,
        image::imageops::FilterType::Lanczos3,
    );

    let a = fingerprint(&encode_png(&original));
    let b = fingerprint(&encode_png(&resized));

    let distance = a.distance(&b);
    println!("Resize 50% - Hamming distance: {}", distance);
    assert!(
        distance <= TRANSFORM_THRESHOLD,
        "Resizing should preserve similarity (distance: {})",
        distance
    );
}

#[test]
fn test_small_crop_stays_close() {
    let original = DynamicImage::ImageRgb8(create_test_image(256, 256));
    // Trim 4px (about 3%) off every edge
    let cropped = original.crop_imm(4, 4, 248, 248);

    let a = fingerprint(&encode_png(&original));
    let b = fingerprint(&encode_png(&cropped));

    let distance = a.distance(&b);
    println!("Crop 3% - Hamming distance: {}", distance);
    assert!(
        distance <= TRANSFORM_THRESHOLD,
        "Small crops should preserve similarity (distance: {})",
        distance
    );
}

#[test]
fn test_upside_down_image_is_far() {
    let original = DynamicImage::ImageRgb8(create_test_image(256, 256));
    let flipped = original.flipv();

    let a = fingerprint(&encode_png(&original));
    let b = fingerprint(&encode_png(&flipped));

    let distance = a.distance(&b);
    println!("Flipped vertically - Hamming distance: {}", distance);
    assert!(
        distance > TRANSFORM_THRESHOLD,
        "Flipped image should not look like a near-duplicate (distance: {})",
        distance
    );
}

#[test]
fn test_fallback_never_matches_perceptual_by_default() {
    let perceptual = fingerprint(&encode_png(&solid([255, 0, 0])));
    let fallback = fingerprint(b"some bytes that are not an image");

    let generous = Threshold::new(neardup_core::MAX_THRESHOLD).unwrap();
    assert_eq!(
        is_near_duplicate(&fallback, vec![(perceptual.clone(), "p")], generous),
        None
    );
    assert_eq!(is_near_duplicate(&perceptual, vec![(fallback, "f")], generous), None);
}

#[test]
fn test_identical_fallback_bytes_still_match() {
    let hasher = FingerprintHasher::default();
    let a = hasher.fingerprint(b"corrupt upload").unwrap();
    let b = hasher.fingerprint(b"corrupt upload").unwrap();

    assert_eq!(
        is_near_duplicate(&a, vec![(b, "stored")], Threshold::default()),
        Some("stored")
    );
}
