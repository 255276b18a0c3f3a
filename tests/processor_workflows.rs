//! End-to-end processing through `BackgroundRemovalProcessor`

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use product_matte::{
    crop_to_content, remove_background, BackgroundRemovalProcessor, BoundingBox, Level,
    OutputFormat, PixelBuffer, RemovalConfig,
};
use std::io::Cursor;
use tempfile::TempDir;

const BACKDROP: Rgba<u8> = Rgba([250, 250, 250, 255]);
const PRODUCT: Rgba<u8> = Rgba([150, 30, 40, 255]);

/// 32x24 studio shot: red product at x 10..20, y 8..16, a light rim around it
fn studio_shot() -> RgbaImage {
    RgbaImage::from_fn(32, 24, |x, y| {
        if (10..20).contains(&x) && (8..16).contains(&y) {
            PRODUCT
        } else if (9..21).contains(&x) && (7..17).contains(&y) {
            Rgba([225, 222, 220, 255])
        } else {
            BACKDROP
        }
    })
}

fn encode(image: &RgbaImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgba8(image.clone())
            .to_rgb8()
            .write_to(&mut Cursor::new(&mut bytes), format)
            .unwrap(),
        _ => image.write_to(&mut Cursor::new(&mut bytes), format).unwrap(),
    }
    bytes
}

fn processor(config: RemovalConfig) -> BackgroundRemovalProcessor {
    BackgroundRemovalProcessor::new(config).unwrap()
}

#[test]
fn png_bytes_are_matted_with_metadata() {
    let result = processor(RemovalConfig::default())
        .process_bytes(&encode(&studio_shot(), ImageFormat::Png))
        .unwrap();

    assert_eq!(result.dimensions(), (32, 24));
    assert_eq!(result.original_dimensions, (32, 24));
    assert_eq!(result.image.get_pixel(0, 0)[3], 0);
    assert_eq!(*result.image.get_pixel(14, 12), PRODUCT);
    // rim is feathered at the medium level
    assert_eq!(result.image.get_pixel(9, 12)[3], Level::Medium.profile().feather_alpha);

    let metadata = &result.metadata;
    assert_eq!(metadata.level, Some(Level::Medium));
    assert_eq!(metadata.total_pixels, 32 * 24);
    assert_eq!(metadata.masked_pixels, 32 * 24 - 12 * 10);
    assert!(metadata.crop.is_none());
    assert!(result.mask.is_some());
    assert!(!result.is_fully_transparent());
}

#[test]
fn production_matches_shared_passes() {
    let config = RemovalConfig::builder()
        .level(Level::High)
        .crop(true)
        .crop_padding(3)
        .build()
        .unwrap();

    let result = processor(config.clone())
        .process_bytes(&encode(&studio_shot(), ImageFormat::Png))
        .unwrap();

    let buffer = PixelBuffer::from(studio_shot());
    let expected = crop_to_content(remove_background(buffer, config.level), config.crop_padding);

    assert_eq!(result.dimensions(), expected.dimensions());
    assert_eq!(result.image.as_raw(), expected.as_raw());
}

#[test]
fn process_buffer_matches_shared_passes() {
    for level in [Level::Low, Level::Medium, Level::High] {
        let config = RemovalConfig::builder().level(level).build().unwrap();
        let (buffer, report) =
            processor(config).process_buffer(PixelBuffer::from(studio_shot()));

        let expected = remove_background(PixelBuffer::from(studio_shot()), level);
        assert_eq!(buffer, expected, "level {level}");
        assert_eq!(report.total_pixels, 32 * 24);
    }
}

#[test]
fn crop_records_the_region() {
    let config = RemovalConfig::builder()
        .crop(true)
        .crop_padding(2)
        .build()
        .unwrap();
    let result = processor(config).process_image(DynamicImage::ImageRgba8(studio_shot())).unwrap();

    // visible content is the rim box x 9..=20, y 7..=16
    let expected = BoundingBox {
        left: 7,
        top: 5,
        right: 22,
        bottom: 18,
    };
    assert_eq!(result.metadata.crop, Some(expected));
    assert_eq!(result.dimensions(), (16, 14));
    // the mask still describes the uncropped frame
    assert_eq!(result.mask.as_ref().unwrap().dimensions, (32, 24));
}

#[test]
fn keep_background_only_crops() {
    let mut image = RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 0]));
    for x in 5..9 {
        image.put_pixel(x, 10, Rgba([255, 255, 255, 255]));
    }

    let config = RemovalConfig::builder()
        .remove_background(false)
        .crop(true)
        .crop_padding(1)
        .build()
        .unwrap();
    let result = processor(config)
        .process_bytes(&encode(&image, ImageFormat::Png))
        .unwrap();

    assert_eq!(result.dimensions(), (6, 3));
    assert!(result.mask.is_none());
    assert_eq!(result.metadata.level, None);
    assert_eq!(result.metadata.masked_pixels, 0);
    // white pixels survive when removal is off
    assert_eq!(*result.image.get_pixel(1, 1), Rgba([255, 255, 255, 255]));
}

#[test]
fn large_inputs_are_bounded() {
    let image = RgbaImage::from_pixel(120, 60, BACKDROP);
    let config = RemovalConfig::builder()
        .max_dimension(Some(40))
        .build()
        .unwrap();
    let result = processor(config)
        .process_image(DynamicImage::ImageRgba8(image.clone()))
        .unwrap();
    assert_eq!(result.dimensions(), (40, 20));
    assert_eq!(result.original_dimensions, (120, 60));
    assert!(result.is_fully_transparent());

    let unbounded = RemovalConfig::builder().max_dimension(None).build().unwrap();
    let result = processor(unbounded)
        .process_image(DynamicImage::ImageRgba8(image))
        .unwrap();
    assert_eq!(result.dimensions(), (120, 60));
}

#[test]
fn small_inputs_are_never_enlarged() {
    let config = RemovalConfig::builder()
        .max_dimension(Some(1000))
        .build()
        .unwrap();
    let result = processor(config)
        .process_image(DynamicImage::ImageRgba8(studio_shot()))
        .unwrap();
    assert_eq!(result.dimensions(), (32, 24));
}

/// Baseline JPEG with an APP1 Exif segment carrying `orientation`
fn jpeg_with_orientation(image: &RgbaImage, orientation: u8) -> Vec<u8> {
    let jpeg = encode(image, ImageFormat::Jpeg);
    let mut app1 = vec![0xFF, 0xE1, 0x00, 0x22];
    app1.extend_from_slice(b"Exif\0\0");
    app1.extend_from_slice(b"MM\0\x2A\0\0\0\x08");
    app1.extend_from_slice(&[0x00, 0x01]);
    app1.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01]);
    app1.extend_from_slice(&[0x00, orientation, 0x00, 0x00]);
    app1.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

    let mut bytes = jpeg[..2].to_vec();
    bytes.extend_from_slice(&app1);
    bytes.extend_from_slice(&jpeg[2..]);
    bytes
}

#[test]
fn exif_orientation_is_applied() {
    let image = RgbaImage::from_pixel(16, 8, BACKDROP);
    let bytes = jpeg_with_orientation(&image, 6);

    let result = processor(RemovalConfig::default()).process_bytes(&bytes).unwrap();
    assert_eq!(result.dimensions(), (8, 16));
    assert_eq!(result.original_dimensions, (16, 8));

    let config = RemovalConfig::builder().auto_orient(false).build().unwrap();
    let result = processor(config).process_bytes(&bytes).unwrap();
    assert_eq!(result.dimensions(), (16, 8));
}

#[test]
fn jpeg_output_is_flattened_over_white() {
    let result = processor(RemovalConfig::default())
        .process_image(DynamicImage::ImageRgba8(studio_shot()))
        .unwrap();
    let bytes = result.to_bytes(OutputFormat::Jpeg, 95).unwrap();

    let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg)
        .unwrap()
        .to_rgb8();
    assert_eq!(decoded.dimensions(), (32, 24));
    let corner = decoded.get_pixel(0, 0);
    assert!(corner.0.iter().all(|&c| c >= 245), "corner {corner:?}");
}

#[test]
fn png_output_keeps_transparency() {
    let result = processor(RemovalConfig::default())
        .process_image(DynamicImage::ImageRgba8(studio_shot()))
        .unwrap();
    let bytes = result.to_bytes(OutputFormat::Png, 90).unwrap();

    let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
    assert_eq!(decoded, result.image);
}

#[cfg(feature = "webp-support")]
#[test]
fn webp_output_is_lossless() {
    let result = processor(RemovalConfig::default())
        .process_image(DynamicImage::ImageRgba8(studio_shot()))
        .unwrap();
    let bytes = result.to_bytes(OutputFormat::WebP, 90).unwrap();

    let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::WebP)
        .unwrap()
        .to_rgba8();
    assert_eq!(decoded.dimensions(), result.dimensions());
    assert_eq!(decoded.get_pixel(14, 12), result.image.get_pixel(14, 12));
    assert_eq!(decoded.get_pixel(0, 0)[3], 0);
}

#[test]
fn raw_output_is_the_rgba_buffer() {
    let result = processor(RemovalConfig::default())
        .process_image(DynamicImage::ImageRgba8(studio_shot()))
        .unwrap();
    let raw = result.to_bytes(OutputFormat::Rgba8, 0).unwrap();
    assert_eq!(raw.len(), 32 * 24 * 4);
    assert_eq!(raw, result.to_rgba_bytes());
}

#[test]
fn files_round_trip_through_disk() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("shoe.png");
    std::fs::write(&input, encode(&studio_shot(), ImageFormat::Png)).unwrap();

    let mut result = processor(RemovalConfig::default()).process_file(&input).unwrap();
    assert_eq!(result.input_path.as_deref(), Some(input.to_str().unwrap()));

    let output = temp_dir.path().join("nested/out/shoe_matte.tiff");
    result.save_timed(&output, OutputFormat::Tiff, 90).unwrap();
    assert!(result.timings().image_encode_ms.is_some());

    let reloaded = image::open(&output).unwrap().to_rgba8();
    assert_eq!(reloaded, result.image);

    let mask_path = temp_dir.path().join("shoe_mask.png");
    result.mask.as_ref().unwrap().save_png(&mask_path).unwrap();
    let mask = image::open(&mask_path).unwrap().to_luma8();
    assert_eq!(mask.get_pixel(0, 0)[0], 255);
    assert_eq!(mask.get_pixel(14, 12)[0], 0);
}

#[test]
fn processor_is_shareable_across_threads() {
    let shared = std::sync::Arc::new(processor(RemovalConfig::default()));
    let bytes = std::sync::Arc::new(encode(&studio_shot(), ImageFormat::Png));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let shared = std::sync::Arc::clone(&shared);
            let bytes = std::sync::Arc::clone(&bytes);
            std::thread::spawn(move || shared.process_bytes(&bytes).unwrap().image)
        })
        .collect();

    let images: Vec<RgbaImage> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(images.windows(2).all(|pair| pair[0] == pair[1]));
}
