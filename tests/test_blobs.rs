//! Integration tests for mask cleaning and blob extraction.
//!
//! Tests cover:
//! - Area filtering and counting
//! - External contours only
//! - Chain simplification and polygon area
//! - Morphological cleaning of speckles and holes
//! - The 5x5 elliptical closing kernel

mod common;

use image::Luma;
use imageproc::point::Point;
use roiwatch::DetectionError;
use roiwatch::detection::contours::{DEFAULT_MIN_AREA, find_blobs, polygon_area, simplify_chain};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{close, grayscale_dilate};
use roiwatch::detection::morphology::{clean, ellipse_kernel, fill_gaps};

use common::*;

#[test]
fn test_area_threshold_filters_small_regions() -> anyhow::Result<()> {
    // 31x21 encloses 30*20 = 600, 21x21 encloses 20*20 = 400
    let mask = mask_with_rects(200, 100, &[(10, 10, 31, 21), (100, 40, 21, 21)]);

    let blobs = find_blobs(&mask, DEFAULT_MIN_AREA)?;
    let summary = DetectionSummary::from_blobs(&blobs);

    assert_eq!(blobs.len(), 1);
    assert_eq!(summary.count, blobs.len());
    assert_eq!(summary.status, Status::Motion);
    assert_eq!(blobs[0].area, 600.0);
    assert_eq!(
        blobs[0].bbox,
        BoundingBox {
            x: 10,
            y: 10,
            width: 31,
            height: 21
        }
    );
    Ok(())
}

#[test]
fn test_area_equal_to_threshold_is_noise() -> anyhow::Result<()> {
    let mask = mask_with_rects(100, 100, &[(10, 10, 26, 21)]);

    // 25 * 20 = 500, not strictly above the threshold
    assert!(find_blobs(&mask, 500.0)?.is_empty());
    assert_eq!(find_blobs(&mask, 499.0)?.len(), 1);
    Ok(())
}

#[test]
fn test_blobs_in_discovery_order() -> anyhow::Result<()> {
    let mask = mask_with_rects(200, 200, &[(120, 20, 40, 40), (10, 100, 40, 40), (10, 10, 40, 40)]);

    let blobs = find_blobs(&mask, DEFAULT_MIN_AREA)?;
    let origins: Vec<(u32, u32)> = blobs.iter().map(|b| (b.bbox.x, b.bbox.y)).collect();

    assert_eq!(origins, vec![(10, 10), (120, 20), (10, 100)]);
    // Same mask, same answer
    assert_eq!(find_blobs(&mask, DEFAULT_MIN_AREA)?, blobs);
    Ok(())
}

#[test]
fn test_nested_regions_are_ignored() -> anyhow::Result<()> {
    // Filled square with a hole, and an island inside the hole
    let mut mask = mask_with_rects(100, 100, &[(10, 10, 60, 60)]);
    for y in 20..60 {
        for x in 20..60 {
            mask.put_pixel(x, y, Luma([0]));
        }
    }
    for y in 25..55 {
        for x in 25..55 {
            mask.put_pixel(x, y, Luma([255]));
        }
    }

    let blobs = find_blobs(&mask, DEFAULT_MIN_AREA)?;

    assert_eq!(blobs.len(), 1);
    assert_eq!(blobs[0].bbox.width, 60);
    Ok(())
}

#[test]
fn test_empty_mask_has_no_blobs() -> anyhow::Result<()> {
    let blobs = find_blobs(&gray_flat(50, 50, 0), DEFAULT_MIN_AREA)?;
    assert!(blobs.is_empty());
    assert_eq!(DetectionSummary::from_blobs(&blobs).status, Status::NoMotion);
    Ok(())
}

#[test]
fn test_non_binary_mask_is_rejected() {
    let mut mask = mask_with_rects(20, 20, &[(2, 2, 5, 5)]);
    mask.put_pixel(12, 3, Luma([127]));

    let err = find_blobs(&mask, DEFAULT_MIN_AREA).unwrap_err();

    assert_eq!(err, DetectionError::NonBinaryMask { x: 12, y: 3, value: 127 });
}

#[test]
fn test_simplify_chain_keeps_corners() {
    let mut ring = Vec::new();
    for x in 0..5 {
        ring.push(Point::new(x, 0));
    }
    for y in 1..4 {
        ring.push(Point::new(4, y));
    }
    for x in (0..5).rev() {
        ring.push(Point::new(x, 4));
    }
    for y in (1..4).rev() {
        ring.push(Point::new(0, y));
    }

    let corners = simplify_chain(&ring);

    assert_eq!(
        corners,
        vec![Point::new(0, 0), Point::new(4, 0), Point::new(4, 4), Point::new(0, 4)]
    );
    assert_eq!(polygon_area(&corners), 16.0);
    assert_eq!(polygon_area(&ring), 16.0);
}

#[test]
fn test_clean_removes_speckles_and_fills_holes() {
    let mut mask = mask_with_rects(80, 80, &[(20, 20, 20, 20)]);
    mask.put_pixel(30, 30, Luma([0]));
    mask.put_pixel(5, 5, Luma([255]));
    mask.put_pixel(70, 12, Luma([255]));

    let cleaned = clean(&mask);

    // Speckles gone
    assert_eq!(cleaned.get_pixel(5, 5)[0], 0);
    assert_eq!(cleaned.get_pixel(70, 12)[0], 0);
    // Hole filled
    assert_eq!(cleaned.get_pixel(30, 30)[0], 255);
    // Grown by two pixels on each side
    assert_eq!(cleaned.get_pixel(18, 30)[0], 255);
    assert_eq!(cleaned.get_pixel(41, 30)[0], 255);
    assert_eq!(cleaned.get_pixel(17, 30)[0], 0);
    assert_eq!(cleaned.get_pixel(42, 30)[0], 0);
    assert!(cleaned.pixels().all(|p| p[0] == 0 || p[0] == 255));
}

#[test]
fn test_clean_keeps_region_a_single_blob() -> anyhow::Result<()> {
    let mask = mask_with_rects(120, 120, &[(30, 30, 40, 40)]);

    let blobs = find_blobs(&clean(&mask), DEFAULT_MIN_AREA)?;

    assert_eq!(blobs.len(), 1);
    assert_eq!(blobs[0].bbox.x, 28);
    assert_eq!(blobs[0].bbox.width, 44);
    Ok(())
}

#[test]
fn test_ellipse_kernel_shape() {
    let mut point = gray_flat(9, 9, 0);
    point.put_pixel(4, 4, Luma([255]));

    let spread = grayscale_dilate(&point, &ellipse_kernel());

    assert_eq!(spread.pixels().filter(|p| p[0] == 255).count(), 17);
    for (x, y) in [(2, 3), (6, 3), (2, 5), (6, 5), (4, 2), (4, 6)] {
        assert_eq!(spread.get_pixel(x, y)[0], 255, "({}, {}) missing", x, y);
    }
    for (x, y) in [(2, 2), (6, 2), (2, 6), (6, 6), (3, 2), (5, 6)] {
        assert_eq!(spread.get_pixel(x, y)[0], 0, "({}, {}) set", x, y);
    }
}

#[test]
fn test_closing_bridges_diagonal_gap() {
    // Two strokes two rows apart with a two column gap between their ends
    let mask = mask_with_rects(20, 20, &[(3, 8, 5, 1), (10, 10, 4, 1)]);

    let filled = fill_gaps(&mask);
    let diamond = close(&mask, Norm::L1, 2);

    assert_eq!(filled.get_pixel(8, 9)[0], 255);
    assert_eq!(filled.get_pixel(9, 9)[0], 255);
    assert_eq!(diamond.get_pixel(8, 9)[0], 0);
    assert_eq!(diamond.get_pixel(9, 9)[0], 0);
    // Closing never removes foreground
    for (x, y, p) in mask.enumerate_pixels() {
        if p[0] == 255 {
            assert_eq!(filled.get_pixel(x, y)[0], 255);
        }
    }
}
