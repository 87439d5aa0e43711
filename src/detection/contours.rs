use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::point::Point;

use crate::error::DetectionError;
use crate::models::{Blob, BoundingBox};

/// Blobs with an area at or below this are treated as noise.
pub const DEFAULT_MIN_AREA: f64 = 500.0;

/// Find the outermost foreground regions of a binary mask.
///
/// Holes and regions nested inside holes are ignored. Each external border
/// is reduced to its turning points, its enclosed area measured, and the
/// survivors are returned in discovery (raster) order.
pub fn find_blobs(mask: &GrayImage, min_area: f64) -> Result<Vec<Blob>, DetectionError> {
    ensure_binary(mask)?;

    let blobs = find_contours::<i32>(mask)
        .into_iter()
        .filter(|contour| matches!(contour.border_type, BorderType::Outer) && contour.parent.is_none())
        .filter_map(|contour| {
            let area = polygon_area(&simplify_chain(&contour.points));
            if area <= min_area {
                return None;
            }
            bounding_box(&contour.points).map(|bbox| Blob { bbox, area })
        })
        .collect();

    Ok(blobs)
}

/// Drop every point lying in the middle of a straight horizontal, vertical or
/// diagonal run of a closed chain.
pub fn simplify_chain(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let cur = points[i];
            let next = points[(i + 1) % n];
            (cur.x - prev.x, cur.y - prev.y) != (next.x - cur.x, next.y - cur.y)
        })
        .map(|i| points[i])
        .collect()
}

/// Area enclosed by a closed polygon (shoelace formula).
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let twice_area: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();

    twice_area.abs() as f64 / 2.0
}

fn bounding_box(points: &[Point<i32>]) -> Option<BoundingBox> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);

    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    Some(BoundingBox {
        x: min_x as u32,
        y: min_y as u32,
        width: (max_x - min_x + 1) as u32,
        height: (max_y - min_y + 1) as u32,
    })
}

fn ensure_binary(mask: &GrayImage) -> Result<(), DetectionError> {
    match mask.enumerate_pixels().find(|(_, _, p)| p[0] != 0 && p[0] != 255) {
        Some((x, y, p)) => Err(DetectionError::NonBinaryMask { x, y, value: p[0] }),
        None => Ok(()),
    }
}
