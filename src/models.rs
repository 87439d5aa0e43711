use image::Rgb;

/// Smallest width or height the ROI may shrink to.
pub const MIN_ROI_DIMENSION: i32 = 10;

/// Largest ROI width, height or offset magnitude, in pixels.
pub const MAX_ROI_EXTENT: i32 = 100_000;

/// Gap kept between the bottom edge of the ROI and the bottom of the frame.
pub const BOTTOM_MARGIN: i32 = 10;

pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Adjustable size and offset of the region of interest.
///
/// Offsets are relative to the bottom-center anchor computed for each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoiGeometry {
    pub width: i32,
    pub height: i32,
    pub x_offset: i32,
    pub y_offset: i32,
}

impl RoiGeometry {
    pub fn new(width: i32, height: i32, x_offset: i32, y_offset: i32) -> Self {
        Self {
            width: width.max(MIN_ROI_DIMENSION),
            height: height.max(MIN_ROI_DIMENSION),
            x_offset,
            y_offset,
        }
    }

    /// The geometry with every field forced into its valid range.
    pub fn bounded(&self) -> Self {
        Self {
            width: self.width.clamp(MIN_ROI_DIMENSION, MAX_ROI_EXTENT),
            height: self.height.clamp(MIN_ROI_DIMENSION, MAX_ROI_EXTENT),
            x_offset: self.x_offset.clamp(-MAX_ROI_EXTENT, MAX_ROI_EXTENT),
            y_offset: self.y_offset.clamp(-MAX_ROI_EXTENT, MAX_ROI_EXTENT),
        }
    }
}

impl Default for RoiGeometry {
    fn default() -> Self {
        Self::new(300, 300, 0, 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Four corners of the ROI, clockwise from top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoiPolygon {
    pub corners: [Point; 4],
}

impl RoiPolygon {
    pub fn top_left(&self) -> Point {
        self.corners[0]
    }

    pub fn bottom_right(&self) -> Point {
        self.corners[2]
    }

    pub fn width(&self) -> i32 {
        self.corners[1].x - self.corners[0].x
    }

    pub fn height(&self) -> i32 {
        self.corners[3].y - self.corners[0].y
    }

    /// Whether the pixel lies inside the filled polygon, edges included.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let tl = self.top_left();
        let br = self.bottom_right();
        x >= tl.x && x <= br.x && y >= tl.y && y <= br.y
    }
}

/// Bounding box in frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A connected foreground region that survived area filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub bbox: BoundingBox,
    pub area: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Motion,
    NoMotion,
}

impl Status {
    pub fn label(&self) -> &'static str {
        match self {
            Status::Motion => "motion detected",
            Status::NoMotion => "no motion",
        }
    }

    pub fn color(&self) -> Rgb<u8> {
        match self {
            Status::Motion => RED,
            Status::NoMotion => GREEN,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionSummary {
    pub count: usize,
    pub status: Status,
}

impl DetectionSummary {
    pub fn from_blobs(blobs: &[Blob]) -> Self {
        let status = if blobs.is_empty() {
            Status::NoMotion
        } else {
            Status::Motion
        };
        Self {
            count: blobs.len(),
            status,
        }
    }

    pub fn status_label(&self) -> &'static str {
        self.status.label()
    }

    pub fn status_color(&self) -> Rgb<u8> {
        self.status.color()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextOverlay {
    pub text: String,
    pub origin: Point,
    pub color: Rgb<u8>,
    pub scale: f32,
}

/// Drawing instructions handed to the render boundary
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub boxes: Vec<BoundingBox>,
    pub box_color: Rgb<u8>,
    pub roi_outline: RoiPolygon,
    pub outline_color: Rgb<u8>,
    pub thickness: u32,
    pub texts: Vec<TextOverlay>,
}

impl Overlay {
    pub fn new(polygon: RoiPolygon, blobs: &[Blob], summary: &DetectionSummary) -> Self {
        let texts = vec![
            TextOverlay {
                text: format!("Status: {}", summary.status_label()),
                origin: Point::new(10, 30),
                color: summary.status_color(),
                scale: 1.0,
            },
            TextOverlay {
                text: format!("Detected: {}", summary.count),
                origin: Point::new(10, 70),
                color: WHITE,
                scale: 1.0,
            },
        ];

        Self {
            boxes: blobs.iter().map(|b| b.bbox).collect(),
            box_color: GREEN,
            roi_outline: polygon,
            outline_color: summary.status_color(),
            thickness: 2,
            texts,
        }
    }
}
