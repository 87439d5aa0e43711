pub mod background;
pub mod contours;
pub mod geometry;
pub mod morphology;
pub mod preprocessing;

pub use background::{BackgroundModel, BackgroundParams, PixelClass};
pub use contours::find_blobs;
pub use geometry::resolve;
