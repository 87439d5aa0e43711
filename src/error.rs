use thiserror::Error;

/// Contract violations between pipeline stages.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DetectionError {
    #[error("frame is {actual_width}x{actual_height} but the background model holds {expected_width}x{expected_height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("foreground mask is not binary: pixel ({x}, {y}) has value {value}")]
    NonBinaryMask { x: u32, y: u32, value: u8 },
}
