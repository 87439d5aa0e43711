mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from roiwatch for tests
pub use roiwatch::{
    Blob, BoundingBox, ControllerState, DetectionSummary, FrameOutput, FramePipeline,
    InteractionController, KeyBindings, MonitorState, RoiGeometry, RoiPolygon, Settings, Status,
};
