pub mod config;
pub mod detection;
pub mod error;
pub mod interaction;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod runtime;

pub use config::{EnvFileStore, GeometryStore, Settings};
pub use error::DetectionError;
pub use interaction::{Command, ControllerState, InteractionController, KeyBindings};
pub use models::{Blob, BoundingBox, DetectionSummary, Overlay, RoiGeometry, RoiPolygon, Status};
pub use pipeline::{FrameOutput, FramePipeline, MonitorState, PipelineContext};
pub use runtime::{Monitor, RunSummary, StopReason};
