//! Boundaries around the frame pipeline: where frames come from, where
//! annotated output goes and how key presses arrive.

pub mod keys;
pub mod render;
pub mod source;

pub use keys::{KeySource, ScriptedKeys, StdinKeys};
pub use render::{ImageDirSink, LogSink, RenderSink, annotate};
pub use source::{DirectorySource, FrameSource, MemorySource, ThreadedSource};
