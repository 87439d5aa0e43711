use anyhow::Result;
use log::{error, info, warn};
use std::time::Duration;

use crate::config::{GeometryStore, Settings};
use crate::interaction::ControllerState;
use crate::io::{FrameSource, KeySource, RenderSink};
use crate::pipeline::{FramePipeline, MonitorState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The exit key was pressed
    Exit,
    /// The source ran out of frames
    StreamEnded,
    /// The source reported an error
    AcquisitionFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub reason: StopReason,
}

/// The acquisition → pipeline → render → key → persist loop.
pub struct Monitor {
    pipeline: FramePipeline,
    state: MonitorState,
    source: Box<dyn FrameSource>,
    keys: Box<dyn KeySource>,
    sink: Box<dyn RenderSink>,
    store: Box<dyn GeometryStore>,
    key_poll: Duration,
}

impl Monitor {
    pub fn new(
        settings: &Settings,
        pipeline: FramePipeline,
        source: Box<dyn FrameSource>,
        keys: Box<dyn KeySource>,
        sink: Box<dyn RenderSink>,
        store: Box<dyn GeometryStore>,
    ) -> Self {
        Self {
            pipeline,
            state: MonitorState::from_settings(settings),
            source,
            keys,
            sink,
            store,
            key_poll: settings.key_poll,
        }
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn pipeline(&self) -> &FramePipeline {
        &self.pipeline
    }

    /// Run until the exit key is pressed or the source stops producing
    /// frames. Only pipeline contract violations are returned as errors.
    pub fn run(&mut self) -> Result<RunSummary> {
        let mut frames = 0;

        let reason = loop {
            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    info!("Frame stream ended");
                    break StopReason::StreamEnded;
                }
                Err(e) => {
                    error!("Could not acquire frame: {:#}", e);
                    break StopReason::AcquisitionFailed;
                }
            };

            let output = self.pipeline.process(&self.state.geometry, frame)?;
            if let Err(e) = self.sink.present(&output) {
                warn!("Failed to render frame {}: {:#}", output.index, e);
            }

            let key = self.keys.poll(self.key_poll);
            let next = self.state.handle_key(key);

            if let Err(e) = self.store.save(&self.state.geometry) {
                warn!("Failed to persist ROI geometry: {:#}", e);
            }
            frames += 1;

            if next == ControllerState::Exiting {
                break StopReason::Exit;
            }
        };

        info!("Stopped after {} frame(s): {:?}", frames, reason);
        Ok(RunSummary { frames, reason })
    }
}
