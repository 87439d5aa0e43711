use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat, ImageReader};
use log::{debug, info};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread;

/// Producer of frames. `Ok(None)` marks the end of the stream.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<DynamicImage>>;
}

/// Frames read from the image files of a directory, in file name order.
pub struct DirectorySource {
    paths: VecDeque<PathBuf>,
}

impl DirectorySource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Failed to open frame directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && ImageFormat::from_path(path).is_ok())
            .collect();
        paths.sort();

        info!("Found {} frame(s) in {}", paths.len(), dir.display());
        Ok(Self {
            paths: paths.into(),
        })
    }

    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl FrameSource for DirectorySource {
    fn next_frame(&mut self) -> Result<Option<DynamicImage>> {
        let Some(path) = self.paths.pop_front() else {
            return Ok(None);
        };
        debug!("Loading frame: {:?}", path);

        let img = ImageReader::open(&path)?
            .decode()
            .map_err(|e| anyhow::anyhow!("Failed to decode frame {}: {}", path.display(), e))?;
        Ok(Some(img))
    }
}

/// Frames held in memory; handy for synthetic input.
pub struct MemorySource {
    frames: VecDeque<DynamicImage>,
}

impl MemorySource {
    pub fn new(frames: Vec<DynamicImage>) -> Self {
        Self {
            frames: frames.into(),
        }
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> Result<Option<DynamicImage>> {
        Ok(self.frames.pop_front())
    }
}

/// Runs another source on its own thread.
///
/// The hand-off channel has no buffer, so the producer blocks until the
/// consumer takes the previous frame: at most one frame is ever in flight.
pub struct ThreadedSource {
    receiver: Receiver<Result<Option<DynamicImage>>>,
    finished: bool,
}

impl ThreadedSource {
    pub fn spawn<S>(mut inner: S) -> Self
    where
        S: FrameSource + Send + 'static,
    {
        let (sender, receiver) = mpsc::sync_channel(0);

        thread::spawn(move || {
            loop {
                let item = inner.next_frame();
                let last = !matches!(item, Ok(Some(_)));
                // A send error means the consumer is gone.
                if sender.send(item).is_err() || last {
                    break;
                }
            }
            debug!("Acquisition thread finished");
        });

        Self {
            receiver,
            finished: false,
        }
    }
}

impl FrameSource for ThreadedSource {
    fn next_frame(&mut self) -> Result<Option<DynamicImage>> {
        if self.finished {
            return Ok(None);
        }

        match self.receiver.recv() {
            Ok(item) => {
                if !matches!(item, Ok(Some(_))) {
                    self.finished = true;
                }
                item
            }
            Err(_) => {
                self.finished = true;
                Err(anyhow::anyhow!("Acquisition thread stopped unexpectedly"))
            }
        }
    }
}
