use log::{debug, info};

use crate::models::{MAX_ROI_EXTENT, MIN_ROI_DIMENSION, RoiGeometry};

pub const ESC: u8 = 27;

/// Default amount a single key press grows or shrinks the ROI by.
pub const DEFAULT_STEP: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ExpandWidth,
    ShrinkWidth,
    ExpandHeight,
    ShrinkHeight,
    Exit,
}

/// Key codes that trigger each command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBindings {
    pub expand_width: u8,
    pub shrink_width: u8,
    pub expand_height: u8,
    pub shrink_height: u8,
    pub exit: u8,
}

impl KeyBindings {
    /// Exit is checked first so it wins over any binding sharing its code.
    pub fn command_for(&self, key: u8) -> Option<Command> {
        if key == self.exit {
            Some(Command::Exit)
        } else if key == self.expand_width {
            Some(Command::ExpandWidth)
        } else if key == self.shrink_width {
            Some(Command::ShrinkWidth)
        } else if key == self.expand_height {
            Some(Command::ExpandHeight)
        } else if key == self.shrink_height {
            Some(Command::ShrinkHeight)
        } else {
            None
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            expand_width: b'e',
            shrink_width: b'q',
            expand_height: b'+',
            shrink_height: b'-',
            exit: ESC,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Running,
    Exiting,
}

/// Turns key presses into ROI resizes and decides when the loop stops.
#[derive(Debug, Clone)]
pub struct InteractionController {
    bindings: KeyBindings,
    step: i32,
    state: ControllerState,
}

impl InteractionController {
    pub fn new(bindings: KeyBindings, step: i32) -> Self {
        Self {
            bindings,
            step: step.max(1),
            state: ControllerState::Running,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_exiting(&self) -> bool {
        self.state == ControllerState::Exiting
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    /// Feed one polled key (or none). Unbound keys are ignored. Once exiting,
    /// further input has no effect.
    pub fn handle_key(&mut self, key: Option<u8>, geometry: &mut RoiGeometry) -> ControllerState {
        if let Some(command) = key.and_then(|k| self.bindings.command_for(k)) {
            self.apply(command, geometry);
        }
        self.state
    }

    pub fn apply(&mut self, command: Command, geometry: &mut RoiGeometry) -> ControllerState {
        if self.state == ControllerState::Exiting {
            return self.state;
        }

        match command {
            Command::Exit => {
                info!("Exit requested");
                self.state = ControllerState::Exiting;
            }
            Command::ExpandWidth => geometry.width = grow(geometry.width, self.step),
            Command::ShrinkWidth => geometry.width = shrink(geometry.width, self.step),
            Command::ExpandHeight => geometry.height = grow(geometry.height, self.step),
            Command::ShrinkHeight => geometry.height = shrink(geometry.height, self.step),
        }

        if command != Command::Exit {
            debug!(
                "{:?}: ROI now {}x{}",
                command, geometry.width, geometry.height
            );
        }

        self.state
    }
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(KeyBindings::default(), DEFAULT_STEP)
    }
}

fn grow(value: i32, step: i32) -> i32 {
    value.saturating_add(step).min(MAX_ROI_EXTENT)
}

fn shrink(value: i32, step: i32) -> i32 {
    value.saturating_sub(step).max(MIN_ROI_DIMENSION)
}
