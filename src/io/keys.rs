use log::{debug, warn};
use std::collections::VecDeque;
use std::io::Read;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::interaction::ESC;

/// Delivers at most one key code per loop iteration.
///
/// `poll` waits up to `timeout` for a key, which also paces the loop.
pub trait KeySource {
    fn poll(&mut self, timeout: Duration) -> Option<u8>;
}

/// A fixed sequence of key presses, one entry per frame.
#[derive(Debug, Clone, Default)]
pub struct ScriptedKeys {
    keys: VecDeque<Option<u8>>,
    pacing: bool,
}

impl ScriptedKeys {
    pub fn new(keys: impl IntoIterator<Item = Option<u8>>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            pacing: false,
        }
    }

    /// Parse a key script: every character is one key press, `.` is a frame
    /// without a key, `\e` is ESC, `\.` and `\\` are the literal characters.
    /// Non-ASCII characters have no key code and are skipped.
    pub fn parse(script: &str) -> Self {
        let mut keys = Vec::new();
        let mut chars = script.chars();

        while let Some(c) = chars.next() {
            let c = match c {
                '.' => {
                    keys.push(None);
                    continue;
                }
                '\\' => match chars.next() {
                    Some('e') => {
                        keys.push(Some(ESC));
                        continue;
                    }
                    Some(other) => other,
                    None => '\\',
                },
                other => other,
            };

            if c.is_ascii() {
                keys.push(Some(c as u8));
            } else {
                warn!("Skipping non-ASCII key {:?} in key script", c);
            }
        }

        Self::new(keys)
    }

    /// Sleep for the poll timeout on every call, like a real key wait.
    pub fn with_pacing(mut self, pacing: bool) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn remaining(&self) -> usize {
        self.keys.len()
    }
}

impl KeySource for ScriptedKeys {
    fn poll(&mut self, timeout: Duration) -> Option<u8> {
        if self.pacing {
            thread::sleep(timeout);
        }
        self.keys.pop_front().flatten()
    }
}

/// Key presses typed on stdin, read by a helper thread.
pub struct StdinKeys {
    receiver: Receiver<u8>,
    closed: bool,
}

impl StdinKeys {
    pub fn spawn() -> Self {
        let (sender, receiver) = mpsc::channel();

        thread::spawn(move || {
            for byte in std::io::stdin().lock().bytes() {
                let Ok(byte) = byte else { break };
                if byte == b'\n' || byte == b'\r' {
                    continue;
                }
                if sender.send(byte).is_err() {
                    break;
                }
            }
            debug!("Stdin closed, no more key input");
        });

        Self {
            receiver,
            closed: false,
        }
    }
}

impl KeySource for StdinKeys {
    fn poll(&mut self, timeout: Duration) -> Option<u8> {
        if self.closed {
            thread::sleep(timeout);
            return None;
        }

        match self.receiver.recv_timeout(timeout) {
            Ok(key) => Some(key),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                self.closed = true;
                None
            }
        }
    }
}
