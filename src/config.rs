use anyhow::{Context, Result};
use log::{debug, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::detection::background::BackgroundParams;
use crate::detection::contours::DEFAULT_MIN_AREA;
use crate::interaction::{DEFAULT_STEP, KeyBindings};
use crate::models::{MAX_ROI_EXTENT, MIN_ROI_DIMENSION, RoiGeometry};

pub const GENERAL_CONFIG_FILE: &str = ".env";
pub const GEOMETRY_FILE: &str = "cords.env";

pub const DEFAULT_KEY_POLL_MS: u64 = 70;

/// Key/value pairs from one configuration source
pub type EnvSource = HashMap<String, String>;

/// Parse `KEY=VALUE` lines. Blank lines and `#` comments are skipped, an
/// `export ` prefix is allowed and matching quotes around a value are removed.
pub fn parse_env(contents: &str) -> EnvSource {
    let mut vars = EnvSource::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let Some((key, value)) = line.split_once('=') else {
            debug!("Skipping config line without '=': {}", line);
            continue;
        };

        vars.insert(key.trim().to_string(), unquote(value.trim()).to_string());
    }

    vars
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Read an env file; a missing file is an empty source. Bytes that are not
/// valid UTF-8 are replaced, so only the affected values fail to parse.
pub fn read_env_file(path: &Path) -> Result<EnvSource> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(parse_env(&String::from_utf8_lossy(&bytes))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Config file {} not found, using defaults", path.display());
            Ok(EnvSource::new())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to read config file {}", path.display())),
    }
}

/// Process environment; entries that are not valid UTF-8 are skipped.
pub fn process_env() -> EnvSource {
    std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}

/// Runtime settings assembled from defaults and configuration sources.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub geometry: RoiGeometry,
    pub bindings: KeyBindings,
    pub background: BackgroundParams,
    pub min_blob_area: f64,
    pub resize_step: i32,
    pub key_poll: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            geometry: RoiGeometry::default(),
            bindings: KeyBindings::default(),
            background: BackgroundParams::default(),
            min_blob_area: DEFAULT_MIN_AREA,
            resize_step: DEFAULT_STEP,
            key_poll: Duration::from_millis(DEFAULT_KEY_POLL_MS),
        }
    }
}

impl Settings {
    /// Merge the process environment, the general config file and the
    /// geometry file, in that order of precedence.
    /// A file that cannot be read is skipped with a warning.
    pub fn load(general: &Path, geometry: &Path) -> Self {
        let sources = [process_env(), readable_source(general), readable_source(geometry)];
        Self::from_sources(&sources)
    }

    /// Build settings from sources ordered highest precedence first. Values
    /// that fail to parse or are out of range fall back to their defaults.
    pub fn from_sources(sources: &[EnvSource]) -> Self {
        let vars = Layered { sources };
        let defaults = Settings::default();
        let default_keys = &defaults.bindings;
        let default_bg = &defaults.background;

        let size = |v: &i32| (MIN_ROI_DIMENSION..=MAX_ROI_EXTENT).contains(v);
        let offset = |v: &i32| (-MAX_ROI_EXTENT..=MAX_ROI_EXTENT).contains(v);
        let geometry = RoiGeometry {
            width: vars.parsed("AREA_WIDTH", defaults.geometry.width, size),
            height: vars.parsed("AREA_HEIGHT", defaults.geometry.height, size),
            x_offset: vars.parsed("AREA_X_POS", defaults.geometry.x_offset, offset),
            y_offset: vars.parsed("AREA_Y_POS", defaults.geometry.y_offset, offset),
        };

        let bindings = KeyBindings {
            expand_width: vars.key_char("KEY_EXPAND_WIDTH", default_keys.expand_width),
            shrink_width: vars.key_char("KEY_SHRINK_WIDTH", default_keys.shrink_width),
            expand_height: vars.key_char("KEY_EXPAND_HEIGHT", default_keys.expand_height),
            shrink_height: vars.key_char("KEY_SHRINK_HEIGHT", default_keys.shrink_height),
            exit: vars.parsed("KEY_EXIT", default_keys.exit, |_| true),
        };

        let background = BackgroundParams {
            history: vars.parsed("BG_HISTORY", default_bg.history, |h| *h >= 1),
            var_threshold: vars.parsed("BG_VAR_THRESHOLD", default_bg.var_threshold, |t| *t > 0.0),
            detect_shadows: vars.flag("BG_DETECT_SHADOWS", default_bg.detect_shadows),
        };

        Self {
            geometry,
            bindings,
            background,
            min_blob_area: vars.parsed("MIN_BLOB_AREA", defaults.min_blob_area, |a| *a >= 0.0),
            resize_step: vars.parsed("RESIZE_STEP", defaults.resize_step, |s| (1..=MAX_ROI_EXTENT).contains(s)),
            key_poll: Duration::from_millis(vars.parsed("KEY_POLL_MS", DEFAULT_KEY_POLL_MS, |_| true)),
        }
    }
}

fn readable_source(path: &Path) -> EnvSource {
    read_env_file(path).unwrap_or_else(|e| {
        warn!("{:#}, using defaults", e);
        EnvSource::new()
    })
}

struct Layered<'a> {
    sources: &'a [EnvSource],
}

impl Layered<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.sources.iter().find_map(|s| s.get(key)).map(|v| v.trim())
    }

    fn parsed<T>(&self, key: &str, default: T, valid: impl Fn(&T) -> bool) -> T
    where
        T: FromStr + std::fmt::Display,
    {
        let Some(raw) = self.get(key) else {
            return default;
        };
        match raw.parse::<T>() {
            Ok(value) if valid(&value) => value,
            _ => {
                warn!("Invalid value {:?} for {}, using default {}", raw, key, default);
                default
            }
        }
    }

    /// A key binding given as exactly one ASCII character.
    fn key_char(&self, key: &str, default: u8) -> u8 {
        let Some(raw) = self.get(key) else {
            return default;
        };
        let mut chars = raw.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii() => c as u8,
            _ => {
                warn!("Invalid key {:?} for {}, using default {:?}", raw, key, default as char);
                default
            }
        }
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        let Some(raw) = self.get(key) else {
            return default;
        };
        match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                warn!("Invalid flag {:?} for {}, using default {}", raw, key, default);
                default
            }
        }
    }
}

/// Durable home of the ROI geometry between runs.
pub trait GeometryStore {
    fn save(&mut self, geometry: &RoiGeometry) -> Result<()>;
}

/// Geometry kept as four `AREA_*` lines, rewritten in full on every save.
#[derive(Debug, Clone)]
pub struct EnvFileStore {
    path: PathBuf,
}

impl EnvFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Geometry as stored on disk, defaults filling anything missing.
    pub fn load(&self) -> Result<RoiGeometry> {
        let source = read_env_file(&self.path)?;
        Ok(Settings::from_sources(&[source]).geometry)
    }

    pub fn serialize(geometry: &RoiGeometry) -> String {
        format!(
            "AREA_WIDTH={}\nAREA_HEIGHT={}\nAREA_X_POS={}\nAREA_Y_POS={}\n",
            geometry.width, geometry.height, geometry.x_offset, geometry.y_offset
        )
    }
}

impl GeometryStore for EnvFileStore {
    fn save(&mut self, geometry: &RoiGeometry) -> Result<()> {
        std::fs::write(&self.path, Self::serialize(geometry))
            .with_context(|| format!("Failed to write geometry to {}", self.path.display()))
    }
}
