//! Control surface of the volume stage.
//!
//! Options use the historical names so existing configuration producers keep
//! working: `volumedb=6:replaygain-track:softclip` and the equivalent JSON
//! document `{"volumedb": 6, "replaygain-track": true, "softclip": true}`.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Inclusive range accepted by `volumedb` and `replaygain-fallback`.
pub const GAIN_DB_RANGE: (f32, f32) = (-200.0, 60.0);
/// Inclusive range accepted by `replaygain-preamp`.
pub const PREAMP_DB_RANGE: (f32, f32) = (-15.0, 15.0);

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("unknown option `{0}`")]
    UnknownOption(String),
    #[error("option `{0}` requires a value")]
    MissingValue(String),
    #[error("option `{name}` expects a number, got `{value}`")]
    InvalidNumber { name: String, value: String },
    #[error("option `{name}` expects yes/no, got `{value}`")]
    InvalidFlag { name: String, value: String },
    #[error("option `{name}` = {value} is outside [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("malformed options document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Which replaygain pair the stage reads from stream metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayGainMode {
    #[default]
    None,
    Track,
    Album,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct VolumeOptions {
    /// Static gain in dB.
    pub volumedb: f32,
    pub replaygain_track: bool,
    pub replaygain_album: bool,
    /// Added to the metadata gain before conversion, in dB.
    pub replaygain_preamp: f32,
    /// When unset, the replaygain multiplier is capped at `1 / peak`.
    pub replaygain_clip: bool,
    /// Gain in dB used when no usable replaygain metadata is present.
    pub replaygain_fallback: f32,
    pub softclip: bool,
    /// Prefer 16-bit fixed-point processing for integer streams.
    pub s16: bool,
    /// Let the pipeline drop the stage when its net gain is neutral.
    pub detach: bool,
}

impl Default for VolumeOptions {
    fn default() -> Self {
        Self {
            volumedb: 0.0,
            replaygain_track: false,
            replaygain_album: false,
            replaygain_preamp: 0.0,
            replaygain_clip: false,
            replaygain_fallback: 0.0,
            softclip: false,
            s16: false,
            detach: false,
        }
    }
}

impl VolumeOptions {
    /// Parse a `name=value:name=value` option string.
    pub fn parse(input: &str) -> Result<Self, OptionsError> {
        let mut opts = Self::default();
        opts.apply(input)?;
        Ok(opts)
    }

    /// Apply an option string on top of the current values. Nothing is
    /// changed if any segment is rejected.
    pub fn apply(&mut self, input: &str) -> Result<(), OptionsError> {
        let mut opts = self.clone();
        for segment in input.split([':', ',']) {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (name, value) = match segment.split_once('=') {
                Some((n, v)) => (n.trim(), Some(v.trim())),
                None => (segment, None),
            };
            opts.set(name, value)?;
        }
        opts.validate()?;
        *self = opts;
        Ok(())
    }

    /// Load options from a JSON document using the same names as keys.
    pub fn from_json(input: &str) -> Result<Self, OptionsError> {
        let opts: Self = serde_json::from_str(input)?;
        opts.validate()?;
        Ok(opts)
    }

    /// The full option set as a JSON document `from_json` accepts.
    pub fn to_json(&self) -> Result<String, OptionsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn set(&mut self, name: &str, value: Option<&str>) -> Result<(), OptionsError> {
        match name {
            "volumedb" => self.volumedb = number(name, value)?,
            "replaygain-preamp" => self.replaygain_preamp = number(name, value)?,
            "replaygain-fallback" => self.replaygain_fallback = number(name, value)?,
            "replaygain-track" => self.replaygain_track = flag(name, value)?,
            "replaygain-album" => self.replaygain_album = flag(name, value)?,
            "replaygain-clip" => self.replaygain_clip = flag(name, value)?,
            "softclip" => self.softclip = flag(name, value)?,
            "s16" => self.s16 = flag(name, value)?,
            "detach" => self.detach = flag(name, value)?,
            other => return Err(OptionsError::UnknownOption(other.to_string())),
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), OptionsError> {
        check_range("volumedb", self.volumedb, GAIN_DB_RANGE)?;
        check_range("replaygain-preamp", self.replaygain_preamp, PREAMP_DB_RANGE)?;
        check_range("replaygain-fallback", self.replaygain_fallback, GAIN_DB_RANGE)?;
        Ok(())
    }

    /// Track metadata wins when both sources are enabled.
    pub fn replaygain_mode(&self) -> ReplayGainMode {
        if self.replaygain_track {
            ReplayGainMode::Track
        } else if self.replaygain_album {
            ReplayGainMode::Album
        } else {
            ReplayGainMode::None
        }
    }
}

fn number(name: &str, value: Option<&str>) -> Result<f32, OptionsError> {
    let value = value.ok_or_else(|| OptionsError::MissingValue(name.to_string()))?;
    value.parse().map_err(|_| OptionsError::InvalidNumber {
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn flag(name: &str, value: Option<&str>) -> Result<bool, OptionsError> {
    match value {
        None | Some("yes") | Some("true") | Some("1") => Ok(true),
        Some("no") | Some("false") | Some("0") => Ok(false),
        Some(other) => Err(OptionsError::InvalidFlag {
            name: name.to_string(),
            value: other.to_string(),
        }),
    }
}

fn check_range(name: &'static str, value: f32, (min, max): (f32, f32)) -> Result<(), OptionsError> {
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(OptionsError::OutOfRange { name, value, min, max })
    }
}

/// Renders the non-default options in the form `parse` accepts.
impl fmt::Display for VolumeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        let numbers = [
            ("volumedb", self.volumedb),
            ("replaygain-preamp", self.replaygain_preamp),
            ("replaygain-fallback", self.replaygain_fallback),
        ];
        for (name, value) in numbers {
            if value != 0.0 {
                parts.push(format!("{name}={value}"));
            }
        }
        let flags = [
            ("replaygain-track", self.replaygain_track),
            ("replaygain-album", self.replaygain_album),
            ("replaygain-clip", self.replaygain_clip),
            ("softclip", self.softclip),
            ("s16", self.s16),
            ("detach", self.detach),
        ];
        for (name, set) in flags {
            if set {
                parts.push(name.to_string());
            }
        }
        f.write_str(&parts.join(":"))
    }
}
