use super::clip::hard_clamp;
use gainstage_opts::{ReplayGainMode, VolumeOptions};

/// Gains at or below this many dB are treated as silence.
pub const SILENCE_DB: f32 = -200.0;
/// Upper clamp for every dB value the stage converts.
pub const MAX_GAIN_DB: f32 = 60.0;
/// Tolerance of the neutral-gain check used for detaching.
const DETACH_EPSILON: f32 = 1e-5;

/// Convert `value_db` to a linear factor; `<= -200 dB` becomes exact silence.
pub fn db_to_gain(value_db: f32, denom: f32, lo: f32, hi: f32) -> f32 {
    if value_db <= SILENCE_DB {
        return 0.0;
    }
    10f64.powf(hard_clamp(value_db, lo, hi) as f64 / denom as f64) as f32
}

#[inline]
fn amplitude(db: f32) -> f32 {
    db_to_gain(db, 20.0, SILENCE_DB, MAX_GAIN_DB)
}

/// Loudness-normalization metadata carried with a stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayGainData {
    pub track_gain: f32,
    pub track_peak: f32,
    pub album_gain: f32,
    pub album_peak: f32,
}

impl ReplayGainData {
    /// The (gain dB, peak) pair for `mode`, if its gain is usable. The peak
    /// is returned unchecked; it only matters for clipping prevention.
    fn select(&self, mode: ReplayGainMode) -> Option<(f32, f32)> {
        let (gain, peak) = match mode {
            ReplayGainMode::None => return None,
            ReplayGainMode::Track => (self.track_gain, self.track_peak),
            ReplayGainMode::Album => (self.album_gain, self.album_peak),
        };
        if gain.is_finite() {
            Some((gain, peak))
        } else {
            log::warn!("ignoring malformed replaygain metadata: gain {gain} dB");
            None
        }
    }
}

/// Mutable state of one volume stage.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    /// Raw user-facing volume.
    pub user_volume: f32,
    /// `user_volume^3`.
    pub level: f32,
    pub static_gain_db: f32,
    /// Multiplier from replaygain metadata or the fallback level.
    pub replay_gain: f32,
    pub replay_gain_mode: ReplayGainMode,
    pub replay_gain_preamp_db: f32,
    pub replay_gain_clip: bool,
    pub replay_gain_fallback_db: f32,
    pub soft_clip: bool,
    pub fast: bool,
    pub detach: bool,
}

impl FilterState {
    pub fn new(opts: &VolumeOptions) -> Self {
        Self {
            user_volume: 1.0,
            level: 1.0,
            static_gain_db: opts.volumedb,
            replay_gain: 1.0,
            replay_gain_mode: opts.replaygain_mode(),
            replay_gain_preamp_db: opts.replaygain_preamp,
            replay_gain_clip: opts.replaygain_clip,
            replay_gain_fallback_db: opts.replaygain_fallback,
            soft_clip: opts.softclip,
            fast: opts.s16,
            detach: opts.detach,
        }
    }

    pub fn set_volume(&mut self, vol: f32) {
        self.user_volume = vol;
        self.level = vol.powi(3);
        log::debug!("volume gain: {}", self.level);
    }

    /// Recompute the replaygain multiplier for a (re)initialized stream.
    pub fn update_replay_gain(&mut self, metadata: Option<&ReplayGainData>) {
        let selected = metadata.and_then(|rg| rg.select(self.replay_gain_mode));
        self.replay_gain = if let Some((gain, peak)) = selected {
            let mut rgain = amplitude(gain + self.replay_gain_preamp_db);
            log::debug!("applying replaygain: {rgain}");
            if !self.replay_gain_clip {
                if peak.is_finite() && peak > 0.0 {
                    rgain = rgain.min(1.0 / peak);
                    log::debug!("...with clipping prevention: {rgain}");
                } else {
                    log::warn!("replaygain peak {peak} is unusable, not capping");
                }
            }
            rgain
        } else if self.replay_gain_fallback_db != 0.0 {
            let rgain = amplitude(self.replay_gain_fallback_db);
            log::debug!("applying fallback gain: {rgain}");
            rgain
        } else {
            1.0
        };
    }

    pub fn effective_gain(&self) -> f32 {
        self.level * self.replay_gain * amplitude(self.static_gain_db)
    }

    /// Whether the stage may be removed. Only volume and replaygain count
    /// here; the static `volumedb` gain is not part of the check.
    pub fn should_detach(&self) -> bool {
        self.detach && (self.level * self.replay_gain - 1.0).abs() < DETACH_EPSILON
    }
}
