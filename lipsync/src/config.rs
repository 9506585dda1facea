use crate::Error;

/// Per-frame weight decay applied to morph targets and to the active viseme pulse.
pub const DEFAULT_DECAY_STEP: f32 = 0.015;

/// Weight a viseme is asserted at when it becomes active.
pub const DEFAULT_VISEME_STRENGTH: f32 = 0.5;

/// Cross-fade / fade-in window between body clips, in seconds.
pub const DEFAULT_BLEND_DURATION: f32 = 0.6;

pub const DEFAULT_IDLE_CLIP: &str = "Idle";

pub const DEFAULT_VOICE: &str = "tr-TR-AhmetNeural";

pub const DEFAULT_FALLBACK_ANSWER: &str = "Bu soruya verecek bir cevabım yok.";

/// Which morph channels the per-frame decay touches.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum DecayScope {
    /// Every channel of the mesh decays, including ones no viseme maps to.
    #[default]
    AllChannels,
    /// Only channels reachable through the viseme map decay, leaving e.g. blink shapes alone.
    VisemeChannels,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    pub decay_step: f32,
    pub viseme_strength: f32,
    pub blend_duration: f32,
    pub decay_scope: DecayScope,
    pub idle_clip: String,
    pub default_voice: String,
    pub fallback_answer: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            decay_step: DEFAULT_DECAY_STEP,
            viseme_strength: DEFAULT_VISEME_STRENGTH,
            blend_duration: DEFAULT_BLEND_DURATION,
            decay_scope: DecayScope::AllChannels,
            idle_clip: DEFAULT_IDLE_CLIP.to_string(),
            default_voice: DEFAULT_VOICE.to_string(),
            fallback_answer: DEFAULT_FALLBACK_ANSWER.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), Error> {
        validate_decay_step(self.decay_step)?;
        validate_strength(self.viseme_strength)?;
        validate_blend_duration(self.blend_duration)?;
        if self.idle_clip.is_empty() {
            return Err(Error::InvalidValue {
                message: "idle clip name must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Number of frames a full-strength channel needs to decay to zero.
    pub fn frames_to_rest(&self) -> u32 {
        (1.0 / self.decay_step).ceil() as u32
    }
}

pub(crate) fn validate_decay_step(step: f32) -> Result<(), Error> {
    if !step.is_finite() || step <= 0.0 || step > 1.0 {
        return Err(Error::InvalidValue {
            message: format!("decay step must be in (0, 1], got {step}"),
        });
    }
    Ok(())
}

pub(crate) fn validate_strength(strength: f32) -> Result<(), Error> {
    if !(0.0..=1.0).contains(&strength) {
        return Err(Error::InvalidValue {
            message: format!("viseme strength must be in [0, 1], got {strength}"),
        });
    }
    Ok(())
}

pub(crate) fn validate_blend_duration(duration: f32) -> Result<(), Error> {
    if !duration.is_finite() || duration < 0.0 {
        return Err(Error::InvalidValue {
            message: "blend duration must be finite and >= 0".to_string(),
        });
    }
    Ok(())
}
