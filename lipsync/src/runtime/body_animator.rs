use crate::config::validate_blend_duration;
use crate::{DEFAULT_BLEND_DURATION, DEFAULT_IDLE_CLIP, EngineConfig, Error};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

const TIME_EPSILON: f32 = 1e-6;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LoopMode {
    Repeat,
    Once,
}

/// A full-body clip as far as the state machine cares: a name and a length in seconds.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, duration: f32) -> Self {
        Self {
            name: name.into(),
            duration,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ClipLibrary {
    clips: Vec<AnimationClip>,
    index: HashMap<String, usize>,
}

impl ClipLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_clips<I: IntoIterator<Item = AnimationClip>>(clips: I) -> Result<Self, Error> {
        let mut library = Self::new();
        for clip in clips {
            library.insert(clip)?;
        }
        Ok(library)
    }

    pub fn insert(&mut self, clip: AnimationClip) -> Result<usize, Error> {
        if !clip.duration.is_finite() || clip.duration < 0.0 {
            return Err(Error::InvalidValue {
                message: format!("clip '{}' duration must be finite and >= 0", clip.name),
            });
        }
        if self.index.contains_key(&clip.name) {
            return Err(Error::InvalidValue {
                message: format!("clip '{}' registered twice", clip.name),
            });
        }
        let index = self.clips.len();
        self.index.insert(clip.name.clone(), index);
        self.clips.push(clip);
        Ok(index)
    }

    pub fn clip(&self, name: &str) -> Option<(usize, &AnimationClip)> {
        let index = *self.index.get(name)?;
        Some((index, &self.clips[index]))
    }

    pub fn get(&self, index: usize) -> Option<&AnimationClip> {
        self.clips.get(index)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnimationClip> {
        self.clips.iter()
    }
}

#[derive(Clone, Debug)]
pub struct AnimatorData {
    pub clips: Arc<ClipLibrary>,
    pub idle: String,
    pub default_blend: f32,
    blends: HashMap<(usize, usize), f32>,
}

impl AnimatorData {
    pub fn new(clips: Arc<ClipLibrary>) -> Self {
        Self {
            clips,
            idle: DEFAULT_IDLE_CLIP.to_string(),
            default_blend: DEFAULT_BLEND_DURATION,
            blends: HashMap::new(),
        }
    }

    pub fn from_config(clips: Arc<ClipLibrary>, config: &EngineConfig) -> Self {
        Self {
            clips,
            idle: config.idle_clip.clone(),
            default_blend: config.blend_duration,
            blends: HashMap::new(),
        }
    }

    /// Overrides the blend window used when `to` replaces `from`.
    pub fn set_blend(&mut self, from: &str, to: &str, duration: f32) -> Result<(), Error> {
        validate_blend_duration(duration)?;
        let Some((from_index, _)) = self.clips.clip(from) else {
            return Err(Error::UnknownClip {
                name: from.to_string(),
            });
        };
        let Some((to_index, _)) = self.clips.clip(to) else {
            return Err(Error::UnknownClip {
                name: to.to_string(),
            });
        };
        self.blends.insert((from_index, to_index), duration);
        Ok(())
    }

    fn blend_duration(&self, from: Option<usize>, to: usize) -> f32 {
        from.and_then(|from| self.blends.get(&(from, to)).copied())
            .unwrap_or(self.default_blend)
    }
}

/// Snapshot of the state machine: which clip is current and whether it plays once.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnimationState {
    pub current: String,
    pub is_one_shot: bool,
}

/// One clip's contribution to the body pose for the current frame.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipPose {
    pub clip: String,
    pub time: f32,
    pub weight: f32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnimatorEvent {
    /// A clip became current and started fading in.
    Started { clip: String },
    /// A clip was replaced before it finished.
    Interrupted { clip: String },
    /// A one-shot clip reached its end.
    Completed { clip: String },
    /// A replaced clip finished fading out and no longer contributes to the pose.
    Ended { clip: String },
    /// The state machine went back to the idle clip on its own after `from` completed.
    ReturnedToIdle { from: String },
}

#[derive(Clone, Debug)]
struct ClipEntry {
    clip_index: usize,
    name: String,
    duration: f32,
    loop_mode: LoopMode,
    time: f32,
    blend_time: f32,
    blend_duration: f32,
    completed: bool,
}

impl ClipEntry {
    fn new(clip_index: usize, clip: &AnimationClip, loop_mode: LoopMode, blend: f32) -> Self {
        Self {
            clip_index,
            name: clip.name.clone(),
            duration: clip.duration,
            loop_mode,
            time: 0.0,
            blend_time: 0.0,
            blend_duration: blend,
            completed: false,
        }
    }

    fn weight(&self) -> f32 {
        if self.blend_duration <= 0.0 {
            1.0
        } else {
            (self.blend_time / self.blend_duration).min(1.0)
        }
    }

    /// Advances local time; returns `true` on the update that completes a one-shot clip.
    fn advance(&mut self, delta: f32) -> bool {
        if self.completed {
            return false;
        }
        self.time += delta;
        match self.loop_mode {
            LoopMode::Repeat => {
                if self.duration > TIME_EPSILON && self.time >= self.duration {
                    self.time %= self.duration;
                }
                false
            }
            LoopMode::Once => {
                if self.time + TIME_EPSILON >= self.duration {
                    self.time = self.duration;
                    self.completed = true;
                    true
                } else {
                    false
                }
            }
        }
    }
}

#[derive(Clone, Debug)]
struct FadingEntry {
    entry: ClipEntry,
    from_weight: f32,
    elapsed: f32,
    duration: f32,
}

impl FadingEntry {
    fn weight(&self) -> f32 {
        if self.duration <= 0.0 || self.elapsed >= self.duration {
            0.0
        } else {
            self.from_weight * (1.0 - self.elapsed / self.duration)
        }
    }
}

/// Body animation state machine.
///
/// Exactly one clip is current. Non-idle clips play once and then hand control back to the
/// idle clip, which loops. Every change of current clip cross-fades from whatever was visible
/// over the configured blend window.
#[derive(Debug)]
pub struct BodyAnimator {
    data: AnimatorData,
    idle_index: usize,
    current: ClipEntry,
    fading: Vec<FadingEntry>,
    events: VecDeque<AnimatorEvent>,
}

impl BodyAnimator {
    /// Starts on the idle clip, fading it in.
    pub fn new(data: AnimatorData) -> Result<Self, Error> {
        validate_blend_duration(data.default_blend)?;
        let clips = data.clips.clone();
        let (idle_index, idle) = clips.clip(&data.idle).ok_or_else(|| Error::UnknownClip {
            name: data.idle.clone(),
        })?;
        let blend = data.blend_duration(None, idle_index);
        let mut events = VecDeque::new();
        events.push_back(AnimatorEvent::Started {
            clip: idle.name.clone(),
        });
        Ok(Self {
            current: ClipEntry::new(idle_index, idle, LoopMode::Repeat, blend),
            data,
            idle_index,
            fading: Vec::new(),
            events,
        })
    }

    pub fn data(&self) -> &AnimatorData {
        &self.data
    }

    pub fn set_blend(&mut self, from: &str, to: &str, duration: f32) -> Result<(), Error> {
        self.data.set_blend(from, to, duration)
    }

    pub fn current(&self) -> &str {
        &self.current.name
    }

    pub fn is_idle(&self) -> bool {
        self.current.clip_index == self.idle_index
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.current.loop_mode
    }

    pub fn current_time(&self) -> f32 {
        self.current.time
    }

    pub fn state(&self) -> AnimationState {
        AnimationState {
            current: self.current.name.clone(),
            is_one_shot: self.current.loop_mode == LoopMode::Once,
        }
    }

    pub fn is_blending(&self) -> bool {
        self.current.weight() < 1.0 || !self.fading.is_empty()
    }

    /// Requests `name` as the current clip.
    ///
    /// Returns `Ok(false)` without touching any state when `name` is already current. Unknown
    /// names return [`Error::UnknownClip`] and also leave the state untouched.
    pub fn play(&mut self, name: &str) -> Result<bool, Error> {
        let Some((index, _)) = self.data.clips.clip(name) else {
            return Err(Error::UnknownClip {
                name: name.to_string(),
            });
        };
        if index == self.current.clip_index {
            return Ok(false);
        }
        self.transition(index);
        Ok(true)
    }

    /// Advances clip time and blend windows by `delta` seconds.
    pub fn update(&mut self, delta: f32) {
        let delta = if delta.is_finite() && delta > 0.0 {
            delta
        } else {
            0.0
        };

        let events = &mut self.events;
        self.fading.retain_mut(|fading| {
            fading.elapsed += delta;
            fading.entry.advance(delta);
            if fading.weight() > 0.0 {
                return true;
            }
            events.push_back(AnimatorEvent::Ended {
                clip: fading.entry.name.clone(),
            });
            false
        });

        self.current.blend_time += delta;
        if self.current.advance(delta) {
            self.complete_current();
        }
    }

    /// Completion notification from an externally driven mixer. Returns `true` when `name` was
    /// the current one-shot clip and the machine went back to idle.
    pub fn notify_finished(&mut self, name: &str) -> bool {
        let current = &mut self.current;
        if current.name != name || current.loop_mode != LoopMode::Once || current.completed {
            return false;
        }
        current.time = current.duration;
        current.completed = true;
        self.complete_current();
        true
    }

    /// Every clip contributing to the pose, oldest fade first, current clip last.
    pub fn pose(&self) -> Vec<ClipPose> {
        let mut out = self
            .fading
            .iter()
            .filter(|f| f.weight() > 0.0)
            .map(|f| ClipPose {
                clip: f.entry.name.clone(),
                time: f.entry.time,
                weight: f.weight(),
            })
            .collect::<Vec<_>>();
        out.push(ClipPose {
            clip: self.current.name.clone(),
            time: self.current.time,
            weight: self.current.weight(),
        });
        out
    }

    /// Total blend weight of `name` across the current and fading clips.
    pub fn clip_weight(&self, name: &str) -> f32 {
        let fading: f32 = self
            .fading
            .iter()
            .filter(|f| f.entry.name == name)
            .map(FadingEntry::weight)
            .sum();
        let current = if self.current.name == name {
            self.current.weight()
        } else {
            0.0
        };
        fading + current
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = AnimatorEvent> + '_ {
        self.events.drain(..)
    }

    fn complete_current(&mut self) {
        let from = self.current.name.clone();
        self.events.push_back(AnimatorEvent::Completed { clip: from.clone() });
        if self.current.clip_index != self.idle_index {
            self.transition(self.idle_index);
            self.events.push_back(AnimatorEvent::ReturnedToIdle { from });
        }
    }

    fn transition(&mut self, clip_index: usize) {
        let clips = self.data.clips.clone();
        let Some(clip) = clips.get(clip_index) else {
            return;
        };
        let loop_mode = if clip_index == self.idle_index {
            LoopMode::Repeat
        } else {
            LoopMode::Once
        };
        let blend = self
            .data
            .blend_duration(Some(self.current.clip_index), clip_index);

        // A clip that is still fading out restarts from scratch instead of appearing twice.
        self.fading.retain(|f| f.entry.clip_index != clip_index);

        let next = ClipEntry::new(clip_index, clip, loop_mode, blend);
        let previous = std::mem::replace(&mut self.current, next);
        if !previous.completed {
            self.events.push_back(AnimatorEvent::Interrupted {
                clip: previous.name.clone(),
            });
        }

        let from_weight = previous.weight();
        if blend > 0.0 && from_weight > 0.0 {
            self.fading.push(FadingEntry {
                entry: previous,
                from_weight,
                elapsed: 0.0,
                duration: blend,
            });
        } else {
            self.events.push_back(AnimatorEvent::Ended {
                clip: previous.name,
            });
        }

        log::debug!("body animation -> {} ({:?}, blend {blend}s)", clip.name, loop_mode);
        self.events.push_back(AnimatorEvent::Started {
            clip: clip.name.clone(),
        });
    }
}
