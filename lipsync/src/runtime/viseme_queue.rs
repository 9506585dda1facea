use crate::config::{validate_decay_step, validate_strength};
use crate::morph::decay_toward_rest;
use crate::{DecayScope, EngineConfig, Error, MorphTargets, VisemeEvent, VisemeMap};
use std::collections::VecDeque;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum QueueItem {
    Viseme(VisemeEvent),
    /// No further events will arrive for the current utterance.
    EndOfUtterance,
}

/// Reference point for viseme offsets: the moment the current utterance started.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SpeechClock {
    start_ms: f64,
}

impl SpeechClock {
    pub fn started_at(start_ms: f64) -> Self {
        Self { start_ms }
    }

    pub fn start_ms(&self) -> f64 {
        self.start_ms
    }

    pub fn elapsed(&self, now_ms: f64) -> f64 {
        now_ms - self.start_ms
    }
}

/// The single mouth shape currently being driven, and how strong its pulse still is.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ActiveViseme {
    pub index: Option<usize>,
    pub strength: f32,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Viseme events removed from the head of the queue.
    pub popped: usize,
    /// Popped events that mapped to a morph target and became active.
    pub applied: usize,
    /// Popped events whose id had no morph target.
    pub dropped: usize,
    /// The end-marker was consumed by this tick.
    pub finished: bool,
}

/// FIFO of scheduled mouth shapes plus the decay-based blending evaluated every frame.
#[derive(Clone, Debug)]
pub struct VisemeQueue {
    items: VecDeque<QueueItem>,
    clock: SpeechClock,
    active: ActiveViseme,
    closed: bool,
    finished: bool,
    decay_step: f32,
    strength: f32,
    scope: DecayScope,
    channels: Option<Vec<usize>>,
}

impl Default for VisemeQueue {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl VisemeQueue {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            items: VecDeque::new(),
            clock: SpeechClock::default(),
            active: ActiveViseme::default(),
            closed: false,
            finished: false,
            decay_step: config.decay_step,
            strength: config.viseme_strength,
            scope: config.decay_scope,
            channels: None,
        }
    }

    pub fn decay_step(&self) -> f32 {
        self.decay_step
    }

    pub fn set_decay_step(&mut self, step: f32) -> Result<(), Error> {
        validate_decay_step(step)?;
        self.decay_step = step;
        Ok(())
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    pub fn set_strength(&mut self, strength: f32) -> Result<(), Error> {
        validate_strength(strength)?;
        self.strength = strength;
        Ok(())
    }

    pub fn decay_scope(&self) -> DecayScope {
        self.scope
    }

    pub fn set_decay_scope(&mut self, scope: DecayScope) {
        self.scope = scope;
    }

    /// Recomputes the morph channels decayed under [`DecayScope::VisemeChannels`].
    ///
    /// The set is built on first use and then reused every frame; call this after swapping the
    /// viseme map or the mesh.
    pub fn bind_channels(&mut self, map: &VisemeMap, morphs: &MorphTargets) {
        self.channels = Some(map.channels(morphs));
    }

    pub fn clock(&self) -> SpeechClock {
        self.clock
    }

    pub fn active(&self) -> ActiveViseme {
        self.active
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn pending(&self) -> impl Iterator<Item = &QueueItem> {
        self.items.iter()
    }

    /// An end-marker has been enqueued for the current utterance.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The end-marker has reached the head and been consumed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Starts a new utterance: drops everything pending and restarts the speech clock at
    /// `now_ms`. Morph weights are left to decay on their own.
    pub fn reset(&mut self, now_ms: f64) {
        self.items.clear();
        self.clock = SpeechClock::started_at(now_ms);
        self.active = ActiveViseme::default();
        self.closed = false;
        self.finished = false;
    }

    /// Appends to the tail. Returns `false` once the utterance has been closed by an
    /// end-marker; later items are ignored.
    pub fn enqueue(&mut self, item: QueueItem) -> bool {
        if self.closed {
            log::trace!("ignoring {item:?} enqueued after end of utterance");
            return false;
        }
        if matches!(item, QueueItem::EndOfUtterance) {
            self.closed = true;
        }
        self.items.push_back(item);
        true
    }

    pub fn push_viseme(&mut self, id: u32, offset_ms: f64) -> bool {
        self.enqueue(QueueItem::Viseme(VisemeEvent::new(id, offset_ms)))
    }

    pub fn close(&mut self) -> bool {
        self.enqueue(QueueItem::EndOfUtterance)
    }

    /// Evaluates one rendered frame.
    ///
    /// Pops every head event whose offset has elapsed (the newest one wins the active slot),
    /// decays morph weights by one step, then re-asserts the active viseme at its current
    /// strength and decays that strength.
    pub fn tick(&mut self, now_ms: f64, morphs: &mut MorphTargets, map: &VisemeMap) -> TickReport {
        let elapsed = self.clock.elapsed(now_ms);
        let mut report = TickReport::default();

        loop {
            match self.items.front() {
                Some(QueueItem::Viseme(event)) if event.offset_ms <= elapsed => {
                    let event = *event;
                    self.items.pop_front();
                    report.popped += 1;
                    match map.resolve(event.id, morphs) {
                        Some(index) => {
                            self.active = ActiveViseme {
                                index: Some(index),
                                strength: self.strength,
                            };
                            report.applied += 1;
                        }
                        None => {
                            log::trace!("dropping viseme {} with no morph target", event.id);
                            report.dropped += 1;
                        }
                    }
                }
                Some(QueueItem::EndOfUtterance) => {
                    self.items.pop_front();
                    self.finished = true;
                    report.finished = true;
                    break;
                }
                _ => break,
            }
        }

        match self.scope {
            DecayScope::AllChannels => morphs.decay_all(self.decay_step),
            DecayScope::VisemeChannels => {
                let channels = self
                    .channels
                    .get_or_insert_with(|| map.channels(&*morphs));
                morphs.decay_channels(channels, self.decay_step)
            }
        }

        if let Some(index) = self.active.index {
            morphs.set_weight(index, self.active.strength);
            self.active.strength = decay_toward_rest(self.active.strength, self.decay_step);
        }

        report
    }
}
