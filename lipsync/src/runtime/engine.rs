use super::speech::session_channel;
use crate::ids::next_session_id;
use crate::{
    AnimatorData, AnimatorEvent, AnswerLookup, BodyAnimator, ClipLibrary, EngineConfig, Error,
    MorphTargets, QueueItem, SessionId, SpeechEvent, SpeechProvider, SpeechRequest,
    SynthesisHandle, TickReport, VisemeMap, VisemeQueue, normalize_question,
};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{SystemTime, UNIX_EPOCH};

/// Millisecond time source shared by speech start times and frame timestamps.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }
}

/// Handle to one utterance started by [`AvatarEngine::speak`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SpeechSession {
    id: SessionId,
}

impl SpeechSession {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Whether this is still the engine's live synthesis session.
    pub fn is_current<P, Q>(&self, engine: &AvatarEngine<P, Q>) -> bool {
        engine.speech.as_ref().is_some_and(|s| s.id == self.id)
    }

    /// Cancels this utterance if it is still current. Returns `false` for superseded or
    /// already finished sessions.
    pub fn cancel<P, Q>(&self, engine: &mut AvatarEngine<P, Q>) -> bool {
        if !self.is_current(engine) {
            return false;
        }
        engine.cancel_speech()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub visemes: TickReport,
    pub animation_events: Vec<AnimatorEvent>,
}

struct ActiveSpeech {
    id: SessionId,
    handle: Box<dyn SynthesisHandle>,
    events: Receiver<SpeechEvent>,
}

/// Ties the viseme queue, the morph buffer and the body animator to a speech provider and a
/// Q&A collaborator.
///
/// Single-threaded: `speak`/`play_animation` and `advance` are called from the same
/// cooperative loop. Providers may deliver from anywhere through their [`crate::VisemeSink`];
/// deliveries are picked up on the next `advance`.
pub struct AvatarEngine<P, Q> {
    config: EngineConfig,
    provider: P,
    answers: Q,
    clock: Box<dyn Clock>,
    viseme_map: VisemeMap,
    morphs: MorphTargets,
    queue: VisemeQueue,
    animator: BodyAnimator,
    speech: Option<ActiveSpeech>,
    last_frame_ms: Option<f64>,
}

impl<P, Q> AvatarEngine<P, Q> {
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn morphs(&self) -> &MorphTargets {
        &self.morphs
    }

    pub fn animator(&self) -> &BodyAnimator {
        &self.animator
    }

    pub fn animator_mut(&mut self) -> &mut BodyAnimator {
        &mut self.animator
    }

    pub fn queue(&self) -> &VisemeQueue {
        &self.queue
    }

    pub fn viseme_map(&self) -> &VisemeMap {
        &self.viseme_map
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    pub fn answers(&self) -> &Q {
        &self.answers
    }

    pub fn current_session(&self) -> Option<SpeechSession> {
        self.speech.as_ref().map(|s| SpeechSession { id: s.id })
    }

    pub fn is_speaking(&self) -> bool {
        self.speech.is_some() || !self.queue.is_empty()
    }

    /// Stops the live synthesis, if any, and closes the current utterance.
    pub fn cancel_speech(&mut self) -> bool {
        let Some(id) = self.detach_speech() else {
            return false;
        };
        log::debug!("speech session {id} cancelled");
        self.queue.close();
        true
    }

    /// Requests a body clip. Unknown clips are logged and ignored.
    pub fn play_animation(&mut self, name: &str) -> bool {
        match self.animator.play(name) {
            Ok(changed) => changed,
            Err(e) => {
                log::warn!("play_animation({name}) ignored: {e}");
                false
            }
        }
    }

    /// Per-frame entry point for the render loop.
    pub fn advance(&mut self, now_ms: f64) -> FrameReport {
        self.pump_speech_events();

        let visemes = self.queue.tick(now_ms, &mut self.morphs, &self.viseme_map);
        if visemes.finished {
            log::debug!("utterance finished");
        }

        let delta_ms = self
            .last_frame_ms
            .map(|last| (now_ms - last).max(0.0))
            .unwrap_or(0.0);
        self.last_frame_ms = Some(now_ms);
        self.animator.update((delta_ms / 1000.0) as f32);

        let animation_events = self.animator.drain_events().collect::<Vec<_>>();
        for event in &animation_events {
            log::debug!("body animation event: {event:?}");
        }

        FrameReport {
            visemes,
            animation_events,
        }
    }

    // Stop first, then drop the receiver: a stale sink must never reach the queue that is
    // about to be reset.
    fn detach_speech(&mut self) -> Option<SessionId> {
        let mut speech = self.speech.take()?;
        speech.handle.stop();
        Some(speech.id)
    }

    fn pump_speech_events(&mut self) {
        let Some(speech) = self.speech.as_ref() else {
            return;
        };
        let mut done = false;
        loop {
            match speech.events.try_recv() {
                Ok(SpeechEvent::Viseme(event)) => {
                    self.queue.enqueue(QueueItem::Viseme(event));
                }
                Ok(SpeechEvent::End) => {
                    self.queue.close();
                    done = true;
                    break;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    log::debug!("speech session {} dropped its sink without ending", speech.id);
                    self.queue.close();
                    done = true;
                    break;
                }
            }
        }
        if done {
            self.speech = None;
        }
    }
}

impl<P: SpeechProvider, Q: AnswerLookup> AvatarEngine<P, Q> {
    pub fn new(
        config: EngineConfig,
        provider: P,
        answers: Q,
        morphs: MorphTargets,
        clips: Arc<ClipLibrary>,
    ) -> Result<Self, Error> {
        config.validate()?;
        let animator = BodyAnimator::new(AnimatorData::from_config(clips, &config))?;
        let viseme_map = VisemeMap::default();
        let mut queue = VisemeQueue::new(&config);
        queue.bind_channels(&viseme_map, &morphs);
        Ok(Self {
            queue,
            config,
            provider,
            answers,
            clock: Box::new(SystemClock),
            viseme_map,
            morphs,
            animator,
            speech: None,
            last_frame_ms: None,
        })
    }

    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_viseme_map(mut self, viseme_map: VisemeMap) -> Self {
        self.queue.bind_channels(&viseme_map, &self.morphs);
        self.viseme_map = viseme_map;
        self
    }

    /// Answers `text` with `voice`, timing the utterance from the engine clock.
    pub fn speak(&mut self, text: &str, voice: &str) -> SpeechSession {
        let now = self.clock.now_ms();
        self.speak_at(text, voice, now)
    }

    /// Looks `text` up in the Q&A collaborator, speaks the answer (or the configured fallback)
    /// and requests the answer's body clip (or idle). Empty answers and clip names count as
    /// missing.
    pub fn speak_at(&mut self, text: &str, voice: &str, now_ms: f64) -> SpeechSession {
        let (answer, animation) = match self.answers.lookup(&normalize_question(text)) {
            Some(answer) => (Some(answer.text), answer.animation),
            None => (None, None),
        };
        let answer = answer
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| self.config.fallback_answer.clone());
        let animation = animation
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| self.config.idle_clip.clone());

        let session = self.say_at(&answer, voice, now_ms);
        self.play_animation(&animation);
        session
    }

    /// Speaks `text` verbatim without consulting the Q&A table or changing the body clip.
    pub fn say_at(&mut self, text: &str, voice: &str, now_ms: f64) -> SpeechSession {
        if let Some(previous) = self.detach_speech() {
            log::debug!("speech session {previous} superseded");
        }
        self.queue.reset(now_ms);

        let id = next_session_id();
        let (sink, events) = session_channel(id);
        let voice = if voice.is_empty() {
            self.config.default_voice.as_str()
        } else {
            voice
        };
        let request = SpeechRequest {
            text: text.to_string(),
            voice: voice.to_string(),
        };

        match self.provider.synthesize(&request, sink) {
            Ok(handle) => {
                log::debug!("speech session {id} started ({} chars, voice {voice})", text.len());
                self.speech = Some(ActiveSpeech { id, handle, events });
            }
            Err(e) => {
                log::warn!("speech provider failed, staying silent: {e}");
                self.queue.close();
            }
        }

        SpeechSession { id }
    }
}
