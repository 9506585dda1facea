use crate::{Error, VisemeEvent};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

pub type SessionId = u32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: String,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SpeechEvent {
    Viseme(VisemeEvent),
    End,
}

/// Callback end handed to a speech provider for one utterance.
///
/// Sinks are bound to the session that created them. Once the engine supersedes or cancels
/// that session the receiving side is gone and every delivery returns `false`.
#[derive(Clone, Debug)]
pub struct VisemeSink {
    session: SessionId,
    tx: Sender<SpeechEvent>,
    ended: Arc<AtomicBool>,
}

impl VisemeSink {
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// `onViseme(id, offsetMillis)`.
    pub fn viseme(&self, id: u32, offset_ms: f64) -> bool {
        self.deliver(SpeechEvent::Viseme(VisemeEvent::new(id, offset_ms)))
    }

    /// Same as [`VisemeSink::viseme`] for offsets in 100-ns ticks.
    pub fn viseme_ticks(&self, id: u32, ticks: u64) -> bool {
        self.deliver(SpeechEvent::Viseme(VisemeEvent::from_ticks(id, ticks)))
    }

    /// `onEnd()`: natural completion or cancellation. Only the first call is delivered.
    pub fn end(&self) -> bool {
        if self.ended.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.tx.send(SpeechEvent::End).is_ok()
    }

    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }

    fn deliver(&self, event: SpeechEvent) -> bool {
        if self.is_ended() {
            return false;
        }
        self.tx.send(event).is_ok()
    }
}

pub(crate) fn session_channel(session: SessionId) -> (VisemeSink, Receiver<SpeechEvent>) {
    let (tx, rx) = mpsc::channel();
    let sink = VisemeSink {
        session,
        tx,
        ended: Arc::new(AtomicBool::new(false)),
    };
    (sink, rx)
}

/// Provider-side control over one running synthesis.
pub trait SynthesisHandle {
    /// Stops audio playback and releases provider resources.
    fn stop(&mut self);
}

/// External text-to-speech service that reports viseme timings while it synthesizes.
pub trait SpeechProvider {
    fn synthesize(
        &mut self,
        request: &SpeechRequest,
        sink: VisemeSink,
    ) -> Result<Box<dyn SynthesisHandle>, Error>;
}

impl<P: SpeechProvider + ?Sized> SpeechProvider for Box<P> {
    fn synthesize(
        &mut self,
        request: &SpeechRequest,
        sink: VisemeSink,
    ) -> Result<Box<dyn SynthesisHandle>, Error> {
        (**self).synthesize(request, sink)
    }
}

struct FinishedSynthesis;

impl SynthesisHandle for FinishedSynthesis {
    fn stop(&mut self) {}
}

/// Offline provider that estimates a viseme timeline from the letters of the text.
///
/// No audio is produced; all events and the end signal are delivered before `synthesize`
/// returns. Useful for demos and as a stand-in when no speech service is reachable.
#[derive(Clone, Debug)]
pub struct EstimatedSpeech {
    /// Length of an average letter in milliseconds.
    pub letter_ms: f64,
}

impl Default for EstimatedSpeech {
    fn default() -> Self {
        Self { letter_ms: 80.0 }
    }
}

impl EstimatedSpeech {
    pub fn timeline(&self, text: &str) -> Vec<VisemeEvent> {
        let mut out: Vec<VisemeEvent> = Vec::new();
        let mut offset = 0.0;
        // The mouth starts closed, so leading silence emits nothing.
        let mut last_id = 0;
        for c in text.chars().flat_map(char::to_lowercase) {
            let (id, scale) = letter_viseme(c);
            if last_id != id {
                out.push(VisemeEvent::new(id, offset));
                last_id = id;
            }
            offset += self.letter_ms * scale;
        }
        if last_id != 0 {
            out.push(VisemeEvent::new(0, offset));
        }
        out
    }
}

impl SpeechProvider for EstimatedSpeech {
    fn synthesize(
        &mut self,
        request: &SpeechRequest,
        sink: VisemeSink,
    ) -> Result<Box<dyn SynthesisHandle>, Error> {
        for event in self.timeline(&request.text) {
            sink.viseme(event.id, event.offset_ms);
        }
        sink.end();
        Ok(Box::new(FinishedSynthesis))
    }
}

// Ids of the default `VisemeMap` table, grouped by mouth shape; vowels are held longer than
// plosives.
fn letter_viseme(c: char) -> (u32, f64) {
    match c {
        'a' | 'â' => (2, 1.5),
        'e' => (7, 1.5),
        'i' | 'ı' | 'î' => (6, 1.5),
        'o' | 'ö' => (4, 1.5),
        'u' | 'ü' | 'û' => (5, 1.5),
        'y' => (6, 1.0),
        'w' => (5, 1.0),
        'h' => (2, 1.0),
        'r' => (13, 1.0),
        'l' => (19, 1.0),
        's' | 'z' => (11, 0.8),
        'ş' | 'ç' | 'c' | 'j' => (10, 1.0),
        'f' | 'v' => (8, 0.8),
        't' => (16, 0.8),
        'd' => (15, 0.8),
        'n' => (12, 0.8),
        'k' | 'g' | 'ğ' | 'q' | 'x' => (9, 0.8),
        'p' | 'b' | 'm' => (1, 0.8),
        c if c.is_alphanumeric() => (15, 1.0),
        _ => (0, 1.0),
    }
}
