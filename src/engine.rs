use crate::backends::{SynthBackend, Voice};
use crate::config_loader::Settings;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, warn};

/// One request to synthesize and play a specific text.
/// Built fresh per speak action and discarded afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct UtteranceRequest {
    pub text: String,
    pub voice: Voice,
    pub rate: f32,
    pub pitch: f32,
}

/// Notifications the engine delivers back to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Started,
    Ended,
    /// Carries the engine-reported error code verbatim.
    Error(String),
    /// The platform voice catalog changed and should be re-enumerated.
    /// Some platforms never send this.
    CatalogChanged,
}

/// The external speech capability the controller delegates to.
///
/// `speak` is fire-and-forget; progress comes back as [`EngineEvent`]s on the
/// channel the engine was built with. `cancel` is advisory: the engine may
/// keep producing audio briefly after it returns.
pub trait SpeechEngine: Send + Sync {
    fn list_voices(&self) -> io::Result<Vec<Voice>>;
    fn speak(&self, request: UtteranceRequest);
    fn cancel(&self);
    fn is_busy(&self) -> bool;
}

/// Builds the engine named by the settings, or `None` when the host offers
/// no usable speech support at all.
pub fn build(
    settings: &Settings,
    events: UnboundedSender<EngineEvent>,
) -> Option<Arc<dyn SpeechEngine>> {
    if !settings.enable_audio {
        debug!("audio disabled, using null engine");
        return Some(Arc::new(NullEngine::new(events)));
    }
    match settings.tts_backend.as_str() {
        "espeak" => Some(Arc::new(AudioEngine::new(
            Arc::new(crate::backends::espeak::EspeakBackend::from_settings(settings)),
            events,
        ))),
        "null" => Some(Arc::new(NullEngine::new(events))),
        other => {
            error!("unknown tts_backend '{}', speech disabled", other);
            None
        }
    }
}

/// Plays synthesized audio on a dedicated thread and reports progress.
///
/// The rodio output stream is not `Send`, so it lives on the worker thread
/// for the lifetime of the engine; requests arrive over a channel.
pub struct AudioEngine {
    backend: Arc<dyn SynthBackend>,
    tx: Sender<UtteranceRequest>,
    busy: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
}

impl AudioEngine {
    pub fn new(backend: Arc<dyn SynthBackend>, events: UnboundedSender<EngineEvent>) -> Self {
        let (tx, rx) = channel::<UtteranceRequest>();
        let busy = Arc::new(AtomicBool::new(false));
        let cancelled = Arc::new(AtomicBool::new(false));

        let worker_backend = backend.clone();
        let worker_busy = busy.clone();
        let worker_cancelled = cancelled.clone();
        thread::spawn(move || {
            run_worker(worker_backend, rx, events, worker_busy, worker_cancelled);
        });

        Self {
            backend,
            tx,
            busy,
            cancelled,
        }
    }
}

impl SpeechEngine for AudioEngine {
    fn list_voices(&self) -> io::Result<Vec<Voice>> {
        self.backend.list_voices()
    }

    fn speak(&self, request: UtteranceRequest) {
        self.cancelled.store(false, Ordering::SeqCst);
        self.busy.store(true, Ordering::SeqCst);
        if self.tx.send(request).is_err() {
            warn!("audio worker is gone, dropping utterance");
            self.busy.store(false, Ordering::SeqCst);
        }
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

fn run_worker(
    backend: Arc<dyn SynthBackend>,
    rx: std::sync::mpsc::Receiver<UtteranceRequest>,
    events: UnboundedSender<EngineEvent>,
    busy: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
) {
    use rodio::{Decoder, OutputStream, Sink, Source};
    use std::io::Cursor;

    // Audio stream must live on this thread.
    let stream = OutputStream::try_default();
    let stream_handle = match &stream {
        Ok((_stream, handle)) => Some(handle.clone()),
        Err(e) => {
            error!("no audio output device: {}", e);
            None
        }
    };

    while let Ok(request) = rx.recv() {
        if cancelled.swap(false, Ordering::SeqCst) {
            // Cancel raced ahead of a queued request; drop it unplayed.
            busy.store(false, Ordering::SeqCst);
            continue;
        }

        let outcome = (|| -> Result<(), String> {
            let handle = stream_handle.as_ref().ok_or("audio-unavailable")?;
            let wav = backend
                .synthesize(&request)
                .map_err(|e| {
                    error!("synthesis failed: {}", e);
                    "synthesis-failed".to_string()
                })?;
            let source = Decoder::new(Cursor::new(wav)).map_err(|e| {
                error!("failed to decode backend output: {}", e);
                "audio-unavailable".to_string()
            })?;
            let sink = Sink::try_new(handle).map_err(|e| {
                error!("failed to open sink: {}", e);
                "audio-unavailable".to_string()
            })?;

            let _ = events.send(EngineEvent::Started);
            sink.append(source.convert_samples::<f32>());
            while !sink.empty() {
                if cancelled.swap(false, Ordering::SeqCst) {
                    sink.stop();
                    break;
                }
                thread::sleep(Duration::from_millis(20));
            }
            let _ = events.send(EngineEvent::Ended);
            Ok(())
        })();

        if let Err(code) = outcome {
            let _ = events.send(EngineEvent::Error(code));
        }
        busy.store(false, Ordering::SeqCst);
    }
    debug!("audio worker shutting down");
}

/// Silent engine for audio-less hosts and demos: reports the usual event
/// sequence with playback time proportional to text length, but makes no
/// sound. Also announces its (fixed) catalog once, shortly after startup,
/// the way late-enumerating platforms do.
pub struct NullEngine {
    events: UnboundedSender<EngineEvent>,
    busy: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
}

impl NullEngine {
    pub fn new(events: UnboundedSender<EngineEvent>) -> Self {
        let announce = events.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            let _ = announce.send(EngineEvent::CatalogChanged);
        });
        Self {
            events,
            busy: Arc::new(AtomicBool::new(false)),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    fn builtin_voices() -> Vec<Voice> {
        vec![
            Voice::new("Albert", "en-GB"),
            Voice::new("Hoda", "ar-EG"),
            Voice::new("Samantha", "en-US"),
            Voice::new("Thomas", "fr-FR"),
        ]
    }
}

impl SpeechEngine for NullEngine {
    fn list_voices(&self) -> io::Result<Vec<Voice>> {
        Ok(Self::builtin_voices())
    }

    fn speak(&self, request: UtteranceRequest) {
        self.cancelled.store(false, Ordering::SeqCst);
        self.busy.store(true, Ordering::SeqCst);

        let events = self.events.clone();
        let busy = self.busy.clone();
        let cancelled = self.cancelled.clone();
        thread::spawn(move || {
            let _ = events.send(EngineEvent::Started);
            // ~30ms per character at rate 1.0, capped so long texts stay testable
            let per_char = (30.0 / request.rate.max(0.1)) as u64;
            let total = (request.text.chars().count() as u64 * per_char).min(3_000);
            let mut elapsed = 0u64;
            while elapsed < total {
                if cancelled.swap(false, Ordering::SeqCst) {
                    break;
                }
                thread::sleep(Duration::from_millis(10));
                elapsed += 10;
            }
            let _ = events.send(EngineEvent::Ended);
            busy.store(false, Ordering::SeqCst);
        });
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}
