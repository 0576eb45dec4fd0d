use crate::dom::DomNode;
use crate::encoder::{EventEncoder, LogSink, Marker};
use crate::events::{EventRecord, InteractionKind, RawInteraction, RecordedSession};
use crate::{RecorderError, Result};
use serde::{Deserialize, Serialize};
use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tokio::sync::broadcast;
use tokio_stream::Stream;
use tracing::{debug, info, warn};

/// Configuration for the interaction recorder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Whether to record click events
    pub record_clicks: bool,

    /// Whether to record keypress events
    pub record_keypresses: bool,

    /// Whether to record input events
    pub record_inputs: bool,

    /// Fixed output marker. A random one is generated when unset.
    pub marker: Option<String>,

    /// Capacity of the broadcast channel feeding `event_stream` subscribers
    pub event_buffer: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            record_clicks: true,
            record_keypresses: true,
            record_inputs: true,
            marker: None,
            event_buffer: 100,
        }
    }
}

impl RecorderConfig {
    /// Whether a listener for `kind` is attached
    pub fn records(&self, kind: InteractionKind) -> bool {
        match kind {
            InteractionKind::Click => self.record_clicks,
            InteractionKind::Keypress => self.record_keypresses,
            InteractionKind::Input => self.record_inputs,
        }
    }

    /// The configured marker, or a freshly generated one
    pub fn resolve_marker(&self) -> Result<Marker> {
        match &self.marker {
            Some(marker) => Marker::new(marker.clone()),
            None => Ok(Marker::generate()),
        }
    }
}

/// The widget's record/stop toggle, taking a single string message
pub trait RecordToggle {
    fn toggle(&self, message: &str);
}

impl<F: Fn(&str)> RecordToggle for F {
    fn toggle(&self, message: &str) {
        self(message)
    }
}

/// The interaction recorder
pub struct InteractionRecorder<S: LogSink> {
    /// The recorded session
    pub session: Arc<Mutex<RecordedSession>>,

    /// The event sender
    event_tx: broadcast::Sender<EventRecord>,

    encoder: EventEncoder,

    config: RecorderConfig,

    sink: S,
}

impl<S: LogSink> InteractionRecorder<S> {
    /// Create a new recorder writing its lines to `sink`
    pub fn new(name: impl Into<String>, config: RecorderConfig, sink: S) -> Result<Self> {
        let marker = config.resolve_marker()?;
        let session = Arc::new(Mutex::new(RecordedSession::new(name, marker.as_str())));
        let (event_tx, _) = broadcast::channel(config.event_buffer.max(1));

        info!(
            clicks = config.record_clicks,
            keypresses = config.record_keypresses,
            inputs = config.record_inputs,
            "Starting interaction recording"
        );

        Ok(Self {
            session,
            event_tx,
            encoder: EventEncoder::new(marker),
            config,
            sink,
        })
    }

    pub fn marker(&self) -> &Marker {
        self.encoder.marker()
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn is_stopped(&self) -> bool {
        self.lock_session().is_finished()
    }

    /// Lock the session, recovering it if a holder panicked
    fn lock_session(&self) -> MutexGuard<'_, RecordedSession> {
        self.session.lock().unwrap_or_else(|poisoned| {
            warn!("Session lock was poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    /// Get a stream of recorded events
    pub fn event_stream(&self) -> impl Stream<Item = EventRecord> {
        let mut rx = self.event_tx.subscribe();
        Box::pin(async_stream::stream! {
            loop {
                match rx.recv().await {
                    Ok(event) => yield event,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        // Log but continue - don't terminate stream on lag
                        tracing::warn!("Event stream lagged, skipped {} events", skipped);
                        continue;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        })
    }

    /// Handle one interaction fired on the page.
    ///
    /// Returns `None` when no listener is attached for its kind or the
    /// recording has been stopped. Otherwise exactly one line is written to
    /// the sink and the record is appended to the session and broadcast.
    pub fn dispatch<N: DomNode>(&mut self, raw: &RawInteraction<N>) -> Result<Option<EventRecord>> {
        if !self.config.records(raw.kind) {
            debug!(kind = %raw.kind, "no listener attached, ignoring");
            return Ok(None);
        }
        if self.is_stopped() {
            debug!(kind = %raw.kind, "recording stopped, ignoring");
            return Ok(None);
        }

        let record = self.encoder.emit(raw, &mut self.sink)?;

        self.lock_session().add_event(record.clone());
        // No subscribers is fine
        let _ = self.event_tx.send(record.clone());

        Ok(Some(record))
    }

    /// Stop recording.
    ///
    /// Signals `toggle` with an empty message and finalizes the session. Only
    /// the first call has an effect.
    pub fn stop(&mut self, toggle: &dyn RecordToggle) {
        if self.is_stopped() {
            return;
        }
        info!("Stopping interaction recording");
        toggle.toggle("");

        let mut session = self.lock_session();
        session.finish();
        info!("Recorded {} events", session.events.len());
    }

    /// Save the recorded session to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        info!("Saving interaction recording to {:?}", path.as_ref());

        let session = self
            .session
            .lock()
            .map_err(|e| RecorderError::SaveError(format!("Failed to lock session: {e}")))?;

        session
            .save_to_file(path)
            .map_err(|e| RecorderError::SaveError(format!("Failed to save session: {e}")))?;

        Ok(())
    }
}
