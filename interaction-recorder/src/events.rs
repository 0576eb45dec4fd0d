use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

use crate::dom::DomNode;
use crate::{RecorderError, Result};

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// The interaction kinds a page listener is attached for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Click,
    Keypress,
    Input,
}

impl InteractionKind {
    pub const ALL: [InteractionKind; 3] = [Self::Click, Self::Keypress, Self::Input];

    /// DOM event type name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Click => "click",
            Self::Keypress => "keypress",
            Self::Input => "input",
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionKind {
    type Err = RecorderError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RecorderError::UnknownKind(s.to_string()))
    }
}

/// An interaction as the page dispatches it to a root-level listener
#[derive(Debug, Clone)]
pub struct RawInteraction<N> {
    pub kind: InteractionKind,

    /// The event's `timeStamp`, milliseconds relative to page load
    pub time_stamp: f64,

    /// The event's composed propagation path, innermost node first
    pub composed_path: Vec<N>,

    /// The keypress character code, zero for other kinds
    pub char_code: u32,
}

impl<N: DomNode> RawInteraction<N> {
    pub fn click(time_stamp: f64, composed_path: Vec<N>) -> Self {
        Self {
            kind: InteractionKind::Click,
            time_stamp,
            composed_path,
            char_code: 0,
        }
    }

    pub fn keypress(time_stamp: f64, composed_path: Vec<N>, char_code: u32) -> Self {
        Self {
            kind: InteractionKind::Keypress,
            time_stamp,
            composed_path,
            char_code,
        }
    }

    pub fn input(time_stamp: f64, composed_path: Vec<N>) -> Self {
        Self {
            kind: InteractionKind::Input,
            time_stamp,
            composed_path,
            char_code: 0,
        }
    }

    /// The innermost node of the composed path.
    ///
    /// This is the element the user actually touched, even when the event was
    /// retargeted to a shadow host by the time it reached the listener.
    pub fn target(&self) -> Result<&N> {
        let target = self.composed_path.first().ok_or_else(|| {
            RecorderError::MalformedTarget(format!("{} event has an empty composed path", self.kind))
        })?;
        if !target.is_element() {
            return Err(RecorderError::MalformedTarget(format!(
                "{} event target is not an element",
                self.kind
            )));
        }
        Ok(target)
    }
}

/// Canonical log record for one interaction, tagged by `event`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum EventRecord {
    Click {
        timestamp: f64,
        selector: String,
    },

    Keypress {
        timestamp: f64,
        selector: String,
        /// Absent when the target exposes no value
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(rename = "charCode")]
        char_code: u32,
    },

    Input {
        timestamp: f64,
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
}

impl EventRecord {
    pub fn kind(&self) -> InteractionKind {
        match self {
            Self::Click { .. } => InteractionKind::Click,
            Self::Keypress { .. } => InteractionKind::Keypress,
            Self::Input { .. } => InteractionKind::Input,
        }
    }

    pub fn timestamp(&self) -> f64 {
        match self {
            Self::Click { timestamp, .. }
            | Self::Keypress { timestamp, .. }
            | Self::Input { timestamp, .. } => *timestamp,
        }
    }

    pub fn selector(&self) -> &str {
        match self {
            Self::Click { selector, .. }
            | Self::Keypress { selector, .. }
            | Self::Input { selector, .. } => selector,
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Click { .. } => None,
            Self::Keypress { value, .. } | Self::Input { value, .. } => value.as_deref(),
        }
    }

    pub fn char_code(&self) -> Option<u32> {
        match self {
            Self::Keypress { char_code, .. } => Some(*char_code),
            _ => None,
        }
    }

    /// Short human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Click { .. } => "CLICK",
            Self::Keypress { .. } => "KEY",
            Self::Input { .. } => "TYPE",
        }
    }
}

/// Represents a recorded interaction session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedSession {
    /// The name of the session
    pub name: String,

    /// The marker that prefixed every emitted line
    pub marker: String,

    /// The timestamp when the recording started (milliseconds since epoch)
    pub start_time: u64,

    /// The timestamp when the recording ended
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<u64>,

    /// The recorded events, in firing order
    pub events: Vec<EventRecord>,
}

impl RecordedSession {
    pub fn new(name: impl Into<String>, marker: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            marker: marker.into(),
            start_time: now_millis(),
            end_time: None,
            events: Vec::new(),
        }
    }

    pub fn add_event(&mut self, event: EventRecord) {
        self.events.push(event);
    }

    /// Finish the recording. Later calls keep the first end time.
    pub fn finish(&mut self) {
        self.end_time.get_or_insert_with(now_millis);
    }

    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
