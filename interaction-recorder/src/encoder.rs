//! Event encoding and the marker-prefixed output channel
//!
//! Every record leaves the page as one line of the form
//! `<marker>{"event":...}`. The marker is fixed for a recording so the host
//! can pick these lines out of unrelated console output.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use tracing::{debug, warn};

use crate::dom::DomNode;
use crate::events::{EventRecord, InteractionKind, RawInteraction};
use crate::locator::path_for;
use crate::{RecorderError, Result};

/// Length of generated markers
pub const MARKER_LEN: usize = 32;

/// Private prefix that tags recorder output lines
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Marker(String);

impl Marker {
    /// Use a caller-supplied marker.
    ///
    /// Rejects empty markers, markers spanning lines and markers containing
    /// `{`, which would make the start of the JSON body ambiguous.
    pub fn new(marker: impl Into<String>) -> Result<Self> {
        let marker = marker.into();
        if marker.is_empty() {
            return Err(RecorderError::InvalidMarker("marker is empty".to_string()));
        }
        if marker.contains(['\n', '\r']) {
            return Err(RecorderError::InvalidMarker(
                "marker must fit on a single line".to_string(),
            ));
        }
        if marker.contains('{') {
            return Err(RecorderError::InvalidMarker(
                "marker must not contain '{'".to_string(),
            ));
        }
        Ok(Self(marker))
    }

    /// A fresh random marker for a new recording session
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The rest of `line` after the marker, `None` when the line is not ours
    pub fn strip<'a>(&self, line: &'a str) -> Option<&'a str> {
        line.strip_prefix(self.0.as_str())
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Marker {
    type Error = RecorderError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Marker> for String {
    fn from(marker: Marker) -> Self {
        marker.0
    }
}

/// Textual channel receiving one serialized record per line
pub trait LogSink {
    fn write_line(&mut self, line: &str) -> std::io::Result<()>;
}

/// Collects lines in memory
impl LogSink for Vec<String> {
    fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        self.push(line.to_string());
        Ok(())
    }
}

impl<S: LogSink + ?Sized> LogSink for &mut S {
    fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        (**self).write_line(line)
    }
}

/// Writes newline-terminated lines to any `io::Write`, flushing after each
pub struct WriterSink<W: Write> {
    writer: W,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> LogSink for WriterSink<W> {
    fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

/// Turns raw interactions into records and marker-prefixed lines.
///
/// Holds nothing but the marker, so one encoder serves every event of a
/// recording.
#[derive(Debug, Clone)]
pub struct EventEncoder {
    marker: Marker,
}

impl EventEncoder {
    pub fn new(marker: Marker) -> Self {
        Self { marker }
    }

    pub fn marker(&self) -> &Marker {
        &self.marker
    }

    /// Build the record for `raw`, locating the innermost composed-path target
    pub fn encode<N: DomNode>(&self, raw: &RawInteraction<N>) -> Result<EventRecord> {
        let target = raw.target()?;
        let timestamp = raw.time_stamp;
        let selector = path_for(target);

        let record = match raw.kind {
            InteractionKind::Click => EventRecord::Click {
                timestamp,
                selector,
            },
            InteractionKind::Keypress => EventRecord::Keypress {
                timestamp,
                selector,
                value: target.value().map(str::to_owned),
                char_code: raw.char_code,
            },
            InteractionKind::Input => EventRecord::Input {
                timestamp,
                selector,
                value: target.value().map(str::to_owned),
            },
        };
        debug!(kind = %raw.kind, selector = record.selector(), "encoded interaction");
        Ok(record)
    }

    /// The wire form of `record`: marker followed by the JSON object
    pub fn serialize(&self, record: &EventRecord) -> Result<String> {
        let body = serde_json::to_string(record)?;
        Ok(format!("{}{}", self.marker, body))
    }

    /// Encode `raw` and write it to `sink` as a single line.
    ///
    /// A failed write is logged and the line is lost; the record is still
    /// returned to the caller.
    pub fn emit<N: DomNode, S: LogSink + ?Sized>(
        &self,
        raw: &RawInteraction<N>,
        sink: &mut S,
    ) -> Result<EventRecord> {
        let record = self.encode(raw)?;
        let line = self.serialize(&record)?;
        if let Err(e) = sink.write_line(&line) {
            warn!(kind = %raw.kind, "dropping record, sink write failed: {e}");
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{DomTree, NodeId};

    struct BrokenSink;

    impl LogSink for BrokenSink {
        fn write_line(&mut self, _line: &str) -> std::io::Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    fn field_page() -> (DomTree, NodeId) {
        let mut tree = DomTree::new();
        let form = tree.create_element("FORM");
        tree.append_child(tree.document(), form).unwrap();
        let field = tree.create_element("INPUT");
        tree.set_attribute(field, "name", "q").unwrap();
        tree.set_value(field, "abc").unwrap();
        tree.append_child(form, field).unwrap();
        (tree, field)
    }

    #[test]
    fn test_marker_validation() {
        assert!(Marker::new("").is_err());
        assert!(Marker::new("a\nb").is_err());
        assert!(Marker::new("a{b").is_err());
        assert_eq!(Marker::new("__rec__").unwrap().as_str(), "__rec__");
    }

    #[test]
    fn test_generated_markers_differ() {
        let a = Marker::generate();
        let b = Marker::generate();
        assert_eq!(a.as_str().len(), MARKER_LEN);
        assert_ne!(a, b);
    }

    #[test]
    fn test_input_record_has_value_and_no_char_code() {
        let (tree, field) = field_page();
        let encoder = EventEncoder::new(Marker::new("M:").unwrap());
        let raw = RawInteraction::input(42.0, tree.composed_path(field).unwrap());

        let line = encoder.serialize(&encoder.encode(&raw).unwrap()).unwrap();
        assert_eq!(
            line,
            r#"M:{"event":"input","timestamp":42.0,"selector":"form>input[name=\"q\"]","value":"abc"}"#
        );
        assert!(!line.contains("charCode"));
    }

    #[test]
    fn test_keypress_captures_char_code() {
        let (tree, field) = field_page();
        let encoder = EventEncoder::new(Marker::generate());
        let raw = RawInteraction::keypress(7.5, tree.composed_path(field).unwrap(), 100);

        let record = encoder.encode(&raw).unwrap();
        assert_eq!(record.char_code(), Some(100));
        assert_eq!(record.value(), Some("abc"));
    }

    #[test]
    fn test_empty_path_is_malformed() {
        let encoder = EventEncoder::new(Marker::generate());
        let raw: RawInteraction<crate::tree::NodeRef<'_>> = RawInteraction::click(1.0, Vec::new());
        assert!(matches!(
            encoder.encode(&raw),
            Err(RecorderError::MalformedTarget(_))
        ));
    }

    #[test]
    fn test_non_element_target_is_malformed() {
        let tree = DomTree::new();
        let encoder = EventEncoder::new(Marker::generate());
        let raw = RawInteraction::click(1.0, tree.composed_path(tree.document()).unwrap());
        assert!(encoder.encode(&raw).is_err());
    }

    #[test]
    fn test_emit_survives_sink_failure() {
        let (tree, field) = field_page();
        let encoder = EventEncoder::new(Marker::generate());
        let raw = RawInteraction::click(1.0, tree.composed_path(field).unwrap());

        let record = encoder.emit(&raw, &mut BrokenSink).unwrap();
        assert_eq!(record.selector(), r#"form>input[name="q"]"#);
    }

    #[test]
    fn test_writer_sink_terminates_lines() {
        let mut sink = WriterSink::new(Vec::new());
        sink.write_line("one").unwrap();
        sink.write_line("two").unwrap();
        assert_eq!(sink.into_inner(), b"one\ntwo\n");
    }
}
