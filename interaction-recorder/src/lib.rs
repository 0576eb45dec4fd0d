//! Interaction recorder
//!
//! This crate turns page interactions (clicks, keypresses and text input)
//! into replayable CSS selector paths and marker-prefixed JSON log lines.
//! Selector paths walk through shadow roots to their hosts, so elements
//! inside web components are addressed from the document root.
//! The host side reads the same lines back into typed records.

pub mod decoder;
pub mod dom;
pub mod encoder;
pub mod error;
pub mod events;
pub mod locator;
pub mod recorder;
pub mod snapshot;
pub mod tree;

pub use decoder::{decode_bytes, decode_line, LogDecoder};
pub use dom::{DomNode, SiblingIndex};
pub use encoder::{EventEncoder, LogSink, Marker, WriterSink, MARKER_LEN};
pub use error::*;
pub use events::{EventRecord, InteractionKind, RawInteraction, RecordedSession};
pub use locator::{fragment_for, path_for, path_segments, PATH_SEPARATOR};
pub use recorder::{InteractionRecorder, RecordToggle, RecorderConfig};
pub use snapshot::{BuiltDom, DomSnapshot, ElementSnapshot, ShadowSnapshot};
pub use tree::{Attribute, DomTree, NodeId, NodeRef, ShadowRootMode};
