//! Host-side reading of the recorder channel
//!
//! Console output mixes the page's own logging with recorder lines. Only lines
//! starting with the session marker are decoded; everything else is skipped.

use std::io::BufRead;
use tracing::{debug, warn};

use crate::encoder::Marker;
use crate::events::EventRecord;
use crate::{RecorderError, Result};

/// Decode one console line.
///
/// Returns `None` when the line does not carry the marker.
pub fn decode_line(marker: &Marker, line: &str) -> Option<Result<EventRecord>> {
    decode_bytes(marker, line.as_bytes())
}

/// Decode one raw console line.
///
/// Foreign lines are never inspected beyond the marker, so they may hold
/// arbitrary bytes. A marked line must be UTF-8.
pub fn decode_bytes(marker: &Marker, line: &[u8]) -> Option<Result<EventRecord>> {
    let body = line.strip_prefix(marker.as_str().as_bytes())?;
    Some(
        std::str::from_utf8(body)
            .map_err(|e| RecorderError::InvalidLine(format!("marked line is not UTF-8: {e}")))
            .and_then(|body| {
                serde_json::from_str(body.trim_end_matches(['\r', '\n'])).map_err(Into::into)
            }),
    )
}

/// Iterates the records of a mixed log, in order.
///
/// A read error is yielded once and ends the iteration. Marked lines that fail
/// to decode are yielded as errors and reading goes on.
pub struct LogDecoder<R> {
    reader: R,
    marker: Marker,
    buf: Vec<u8>,
    line_number: usize,
    skipped: usize,
    done: bool,
}

impl<R: BufRead> LogDecoder<R> {
    pub fn new(reader: R, marker: Marker) -> Self {
        Self {
            reader,
            marker,
            buf: Vec::new(),
            line_number: 0,
            skipped: 0,
            done: false,
        }
    }

    /// Lines read so far
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Lines read so far that did not carry the marker
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<R: BufRead> Iterator for LogDecoder<R> {
    type Item = Result<EventRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    debug!(
                        lines = self.line_number,
                        skipped = self.skipped,
                        "reached end of log"
                    );
                    return None;
                }
                Ok(_) => self.line_number += 1,
                Err(e) => {
                    warn!(line = self.line_number + 1, "log read failed: {e}");
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }

            match decode_bytes(&self.marker, &self.buf) {
                Some(Ok(record)) => return Some(Ok(record)),
                Some(Err(e)) => {
                    warn!(line = self.line_number, "undecodable recorder line: {e}");
                    return Some(Err(e));
                }
                None => self.skipped += 1,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::InteractionKind;
    use std::io::{self, Read};

    /// Fails every read, like a directory opened as a file
    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "is a directory"))
        }
    }

    const LOG: &str = concat!(
        "page loaded\n",
        "#!{\"event\":\"click\",\"timestamp\":12.0,\"selector\":\"html>body>a\"}\n",
        "{\"event\":\"click\",\"timestamp\":1.0,\"selector\":\"forged\"}\n",
        "#!{\"event\":\"input\",\"timestamp\":15.5,\"selector\":\"input\",\"value\":\"hi\"}\r\n",
    );

    fn marker() -> Marker {
        Marker::new("#!").unwrap()
    }

    #[test]
    fn test_foreign_line_is_skipped() {
        assert!(decode_line(&marker(), "console noise").is_none());
    }

    #[test]
    fn test_decoder_keeps_only_marked_lines() {
        let mut decoder = LogDecoder::new(LOG.as_bytes(), marker());
        let records: Vec<EventRecord> = decoder.by_ref().map(|r| r.unwrap()).collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind(), InteractionKind::Click);
        assert_eq!(records[1].value(), Some("hi"));
        assert_eq!(decoder.skipped(), 2);
        assert_eq!(decoder.line_number(), 4);
    }

    #[test]
    fn test_corrupt_marked_line_is_an_error() {
        let result = decode_line(&marker(), "#!{\"event\":\"scroll\"}").unwrap();
        assert!(matches!(result, Err(RecorderError::Serialization(_))));
    }

    #[test]
    fn test_binary_foreign_line_is_skipped() {
        let log: &[u8] = b"\xff\xfe binary page noise\n#!{\"event\":\"click\",\"timestamp\":1.0,\"selector\":\"a\"}\n";
        let mut decoder = LogDecoder::new(log, marker());

        let records: Vec<EventRecord> = decoder.by_ref().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].selector(), "a");
        assert_eq!(decoder.skipped(), 1);
    }

    #[test]
    fn test_marked_line_with_invalid_utf8_is_an_error() {
        let result = decode_bytes(&marker(), b"#!{\"event\":\xff}").unwrap();
        assert!(matches!(result, Err(RecorderError::InvalidLine(_))));
    }

    #[test]
    fn test_read_error_ends_iteration() {
        let reader = io::BufReader::new(FailingReader);
        let items: Vec<_> = LogDecoder::new(reader, marker()).take(10).collect();

        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(RecorderError::Io(_))));
    }

    #[test]
    fn test_corrupt_marked_line_does_not_stop_decoding() {
        let log = "#!{\"event\":\"scroll\"}\n#!{\"event\":\"click\",\"timestamp\":2.0,\"selector\":\"b\"}\n";
        let items: Vec<_> = LogDecoder::new(log.as_bytes(), marker()).collect();

        assert_eq!(items.len(), 2);
        assert!(items[0].is_err());
        assert_eq!(items[1].as_ref().unwrap().selector(), "b");
    }
}
