//! Length-framed record encoding.
//!
//! The record log is a concatenation of `<u64 big-endian size><size bytes
//! of record body>`. Readers parse by repeatedly reading 8 bytes, then that
//! many.

use prost::Message;
use std::io::{self, Read};

/// Appends one framed message to `buf`.
pub fn append_frame(buf: &mut Vec<u8>, body: &[u8]) {
    buf.extend_from_slice(&(body.len() as u64).to_be_bytes());
    buf.extend_from_slice(body);
}

/// Encodes `message` with its length frame.
pub fn encode_frame(message: &impl Message) -> Vec<u8> {
    let body = message.encode_to_vec();
    let mut buf = Vec::with_capacity(body.len() + 8);
    append_frame(&mut buf, &body);
    buf
}

/// Incremental reader for a framed record stream.
pub struct FrameReader<R: Read> {
    input: R,
}

impl<R: Read> FrameReader<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }

    /// Reads the next frame body, or `None` at a clean end of stream.
    pub fn next_frame(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut size_bytes = [0u8; 8];
        match self.input.read_exact(&mut size_bytes) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e),
        }
        let size = u64::from_be_bytes(size_bytes) as usize;
        let mut body = vec![0u8; size];
        self.input.read_exact(&mut body)?;
        Ok(Some(body))
    }

    /// Reads and decodes the next message, or `None` at a clean end of
    /// stream.
    pub fn next_message<T: Message + Default>(&mut self) -> io::Result<Option<T>> {
        match self.next_frame()? {
            Some(body) => T::decode(body.as_slice())
                .map(Some)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{storage_record, AnalogResponse, Span, StorageRecord, Text};

    fn analog_record(node: &str, samples: &[f64]) -> StorageRecord {
        StorageRecord {
            time: 123,
            node: node.to_string(),
            body: Some(storage_record::Body::Analog(AnalogResponse {
                data: samples.to_vec(),
                spans: vec![Span {
                    begin: 0,
                    end: samples.len() as u64,
                    name: "0".to_string(),
                }],
                sample_intervals: vec![1_000_000],
                ..Default::default()
            })),
        }
    }

    #[test]
    fn test_frame_round_trip() {
        let records = vec![
            analog_record("wave", &[0.0, 0.5, 1.0]),
            StorageRecord {
                time: 456,
                node: "log".to_string(),
                body: Some(storage_record::Body::Text(Text {
                    text: "hello".to_string(),
                    time: 456,
                    ..Default::default()
                })),
            },
        ];

        let mut buf = Vec::new();
        for record in &records {
            append_frame(&mut buf, &prost::Message::encode_to_vec(record));
        }

        let mut reader = FrameReader::new(buf.as_slice());
        let mut decoded = Vec::new();
        while let Some(record) = reader.next_message::<StorageRecord>().unwrap() {
            decoded.push(record);
        }
        assert_eq!(records, decoded);
    }

    #[test]
    fn test_truncated_frame_is_an_error() {
        let mut buf = encode_frame(&analog_record("wave", &[1.0]));
        buf.truncate(buf.len() - 1);
        let mut reader = FrameReader::new(buf.as_slice());
        assert!(reader.next_frame().is_err());
    }

    #[test]
    fn test_size_prefix_is_big_endian() {
        let mut buf = Vec::new();
        append_frame(&mut buf, &[7u8; 3]);
        assert_eq!(&buf[..8], &[0, 0, 0, 0, 0, 0, 0, 3]);
    }
}
