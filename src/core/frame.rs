//! Purpose: Encode and decode single-record wire frames.
//! Exports: `FrameHeader`, `DecodeOptions`, `decode`, `decode_with`, `encode`, frame constants.
//! Role: Length-framed boundary between raw bytes and `Record`.
//! Invariants: Header is 14 bytes; the length field equals the payload length exactly.
//! Invariants: Reserved header bytes are written as zero and ignored on read.
use std::io::Cursor;

use serde::Deserialize;

use crate::core::error::{Error, ErrorKind};
use crate::core::value::Record;

pub const FRAME_HEADER_LEN: usize = 14;
pub const FORMAT_TAG: u8 = 0x1;
pub const MAX_RECORD_SIZE: usize = 8 * 1024 * 1024;

const LENGTH_OFFSET: usize = 2;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FrameHeader {
    pub payload_len: u32,
}

impl FrameHeader {
    pub fn new(payload_len: u32) -> Self {
        Self { payload_len }
    }

    pub fn encode(&self) -> [u8; FRAME_HEADER_LEN] {
        let mut buf = [0u8; FRAME_HEADER_LEN];
        buf[0] = FORMAT_TAG << 4;
        write_u32_be(&mut buf, LENGTH_OFFSET, self.payload_len);
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < FRAME_HEADER_LEN {
            return Err(Error::new(ErrorKind::MalformedFrame)
                .with_message(format!(
                    "frame is {} bytes, header needs {FRAME_HEADER_LEN}",
                    buf.len()
                )));
        }
        let tag = buf[0] >> 4;
        if tag != FORMAT_TAG {
            return Err(Error::new(ErrorKind::MalformedFrame)
                .with_message(format!("bad format tag {tag:#x}"))
                .with_offset(0));
        }
        Ok(Self {
            payload_len: read_u32_be(buf, LENGTH_OFFSET),
        })
    }
}

/// Preconditions applied by `decode_with` before the header is parsed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecodeOptions {
    pub max_record_size: Option<usize>,
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self {
            max_record_size: Some(MAX_RECORD_SIZE),
        }
    }

    pub fn unbounded() -> Self {
        Self {
            max_record_size: None,
        }
    }

    pub fn with_max_record_size(mut self, max: usize) -> Self {
        self.max_record_size = Some(max);
        self
    }
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self::new()
    }
}

pub fn decode(buf: &[u8]) -> Result<Record, Error> {
    decode_with(buf, &DecodeOptions::default())
}

pub fn decode_with(buf: &[u8], options: &DecodeOptions) -> Result<Record, Error> {
    match options.max_record_size {
        Some(max) if buf.len() > max => {
            return Err(Error::new(ErrorKind::RecordTooLarge)
                .with_message(format!("record is {} bytes, limit is {max}", buf.len()))
                .with_hint("Raise the record size limit or disable it for trusted input."));
        }
        Some(_) => {}
        None => tracing::debug!(len = buf.len(), "decoding frame without size limit"),
    }

    let header = FrameHeader::decode(buf)?;
    let payload = &buf[FRAME_HEADER_LEN..];
    if header.payload_len as usize != payload.len() {
        return Err(Error::new(ErrorKind::LengthMismatch)
            .with_message(format!(
                "header declares {} payload bytes, frame carries {}",
                header.payload_len,
                payload.len()
            ))
            .with_offset(LENGTH_OFFSET as u64));
    }

    decode_payload(payload)
}

fn decode_payload(payload: &[u8]) -> Result<Record, Error> {
    let mut cursor = Cursor::new(payload);
    let record = {
        let mut deserializer = rmp_serde::Deserializer::new(&mut cursor);
        Record::deserialize(&mut deserializer).map_err(|err| {
            Error::new(ErrorKind::Payload)
                .with_message("invalid record payload")
                .with_source(err)
        })?
    };
    let consumed = cursor.position();
    if consumed != payload.len() as u64 {
        return Err(Error::new(ErrorKind::Payload)
            .with_message(format!(
                "{} trailing bytes after record",
                payload.len() as u64 - consumed
            ))
            .with_offset(FRAME_HEADER_LEN as u64 + consumed));
    }
    Ok(record)
}

pub fn encode(record: &Record) -> Result<Vec<u8>, Error> {
    let payload = rmp_serde::to_vec(record).map_err(|err| {
        Error::new(ErrorKind::Encode)
            .with_message("failed to encode record payload")
            .with_source(err)
    })?;
    let payload_len = u32::try_from(payload.len()).map_err(|_| {
        Error::new(ErrorKind::Encode).with_message(format!(
            "payload of {} bytes exceeds the 32-bit length field",
            payload.len()
        ))
    })?;

    let mut buf = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    buf.extend_from_slice(&FrameHeader::new(payload_len).encode());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

fn read_u32_be(buf: &[u8], offset: usize) -> u32 {
    let mut out = [0u8; 4];
    out.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_be_bytes(out)
}

fn write_u32_be(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::{
        DecodeOptions, FRAME_HEADER_LEN, FrameHeader, MAX_RECORD_SIZE, decode, decode_with, encode,
    };
    use crate::core::error::ErrorKind;
    use crate::core::value::{DATETIME_MARKER, Record, Value};
    use time::macros::datetime;

    fn frame_with_payload(payload: &[u8]) -> Vec<u8> {
        let mut buf = FrameHeader::new(payload.len() as u32).encode().to_vec();
        buf.extend_from_slice(payload);
        buf
    }

    #[test]
    fn header_layout_is_bit_exact() {
        let buf = FrameHeader::new(0x0102_0304).encode();
        assert_eq!(buf.len(), FRAME_HEADER_LEN);
        assert_eq!(buf[0], 0x10);
        assert_eq!(&buf[2..6], &[0x01, 0x02, 0x03, 0x04]);
        assert!(buf[6..].iter().all(|byte| *byte == 0));
    }

    #[test]
    fn header_round_trip() {
        let header = FrameHeader::new(42);
        let decoded = FrameHeader::decode(&header.encode()).expect("decode");
        assert_eq!(header, decoded);
    }

    #[test]
    fn short_buffer_is_malformed() {
        let err = decode(&[0x10; 13]).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::MalformedFrame);
    }

    #[test]
    fn wrong_format_tag_is_malformed() {
        let mut buf = frame_with_payload(&[0x90]);
        buf[0] = 0x20;
        let err = decode(&buf).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::MalformedFrame);
    }

    #[test]
    fn low_nibble_and_reserved_bytes_are_tolerated() {
        let mut buf = frame_with_payload(&[0x91, 0x01]);
        buf[0] = 0x1f;
        buf[1] = 0xaa;
        buf[6..14].copy_from_slice(&[0xff; 8]);
        let record = decode(&buf).expect("decode");
        assert_eq!(record.fields(), &[Value::Int(1)]);
    }

    #[test]
    fn declared_length_must_match_payload() {
        let mut buf = FrameHeader::new(10).encode().to_vec();
        buf.extend_from_slice(&[0u8; 6]);
        assert_eq!(buf.len(), 20);
        let err = decode(&buf).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::LengthMismatch);
    }

    #[test]
    fn empty_payload_with_zero_length_is_a_payload_error() {
        let buf = FrameHeader::new(0).encode();
        let err = decode(&buf).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Payload);
    }

    #[test]
    fn trailing_payload_bytes_are_rejected() {
        let err = decode(&frame_with_payload(&[0x90, 0xc0])).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Payload);
        assert_eq!(err.offset(), Some(FRAME_HEADER_LEN as u64 + 1));
    }

    #[test]
    fn non_array_payload_is_rejected() {
        let err = decode(&frame_with_payload(&[0x05])).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::Payload);
    }

    #[test]
    fn encode_then_decode_reproduces_record() {
        let record = Record::new(vec![
            Value::Int(-3),
            Value::Float(2.5),
            Value::Bool(false),
            Value::from("text"),
            Value::Bytes(vec![0, 255]),
            Value::Nil,
            Value::List(vec![Value::Int(1), Value::Int(2)]),
            Value::Map(vec![(Value::from("k"), Value::from("v"))]),
            Value::Timestamp(datetime!(2023-11-14 22:13:20.25 UTC)),
        ]);
        let buf = encode(&record).expect("encode");
        assert_eq!(buf[0] >> 4, 0x1);
        assert_eq!(decode(&buf).expect("decode"), record);
    }

    #[test]
    fn hand_built_sentinel_decodes_to_timestamp() {
        // fixarray(2) ["__datetime__", 86400]
        let mut payload = vec![0x91, 0x92, 0xac];
        payload.extend_from_slice(DATETIME_MARKER.as_bytes());
        payload.extend_from_slice(&[0xce, 0x00, 0x01, 0x51, 0x80]);
        let record = decode(&frame_with_payload(&payload)).expect("decode");
        assert_eq!(
            record.fields(),
            &[Value::Timestamp(datetime!(1970-01-02 00:00:00 UTC))]
        );
    }

    #[test]
    fn size_guard_is_configurable() {
        let record = Record::new(vec![Value::from("x".repeat(64))]);
        let buf = encode(&record).expect("encode");

        let tight = DecodeOptions::new().with_max_record_size(16);
        let err = decode_with(&buf, &tight).expect_err("should fail");
        assert_eq!(err.kind(), ErrorKind::RecordTooLarge);

        assert_eq!(decode_with(&buf, &DecodeOptions::unbounded()).expect("decode"), record);
        assert_eq!(DecodeOptions::default().max_record_size, Some(MAX_RECORD_SIZE));
    }
}
