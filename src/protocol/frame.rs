use std::fmt;
use std::io::{Cursor, Write};

use bytes::{Buf, BufMut, BytesMut};

use crate::protocol::{frameprefix, DELIMITER};

// Frame is a unit of the store's request/response protocol.
// Requests are always arrays of bulk strings, replies may be any variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Vec<u8>),
    // Null bulk string or null array.
    Null,
    Array(Vec<Frame>),
}

#[derive(Debug)]
pub enum FrameError {
    /// Not enough data is available to decode a frame from buffer.
    Incomplete,
    Invalid(String),
}

type ByteCursor<'a> = Cursor<&'a [u8]>;

// Deepest array nesting accepted from a peer. replies the tool reads nest at most twice.
pub const MAX_DEPTH: usize = 32;

impl Frame {
    // Check whether an entire frame can be decoded from src.
    // on success, the cursor is positioned at the end of the frame.
    pub fn check(src: &mut ByteCursor) -> Result<(), FrameError> {
        Frame::check_nested(src, 0)
    }

    fn check_nested(src: &mut ByteCursor, depth: usize) -> Result<(), FrameError> {
        match cursor::get_u8(src)? {
            frameprefix::SIMPLE | frameprefix::ERROR => {
                cursor::get_line(src)?;
                Ok(())
            }
            frameprefix::INTEGER => {
                cursor::get_signed(src)?;
                Ok(())
            }
            frameprefix::BULK => match cursor::get_length(src)? {
                // skip bytes length + delimiter
                Some(len) => cursor::skip(src, len + 2),
                None => Ok(()),
            },
            frameprefix::ARRAY => {
                if let Some(len) = cursor::get_length(src)? {
                    let depth = nested(depth)?;
                    for _ in 0..len {
                        Frame::check_nested(src, depth)?;
                    }
                }
                Ok(())
            }
            prefix => Err(FrameError::Invalid(format!(
                "unknown frame prefix {:?}",
                prefix as char
            ))),
        }
    }

    pub fn parse(src: &mut ByteCursor) -> Result<Frame, FrameError> {
        Frame::parse_nested(src, 0)
    }

    fn parse_nested(src: &mut ByteCursor, depth: usize) -> Result<Frame, FrameError> {
        match cursor::get_u8(src)? {
            frameprefix::SIMPLE => Ok(Frame::Simple(cursor::get_string(src)?)),
            frameprefix::ERROR => Ok(Frame::Error(cursor::get_string(src)?)),
            frameprefix::INTEGER => Ok(Frame::Integer(cursor::get_signed(src)?)),
            frameprefix::BULK => {
                let len = match cursor::get_length(src)? {
                    Some(len) => len,
                    None => return Ok(Frame::Null),
                };
                let n = len + 2;
                if src.remaining() < n {
                    return Err(FrameError::Incomplete);
                }
                if &src.chunk()[len..n] != DELIMITER {
                    return Err(FrameError::Invalid(
                        "bulk string is not terminated by delimiter".into(),
                    ));
                }
                let value = Vec::from(&src.chunk()[..len]);

                cursor::skip(src, n)?;

                Ok(Frame::Bulk(value))
            }
            frameprefix::ARRAY => {
                let len = match cursor::get_length(src)? {
                    Some(len) => len,
                    None => return Ok(Frame::Null),
                };
                let depth = nested(depth)?;
                let mut frames = Vec::with_capacity(len.min(1024));
                for _ in 0..len {
                    frames.push(Frame::parse_nested(src, depth)?);
                }
                Ok(Frame::Array(frames))
            }
            prefix => Err(FrameError::Invalid(format!(
                "unknown frame prefix {:?}",
                prefix as char
            ))),
        }
    }

    // Append wire expression to dst.
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Frame::Simple(val) => {
                dst.put_u8(frameprefix::SIMPLE);
                dst.put_slice(val.as_bytes());
                dst.put_slice(DELIMITER);
            }
            Frame::Error(val) => {
                dst.put_u8(frameprefix::ERROR);
                dst.put_slice(val.as_bytes());
                dst.put_slice(DELIMITER);
            }
            Frame::Integer(val) => {
                dst.put_u8(frameprefix::INTEGER);
                put_decimal(dst, *val);
            }
            Frame::Bulk(val) => {
                dst.put_u8(frameprefix::BULK);
                put_decimal(dst, val.len() as i64);
                dst.put_slice(val);
                dst.put_slice(DELIMITER);
            }
            Frame::Null => {
                dst.put_u8(frameprefix::BULK);
                put_decimal(dst, -1);
            }
            Frame::Array(frames) => {
                dst.put_u8(frameprefix::ARRAY);
                put_decimal(dst, frames.len() as i64);
                for frame in frames {
                    frame.encode(dst);
                }
            }
        }
    }
}

fn nested(depth: usize) -> Result<usize, FrameError> {
    if depth >= MAX_DEPTH {
        return Err(FrameError::Invalid(format!(
            "array nesting exceeds {}",
            MAX_DEPTH
        )));
    }
    Ok(depth + 1)
}

pub(super) fn put_decimal(dst: &mut BytesMut, val: i64) {
    let mut buf = [0u8; 20];
    let mut buf = Cursor::new(&mut buf[..]);
    // 20 bytes always hold an i64.
    let _ = write!(&mut buf, "{}", val);

    let pos = buf.position() as usize;
    dst.put_slice(&buf.get_ref()[..pos]);
    dst.put_slice(DELIMITER);
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Frame::Simple(s) => write!(f, "{}", s),
            Frame::Error(s) => write!(f, "(error) {}", s),
            Frame::Integer(n) => write!(f, "(integer) {}", n),
            Frame::Bulk(val) if val.len() > 64 => {
                write!(f, "{:?}...", String::from_utf8_lossy(&val[..64]))
            }
            Frame::Bulk(val) => write!(f, "{:?}", String::from_utf8_lossy(val)),
            Frame::Null => write!(f, "(nil)"),
            Frame::Array(frames) => {
                write!(f, "[")?;
                for (i, frame) in frames.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    frame.fmt(f)?;
                }
                write!(f, "]")
            }
        }
    }
}

// cursor utilities.
mod cursor {
    use atoi::FromRadix10SignedChecked;

    use super::*;

    pub(super) fn get_u8(src: &mut ByteCursor) -> Result<u8, FrameError> {
        if !src.has_remaining() {
            return Err(FrameError::Incomplete);
        }
        Ok(src.get_u8())
    }

    pub(super) fn skip(src: &mut ByteCursor, n: usize) -> Result<(), FrameError> {
        if src.remaining() < n {
            return Err(FrameError::Incomplete);
        }
        src.advance(n);
        Ok(())
    }

    // Integer replies and lengths may be negative, e.g. `:-1` and `$-1`.
    pub(super) fn get_signed(src: &mut ByteCursor) -> Result<i64, FrameError> {
        let line = get_line(src)?;

        match i64::from_radix_10_signed_checked(line) {
            (Some(n), used) if used == line.len() && line.last().map_or(false, u8::is_ascii_digit) => {
                Ok(n)
            }
            _ => Err(FrameError::Invalid(format!(
                "invalid protocol decimal format {:?}",
                String::from_utf8_lossy(line)
            ))),
        }
    }

    // Bulk and array lengths. -1 denotes null.
    pub(super) fn get_length(src: &mut ByteCursor) -> Result<Option<usize>, FrameError> {
        match get_signed(src)? {
            -1 => Ok(None),
            n if n >= 0 => Ok(Some(n as usize)),
            n => Err(FrameError::Invalid(format!("invalid length {}", n))),
        }
    }

    pub(super) fn get_string(src: &mut ByteCursor) -> Result<String, FrameError> {
        let line = get_line(src)?.to_vec();
        String::from_utf8(line).map_err(|e| FrameError::Invalid(e.to_string()))
    }

    pub(super) fn get_line<'a>(src: &'a mut ByteCursor) -> Result<&'a [u8], FrameError> {
        let start = src.position() as usize;
        let end = src.get_ref().len().saturating_sub(1);

        for i in start..end {
            if src.get_ref()[i] == DELIMITER[0] && src.get_ref()[i + 1] == DELIMITER[1] {
                src.set_position((i + 2) as u64);

                return Ok(&src.get_ref()[start..i]);
            }
        }

        Err(FrameError::Incomplete)
    }
}
