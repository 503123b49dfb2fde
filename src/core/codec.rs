//! Binary layout of a dump file.
//!
//! ```text
//! header: record_count u64
//! record: key_bytes u64 | key
//!         ttl_ms i64
//!         payload_bytes u64 | payload
//! ```
//!
//! Every integer is big endian and fixed width, so a record can be decoded
//! without any outside boundary information.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::common::{Error, ErrorKind, Result};

// Remaining ttl of a key without expiry.
pub const NO_EXPIRY: i64 = -1;

// Keys are limited to 512MB by the store.
pub const MAX_KEY_BYTES: u64 = 512 * 1024 * 1024;

// Upper bound of the initial allocation for a length read from the file,
// so that a corrupted length does not allocate up front.
const PREALLOCATE_BYTES: u64 = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpHeader {
    pub record_count: u64,
}

// KeyDump is the captured state of a single key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDump {
    // binary safe key name.
    pub key: Vec<u8>,
    // milliseconds. NO_EXPIRY if the key does not expire.
    pub ttl_ms: i64,
    // store's native serialization of the value. opaque to us.
    pub payload: Vec<u8>,
}

impl DumpHeader {
    pub const BYTES: usize = 8;

    pub fn new(record_count: u64) -> Self {
        Self { record_count }
    }

    pub async fn encode_to<W: AsyncWrite + Unpin>(&self, mut writer: W) -> Result<usize> {
        writer.write_u64(self.record_count).await?;
        Ok(DumpHeader::BYTES)
    }

    pub async fn decode_from<R: AsyncRead + Unpin>(mut reader: R) -> Result<Self> {
        let record_count = reader.read_u64().await?;
        Ok(Self { record_count })
    }
}

impl KeyDump {
    const FIXED_BYTES: usize = 8 // key_bytes
        + 8 // ttl_ms
        + 8 // payload_bytes
    ;

    pub fn new(key: impl Into<Vec<u8>>, ttl_ms: i64, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            ttl_ms,
            payload: payload.into(),
        }
    }

    pub fn has_expiry(&self) -> bool {
        self.ttl_ms >= 0
    }

    // Write binary expression to writer.
    // return written bytes.
    // flush is left to the caller.
    pub async fn encode_to<W: AsyncWrite + Unpin>(&self, mut writer: W) -> Result<usize> {
        writer.write_u64(self.key.len() as u64).await?;
        writer.write_all(&self.key).await?;
        writer.write_i64(self.ttl_ms).await?;
        writer.write_u64(self.payload.len() as u64).await?;
        writer.write_all(&self.payload).await?;

        Ok(self.encoded_len())
    }

    // Construct KeyDump from reader.
    // A reader that ends inside the record yields an UnexpectedEof io error.
    pub async fn decode_from<R: AsyncRead + Unpin>(mut reader: R) -> Result<Self> {
        // calling order is the layout order, so each field is read in its own statement.
        let key_bytes = reader.read_u64().await?;
        if key_bytes > MAX_KEY_BYTES {
            return Err(ErrorKind::TransferDecode {
                description: format!("key length {} exceeds {}", key_bytes, MAX_KEY_BYTES),
            }
            .into());
        }
        let key = read_bytes(&mut reader, key_bytes).await?;

        let ttl_ms = reader.read_i64().await?;

        let payload_bytes = reader.read_u64().await?;
        let payload = read_bytes(&mut reader, payload_bytes).await?;

        Ok(Self {
            key,
            ttl_ms,
            payload,
        })
    }

    // Return assuming encoded bytes length.
    pub fn encoded_len(&self) -> usize {
        KeyDump::FIXED_BYTES + self.key.len() + self.payload.len()
    }
}

async fn read_bytes<R: AsyncRead + Unpin>(reader: &mut R, len: u64) -> Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(len.min(PREALLOCATE_BYTES) as usize);
    reader.take(len).read_to_end(&mut buf).await?;

    if (buf.len() as u64) < len {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }
    Ok(buf)
}

pub async fn write_header<W: AsyncWrite + Unpin>(writer: W, record_count: u64) -> Result<usize> {
    DumpHeader::new(record_count).encode_to(writer).await
}

pub async fn write_record<W: AsyncWrite + Unpin>(writer: W, dump: &KeyDump) -> Result<usize> {
    dump.encode_to(writer).await
}

pub async fn read_header<R: AsyncRead + Unpin>(reader: R) -> Result<DumpHeader> {
    DumpHeader::decode_from(reader)
        .await
        .map_err(|err| truncated(err, "header"))
}

// Read the index-th (0 origin) of record_count records.
pub async fn read_record<R: AsyncRead + Unpin>(
    reader: R,
    index: u64,
    record_count: u64,
) -> Result<KeyDump> {
    KeyDump::decode_from(reader).await.map_err(|err| {
        truncated(
            err,
            &format!("record {}/{}", index.saturating_add(1), record_count),
        )
    })
}

// Premature end of file is not recoverable, report where it happened.
fn truncated(err: Error, what: &str) -> Error {
    if err.is_eof() {
        ErrorKind::TransferDecode {
            description: format!("{} truncated", what),
        }
        .into()
    } else {
        err
    }
}
