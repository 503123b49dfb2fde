use bytes::BytesMut;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::client::Api;
use crate::common::{debug, info, warn, Result};
use crate::core::capture::{capture_nth, CaptureSummary};
use crate::core::KeyDump;
use crate::protocol::Request;

// ProtocolEncoder renders captured keys as RESTORE requests,
// the concatenated output can be fed to the store's pipe ingestion as is.
pub struct ProtocolEncoder {
    buffer: BytesMut,
}

impl Default for ProtocolEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolEncoder {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4 * 1024),
        }
    }

    // Write one RESTORE request for dump. return written bytes.
    pub async fn encode<W: AsyncWrite + Unpin>(
        &mut self,
        mut writer: W,
        dump: &KeyDump,
    ) -> Result<usize> {
        self.buffer.clear();
        Request::restore(&dump.key, dump.ttl_ms, &dump.payload).encode(&mut self.buffer);

        writer.write_all(&self.buffer).await?;
        Ok(self.buffer.len())
    }
}

// Same capture as dump, but every key goes to sink as a RESTORE request.
pub async fn pipe<C, W>(client: &mut C, keys: &[Vec<u8>], mut sink: W) -> Result<CaptureSummary>
where
    C: Api + ?Sized,
    W: AsyncWrite + Unpin,
{
    let mut encoder = ProtocolEncoder::new();
    let mut summary = CaptureSummary::default();

    for (i, key) in keys.iter().enumerate() {
        let key = String::from_utf8_lossy(key);
        match capture_nth(client, keys, i).await? {
            Some(dump) => {
                let n = encoder.encode(&mut sink, &dump).await?;
                debug!(%key, ttl_ms = dump.ttl_ms, bytes = n, "Key piped");
                summary.bytes += n as u64;
                summary.keys += 1;
            }
            None => {
                warn!(%key, "Key expired before capture");
                summary.expired += 1;
            }
        }
    }

    sink.flush().await?;

    info!(
        keys = summary.keys,
        expired = summary.expired,
        bytes = summary.bytes,
        "Pipe completed"
    );

    Ok(summary)
}
