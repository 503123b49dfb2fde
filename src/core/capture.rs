use tokio::io::{AsyncSeek, AsyncSeekExt, AsyncWrite, AsyncWriteExt, BufWriter, SeekFrom};

use crate::client::Api;
use crate::common::{debug, info, warn, Result};
use crate::core::codec::{self, KeyDump};

// Remaining ttl reported for a key that does not exist.
const TTL_NO_SUCH_KEY: i64 = -2;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSummary {
    // captured keys.
    pub keys: u64,
    // keys that disappeared between enumeration and capture.
    pub expired: u64,
    // bytes written to the sink.
    pub bytes: u64,
}

// Read payload and remaining ttl of the key.
// None means the key expired or was deleted after it was enumerated.
pub async fn capture_key<C>(client: &mut C, key: &[u8]) -> Result<Option<KeyDump>>
where
    C: Api + ?Sized,
{
    let payload = match client.dump(key).await? {
        Some(payload) if !payload.is_empty() => payload,
        _ => return Ok(None),
    };

    let ttl_ms = client.pttl(key).await?;
    if ttl_ms == TTL_NO_SUCH_KEY {
        return Ok(None);
    }

    Ok(Some(KeyDump::new(key, ttl_ms, payload)))
}

// Capture the i-th of keys. errors name the key and its position.
pub(crate) async fn capture_nth<C>(
    client: &mut C,
    keys: &[Vec<u8>],
    i: usize,
) -> Result<Option<KeyDump>>
where
    C: Api + ?Sized,
{
    let key = &keys[i];
    capture_key(client, key)
        .await
        .map_err(|err| err.for_key("capture", key, i as u64 + 1, keys.len() as u64))
}

// Write every capturable key to sink.
// the header is written first with the number of keys and rewritten at the end
// with the number of records actually written, so the sink has to be seekable.
pub async fn dump<C, W>(client: &mut C, keys: &[Vec<u8>], sink: W) -> Result<CaptureSummary>
where
    C: Api + ?Sized,
    W: AsyncWrite + AsyncSeek + Unpin,
{
    let mut sink = BufWriter::new(sink);
    let mut summary = CaptureSummary::default();

    summary.bytes += codec::write_header(&mut sink, keys.len() as u64).await? as u64;

    for (i, key) in keys.iter().enumerate() {
        let key = String::from_utf8_lossy(key);
        match capture_nth(client, keys, i).await? {
            Some(dump) => {
                let n = codec::write_record(&mut sink, &dump).await?;
                debug!(%key, ttl_ms = dump.ttl_ms, bytes = n, "Key captured");
                summary.bytes += n as u64;
                summary.keys += 1;
            }
            None => {
                warn!(%key, "Key expired before capture");
                summary.expired += 1;
            }
        }
    }

    sink.seek(SeekFrom::Start(0)).await?;
    codec::write_header(&mut sink, summary.keys).await?;
    sink.flush().await?;

    info!(
        keys = summary.keys,
        expired = summary.expired,
        bytes = summary.bytes,
        "Dump completed"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::client::tcp::{serve, Client};
    use crate::common::ErrorKind;
    use crate::protocol::{Frame, Request};

    fn dump_request(key: &str) -> Request {
        Request::new("DUMP").arg(key)
    }

    fn pttl_request(key: &str) -> Request {
        Request::new("PTTL").arg(key)
    }

    fn names(keys: &[&str]) -> Vec<Vec<u8>> {
        keys.iter().map(|key| key.as_bytes().to_vec()).collect()
    }

    #[test]
    fn dump_over_the_wire() {
        tokio_test::block_on(async move {
            let (client, server) = tokio::io::duplex(1024);
            let handle = tokio::spawn(serve(
                server,
                vec![
                    (dump_request("a"), Frame::Bulk(b"\x00\x01a".to_vec())),
                    (pttl_request("a"), Frame::Integer(-1)),
                    // deleted after KEYS.
                    (dump_request("gone"), Frame::Null),
                    (dump_request("b"), Frame::Bulk(b"\x00\x01b".to_vec())),
                    (pttl_request("b"), Frame::Integer(1500)),
                    // expired between DUMP and PTTL.
                    (dump_request("late"), Frame::Bulk(b"\x00\x01c".to_vec())),
                    (pttl_request("late"), Frame::Integer(-2)),
                ],
            ));

            let mut client = Client::new(client, None);
            let mut sink = Cursor::new(Vec::new());
            let summary = dump(
                &mut client,
                &names(&["a", "gone", "b", "late"]),
                &mut sink,
            )
            .await
            .unwrap();
            handle.await.unwrap();

            assert_eq!(summary.keys, 2);
            assert_eq!(summary.expired, 2);
            assert_eq!(summary.bytes, sink.get_ref().len() as u64);

            sink.set_position(0);
            let header = codec::read_header(&mut sink).await.unwrap();
            assert_eq!(header.record_count, 2);
            assert_eq!(
                codec::read_record(&mut sink, 0, 2).await.unwrap(),
                KeyDump::new("a", codec::NO_EXPIRY, b"\x00\x01a".to_vec())
            );
            assert_eq!(
                codec::read_record(&mut sink, 1, 2).await.unwrap(),
                KeyDump::new("b", 1500, b"\x00\x01b".to_vec())
            );
        })
    }

    #[test]
    fn failure_names_the_key() {
        tokio_test::block_on(async move {
            let (client, server) = tokio::io::duplex(1024);
            // the peer goes away after the first reply.
            let handle = tokio::spawn(serve(
                server,
                vec![(dump_request("a"), Frame::Bulk(b"\x00\x01a".to_vec()))],
            ));

            let mut client = Client::new(client, None);
            let err = dump(
                &mut client,
                &names(&["a", "b"]),
                Cursor::new(Vec::new()),
            )
            .await
            .unwrap_err();
            handle.await.unwrap();

            match err.kind() {
                ErrorKind::KeyTransfer {
                    operation,
                    key,
                    position,
                    total,
                    ..
                } => {
                    assert_eq!(*operation, "capture");
                    assert_eq!(key, "a");
                    assert_eq!((*position, *total), (1, 2));
                }
                kind => panic!("{:?}", kind),
            }
        })
    }
}
