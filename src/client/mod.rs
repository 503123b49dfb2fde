use async_trait::async_trait;

use crate::common::{Error, ErrorKind};
use crate::protocol::{Frame, Request};
use crate::Result;

pub mod tcp;

// Store commands the transfer needs.
// Only `command` is required. typed operations interpret its reply,
// so every implementation shares the same error classification.
#[async_trait]
pub trait Api: Send {
    // Issue one command and wait for its reply.
    // Error replies are returned as Frame::Error, not as Err.
    async fn command(&mut self, request: Request) -> Result<Frame>;

    async fn auth(&mut self, username: Option<&str>, password: &str) -> Result<()> {
        let request = match username {
            Some(username) => Request::new("AUTH").arg(username).arg(password),
            None => Request::new("AUTH").arg(password),
        };
        expect_ok("AUTH", None, self.command(request).await?)
    }

    async fn select(&mut self, db: u32) -> Result<()> {
        let reply = self
            .command(Request::new("SELECT").arg(db.to_string()))
            .await?;
        expect_ok("SELECT", None, reply)
    }

    // Key names matching the glob pattern, in the order the store returns them.
    // names are binary safe and returned as is.
    async fn keys(&mut self, pattern: &str) -> Result<Vec<Vec<u8>>> {
        match self.command(Request::new("KEYS").arg(pattern)).await? {
            Frame::Array(frames) => frames
                .into_iter()
                .map(|frame| match frame {
                    Frame::Bulk(key) => Ok(key),
                    frame => Err(unexpected("KEYS", &frame)),
                })
                .collect(),
            reply => Err(fail("KEYS", None, reply)),
        }
    }

    // Native serialization of the value. None if the key does not exist.
    async fn dump(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.command(Request::new("DUMP").arg(key)).await? {
            Frame::Bulk(payload) => Ok(Some(payload)),
            Frame::Null => Ok(None),
            reply => Err(fail("DUMP", Some(key), reply)),
        }
    }

    // Remaining ttl in milliseconds. -1 no expiry, -2 no such key.
    async fn pttl(&mut self, key: &[u8]) -> Result<i64> {
        match self.command(Request::new("PTTL").arg(key)).await? {
            Frame::Integer(ttl) => Ok(ttl),
            reply => Err(fail("PTTL", Some(key), reply)),
        }
    }

    async fn restore(&mut self, key: &[u8], ttl_ms: i64, payload: &[u8]) -> Result<()> {
        match self.command(Request::restore(key, ttl_ms, payload)).await? {
            Frame::Error(message) if message.starts_with("BUSYKEY") => {
                Err(ErrorKind::BusyKey {
                    key: String::from_utf8_lossy(key).into_owned(),
                }
                .into())
            }
            reply => expect_ok("RESTORE", Some(key), reply),
        }
    }

    // Return whether the key existed.
    async fn delete(&mut self, key: &[u8]) -> Result<bool> {
        match self.command(Request::new("DEL").arg(key)).await? {
            Frame::Integer(n) => Ok(n > 0),
            reply => Err(fail("DEL", Some(key), reply)),
        }
    }

    async fn flush_db(&mut self) -> Result<()> {
        let reply = self.command(Request::new("FLUSHDB")).await?;
        expect_ok("FLUSHDB", None, reply)
    }

    // Value type name. "none" if the key does not exist.
    async fn key_type(&mut self, key: &[u8]) -> Result<String> {
        match self.command(Request::new("TYPE").arg(key)).await? {
            Frame::Simple(name) => Ok(name),
            reply => Err(fail("TYPE", Some(key), reply)),
        }
    }
}

#[async_trait]
impl<A> Api for Box<A>
where
    A: Api + ?Sized,
{
    async fn command(&mut self, request: Request) -> Result<Frame> {
        (**self).command(request).await
    }
}

fn expect_ok(command: &str, key: Option<&[u8]>, reply: Frame) -> Result<()> {
    match reply {
        Frame::Simple(ref s) if s == "OK" => Ok(()),
        reply => Err(fail(command, key, reply)),
    }
}

// Convert a reply that is not the expected one into an error.
pub(crate) fn fail(command: &str, key: Option<&[u8]>, reply: Frame) -> Error {
    match reply {
        Frame::Error(message) => Error::from(ErrorKind::Command {
            command: command.into(),
            key: key.map(|key| String::from_utf8_lossy(key).into_owned()),
            message,
        }),
        reply => unexpected(command, &reply),
    }
}

fn unexpected(command: &str, reply: &Frame) -> Error {
    Error::from(ErrorKind::UnexpectedReply {
        command: command.into(),
        reply: reply.to_string(),
    })
}
