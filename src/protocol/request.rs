use bytes::{BufMut, BytesMut};

use crate::protocol::frame::put_decimal;
use crate::protocol::{frameprefix, Frame, DELIMITER};

// Request is a command invocation. every argument is sent as a binary safe bulk string.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    args: Vec<Vec<u8>>,
}

impl Request {
    pub fn new(command: &str) -> Self {
        Self {
            args: vec![command.as_bytes().to_vec()],
        }
    }

    pub fn arg(mut self, arg: impl AsRef<[u8]>) -> Self {
        self.args.push(arg.as_ref().to_vec());
        self
    }

    // RESTORE key ttl payload.
    // the store treats a ttl of 0 as no expiry and rejects negative values,
    // so a key without expiry(-1) is restored with 0.
    pub fn restore(key: &[u8], ttl_ms: i64, payload: &[u8]) -> Self {
        Request::new("RESTORE")
            .arg(key)
            .arg(ttl_ms.max(0).to_string())
            .arg(payload)
    }

    // Upper cased command name.
    pub fn command(&self) -> String {
        String::from_utf8_lossy(&self.args[0]).to_ascii_uppercase()
    }

    pub fn args(&self) -> &[Vec<u8>] {
        &self.args[1..]
    }

    // Same bytes as the equivalent Frame::Array without copying arguments.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put_u8(frameprefix::ARRAY);
        put_decimal(dst, self.args.len() as i64);
        for arg in &self.args {
            dst.put_u8(frameprefix::BULK);
            put_decimal(dst, arg.len() as i64);
            dst.put_slice(arg);
            dst.put_slice(DELIMITER);
        }
    }
}

impl From<Request> for Frame {
    fn from(request: Request) -> Self {
        Frame::Array(request.args.into_iter().map(Frame::Bulk).collect())
    }
}
