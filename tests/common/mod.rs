#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;

use rutil::client::Api;
use rutil::protocol::{Frame, Request};

// Stored value. payload doubles as the DUMP serialization and the GET value.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub payload: Vec<u8>,
    // -1 no expiry.
    pub ttl_ms: i64,
}

// In memory store answering the commands the transfer issues.
#[derive(Debug, Default)]
pub struct FakeStore {
    pub entries: BTreeMap<Vec<u8>, Entry>,
    // Listed by KEYS but gone by the time they are dumped.
    pub vanishing: HashSet<Vec<u8>>,
    // DUMP succeeds, then the key expires before PTTL.
    pub expiring: HashSet<Vec<u8>>,
    // RESTORE of these keys is rejected with a payload error.
    pub corrupted: HashSet<Vec<u8>>,
    // Every command received, with its arguments.
    pub log: Vec<(String, Vec<String>)>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl AsRef<[u8]>, payload: &[u8], ttl_ms: i64) -> Self {
        self.insert(key.as_ref(), payload, ttl_ms);
        self
    }

    pub fn insert(&mut self, key: &[u8], payload: &[u8], ttl_ms: i64) {
        self.entries.insert(
            key.to_vec(),
            Entry {
                payload: payload.to_vec(),
                ttl_ms,
            },
        );
    }

    pub fn vanish(mut self, key: &str) -> Self {
        self.insert(key.as_bytes(), b"gone", -1);
        self.vanishing.insert(key.as_bytes().to_vec());
        self
    }

    pub fn expire_after_dump(mut self, key: &str) -> Self {
        self.insert(key.as_bytes(), b"late", 1);
        self.expiring.insert(key.as_bytes().to_vec());
        self
    }

    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<&Entry> {
        self.entries.get(key.as_ref())
    }

    pub fn contains(&self, key: impl AsRef<[u8]>) -> bool {
        self.entries.contains_key(key.as_ref())
    }

    // Stored key names, lossy for readable assertions.
    pub fn names(&self) -> Vec<String> {
        self.entries
            .keys()
            .map(|key| String::from_utf8_lossy(key).into_owned())
            .collect()
    }

    // Commands received so far, names only.
    pub fn commands(&self) -> Vec<&str> {
        self.log.iter().map(|(command, _)| command.as_str()).collect()
    }

    pub fn count(&self, command: &str) -> usize {
        self.commands().iter().filter(|c| **c == command).count()
    }

    fn live(&self, key: &[u8]) -> Option<&Entry> {
        if self.vanishing.contains(key) {
            return None;
        }
        self.entries.get(key)
    }
}

fn glob(pattern: &[u8], key: &[u8]) -> bool {
    match pattern.strip_suffix(b"*") {
        Some(prefix) => key.starts_with(prefix),
        None => pattern == key,
    }
}

fn ok() -> Frame {
    Frame::Simple("OK".into())
}

#[async_trait]
impl Api for FakeStore {
    async fn command(&mut self, request: Request) -> rutil::Result<Frame> {
        let command = request.command();
        let args: Vec<String> = request
            .args()
            .iter()
            .map(|arg| String::from_utf8_lossy(arg).into_owned())
            .collect();
        self.log.push((command.clone(), args.clone()));

        let key = request.args().first().cloned().unwrap_or_default();

        let reply = match command.as_str() {
            "KEYS" => Frame::Array(
                self.entries
                    .keys()
                    .filter(|k| glob(&key, k))
                    .map(|k| Frame::Bulk(k.clone()))
                    .collect(),
            ),
            "DUMP" => match self.live(&key) {
                Some(entry) => Frame::Bulk(entry.payload.clone()),
                None => Frame::Null,
            },
            "PTTL" => match self.live(&key) {
                Some(_) if self.expiring.contains(&key) => Frame::Integer(-2),
                Some(entry) => Frame::Integer(entry.ttl_ms),
                None => Frame::Integer(-2),
            },
            "RESTORE" => {
                if self.entries.contains_key(&key) {
                    Frame::Error("BUSYKEY Target key name already exists.".into())
                } else if self.corrupted.contains(&key) {
                    Frame::Error("ERR DUMP payload version or checksum are wrong".into())
                } else {
                    let ttl_ms: i64 = args[1].parse().unwrap();
                    let payload = request.args()[2].clone();
                    let ttl_ms = if ttl_ms == 0 { -1 } else { ttl_ms };
                    self.insert(&key, &payload, ttl_ms);
                    ok()
                }
            }
            "DEL" => Frame::Integer(self.entries.remove(&key).map_or(0, |_| 1)),
            "FLUSHDB" => {
                self.entries.clear();
                ok()
            }
            "TYPE" => match self.live(&key) {
                Some(_) => Frame::Simple("string".into()),
                None => Frame::Simple("none".into()),
            },
            "GET" => match self.live(&key) {
                Some(entry) => Frame::Bulk(entry.payload.clone()),
                None => Frame::Null,
            },
            "AUTH" | "SELECT" => ok(),
            other => Frame::Error(format!("ERR unknown command '{}'", other)),
        };

        Ok(reply)
    }
}

// Parse every frame in buf.
pub fn parse_frames(buf: &[u8]) -> Vec<Frame> {
    let mut cursor = std::io::Cursor::new(buf);
    let mut frames = Vec::new();
    while (cursor.position() as usize) < buf.len() {
        frames.push(Frame::parse(&mut cursor).unwrap());
    }
    frames
}

// Rebuild the request a frame was encoded from.
pub fn into_request(frame: Frame) -> Request {
    let args = match frame {
        Frame::Array(frames) => frames,
        frame => panic!("not a request {:?}", frame),
    };
    let mut args = args.into_iter().map(|frame| match frame {
        Frame::Bulk(arg) => arg,
        frame => panic!("not a bulk {:?}", frame),
    });
    let command = String::from_utf8(args.next().unwrap()).unwrap();
    args.fold(Request::new(&command), |request, arg| request.arg(arg))
}
