use std::error;
use std::fmt;
use std::io;

use backtrace::Backtrace;

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    backtrace: Option<Backtrace>,
}

#[derive(Debug)]
pub enum ErrorKind {
    Io(io::Error),
    // Conflicting or missing options. detected before any I/O.
    Config {
        description: String,
    },
    InvalidRegex(regex::Error),
    ConfigFile(serde_yaml::Error),
    Tls {
        description: String,
    },
    NetworkFraming(String),
    ConnectionResetByPeer,
    // Error reply from the store.
    Command {
        command: String,
        key: Option<String>,
        message: String,
    },
    // Restore target already exists.
    BusyKey {
        key: String,
    },
    UnexpectedReply {
        command: String,
        reply: String,
    },
    TransferDecode {
        description: String,
    },
    // Failure while transferring one key. position is 1 origin.
    KeyTransfer {
        operation: &'static str,
        key: String,
        position: u64,
        total: u64,
        source: Box<Error>,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind() {
            ErrorKind::Io(err) => err.fmt(f),
            ErrorKind::Config { description } => write!(f, "{}", description),
            ErrorKind::InvalidRegex(err) => write!(f, "invalid match regexp. {}", err),
            ErrorKind::ConfigFile(err) => write!(f, "config file error. {}", err),
            ErrorKind::Tls { description } => write!(f, "tls error. {}", description),
            ErrorKind::NetworkFraming(description) => {
                write!(f, "network framing error. {}", description)
            }
            ErrorKind::ConnectionResetByPeer => write!(f, "connection reset by peer"),
            ErrorKind::Command {
                command,
                key: Some(key),
                message,
            } => write!(f, "{} {}: {}", command, key, message),
            ErrorKind::Command {
                command,
                key: None,
                message,
            } => write!(f, "{}: {}", command, message),
            ErrorKind::BusyKey { key } => {
                write!(f, "RESTORE {}: target key name already exists", key)
            }
            ErrorKind::UnexpectedReply { command, reply } => {
                write!(f, "unexpected reply to {}. {}", command, reply)
            }
            ErrorKind::TransferDecode { description } => {
                write!(f, "dump file decode error. {}", description)
            }
            ErrorKind::KeyTransfer {
                operation,
                key,
                position,
                total,
                source,
            } => write!(
                f,
                "{} {} (key {}/{}) failed. {}",
                operation, key, position, total, source
            ),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::from(ErrorKind::Io(err))
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::from(ErrorKind::InvalidRegex(err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::from(ErrorKind::ConfigFile(err))
    }
}

impl From<tokio_rustls::rustls::Error> for Error {
    fn from(err: tokio_rustls::rustls::Error) -> Self {
        Error::from(ErrorKind::Tls {
            description: err.to_string(),
        })
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::with_backtrace(kind)
    }
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn backtrace(&self) -> Option<&Backtrace> {
        self.backtrace.as_ref()
    }

    pub(crate) fn config(description: impl Into<String>) -> Self {
        Error::from(ErrorKind::Config {
            description: description.into(),
        })
    }

    // Errors raised before anything is sent to the store.
    pub fn is_config(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Config { .. } | ErrorKind::InvalidRegex(_) | ErrorKind::ConfigFile(_)
        )
    }

    pub fn is_busy_key(&self) -> bool {
        match self.kind() {
            ErrorKind::BusyKey { .. } => true,
            ErrorKind::KeyTransfer { source, .. } => source.is_busy_key(),
            _ => false,
        }
    }

    // Name the key in progress and its position in the transfer.
    pub(crate) fn for_key(
        self,
        operation: &'static str,
        key: &[u8],
        position: u64,
        total: u64,
    ) -> Self {
        if let ErrorKind::KeyTransfer { .. } = self.kind() {
            return self;
        }
        Error::from(ErrorKind::KeyTransfer {
            operation,
            key: String::from_utf8_lossy(key).into_owned(),
            position,
            total,
            source: Box::new(self),
        })
    }

    // Innermost error kind, looking through key context.
    pub fn root_kind(&self) -> &ErrorKind {
        match self.kind() {
            ErrorKind::KeyTransfer { source, .. } => source.root_kind(),
            kind => kind,
        }
    }

    pub fn is_eof(&self) -> bool {
        if let ErrorKind::Io(err) = self.kind() {
            err.kind().eq(&io::ErrorKind::UnexpectedEof)
        } else {
            false
        }
    }

    fn with_backtrace(kind: ErrorKind) -> Self {
        Self {
            kind,
            backtrace: Some(Backtrace::new()),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self.kind() {
            ErrorKind::Io(err) => Some(err),
            ErrorKind::InvalidRegex(err) => Some(err),
            ErrorKind::ConfigFile(err) => Some(err),
            ErrorKind::KeyTransfer { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
