#![allow(clippy::module_inception)]

pub mod cli;
pub mod client;
pub mod config;
pub mod core;
pub mod error;
pub mod protocol;

pub use crate::error::{Error, ErrorKind};
pub type Result<T, E = crate::error::Error> = std::result::Result<T, E>;

pub use crate::core::{KeyDump, KeyFilter, RestoreEngine, RestoreOptions};

pub(crate) mod common {
    pub(crate) use crate::error::{Error, ErrorKind};
    pub(crate) use crate::Result;

    pub use tracing::{debug, info, warn};
}
