mod filter;
pub use self::filter::KeyFilter;

pub mod codec;
pub use self::codec::{DumpHeader, KeyDump};

mod capture;
pub use self::capture::{capture_key, dump, CaptureSummary};

mod pipe;
pub use self::pipe::{pipe, ProtocolEncoder};

mod restore;
pub use self::restore::{RestoreCounts, RestoreEngine, RestoreOptions, RestoreOutcome};

pub mod query;
