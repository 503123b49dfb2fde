mod root;
pub use root::{parse, ClientOptions, Command, KeyOptions, RutilCommand};

pub mod dump;
pub mod pipe;
pub mod query;
pub mod restore;
