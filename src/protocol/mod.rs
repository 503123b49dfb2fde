pub(crate) mod connection;

mod frame;
mod request;

pub use frame::{Frame, FrameError};
pub use request::Request;

pub(crate) const DELIMITER: &[u8] = b"\r\n";

pub(crate) mod frameprefix {
    pub(crate) const SIMPLE: u8 = b'+';
    pub(crate) const ERROR: u8 = b'-';
    pub(crate) const INTEGER: u8 = b':';
    pub(crate) const BULK: u8 = b'$';
    pub(crate) const ARRAY: u8 = b'*';
}
