/*!
    host side driver of the board, in a `std` environment.

    The central resource is the [Hub] struct which owns the serial link and serializes every transaction on it.

    access to the board:

    - methods at [Hub] level read and write raw addresses, see [crate::registers] for the address map
    - functional units are driven by a [Peripheral], which only holds a weak reference to its hub and translates channel indices to addresses
    - [registry] exposes the catalog of devices and their named properties, as the host framework sees them
*/

/// implementation of the bus transactions, this is the tricky part of the code
mod networking;
/// generic controller of functional units
mod accessing;
/// opening of real serial ports
mod serial;
/// catalog of devices and their named properties
pub mod registry;


pub use networking::*;
pub use accessing::*;
pub use serial::*;


use crate::command::FrameError;
use thiserror::Error;

/// error regarding communication with the board
#[derive(Error, Debug)]
pub enum Error {
    #[error("hub device not found, a hub is needed to use this device")]
    NoHubConfigured,
    #[error("hub is not initialized")]
    HubNotReady,
    #[error("device has been shut down")]
    ShutDown,
    #[error("firmware version {found} is not compatible with this driver, please use firmware version {expected}")]
    VersionMismatch {expected: i32, found: i32},
    #[error("no answer arrived in expected time")]
    Timeout,
    #[error("an unknown command was sent to the board")]
    UnknownCommand,
    #[error("invalid frame: expected {expected} bytes, got {got}")]
    InvalidFrame {expected: usize, got: usize},
    #[error("channel {channel} does not exist, device has {channels} channels")]
    InvalidChannel {channel: usize, channels: usize},
    #[error("invalid number of channels {count}, must be between 1 and {max}")]
    InvalidChannelCount {count: usize, max: usize},
    #[error("device has no unit {0}")]
    UnsupportedUnit(&'static str),
    #[error("{0} is read only")]
    ReadOnly(&'static str),
    #[error("no property named {0}")]
    UnknownProperty(std::string::String),
    #[error("no device named {0}")]
    UnknownDevice(std::string::String),
    #[error("failed opening serial port")]
    TransportUnavailable(#[source] std::io::Error),
    #[error("problem with serial bus")]
    Bus(#[from] std::io::Error),
}
impl From<FrameError> for Error {
    fn from(error: FrameError) -> Self {
        match error {
            FrameError::Length {expected, got} => Self::InvalidFrame {expected, got},
            FrameError::UnknownCommand => Self::UnknownCommand,
        }
    }
}
