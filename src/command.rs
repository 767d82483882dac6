/*!
    wire format of the board's command/response protocol

    The host sends two shapes of command, and only reads expect an answer:

    | command  | bytes | layout |
    |----------|-------|--------|
    | write    | 9     | opcode `0x80`, address u32 LE, value i32 LE |
    | read     | 5     | opcode `0x00`, address u32 LE |
    | answer   | 4     | value i32 LE |

    There is no framing, checksum nor correlation token, so a command and its answer must never be interleaved with another command on the same line.
*/

use bilge::prelude::*;
use packbytes::{FromBytes, ToBytes, ByteArray};

use crate::{pack_bilge, utils::pack};


/// size of a write command
pub const WRITE_SIZE: usize = 9;
/// size of a read command
pub const READ_SIZE: usize = 5;
/// size of the answer to a read command
pub const RESPONSE_SIZE: usize = 4;
/// answer value the firmware sends for a command it does not know
pub const UNKNOWN_COMMAND: i32 = 65535;

/// first byte of every command
#[bitsize(8)]
#[derive(Copy, Clone, FromBits, DebugBits, PartialEq)]
pub struct Opcode {
    reserved: u7,
    /// set for a write command, cleared for a read
    pub write: bool,
}
pack_bilge!(Opcode);

impl Opcode {
    pub fn new_access(write: bool) -> Self {
        let mut opcode = Self::from(0u8);
        opcode.set_write(write);
        opcode
    }
}

/// write command as laid out on the wire
#[derive(Copy, Clone, FromBytes, ToBytes, Debug)]
pub struct WriteFrame {
    pub opcode: Opcode,
    pub address: u32,
    pub value: i32,
}
/// read command as laid out on the wire
#[derive(Copy, Clone, FromBytes, ToBytes, Debug)]
pub struct ReadFrame {
    pub opcode: Opcode,
    pub address: u32,
}

/// error decoding bytes received from the wire
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameError {
    /// the given bytes do not have the size of the expected frame
    Length {expected: usize, got: usize},
    /// the board answered the sentinel value for unknown commands
    UnknownCommand,
}
impl core::fmt::Display for FrameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Length {expected, got} => write!(f, "invalid frame: expected {} bytes, got {}", expected, got),
            Self::UnknownCommand => write!(f, "unknown command"),
        }
    }
}


/// encode a command writing `value` at `address`
pub fn encode_write(address: u32, value: i32) -> [u8; WRITE_SIZE] {
    let frame = WriteFrame {
        opcode: Opcode::new_access(true),
        address,
        value,
        };
    pack(frame.to_le_bytes().as_ref())
}
/// encode a command reading the value at `address`
pub fn encode_read(address: u32) -> [u8; READ_SIZE] {
    let frame = ReadFrame {
        opcode: Opcode::new_access(false),
        address,
        };
    pack(frame.to_le_bytes().as_ref())
}
/// encode the board's answer to a read command
pub fn encode_response(value: i32) -> [u8; RESPONSE_SIZE] {
    value.to_le_bytes()
}
/**
    decode the answer to a read command

    the answer is a two's complement little endian integer. The value [UNKNOWN_COMMAND] is always reported as an error, even if the register could legitimately hold it.
*/
pub fn decode_response(bytes: &[u8]) -> Result<i32, FrameError> {
    let bytes: [u8; RESPONSE_SIZE] = bytes.try_into()
        .map_err(|_| FrameError::Length {expected: RESPONSE_SIZE, got: bytes.len()})?;
    match i32::from_le_bytes(bytes) {
        UNKNOWN_COMMAND => Err(FrameError::UnknownCommand),
        value => Ok(value),
    }
}


/// a decoded command, as seen by the board
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Write {address: u32, value: i32},
    Read {address: u32},
}
impl Command {
    pub fn address(&self) -> u32 {
        match *self {
            Self::Write {address, ..} => address,
            Self::Read {address} => address,
        }
    }
    /// size of the whole command starting with the given opcode byte
    pub fn size(opcode: u8) -> usize {
        if Opcode::from(opcode).write()  {WRITE_SIZE}
        else  {READ_SIZE}
    }
    /// decode a complete command, `bytes` must hold exactly the command announced by its opcode
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        let Some(&opcode) = bytes.first()
            else {return Err(FrameError::Length {expected: READ_SIZE, got: 0})};
        let expected = Self::size(opcode);
        if bytes.len() != expected
            {return Err(FrameError::Length {expected, got: bytes.len()})}

        if expected == WRITE_SIZE {
            let mut raw = <WriteFrame as FromBytes>::Bytes::zeroed();
            raw.as_mut().copy_from_slice(bytes);
            let frame = WriteFrame::from_le_bytes(raw);
            Ok(Self::Write {address: frame.address, value: frame.value})
        }
        else {
            let mut raw = <ReadFrame as FromBytes>::Bytes::zeroed();
            raw.as_mut().copy_from_slice(bytes);
            let frame = ReadFrame::from_le_bytes(raw);
            Ok(Self::Read {address: frame.address})
        }
    }
}
