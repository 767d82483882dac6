use serial2::{SerialPort, CharSize, StopBits, Parity, FlowControl};
use std::{
    io,
    string::String,
    time::Duration,
    };

use super::networking::{Transport, Connector};


/// baud rate of the board's uart
pub const BAUD_RATE: u32 = 9600;

/// serial link parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// serial port the board is plugged on, `None` until configured
    pub port: Option<String>,
    pub baud_rate: u32,
    /// 1 or 2
    pub stop_bits: u8,
    /// hardware flow control
    pub handshaking: bool,
    /// time a single read on the port may block before reporting no data
    pub answer_timeout: Duration,
}
impl Default for Settings {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: BAUD_RATE,
            stop_bits: 1,
            handshaking: false,
            answer_timeout: Duration::from_millis(20),
        }
    }
}
impl Settings {
    pub fn new(port: impl Into<String>) -> Self {
        Self {port: Some(port.into()), .. Default::default()}
    }
    /// whether a port has been set, placeholder names used by host frameworks do not count
    pub fn configured(&self) -> bool {
        match self.port.as_deref() {
            Some(port) => !( port.is_empty()
                || port.eq_ignore_ascii_case("undefined")
                || port.eq_ignore_ascii_case("unknown") ),
            None => false,
        }
    }
}


/// connector opening real serial ports
#[derive(Copy, Clone, Debug, Default)]
pub struct SerialConnector;

impl Connector for SerialConnector {
    type Transport = SerialPort;

    fn connect(&self, settings: &Settings) -> io::Result<SerialPort> {
        let path = settings.port.as_deref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no serial port configured"))?;
        let mut port = SerialPort::open(path, |mut serial: serial2::Settings| {
                serial.set_raw();
                serial.set_baud_rate(settings.baud_rate)?;
                serial.set_char_size(CharSize::Bits8);
                serial.set_stop_bits(if settings.stop_bits == 2 {StopBits::Two} else {StopBits::One});
                serial.set_parity(Parity::None);
                serial.set_flow_control(if settings.handshaking {FlowControl::RtsCts} else {FlowControl::None});
                Ok(serial)
                })?;
        port.set_read_timeout(settings.answer_timeout)?;
        Ok(port)
    }
}

impl Transport for SerialPort {
    fn purge(&mut self) -> io::Result<()> {
        self.discard_buffers()
    }
    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        self.write_all(data)?;
        self.flush()
    }
    fn read_available(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        match self.read(buffer) {
            Ok(size) => Ok(size),
            // nothing arrived during the port's read timeout
            Err(error) if error.kind() == io::ErrorKind::TimedOut
                || error.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(error) => Err(error),
        }
    }
}
