use log::*;
use std::{
    io,
    ops::Deref,
    sync::{Mutex, MutexGuard, PoisonError},
    thread,
    time::{Duration, Instant},
    };

use crate::{
    command::{self, RESPONSE_SIZE},
    registers::{VERSION, FIRMWARE_VERSION},
    };
use super::{Error, Settings, SerialConnector};


/// time the board has to answer a read command, from the moment the command was sent
pub const ANSWER_DEADLINE: Duration = Duration::from_millis(500);
/// port answer timeout used while probing for a board
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(500);
/// delay given to a freshly opened port before probing
pub const PROBE_SETTLE: Duration = Duration::from_millis(100);
/// pause between two polls of the port while waiting for an answer
const POLL_INTERVAL: Duration = Duration::from_millis(1);


/**
    byte stream to the board

    the stream must preserve order. Closing it is dropping it.
*/
pub trait Transport: Send {
    /// discard any byte pending in the receive and transmit buffers
    fn purge(&mut self) -> io::Result<()>;
    /// send all given bytes, returning once they are flushed
    fn send(&mut self, data: &[u8]) -> io::Result<()>;
    /// copy bytes already received into `buffer`, returning how many. `Ok(0)` means nothing arrived yet
    fn read_available(&mut self, buffer: &mut [u8]) -> io::Result<usize>;
}

/// opens transports to the board
pub trait Connector: Send + Sync {
    type Transport: Transport;
    fn connect(&self, settings: &Settings) -> io::Result<Self::Transport>;
}

/// result of probing a port for a board
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Detection {
    /// a board with a readable version answered
    CanCommunicate,
    /// the port is set but no board answered
    CanNotCommunicate,
    /// no usable port is set
    Misconfigured,
}

/// lifecycle of a hub
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HubState {
    Uninitialized,
    /// version checked, transactions allowed
    Ready,
    ShutDown,
}


/**
    board driver, owning the serial link

    every transaction goes through the same lock, held from the purge of the port until the answer is received, so that no two commands ever interleave on the wire. A hub shares nothing with other hubs.

    peripherals keep a weak reference to their hub, so the hub is usually held in an `Arc`
*/
pub struct Hub<C: Connector = SerialConnector> {
    connector: C,
    settings: Mutex<Settings>,
    bus: Mutex<Bus<C::Transport>>,
}
/// everything guarded by the transaction lock
struct Bus<T> {
    transport: Option<T>,
    state: HubState,
    version: Option<i32>,
}

impl Hub<SerialConnector> {
    /// hub on a real serial port
    pub fn serial(settings: Settings) -> Self {
        Self::new(SerialConnector, settings)
    }
}

impl<C: Connector> Hub<C> {
    pub fn new(connector: C, settings: Settings) -> Self {
        Self {
            connector,
            settings: Mutex::new(settings),
            bus: Mutex::new(Bus {
                transport: None,
                state: HubState::Uninitialized,
                version: None,
                }),
        }
    }

    /// set the serial port the board is plugged on, taken into account at next initialization or detection
    pub fn set_port(&self, port: &str) {
        self.settings().port = Some(port.into());
    }
    /// whether a usable port is set
    pub fn is_configured(&self) -> bool {
        self.settings().configured()
    }
    pub fn state(&self) -> HubState {
        self.bus().state
    }
    pub fn is_ready(&self) -> bool {
        self.state() == HubState::Ready
    }
    /// firmware version, known once initialized
    pub fn version(&self) -> Option<i32> {
        self.bus().version
    }
    /// current link settings
    pub fn link(&self) -> Settings {
        self.settings().clone()
    }

    /**
        open the link and check the firmware version

        the hub becomes ready only if the board reports [FIRMWARE_VERSION], otherwise the link is closed again and [Error::VersionMismatch] is returned
    */
    pub fn initialize(&self) -> Result<(), Error> {
        let settings = self.link();
        let mut bus = self.bus();
        match bus.state {
            HubState::Ready => return Ok(()),
            HubState::ShutDown => return Err(Error::ShutDown),
            HubState::Uninitialized => {},
        }
        if ! settings.configured() {
            return Err(Error::TransportUnavailable(io::Error::new(
                io::ErrorKind::InvalidInput,
                "no serial port configured",
                )));
        }
        let transport = bus.transport.insert(
            self.connector.connect(&settings).map_err(Error::TransportUnavailable)?
            );
        let found = transport.purge()
            .map_err(Error::from)
            .and_then(|_| read_on(transport, VERSION.address()));
        let found = match found {
            Ok(found) => found,
            Err(error) => {
                bus.transport = None;
                return Err(error);
            },
        };
        if found != FIRMWARE_VERSION {
            warn!("board on {:?} runs firmware version {}, expected {}", settings.port, found, FIRMWARE_VERSION);
            bus.transport = None;
            return Err(Error::VersionMismatch {expected: FIRMWARE_VERSION, found});
        }
        bus.version = Some(found);
        bus.state = HubState::Ready;
        info!("hub ready on {:?}, firmware version {}", settings.port, found);
        Ok(())
    }

    /// close the link, further transactions fail
    pub fn shutdown(&self) {
        let mut bus = self.bus();
        if bus.transport.take().is_some() {
            info!("hub shut down");
        }
        bus.state = HubState::ShutDown;
    }

    /**
        check whether a board answers on the configured port

        this opens, probes and closes its own link, independently of [Self::initialize]. The port answer timeout is extended for the time of the probe only.
    */
    pub fn detect(&self) -> Detection {
        if self.is_ready()
            {return Detection::CanCommunicate}

        let mut settings = self.settings();
        if ! settings.configured()
            {return Detection::Misconfigured}

        let probing = TimeoutOverride::new(&mut settings, PROBE_TIMEOUT);
        match self.probe(&probing) {
            Ok(version) => {
                debug!("detected board with firmware version {} on {:?}", version, probing.port);
                Detection::CanCommunicate
            },
            Err(error) => {
                warn!("no board detected on {:?}: {}", probing.port, error);
                Detection::CanNotCommunicate
            },
        }
    }
    fn probe(&self, settings: &Settings) -> Result<i32, Error> {
        let mut transport = self.connector.connect(settings).map_err(Error::TransportUnavailable)?;
        thread::sleep(PROBE_SETTLE);
        // keep this hub's own transactions off the wire while probing
        let _bus = self.bus();
        transport.purge()?;
        read_on(&mut transport, VERSION.address())
    }

    /// write a value at the given address, the board sends no acknowledgement
    pub fn execute_write(&self, address: u32, value: i32) -> Result<(), Error> {
        let mut bus = self.bus();
        let transport = bus.transport()?;
        transport.purge()?;
        debug!("write {} at {}", value, address);
        let frame = command::encode_write(address, value);
        trace!("send {:02x?}", frame);
        transport.send(&frame)?;
        Ok(())
    }
    /// read the value at the given address, waiting at most [ANSWER_DEADLINE] for the answer
    pub fn execute_read(&self, address: u32) -> Result<i32, Error> {
        let mut bus = self.bus();
        let transport = bus.transport()?;
        transport.purge()?;
        let value = read_on(transport, address)?;
        debug!("read {} at {}", value, address);
        Ok(value)
    }

    fn bus(&self) -> MutexGuard<'_, Bus<C::Transport>> {
        // the bus state is only changed in single assignments, it stays consistent if a holder panicked
        self.bus.lock().unwrap_or_else(PoisonError::into_inner)
    }
    fn settings(&self) -> MutexGuard<'_, Settings> {
        self.settings.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Bus<T> {
    fn transport(&mut self) -> Result<&mut T, Error> {
        self.transport.as_mut().ok_or_else(|| Error::TransportUnavailable(
            io::Error::new(io::ErrorKind::NotConnected, "hub link is closed")
            ))
    }
}


/// send a read command and collect its answer
fn read_on<T: Transport>(transport: &mut T, address: u32) -> Result<i32, Error> {
    let frame = command::encode_read(address);
    trace!("send {:02x?}", frame);
    transport.send(&frame)?;
    let answer = receive(transport, ANSWER_DEADLINE)?;
    trace!("receive {:02x?}", answer);
    Ok(command::decode_response(&answer)?)
}

/// poll the transport until a complete answer arrived or the deadline elapsed
fn receive<T: Transport>(transport: &mut T, deadline: Duration) -> Result<heapless::Vec<u8, RESPONSE_SIZE>, Error> {
    let start = Instant::now();
    let mut answer = heapless::Vec::<u8, RESPONSE_SIZE>::new();
    let mut chunk = [0u8; RESPONSE_SIZE];
    loop {
        let missing = RESPONSE_SIZE - answer.len();
        let size = transport.read_available(&mut chunk[.. missing])?.min(missing);
        // cannot overflow, size is bounded by the missing bytes
        let _ = answer.extend_from_slice(&chunk[.. size]);
        if answer.is_full()
            {break Ok(answer)}
        if start.elapsed() >= deadline {
            debug!("answer timed out with {} bytes received", answer.len());
            break Err(Error::Timeout)
        }
        if size == 0
            {thread::sleep(POLL_INTERVAL)}
    }
}


/**
    settings with an overridden port answer timeout

    the previous timeout is restored when dropped, whichever way the scope is left
*/
struct TimeoutOverride<'s> {
    settings: &'s mut Settings,
    saved: Duration,
}
impl<'s> TimeoutOverride<'s> {
    fn new(settings: &'s mut Settings, timeout: Duration) -> Self {
        let saved = core::mem::replace(&mut settings.answer_timeout, timeout);
        Self {settings, saved}
    }
}
impl Deref for TimeoutOverride<'_> {
    type Target = Settings;
    fn deref(&self) -> &Settings {
        self.settings
    }
}
impl Drop for TimeoutOverride<'_> {
    fn drop(&mut self) {
        self.settings.answer_timeout = self.saved;
    }
}
