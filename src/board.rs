/*!
    in-memory simulation of the board's firmware

    The [Board] holds the register file and answers commands like the firmware does. It is a [Connector], handing out links to itself, so a [Hub](crate::hub::Hub) can be driven without hardware.

    Every byte received is kept, in order, so the exact traffic on the wire can be checked afterwards.
*/

use log::*;
use std::{
    collections::{HashMap, VecDeque},
    io,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread,
    vec::Vec,
    };

use crate::{
    command::{self, Command, UNKNOWN_COMMAND},
    registers::{self, Access, VERSION, FIRMWARE_VERSION},
    hub::{Connector, Transport, Settings},
    };


/// simulated board, clones share the same board
#[derive(Clone)]
pub struct Board {
    state: Arc<Mutex<BoardState>>,
}
#[derive(Default)]
struct BoardState {
    registers: HashMap<u32, i32>,
    /// bytes of the command being received
    receive: Vec<u8>,
    /// answer bytes not yet read by the host
    send: VecDeque<u8>,
    /// every byte received since creation
    wire: Vec<u8>,
    connections: Vec<Settings>,
    purges: usize,
    /// never answer
    silent: bool,
    /// most answer bytes released per read, 0 for no limit
    trickle: usize,
    unplugged: bool,
}

impl Board {
    /// board with the expected firmware version and every register at its reset value
    pub fn new() -> Self {
        Self::with_version(FIRMWARE_VERSION)
    }
    /// board reporting the given firmware version
    pub fn with_version(version: i32) -> Self {
        let mut memory = HashMap::new();
        memory.insert(VERSION.address(), version);
        for unit in registers::UNITS {
            for address in unit.addresses() {
                memory.insert(address, 0);
            }
        }
        Self {state: Arc::new(Mutex::new(BoardState {
            registers: memory,
            .. Default::default()
            }))}
    }

    /// current value of a register, `None` if the board does not have it
    pub fn register(&self, address: u32) -> Option<i32> {
        self.state().registers.get(&address).copied()
    }
    /// set a register from the board side, like an analog input changing
    pub fn set_register(&self, address: u32, value: i32) {
        self.state().registers.insert(address, value);
    }
    /// stop answering read commands
    pub fn silence(&self) {
        self.state().silent = true;
    }
    /// release at most `bytes` answer bytes on each read
    pub fn trickle(&self, bytes: usize) {
        self.state().trickle = bytes;
    }
    /// make every further connection fail
    pub fn unplug(&self) {
        self.state().unplugged = true;
    }

    /// every byte received from the host
    pub fn wire(&self) -> Vec<u8> {
        self.state().wire.clone()
    }
    /// received bytes decoded back into commands, a trailing incomplete command is ignored
    pub fn commands(&self) -> Vec<Command> {
        let wire = self.wire();
        let mut commands = Vec::new();
        let mut rest = wire.as_slice();
        while let Some(&opcode) = rest.first() {
            let size = Command::size(opcode);
            if rest.len() < size
                {break}
            match Command::decode(&rest[.. size]) {
                Ok(command) => commands.push(command),
                Err(error) => warn!("undecodable bytes on the wire: {}", error),
            }
            rest = &rest[size ..];
        }
        commands
    }
    /// number of purges requested by the host
    pub fn purges(&self) -> usize {
        self.state().purges
    }
    /// settings of every connection opened, in order
    pub fn connections(&self) -> Vec<Settings> {
        self.state().connections.clone()
    }

    fn state(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardState {
    /// consume one byte, executing the command it completes
    fn receive(&mut self, byte: u8) {
        self.wire.push(byte);
        self.receive.push(byte);
        if self.receive.len() < Command::size(self.receive[0])
            {return}
        let bytes = core::mem::take(&mut self.receive);
        match Command::decode(&bytes) {
            Ok(command) => self.execute(command),
            Err(error) => warn!("board dropped command: {}", error),
        }
    }
    fn execute(&mut self, command: Command) {
        trace!("board executes {:?}", command);
        match command {
            Command::Write {address, value} => {
                if writable(address) {
                    self.registers.insert(address, value);
                }
            },
            Command::Read {address} => {
                if self.silent
                    {return}
                let value = self.registers.get(&address).copied().unwrap_or(UNKNOWN_COMMAND);
                self.send.extend(command::encode_response(value));
            },
        }
    }
}

/// whether the host may change a register
fn writable(address: u32) -> bool {
    registers::UNITS.iter()
        .filter(|unit| unit.access == Access::ReadWrite)
        .any(|unit| unit.addresses().any(|a| a == address))
}


impl Connector for Board {
    type Transport = Link;

    fn connect(&self, settings: &Settings) -> io::Result<Link> {
        let mut state = self.state();
        if state.unplugged
            {return Err(io::Error::new(io::ErrorKind::NotFound, "board unplugged"))}
        state.connections.push(settings.clone());
        Ok(Link {state: self.state.clone()})
    }
}

/// host side end of a connection to a simulated [Board]
pub struct Link {
    state: Arc<Mutex<BoardState>>,
}
impl Link {
    fn state(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for Link {
    fn purge(&mut self) -> io::Result<()> {
        let mut state = self.state();
        state.purges += 1;
        state.send.clear();
        Ok(())
    }
    fn send(&mut self, data: &[u8]) -> io::Result<()> {
        for &byte in data {
            self.state().receive(byte);
            // give other writers a chance to cut in, as a real line would
            thread::yield_now();
        }
        Ok(())
    }
    fn read_available(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state();
        let mut size = buffer.len().min(state.send.len());
        if state.trickle != 0
            {size = size.min(state.trickle)}
        for (dst, src) in buffer.iter_mut().zip(state.send.drain(.. size)) {
            *dst = src;
        }
        Ok(size)
    }
}
