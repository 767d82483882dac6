use log::*;
use std::sync::{Arc, Weak};

use crate::registers::{self, Unit, Access, MAX_CHANNELS};
use super::{
    Error,
    networking::{Hub, Connector},
    SerialConnector,
    };


/// most units a single kind of peripheral drives
pub const MAX_UNITS: usize = 3;

/// description of a kind of peripheral, as registered to the host
#[derive(Debug, PartialEq, Eq)]
pub struct Kind {
    /// stable device name
    pub name: &'static str,
    pub description: &'static str,
    /// name of the property holding the number of channels
    pub channels_label: &'static str,
    pub default_channels: usize,
    pub max_channels: usize,
    /// units driven, channel `i` of the peripheral is channel `i` of each of them
    pub units: &'static [Unit],
}
impl Kind {
    /// check a number of channels is allowed for this kind
    pub fn check_channels(&self, count: usize) -> Result<(), Error> {
        if count == 0 || count > self.max_channels
            {return Err(Error::InvalidChannelCount {count, max: self.max_channels})}
        Ok(())
    }
    fn unit_index(&self, unit: &Unit) -> Result<usize, Error> {
        self.units.iter()
            .position(|u| u.base == unit.base)
            .ok_or(Error::UnsupportedUnit(unit.label))
    }
}

pub const LASER_TRIGGER: Kind = Kind {
    name: "Mojo-LaserTrig",
    description: "Laser Trigger",
    channels_label: "Number of lasers",
    default_channels: 4,
    max_channels: 6,
    units: &[registers::LASER_MODE, registers::LASER_DURATION, registers::LASER_SEQUENCE],
};
pub const ANALOG_INPUT: Kind = Kind {
    name: "Mojo-Input",
    description: "Analog Input",
    channels_label: "Number of channels",
    default_channels: 3,
    max_channels: 8,
    units: &[registers::ANALOG_INPUT],
};
pub const PWM: Kind = Kind {
    name: "Mojo-PWM",
    description: "PWM Output",
    channels_label: "Number of PWM",
    default_channels: 1,
    max_channels: 6,
    units: &[registers::PWM],
};
pub const TTL: Kind = Kind {
    name: "Mojo-TTL",
    description: "TTL Output",
    channels_label: "Number of channels",
    default_channels: 4,
    max_channels: 6,
    units: &[registers::TTL],
};
pub const SERVOS: Kind = Kind {
    name: "Mojo-Servos",
    description: "Servos",
    channels_label: "Number of Servos",
    default_channels: 4,
    max_channels: 6,
    units: &[registers::SERVO],
};
/// every kind of peripheral, in registration order
pub const KINDS: [&Kind; 5] = [&LASER_TRIGGER, &ANALOG_INPUT, &PWM, &TTL, &SERVOS];


/// lifecycle of a peripheral, a shut down peripheral cannot be initialized again
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PeripheralState {
    Uninitialized,
    Initialized,
    ShutDown,
}

/// last known values of a unit's channels
type Shadow = heapless::Vec<i32, MAX_CHANNELS>;

/**
    controller of a functional unit of the board

    it only holds a weak reference to its hub, every access is a transaction on the hub. Values read or written are kept as shadow values, updated only after the hub confirmed the transaction.
*/
pub struct Peripheral<C: Connector = SerialConnector> {
    kind: &'static Kind,
    hub: Weak<Hub<C>>,
    channels: usize,
    shadow: heapless::Vec<Shadow, MAX_UNITS>,
    state: PeripheralState,
}

impl<C: Connector> Peripheral<C> {
    /// create a peripheral with the given number of channels, it cannot be changed afterwards
    pub fn new(kind: &'static Kind, channels: usize) -> Result<Self, Error> {
        kind.check_channels(channels)?;
        let mut shadow = heapless::Vec::new();
        for unit in kind.units {
            let mut values = Shadow::new();
            values.resize(channels.min(unit.max_channels), unit.default)
                .map_err(|_| Error::InvalidChannelCount {count: channels, max: MAX_CHANNELS})?;
            shadow.push(values)
                .map_err(|_| Error::UnsupportedUnit(unit.label))?;
        }
        Ok(Self {
            kind,
            hub: Weak::new(),
            channels,
            shadow,
            state: PeripheralState::Uninitialized,
        })
    }

    pub fn kind(&self) -> &'static Kind  {self.kind}
    pub fn channels(&self) -> usize  {self.channels}
    pub fn state(&self) -> PeripheralState  {self.state}

    /**
        attach to the given hub

        the hub must have completed its own initialization. Without hub, the peripheral stays uninitialized and every operation fails with [Error::NoHubConfigured]
    */
    pub fn initialize(&mut self, hub: Option<&Arc<Hub<C>>>) -> Result<(), Error> {
        match self.state {
            PeripheralState::Initialized => return Ok(()),
            PeripheralState::ShutDown => return Err(Error::ShutDown),
            PeripheralState::Uninitialized => {},
        }
        let hub = hub.ok_or(Error::NoHubConfigured)?;
        if ! hub.is_ready()
            {return Err(Error::HubNotReady)}
        self.hub = Arc::downgrade(hub);
        self.state = PeripheralState::Initialized;
        debug!("{} initialized with {} channels", self.kind.name, self.channels);
        Ok(())
    }
    /// detach from the hub, for good
    pub fn shutdown(&mut self) {
        self.hub = Weak::new();
        self.state = PeripheralState::ShutDown;
    }

    /// read a channel from the board, the board is always queried
    pub fn read_channel(&mut self, unit: &Unit, channel: usize) -> Result<i32, Error> {
        let index = self.kind.unit_index(unit)?;
        let address = self.address(unit, channel)?;
        let value = self.hub()?.execute_read(address)?;
        self.shadow[index][channel] = value;
        Ok(value)
    }
    /// write a channel on the board, after the unit's value policy
    pub fn write_channel(&mut self, unit: &Unit, channel: usize, value: i32) -> Result<(), Error> {
        let index = self.kind.unit_index(unit)?;
        if unit.access == Access::ReadOnly
            {return Err(Error::ReadOnly(unit.label))}
        let address = self.address(unit, channel)?;
        let value = unit.apply(value);
        self.hub()?.execute_write(address, value)?;
        self.shadow[index][channel] = value;
        Ok(())
    }
    /// last value read or written on a channel
    pub fn shadow(&self, unit: &Unit, channel: usize) -> Option<i32> {
        let index = self.kind.unit_index(unit).ok()?;
        self.shadow[index].get(channel).copied()
    }
    /// read again every channel of every unit
    pub fn refresh(&mut self) -> Result<(), Error> {
        let kind = self.kind;
        for unit in kind.units {
            for channel in 0 .. self.channels {
                self.read_channel(unit, channel)?;
            }
        }
        Ok(())
    }

    /// hub to send transactions to
    fn hub(&self) -> Result<Arc<Hub<C>>, Error> {
        match self.state {
            PeripheralState::Initialized => self.hub.upgrade().ok_or(Error::NoHubConfigured),
            PeripheralState::Uninitialized => Err(Error::NoHubConfigured),
            PeripheralState::ShutDown => Err(Error::ShutDown),
        }
    }
    /// address of a channel, channel must exist in this peripheral
    fn address(&self, unit: &Unit, channel: usize) -> Result<u32, Error> {
        if channel >= self.channels
            {return Err(Error::InvalidChannel {channel, channels: self.channels})}
        unit.register(channel)
            .map(|register| register.address())
            .ok_or(Error::InvalidChannel {channel, channels: unit.max_channels})
    }
}
