/*!
    catalog of the devices of the board, as exposed to a host framework

    the host discovers devices by name and capability, creates them, then reads and writes their named properties:

    - the number of channels, fixed at creation, named after [Kind::channels_label]
    - one property per unit and channel, named after the unit's label followed by the channel index, like `Mode2` or `State0`
*/

use std::{
    format,
    string::{String, ToString},
    vec::Vec,
    };

use crate::registers::{Unit, Bounds, Access};
use super::{
    Error,
    Hub, Connector, Detection,
    Peripheral, Kind, KINDS,
    };


/// name of the hub device
pub const HUB: &str = "Mojo-Hub";
/// name of the hub property reporting the firmware version
pub const VERSION_PROPERTY: &str = "MicroMojo version";

/// role of a device for the host
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Capability {
    /// owns the link, required by every other device
    Hub,
    Generic,
}

/// registration entry of a device
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: &'static str,
    pub capability: Capability,
    pub description: &'static str,
}

/// every device the host can create, hub first
pub fn devices() -> impl Iterator<Item=DeviceInfo> {
    let hub = DeviceInfo {
        name: HUB,
        capability: Capability::Hub,
        description: "Hub (required)",
        };
    core::iter::once(hub).chain(KINDS.into_iter().map(|kind| DeviceInfo {
        name: kind.name,
        capability: Capability::Generic,
        description: kind.description,
        }))
}

/// kind of peripheral registered under the given name
pub fn kind(name: &str) -> Result<&'static Kind, Error> {
    KINDS.into_iter()
        .find(|kind| kind.name == name)
        .ok_or_else(|| Error::UnknownDevice(name.to_string()))
}

/// create an uninitialized peripheral by name, with its kind's default number of channels if not given
pub fn create<C: Connector>(name: &str, channels: Option<usize>) -> Result<Peripheral<C>, Error> {
    let kind = kind(name)?;
    Peripheral::new(kind, channels.unwrap_or(kind.default_channels))
}

/// kinds of peripherals available behind the hub, none if no board answers
pub fn installed<C: Connector>(hub: &Hub<C>) -> Vec<&'static Kind> {
    match hub.detect() {
        Detection::CanCommunicate => KINDS.to_vec(),
        _ => Vec::new(),
    }
}


/// declaration of a named property
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub bounds: Option<Bounds>,
    pub read_only: bool,
    pub default: i32,
}

/// what a property name designates in a peripheral
enum Target {
    Channels,
    Channel(&'static Unit, usize),
}

fn target(kind: &'static Kind, name: &str) -> Option<Target> {
    if name == kind.channels_label
        {return Some(Target::Channels)}
    kind.units.iter().find_map(|unit| {
        let index = name.strip_prefix(unit.label)?;
        // reject signs and leading zeros, only the canonical name is valid
        if index.is_empty() || !index.bytes().all(|c| c.is_ascii_digit())
        || index.len() > 1 && index.starts_with('0')
            {return None}
        Some(Target::Channel(unit, index.parse().ok()?))
    })
}

impl<C: Connector> Peripheral<C> {
    /// every property of this peripheral
    pub fn properties(&self) -> Vec<Property> {
        let kind = self.kind();
        let channels = i32::try_from(kind.max_channels).unwrap_or(i32::MAX);
        let mut properties = Vec::new();
        properties.push(Property {
            name: kind.channels_label.to_string(),
            bounds: Some(Bounds::new(1, channels)),
            read_only: true,
            default: i32::try_from(self.channels()).unwrap_or(i32::MAX),
            });
        for channel in 0 .. self.channels() {
            for unit in kind.units {
                properties.push(Property {
                    name: format!("{}{}", unit.label, channel),
                    bounds: unit.bounds,
                    read_only: unit.access == Access::ReadOnly,
                    default: unit.default,
                    });
            }
        }
        properties
    }
    /// current value of a property, channel properties are read from the board
    pub fn get(&mut self, name: &str) -> Result<i32, Error> {
        match target(self.kind(), name) {
            Some(Target::Channels) => Ok(i32::try_from(self.channels()).unwrap_or(i32::MAX)),
            Some(Target::Channel(unit, channel)) => self.read_channel(unit, channel),
            None => Err(Error::UnknownProperty(name.to_string())),
        }
    }
    /// set a property, channel properties are written to the board
    pub fn set(&mut self, name: &str, value: i32) -> Result<(), Error> {
        match target(self.kind(), name) {
            Some(Target::Channels) => Err(Error::ReadOnly(self.kind().channels_label)),
            Some(Target::Channel(unit, channel)) => self.write_channel(unit, channel, value),
            None => Err(Error::UnknownProperty(name.to_string())),
        }
    }
}
