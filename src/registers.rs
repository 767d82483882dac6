/*!
    address map of the board

    The board exposes a flat 32 bit address space where each functional unit owns a fixed range of addresses, one per channel.

    | unit                | base | channels |
    |---------------------|------|----------|
    | laser mode          | 0    | 6        |
    | laser duration      | 10   | 6        |
    | laser sequence mask | 20   | 6        |
    | ttl state           | 30   | 6        |
    | servo position      | 40   | 6        |
    | pwm duty            | 50   | 6        |
    | analog input        | 60   | 8        |
    | firmware version    | 100  | 1        |

    each unit is described by a [Unit] constant, gathering its address range and the policy applied to values written to it.
*/


/// protocol version expected in the board's [VERSION] register
pub const FIRMWARE_VERSION: i32 = 1;
/// maximum number of channels over all units
pub const MAX_CHANNELS: usize = 8;

/**
    a register is a single address in board memory, holding a 32 bit signed value

    it only holds the address, hence can be created, copied or destroyed at no cost
*/
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Register {
    addr: u32,
}
impl Register {
    pub const fn new(address: u32) -> Self {
        Self {addr: address}
    }
    /// address in board memory
    pub const fn address(&self) -> u32 {self.addr}
    /// register `index` addresses after this one
    pub const fn offset(&self, index: u32) -> Self {
        Self::new(self.addr + index)
    }
}

/// version of the protocol implemented by the firmware
pub const VERSION: Register = Register::new(100);


/// inclusive range of values a unit declares acceptable
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub min: i32,
    pub max: i32,
}
impl Bounds {
    pub const fn new(min: i32, max: i32) -> Self {
        Self {min, max}
    }
    pub const fn contains(&self, value: i32) -> bool {
        self.min <= value && value <= self.max
    }
}

/// transformation applied to a value before it is written to a unit
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Policy {
    /// values are sent as given
    PassThrough,
    /// any nonzero value is sent as 1
    Boolean,
    /// values outside the unit's bounds are sent as 0
    ZeroOutOfBounds,
}

/// whether the host may write a unit
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Access {
    ReadWrite,
    ReadOnly,
}

/// a functional unit: a contiguous range of registers, one per channel
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Unit {
    /// prefix of the per-channel property names, the channel index is appended
    pub label: &'static str,
    /// register of channel 0
    pub base: Register,
    /// number of registers reserved for this unit
    pub max_channels: usize,
    /// declared value range, `None` when the board reports raw values
    pub bounds: Option<Bounds>,
    /// initial value shown to the host before anything was read or written
    pub default: i32,
    pub policy: Policy,
    pub access: Access,
}
impl Unit {
    /// register holding the given channel, if the channel exists in this unit
    pub fn register(&self, channel: usize) -> Option<Register> {
        if channel >= self.max_channels
            {return None}
        Some(self.base.offset(u32::try_from(channel).ok()?))
    }
    /// value effectively sent to the board when the host writes `value`
    pub fn apply(&self, value: i32) -> i32 {
        match self.policy {
            Policy::PassThrough => value,
            Policy::Boolean => i32::from(value != 0),
            Policy::ZeroOutOfBounds => match self.bounds {
                Some(bounds) if !bounds.contains(value) => 0,
                _ => value,
            },
        }
    }
    /// every address of this unit
    pub fn addresses(&self) -> impl Iterator<Item=u32> + '_ {
        (0 .. self.max_channels).filter_map(|channel| self.register(channel)).map(|r| r.address())
    }
}

/// laser triggering mode
pub const LASER_MODE: Unit = Unit {
    label: "Mode",
    base: Register::new(0),
    max_channels: 6,
    bounds: Some(Bounds::new(0, 4)),
    default: 0,
    policy: Policy::PassThrough,
    access: Access::ReadWrite,
};
/// laser pulse duration
pub const LASER_DURATION: Unit = Unit {
    label: "Duration",
    base: Register::new(10),
    max_channels: 6,
    bounds: Some(Bounds::new(0, 65535)),
    default: 0,
    policy: Policy::PassThrough,
    access: Access::ReadWrite,
};
/**
    laser sequence mask

    the upper bound collides with the firmware's unknown command sentinel: reading back a mask of 65535 fails with an unknown command error
*/
pub const LASER_SEQUENCE: Unit = Unit {
    label: "Sequence",
    base: Register::new(20),
    max_channels: 6,
    bounds: Some(Bounds::new(0, 65535)),
    default: 65535,
    policy: Policy::PassThrough,
    access: Access::ReadWrite,
};
/// ttl output state
pub const TTL: Unit = Unit {
    label: "State",
    base: Register::new(30),
    max_channels: 6,
    bounds: Some(Bounds::new(0, 1)),
    default: 0,
    policy: Policy::Boolean,
    access: Access::ReadWrite,
};
/// servo position
pub const SERVO: Unit = Unit {
    label: "Position",
    base: Register::new(40),
    max_channels: 6,
    bounds: Some(Bounds::new(0, 131071)),
    default: 0,
    policy: Policy::PassThrough,
    access: Access::ReadWrite,
};
/// pwm duty cycle
pub const PWM: Unit = Unit {
    label: "Position",
    base: Register::new(50),
    max_channels: 6,
    bounds: Some(Bounds::new(0, 255)),
    default: 0,
    policy: Policy::ZeroOutOfBounds,
    access: Access::ReadWrite,
};
/// analog input value
pub const ANALOG_INPUT: Unit = Unit {
    label: "AnalogInput",
    base: Register::new(60),
    max_channels: 8,
    bounds: None,
    default: 0,
    policy: Policy::PassThrough,
    access: Access::ReadOnly,
};

/// all units of the board
pub const UNITS: [Unit; 7] = [LASER_MODE, LASER_DURATION, LASER_SEQUENCE, TTL, SERVO, PWM, ANALOG_INPUT];

/// whether the board knows the given address
pub fn is_mapped(address: u32) -> bool {
    address == VERSION.address()
    || UNITS.iter().any(|unit| unit.addresses().any(|a| a == address))
}
