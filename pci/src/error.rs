use core::fmt;

/// Enumeration failures. All of them are fatal to a probe pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PciError {
    DeviceArenaFull,
    BusArenaFull,
    RootArenaFull,
    /// A bus already has the maximum number of child buses.
    BusChildrenFull { bus: u8 },
    /// A bus already has the maximum number of devices.
    BusDevicesFull { bus: u8 },
    /// Bridges need more than 256 bus numbers.
    BusNumberOverflow,
    /// The BAR reports writable bits but none of them give a size.
    InvalidBar { bus: u8, devfn: u8, reg: usize },
    /// A 64-bit BAR occupies the last slot and has no upper half.
    Bar64InLastSlot { bus: u8, devfn: u8, reg: usize },
    /// An allocation pool ran past the end of its address space.
    AddressOverflow,
}

impl fmt::Display for PciError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            PciError::DeviceArenaFull => write!(f, "failed to allocate pci dev"),
            PciError::BusArenaFull => write!(f, "failed to allocate pci bus"),
            PciError::RootArenaFull => write!(f, "failed to allocate pci root bridge"),
            PciError::BusChildrenFull { bus } => {
                write!(f, "bus {:#x}: too many child buses", bus)
            }
            PciError::BusDevicesFull { bus } => write!(f, "bus {:#x}: too many devices", bus),
            PciError::BusNumberOverflow => write!(f, "out of bus numbers"),
            PciError::InvalidBar { bus, devfn, reg } => write!(
                f,
                "{:02x}:{:02x}.{} reg {:#x}: invalid BAR (can't size)",
                bus,
                devfn >> 3,
                devfn & 7,
                reg
            ),
            PciError::Bar64InLastSlot { bus, devfn, reg } => write!(
                f,
                "{:02x}:{:02x}.{} reg {:#x}: 64-bit BAR has no upper half",
                bus,
                devfn >> 3,
                devfn & 7,
                reg
            ),
            PciError::AddressOverflow => write!(f, "resource pool exhausted"),
        }
    }
}

pub type PciResult<T = ()> = core::result::Result<T, PciError>;
