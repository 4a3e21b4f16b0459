//! Buses, devices and root bridges discovered by a probe pass.
//!
//! Entities live in append-only arenas owned by [`PciTopology`] and refer
//! to each other by handle.

use alloc::vec::Vec;
use numeric_enum_macro::numeric_enum;

use crate::error::{PciError, PciResult};
use crate::host::PciHostConfig;
use crate::resource::ResourceRange;
use crate::{
    MAX_NUM_CHILDREN, MAX_NUM_PCI_BUSES, MAX_NUM_PCI_DEVS, MAX_NUM_PCI_ROOT_BRIDGES, PCI_NUM_BARS,
};

/// Handle of a device in a [`PciTopology`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceId(usize);

/// Handle of a bus in a [`PciTopology`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BusId(usize);

/// Handle of a root bridge in a [`PciTopology`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RootId(usize);

numeric_enum! {
    #[repr(u8)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum HeaderType {
        Normal = 0,
        Bridge = 1,
        CardBus = 2,
    }
}

const PCI_HEADER_TYPE_MASK: u8 = 0x7f;
const PCI_HEADER_TYPE_MULTI_FUNCTION: u8 = 0x80;

#[derive(Debug, Clone)]
pub struct PciDevice {
    /// The bus this device was found on.
    pub bus: BusId,
    /// Number of that bus.
    pub bus_number: u8,
    pub devfn: u8,
    pub vendor: u16,
    pub device: u16,
    /// Base class, sub-class and programming interface.
    pub class: u32,
    pub revision: u8,
    /// Raw header type byte, multi-function bit included.
    pub header_type: u8,
    pub resources: [ResourceRange; PCI_NUM_BARS],
    /// The bus behind this device, for bridges.
    pub subordinate: Option<BusId>,
}

impl PciDevice {
    fn new(bus: BusId, bus_number: u8, devfn: u8) -> Self {
        Self {
            bus,
            bus_number,
            devfn,
            vendor: 0xffff,
            device: 0xffff,
            class: 0,
            revision: 0,
            header_type: 0,
            resources: [ResourceRange::default(); PCI_NUM_BARS],
            subordinate: None,
        }
    }

    /// Layout of the configuration header, `None` for unknown types.
    pub fn header_kind(&self) -> Option<HeaderType> {
        HeaderType::try_from(self.header_type & PCI_HEADER_TYPE_MASK).ok()
    }

    pub fn is_multifunction(&self) -> bool {
        self.header_type & PCI_HEADER_TYPE_MULTI_FUNCTION != 0
    }

    /// Whether the device forwards to a secondary bus.
    pub fn is_bridge(&self) -> bool {
        matches!(
            self.header_kind(),
            Some(HeaderType::Bridge) | Some(HeaderType::CardBus)
        )
    }

    pub fn slot(&self) -> u8 {
        self.devfn >> 3
    }

    pub fn function(&self) -> u8 {
        self.devfn & 0x7
    }
}

#[derive(Debug, Clone)]
pub struct PciBus {
    pub root: RootId,
    /// `None` for a root bus.
    pub parent: Option<BusId>,
    /// The bridge leading to this bus, as seen by the parent.
    pub bridge: Option<DeviceId>,
    pub number: u8,
    /// Number of the parent bus.
    pub primary: u8,
    /// Highest bus number behind this bus.
    pub subordinate: u8,
    pub children: Vec<BusId>,
    pub devices: Vec<DeviceId>,
}

impl PciBus {
    fn new(root: RootId, number: u8) -> Self {
        Self {
            root,
            parent: None,
            bridge: None,
            number,
            primary: 0,
            subordinate: number,
            children: Vec::new(),
            devices: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PciRootBridge {
    pub host: PciHostConfig,
    pub bus: BusId,
}

/// Arena sizes of a [`PciTopology`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    pub devices: usize,
    pub buses: usize,
    pub roots: usize,
    /// Per-bus limit on devices and, separately, on child buses.
    pub children: usize,
}

impl Default for Capacity {
    fn default() -> Self {
        Self {
            devices: MAX_NUM_PCI_DEVS,
            buses: MAX_NUM_PCI_BUSES,
            roots: MAX_NUM_PCI_ROOT_BRIDGES,
            children: MAX_NUM_CHILDREN,
        }
    }
}

/// Every bus, device and root bridge found so far.
#[derive(Debug)]
pub struct PciTopology {
    capacity: Capacity,
    devices: Vec<PciDevice>,
    buses: Vec<PciBus>,
    roots: Vec<PciRootBridge>,
}

impl Default for PciTopology {
    fn default() -> Self {
        Self::new()
    }
}

impl PciTopology {
    pub fn new() -> Self {
        Self::with_capacity(Capacity::default())
    }

    pub fn with_capacity(capacity: Capacity) -> Self {
        Self {
            capacity,
            devices: Vec::with_capacity(capacity.devices),
            buses: Vec::with_capacity(capacity.buses),
            roots: Vec::with_capacity(capacity.roots),
        }
    }

    pub fn device(&self, id: DeviceId) -> &PciDevice {
        &self.devices[id.0]
    }

    pub(crate) fn device_mut(&mut self, id: DeviceId) -> &mut PciDevice {
        &mut self.devices[id.0]
    }

    pub fn bus(&self, id: BusId) -> &PciBus {
        &self.buses[id.0]
    }

    pub(crate) fn bus_mut(&mut self, id: BusId) -> &mut PciBus {
        &mut self.buses[id.0]
    }

    pub fn root(&self, id: RootId) -> &PciRootBridge {
        &self.roots[id.0]
    }

    pub fn roots(&self) -> &[PciRootBridge] {
        &self.roots
    }

    pub(crate) fn devices_slice(&self) -> &[PciDevice] {
        &self.devices
    }

    pub fn num_devices(&self) -> usize {
        self.devices.len()
    }

    pub fn num_buses(&self) -> usize {
        self.buses.len()
    }

    fn alloc_bus(&mut self, bus: PciBus) -> PciResult<BusId> {
        if self.buses.len() >= self.capacity.buses {
            return Err(PciError::BusArenaFull);
        }
        self.buses.push(bus);
        Ok(BusId(self.buses.len() - 1))
    }

    /// Allocate a root bridge for `host` together with its bus 0.
    pub(crate) fn alloc_root(&mut self, host: PciHostConfig) -> PciResult<RootId> {
        if self.roots.len() >= self.capacity.roots {
            return Err(PciError::RootArenaFull);
        }
        let root = RootId(self.roots.len());
        let bus = self.alloc_bus(PciBus::new(root, 0))?;
        self.roots.push(PciRootBridge { host, bus });
        Ok(root)
    }

    /// Allocate a device at `devfn` and attach it to `bus`.
    pub(crate) fn alloc_device(&mut self, bus: BusId, devfn: u8) -> PciResult<DeviceId> {
        let number = self.bus(bus).number;
        if self.bus(bus).devices.len() >= self.capacity.children {
            return Err(PciError::BusDevicesFull { bus: number });
        }
        if self.devices.len() >= self.capacity.devices {
            return Err(PciError::DeviceArenaFull);
        }
        self.devices.push(PciDevice::new(bus, number, devfn));
        let id = DeviceId(self.devices.len() - 1);
        self.bus_mut(bus).devices.push(id);
        Ok(id)
    }

    /// Allocate bus `number` behind `bridge`, a device on `parent`.
    pub(crate) fn alloc_child_bus(
        &mut self,
        parent: BusId,
        bridge: DeviceId,
        number: u8,
    ) -> PciResult<BusId> {
        let (root, primary) = {
            let p = self.bus(parent);
            if p.children.len() >= self.capacity.children {
                return Err(PciError::BusChildrenFull { bus: p.number });
            }
            (p.root, p.number)
        };
        let mut bus = PciBus::new(root, number);
        bus.parent = Some(parent);
        bus.bridge = Some(bridge);
        bus.primary = primary;
        let id = self.alloc_bus(bus)?;
        self.bus_mut(parent).children.push(id);
        self.device_mut(bridge).subordinate = Some(id);
        Ok(id)
    }
}
