//! PCI/PCIe bus enumeration and resource assignment.
//!
//! [`PciTopology::probe_host`] walks one host controller's bus tree through
//! a [`ConfigSpace`], gives every bridge a bus number, sizes and assigns
//! every BAR from the host's I/O, mem32 and mem64 pools, and programs the
//! bridge forwarding windows. The resulting topology is read back with
//! [`PciTopology::foreach_device`] or [`PciTopology::devices`].

#![cfg_attr(not(test), no_std)]
#![deny(warnings)]

extern crate alloc;
#[macro_use]
extern crate log;

mod config;
mod enumerate;
mod error;
mod host;
mod model;
mod query;
mod resource;
mod walk;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use config::{ecam_offset, ConfigSpace, EcamConfig, PciReg16, PciReg32, PciReg8};
pub use error::{PciError, PciResult};
pub use host::PciHostConfig;
pub use model::{
    BusId, Capacity, DeviceId, HeaderType, PciBus, PciDevice, PciRootBridge, PciTopology, RootId,
};
pub use query::{PCI_CLASS_STORAGE_EXPRESS, ZNI_DEVICE_ID, ZNI_VENDOR_ID};
pub use resource::{pci_size, AddressAllocator, ResourceFlags, ResourceKind, ResourceRange};

/// Device arena capacity.
pub const MAX_NUM_PCI_DEVS: usize = 256;
/// Bus arena capacity.
pub const MAX_NUM_PCI_BUSES: usize = 256;
/// Root bridge arena capacity.
pub const MAX_NUM_PCI_ROOT_BRIDGES: usize = 32;
/// Devices, and separately child buses, one bus can hold.
pub const MAX_NUM_CHILDREN: usize = 16;
/// BAR slots in a type 0 header.
pub const PCI_NUM_BARS: usize = 6;
