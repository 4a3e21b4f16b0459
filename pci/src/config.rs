//! Configuration space access.

use core::ptr::{read_volatile, write_volatile};
use numeric_enum_macro::numeric_enum;

/// Byte offset of a register in ECAM space, relative to the host's
/// configuration base.
#[inline]
pub const fn ecam_offset(bus: u8, devfn: u8, offset: usize) -> usize {
    ((bus as usize) << 20) | ((devfn as usize) << 12) | (offset & 0xfff)
}

/// Sized reads and writes of a function's configuration registers.
///
/// There is no error channel: an absent function reads back all-ones and
/// ignores writes.
pub trait ConfigSpace {
    fn read8(&self, bus: u8, devfn: u8, offset: usize) -> u8;
    fn read16(&self, bus: u8, devfn: u8, offset: usize) -> u16;
    fn read32(&self, bus: u8, devfn: u8, offset: usize) -> u32;
    fn write8(&self, bus: u8, devfn: u8, offset: usize, val: u8);
    fn write16(&self, bus: u8, devfn: u8, offset: usize, val: u16);
    fn write32(&self, bus: u8, devfn: u8, offset: usize, val: u32);
}

/// Memory-mapped (ECAM) configuration space of one host controller.
#[derive(Debug)]
pub struct EcamConfig {
    base: usize,
}

impl EcamConfig {
    /// # Safety
    ///
    /// `base` must be the mapped ECAM window of a host controller, large
    /// enough for every bus number that will be accessed.
    pub const unsafe fn new(base: usize) -> Self {
        Self { base }
    }

    fn addr(&self, bus: u8, devfn: u8, offset: usize) -> usize {
        self.base + ecam_offset(bus, devfn, offset)
    }
}

#[allow(unsafe_code)]
impl ConfigSpace for EcamConfig {
    fn read8(&self, bus: u8, devfn: u8, offset: usize) -> u8 {
        unsafe { read_volatile(self.addr(bus, devfn, offset) as *const u8) }
    }
    fn read16(&self, bus: u8, devfn: u8, offset: usize) -> u16 {
        unsafe { u16::from_le(read_volatile(self.addr(bus, devfn, offset) as *const u16)) }
    }
    fn read32(&self, bus: u8, devfn: u8, offset: usize) -> u32 {
        unsafe { u32::from_le(read_volatile(self.addr(bus, devfn, offset) as *const u32)) }
    }
    fn write8(&self, bus: u8, devfn: u8, offset: usize, val: u8) {
        unsafe { write_volatile(self.addr(bus, devfn, offset) as *mut u8, val) }
    }
    fn write16(&self, bus: u8, devfn: u8, offset: usize, val: u16) {
        unsafe { write_volatile(self.addr(bus, devfn, offset) as *mut u16, val.to_le()) }
    }
    fn write32(&self, bus: u8, devfn: u8, offset: usize, val: u32) {
        unsafe { write_volatile(self.addr(bus, devfn, offset) as *mut u32, val.to_le()) }
    }
}

numeric_enum! {
    #[repr(usize)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum PciReg8 {
        RevisionId = 0x8,
        HeaderType = 0xE,

        // bridge
        PrimaryBusId = 0x18,
        SecondaryBusId = 0x19,
        SubordinateBusId = 0x1A,
        IoBase = 0x1C,
        IoLimit = 0x1D,
    }
}

numeric_enum! {
    #[repr(usize)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum PciReg16 {
        VendorId = 0x0,
        DeviceId = 0x2,
        Command = 0x4,

        // bridge, base and limit as one access
        IoBaseLimit = 0x1C,
    }
}

numeric_enum! {
    #[repr(usize)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum PciReg32 {
        /// Vendor ID in the low half, device ID in the high half.
        VendorDevice = 0x0,
        /// Revision in the low byte, class code above it.
        ClassRevision = 0x8,
        BARBase = 0x10,

        // bridge
        /// Primary, secondary and subordinate bus numbers.
        BusNumbers = 0x18,
        MemoryBaseLimit = 0x20,
        PrefetchableMemoryBaseLimit = 0x24,
        PrefetchableMemoryBaseUpper = 0x28,
        PrefetchableMemoryLimitUpper = 0x2C,
        IoBaseLimitUpper = 0x30,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ecam_layout() {
        assert_eq!(ecam_offset(0, 0, 0), 0);
        assert_eq!(ecam_offset(1, 0, 0), 1 << 20);
        assert_eq!(ecam_offset(0, 8, 0), 8 << 12);
        assert_eq!(ecam_offset(0xff, 0xf8, 0x10), 0x0ff_f801_0);
        // Only 4 KiB per function.
        assert_eq!(ecam_offset(2, 0, 0x1004), (2 << 20) | 4);
    }

    #[test]
    fn ecam_accessors_hit_computed_address() {
        let mut window = alloc::vec![0u32; (ecam_offset(0, 16, 0) + 0x40) / 4];
        let base = window.as_mut_ptr() as usize;
        let ecam = unsafe { EcamConfig::new(base) };
        ecam.write32(0, 16, 0x10, 0xdead_beef);
        assert_eq!(window[(ecam_offset(0, 16, 0x10)) / 4], 0xdead_beef);
        assert_eq!(ecam.read16(0, 16, 0x12), 0xdead);
        assert_eq!(ecam.read8(0, 16, 0x10), 0xef);
        ecam.write8(0, 16, 0x11, 0x00);
        assert_eq!(ecam.read32(0, 16, 0x10), 0xdead_00ef);
    }
}
